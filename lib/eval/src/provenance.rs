//! Provenance report: every candidate relation of one query together with
//! the routes that support it.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;
use tsr_core::{infer, DistanceIndex, IdSet, InferenceConfig, Item, ItemPool, ScoringMode, TargetAggregate};

#[derive(Debug, Clone)]
pub struct ProvenanceConfig {
    /// Relation to infer
    pub relation: String,
    pub inference: InferenceConfig,
}

impl ProvenanceConfig {
    pub fn new(relation: impl Into<String>, mode: ScoringMode) -> Self {
        Self {
            relation: relation.into(),
            inference: InferenceConfig {
                mode,
                ..InferenceConfig::default()
            },
        }
    }
}

/// One `index  name` line per item, for picking a query
pub fn list_items(items: &[Item]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}  {}", i, item.name))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rank every other item of the corpus as a target for `items[query_index]`
pub fn rank_for_query<'a>(
    items: &'a [Item],
    distances: &DistanceIndex,
    query_index: usize,
    config: &ProvenanceConfig,
) -> Result<(&'a Item, Vec<TargetAggregate<'a>>)> {
    let query = items.get(query_index).with_context(|| {
        format!(
            "Invalid selection {}: the corpus has {} items",
            query_index,
            items.len()
        )
    })?;
    info!("Selected: {}", query.name);

    let pool = ItemPool::excluding(items, &query.id);
    let allowed: IdSet = pool.iter().map(|item| item.id.clone()).collect();
    let held_out = query.without_relation(&config.relation);

    let ranked = infer(
        &config.inference,
        &held_out,
        &pool,
        distances,
        &allowed,
        &config.relation,
    )?;
    Ok((query, ranked))
}

/// Human readable report of the ranked targets and their routes
pub fn render_report(query: &Item, ranked: &[TargetAggregate<'_>]) -> String {
    let mut text = format!(
        "POTENTIAL RELATIONS FOR:\nQUERY NAME: {}\nDESCRIPTION: {}",
        query.name, query.description
    );

    for result in ranked {
        let target = result.target();
        text.push_str(&format!(
            "\n\nSCORE: {:.4}\nTARGET NAME: {}\nTARGET ID: {}\nDESCRIPTION: {}\nROUTES:",
            result.score, target.name, target.id, target.description
        ));
        for route in &result.routes {
            text.push_str(&format!(
                "\n{:.4}    SIMILAR: {:<32}    RELATED: {}",
                route.similarity(),
                route.similar.name,
                route.related.name
            ));
        }
    }
    text
}

/// `<query name>.<relation>.TSR-<mode>.txt`, with `/` in the name replaced
pub fn report_file_name(query: &Item, relation: &str, mode: ScoringMode) -> String {
    format!("{}.{}.TSR-{}.txt", query.name.replace('/', " "), relation, mode)
}

/// Write the report for `query` into `dir` and return the file path
pub fn write_report(
    dir: &Path,
    query: &Item,
    ranked: &[TargetAggregate<'_>],
    config: &ProvenanceConfig,
) -> Result<PathBuf> {
    let path = dir.join(report_file_name(query, &config.relation, config.inference.mode));
    info!("Saving to file: {}", path.display());
    std::fs::write(&path, render_report(query, ranked))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

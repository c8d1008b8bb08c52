//! 1-in-100 implicit feedback evaluation.
//!
//! Each known positive of a labelled item is hidden among randomly drawn
//! items that are not known positives, and the item's labels are inferred
//! back. A case records the rank of the positive in that pool. Cases are
//! independent and run on a rayon thread pool; the parent groups the ranks
//! per positive.

use crate::metrics;
use crate::limit_label;
use ahash::AHashMap;
use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info, warn};
use tsr_core::{infer, items_with_relations, DistanceIndex, IdSet, InferenceConfig, Item, ItemId, ItemPool, ScoringMode};

/// Report fields left out of the results CSV
pub const CSV_IGNORED: &[&str] = &["text", "positive_label_ranks"];

pub const DEFAULT_POOL_SIZE: usize = 101;

#[derive(Debug, Clone)]
pub struct ImplicitConfig {
    /// Relation holding the known positive targets
    pub positive: String,
    pub inference: InferenceConfig,
    /// Random pools drawn per positive
    pub repeats: usize,
    /// Items ranked per case, the positive included
    pub pool_size: usize,
    /// Seed of the pool sampler. Drawn at random when absent.
    pub seed: Option<u64>,
    /// Worker threads. Defaults to one per core.
    pub workers: Option<usize>,
    /// Name of the corpus, echoed in the report
    pub dataset: String,
}

impl ImplicitConfig {
    pub fn new(positive: impl Into<String>, mode: ScoringMode, repeats: usize) -> Self {
        Self {
            positive: positive.into(),
            inference: InferenceConfig {
                mode,
                ..InferenceConfig::default()
            },
            repeats,
            pool_size: DEFAULT_POOL_SIZE,
            seed: None,
            workers: None,
            dataset: String::new(),
        }
    }
}

/// One positive hidden in one random pool
#[derive(Debug, Clone)]
pub struct ImplicitCase<'a> {
    pub query: &'a Item,
    pub positive: ItemId,
    pub target_ids: Vec<ItemId>,
    pub attempt: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImplicitReport {
    pub text: String,
    pub dataset: String,
    pub positive_label_name: String,
    pub labelled_items_count: usize,
    pub positive_label_count: usize,
    pub evaluation_repeat_count: usize,
    pub scoring_mode: ScoringMode,
    #[serde(rename = "L1")]
    pub max_similar: Option<usize>,
    #[serde(rename = "L2")]
    pub max_related: Option<usize>,
    /// Rank of the positive in every case, in case order
    pub positive_label_ranks: Vec<usize>,
    pub total_evaluations_count: usize,
    #[serde(rename = "hits@10")]
    pub hits_at_10: usize,
    #[serde(rename = "HR@10")]
    pub hit_rate_at_10: f64,
    #[serde(rename = "hits@5")]
    pub hits_at_5: usize,
    #[serde(rename = "HR@5")]
    pub hit_rate_at_5: f64,
    #[serde(rename = "hits@1")]
    pub hits_at_1: usize,
    #[serde(rename = "HR@1")]
    pub hit_rate_at_1: f64,
    pub median_label_positive_rank: f64,
    pub mean_label_positive_rank: f64,
    /// Ranks grouped per positive id, in first-seen order
    #[serde(skip)]
    pub ranks_per_positive: Vec<(ItemId, Vec<usize>)>,
}

/// Draw every case: for each labelled item, each of its positives and each
/// attempt, `pool_size - 1` random non-positive ids plus the positive.
pub fn build_cases<'a>(
    labelled: &[&'a Item],
    items: &[Item],
    positive: &str,
    repeats: usize,
    pool_size: usize,
    rng: &mut StdRng,
) -> Vec<ImplicitCase<'a>> {
    let mut cases = Vec::new();
    for &query in labelled {
        let known: IdSet = query.related(positive).iter().cloned().collect();
        for pos in query.related(positive) {
            for attempt in 1..=repeats {
                let mut target_ids: Vec<ItemId> = items
                    .iter()
                    .filter(|t| !known.contains(&t.id))
                    .map(|t| t.id.clone())
                    .collect();
                target_ids.shuffle(rng);
                target_ids.truncate(pool_size.saturating_sub(1));

                target_ids.push(pos.clone());
                target_ids.shuffle(rng);

                cases.push(ImplicitCase {
                    query,
                    positive: pos.clone(),
                    target_ids,
                    attempt,
                });
            }
        }
    }
    cases
}

/// Rank the positive of one case. Absent positives rank at `pool_size`.
pub fn run_case(
    case: &ImplicitCase<'_>,
    items: &[Item],
    distances: &DistanceIndex,
    config: &ImplicitConfig,
) -> Result<(ItemId, usize)> {
    let pool = ItemPool::excluding(items, &case.query.id);
    let held_out = case.query.without_relation(&config.positive);
    let allowed: IdSet = case.target_ids.iter().cloned().collect();

    let ranked = infer(
        &config.inference,
        &held_out,
        &pool,
        distances,
        &allowed,
        &config.positive,
    )?;
    let rank = ranked
        .iter()
        .position(|target| target.target_id == case.positive)
        .unwrap_or(config.pool_size);

    info!(
        "QUERY: {:<5} TARGET: {:<5} ATTEMPT: {:<5} POSITIVE LABEL RANK: {}",
        held_out.id.to_string(),
        case.positive.to_string(),
        case.attempt,
        rank
    );
    Ok((case.positive.clone(), rank))
}

/// Run every case on the worker pool. The first failing case aborts the run.
pub fn run_cases(
    cases: &[ImplicitCase<'_>],
    items: &[Item],
    distances: &DistanceIndex,
    config: &ImplicitConfig,
) -> Result<Vec<(ItemId, usize)>> {
    let run = || {
        cases
            .par_iter()
            .map(|case| {
                run_case(case, items, distances, config).map_err(|e| {
                    error!(
                        "Case failed (query {}, positive {}, attempt {}): {:#}",
                        case.query.id, case.positive, case.attempt, e
                    );
                    e
                })
            })
            .collect::<Result<Vec<_>>>()
    };

    match config.workers {
        Some(n) => rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build()?
            .install(run),
        None => run(),
    }
}

/// Group ranks per positive id, keeping first-seen order
pub fn group_by_positive(results: &[(ItemId, usize)]) -> Vec<(ItemId, Vec<usize>)> {
    let mut slots: AHashMap<&ItemId, usize> = AHashMap::new();
    let mut groups: Vec<(ItemId, Vec<usize>)> = Vec::new();
    for (id, rank) in results {
        let slot = *slots.entry(id).or_insert_with(|| {
            groups.push((id.clone(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(*rank);
    }
    groups
}

/// Run the implicit feedback evaluation over every item labelled with the
/// positive relation.
///
/// Returns `None` when no item carries the label.
pub fn evaluate_items(
    items: &[Item],
    distances: &DistanceIndex,
    config: &ImplicitConfig,
) -> Result<Option<ImplicitReport>> {
    if config.repeats == 0 {
        bail!("repeat count must be at least 1");
    }
    if config.pool_size == 0 {
        bail!("pool size must be at least 1");
    }

    let labelled = items_with_relations(items, &[config.positive.as_str()]);
    info!("Found {} labelled items", labelled.len());
    if labelled.is_empty() {
        warn!("No item has {:?} labels, nothing to evaluate", config.positive);
        return Ok(None);
    }

    let seed = config.seed.unwrap_or_else(rand::random::<u64>);
    info!("Sampling pools with seed {}", seed);
    let mut rng = StdRng::seed_from_u64(seed);
    let cases = build_cases(
        &labelled,
        items,
        &config.positive,
        config.repeats,
        config.pool_size,
        &mut rng,
    );

    info!("Processing {} test cases", cases.len());
    let results = run_cases(&cases, items, distances, config)?;
    info!("All test cases complete");

    let ranks: Vec<usize> = results.iter().map(|&(_, rank)| rank).collect();
    let rank_values: Vec<f64> = ranks.iter().map(|&r| r as f64).collect();
    let total = ranks.len();

    let mut report = ImplicitReport {
        text: String::new(),
        dataset: config.dataset.clone(),
        positive_label_name: config.positive.clone(),
        labelled_items_count: labelled.len(),
        positive_label_count: total / config.repeats,
        evaluation_repeat_count: config.repeats,
        scoring_mode: config.inference.mode,
        max_similar: config.inference.max_similar,
        max_related: config.inference.max_related,
        total_evaluations_count: total,
        hits_at_10: metrics::hits(&ranks, 10),
        hit_rate_at_10: metrics::hit_rate(&ranks, 10),
        hits_at_5: metrics::hits(&ranks, 5),
        hit_rate_at_5: metrics::hit_rate(&ranks, 5),
        hits_at_1: metrics::hits(&ranks, 1),
        hit_rate_at_1: metrics::hit_rate(&ranks, 1),
        median_label_positive_rank: metrics::median(&rank_values),
        mean_label_positive_rank: metrics::mean(&rank_values),
        ranks_per_positive: group_by_positive(&results),
        positive_label_ranks: ranks,
    };
    report.text = render_text(&report, config.pool_size);
    Ok(Some(report))
}

fn render_text(r: &ImplicitReport, pool_size: usize) -> String {
    format!(
        "FOR {} ITEMS WITH {} POSITIVE \"{}\" LABELS EACH RANKED OUT OF {} RANDOM ITEMS {} TIMES\n\
         SCORING MODE: {} L1={} L2={}\n\
         MEDIAN POSITIVE LABEL RANK: {:?}\n\
         MEAN POSITIVE LABEL RANK: {:.4}\n\
         HIT RATE @10: {:.4}\n\
         HIT RATE @5:  {:.4}\n\
         HIT RATE @1:  {:.4}",
        r.labelled_items_count,
        r.positive_label_count,
        r.positive_label_name,
        pool_size.saturating_sub(1),
        r.evaluation_repeat_count,
        r.scoring_mode,
        limit_label(r.max_similar),
        limit_label(r.max_related),
        r.median_label_positive_rank,
        r.mean_label_positive_rank,
        r.hit_rate_at_10,
        r.hit_rate_at_5,
        r.hit_rate_at_1,
    )
}

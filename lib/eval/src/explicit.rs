//! Leave-one-out evaluation against explicit positive and negative labels.
//!
//! Every item labelled with both relations is held out in turn: its labels
//! are hidden, the remaining corpus ranks its positive and negative targets,
//! and the ranks are scored with an R-threshold (the number of positives of
//! the item) and by the raw scores.

use crate::metrics::{self, ConfusionMatrix};
use crate::limit_label;
use ahash::AHashMap;
use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};
use tsr_core::{infer, items_with_relations, DistanceIndex, IdSet, InferenceConfig, Item, ItemId, ItemPool, ScoringMode};

/// Report fields left out of the results CSV
pub const CSV_IGNORED: &[&str] = &["text", "GT", "PR", "P@R", "R@R"];

#[derive(Debug, Clone)]
pub struct ExplicitConfig {
    /// Relation holding the known positive targets
    pub positive: String,
    /// Relation holding the known negative targets
    pub negative: String,
    pub inference: InferenceConfig,
    /// Name of the corpus, echoed in the report
    pub dataset: String,
}

impl ExplicitConfig {
    pub fn new(positive: impl Into<String>, negative: impl Into<String>, mode: ScoringMode) -> Self {
        Self {
            positive: positive.into(),
            negative: negative.into(),
            inference: InferenceConfig {
                mode,
                ..InferenceConfig::default()
            },
            dataset: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExplicitReport {
    pub text: String,
    pub dataset: String,
    pub positive_label_name: String,
    pub negative_label_name: String,
    pub labelled_items_count: usize,
    pub positive_label_count: usize,
    pub negative_label_count: usize,
    /// Ground truth per evaluated label, 1 for positives
    #[serde(rename = "GT")]
    pub ground_truth: Vec<u8>,
    /// Prediction per evaluated label, 1 when ranked below the threshold
    #[serde(rename = "PR")]
    pub predicted: Vec<u8>,
    pub scoring_mode: ScoringMode,
    #[serde(rename = "L1")]
    pub max_similar: Option<usize>,
    #[serde(rename = "L2")]
    pub max_related: Option<usize>,
    #[serde(rename = "P@R")]
    pub precision: f64,
    #[serde(rename = "R@R")]
    pub recall: f64,
    #[serde(rename = "F1@R")]
    pub f1: f64,
    #[serde(rename = "TN@R")]
    pub true_negatives: usize,
    #[serde(rename = "FP@R")]
    pub false_positives: usize,
    #[serde(rename = "FN@R")]
    pub false_negatives: usize,
    #[serde(rename = "TP@R")]
    pub true_positives: usize,
    /// Mean squared log error of the scores against the ground truth
    #[serde(rename = "RMS_error")]
    pub rms_error: f64,
    pub median_abs_error: f64,
}

/// Per-label outcome of one held-out query
#[derive(Debug, Default)]
struct Outcomes {
    ground_truth: Vec<u8>,
    predicted: Vec<u8>,
    scores: Vec<f64>,
    ranks_pos: Vec<usize>,
    ranks_neg: Vec<usize>,
}

/// Run leave-one-out evaluation over every item labelled with both relations.
///
/// Returns `None` when no item carries both labels.
pub fn evaluate_items(
    items: &[Item],
    distances: &DistanceIndex,
    config: &ExplicitConfig,
) -> Result<Option<ExplicitReport>> {
    let (pos, neg) = (config.positive.as_str(), config.negative.as_str());
    let labelled = items_with_relations(items, &[pos, neg]);
    info!("Found {} labelled items", labelled.len());
    if labelled.is_empty() {
        warn!("No item has both {:?} and {:?} labels, nothing to evaluate", pos, neg);
        return Ok(None);
    }

    let mut all = Outcomes::default();
    for query in &labelled {
        let allowed_list: Vec<ItemId> = query
            .related(pos)
            .iter()
            .chain(query.related(neg))
            .cloned()
            .collect();
        if allowed_list.is_empty() {
            continue;
        }
        let allowed: IdSet = allowed_list.iter().cloned().collect();

        let pool = ItemPool::excluding(items, &query.id);
        let held_out = query.without_relation(pos);
        let ranked = infer(&config.inference, &held_out, &pool, distances, &allowed, pos)?;

        let mut positions: AHashMap<&ItemId, usize> = AHashMap::with_capacity(ranked.len());
        for (i, target) in ranked.iter().enumerate() {
            positions.entry(&target.target_id).or_insert(i);
        }

        let threshold = query.related(pos).len();
        let worst_rank = allowed_list.len() - 1;
        let mut ranks_pos = Vec::new();
        let mut ranks_neg = Vec::new();

        for (labels, truth) in [(query.related(pos), 1u8), (query.related(neg), 0u8)] {
            for id in labels {
                let found = positions.get(id).copied();
                let rank = found.unwrap_or(worst_rank);
                let score = found.map(|i| ranked[i].score).unwrap_or(0.0);

                all.ground_truth.push(truth);
                all.predicted.push(u8::from(rank < threshold));
                all.scores.push(score);
                if truth == 1 {
                    ranks_pos.push(rank);
                } else {
                    ranks_neg.push(rank);
                }
            }
        }

        info!(
            "QUERY: {:<5} MEAN POSITIVE RANK: {:.1}   MEAN NEGATIVE RANK: {:.1}",
            query.id.to_string(),
            metrics::mean(&as_f64(&ranks_pos)),
            metrics::mean(&as_f64(&ranks_neg))
        );
        all.ranks_pos.extend(ranks_pos);
        all.ranks_neg.extend(ranks_neg);
    }

    let truth: Vec<bool> = all.ground_truth.iter().map(|&t| t == 1).collect();
    let predicted: Vec<bool> = all.predicted.iter().map(|&p| p == 1).collect();
    let matrix = ConfusionMatrix::from_labels(&truth, &predicted);
    let truth_values: Vec<f64> = all.ground_truth.iter().map(|&t| f64::from(t)).collect();

    let mut report = ExplicitReport {
        text: String::new(),
        dataset: config.dataset.clone(),
        positive_label_name: pos.to_string(),
        negative_label_name: neg.to_string(),
        labelled_items_count: labelled.len(),
        positive_label_count: all.ranks_pos.len(),
        negative_label_count: all.ranks_neg.len(),
        scoring_mode: config.inference.mode,
        max_similar: config.inference.max_similar,
        max_related: config.inference.max_related,
        precision: matrix.precision(),
        recall: matrix.recall(),
        f1: matrix.f1(),
        true_negatives: matrix.true_negatives,
        false_positives: matrix.false_positives,
        false_negatives: matrix.false_negatives,
        true_positives: matrix.true_positives,
        rms_error: metrics::mean_squared_log_error(&truth_values, &all.scores)?,
        median_abs_error: metrics::median_absolute_error(&truth_values, &all.scores)?,
        ground_truth: all.ground_truth,
        predicted: all.predicted,
    };
    report.text = render_text(&report);
    Ok(Some(report))
}

fn as_f64(ranks: &[usize]) -> Vec<f64> {
    ranks.iter().map(|&r| r as f64).collect()
}

fn render_text(r: &ExplicitReport) -> String {
    format!(
        "FOR {} ITEMS WITH {} POSITIVE \"{}\" LABELS AND {} NEGATIVE \"{}\" LABELS:\n\
         SCORING MODE: {} L1={} L2={}\n\
         \n\
         EVALUATED @R (Threshold = len(pos) per item):\n\
         \x20   PRECISION@R: {:.4}\n\
         \x20   RECALL@R   : {:.4}\n\
         \x20   F1@R       : {:.4}\n\
         \x20   CONFUSION MATRIX@R:\n\
         \x20       TP:{} FP:{}\n\
         \x20       FN:{} TN:{}\n\
         \n\
         EVALUATED BY SCORE:\n\
         \x20   RMS ERROR: {:.4}\n\
         \x20   MEDIAN ABSOLUTE ERROR: {:.4}",
        r.labelled_items_count,
        r.positive_label_count,
        r.positive_label_name,
        r.negative_label_count,
        r.negative_label_name,
        r.scoring_mode,
        limit_label(r.max_similar),
        limit_label(r.max_related),
        r.precision,
        r.recall,
        r.f1,
        r.true_positives,
        r.false_positives,
        r.false_negatives,
        r.true_negatives,
        r.rms_error,
        r.median_abs_error,
    )
}

//! # TSR Eval
//!
//! Evaluation harnesses built on top of `tsr-core`:
//!
//! - [`explicit`] - Leave-one-out ranking of known positive and negative labels
//! - [`implicit`] - Repeated sampling of one positive among random negatives
//! - [`provenance`] - Ranked targets of a single query with their routes

pub mod explicit;
pub mod implicit;
pub mod metrics;
pub mod provenance;

pub use explicit::{ExplicitConfig, ExplicitReport};
pub use implicit::{ImplicitCase, ImplicitConfig, ImplicitReport};
pub use metrics::ConfusionMatrix;
pub use provenance::ProvenanceConfig;

/// Render a search bound for reports: the number, or `all` when unbounded
pub fn limit_label(limit: Option<usize>) -> String {
    match limit {
        Some(n) if n > 0 => n.to_string(),
        _ => "all".to_string(),
    }
}

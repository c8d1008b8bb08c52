//! # TSR
//!
//! Two-Step Relation inference over an embedded corpus.
//!
//! Every item carries an embedding and, for some items, explicit relation
//! labels (`"treats": [12, 40]`). To suggest relations for a query, TSR walks
//! from the query to its closest labelled items, follows their labels, and
//! optionally steps once more to allowed items close to those labels. Each
//! reachable target is scored from the lengths of the routes leading to it.
//!
//! ## Quick Start
//!
//! ### As a CLI
//!
//! ```bash
//! tsr explicit -i data/drugs.json -p treats -n contraindicated -m d
//! tsr implicit -i data/drugs.json -p treats -m a* -r 10 --seed 7
//! tsr items -i data/drugs.json
//! tsr provenance -i data/drugs.json -p treats -q 3
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use tsr::prelude::*;
//!
//! let items = vec![
//!     Item::new(1, Vector::new(vec![1.0, 0.0])),
//!     Item::new(2, Vector::new(vec![0.6, 0.8])).with_relation("treats", [3i64]),
//!     Item::new(3, Vector::new(vec![0.0, 1.0])),
//! ];
//! let distances = distances_semantic(&items).unwrap();
//! let pool = ItemPool::excluding(&items, &items[0].id);
//! let allowed: IdSet = [ItemId::Integer(3)].into_iter().collect();
//!
//! let ranked = infer(&InferenceConfig::default(), &items[0], &pool, &distances, &allowed, "treats").unwrap();
//! assert_eq!(ranked[0].target_id, ItemId::Integer(3));
//! ```
//!
//! ## Crate Structure
//!
//! - `tsr-core` - Items, distance index, route search and scoring modes
//! - `tsr-storage` - JSON corpus loading and append-only CSV results
//! - `tsr-eval` - Explicit, implicit and provenance harnesses

// Re-export core types
pub use tsr_core::{
    distances_semantic, infer, items_with_relations, min_max_rescale, score_routes,
    DistanceIndex, Error, IdSet, InferenceConfig, Item, ItemId, ItemPool, Neighbour,
    Result, Route, RouteFinder, ScoringMode, TargetAggregate, Vector,
};

// Re-export storage
pub use tsr_storage::{append_records, dataset_name, load_corpus, parse_corpus};

// Re-export harnesses
pub use tsr_eval::{
    explicit, implicit, metrics, provenance, ExplicitConfig, ExplicitReport, ImplicitConfig,
    ImplicitReport, ProvenanceConfig,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        distances_semantic, infer, load_corpus, DistanceIndex, Error, IdSet, InferenceConfig,
        Item, ItemId, ItemPool, Result, ScoringMode, TargetAggregate, Vector,
    };
}

//! # TSR Core
//!
//! Core library for TSR (Two-Step Relation inference).
//!
//! Given items with embeddings and a few explicit relation labels, TSR ranks
//! candidate targets for a query by the routes leading to them:
//! query → labelled item close to the query → one of its labelled relations
//! (→ an allowed item close to that relation).
//!
//! - [`DistanceIndex`] - Ascending cosine distance ranking of every item
//! - [`ItemPool`] - Id lookup over the items a query may route through
//! - [`RouteFinder`] - The bounded two/three-hop route search
//! - [`score_routes`] - Per-target aggregation with one of the [`ScoringMode`]s
//!
//! ## Example
//!
//! ```rust
//! use tsr_core::{distances_semantic, infer, IdSet, InferenceConfig, Item, ItemId, ItemPool, ScoringMode, Vector};
//!
//! let items = vec![
//!     Item::new(1, Vector::new(vec![1.0, 0.0])),
//!     Item::new(2, Vector::new(vec![0.6, 0.8])).with_relation("treats", [3i64]),
//!     Item::new(3, Vector::new(vec![0.0, 1.0])),
//! ];
//! let distances = distances_semantic(&items).unwrap();
//! let pool = ItemPool::excluding(&items, &ItemId::Integer(1));
//! let allowed: IdSet = [ItemId::Integer(3)].into_iter().collect();
//!
//! let config = InferenceConfig::new(Some(5), Some(10), ScoringMode::A);
//! let ranked = infer(&config, &items[0], &pool, &distances, &allowed, "treats").unwrap();
//! assert_eq!(ranked[0].target_id, ItemId::Integer(3));
//! ```

pub mod distance;
pub mod error;
pub mod item;
pub mod pool;
pub mod route;
pub mod scoring;
pub mod vector;

pub use distance::{distances_semantic, DistanceIndex, Neighbour};
pub use error::{Error, Result};
pub use item::{items_with_relations, IdSet, Item, ItemId};
pub use pool::ItemPool;
pub use route::{infer, InferenceConfig, Route, RouteFinder};
pub use scoring::{min_max_rescale, score_routes, ScoringMode, TargetAggregate};
pub use vector::Vector;

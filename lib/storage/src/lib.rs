//! # TSR Storage
//!
//! Reading item corpora and persisting evaluation results.

pub mod corpus;
pub mod results;

pub use corpus::{dataset_name, load_corpus, parse_corpus};
pub use results::append_records;

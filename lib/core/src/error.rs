use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid embedding dimension for item {id}: expected {expected}, got {actual}")]
    InvalidDimension {
        id: String,
        expected: usize,
        actual: usize,
    },

    #[error("Empty embedding for item {0}")]
    EmptyEmbedding(String),

    #[error("Duplicate item id: {0}")]
    DuplicateItem(String),

    #[error("No distances indexed for item {0}")]
    MissingDistances(String),

    #[error("Unknown scoring mode: {0:?} (expected one of a, a*, b..q)")]
    UnknownScoringMode(String),

    #[error("Scoring mode {mode} cannot score a zero-distance route to item {target}")]
    ZeroDistance { mode: String, target: String },

    #[error("Invalid item: {0}")]
    InvalidItem(String),
}

//! Layout error types.

use thiserror::Error;

/// Error type returned by a sequence producer's `get`.
pub type ProducerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that fail a whole frame.
///
/// Every variant is fatal for the frame that produced it: the arena is
/// recycled and the next frame starts from a freshly built tree.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("nested lazy sequences are unsupported")]
    NestedSequence,

    #[error("compound z={z} carries both a vertical and a horizontal follow")]
    ConflictingAligners { z: u64 },

    #[error("sequence item {index} is a {kind}, expected a shape or compound")]
    InvalidSequenceItem { index: usize, kind: &'static str },

    #[error("sequence producer failed at item {index}: {source}")]
    Producer {
        index: usize,
        #[source]
        source: ProducerError,
    },

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LayoutError>;

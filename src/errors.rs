//! Error types for acc2tax

use thiserror::Error;

/// Result type alias for acc2tax operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A GI at or beyond the configured domain bound. Raised while loading
    /// (the index is undersized) and by checked lookups.
    #[error("GI out of range: {gi} (max GI entries {max_gi})")]
    GiOutOfRange { gi: u64, max_gi: u64 },

    /// The parent chain did not reach the root within the depth guard.
    #[error("lineage of taxon {taxid} exceeds {max_depth} hops, possible cycle in nodes data")]
    LineageTooDeep { taxid: u64, max_depth: usize },

    #[error("Configuration error: {0}")]
    Config(String),
}

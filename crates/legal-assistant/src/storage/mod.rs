pub mod persist;
pub mod uploads;

pub use persist::{load_index_files, remove_index_files, save_index_files, DENSE_FILE, META_FILE};
pub use uploads::ContractStorage;

use std::path::PathBuf;

/// Why a persisted index was rejected on reload.
#[derive(Debug, thiserror::Error)]
pub enum IndexLoadError {
    #[error("index file missing: {0}")]
    Missing(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dense index header is invalid")]
    BadHeader,

    #[error("dense index is truncated: expected {expected} bytes of vectors, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error("corrupt metadata record on line {line}: {reason}")]
    CorruptRecord { line: usize, reason: String },

    #[error("chunk count mismatch: dense index has {dense}, metadata has {meta}")]
    CountMismatch { dense: usize, meta: usize },

    #[error("embedding dimension mismatch: index has {found}, model produces {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("failed to rebuild lexical index: {0}")]
    Lexical(String),
}

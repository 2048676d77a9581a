pub mod chunker;
pub mod reader;
pub mod validity;

pub use chunker::LawChunker;
pub use reader::DocumentReader;
pub use validity::{filter_valid_laws, select_latest};

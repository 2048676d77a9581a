pub mod dense;
pub mod hybrid;
pub mod index;
pub mod text_search;

pub use dense::DenseIndex;
pub use hybrid::{union_candidates, HybridCandidate, HybridSource};
pub use index::LawIndex;
pub use text_search::LexicalIndex;

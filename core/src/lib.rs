pub mod external_sort;
pub mod extract;
pub mod forward;
pub mod index;
pub mod inspect;
pub mod inverted;
pub mod output;
pub mod persist;
pub mod pipeline;
pub mod postings;
pub mod query;
pub mod ranking;
pub mod registry;
pub mod search;
pub mod stats;
pub mod tokenizer;

pub type TermId = u32;
pub type DocId = u32;

pub use index::{ForwardRecord, TermInfo};
pub use ranking::RankingModel;
pub use search::SearchIndex;

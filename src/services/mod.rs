pub mod export;
pub mod fetcher;
pub mod merge;
pub mod providers;
pub mod query;
pub mod stats;

pub use fetcher::{Fetcher, SourceWarning};
pub use merge::{merge, MergeReport, NoMatch};

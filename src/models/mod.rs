pub mod query;
pub mod raw;
pub mod title;

pub use query::{PredicateSet, SortOrder};
pub use raw::{attr, RawCollection, RawRecord, IMDB_SOURCE, PRIMARY_SOURCE, SECONDARY_SOURCE};
pub use title::{to_raw_collection, Rating, TitleRecord, TitleType};

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    cache::DatasetCache,
    services::{providers::MetadataSource, Fetcher},
};

/// Shared application state
///
/// The single mutex serializes interactions: each request holds it from fetch
/// through render, so the cache never sees concurrent callers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<Mutex<DatasetCache>>,
}

impl AppState {
    pub fn new(cache: DatasetCache) -> Self {
        Self {
            cache: Arc::new(Mutex::new(cache)),
        }
    }

    /// Builds state around a catalog source and a ratings source
    pub fn from_sources(
        primary: Arc<dyn MetadataSource>,
        secondary: Arc<dyn MetadataSource>,
    ) -> Self {
        Self::new(DatasetCache::new(Fetcher::new(primary, secondary)))
    }
}

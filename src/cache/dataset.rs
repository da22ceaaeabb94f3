use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    models::TitleRecord,
    services::{
        fetcher::{Fetcher, Snapshots, SourceWarning},
        merge::{self, NoMatch},
    },
};

/// The unified dataset for one session
#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    pub records: Vec<TitleRecord>,
    /// Sources that failed during the fetch
    pub warnings: Vec<SourceWarning>,
    /// Titles that received no enrichment
    pub unmatched: Vec<NoMatch>,
    pub fetched_at: DateTime<Utc>,
}

impl Dataset {
    /// Merges a fetch cycle's snapshots into a dataset
    pub fn from_snapshots(snapshots: Snapshots) -> Self {
        let Snapshots {
            primary,
            secondary,
            warnings,
        } = snapshots;

        let (records, unmatched) = match primary {
            Some(primary) => {
                let report = merge::merge(&primary, secondary.as_ref());
                if !report.rejected.is_empty() {
                    tracing::warn!(
                        rejected = report.rejected.len(),
                        "Catalog records dropped during merge"
                    );
                }
                (report.records, report.unmatched)
            }
            None => (Vec::new(), Vec::new()),
        };

        Self {
            records,
            warnings,
            unmatched,
            fetched_at: Utc::now(),
        }
    }
}

/// Holds the merged dataset for the session
///
/// The first `get` fetches and merges; later calls return the held copy until
/// `invalidate`. Failed fetches are held too, so nothing is retried until the user
/// asks for a refresh.
pub struct DatasetCache {
    fetcher: Fetcher,
    held: Option<Dataset>,
}

impl DatasetCache {
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            held: None,
        }
    }

    pub async fn get(&mut self) -> &Dataset {
        let dataset = match self.held.take() {
            Some(dataset) => dataset,
            None => {
                tracing::info!("Dataset not loaded, fetching from upstream sources");
                let dataset = Dataset::from_snapshots(self.fetcher.fetch().await);
                tracing::info!(
                    records = dataset.records.len(),
                    unmatched = dataset.unmatched.len(),
                    warnings = dataset.warnings.len(),
                    "Dataset loaded"
                );
                dataset
            }
        };

        self.held.insert(dataset)
    }

    pub fn invalidate(&mut self) {
        if self.held.take().is_some() {
            tracing::info!("Dataset invalidated");
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.held.is_some()
    }
}

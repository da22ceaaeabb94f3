use serde::Serialize;
use std::sync::Arc;

use crate::{
    models::RawCollection,
    services::providers::{FetchRequest, MetadataSource},
};

/// A source that failed during a fetch cycle, surfaced to the user as a banner
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceWarning {
    pub service: String,
    pub message: String,
}

/// Raw snapshots from one fetch cycle; a failed source is `None`
#[derive(Debug, Clone, Default)]
pub struct Snapshots {
    pub primary: Option<RawCollection>,
    pub secondary: Option<RawCollection>,
    pub warnings: Vec<SourceWarning>,
}

/// Pulls the catalog, then the ratings for whatever the catalog returned
///
/// Failures never propagate: a failed source contributes nothing and leaves a warning.
#[derive(Clone)]
pub struct Fetcher {
    primary: Arc<dyn MetadataSource>,
    secondary: Arc<dyn MetadataSource>,
}

impl Fetcher {
    pub fn new(primary: Arc<dyn MetadataSource>, secondary: Arc<dyn MetadataSource>) -> Self {
        Self { primary, secondary }
    }

    pub async fn fetch(&self) -> Snapshots {
        let mut snapshots = Snapshots::default();

        let catalog = match self.primary.fetch_catalog(&FetchRequest::catalog()).await {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    provider = self.primary.name(),
                    "Catalog fetch failed"
                );
                snapshots.warnings.push(SourceWarning {
                    service: self.primary.name().to_string(),
                    message: e.to_string(),
                });
                return snapshots;
            }
        };

        let request = FetchRequest::enrichment_for(&catalog);
        snapshots.primary = Some(catalog);

        match self.secondary.fetch_catalog(&request).await {
            Ok(ratings) => snapshots.secondary = Some(ratings),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    provider = self.secondary.name(),
                    "Ratings fetch failed, continuing without enrichment"
                );
                snapshots.warnings.push(SourceWarning {
                    service: self.secondary.name().to_string(),
                    message: e.to_string(),
                });
            }
        }

        snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{attr, RawRecord};
    use crate::services::providers::MockMetadataSource;

    fn catalog() -> RawCollection {
        RawCollection::new(
            "tmdb",
            vec![RawRecord::new("movie:1")
                .with(attr::TITLE, "Inception")
                .with(attr::TYPE, "movie")
                .with(attr::IMDB_ID, "tt1375666")],
        )
    }

    #[tokio::test]
    async fn test_both_sources_succeed() {
        let mut primary = MockMetadataSource::new();
        primary
            .expect_fetch_catalog()
            .times(1)
            .returning(|_| Ok(catalog()));
        primary.expect_name().return_const("tmdb");

        let mut secondary = MockMetadataSource::new();
        secondary
            .expect_fetch_catalog()
            .withf(|request| {
                request.lookups.len() == 1
                    && request.lookups[0].imdb_id.as_deref() == Some("tt1375666")
            })
            .times(1)
            .returning(|_| Ok(RawCollection::empty("omdb")));
        secondary.expect_name().return_const("omdb");

        let fetcher = Fetcher::new(Arc::new(primary), Arc::new(secondary));
        let snapshots = fetcher.fetch().await;

        assert!(snapshots.primary.is_some());
        assert!(snapshots.secondary.is_some());
        assert!(snapshots.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_secondary_failure_keeps_catalog() {
        let mut primary = MockMetadataSource::new();
        primary.expect_fetch_catalog().returning(|_| Ok(catalog()));
        primary.expect_name().return_const("tmdb");

        let mut secondary = MockMetadataSource::new();
        secondary
            .expect_fetch_catalog()
            .returning(|_| Err(AppError::external("omdb", "401 Unauthorized")));
        secondary.expect_name().return_const("omdb");

        let snapshots = Fetcher::new(Arc::new(primary), Arc::new(secondary))
            .fetch()
            .await;

        assert_eq!(snapshots.primary.map(|c| c.len()), Some(1));
        assert!(snapshots.secondary.is_none());
        assert_eq!(snapshots.warnings.len(), 1);
        assert_eq!(snapshots.warnings[0].service, "omdb");
    }

    #[tokio::test]
    async fn test_primary_failure_skips_secondary() {
        let mut primary = MockMetadataSource::new();
        primary
            .expect_fetch_catalog()
            .returning(|_| Err(AppError::external("tmdb", "connection refused")));
        primary.expect_name().return_const("tmdb");

        let mut secondary = MockMetadataSource::new();
        secondary.expect_fetch_catalog().times(0);
        secondary.expect_name().return_const("omdb");

        let snapshots = Fetcher::new(Arc::new(primary), Arc::new(secondary))
            .fetch()
            .await;

        assert!(snapshots.primary.is_none());
        assert!(snapshots.secondary.is_none());
        assert_eq!(snapshots.warnings[0].service, "tmdb");
        assert!(snapshots.warnings[0].message.contains("connection refused"));
    }
}

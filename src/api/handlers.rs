use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{
    cache::Dataset,
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{PredicateSet, SortOrder, TitleRecord, TitleType},
    services::{
        export::{self, EXPORT_FILE_NAME},
        query,
        stats::ViewStats,
        SourceWarning,
    },
};

use super::AppState;

// Request/Response types

/// Filter parameters shared by the listing, export and stats endpoints
///
/// List-valued parameters are comma-separated, e.g. `platforms=Netflix,Hulu`.
#[derive(Debug, Default, Deserialize)]
pub struct TitleQuery {
    pub q: Option<String>,
    pub platforms: Option<String>,
    pub genres: Option<String>,
    pub types: Option<String>,
    pub min_rating: Option<f64>,
    pub max_rating: Option<f64>,
    pub sort: Option<SortOrder>,
}

impl TitleQuery {
    pub fn predicates(&self) -> AppResult<PredicateSet> {
        let types = split_list(self.types.as_deref())
            .into_iter()
            .map(|value| {
                TitleType::parse(&value)
                    .ok_or_else(|| AppError::InvalidInput(format!("Unknown title type: {}", value)))
            })
            .collect::<AppResult<BTreeSet<_>>>()?;

        let predicates = PredicateSet {
            title_contains: self
                .q
                .as_deref()
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_string),
            platforms: split_list(self.platforms.as_deref()),
            genres: split_list(self.genres.as_deref()),
            types,
            min_rating: self.min_rating,
            max_rating: self.max_rating,
        };
        predicates.validate()?;

        Ok(predicates)
    }

    /// Applies the filters (and sort, if any) to the dataset
    fn apply<'a>(&self, dataset: &'a Dataset) -> AppResult<Vec<&'a TitleRecord>> {
        let predicates = self.predicates()?;
        let mut view = query::query(&dataset.records, &predicates);
        if let Some(order) = self.sort {
            query::sort(&mut view, order);
        }
        Ok(view)
    }
}

fn split_list(value: Option<&str>) -> BTreeSet<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Serialize)]
pub struct TitleListResponse {
    pub total: usize,
    pub records: Vec<TitleRecord>,
    /// Empty-state text shown when nothing matches
    pub message: Option<String>,
    pub warnings: Vec<SourceWarning>,
    pub unmatched_count: usize,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct DatasetSummary {
    pub total: usize,
    pub unmatched_count: usize,
    pub warnings: Vec<SourceWarning>,
    pub fetched_at: DateTime<Utc>,
}

impl From<&Dataset> for DatasetSummary {
    fn from(dataset: &Dataset) -> Self {
        Self {
            total: dataset.records.len(),
            unmatched_count: dataset.unmatched.len(),
            warnings: dataset.warnings.clone(),
            fetched_at: dataset.fetched_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FacetsResponse {
    pub platforms: Vec<String>,
    pub genres: Vec<String>,
    pub types: Vec<TitleType>,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Search and filter titles
pub async fn search_titles(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    WithRejection(Query(params), _): WithRejection<Query<TitleQuery>, AppError>,
) -> AppResult<Json<TitleListResponse>> {
    let mut cache = state.cache.lock().await;
    let dataset = cache.get().await;
    let view = params.apply(dataset)?;

    tracing::info!(
        request_id = %request_id,
        matched = view.len(),
        total = dataset.records.len(),
        "Title query completed"
    );

    let message = view
        .is_empty()
        .then(|| AppError::EmptyResult.to_string());

    Ok(Json(TitleListResponse {
        total: view.len(),
        records: view.into_iter().cloned().collect(),
        message,
        warnings: dataset.warnings.clone(),
        unmatched_count: dataset.unmatched.len(),
        fetched_at: dataset.fetched_at,
    }))
}

/// Download the filtered view as CSV
pub async fn export_titles(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    WithRejection(Query(params), _): WithRejection<Query<TitleQuery>, AppError>,
) -> AppResult<impl IntoResponse> {
    let mut cache = state.cache.lock().await;
    let dataset = cache.get().await;
    let view = params.apply(dataset)?;
    let body = export::to_csv_bytes(&view)?;

    tracing::info!(
        request_id = %request_id,
        rows = view.len(),
        bytes = body.len(),
        "CSV export generated"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
            ),
        ],
        body,
    ))
}

/// Chart data for the filtered view
pub async fn view_stats(
    State(state): State<AppState>,
    WithRejection(Query(params), _): WithRejection<Query<TitleQuery>, AppError>,
) -> AppResult<Json<ViewStats>> {
    let mut cache = state.cache.lock().await;
    let dataset = cache.get().await;
    let view = params.apply(dataset)?;
    Ok(Json(ViewStats::compute(&view)))
}

/// Options for the platform, genre and type selectors
pub async fn facets(State(state): State<AppState>) -> Json<FacetsResponse> {
    let mut cache = state.cache.lock().await;
    let dataset = cache.get().await;

    let mut platforms = BTreeSet::new();
    let mut genres = BTreeSet::new();
    let mut types = BTreeSet::new();
    for record in &dataset.records {
        platforms.extend(record.platforms.iter().cloned());
        genres.extend(record.genres.iter().cloned());
        types.insert(record.title_type);
    }

    Json(FacetsResponse {
        platforms: platforms.into_iter().collect(),
        genres: genres.into_iter().collect(),
        types: types.into_iter().collect(),
    })
}

/// Summary of the held dataset, loading it if needed
pub async fn dataset_summary(State(state): State<AppState>) -> Json<DatasetSummary> {
    let mut cache = state.cache.lock().await;
    Json(DatasetSummary::from(cache.get().await))
}

/// Drop the held dataset and fetch it again
pub async fn refresh(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> Json<DatasetSummary> {
    let mut cache = state.cache.lock().await;
    cache.invalidate();
    let summary = DatasetSummary::from(cache.get().await);

    tracing::info!(
        request_id = %request_id,
        total = summary.total,
        warnings = summary.warnings.len(),
        "Dataset refreshed"
    );

    Json(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        let values = split_list(Some(" Netflix, Apple TV ,,Hulu"));
        let values: Vec<_> = values.into_iter().collect();
        assert_eq!(values, vec!["Apple TV", "Hulu", "Netflix"]);
        assert!(split_list(None).is_empty());
    }

    #[test]
    fn test_query_to_predicates() {
        let params = TitleQuery {
            q: Some("  dark ".to_string()),
            platforms: Some("Netflix".to_string()),
            types: Some("movie,tv".to_string()),
            min_rating: Some(5.0),
            ..Default::default()
        };

        let predicates = params.predicates().unwrap();
        assert_eq!(predicates.title_contains.as_deref(), Some("dark"));
        assert!(predicates.platforms.contains("Netflix"));
        assert_eq!(predicates.types.len(), 2);
        assert_eq!(predicates.min_rating, Some(5.0));
    }

    #[test]
    fn test_blank_query_is_unrestricted() {
        let params = TitleQuery {
            q: Some("   ".to_string()),
            ..Default::default()
        };
        let predicates = tokio_test::assert_ok!(params.predicates());
        assert!(predicates.is_unrestricted());
    }

    #[test]
    fn test_unknown_type_rejected() {
        let params = TitleQuery {
            types: Some("podcast".to_string()),
            ..Default::default()
        };
        let error = tokio_test::assert_err!(params.predicates());
        assert!(matches!(error, AppError::InvalidInput(_)));
    }
}

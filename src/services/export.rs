use std::io::Write;

use crate::{
    error::{AppError, AppResult},
    models::TitleRecord,
};

/// File name offered for downloads
pub const EXPORT_FILE_NAME: &str = "streaming_content_data.csv";

pub const CSV_HEADER: [&str; 15] = [
    "id",
    "title",
    "type",
    "year",
    "platforms",
    "genres",
    "rating",
    "votes",
    "tmdb_rating",
    "popularity",
    "release_date",
    "overview",
    "imdb_id",
    "poster_path",
    "source_ids",
];

const LIST_SEPARATOR: &str = ", ";
const SOURCE_SEPARATOR: &str = "; ";

/// Writes one CSV row per record, preceded by the header
pub fn write_csv<W: Write>(writer: W, records: &[&TitleRecord]) -> AppResult<W> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(CSV_HEADER)?;

    for record in records {
        csv_writer.write_record(row(record))?;
    }

    csv_writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("Failed to flush CSV output: {}", e)))
}

/// Renders the view as CSV bytes; an empty view is an `EmptyResult`
pub fn to_csv_bytes(records: &[&TitleRecord]) -> AppResult<Vec<u8>> {
    if records.is_empty() {
        return Err(AppError::EmptyResult);
    }
    write_csv(Vec::new(), records)
}

fn row(record: &TitleRecord) -> [String; 15] {
    let join = |values: &std::collections::BTreeSet<String>| {
        values
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(LIST_SEPARATOR)
    };

    [
        record.id.clone(),
        record.title.clone(),
        record.title_type.as_str().to_string(),
        record.year.map(|y| y.to_string()).unwrap_or_default(),
        join(&record.platforms),
        join(&record.genres),
        number(record.rating.map(|r| r.value())),
        record.votes.map(|v| v.to_string()).unwrap_or_default(),
        number(record.tmdb_rating),
        number(record.popularity),
        record.release_date.clone().unwrap_or_default(),
        record.overview.clone().unwrap_or_default(),
        record.imdb_id().unwrap_or_default().to_string(),
        record.poster_path.clone().unwrap_or_default(),
        record
            .source_ids
            .iter()
            .map(|(source, id)| format!("{}={}", source, id))
            .collect::<Vec<_>>()
            .join(SOURCE_SEPARATOR),
    ]
}

/// Full precision; blank when unset
fn number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

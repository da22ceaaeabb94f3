//! Aggregates over a filtered view, shaped for charting.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{Rating, TitleRecord, TitleType};

/// Bins used by the rating histogram over [0, 10]
pub const HISTOGRAM_BINS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformCount {
    pub platform: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformRating {
    pub platform: String,
    pub average_rating: f64,
    pub rated_titles: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreCount {
    pub genre: String,
    #[serde(rename = "type")]
    pub title_type: TitleType,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// All chart series for one view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewStats {
    pub total: usize,
    pub platform_distribution: Vec<PlatformCount>,
    pub average_rating_by_platform: Vec<PlatformRating>,
    pub genre_by_type: Vec<GenreCount>,
    pub rating_histogram: Vec<HistogramBin>,
}

impl ViewStats {
    pub fn compute(view: &[&TitleRecord]) -> Self {
        Self {
            total: view.len(),
            platform_distribution: platform_distribution(view),
            average_rating_by_platform: average_rating_by_platform(view),
            genre_by_type: genre_by_type(view),
            rating_histogram: rating_histogram(view, HISTOGRAM_BINS),
        }
    }
}

/// Titles per platform, most common first; a title on two platforms counts for both
pub fn platform_distribution(view: &[&TitleRecord]) -> Vec<PlatformCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in view {
        for platform in &record.platforms {
            *counts.entry(platform.as_str()).or_default() += 1;
        }
    }

    let mut distribution: Vec<PlatformCount> = counts
        .into_iter()
        .map(|(platform, count)| PlatformCount {
            platform: platform.to_string(),
            count,
        })
        .collect();
    distribution.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.platform.cmp(&b.platform)));
    distribution
}

/// Mean rating per platform over rated titles, highest first
pub fn average_rating_by_platform(view: &[&TitleRecord]) -> Vec<PlatformRating> {
    let mut sums: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for record in view {
        let Some(rating) = record.rating else {
            continue;
        };
        for platform in &record.platforms {
            let entry = sums.entry(platform.as_str()).or_default();
            entry.0 += rating.value();
            entry.1 += 1;
        }
    }

    let mut averages: Vec<PlatformRating> = sums
        .into_iter()
        .map(|(platform, (sum, n))| PlatformRating {
            platform: platform.to_string(),
            average_rating: sum / n as f64,
            rated_titles: n,
        })
        .collect();
    averages.sort_by(|a, b| {
        b.average_rating
            .total_cmp(&a.average_rating)
            .then_with(|| a.platform.cmp(&b.platform))
    });
    averages
}

/// Title counts per (genre, type), ordered by genre then type
pub fn genre_by_type(view: &[&TitleRecord]) -> Vec<GenreCount> {
    let mut counts: BTreeMap<(&str, TitleType), usize> = BTreeMap::new();
    for record in view {
        for genre in &record.genres {
            *counts.entry((genre.as_str(), record.title_type)).or_default() += 1;
        }
    }

    counts
        .into_iter()
        .map(|((genre, title_type), count)| GenreCount {
            genre: genre.to_string(),
            title_type,
            count,
        })
        .collect()
}

/// Equal-width histogram of ratings over [0, 10]; a 10.0 lands in the last bin
pub fn rating_histogram(view: &[&TitleRecord], bins: usize) -> Vec<HistogramBin> {
    if bins == 0 {
        return Vec::new();
    }

    let width = (Rating::MAX - Rating::MIN) / bins as f64;
    let mut counts = vec![0usize; bins];
    for rating in view.iter().filter_map(|r| r.rating) {
        let slot = ((rating.value() - Rating::MIN) / width).floor() as usize;
        counts[slot.min(bins - 1)] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: Rating::MIN + width * i as f64,
            upper: Rating::MIN + width * (i + 1) as f64,
            count,
        })
        .collect()
}

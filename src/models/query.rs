use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{AppError, AppResult};

use super::title::{Rating, TitleType};

/// The combined set of active user filters for one query
///
/// Unset options and empty sets do not filter. Active options combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredicateSet {
    /// Case-insensitive substring match against the title
    pub title_contains: Option<String>,
    /// Record passes when its platforms intersect this set
    #[serde(default)]
    pub platforms: BTreeSet<String>,
    /// Record passes when its genres intersect this set
    #[serde(default)]
    pub genres: BTreeSet<String>,
    /// Record passes when its type is in this set
    #[serde(default)]
    pub types: BTreeSet<TitleType>,
    /// Record passes when its rating is present and at least this value
    pub min_rating: Option<f64>,
    /// Record passes when its rating is present and at most this value
    pub max_rating: Option<f64>,
}

impl PredicateSet {
    /// True when no option would exclude anything
    pub fn is_unrestricted(&self) -> bool {
        self.title_contains
            .as_deref()
            .map_or(true, |s| s.trim().is_empty())
            && self.platforms.is_empty()
            && self.genres.is_empty()
            && self.types.is_empty()
            && self.min_rating.is_none()
            && self.max_rating.is_none()
    }

    pub fn validate(&self) -> AppResult<()> {
        for (name, bound) in [("min_rating", self.min_rating), ("max_rating", self.max_rating)] {
            if let Some(value) = bound {
                if !value.is_finite() {
                    return Err(AppError::InvalidInput(format!(
                        "{} must be a finite number",
                        name
                    )));
                }
                if !(Rating::MIN..=Rating::MAX).contains(&value) {
                    return Err(AppError::InvalidInput(format!(
                        "{} must be between {} and {}",
                        name,
                        Rating::MIN,
                        Rating::MAX
                    )));
                }
            }
        }

        if let (Some(min), Some(max)) = (self.min_rating, self.max_rating) {
            if min > max {
                return Err(AppError::InvalidInput(
                    "min_rating cannot exceed max_rating".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Result orderings offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    RatingDesc,
    RatingAsc,
    TitleAsc,
    TitleDesc,
    ReleaseNewest,
    ReleaseOldest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unrestricted() {
        assert!(PredicateSet::default().is_unrestricted());

        let blank_search = PredicateSet {
            title_contains: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(blank_search.is_unrestricted());
    }

    #[test]
    fn test_min_rating_is_restriction() {
        let predicates = PredicateSet {
            min_rating: Some(5.0),
            ..Default::default()
        };
        assert!(!predicates.is_unrestricted());
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let predicates = PredicateSet {
            min_rating: Some(8.0),
            max_rating: Some(6.0),
            ..Default::default()
        };
        assert!(matches!(
            predicates.validate(),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_rejects_out_of_scale() {
        let predicates = PredicateSet {
            min_rating: Some(12.0),
            ..Default::default()
        };
        assert!(predicates.validate().is_err());
    }

    #[test]
    fn test_sort_order_serde() {
        let order: SortOrder = serde_json::from_str("\"release_newest\"").unwrap();
        assert_eq!(order, SortOrder::ReleaseNewest);
    }
}

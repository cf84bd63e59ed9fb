use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Deserialize;

use crate::errors::LoadError;

/// One review row, coerced to its column types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
    pub region: String,
    pub rating: i32,
    pub text: String,
}

/// Raw CSV row. Everything is read as text first; `created_at` and `rating`
/// are coerced afterwards.
#[derive(Debug, Deserialize)]
struct RawReview {
    id: String,
    created_at: String,
    user_id: String,
    region: String,
    rating: String,
    text: String,
}

/// Read all reviews from a CSV file, coercing `created_at` to a timestamp and
/// `rating` to an integer.
///
/// All validation happens here, before any store interaction.
///
/// # Errors
/// Returns `MissingResource` if the file does not exist, `Csv` if it cannot be
/// decoded, and `TypeCoercion` on the first unparseable value.
pub fn read_reviews(path: &Path) -> Result<Vec<ReviewRecord>, LoadError> {
    if !path.exists() {
        return Err(LoadError::MissingResource {
            kind: "CSV file",
            path: path.to_path_buf(),
        });
    }

    let mut reader = csv::Reader::from_path(path).map_err(|source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reviews = vec![];
    for (idx, raw) in reader.deserialize::<RawReview>().enumerate() {
        // Data rows are 1-based, excluding the header.
        let row = idx + 1;
        let raw = raw.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

        let created_at =
            parse_timestamp(&raw.created_at).ok_or_else(|| LoadError::TypeCoercion {
                row,
                column: "created_at",
                value: raw.created_at.clone(),
                reason: "not a recognized timestamp".into(),
            })?;
        let rating = raw
            .rating
            .trim()
            .parse::<i32>()
            .map_err(|err| LoadError::TypeCoercion {
                row,
                column: "rating",
                value: raw.rating.clone(),
                reason: err.to_string(),
            })?;

        reviews.push(ReviewRecord {
            id: raw.id,
            created_at,
            user_id: raw.user_id,
            region: raw.region,
            rating,
            text: raw.text,
        });
    }

    Ok(reviews)
}

/// Accepts RFC 3339 as well as the bare date-time forms the source data uses.
/// Timestamps without an offset are taken as UTC.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

//! Affirmation content: loading, normalization, and the per-area pool.
//!
//! The source document is a JSON array of `{ id?, tags?, text }` records,
//! read from a file path or fetched from an `http(s)://` URL. Each record is
//! filed under its first tag that names a known [`Area`], else `general`.
//! Records whose text is missing or blank are dropped, and each area keeps
//! only the first occurrence of a given text.
//!
//! Loading never fails from the caller's point of view: a document that
//! cannot be read or parsed is replaced by an embedded sample set, and the
//! [`LoadOutcome`] carries a one-line notice for the user.

use crate::area::Area;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

const SAMPLE: &str = include_str!("sample.json");

/// Last-resort text when even the embedded sample is unusable.
pub const LOAD_FAILED_TEXT: &str = "Affirmations failed to load.";

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a JSON array of affirmation records")]
    NotArray,
    #[error("no usable affirmations in the document")]
    Empty,
}

/// One normalized affirmation, as read from the content document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AffirmationRecord {
    /// Externally supplied id. Permalinks always use the derived id instead.
    #[serde(default, deserialize_with = "string_or_none")]
    pub id: Option<String>,
    /// Only string entries are kept; anything but an array reads as no tags.
    #[serde(default, deserialize_with = "string_entries")]
    pub tags: Vec<String>,
    pub text: String,
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn string_entries<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect())
}

impl AffirmationRecord {
    /// First tag naming a known area, else `general`.
    pub fn area(&self) -> Area {
        self.tags
            .iter()
            .find_map(|tag| Area::from_key(tag))
            .unwrap_or_default()
    }
}

/// Parse a content document into records, trimming text and dropping rows
/// that are malformed or blank.
pub fn parse_records(json: &str) -> Result<Vec<AffirmationRecord>, ContentError> {
    let doc: Value = serde_json::from_str(json)?;
    let Value::Array(rows) = doc else {
        return Err(ContentError::NotArray);
    };

    let records = rows
        .into_iter()
        .filter_map(|row| match serde_json::from_value::<AffirmationRecord>(row) {
            Ok(record) => {
                let text = record.text.trim().to_string();
                (!text.is_empty()).then_some(AffirmationRecord { text, ..record })
            }
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed record");
                None
            }
        })
        .collect();
    Ok(records)
}

/// Affirmation texts grouped by area, deduplicated within each area in first
/// occurrence order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pool {
    areas: BTreeMap<Area, Vec<String>>,
}

impl Pool {
    /// Build a pool from records. If nothing was filed under `general`, it is
    /// filled with every other area's texts so the fallback is never empty.
    pub fn from_records(records: impl IntoIterator<Item = AffirmationRecord>) -> Self {
        let mut pool = Pool::default();
        let mut seen = HashSet::new();
        for record in records {
            let area = record.area();
            if seen.insert((area, record.text.clone())) {
                pool.areas.entry(area).or_default().push(record.text);
            }
        }

        if pool.area(Area::General).is_empty() {
            let mut general_seen = HashSet::new();
            let everything: Vec<String> = pool
                .areas
                .values()
                .flatten()
                .filter(|text| general_seen.insert(text.as_str()))
                .cloned()
                .collect();
            if !everything.is_empty() {
                pool.areas.insert(Area::General, everything);
            }
        }
        pool
    }

    /// The embedded sample set.
    pub fn sample() -> Self {
        pool_from_json(SAMPLE).unwrap_or_else(|_| {
            Pool::from_records([AffirmationRecord {
                id: None,
                tags: Vec::new(),
                text: LOAD_FAILED_TEXT.to_string(),
            }])
        })
    }

    /// Texts filed under exactly `area`, possibly empty.
    pub fn area(&self, area: Area) -> &[String] {
        self.areas.get(&area).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sub-pool to pick from for `area`: its own texts, or the `general`
    /// sub-pool when it has none.
    pub fn for_area(&self, area: Area) -> &[String] {
        let own = self.area(area);
        if own.is_empty() {
            self.area(Area::General)
        } else {
            own
        }
    }

    pub fn is_empty(&self) -> bool {
        self.areas.values().all(Vec::is_empty)
    }

    /// Total entries across areas. A text filed under two areas counts twice.
    pub fn len(&self) -> usize {
        self.areas.values().map(Vec::len).sum()
    }

    /// Every `(area, text)` pair, areas in menu order.
    pub fn iter(&self) -> impl Iterator<Item = (Area, &str)> {
        self.areas
            .iter()
            .flat_map(|(area, texts)| texts.iter().map(move |t| (*area, t.as_str())))
    }

    /// Entry count per area, in menu order, including empty areas.
    pub fn counts(&self) -> Vec<(Area, usize)> {
        Area::ALL
            .into_iter()
            .map(|area| (area, self.area(area).len()))
            .collect()
    }
}

/// Parse a document straight into a non-empty pool.
pub fn pool_from_json(json: &str) -> Result<Pool, ContentError> {
    let pool = Pool::from_records(parse_records(json)?);
    if pool.is_empty() {
        return Err(ContentError::Empty);
    }
    Ok(pool)
}

/// Result of [`load_pool`].
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub pool: Pool,
    /// One-line notice shown when the embedded sample is in use.
    pub notice: Option<String>,
}

/// Load the pool from `source`, falling back to the embedded sample.
pub async fn load_pool(source: &str) -> LoadOutcome {
    let loaded = match fetch_document(source).await {
        Ok(doc) => pool_from_json(&doc),
        Err(e) => Err(e),
    };
    match loaded {
        Ok(pool) => {
            tracing::info!(source, entries = pool.len(), "affirmations loaded");
            LoadOutcome { pool, notice: None }
        }
        Err(e) => {
            tracing::warn!(source, error = %e, "content load failed, using embedded sample");
            LoadOutcome {
                pool: Pool::sample(),
                notice: Some(format!(
                    "Could not load {source}. Check the file path and JSON format."
                )),
            }
        }
    }
}

/// Load and parse records without any fallback. Used by `check`.
pub async fn load_records(source: &str) -> Result<Vec<AffirmationRecord>, ContentError> {
    let doc = fetch_document(source).await?;
    parse_records(&doc)
}

async fn fetch_document(source: &str) -> Result<String, ContentError> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let body = reqwest::get(source)
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    } else {
        Ok(tokio::fs::read_to_string(source).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(tags: &[&str], text: &str) -> AffirmationRecord {
        AffirmationRecord {
            id: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            text: text.to_string(),
        }
    }

    // =========================================================================
    // parse_records
    // =========================================================================

    #[test]
    fn trims_and_drops_blank_text() {
        let records = parse_records(
            r#"[
                {"tags": ["seo"], "text": "  Sitemaps are suggestions.  "},
                {"tags": ["seo"], "text": "   "},
                {"tags": ["seo"]},
                {"text": 42},
                "not a record",
                {"id": "x1", "text": "Ship it."}
            ]"#,
        )
        .unwrap();
        assert_eq!(
            records,
            vec![
                record(&["seo"], "Sitemaps are suggestions."),
                AffirmationRecord {
                    id: Some("x1".into()),
                    tags: vec![],
                    text: "Ship it.".into(),
                },
            ]
        );
    }

    #[test]
    fn odd_tags_never_drop_a_record() {
        let records = parse_records(
            r#"[
                {"tags": [null, "seo"], "text": "A"},
                {"tags": "brand", "text": "B"},
                {"tags": null, "text": "C"},
                {"id": 17, "tags": [{"k": 1}, 3], "text": "D"}
            ]"#,
        )
        .unwrap();
        assert_eq!(
            records,
            vec![
                record(&["seo"], "A"),
                record(&[], "B"),
                record(&[], "C"),
                record(&[], "D"),
            ]
        );

        let pool = Pool::from_records(records);
        assert_eq!(pool.area(Area::Seo), ["A"]);
        assert_eq!(pool.area(Area::General), ["B", "C", "D"]);
    }

    #[test]
    fn non_array_document_is_rejected() {
        assert!(matches!(
            parse_records(r#"{"text": "hi"}"#),
            Err(ContentError::NotArray)
        ));
        assert!(matches!(parse_records("[oops"), Err(ContentError::Json(_))));
    }

    #[test]
    fn first_known_tag_wins() {
        assert_eq!(record(&["nope", "brand", "seo"], "x").area(), Area::Brand);
        assert_eq!(record(&["Brand"], "x").area(), Area::General);
        assert_eq!(record(&[], "x").area(), Area::General);
    }

    // =========================================================================
    // Pool
    // =========================================================================

    #[test]
    fn dedupes_within_area_preserving_order() {
        let pool = Pool::from_records([
            record(&["general"], "b"),
            record(&["general"], "a"),
            record(&["general"], "b"),
            record(&["seo"], "b"),
        ]);
        assert_eq!(pool.area(Area::General), ["b", "a"]);
        assert_eq!(pool.area(Area::Seo), ["b"]);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn empty_area_falls_back_to_general() {
        let pool = Pool::from_records([record(&["general"], "g1"), record(&["seo"], "s1")]);
        assert_eq!(pool.for_area(Area::Events), pool.area(Area::General));
        assert_eq!(pool.for_area(Area::Seo), ["s1"]);
    }

    #[test]
    fn general_is_filled_when_nothing_was_filed_there() {
        let pool = Pool::from_records([
            record(&["seo"], "s1"),
            record(&["brand"], "b1"),
            record(&["social"], "s1"),
        ]);
        assert_eq!(pool.area(Area::General), ["b1", "s1"]);
        assert!(!pool.for_area(Area::Growth).is_empty());
    }

    #[test]
    fn sample_covers_every_area() {
        let pool = Pool::sample();
        for (area, count) in pool.counts() {
            assert!(count > 0, "{area} is empty in the sample");
        }
        assert!(
            pool.area(Area::Seo)
                .iter()
                .any(|t| t == "Sitemaps are suggestions.")
        );
    }

    #[test]
    fn iter_yields_area_text_pairs() {
        let pool = Pool::from_records([record(&["general"], "g"), record(&["seo"], "s")]);
        let pairs: Vec<_> = pool.iter().collect();
        assert_eq!(pairs, vec![(Area::General, "g"), (Area::Seo, "s")]);
    }

    // =========================================================================
    // load_pool
    // =========================================================================

    #[tokio::test]
    async fn loads_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("affirmations.json");
        std::fs::write(&path, r#"[{"tags":["email"],"text":"Someone opened it."}]"#).unwrap();
        let outcome = load_pool(path.to_str().unwrap()).await;
        assert!(outcome.notice.is_none());
        assert_eq!(outcome.pool.area(Area::Email), ["Someone opened it."]);
        assert_eq!(outcome.pool.area(Area::General), ["Someone opened it."]);
    }

    #[tokio::test]
    async fn missing_file_uses_sample_with_notice() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("missing.json");
        let outcome = load_pool(path.to_str().unwrap()).await;
        assert_eq!(outcome.pool, Pool::sample());
        assert!(outcome.notice.unwrap().starts_with("Could not load"));
    }

    #[tokio::test]
    async fn document_without_usable_records_uses_sample() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("affirmations.json");
        std::fs::write(&path, r#"[{"text":"   "}]"#).unwrap();
        let outcome = load_pool(path.to_str().unwrap()).await;
        assert!(outcome.notice.is_some());
        assert!(!outcome.pool.is_empty());
    }
}

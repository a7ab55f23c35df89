//! Paper records and their per-store projections.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Date format used by the corpus `update_date` field.
pub const UPDATE_DATE_FORMAT: &str = "%Y-%m-%d";

/// One paper record from the corpus.
///
/// Fields the benchmarks do not read directly are kept in `extra` so the
/// document store can embed the full record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Paper {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub submitter: Option<String>,
    #[serde(default)]
    pub update_date: Option<String>,
    #[serde(default)]
    pub categories: Option<String>,
    #[serde(default)]
    pub authors_parsed: Vec<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Paper {
    /// Parse a single corpus line.
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// Category tags, split on whitespace.
    pub fn category_list(&self) -> impl Iterator<Item = &str> {
        self.categories
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
    }

    /// Author names as stored in the relational `authors` table.
    pub fn author_display_names(&self) -> impl Iterator<Item = String> + '_ {
        self.authors_parsed
            .iter()
            .map(|parts| author_display_name(parts))
            .filter(|name| !name.is_empty())
    }

    /// Author names as used in Redis `author:<name>` keys.
    pub fn author_key_names(&self) -> impl Iterator<Item = String> + '_ {
        self.authors_parsed
            .iter()
            .map(|parts| author_key_name(parts))
            .filter(|name| !name.is_empty())
    }

    /// The update date, when present and well formed.
    pub fn parsed_update_date(&self) -> Option<NaiveDate> {
        self.update_date.as_deref().and_then(parse_update_date)
    }
}

/// `"<first> <last>"`, skipping empty parts.
pub fn author_display_name(parts: &[String]) -> String {
    name_parts(parts).collect::<Vec<_>>().join(" ")
}

/// `"<first>_<last>"` with inner spaces replaced, skipping empty parts.
pub fn author_key_name(parts: &[String]) -> String {
    name_parts(parts)
        .collect::<Vec<_>>()
        .join("_")
        .replace(' ', "_")
}

/// First then last name from a `[last, first, suffix]` triple.
fn name_parts(parts: &[String]) -> impl Iterator<Item = &str> {
    let last = parts.first().map(String::as_str);
    let first = parts.get(1).map(String::as_str);
    [first, last].into_iter().flatten().filter(|s| !s.is_empty())
}

/// Parse a corpus date, returning `None` for anything malformed.
pub fn parse_update_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), UPDATE_DATE_FORMAT).ok()
}

/// Minimal view of a stored paper, used by point reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperSnapshot {
    pub id: String,
    pub title: Option<String>,
    pub submitter: Option<String>,
}

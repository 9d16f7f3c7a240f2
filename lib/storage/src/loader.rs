//! Ingestion of product and matching dumps
//!
//! Catalog files show up in three shapes: a JSON array, one object per line,
//! or objects glued together with no separator at all (`{...}{...}`). Each
//! shape is a [`ParseStrategy`]; the first strategy that accepts the input
//! wins. Everything past this module only sees normalized records.

use prodsim_core::Product;
use rand::seq::SliceRandom;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::OnceLock;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

/// Raw records tagged with their position in the source
pub type Records = Vec<(usize, Value)>;

/// One way of reading a dump
pub trait ParseStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `None` when this strategy does not apply or fails as a whole.
    fn parse(&self, raw: &str) -> Option<Records>;
}

/// `[ {...}, {...} ]`
pub struct JsonArray;

/// One object per line. With `require_complete`, declines a result that
/// looks like a glued dump so the repair strategy gets a chance.
pub struct JsonLines {
    pub require_complete: bool,
}

/// `{...}{...}` repaired into an array
pub struct Concatenated;

impl ParseStrategy for JsonArray {
    fn name(&self) -> &'static str {
        "json-array"
    }

    fn parse(&self, raw: &str) -> Option<Records> {
        if !raw.starts_with('[') {
            return None;
        }
        parse_array(raw)
    }
}

impl ParseStrategy for JsonLines {
    fn name(&self) -> &'static str {
        "json-lines"
    }

    fn parse(&self, raw: &str) -> Option<Records> {
        let mut skipped = 0usize;
        let records: Records = raw
            .split('\n')
            .filter(|line| !line.is_empty())
            .enumerate()
            .filter_map(|(idx, line)| match serde_json::from_str::<Value>(line.trim()) {
                Ok(value) => Some((idx, value)),
                Err(e) => {
                    debug!("Skipping malformed line {}: {}", idx + 1, e);
                    skipped += 1;
                    None
                }
            })
            .collect();

        if skipped > 0 {
            warn!("Skipped {} malformed lines", skipped);
        }
        if self.require_complete && records.len() <= 1 && raw.contains("}{") {
            return None;
        }
        Some(records)
    }
}

impl ParseStrategy for Concatenated {
    fn name(&self) -> &'static str {
        "concatenated"
    }

    fn parse(&self, raw: &str) -> Option<Records> {
        if !raw.contains("}{") {
            return None;
        }
        let fixed = format!("[{}]", glue_pattern().replace_all(raw, "},{"));
        parse_array(&fixed)
    }
}

fn glue_pattern() -> &'static Regex {
    static GLUE: OnceLock<Regex> = OnceLock::new();
    GLUE.get_or_init(|| Regex::new(r"\}\s*\{").expect("glue pattern is valid"))
}

fn parse_array(raw: &str) -> Option<Records> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => Some(items.into_iter().enumerate().collect()),
        Ok(_) => None,
        Err(e) => {
            debug!("Not a JSON array: {}", e);
            None
        }
    }
}

static LINES_COMPLETE: JsonLines = JsonLines {
    require_complete: true,
};
static LINES_ANY: JsonLines = JsonLines {
    require_complete: false,
};

fn strategies() -> [&'static dyn ParseStrategy; 4] {
    [&JsonArray, &LINES_COMPLETE, &Concatenated, &LINES_ANY]
}

/// Run the strategy chain over a whole dump
pub fn parse_records(raw: &str) -> Records {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }
    for strategy in strategies() {
        if let Some(records) = strategy.parse(raw) {
            debug!("Parsed {} records as {}", records.len(), strategy.name());
            return records;
        }
    }
    Vec::new()
}

/// Parse and normalize a catalog dump
pub fn parse_catalog(raw: &str) -> Vec<Product> {
    parse_records(raw)
        .iter()
        .filter_map(|(pos, value)| Product::from_value(*pos, value))
        .collect()
}

/// Stream a line-delimited file and normalize every record.
///
/// A missing file reads as empty. Blank, malformed or rejected lines are
/// skipped.
pub async fn read_records<T, F>(path: &Path, normalize: F) -> std::io::Result<Vec<T>>
where
    F: Fn(&Value) -> Option<T>,
{
    let file = match tokio::fs::File::open(path).await {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("{} not found, treating as empty", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let mut lines = BufReader::new(file).lines();
    let mut rows = Vec::new();
    let mut skipped = 0usize;
    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(trimmed).ok().as_ref().and_then(&normalize) {
            Some(row) => rows.push(row),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!("{}: skipped {} unusable lines", path.display(), skipped);
    }
    Ok(rows)
}

/// Read a whole file, `None` if it does not exist
pub async fn read_optional(path: &Path) -> std::io::Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Lightweight product view for browsing raw samples
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleProduct {
    pub title: String,
    pub description: String,
    pub image: String,
}

impl SampleProduct {
    pub fn from_value(value: &Value) -> Option<Self> {
        let text = |key: &str| value.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
        let sample = Self {
            title: text("title"),
            description: text("description"),
            image: text("image"),
        };
        (!sample.title.is_empty() || !sample.description.is_empty()).then_some(sample)
    }

    fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle) || self.description.to_lowercase().contains(needle)
    }
}

/// Random sample of a dump, optionally narrowed by a substring query.
pub fn sample_products(raw: &str, query: Option<&str>, limit: usize) -> Vec<SampleProduct> {
    let needle = query.map(|q| q.trim().to_lowercase()).filter(|q| !q.is_empty());
    let mut items: Vec<SampleProduct> = parse_records(raw)
        .iter()
        .filter_map(|(_, value)| SampleProduct::from_value(value))
        .filter(|p| needle.as_deref().map_or(true, |n| p.matches(n)))
        .collect();
    items.shuffle(&mut rand::rng());
    items.truncate(limit);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn ids(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_parse_array() {
        let raw = r#"[{"id":"a","title":"A"},{"title":"B"},{"id":"x"}]"#;
        let products = parse_catalog(raw);
        assert_eq!(ids(&products), vec!["a", "prod-1"]);
    }

    #[test]
    fn test_parse_lines_skips_malformed() {
        let raw = "{\"id\":\"a\",\"title\":\"A\"}\nnot json\n\n{\"title\":\"C &amp; D\"}\r\n";
        let products = parse_catalog(raw);
        assert_eq!(ids(&products), vec!["a", "prod-2"]);
        assert_eq!(products[1].title, "C & D");
    }

    #[test]
    fn test_parse_concatenated_dump() {
        let raw = r#"{"id":"a","title":"A"}{"id":"b","title":"B"} {"id":"c","title":"C"}"#;
        let products = parse_catalog(raw);
        assert_eq!(ids(&products), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_concatenated_marker_with_many_lines_stays_lines() {
        let raw = "{\"id\":\"a\",\"title\":\"A\"}\n{\"id\":\"b\",\"title\":\"B\"}\n{\"id\":\"c\",\"title\":\"}{\"}";
        let products = parse_catalog(raw);
        assert_eq!(ids(&products), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_broken_array_falls_back() {
        assert!(parse_catalog("[{\"title\": ").is_empty());
        assert!(parse_catalog("").is_empty());
        assert!(parse_catalog("   \n  ").is_empty());
    }

    #[tokio::test]
    async fn test_read_records_streams_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{\"id\": \"a\"}}").unwrap();
        writeln!(file, "garbage").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "{{\"id\": \"b\"}}").unwrap();
        writeln!(file, "{{\"other\": 1}}").unwrap();

        let rows = read_records(file.path(), |v| v.get("id").and_then(Value::as_str).map(str::to_string))
            .await
            .unwrap();
        assert_eq!(rows, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_read_records_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let rows = read_records(&dir.path().join("nope.jsonl"), |v| Some(v.clone()))
            .await
            .unwrap();
        assert!(rows.is_empty());
        assert!(read_optional(&dir.path().join("nope.jsonl")).await.unwrap().is_none());
    }

    #[test]
    fn test_sample_products_filter_and_limit() {
        let raw = r#"[{"title":"Red Case"},{"title":"Blue cable","description":"USB"},{"description":"red strap"},{"image":"x"}]"#;
        let all = sample_products(raw, None, 200);
        assert_eq!(all.len(), 3);

        let red = sample_products(raw, Some(" RED "), 200);
        assert_eq!(red.len(), 2);
        assert!(red.iter().all(|p| p.title.contains("Red") || p.description.contains("red")));

        assert_eq!(sample_products(raw, None, 1).len(), 1);
    }
}

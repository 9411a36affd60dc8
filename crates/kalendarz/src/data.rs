use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

use crate::types::{DateKey, MarkedDates};

/// On-disk shape of the marked-dates file
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarkedDatesFile {
    #[serde(default)]
    offer_days: Vec<String>,

    #[serde(default)]
    order_days: Vec<String>,
}

/// Load offer and order days from a JSON file.
///
/// A missing file means no marked days. Entries that are not valid
/// `YYYY-MM-DD` dates are skipped with a warning.
pub fn load_marked_dates(path: &Path) -> Result<MarkedDates> {
    if !path.exists() {
        debug!(path = %path.display(), "No marked-dates file, starting empty");
        return Ok(MarkedDates::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let marked = parse_marked_dates(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    debug!(
        offers = marked.offer_days.len(),
        orders = marked.order_days.len(),
        "Loaded marked dates"
    );
    Ok(marked)
}

fn parse_marked_dates(content: &str) -> Result<MarkedDates> {
    let file: MarkedDatesFile = serde_json::from_str(content)?;
    Ok(MarkedDates::new(
        parse_keys(&file.offer_days, "offerDays"),
        parse_keys(&file.order_days, "orderDays"),
    ))
}

fn parse_keys<'a>(raw: &'a [String], field: &'a str) -> impl Iterator<Item = DateKey> + 'a {
    raw.iter().filter_map(move |s| match s.parse::<DateKey>() {
        Ok(key) => Some(key),
        Err(e) => {
            warn!(field, error = %e, "Skipping invalid date");
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn key(s: &str) -> DateKey {
        s.parse().unwrap()
    }

    #[test]
    fn test_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let marked = load_marked_dates(&temp_dir.path().join("calendar.json")).unwrap();
        assert_eq!(marked, MarkedDates::default());
    }

    #[test]
    fn test_load_both_sets() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("calendar.json");
        fs::write(
            &path,
            r#"{"offerDays":["2024-03-15","2024-03-16"],"orderDays":["2024-03-15"]}"#,
        )
        .unwrap();

        let marked = load_marked_dates(&path).unwrap();
        assert_eq!(marked.offer_days.len(), 2);
        assert!(marked.offer_days.contains(&key("2024-03-16")));
        assert_eq!(marked.order_days.len(), 1);
        assert!(marked.order_days.contains(&key("2024-03-15")));
    }

    #[test]
    fn test_fields_are_optional() {
        let marked = parse_marked_dates(r#"{"orderDays":["2024-01-02"]}"#).unwrap();
        assert!(marked.offer_days.is_empty());
        assert_eq!(marked.order_days.len(), 1);

        let marked = parse_marked_dates("{}").unwrap();
        assert_eq!(marked, MarkedDates::default());
    }

    #[test]
    fn test_invalid_entries_are_skipped() {
        let marked =
            parse_marked_dates(r#"{"offerDays":["2024-03-15","15/03/2024","2024-02-30",""]}"#)
                .unwrap();
        assert_eq!(marked.offer_days.len(), 1);
    }

    #[test]
    fn test_duplicates_collapse() {
        let marked = parse_marked_dates(r#"{"offerDays":["2024-03-15","2024-03-15"]}"#).unwrap();
        assert_eq!(marked.offer_days.len(), 1);
    }

    #[test]
    fn test_malformed_document_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("calendar.json");
        fs::write(&path, "not json").unwrap();

        let err = load_marked_dates(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}

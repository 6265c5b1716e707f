use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// One scripture passage and the commentary that explains it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pair {
    pub original: String,
    pub explanation: String,
}

impl Pair {
    pub fn new(original: impl Into<String>, explanation: impl Into<String>) -> Self {
        Pair {
            original: original.into(),
            explanation: explanation.into(),
        }
    }
}

/// One page of the stitched corpus, as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub page: u32,
    pub title: String,
    pub url: String,
    #[serde(alias = "pairs", default)]
    pub items: Vec<Pair>,
    /// Only ever set on intermediate output; null once stitching has finished.
    #[serde(default)]
    pub pending_explanation: Option<Pair>,
}

/// A single searchable pair, flattened with the page it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub page: u32,
    pub ordinal: usize,
    pub title: String,
    pub url: String,
    pub original: String,
    pub explanation: String,
}

impl Entry {
    /// Identity used to collapse duplicate hits.
    pub fn key(&self) -> (u32, usize) {
        (self.page, self.ordinal)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("corpus I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("corpus JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn save(path: &Path, records: &[CorpusRecord]) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(records)?;
    fs::write(path, json).map_err(io_err)?;
    info!("Saved {} pages to {}", records.len(), path.display());
    Ok(())
}

pub fn load(path: &Path) -> Result<Vec<CorpusRecord>, StoreError> {
    let raw = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut records: Vec<CorpusRecord> = serde_json::from_str(&raw)?;
    records.sort_by_key(|r| r.page);
    Ok(records)
}

/// Flatten records into search entries, skipping pairs that never got an explanation.
pub fn entries(records: &[CorpusRecord]) -> Vec<Entry> {
    records
        .iter()
        .flat_map(|r| {
            r.items
                .iter()
                .filter(|p| !p.original.is_empty() && !p.explanation.is_empty())
                .enumerate()
                .map(move |(ordinal, p)| Entry {
                    page: r.page,
                    ordinal,
                    title: r.title.clone(),
                    url: r.url.clone(),
                    original: p.original.clone(),
                    explanation: p.explanation.clone(),
                })
        })
        .collect()
}

pub fn total_pairs(records: &[CorpusRecord]) -> usize {
    records.iter().map(|r| r.items.len()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(page: u32, items: Vec<Pair>) -> CorpusRecord {
        CorpusRecord {
            page,
            title: format!("title {}", page),
            url: format!("https://example.org/{:03}/", page),
            items,
            pending_explanation: None,
        }
    }

    #[test]
    fn save_then_load_keeps_pages_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/corpus.json");
        let records = vec![
            record(2, vec![Pair::new("戒者防非", "謂能防止身口之非")]),
            record(1, vec![]),
        ];
        save(&path, &records).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].page, 1);
        assert_eq!(loaded[1].items[0].explanation, "謂能防止身口之非");
    }

    #[test]
    fn persisted_json_has_null_pending() {
        let json = serde_json::to_value(record(1, vec![])).unwrap();
        assert!(json["pending_explanation"].is_null());
        assert!(json["items"].is_array());
    }

    #[test]
    fn load_accepts_pairs_alias() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");
        fs::write(
            &path,
            r#"[{"page":1,"title":"t","url":"u","pairs":[{"original":"戒者","explanation":"防非止惡"}]}]"#,
        )
        .unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded[0].items.len(), 1);
        assert!(loaded[0].pending_explanation.is_none());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = load(Path::new("/nonexistent/corpus.json")).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn entries_skip_empty_explanations() {
        let records = vec![record(
            3,
            vec![
                Pair::new("甲乙", "解釋一"),
                Pair::new("丙丁", ""),
                Pair::new("戊己", "解釋二"),
            ],
        )];
        let e = entries(&records);
        assert_eq!(e.len(), 2);
        assert_eq!(e[1].key(), (3, 1));
        assert_eq!(e[1].original, "戊己");
    }
}

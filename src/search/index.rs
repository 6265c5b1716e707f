use std::collections::HashMap;

use super::tokenize::tokenize;
use crate::corpus::Entry;

/// Token → entries whose original text contains it. Built once, then read-only.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    buckets: HashMap<String, Vec<usize>>,
}

impl InvertedIndex {
    /// Index the original text of every entry. Bucket values are positions in `entries`.
    pub fn build(entries: &[Entry]) -> Self {
        let mut buckets: HashMap<String, Vec<usize>> = HashMap::new();
        for (pos, entry) in entries.iter().enumerate() {
            for token in tokenize(&entry.original) {
                let bucket = buckets.entry(token).or_default();
                if bucket.last() != Some(&pos) {
                    bucket.push(pos);
                }
            }
        }
        InvertedIndex { buckets }
    }

    pub fn lookup(&self, token: &str) -> &[usize] {
        self.buckets.get(token).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn keyword_count(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(page: u32, original: &str) -> Entry {
        Entry {
            page,
            ordinal: 0,
            title: String::new(),
            url: String::new(),
            original: original.to_string(),
            explanation: "解釋".to_string(),
        }
    }

    #[test]
    fn buckets_keep_insertion_order() {
        let entries = vec![entry(1, "持戒 清淨"), entry(2, "清淨 法身"), entry(3, "持戒")];
        let index = InvertedIndex::build(&entries);
        assert_eq!(index.lookup("持戒"), &[0, 2]);
        assert_eq!(index.lookup("清淨"), &[0, 1]);
        assert_eq!(index.keyword_count(), 3);
    }

    #[test]
    fn repeated_token_indexes_entry_once() {
        let entries = vec![entry(1, "持戒，持戒，持戒")];
        let index = InvertedIndex::build(&entries);
        assert_eq!(index.lookup("持戒"), &[0]);
    }

    #[test]
    fn explanation_is_not_indexed() {
        let index = InvertedIndex::build(&[entry(1, "持戒")]);
        assert!(index.lookup("解釋").is_empty());
    }

    #[test]
    fn empty_corpus() {
        let index = InvertedIndex::build(&[]);
        assert_eq!(index.keyword_count(), 0);
        assert!(index.lookup("持戒").is_empty());
    }
}

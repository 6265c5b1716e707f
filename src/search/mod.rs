pub mod index;
pub mod similarity;
pub mod tokenize;

use std::collections::HashMap;

use tracing::{debug, info};

use crate::corpus::{self, CorpusRecord, Entry};
use index::InvertedIndex;
use tokenize::tokenize;

/// Returned by [`SearchEngine::get_explanation`] when nothing matches.
pub const NO_EXPLANATION: &str = "未找到相關解釋";

/// Searches pair explanations through a keyword index over their originals.
pub struct SearchEngine {
    entries: Vec<Entry>,
    index: InvertedIndex,
}

impl SearchEngine {
    pub fn new(records: &[CorpusRecord]) -> Self {
        let entries = corpus::entries(records);
        let index = InvertedIndex::build(&entries);
        info!(
            "Search index built: {} keywords over {} passages",
            index.keyword_count(),
            entries.len()
        );
        SearchEngine { entries, index }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top `limit` passages for `query`, best first.
    pub fn search(&self, query: &str, limit: usize) -> Vec<&Entry> {
        self.ranked(query)
            .into_iter()
            .take(limit)
            .map(|(entry, _)| entry)
            .collect()
    }

    /// Every candidate with its score, best first. Ties keep the order in
    /// which candidates were first reached through the query tokens.
    pub fn ranked(&self, query: &str) -> Vec<(&Entry, f64)> {
        let tokens = tokenize(query);
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f64)> = Vec::new();
        let mut seen: HashMap<(u32, usize), usize> = HashMap::new();
        for token in &tokens {
            for &pos in self.index.lookup(token) {
                let entry = &self.entries[pos];
                let score = similarity::ratio(query, &entry.explanation);
                match seen.get(&entry.key()) {
                    Some(&slot) => {
                        if scored[slot].1 < score {
                            scored[slot].1 = score;
                        }
                    }
                    None => {
                        seen.insert(entry.key(), scored.len());
                        scored.push((pos, score));
                    }
                }
            }
        }

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        debug!("query {:?}: {} tokens, {} candidates", query, tokens.len(), scored.len());
        scored
            .into_iter()
            .map(|(pos, score)| (&self.entries[pos], score))
            .collect()
    }

    pub fn find_best_match(&self, query: &str) -> Option<&str> {
        self.search(query, 1)
            .first()
            .map(|entry| entry.explanation.as_str())
    }

    /// Best explanation for `query`, or [`NO_EXPLANATION`].
    pub fn get_explanation(&self, query: &str) -> String {
        if let Some(best) = self.find_best_match(query) {
            return best.to_string();
        }
        self.search(query, 3)
            .first()
            .map(|entry| entry.explanation.clone())
            .unwrap_or_else(|| NO_EXPLANATION.to_string())
    }
}

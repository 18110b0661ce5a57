//! Keyword Scorer: deterministic first-stage relevance signal.
//!
//! Algorithm:
//! 1. Lowercase the paper's title + abstract
//! 2. For each phrase in the weight table, test for a case-insensitive substring hit
//! 3. Sum the weights of every phrase that hits, once per phrase
//!
//! Overlapping phrases ("click" and "click model") both contribute; no
//! longest-match suppression.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A phrase from the weight table found in the paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordMatch {
    pub phrase: String,
    pub weight: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordScore {
    pub score: u32,
    pub matches: Vec<KeywordMatch>,
}

impl KeywordScore {
    /// Human-readable match list, e.g. `Found 'retrieval' (+2)`.
    pub fn reasons(&self) -> Vec<String> {
        self.matches
            .iter()
            .map(|m| format!("Found '{}' (+{})", m.phrase, m.weight))
            .collect()
    }
}

/// Scores `text` against the weight table and reports which phrases hit.
/// Matches come out in weight-table order.
pub fn score(text: &str, weights: &BTreeMap<String, u32>) -> KeywordScore {
    let haystack = text.to_lowercase();
    let mut result = KeywordScore::default();

    for (phrase, &weight) in weights {
        let needle = phrase.to_lowercase();
        if needle.is_empty() || !haystack.contains(&needle) {
            continue;
        }
        result.score = result.score.saturating_add(weight);
        result.matches.push(KeywordMatch {
            phrase: needle,
            weight,
        });
    }

    result
}

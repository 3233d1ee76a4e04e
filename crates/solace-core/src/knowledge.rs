//! Knowledge store abstraction for retrieval.
//!
//! The [`KnowledgeStore`] trait is the only thing the responder needs from a
//! reference corpus: given a query, return up to `k` question/answer pairs
//! ranked by relevance. How ranking works is up to the store.
//!
//! [`InMemoryKnowledgeStore`] ranks by token-set Jaccard overlap between the
//! query and each stored question, ignoring common filler words. Items
//! scoring below `min_score` are dropped; ties keep insertion order.

use std::cmp::Ordering;
use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::lexicon::{normalize, tokenize};

/// One reference entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    pub question: String,
    pub answer: String,
}

/// A ranked item with its relevance score in `[0, 1]`.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredItem {
    pub item: KnowledgeItem,
    pub score: f64,
}

/// Source of ranked reference pairs.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Up to `k` items, best first.
    async fn top_k(&self, query: &str, k: usize) -> Result<Vec<KnowledgeItem>>;
}

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "to", "of", "in", "on", "at", "for", "with", "about",
    "is", "am", "are", "was", "be", "been", "it", "this", "that", "i", "i'm", "me", "my", "you",
    "your", "do", "does", "what", "how", "can", "so", "just",
];

fn content_tokens(text: &str) -> HashSet<String> {
    tokenize(&normalize(text))
        .into_iter()
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    let union = a.len() + b.len() - shared;
    shared as f64 / union as f64
}

struct IndexedItem {
    item: KnowledgeItem,
    tokens: HashSet<String>,
}

/// Lexical-overlap store over items held in memory.
pub struct InMemoryKnowledgeStore {
    items: Vec<IndexedItem>,
    min_score: f64,
}

impl InMemoryKnowledgeStore {
    pub fn new(items: Vec<KnowledgeItem>, min_score: f64) -> Self {
        let items = items
            .into_iter()
            .map(|item| IndexedItem {
                tokens: content_tokens(&item.question),
                item,
            })
            .collect();
        Self {
            items,
            min_score: min_score.clamp(0.0, 1.0),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Score every item and keep the best `k` above `min_score`.
    pub fn rank(&self, query: &str, k: usize) -> Vec<ScoredItem> {
        let query_tokens = content_tokens(query);
        let mut scored: Vec<(usize, f64)> = self
            .items
            .iter()
            .enumerate()
            .map(|(idx, indexed)| (idx, jaccard(&query_tokens, &indexed.tokens)))
            .filter(|(_, score)| *score > 0.0 && *score >= self.min_score)
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(idx, score)| ScoredItem {
                item: self.items[idx].item.clone(),
                score,
            })
            .collect()
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    async fn top_k(&self, query: &str, k: usize) -> Result<Vec<KnowledgeItem>> {
        Ok(self.rank(query, k).into_iter().map(|s| s.item).collect())
    }
}

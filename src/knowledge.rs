//! Knowledge dataset loading and the `solace lookup` command.
//!
//! The dataset is a JSON array of question/answer pairs:
//!
//! ```json
//! [
//!   { "question": "How do I deal with exam stress?", "answer": "..." }
//! ]
//! ```
//!
//! Entries with a blank question or answer are skipped with a warning.

use anyhow::{Context, Result};
use std::path::Path;

use solace_core::{InMemoryKnowledgeStore, KnowledgeItem};

use crate::config::Config;

/// Read and clean a dataset file.
pub fn load_dataset(path: &Path) -> Result<Vec<KnowledgeItem>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read knowledge dataset: {}", path.display()))?;
    let raw: Vec<KnowledgeItem> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse knowledge dataset: {}", path.display()))?;

    let total = raw.len();
    let items: Vec<KnowledgeItem> = raw
        .into_iter()
        .filter(|i| !i.question.trim().is_empty() && !i.answer.trim().is_empty())
        .collect();
    if items.len() < total {
        tracing::warn!(
            skipped = total - items.len(),
            path = %path.display(),
            "skipped knowledge entries with a blank question or answer"
        );
    }
    Ok(items)
}

/// Build the in-memory store from `[knowledge]`, or `None` if no dataset is
/// configured.
pub fn load_store(config: &Config) -> Result<Option<InMemoryKnowledgeStore>> {
    let Some(path) = &config.knowledge.path else {
        return Ok(None);
    };
    let items = load_dataset(path)?;
    tracing::info!(items = items.len(), "loaded knowledge dataset");
    Ok(Some(InMemoryKnowledgeStore::new(
        items,
        config.knowledge.min_score,
    )))
}

/// Print the ranked knowledge items for a query.
pub fn run_lookup(config: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    let store = load_store(config)?
        .ok_or_else(|| anyhow::anyhow!("No knowledge dataset configured (set knowledge.path)"))?;

    let k = limit.unwrap_or(config.responder.top_k);
    let ranked = store.rank(query, k);

    if ranked.is_empty() {
        println!("No matching entries.");
        return Ok(());
    }

    for (i, scored) in ranked.iter().enumerate() {
        println!("{}. [{:.2}] {}", i + 1, scored.score, scored.item.question);
        println!("   {}", scored.item.answer);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_dataset_skips_blank_entries() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("kb.json");
        fs::write(
            &path,
            r#"[
                {"question": "How do I sleep better?", "answer": "Keep a routine."},
                {"question": "   ", "answer": "orphan"},
                {"question": "Empty answer", "answer": ""}
            ]"#,
        )
        .unwrap();

        let items = load_dataset(&path).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].answer, "Keep a routine.");
    }

    #[test]
    fn test_load_dataset_reports_bad_json() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("kb.json");
        fs::write(&path, "{ not json").unwrap();
        let err = load_dataset(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse knowledge dataset"));
    }

    #[test]
    fn test_load_store_without_path() {
        assert!(load_store(&Config::minimal()).unwrap().is_none());
    }
}

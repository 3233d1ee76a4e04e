//! External responder selection.
//!
//! [`create_responder`] picks the capability once, from `[responder]`:
//!
//! | `provider` | Result |
//! |------------|--------|
//! | `disabled` | [`ExternalResponder::Unavailable`] |
//! | `dataset` | dataset lookup over `[knowledge].path` |
//! | `openai` | retrieval (when a dataset is configured) + chat completion |
//!
//! A backend that cannot be constructed (missing key, unreadable dataset)
//! is logged and replaced by `Unavailable` so the rule-based engine keeps
//! working.

use anyhow::{bail, Result};
use std::sync::Arc;

use solace_core::{
    ExternalResponder, InMemoryKnowledgeStore, KnowledgeStore, RetrievalResponder,
};

use crate::completion::OpenAICompletion;
use crate::config::Config;
use crate::knowledge::load_store;

/// Build the configured responder, degrading to `Unavailable` on failure.
pub fn create_responder(config: &Config) -> ExternalResponder {
    match try_create_responder(config) {
        Ok(responder) => responder,
        Err(e) => {
            tracing::warn!(error = %e, "external responder disabled");
            eprintln!("Warning: could not create external responder: {}", e);
            ExternalResponder::Unavailable
        }
    }
}

/// Build the configured responder, returning construction errors.
pub fn try_create_responder(config: &Config) -> Result<ExternalResponder> {
    let top_k = config.responder.top_k;
    match config.responder.provider.as_str() {
        "disabled" => Ok(ExternalResponder::Unavailable),
        "dataset" => {
            let store = load_store(config)?.ok_or_else(|| {
                anyhow::anyhow!("knowledge.path must be set for the dataset provider")
            })?;
            Ok(ExternalResponder::Available(RetrievalResponder::lookup(
                Arc::new(store),
                top_k,
            )))
        }
        "openai" => {
            let completion = OpenAICompletion::new(&config.responder)?;
            let store: Arc<dyn KnowledgeStore> = match load_store(config)? {
                Some(store) => Arc::new(store),
                None => Arc::new(InMemoryKnowledgeStore::new(Vec::new(), 0.0)),
            };
            tracing::info!(model = %config.responder.model.as_deref().unwrap_or(""), "using chat completion responder");
            Ok(ExternalResponder::Available(
                RetrievalResponder::with_completion(store, Arc::new(completion), top_k),
            ))
        }
        other => bail!("Unknown responder provider: {}", other),
    }
}

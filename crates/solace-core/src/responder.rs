//! External responder capability.
//!
//! An [`ExternalResponder`] is chosen once at startup: either
//! [`Unavailable`](ExternalResponder::Unavailable), which always answers
//! "no answer", or [`Available`](ExternalResponder::Available), which wraps
//! a [`RetrievalResponder`].
//!
//! # Retrieval Modes
//!
//! | Completion backend | Behaviour |
//! |--------------------|-----------|
//! | none | dataset lookup: the best-ranked answer is returned verbatim |
//! | present | top-k items are passed as context to [`Completion::complete`] |
//!
//! Errors from the store or the completion backend never leave
//! [`ExternalResponder::respond`]: they are logged and turned into
//! [`ExternalReply::NoAnswer`] carrying a short notice for the user.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::classifier::ClassificationResult;
use crate::knowledge::{KnowledgeItem, KnowledgeStore};

/// Shown beside the rule-based reply when the external path failed.
pub const UNAVAILABLE_NOTICE: &str =
    "The knowledge service is unavailable right now, so this reply uses built-in guidance.";

/// Everything a completion backend gets for one turn.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub text: &'a str,
    pub classification: &'a ClassificationResult,
    pub context: &'a [KnowledgeItem],
}

/// A hosted language model, or anything else that writes a reply from
/// retrieved context.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Model identifier, for logs.
    fn model_name(&self) -> &str;

    /// Produce a reply, or `None` when the backend has nothing to say.
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Option<String>>;
}

/// Result of consulting the external responder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalReply {
    /// Use this text verbatim.
    Answered(String),
    /// Fall back to the composer, showing `notice` if present.
    NoAnswer { notice: Option<String> },
}

impl ExternalReply {
    pub fn no_answer() -> Self {
        Self::NoAnswer { notice: None }
    }

    pub fn unavailable() -> Self {
        Self::NoAnswer {
            notice: Some(UNAVAILABLE_NOTICE.to_string()),
        }
    }
}

/// Knowledge-store retrieval with an optional completion step.
pub struct RetrievalResponder {
    store: Arc<dyn KnowledgeStore>,
    completion: Option<Arc<dyn Completion>>,
    top_k: usize,
}

impl RetrievalResponder {
    /// Dataset lookup: answer with the best stored match.
    pub fn lookup(store: Arc<dyn KnowledgeStore>, top_k: usize) -> Self {
        Self {
            store,
            completion: None,
            top_k: top_k.max(1),
        }
    }

    /// Retrieval plus completion.
    pub fn with_completion(
        store: Arc<dyn KnowledgeStore>,
        completion: Arc<dyn Completion>,
        top_k: usize,
    ) -> Self {
        Self {
            store,
            completion: Some(completion),
            top_k: top_k.max(1),
        }
    }

    async fn try_respond(
        &self,
        text: &str,
        classification: &ClassificationResult,
    ) -> Result<Option<String>> {
        let context = self.store.top_k(text, self.top_k).await?;
        tracing::debug!(items = context.len(), "retrieved knowledge context");

        let answer = match &self.completion {
            Some(completion) => {
                completion
                    .complete(CompletionRequest {
                        text,
                        classification,
                        context: &context,
                    })
                    .await?
            }
            None => context.into_iter().next().map(|item| item.answer),
        };

        Ok(answer
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty()))
    }
}

pub enum ExternalResponder {
    Available(RetrievalResponder),
    Unavailable,
}

impl ExternalResponder {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    /// Ask for a reply. Never fails.
    pub async fn respond(&self, text: &str, classification: &ClassificationResult) -> ExternalReply {
        let Self::Available(responder) = self else {
            return ExternalReply::no_answer();
        };
        match responder.try_respond(text, classification).await {
            Ok(Some(answer)) => ExternalReply::Answered(answer),
            Ok(None) => ExternalReply::no_answer(),
            Err(e) => {
                tracing::warn!(error = %e, "external responder failed; using rule-based reply");
                ExternalReply::unavailable()
            }
        }
    }
}

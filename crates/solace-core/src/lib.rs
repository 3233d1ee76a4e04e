//! # Solace Core
//!
//! The conversation engine behind Solace: keyword lexicon, classifier,
//! template bank, composer, conversation state, and the external responder
//! capability with its knowledge-store trait.
//!
//! This crate does no I/O and has no runtime dependency. Randomness is
//! injected by the caller and async traits only describe collaborators.
//!
//! ```rust
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use solace_core::{ConversationState, Engine, ReplyKind};
//!
//! let engine = Engine::default();
//! let mut state = ConversationState::new();
//! let mut rng = StdRng::seed_from_u64(7);
//!
//! assert_eq!(engine.reply("hi", &mut state, &mut rng).kind, ReplyKind::Welcome);
//! let reply = engine.reply("I'm so stressed about my exam", &mut state, &mut rng);
//! assert!(reply.text.contains("academics"));
//! assert_eq!(state.depth(), 1);
//! ```

pub mod classifier;
pub mod composer;
pub mod engine;
pub mod knowledge;
pub mod lexicon;
pub mod responder;
pub mod state;
pub mod templates;

pub use classifier::{ClassificationResult, Classifier, GENERAL};
pub use composer::{Composer, ComposerOptions, FollowUpMode, ReflectionStyle, Reply, ReplyKind};
pub use engine::{Engine, Turn};
pub use knowledge::{InMemoryKnowledgeStore, KnowledgeItem, KnowledgeStore, ScoredItem};
pub use lexicon::{Lexicon, LexiconOverlay, MatchMode};
pub use responder::{
    Completion, CompletionRequest, ExternalReply, ExternalResponder, RetrievalResponder,
};
pub use state::ConversationState;
pub use templates::{TemplateBank, TemplateOverlay};

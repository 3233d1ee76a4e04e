//! # Solace
//!
//! A rule-based emotional support responder. Each message is classified by
//! keyword tables (emotions, topics, intensity, distress, gratitude,
//! greetings) and answered with a reply composed from templates whose
//! advice deepens as the conversation goes on. An optional external
//! responder, backed by a question/answer dataset and optionally a hosted
//! chat-completion model, may answer instead.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────────┐   ┌───────────────────┐
//! │ solace-core │──▶│ SessionRegistry │◀──│ ExternalResponder │
//! │  classify + │   │ state+transcript│   │  dataset / OpenAI │
//! │  compose    │   └────────┬────────┘   └───────────────────┘
//! └─────────────┘            │
//!                    ┌───────┴───────┐
//!                    ▼               ▼
//!               ┌─────────┐     ┌─────────┐
//!               │   CLI   │     │  HTTP   │
//!               │ (chat)  │     │ (axum)  │
//!               └─────────┘     └─────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! solace chat                            # talk on stdin/stdout
//! solace classify "I'm so stressed"      # inspect the classifier
//! solace serve                           # start the HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`completion`] | OpenAI chat-completion backend |
//! | [`knowledge`] | Dataset loading and lookup |
//! | [`responder`] | External responder selection |
//! | [`session`] | Per-conversation state and transcripts |
//! | [`server`] | HTTP server |
//! | [`chat`] | Interactive CLI chat |

pub mod chat;
pub mod completion;
pub mod config;
pub mod knowledge;
pub mod responder;
pub mod server;
pub mod session;

//! Conversation sessions.
//!
//! A [`SessionRegistry`] owns the shared [`Engine`] and [`ExternalResponder`]
//! and one [`Session`] per conversation id. Each session sits behind its own
//! async mutex, so turns within a conversation are handled one at a time
//! while different conversations proceed independently.
//!
//! # Turn Flow
//!
//! ```text
//! begin_turn ──► Settled(reply) ───────────────────────────────┐
//!      │                                                       │
//!      └──► Open(c) ──► responder.respond (bounded wait)       │
//!                          ├─ Answered(text) → accept_external ├──► transcript
//!                          └─ NoAnswer / timeout → finish_turn ┘
//! ```
//!
//! Sessions end explicitly through [`SessionRegistry::end_session`], or are
//! evicted once idle for longer than the configured idle timeout. Eviction
//! runs whenever a new session is created and skips sessions with a turn in
//! flight.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use solace_core::{ConversationState, Engine, ExternalReply, ExternalResponder, ReplyKind, Turn};

use crate::config::Config;
use crate::responder::create_responder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
    pub at: DateTime<Utc>,
}

/// The result of one submitted message.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub reply: String,
    pub kind: ReplyKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

pub struct Session {
    state: ConversationState,
    transcript: Vec<TranscriptEntry>,
    rng: StdRng,
}

impl Session {
    fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            state: ConversationState::new(),
            transcript: Vec::new(),
            rng,
        }
    }

    fn push(&mut self, role: Role, content: &str) {
        self.transcript.push(TranscriptEntry {
            role,
            content: content.to_string(),
            at: Utc::now(),
        });
    }
}

struct Slot {
    session: Arc<Mutex<Session>>,
    last_active: Instant,
}

impl Slot {
    fn touch(&mut self) -> Arc<Mutex<Session>> {
        self.last_active = Instant::now();
        self.session.clone()
    }

    /// Idle for longer than `max_idle` and not held by a running turn.
    fn expired(&self, now: Instant, max_idle: Duration) -> bool {
        now.duration_since(self.last_active) > max_idle && Arc::strong_count(&self.session) == 1
    }
}

pub struct SessionRegistry {
    engine: Arc<Engine>,
    responder: Arc<ExternalResponder>,
    timeout: Duration,
    seed: Option<u64>,
    idle_timeout: Option<Duration>,
    sessions: Mutex<HashMap<String, Slot>>,
}

impl SessionRegistry {
    pub fn new(
        engine: Engine,
        responder: ExternalResponder,
        timeout: Duration,
        seed: Option<u64>,
    ) -> Self {
        Self {
            engine: Arc::new(engine),
            responder: Arc::new(responder),
            timeout,
            seed,
            idle_timeout: None,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Evict sessions left idle for longer than `idle`.
    pub fn with_idle_timeout(mut self, idle: Duration) -> Self {
        self.idle_timeout = Some(idle);
        self
    }

    /// Build the engine and responder described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let engine = config.build_engine()?;
        let responder = create_responder(config);
        Ok(Self::new(
            engine,
            responder,
            config.responder.call_timeout(),
            config.composer.seed,
        )
        .with_idle_timeout(Duration::from_secs(config.server.session_idle_secs)))
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn responder_available(&self) -> bool {
        self.responder.is_available()
    }

    async fn session(&self, id: &str) -> Arc<Mutex<Session>> {
        let mut sessions = self.sessions.lock().await;
        if let Some(slot) = sessions.get_mut(id) {
            return slot.touch();
        }

        if let Some(max_idle) = self.idle_timeout {
            evict(&mut sessions, max_idle);
        }
        tracing::debug!(session = %id, "new session");
        let session = Arc::new(Mutex::new(Session::new(self.seed)));
        sessions.insert(
            id.to_string(),
            Slot {
                session: session.clone(),
                last_active: Instant::now(),
            },
        );
        session
    }

    async fn existing(&self, id: &str) -> Option<Arc<Mutex<Session>>> {
        self.sessions.lock().await.get_mut(id).map(Slot::touch)
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Drop a session and its transcript. Returns `false` if it did not
    /// exist. A turn already in progress finishes on its own copy.
    pub async fn end_session(&self, id: &str) -> bool {
        let removed = self.sessions.lock().await.remove(id).is_some();
        if removed {
            tracing::info!(session = %id, "session ended");
        }
        removed
    }

    /// Remove sessions idle for longer than the configured idle timeout.
    /// Returns how many were removed.
    pub async fn evict_idle(&self) -> usize {
        match self.idle_timeout {
            Some(max_idle) => evict(&mut *self.sessions.lock().await, max_idle),
            None => 0,
        }
    }

    /// Handle one user message and record both sides in the transcript.
    pub async fn submit_message(&self, id: &str, text: &str) -> TurnOutcome {
        let handle = self.session(id).await;
        let mut guard = handle.lock().await;
        let session = &mut *guard;

        session.push(Role::User, text);

        let mut notice = None;
        let reply = match self
            .engine
            .begin_turn(text, &mut session.state, &mut session.rng)
        {
            Turn::Settled(reply) => reply,
            Turn::Open(classification) => {
                let external = if self.responder.is_available() {
                    match tokio::time::timeout(
                        self.timeout,
                        self.responder.respond(text, &classification),
                    )
                    .await
                    {
                        Ok(reply) => reply,
                        Err(_) => {
                            tracing::warn!(
                                session = %id,
                                timeout_secs = self.timeout.as_secs_f64(),
                                "external responder timed out"
                            );
                            ExternalReply::unavailable()
                        }
                    }
                } else {
                    ExternalReply::no_answer()
                };

                match external {
                    ExternalReply::Answered(answer) => {
                        self.engine
                            .accept_external(answer, &classification, &mut session.state)
                    }
                    ExternalReply::NoAnswer { notice: n } => {
                        notice = n;
                        self.engine.finish_turn(
                            text,
                            &classification,
                            &mut session.state,
                            &mut session.rng,
                        )
                    }
                }
            }
        };

        session.push(Role::Assistant, &reply.text);
        tracing::info!(
            session = %id,
            kind = ?reply.kind,
            depth = session.state.depth(),
            "turn handled"
        );

        TurnOutcome {
            reply: reply.text,
            kind: reply.kind,
            notice,
        }
    }

    /// Return a session to its first-turn state and clear its transcript.
    /// Returns `false` if the session did not exist.
    pub async fn reset_session(&self, id: &str) -> bool {
        let Some(handle) = self.existing(id).await else {
            return false;
        };
        let mut session = handle.lock().await;
        session.state.reset();
        session.transcript.clear();
        tracing::info!(session = %id, "session reset");
        true
    }

    pub async fn transcript(&self, id: &str) -> Option<Vec<TranscriptEntry>> {
        let handle = self.existing(id).await?;
        let session = handle.lock().await;
        Some(session.transcript.clone())
    }

    pub async fn state(&self, id: &str) -> Option<ConversationState> {
        let handle = self.existing(id).await?;
        let session = handle.lock().await;
        Some(session.state.clone())
    }
}

fn evict(sessions: &mut HashMap<String, Slot>, max_idle: Duration) -> usize {
    let now = Instant::now();
    let before = sessions.len();
    sessions.retain(|_, slot| !slot.expired(now, max_idle));
    let evicted = before - sessions.len();
    if evicted > 0 {
        tracing::debug!(evicted, "evicted idle sessions");
    }
    evicted
}

//! Reply composition.
//!
//! The [`Composer`] turns a [`ClassificationResult`] and the session's
//! [`ConversationState`] into a reply. Rules are checked in order and the
//! first one that applies wins:
//!
//! 1. First message of the session → the welcome. The text is not analysed.
//! 2. Gratitude → one acknowledgment drawn from the gratitude set.
//! 3. Otherwise the sections below, in order, skipping empty ones:
//!
//! ```text
//! reflection     "From what you shared, it sounds like: ..."
//! support        empathy per emotion, guidance per topic,
//!                intensity line, distress line
//! advice         💡 one tip per emotion at min(depth, len - 1)
//! follow-up      question from the depth bucket
//! closing        fixed line
//! ```
//!
//! Only rule 3 advances `depth`. Every rule advances `turn_count`.
//! Randomness comes from the caller's RNG so replies are reproducible under
//! a seed.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::classifier::{ClassificationResult, GENERAL};
use crate::state::ConversationState;
use crate::templates::{FollowUpStage, TemplateBank};

/// How the opening section restates the user's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflectionStyle {
    /// Bullet list of matched emotions and topics.
    #[default]
    Structured,
    /// Quote of the first `excerpt_tokens` words.
    Excerpt,
}

/// How a follow-up question is picked inside its bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpMode {
    /// Rotate through the bucket by depth.
    #[default]
    Staged,
    /// Draw from the bucket with the session RNG.
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposerOptions {
    pub reflection: ReflectionStyle,
    pub excerpt_tokens: usize,
    pub follow_up: FollowUpMode,
}

impl Default for ComposerOptions {
    fn default() -> Self {
        Self {
            reflection: ReflectionStyle::Structured,
            excerpt_tokens: 12,
            follow_up: FollowUpMode::Staged,
        }
    }
}

/// Which rule produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    Welcome,
    Gratitude,
    Composed,
    External,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub text: String,
    pub kind: ReplyKind,
}

#[derive(Debug, Clone, Default)]
pub struct Composer {
    templates: TemplateBank,
    options: ComposerOptions,
}

impl Composer {
    pub fn new(templates: TemplateBank, options: ComposerOptions) -> Self {
        Self { templates, options }
    }

    pub fn templates(&self) -> &TemplateBank {
        &self.templates
    }

    pub fn options(&self) -> &ComposerOptions {
        &self.options
    }

    /// Apply rules 1-3 and return the reply text.
    pub fn compose<R: Rng + ?Sized>(
        &self,
        text: &str,
        classification: &ClassificationResult,
        state: &mut ConversationState,
        rng: &mut R,
    ) -> String {
        self.compose_reply(text, classification, state, rng).text
    }

    /// Like [`compose`](Composer::compose), keeping the rule that fired.
    pub fn compose_reply<R: Rng + ?Sized>(
        &self,
        text: &str,
        classification: &ClassificationResult,
        state: &mut ConversationState,
        rng: &mut R,
    ) -> Reply {
        if !state.greeting_sent() {
            return self.welcome(state);
        }
        if classification.gratitude {
            return self.acknowledge(state, rng);
        }
        self.respond(text, classification, state, rng)
    }

    /// Rule 1.
    pub fn welcome(&self, state: &mut ConversationState) -> Reply {
        state.record_welcome();
        Reply {
            text: self.templates.welcome().to_string(),
            kind: ReplyKind::Welcome,
        }
    }

    /// Rule 2.
    pub fn acknowledge<R: Rng + ?Sized>(
        &self,
        state: &mut ConversationState,
        rng: &mut R,
    ) -> Reply {
        state.record_acknowledgment();
        Reply {
            text: pick(self.templates.gratitude(), rng).to_string(),
            kind: ReplyKind::Gratitude,
        }
    }

    /// Rule 3: the full composed reply.
    pub fn respond<R: Rng + ?Sized>(
        &self,
        text: &str,
        classification: &ClassificationResult,
        state: &mut ConversationState,
        rng: &mut R,
    ) -> Reply {
        let t = &self.templates;
        let mut sections = vec![self.reflection(text, classification)];

        let mut support: Vec<&str> = classification
            .emotions
            .iter()
            .filter_map(|e| t.empathy(e))
            .collect();
        support.extend(classification.topics.iter().filter_map(|topic| t.guidance(topic)));
        if classification.intensity {
            support.push(t.intensity_line());
        }
        if classification.distress {
            support.push(t.distress_line());
        }
        sections.push(support.join("\n"));

        let mut tips: Vec<&str> = Vec::new();
        for emotion in &classification.emotions {
            let tip = t.tip(emotion, state.depth());
            if !tips.contains(&tip) {
                tips.push(tip);
            }
        }
        sections.push(
            tips.iter()
                .map(|tip| format!("💡 {}", tip))
                .collect::<Vec<_>>()
                .join("\n"),
        );

        sections.push(self.follow_up(state.depth(), rng).to_string());
        sections.push(t.closing().to_string());

        sections.retain(|s| !s.is_empty());
        state.record_substantive(classification);

        Reply {
            text: sections.join("\n\n"),
            kind: ReplyKind::Composed,
        }
    }

    /// The opening section that restates the message.
    ///
    /// Deterministic for a given text and classification.
    pub fn reflection(&self, text: &str, classification: &ClassificationResult) -> String {
        match self.options.reflection {
            ReflectionStyle::Structured => {
                let mut lines = vec!["From what you shared, it sounds like:".to_string()];
                for emotion in &classification.emotions {
                    if emotion == GENERAL {
                        lines.push("• something has been on your mind".to_string());
                    } else {
                        lines.push(format!("• you're feeling {}", emotion));
                    }
                }
                for topic in &classification.topics {
                    lines.push(format!("• this is connected to {}", topic));
                }
                if classification.intensity {
                    lines.push("• these feelings feel especially strong right now".to_string());
                }
                lines.join("\n")
            }
            ReflectionStyle::Excerpt => {
                let words: Vec<&str> = text.split_whitespace().collect();
                if words.is_empty() {
                    return "It sounds like something is on your mind.".to_string();
                }
                let limit = self.options.excerpt_tokens.max(1);
                let mut excerpt = words[..words.len().min(limit)].join(" ");
                if words.len() > limit {
                    excerpt.push('…');
                }
                format!("You said: \"{}\"", excerpt)
            }
        }
    }

    fn follow_up<R: Rng + ?Sized>(&self, depth: usize, rng: &mut R) -> &str {
        let bucket = self.templates.follow_ups(FollowUpStage::for_depth(depth));
        match self.options.follow_up {
            FollowUpMode::Staged => bucket
                .get(depth % bucket.len().max(1))
                .map(String::as_str)
                .unwrap_or_default(),
            FollowUpMode::Random => pick(bucket, rng),
        }
    }
}

fn pick<'a, R: Rng + ?Sized>(items: &'a [String], rng: &mut R) -> &'a str {
    items.choose(rng).map(String::as_str).unwrap_or_default()
}

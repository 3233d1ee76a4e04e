//! Turn-level API over the classifier and composer.
//!
//! Hosts that consult an [`ExternalResponder`](crate::responder::ExternalResponder)
//! split a turn in two: [`Engine::begin_turn`] settles the welcome and
//! gratitude rules without any I/O, and returns the classification when the
//! turn still needs a substantive reply. The host then either hands an
//! external reply to [`Engine::accept_external`] or falls back to
//! [`Engine::finish_turn`]. State only moves once a reply exists.

use anyhow::Result;
use rand::Rng;

use crate::classifier::{ClassificationResult, Classifier};
use crate::composer::{Composer, ComposerOptions, Reply, ReplyKind};
use crate::lexicon::{Lexicon, LexiconOverlay};
use crate::state::ConversationState;
use crate::templates::{TemplateBank, TemplateOverlay};

/// Outcome of [`Engine::begin_turn`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Turn {
    /// Welcome or gratitude; nothing left to do.
    Settled(Reply),
    /// A substantive reply is needed for this classification.
    Open(ClassificationResult),
}

#[derive(Debug, Clone, Default)]
pub struct Engine {
    classifier: Classifier,
    composer: Composer,
}

impl Engine {
    pub fn new(classifier: Classifier, composer: Composer) -> Self {
        Self {
            classifier,
            composer,
        }
    }

    /// Build an engine from the built-in tables plus overlays.
    pub fn from_overlays(
        lexicon: &LexiconOverlay,
        templates: &TemplateOverlay,
        options: ComposerOptions,
    ) -> Result<Self> {
        let mut lex = Lexicon::builtin();
        lex.apply(lexicon)?;
        let mut bank = TemplateBank::builtin();
        bank.apply(templates)?;
        Ok(Self::new(Classifier::new(lex), Composer::new(bank, options)))
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn classify(&self, text: &str) -> ClassificationResult {
        self.classifier.classify(text)
    }

    /// Handle the rules that need no external help.
    pub fn begin_turn<R: Rng + ?Sized>(
        &self,
        text: &str,
        state: &mut ConversationState,
        rng: &mut R,
    ) -> Turn {
        if !state.greeting_sent() {
            return Turn::Settled(self.composer.welcome(state));
        }
        let classification = self.classifier.classify(text);
        if classification.gratitude {
            return Turn::Settled(self.composer.acknowledge(state, rng));
        }
        Turn::Open(classification)
    }

    /// Compose the rule-based reply for an open turn.
    pub fn finish_turn<R: Rng + ?Sized>(
        &self,
        text: &str,
        classification: &ClassificationResult,
        state: &mut ConversationState,
        rng: &mut R,
    ) -> Reply {
        self.composer.respond(text, classification, state, rng)
    }

    /// Record an external reply for an open turn. The text is kept verbatim.
    pub fn accept_external(
        &self,
        text: String,
        classification: &ClassificationResult,
        state: &mut ConversationState,
    ) -> Reply {
        state.record_substantive(classification);
        Reply {
            text,
            kind: ReplyKind::External,
        }
    }

    /// A whole turn without any external responder.
    pub fn reply<R: Rng + ?Sized>(
        &self,
        text: &str,
        state: &mut ConversationState,
        rng: &mut R,
    ) -> Reply {
        match self.begin_turn(text, state, rng) {
            Turn::Settled(reply) => reply,
            Turn::Open(classification) => self.finish_turn(text, &classification, state, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_greeting_exactly_once() {
        let engine = Engine::default();
        let mut state = ConversationState::new();
        let mut rng = StdRng::seed_from_u64(1);

        let first = engine.reply("hello", &mut state, &mut rng);
        assert_eq!(first.kind, ReplyKind::Welcome);

        for text in ["hello", "hi", "I'm sad"] {
            let reply = engine.reply(text, &mut state, &mut rng);
            assert_ne!(reply.kind, ReplyKind::Welcome);
            assert_ne!(reply.text, engine.composer().templates().welcome());
        }
    }

    #[test]
    fn test_depth_counts_substantive_messages() {
        let engine = Engine::default();
        let mut state = ConversationState::new();
        let mut rng = StdRng::seed_from_u64(1);
        engine.reply("hey", &mut state, &mut rng);

        for n in 1..=8 {
            engine.reply("my classes are stressing me out", &mut state, &mut rng);
            assert_eq!(state.depth(), n);
        }
        engine.reply("thanks", &mut state, &mut rng);
        assert_eq!(state.depth(), 8);
        assert_eq!(state.turn_count(), 10);
    }

    #[test]
    fn test_holiday_mention_does_not_hide_distress() {
        let engine = Engine::default();
        let mut state = ConversationState::new();
        let mut rng = StdRng::seed_from_u64(1);
        engine.reply("hi", &mut state, &mut rng);

        let reply = engine.reply(
            "Thanksgiving at home was awful, i can't go on",
            &mut state,
            &mut rng,
        );
        assert_eq!(reply.kind, ReplyKind::Composed);
        assert!(reply
            .text
            .contains(engine.composer().templates().distress_line()));
        assert_eq!(state.depth(), 1);
    }

    #[test]
    fn test_begin_turn_leaves_state_for_open_turns() {
        let engine = Engine::default();
        let mut state = ConversationState::new();
        let mut rng = StdRng::seed_from_u64(1);
        engine.reply("hi", &mut state, &mut rng);
        let before = state.clone();

        let turn = engine.begin_turn("I'm anxious", &mut state, &mut rng);
        assert!(matches!(turn, Turn::Open(ref c) if c.emotions == ["anxiety"]));
        assert_eq!(state, before);
    }

    #[test]
    fn test_accept_external_advances_like_composed() {
        let engine = Engine::default();
        let mut state = ConversationState::new();
        let mut rng = StdRng::seed_from_u64(1);
        engine.reply("hi", &mut state, &mut rng);

        let Turn::Open(c) = engine.begin_turn("anxious about exams", &mut state, &mut rng) else {
            panic!("expected an open turn");
        };
        let reply = engine.accept_external("Try a short walk.".to_string(), &c, &mut state);
        assert_eq!(reply.kind, ReplyKind::External);
        assert_eq!(reply.text, "Try a short walk.");
        assert_eq!(state.depth(), 1);
        assert_eq!(state.topic_history(), ["academics"]);
    }

    #[test]
    fn test_reset_returns_to_first_turn() {
        let engine = Engine::default();
        let mut state = ConversationState::new();
        let mut rng = StdRng::seed_from_u64(1);
        engine.reply("hi", &mut state, &mut rng);
        for _ in 0..3 {
            engine.reply("so much pressure", &mut state, &mut rng);
        }
        assert_eq!(state.depth(), 3);

        state.reset();
        assert!(!state.greeting_sent());
        assert_eq!(state.depth(), 0);
        let reply = engine.reply("so much pressure", &mut state, &mut rng);
        assert_eq!(reply.kind, ReplyKind::Welcome);
    }

    #[test]
    fn test_from_overlays_applies_both() {
        let mut lexicon = LexiconOverlay::default();
        lexicon
            .emotions
            .insert("stress".to_string(), vec!["crunch time".to_string()]);
        let templates = TemplateOverlay {
            closing: Some("Be gentle with yourself.".to_string()),
            ..Default::default()
        };
        let engine =
            Engine::from_overlays(&lexicon, &templates, ComposerOptions::default()).unwrap();

        let mut state = ConversationState::new();
        let mut rng = StdRng::seed_from_u64(1);
        engine.reply("hi", &mut state, &mut rng);
        let reply = engine.reply("it's crunch time", &mut state, &mut rng);
        assert!(reply.text.contains("• you're feeling stress"));
        assert!(reply.text.ends_with("Be gentle with yourself."));
    }
}

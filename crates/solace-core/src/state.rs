//! Per-session conversation state.

use serde::Serialize;

use crate::classifier::ClassificationResult;

/// Counters and history for one conversation.
///
/// Owned by exactly one session. The engine advances it; hosts only read it
/// or [`reset`](ConversationState::reset) it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversationState {
    greeting_sent: bool,
    depth: usize,
    turn_count: usize,
    emotion_history: Vec<String>,
    topic_history: Vec<String>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the welcome message has gone out.
    pub fn greeting_sent(&self) -> bool {
        self.greeting_sent
    }

    /// Substantive replies so far; selects the advice tip.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// User messages handled so far.
    pub fn turn_count(&self) -> usize {
        self.turn_count
    }

    pub fn emotion_history(&self) -> &[String] {
        &self.emotion_history
    }

    pub fn topic_history(&self) -> &[String] {
        &self.topic_history
    }

    /// Return to the fresh-session state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn record_welcome(&mut self) {
        self.greeting_sent = true;
        self.turn_count += 1;
    }

    pub(crate) fn record_acknowledgment(&mut self) {
        self.turn_count += 1;
    }

    pub(crate) fn record_substantive(&mut self, classification: &ClassificationResult) {
        self.emotion_history
            .extend(classification.emotions.iter().cloned());
        self.topic_history
            .extend(classification.topics.iter().cloned());
        self.depth += 1;
        self.turn_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;

    #[test]
    fn test_fresh_state() {
        let state = ConversationState::new();
        assert!(!state.greeting_sent());
        assert_eq!(state.depth(), 0);
        assert_eq!(state.turn_count(), 0);
        assert!(state.emotion_history().is_empty());
    }

    #[test]
    fn test_substantive_turn_advances_depth_and_history() {
        let mut state = ConversationState::new();
        state.record_welcome();
        let c = Classifier::default().classify("anxious about my exam");
        state.record_substantive(&c);
        assert_eq!(state.depth(), 1);
        assert_eq!(state.turn_count(), 2);
        assert_eq!(state.emotion_history(), ["anxiety"]);
        assert_eq!(state.topic_history(), ["academics"]);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut state = ConversationState::new();
        state.record_welcome();
        state.record_acknowledgment();
        state.reset();
        assert_eq!(state, ConversationState::new());
    }
}

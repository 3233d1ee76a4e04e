//! Keyword classification of a single user message.
//!
//! [`Classifier::classify`] is pure: it reads only the immutable
//! [`Lexicon`] and the input, so the same text always yields the same
//! [`ClassificationResult`]. It cannot fail; text that matches nothing lands
//! in the [`GENERAL`] emotion.

use serde::Serialize;

use crate::lexicon::{Lexicon, NormalizedText};

/// Sentinel emotion used when no emotion category matches.
pub const GENERAL: &str = "general";

/// Everything the composer needs to know about one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    /// Matched emotion categories in lexicon order; never empty.
    pub emotions: Vec<String>,
    /// Matched topic categories in lexicon order; may be empty.
    pub topics: Vec<String>,
    /// An intensifier word was present.
    pub intensity: bool,
    /// A distress phrase was present.
    pub distress: bool,
    /// A gratitude phrase was present.
    pub gratitude: bool,
    /// The whole message is a greeting.
    pub greeting: bool,
    /// Number of word tokens in the message.
    pub token_count: usize,
}

impl ClassificationResult {
    /// True when only the [`GENERAL`] sentinel was assigned.
    pub fn is_general(&self) -> bool {
        self.emotions.len() == 1 && self.emotions[0] == GENERAL
    }
}

/// Scans text against a [`Lexicon`].
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    lexicon: Lexicon,
}

impl Classifier {
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn classify(&self, text: &str) -> ClassificationResult {
        let input = NormalizedText::new(text);

        let mut emotions: Vec<String> = self
            .lexicon
            .emotions
            .matching(&input)
            .map(str::to_string)
            .collect();
        if emotions.is_empty() {
            emotions.push(GENERAL.to_string());
        }

        let topics = self
            .lexicon
            .topics
            .matching(&input)
            .map(str::to_string)
            .collect();

        ClassificationResult {
            emotions,
            topics,
            intensity: self.lexicon.intensifiers.matches(&input),
            distress: self.lexicon.distress.matches(&input),
            gratitude: self.lexicon.gratitude.matches(&input),
            greeting: self.lexicon.greetings.matches(&input),
            token_count: input.tokens().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> ClassificationResult {
        Classifier::default().classify(text)
    }

    #[test]
    fn test_empty_input_is_general() {
        let c = classify("");
        assert_eq!(c.emotions, vec![GENERAL]);
        assert!(c.topics.is_empty());
        assert!(!c.intensity);
        assert!(!c.distress);
        assert!(!c.gratitude);
        assert!(!c.greeting);
        assert_eq!(c.token_count, 0);
        assert!(c.is_general());
    }

    #[test]
    fn test_exam_stress_scenario() {
        let c = classify("I'm so stressed about my exam deadline");
        assert!(c.emotions.contains(&"stress".to_string()));
        assert!(c.topics.contains(&"academics".to_string()));
        assert!(c.intensity);
        assert!(!c.distress);
        assert!(!c.is_general());
        assert_eq!(c.token_count, 7);
    }

    #[test]
    fn test_multiple_emotions_match_together() {
        let c = classify("I'm exhausted and lonely and can't sleep");
        assert_eq!(c.emotions, vec!["fatigue", "sleep", "loneliness"]);
        assert!(c.intensity);
    }

    #[test]
    fn test_distress_phrase() {
        let c = classify("i give up, nothing helps anymore");
        assert!(c.distress);
        assert!(!c.gratitude);
    }

    #[test]
    fn test_gratitude_phrase() {
        let c = classify("thank you so much, that really helped");
        assert!(c.gratitude);
        assert!(!c.distress);
    }

    #[test]
    fn test_cannot_is_not_an_intensifier() {
        let c = classify("I cannot decide which class to take");
        assert!(!c.intensity);
        assert_eq!(c.topics, vec!["academics"]);
    }

    #[test]
    fn test_greeting_only_for_whole_message() {
        assert!(classify("Hello!").greeting);
        assert!(classify("good morning :)").greeting);
        assert!(!classify("hello, I failed my exam").greeting);
    }

    #[test]
    fn test_typographic_apostrophe_is_folded() {
        let c = classify("I can\u{2019}t handle this");
        assert!(c.distress);
        assert!(c.intensity);
    }

    #[test]
    fn test_classify_is_idempotent() {
        let classifier = Classifier::default();
        let text = "Worried about money and my family, really worried";
        assert_eq!(classifier.classify(text), classifier.classify(text));
    }

    #[test]
    fn test_serializes_for_cli_output() {
        let c = Classifier::default().classify("thanks, I feel less anxious");
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["emotions"], serde_json::json!(["anxiety"]));
        assert_eq!(json["gratitude"], true);
        assert!(json["topics"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_thanksgiving_is_not_gratitude() {
        let c = classify("Thanksgiving at home was awful, i can't go on");
        assert!(!c.gratitude);
        assert!(c.distress);
        assert!(classify("Thanks!").gratitude);
        assert!(!classify("I feel so ungrateful").gratitude);
    }

    #[test]
    fn test_topics_ignore_words_that_merely_contain_a_phrase() {
        for text in [
            "apparently nobody cares",
            "of course it went wrong",
            "here is an example",
            "I feel crushed",
            "the current situation",
        ] {
            assert!(classify(text).topics.is_empty(), "topic matched in: {}", text);
        }
    }

    #[test]
    fn test_topic_inflections_still_match() {
        assert_eq!(classify("my parents argue a lot").topics, vec!["family"]);
        assert_eq!(classify("two exams this week").topics, vec!["academics"]);
        assert_eq!(classify("my crush ignored me").topics, vec!["relationships"]);
        assert_eq!(classify("I can't pay rent").topics, vec!["finance"]);
    }
}

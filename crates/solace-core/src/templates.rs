//! Reply fragments keyed by category.
//!
//! The [`TemplateBank`] holds every string the composer can emit: the
//! welcome, gratitude acknowledgments, per-emotion empathy, per-topic
//! guidance, the intensity and distress lines, escalating advice tips,
//! staged follow-up questions, and the closing line.
//!
//! Tip sequences are indexed by conversation depth and clamp to their last
//! entry, so [`TemplateBank::tip`] always resolves.

use std::collections::{BTreeMap, HashMap};

use anyhow::{bail, Result};
use serde::Deserialize;

use crate::classifier::GENERAL;

/// Which follow-up bucket a turn draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUpStage {
    Reflection,
    Clarification,
    Coping,
    Satisfaction,
}

impl FollowUpStage {
    /// Keyed by the number of substantive replies already given: 0-1
    /// reflect, 2-3 clarify, 4-5 cope, 6+ check satisfaction.
    pub fn for_depth(depth: usize) -> Self {
        match depth {
            0..=1 => Self::Reflection,
            2..=3 => Self::Clarification,
            4..=5 => Self::Coping,
            _ => Self::Satisfaction,
        }
    }
}

/// Replacement fragments, usually read from the `[templates]` config
/// section. Keys are category names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateOverlay {
    #[serde(default)]
    pub welcome: Option<String>,
    #[serde(default)]
    pub closing: Option<String>,
    #[serde(default)]
    pub gratitude: Option<Vec<String>>,
    #[serde(default)]
    pub empathy: BTreeMap<String, String>,
    #[serde(default)]
    pub guidance: BTreeMap<String, String>,
    #[serde(default)]
    pub tips: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct TemplateBank {
    welcome: String,
    gratitude: Vec<String>,
    empathy: HashMap<String, String>,
    guidance: HashMap<String, String>,
    intensity: String,
    distress: String,
    tips: HashMap<String, Vec<String>>,
    general_tips: Vec<String>,
    reflection_questions: Vec<String>,
    clarification_questions: Vec<String>,
    coping_questions: Vec<String>,
    satisfaction_questions: Vec<String>,
    closing: String,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn keyed(table: &[(&str, &str)]) -> HashMap<String, String> {
    table
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl TemplateBank {
    pub fn builtin() -> Self {
        Self {
            welcome: WELCOME.to_string(),
            gratitude: owned(GRATITUDE_REPLIES),
            empathy: keyed(EMPATHY),
            guidance: keyed(GUIDANCE),
            intensity: INTENSITY_LINE.to_string(),
            distress: DISTRESS_LINE.to_string(),
            tips: TIPS
                .iter()
                .map(|(k, v)| (k.to_string(), owned(v)))
                .collect(),
            general_tips: owned(GENERAL_TIPS),
            reflection_questions: owned(REFLECTION_QUESTIONS),
            clarification_questions: owned(CLARIFICATION_QUESTIONS),
            coping_questions: owned(COPING_QUESTIONS),
            satisfaction_questions: owned(SATISFACTION_QUESTIONS),
            closing: CLOSING.to_string(),
        }
    }

    /// Replace fragments with the overlay's.
    ///
    /// # Errors
    ///
    /// Rejects empty strings and empty sequences, which would break the
    /// always-resolves guarantee.
    pub fn apply(&mut self, overlay: &TemplateOverlay) -> Result<()> {
        if let Some(welcome) = &overlay.welcome {
            self.welcome = non_blank("templates.welcome", welcome)?;
        }
        if let Some(closing) = &overlay.closing {
            self.closing = non_blank("templates.closing", closing)?;
        }
        if let Some(gratitude) = &overlay.gratitude {
            self.gratitude = non_empty("templates.gratitude", gratitude)?;
        }
        for (category, line) in &overlay.empathy {
            let line = non_blank(&format!("templates.empathy.{}", category), line)?;
            self.empathy.insert(category.trim().to_lowercase(), line);
        }
        for (category, line) in &overlay.guidance {
            let line = non_blank(&format!("templates.guidance.{}", category), line)?;
            self.guidance.insert(category.trim().to_lowercase(), line);
        }
        for (category, tips) in &overlay.tips {
            let tips = non_empty(&format!("templates.tips.{}", category), tips)?;
            let key = category.trim().to_lowercase();
            if key == GENERAL {
                self.general_tips = tips;
            } else {
                self.tips.insert(key, tips);
            }
        }
        Ok(())
    }

    pub fn welcome(&self) -> &str {
        &self.welcome
    }

    pub fn gratitude(&self) -> &[String] {
        &self.gratitude
    }

    pub fn empathy(&self, emotion: &str) -> Option<&str> {
        self.empathy.get(emotion).map(String::as_str)
    }

    pub fn guidance(&self, topic: &str) -> Option<&str> {
        self.guidance.get(topic).map(String::as_str)
    }

    pub fn intensity_line(&self) -> &str {
        &self.intensity
    }

    pub fn distress_line(&self) -> &str {
        &self.distress
    }

    pub fn closing(&self) -> &str {
        &self.closing
    }

    /// Tips for an emotion, falling back to the general sequence.
    pub fn tips(&self, emotion: &str) -> &[String] {
        self.tips.get(emotion).unwrap_or(&self.general_tips)
    }

    /// The tip at `min(depth, len - 1)` for this emotion.
    pub fn tip(&self, emotion: &str, depth: usize) -> &str {
        let tips = self.tips(emotion);
        tips.get(depth.min(tips.len().saturating_sub(1)))
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn follow_ups(&self, stage: FollowUpStage) -> &[String] {
        match stage {
            FollowUpStage::Reflection => &self.reflection_questions,
            FollowUpStage::Clarification => &self.clarification_questions,
            FollowUpStage::Coping => &self.coping_questions,
            FollowUpStage::Satisfaction => &self.satisfaction_questions,
        }
    }
}

impl Default for TemplateBank {
    fn default() -> Self {
        Self::builtin()
    }
}

fn non_blank(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        bail!("{} must not be empty", field);
    }
    Ok(value.to_string())
}

fn non_empty(field: &str, values: &[String]) -> Result<Vec<String>> {
    let values: Vec<String> = values
        .iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    if values.is_empty() {
        bail!("{} must contain at least one entry", field);
    }
    Ok(values)
}

// ── Built-in fragments ──────────────────────────────────────────────────

const WELCOME: &str = "Hello! 👋😊\n\nWhat can I do for you today?";

const GRATITUDE_REPLIES: &[&str] = &[
    "You're very welcome. I'm really glad I could be here for you. 💙",
    "I'm glad that helped. I'm here whenever you want to talk again.",
    "Thank you for trusting me with this. Take good care of yourself.",
];

const EMPATHY: &[(&str, &str)] = &[
    (
        "stress",
        "It sounds like a lot is piling up on you at once, and that kind of pressure is exhausting.",
    ),
    (
        "sadness",
        "I'm sorry you're feeling this low. Sadness can make everything feel heavier.",
    ),
    (
        "anxiety",
        "Worry can make your mind race, and it makes sense that you feel unsettled.",
    ),
    (
        "fatigue",
        "Feeling worn out like this is your body and mind asking for care, not a sign of failure.",
    ),
    (
        "sleep",
        "Struggling with sleep can affect everything else, so it's understandable that this is weighing on you.",
    ),
    (
        "loneliness",
        "Feeling alone is really hard, and I'm glad you reached out here.",
    ),
    (
        "anger",
        "It's okay to feel frustrated. Anger often shows up when something important to you feels threatened.",
    ),
];

const GUIDANCE: &[(&str, &str)] = &[
    (
        "academics",
        "With schoolwork, breaking big tasks into smaller steps and asking instructors for clarity can ease some of the load.",
    ),
    (
        "family",
        "Family situations can be complicated. It's okay to set boundaries while still caring about the people involved.",
    ),
    (
        "relationships",
        "Relationships take energy. Being honest about what you need is a good place to start.",
    ),
    (
        "future",
        "Thinking about the future can feel huge. You don't have to map out everything today; the next step is enough.",
    ),
    (
        "self",
        "The way you see yourself matters. Try speaking to yourself the way you would to a good friend.",
    ),
    (
        "finance",
        "Money worries are very real. Listing what is urgent versus what can wait sometimes makes it feel more manageable.",
    ),
    (
        "health",
        "Your health deserves attention. Checking in with someone you trust about how your body feels can help.",
    ),
];

const INTENSITY_LINE: &str = "It sounds like these feelings are especially strong right now.";

const DISTRESS_LINE: &str = "You don't have to carry this alone. If things feel too heavy, reaching out to someone you trust or a support service on campus can make a real difference, and you deserve that support.";

const TIPS: &[(&str, &[&str])] = &[
    (
        "stress",
        &[
            "Try focusing on one small task at a time.",
            "It may help to pause and remind yourself that you don't have to solve everything today.",
            "Your effort matters, even when progress feels slow.",
        ],
    ),
    (
        "sadness",
        &[
            "Allow yourself to feel without judging it.",
            "Comforting routines can help during heavy moments.",
            "You're not weak for feeling this way.",
        ],
    ),
    (
        "fatigue",
        &[
            "Rest is not laziness; it's recovery.",
            "Short breaks can help your body reset.",
            "You deserve gentleness, not pressure.",
        ],
    ),
    (
        "anxiety",
        &[
            "Slow breathing can calm your nervous system.",
            "Grounding yourself in the present may help reduce worry.",
            "You don't need all the answers right now.",
        ],
    ),
    (
        "sleep",
        &[
            "Creating a calm bedtime routine can help.",
            "Resting quietly still counts as rest.",
            "Your body will find its rhythm again.",
        ],
    ),
    (
        "loneliness",
        &[
            "Even a small message to someone you like can make the day feel lighter.",
            "Shared spaces like clubs or study groups can be gentle ways to connect.",
            "Feeling lonely doesn't mean you are unlovable.",
        ],
    ),
    (
        "anger",
        &[
            "Stepping away for a few minutes can give your feelings room to settle.",
            "Writing down what upset you can make it easier to understand.",
            "Your feelings are valid, even when they are intense.",
        ],
    ),
];

const GENERAL_TIPS: &[&str] = &[
    "It's okay to take things one step at a time.",
    "You don't have to be okay all the time.",
    "You're doing the best you can right now.",
];

const REFLECTION_QUESTIONS: &[&str] = &[
    "Would you like to tell me more about this?",
    "What feels heaviest about it right now?",
];

const CLARIFICATION_QUESTIONS: &[&str] = &[
    "Is this helping you so far, or would you like a different kind of support?",
    "Did I understand that right, or is there more to it?",
];

const COPING_QUESTIONS: &[&str] = &[
    "What has helped you get through moments like this before?",
    "Is there one small thing you could do for yourself today?",
];

const SATISFACTION_QUESTIONS: &[&str] = &[
    "Do you want me to keep listening, or would advice be helpful right now?",
    "How are you feeling now compared to when we started talking?",
];

const CLOSING: &str = "You can correct me if I misunderstood. I'm here to listen.";

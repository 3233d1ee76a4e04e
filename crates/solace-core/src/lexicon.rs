//! Keyword tables and phrase matching.
//!
//! A [`Lexicon`] groups every table the classifier consults: emotion and
//! topic categories ([`CategoryTable`]) plus the flat signal lists for
//! intensifiers, distress phrases, gratitude, and greetings ([`PhraseList`]).
//!
//! # Match Modes
//!
//! | Mode | Rule | Default use |
//! |------|------|-------------|
//! | [`MatchMode::Substring`] | phrase occurs anywhere in the lowered text | emotions, distress |
//! | [`MatchMode::WholeWord`] | phrase tokens occur as a contiguous token run | topics, intensifiers, gratitude |
//! | [`MatchMode::WholeText`] | phrase tokens equal the message tokens | greetings |
//!
//! Whole-word matching keeps `"cannot"` from triggering `"can't"`,
//! `"also"` from triggering `"so"`, and `"Thanksgiving"` from reading as
//! thanks. Topic tables list their inflected forms explicitly.
//!
//! Tables are immutable once the engine is built. The built-in tables can be
//! extended from configuration through a [`LexiconOverlay`].

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use anyhow::{bail, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w']+").expect("word pattern is a valid regex"));

/// Lower-case the text and fold typographic apostrophes to `'`.
pub fn normalize(text: &str) -> String {
    text.to_lowercase().replace(['\u{2019}', '\u{2018}'], "'")
}

/// Split already-normalized text into word tokens.
///
/// Apostrophes inside a word are kept (`"can't"`), quote marks around a
/// word are not.
pub fn tokenize(normalized: &str) -> Vec<String> {
    WORD_RE
        .find_iter(normalized)
        .map(|m| m.as_str().trim_matches('\''))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Input text prepared once for every table lookup.
#[derive(Debug, Clone)]
pub struct NormalizedText {
    lowered: String,
    tokens: Vec<String>,
}

impl NormalizedText {
    pub fn new(text: &str) -> Self {
        let lowered = normalize(text);
        let tokens = tokenize(&lowered);
        Self { lowered, tokens }
    }

    pub fn as_str(&self) -> &str {
        &self.lowered
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

/// How a phrase is compared against a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    Substring,
    WholeWord,
    WholeText,
}

#[derive(Debug, Clone)]
struct Phrase {
    text: String,
    tokens: Vec<String>,
}

impl Phrase {
    fn new(raw: &str) -> Option<Self> {
        let text = normalize(raw.trim());
        if text.is_empty() {
            return None;
        }
        let tokens = tokenize(&text);
        Some(Self { text, tokens })
    }

    fn matches(&self, mode: MatchMode, input: &NormalizedText) -> bool {
        match mode {
            MatchMode::Substring => input.lowered.contains(&self.text),
            MatchMode::WholeWord => {
                !self.tokens.is_empty()
                    && input
                        .tokens
                        .windows(self.tokens.len())
                        .any(|w| w == self.tokens.as_slice())
            }
            MatchMode::WholeText => !self.tokens.is_empty() && input.tokens == self.tokens,
        }
    }
}

/// An ordered list of phrases sharing one match mode.
#[derive(Debug, Clone)]
pub struct PhraseList {
    mode: MatchMode,
    phrases: Vec<Phrase>,
}

impl PhraseList {
    /// Build a list; blank phrases are dropped.
    pub fn new<I, S>(mode: MatchMode, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self {
            mode,
            phrases: Vec::new(),
        };
        list.extend(phrases);
        list
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    pub fn phrases(&self) -> impl Iterator<Item = &str> {
        self.phrases.iter().map(|p| p.text.as_str())
    }

    /// Append phrases, skipping blanks and ones already present.
    pub fn extend<I, S>(&mut self, phrases: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for raw in phrases {
            if let Some(phrase) = Phrase::new(raw.as_ref()) {
                if !self.phrases.iter().any(|p| p.text == phrase.text) {
                    self.phrases.push(phrase);
                }
            }
        }
    }

    /// True if any phrase matches under this list's mode.
    pub fn matches(&self, input: &NormalizedText) -> bool {
        self.phrases.iter().any(|p| p.matches(self.mode, input))
    }
}

/// One named category and its trigger phrases.
#[derive(Debug, Clone)]
pub struct LexiconEntry {
    category: String,
    phrases: PhraseList,
}

impl LexiconEntry {
    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn phrases(&self) -> &PhraseList {
        &self.phrases
    }
}

/// Ordered categories, tested in insertion order.
///
/// Category names are unique within a table and every category has at least
/// one phrase.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    mode: MatchMode,
    entries: Vec<LexiconEntry>,
}

impl CategoryTable {
    pub fn new(mode: MatchMode) -> Self {
        Self {
            mode,
            entries: Vec::new(),
        }
    }

    fn from_static(mode: MatchMode, table: &[(&str, &[&str])]) -> Self {
        let entries = table
            .iter()
            .map(|(category, phrases)| LexiconEntry {
                category: category.to_string(),
                phrases: PhraseList::new(mode, phrases.iter()),
            })
            .collect();
        Self { mode, entries }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LexiconEntry] {
        &self.entries
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.category.as_str())
    }

    /// Add a new category.
    ///
    /// # Errors
    ///
    /// Fails if the name is blank or already taken, or if no usable phrase
    /// is given.
    pub fn insert<I, S>(&mut self, category: &str, phrases: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = category.trim().to_lowercase();
        if name.is_empty() {
            bail!("lexicon category name must not be empty");
        }
        if self.entries.iter().any(|e| e.category == name) {
            bail!("duplicate lexicon category: '{}'", name);
        }
        let list = PhraseList::new(self.mode, phrases);
        if list.is_empty() {
            bail!("lexicon category '{}' has no phrases", name);
        }
        self.entries.push(LexiconEntry {
            category: name,
            phrases: list,
        });
        Ok(())
    }

    /// Add phrases to a category, creating it when it does not exist yet.
    pub fn extend<I, S>(&mut self, category: &str, phrases: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = category.trim().to_lowercase();
        match self.entries.iter_mut().find(|e| e.category == name) {
            Some(entry) => {
                entry.phrases.extend(phrases);
                Ok(())
            }
            None => self.insert(&name, phrases),
        }
    }

    /// Does any phrase of `category` occur in the input?
    ///
    /// Unknown categories never match.
    pub fn contains(&self, category: &str, input: &NormalizedText) -> bool {
        self.entries
            .iter()
            .find(|e| e.category == category)
            .is_some_and(|e| e.phrases.matches(input))
    }

    /// Names of all matching categories, in table order.
    pub fn matching<'a>(&'a self, input: &'a NormalizedText) -> impl Iterator<Item = &'a str> {
        self.entries
            .iter()
            .filter(move |e| e.phrases.matches(input))
            .map(|e| e.category.as_str())
    }

    /// Check the table invariants: unique names and non-empty phrase lists.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for entry in &self.entries {
            if !seen.insert(entry.category.as_str()) {
                bail!("duplicate lexicon category: '{}'", entry.category);
            }
            if entry.phrases.is_empty() {
                bail!("lexicon category '{}' has no phrases", entry.category);
            }
        }
        Ok(())
    }
}

/// Additions to the built-in lexicon, usually read from the `[lexicon]`
/// config section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LexiconOverlay {
    #[serde(default)]
    pub emotions: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub topics: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub intensifiers: Vec<String>,
    #[serde(default)]
    pub distress: Vec<String>,
    #[serde(default)]
    pub gratitude: Vec<String>,
    #[serde(default)]
    pub greetings: Vec<String>,
}

/// Every keyword table the classifier uses.
#[derive(Debug, Clone)]
pub struct Lexicon {
    pub emotions: CategoryTable,
    pub topics: CategoryTable,
    pub intensifiers: PhraseList,
    pub distress: PhraseList,
    pub gratitude: PhraseList,
    pub greetings: PhraseList,
}

impl Lexicon {
    /// The built-in tables.
    pub fn builtin() -> Self {
        Self {
            emotions: CategoryTable::from_static(MatchMode::Substring, EMOTIONS),
            topics: CategoryTable::from_static(MatchMode::WholeWord, TOPICS),
            intensifiers: PhraseList::new(MatchMode::WholeWord, INTENSIFIERS),
            distress: PhraseList::new(MatchMode::Substring, DISTRESS),
            gratitude: PhraseList::new(MatchMode::WholeWord, GRATITUDE),
            greetings: PhraseList::new(MatchMode::WholeText, GREETINGS),
        }
    }

    /// Merge an overlay into these tables.
    ///
    /// Existing categories gain phrases; unknown ones are appended after the
    /// built-ins in name order.
    pub fn apply(&mut self, overlay: &LexiconOverlay) -> Result<()> {
        for (category, phrases) in &overlay.emotions {
            self.emotions.extend(category, phrases)?;
        }
        for (category, phrases) in &overlay.topics {
            self.topics.extend(category, phrases)?;
        }
        self.intensifiers.extend(&overlay.intensifiers);
        self.distress.extend(&overlay.distress);
        self.gratitude.extend(&overlay.gratitude);
        self.greetings.extend(&overlay.greetings);
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        self.emotions.validate()?;
        self.topics.validate()
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::builtin()
    }
}

// ── Built-in tables ─────────────────────────────────────────────────────

const EMOTIONS: &[(&str, &[&str])] = &[
    (
        "stress",
        &[
            "stress",
            "pressure",
            "overwhelm",
            "deadline",
            "too much",
            "swamped",
            "burdened",
        ],
    ),
    (
        "sadness",
        &[
            "sad",
            "feeling down",
            "feel down",
            "cry",
            "empty",
            "hopeless",
            "unhappy",
            "depressed",
            "heartbroken",
            "miserable",
        ],
    ),
    (
        "anxiety",
        &[
            "anxious", "anxiety", "worried", "worry", "panic", "nervous", "scared", "afraid",
            "on edge",
        ],
    ),
    (
        "fatigue",
        &[
            "tired",
            "exhausted",
            "burnout",
            "burned out",
            "burnt out",
            "fatigue",
            "drained",
            "no energy",
        ],
    ),
    (
        "sleep",
        &[
            "sleep",
            "insomnia",
            "nightmare",
            "awake all night",
            "can't rest",
        ],
    ),
    (
        "loneliness",
        &[
            "lonely",
            "alone",
            "isolated",
            "left out",
            "no friends",
            "nobody to talk",
        ],
    ),
    (
        "anger",
        &[
            "angry",
            "furious",
            "frustrated",
            "annoyed",
            "irritated",
            "mad at",
            "pissed",
        ],
    ),
];

const TOPICS: &[(&str, &[&str])] = &[
    (
        "academics",
        &[
            "school",
            "class",
            "classes",
            "exam",
            "exams",
            "midterm",
            "midterms",
            "finals",
            "grade",
            "grades",
            "homework",
            "assignment",
            "assignments",
            "coursework",
            "my course",
            "my courses",
            "study",
            "studies",
            "studying",
            "lecture",
            "lectures",
            "professor",
            "professors",
            "semester",
            "thesis",
            "project",
            "projects",
            "college",
            "university",
            "uni",
        ],
    ),
    (
        "family",
        &[
            "family",
            "parents",
            "my parent",
            "mom",
            "dad",
            "mum",
            "mother",
            "father",
            "sibling",
            "siblings",
            "brother",
            "brothers",
            "sister",
            "sisters",
            "at home",
            "back home",
        ],
    ),
    (
        "relationships",
        &[
            "friend",
            "friends",
            "friendship",
            "relationship",
            "relationships",
            "boyfriend",
            "girlfriend",
            "partner",
            "breakup",
            "break up",
            "broke up",
            "roommate",
            "roommates",
            "my crush",
        ],
    ),
    (
        "future",
        &[
            "future",
            "career",
            "careers",
            "graduate",
            "graduating",
            "graduation",
            "job hunt",
            "job hunting",
            "internship",
            "internships",
            "what to do with my life",
        ],
    ),
    (
        "self",
        &[
            "myself",
            "identity",
            "confidence",
            "self-esteem",
            "not good enough",
            "worthless",
        ],
    ),
    (
        "finance",
        &[
            "money",
            "rent",
            "tuition",
            "debt",
            "debts",
            "loan",
            "loans",
            "bills",
            "afford",
            "i'm broke",
            "finances",
            "financial",
        ],
    ),
    (
        "health",
        &[
            "health", "sick", "ill", "doctor", "pain", "headache", "headaches", "injury", "injured",
        ],
    ),
];

const INTENSIFIERS: &[&str] = &[
    "very",
    "so",
    "too",
    "really",
    "extremely",
    "always",
    "never",
    "can't",
    "completely",
    "totally",
    "constantly",
    "hard",
];

const DISTRESS: &[&str] = &[
    "i give up",
    "can't handle",
    "cannot handle",
    "can't go on",
    "cannot go on",
    "can't take it anymore",
    "nothing helps",
    "no way out",
    "no point in anything",
    "want to disappear",
    "hurt myself",
    "harm myself",
    "end it all",
    "no reason to live",
    "better off without me",
];

const GRATITUDE: &[&str] = &[
    "thank you",
    "thanks",
    "thank u",
    "thx",
    "appreciate it",
    "appreciate you",
    "that helped",
    "that really helped",
    "grateful",
];

const GREETINGS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "hiya",
    "howdy",
    "yo",
    "hi there",
    "hello there",
    "hey there",
    "good morning",
    "good afternoon",
    "good evening",
];

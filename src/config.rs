//! TOML configuration parsing and validation.
//!
//! Every section is optional; a missing file or an empty one yields
//! [`Config::minimal`], the built-in engine with no external responder.
//!
//! ```toml
//! [composer]
//! reflection = "structured"   # or "excerpt"
//! excerpt_tokens = 12
//! follow_up = "staged"        # or "random"
//! seed = 7
//!
//! [lexicon.emotions]
//! stress = ["crunch time"]
//!
//! [templates]
//! closing = "I'm here whenever you need me."
//!
//! [responder]
//! provider = "openai"         # disabled | dataset | openai
//! model = "gpt-4o-mini"
//!
//! [knowledge]
//! path = "data/knowledge.json"
//!
//! [server]
//! bind = "127.0.0.1:7345"
//! session_idle_secs = 3600
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use solace_core::{
    ComposerOptions, Engine, FollowUpMode, LexiconOverlay, ReflectionStyle, TemplateOverlay,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub composer: ComposerConfig,
    #[serde(default)]
    pub lexicon: LexiconOverlay,
    #[serde(default)]
    pub templates: TemplateOverlay,
    #[serde(default)]
    pub responder: ResponderConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ComposerConfig {
    #[serde(default)]
    pub reflection: ReflectionStyle,
    #[serde(default = "default_excerpt_tokens")]
    pub excerpt_tokens: usize,
    #[serde(default)]
    pub follow_up: FollowUpMode,
    /// Seeds every session's RNG; unset means OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            reflection: ReflectionStyle::default(),
            excerpt_tokens: default_excerpt_tokens(),
            follow_up: FollowUpMode::default(),
            seed: None,
        }
    }
}

fn default_excerpt_tokens() -> usize {
    12
}

impl ComposerConfig {
    pub fn options(&self) -> ComposerOptions {
        ComposerOptions {
            reflection: self.reflection,
            excerpt_tokens: self.excerpt_tokens,
            follow_up: self.follow_up,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResponderConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            top_k: default_top_k(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            temperature: default_temperature(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_top_k() -> usize {
    3
}
fn default_timeout_secs() -> u64 {
    20
}
fn default_max_retries() -> u32 {
    2
}
fn default_temperature() -> f32 {
    0.4
}

impl ResponderConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }

    /// Bound on the whole external call, retries included.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Bound on a single HTTP attempt. The call budget is split across the
    /// first attempt and every retry so a slow backend still leaves time to
    /// retry before the call timeout fires.
    pub fn request_timeout(&self) -> Duration {
        let attempts = self.max_retries.saturating_add(1);
        (self.call_timeout() / attempts).max(MIN_REQUEST_TIMEOUT)
    }
}

const MIN_REQUEST_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Deserialize, Clone)]
pub struct KnowledgeConfig {
    /// JSON file holding `[{ "question": ..., "answer": ... }]`.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_min_score")]
    pub min_score: f64,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            path: None,
            min_score: default_min_score(),
        }
    }
}

fn default_min_score() -> f64 {
    0.2
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Sessions idle for longer than this are dropped.
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7345".to_string()
}
fn default_session_idle_secs() -> u64 {
    3600
}

impl Config {
    /// Built-in engine, no external responder.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Build the engine described by the composer, lexicon, and template
    /// sections.
    pub fn build_engine(&self) -> Result<Engine> {
        Engine::from_overlays(&self.lexicon, &self.templates, self.composer.options())
            .with_context(|| "Invalid lexicon or template configuration")
    }
}

/// Load the config at `path`, or [`Config::minimal`] if no file exists there.
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "no config file; using built-in defaults");
        Ok(Config::minimal())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Relative dataset paths are resolved against the config file's directory
    if let Some(p) = &config.knowledge.path {
        if p.is_relative() {
            if let Some(dir) = path.parent() {
                config.knowledge.path = Some(dir.join(p));
            }
        }
    }

    validate(&config)?;
    Ok(config)
}

/// Check cross-field rules that serde cannot express.
pub fn validate(config: &Config) -> Result<()> {
    // Validate composer
    if config.composer.excerpt_tokens == 0 {
        anyhow::bail!("composer.excerpt_tokens must be > 0");
    }

    // Validate knowledge
    if !(0.0..=1.0).contains(&config.knowledge.min_score) {
        anyhow::bail!("knowledge.min_score must be in [0.0, 1.0]");
    }

    // Validate responder
    if config.responder.top_k == 0 {
        anyhow::bail!("responder.top_k must be >= 1");
    }
    if config.responder.timeout_secs == 0 {
        anyhow::bail!("responder.timeout_secs must be > 0");
    }

    // Validate server
    if config.server.session_idle_secs == 0 {
        anyhow::bail!("server.session_idle_secs must be > 0");
    }

    match config.responder.provider.as_str() {
        "disabled" => {}
        "dataset" => {
            if config.knowledge.path.is_none() {
                anyhow::bail!("knowledge.path must be set when responder.provider is 'dataset'");
            }
        }
        "openai" => {
            if config.responder.model.is_none() {
                anyhow::bail!("responder.model must be specified when provider is 'openai'");
            }
        }
        other => anyhow::bail!(
            "Unknown responder provider: '{}'. Must be disabled, dataset, or openai.",
            other
        ),
    }

    config.build_engine()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(tmp: &TempDir, content: &str) -> PathBuf {
        let path = tmp.path().join("solace.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_empty_file_is_minimal() {
        let tmp = TempDir::new().unwrap();
        let cfg = load_config(&write_config(&tmp, "")).unwrap();
        assert_eq!(cfg.responder.provider, "disabled");
        assert_eq!(cfg.composer.excerpt_tokens, 12);
        assert_eq!(cfg.server.bind, "127.0.0.1:7345");
        assert_eq!(cfg.server.session_idle_secs, 3600);
        assert!(!cfg.responder.is_enabled());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let tmp = TempDir::new().unwrap();
        let cfg = load_config_or_default(&tmp.path().join("nope.toml")).unwrap();
        assert!(cfg.knowledge.path.is_none());
    }

    #[test]
    fn test_full_config_parses() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            r#"
[composer]
reflection = "excerpt"
excerpt_tokens = 5
follow_up = "random"
seed = 11

[lexicon]
intensifiers = ["super"]

[lexicon.emotions]
stress = ["crunch time"]

[templates.tips]
stress = ["Breathe first."]

[responder]
provider = "dataset"
top_k = 2

[knowledge]
path = "kb.json"
min_score = 0.3
"#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.composer.reflection, ReflectionStyle::Excerpt);
        assert_eq!(cfg.composer.follow_up, FollowUpMode::Random);
        assert_eq!(cfg.composer.seed, Some(11));
        assert_eq!(cfg.lexicon.intensifiers, vec!["super"]);
        assert_eq!(cfg.knowledge.path, Some(tmp.path().join("kb.json")));
        assert_eq!(cfg.responder.top_k, 2);
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "[responder]\nprovider = \"magic\"\n");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("Unknown responder provider"));
    }

    #[test]
    fn test_openai_requires_model() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "[responder]\nprovider = \"openai\"\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_dataset_requires_path() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "[responder]\nprovider = \"dataset\"\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_rejects_bad_ranges() {
        let tmp = TempDir::new().unwrap();
        for content in [
            "[composer]\nexcerpt_tokens = 0\n",
            "[knowledge]\nmin_score = 1.5\n",
            "[responder]\ntop_k = 0\n",
            "[responder]\ntimeout_secs = 0\n",
            "[server]\nsession_idle_secs = 0\n",
        ] {
            let path = write_config(&tmp, content);
            assert!(load_config(&path).is_err(), "accepted: {}", content);
        }
    }

    #[test]
    fn test_example_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/solace.example.toml");
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.responder.provider, "dataset");
        assert!(cfg.knowledge.path.as_ref().unwrap().exists());

        let engine = cfg.build_engine().unwrap();
        let c = engine.classify("my landlord won't fix the heating");
        assert_eq!(c.topics, vec!["housing"]);
    }

    #[test]
    fn test_request_timeout_splits_call_budget() {
        let cfg = ResponderConfig::default();
        assert_eq!(cfg.call_timeout(), Duration::from_secs(20));
        // 20s over three attempts
        assert!(cfg.request_timeout() < cfg.call_timeout());
        assert!(cfg.request_timeout() * 3 <= cfg.call_timeout());

        let single = ResponderConfig {
            max_retries: 0,
            ..ResponderConfig::default()
        };
        assert_eq!(single.request_timeout(), single.call_timeout());

        let tight = ResponderConfig {
            timeout_secs: 1,
            max_retries: 10,
            ..ResponderConfig::default()
        };
        assert_eq!(tight.request_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_rejects_empty_template_sequence() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "[templates]\ngratitude = []\n");
        assert!(load_config(&path).is_err());
    }
}

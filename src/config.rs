//! Configuration types for recipe extraction.
//!
//! Process-wide behaviour (which model, how long to wait for a page, how to
//! treat tags) lives in [`ExtractionConfig`], built once at startup via its
//! [`ExtractionConfigBuilder`] and handed to [`crate::extract::Extractor`].
//! Per-request caller choices (target language and units) travel separately
//! as [`ExtractionPreferences`].

use crate::error::ExtractError;
use crate::progress::{ExtractionProgressCallback, ProgressCallback};
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Language used when the caller expresses no preference.
pub const DEFAULT_LANGUAGE: &str = "English";

/// Measurement system used when the caller expresses no preference.
pub const DEFAULT_UNITS: &str = "metric";

/// Configuration for the extraction pipeline.
///
/// # Example
/// ```rust
/// use recipe_extract::{ContentLimit, ExtractionConfig, TagPolicy};
///
/// let config = ExtractionConfig::builder()
///     .model("gemini-2.0-flash")
///     .content_limit(ContentLimit::Chars(8_000))
///     .tag_policy(TagPolicy::Permissive)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// LLM model identifier, e.g. "gemini-2.0-flash", "gpt-4.1-mini".
    /// If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Extraction is transcription, not writing; a low temperature keeps the
    /// model close to the page.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 2048.
    pub max_tokens: usize,

    /// How much scraped page text is sent to the model. Default: unlimited.
    pub content_limit: ContentLimit,

    /// How returned tags are checked against [`crate::prompts::TAG_VOCABULARY`].
    /// Default: [`TagPolicy::Filter`].
    pub tag_policy: TagPolicy,

    /// Page fetch timeout in seconds. Default: 30.
    pub fetch_timeout_secs: u64,

    /// User-Agent sent with page fetches.
    pub user_agent: String,

    /// Longest edge, in pixels, of an uploaded photo after normalisation. Default: 2000.
    ///
    /// Phone photos are routinely 4000+ px; vision APIs downscale them anyway
    /// and bill for the upload.
    pub max_image_pixels: u32,

    /// Optional stage observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 2048,
            content_limit: ContentLimit::default(),
            tag_policy: TagPolicy::default(),
            fetch_timeout_secs: 30,
            user_agent: format!("recipe-extract/{}", env!("CARGO_PKG_VERSION")),
            max_image_pixels: 2000,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("content_limit", &self.content_limit)
            .field("tag_policy", &self.tag_policy)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_image_pixels", &self.max_image_pixels)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn content_limit(mut self, limit: ContentLimit) -> Self {
        self.config.content_limit = limit;
        self
    }

    pub fn tag_policy(mut self, policy: TagPolicy) -> Self {
        self.config.tag_policy = policy;
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn max_image_pixels(mut self, px: u32) -> Self {
        self.config.max_image_pixels = px;
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn ExtractionProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(ExtractError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.fetch_timeout_secs == 0 {
            return Err(ExtractError::InvalidConfig(
                "fetch timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_image_pixels < 100 {
            return Err(ExtractError::InvalidConfig(format!(
                "max_image_pixels must be ≥ 100, got {}",
                c.max_image_pixels
            )));
        }
        if let ContentLimit::Chars(0) = c.content_limit {
            return Err(ExtractError::InvalidConfig(
                "content limit must be ≥ 1 character".into(),
            ));
        }
        if c.user_agent.trim().is_empty() {
            return Err(ExtractError::InvalidConfig("user agent must not be empty".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Maximum amount of scraped page text placed in the prompt.
///
/// Recipe pages carry a lot of navigation and comment noise, and where the
/// recipe itself sits on the page varies, so nothing is cut by default.
/// Set a character budget when model context or cost is the constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContentLimit {
    /// Send the whole cleaned text (default).
    #[default]
    Unlimited,
    /// Send at most this many characters (Unicode scalar values).
    Chars(usize),
}

impl ContentLimit {
    /// Apply the limit. Returns the (possibly shortened) text and whether
    /// anything was cut. Never splits a character.
    pub fn apply<'a>(&self, text: &'a str) -> (&'a str, bool) {
        match *self {
            ContentLimit::Unlimited => (text, false),
            ContentLimit::Chars(max) => match text.char_indices().nth(max) {
                Some((byte_idx, _)) => (&text[..byte_idx], true),
                None => (text, false),
            },
        }
    }
}

/// What to do with returned tags that are not in the advertised vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TagPolicy {
    /// Drop off-vocabulary tags, keep the rest in canonical spelling. (default)
    #[default]
    Filter,
    /// Like `Filter`, but a response with no vocabulary tag at all is malformed.
    Strict,
    /// Keep whatever the model returned.
    Permissive,
}

/// Per-request caller preferences.
///
/// Unauthenticated callers use [`ExtractionPreferences::default`]
/// (`"English"` / `"metric"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionPreferences {
    /// Language the recipe should be written in.
    #[serde(default = "default_language")]
    pub language: String,
    /// Measurement system for quantities, e.g. "metric" or "imperial".
    #[serde(default = "default_units")]
    pub units: String,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_units() -> String {
    DEFAULT_UNITS.to_string()
}

impl Default for ExtractionPreferences {
    fn default() -> Self {
        Self {
            language: default_language(),
            units: default_units(),
        }
    }
}

impl ExtractionPreferences {
    /// Build preferences from optional caller values; blanks fall back to defaults.
    pub fn new(language: Option<&str>, units: Option<&str>) -> Self {
        let pick = |v: Option<&str>, fallback: &str| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(fallback)
                .to_string()
        };
        Self {
            language: pick(language, DEFAULT_LANGUAGE),
            units: pick(units, DEFAULT_UNITS),
        }
    }
}

//! # recipe-extract
//!
//! Turn a recipe web page or a photo of a recipe into structured data
//! (title, ingredients, steps, tags, image link) using a generative model.
//!
//! ## Why this crate?
//!
//! Recipe pages bury the recipe under navigation, ads and life stories, and
//! hand-written cards have no markup at all. Site-specific scrapers break as
//! soon as a template changes. Instead this crate reduces the input to its
//! visible text (or a normalised photo), asks a model for one JSON object,
//! and then refuses to trust that object until it has been validated.
//!
//! ## Pipeline Overview
//!
//! ```text
//! URL or photo
//!  │
//!  ├─ 1. Acquire   fetch + scrape visible text, or decode + normalise the photo
//!  ├─ 2. Prompt    deterministic template with language/unit preferences
//!  ├─ 3. Generate  one model call via edgequake-llm (no retry)
//!  ├─ 4. Parse     strip fences, strict JSON validation, tag policy
//!  └─ 5. Merge     fall back to the page's own image link
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use recipe_extract::{ExtractionConfig, ExtractionPreferences, Extractor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / ...
//!     let extractor = Extractor::new(ExtractionConfig::default())?;
//!     let prefs = ExtractionPreferences::default();
//!     let output = extractor
//!         .extract_from_url("https://example.com/pancakes", &prefs)
//!         .await?;
//!     println!("{}", serde_json::to_string_pretty(&output.recipe)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `recipe-extract` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! recipe-extract = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ContentLimit, ExtractionConfig, ExtractionConfigBuilder, ExtractionPreferences, TagPolicy,
};
pub use error::{ExtractError, FailureKind};
pub use extract::{preview_image_prompt, resolve_provider, Extractor, DEFAULT_MODEL};
pub use output::{ExtractedRecipe, ExtractionOutput, ExtractionStats, ScrapedContent, SourceKind};
pub use pipeline::input::{HttpFetcher, PageFetcher};
pub use pipeline::llm::{LlmGenerator, RawModelResponse, RecipeGenerator};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use prompts::{build_prompt, build_text_prompt, PromptDocument};

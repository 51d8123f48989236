//! Extraction entry points.
//!
//! [`Extractor`] is built once per process: construction resolves the model
//! provider and fails fast with [`ExtractError::ProviderNotConfigured`] when
//! no credential is available. After that it is immutable and can be shared
//! (`Arc<Extractor>`) by any number of concurrent requests; each call runs
//! its own sequential pipeline with no state carried between calls.

use crate::config::{ExtractionConfig, ExtractionPreferences};
use crate::error::ExtractError;
use crate::output::{ExtractedRecipe, ExtractionOutput, ExtractionStats, SourceKind};
use crate::pipeline::input::{self, HttpFetcher, PageFetcher};
use crate::pipeline::llm::{LlmGenerator, RecipeGenerator};
use crate::pipeline::{encode, merge, postprocess, scrape};
use crate::progress::{ProgressCallback, Stage};
use crate::prompts::{self, ExtractionContext, Payload, PromptDocument};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Model used when a provider is named without a model.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Runs the extraction pipeline against one configured model.
pub struct Extractor {
    config: ExtractionConfig,
    fetcher: Arc<dyn PageFetcher>,
    generator: Arc<dyn RecipeGenerator>,
}

impl fmt::Debug for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extractor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Extractor {
    /// Resolve the model provider and HTTP client.
    ///
    /// # Errors
    /// [`ExtractError::ProviderNotConfigured`] when no provider can be
    /// resolved from the config or the environment.
    pub fn new(config: ExtractionConfig) -> Result<Self, ExtractError> {
        let provider = resolve_provider(&config)?;
        debug!("Model provider resolved");
        let generator = Arc::new(LlmGenerator::new(provider, &config));
        let fetcher = Arc::new(HttpFetcher::new(&config)?);
        Ok(Self {
            config,
            fetcher,
            generator,
        })
    }

    /// Build an extractor from caller-supplied collaborators.
    pub fn with_parts(
        config: ExtractionConfig,
        fetcher: Arc<dyn PageFetcher>,
        generator: Arc<dyn RecipeGenerator>,
    ) -> Self {
        Self {
            config,
            fetcher,
            generator,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract a recipe from a web page.
    ///
    /// # Errors
    /// - Fetch-kind errors (bad URL, transport failure, non-2xx) before any
    ///   prompt is built or model called
    /// - [`ExtractError::LlmApiError`] when the model call fails
    /// - [`ExtractError::MalformedOutput`] when the reply is not a usable recipe
    pub async fn extract_from_url(
        &self,
        url: &str,
        prefs: &ExtractionPreferences,
    ) -> Result<ExtractionOutput, ExtractError> {
        info!("Starting extraction from URL: {}", url);
        let run = Run::new(self.config.progress_callback.as_ref());
        let result = self.url_pipeline(url, prefs, &run).await;
        run.finish(result)
    }

    /// Extract a recipe from a photograph.
    ///
    /// `bytes` may be any raster format the `image` crate decodes (PNG,
    /// JPEG, WebP, GIF).
    pub async fn extract_from_image(
        &self,
        bytes: &[u8],
        prefs: &ExtractionPreferences,
    ) -> Result<ExtractionOutput, ExtractError> {
        info!("Starting extraction from image ({} bytes)", bytes.len());
        let run = Run::new(self.config.progress_callback.as_ref());
        let result = self.image_pipeline(bytes.to_vec(), prefs, &run).await;
        run.finish(result)
    }

    /// Read a photo from disk and extract a recipe from it.
    pub async fn extract_from_image_file(
        &self,
        path: impl AsRef<Path>,
        prefs: &ExtractionPreferences,
    ) -> Result<ExtractionOutput, ExtractError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ExtractError::ImageReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
        self.extract_from_image(&bytes, prefs).await
    }

    /// Synchronous wrapper around [`Extractor::extract_from_url`].
    ///
    /// Creates a temporary tokio runtime internally.
    pub fn extract_from_url_sync(
        &self,
        url: &str,
        prefs: &ExtractionPreferences,
    ) -> Result<ExtractionOutput, ExtractError> {
        new_runtime()?.block_on(self.extract_from_url(url, prefs))
    }

    /// Synchronous wrapper around [`Extractor::extract_from_image`].
    pub fn extract_from_image_sync(
        &self,
        bytes: &[u8],
        prefs: &ExtractionPreferences,
    ) -> Result<ExtractionOutput, ExtractError> {
        new_runtime()?.block_on(self.extract_from_image(bytes, prefs))
    }

    // ── Pipelines ────────────────────────────────────────────────────────

    async fn url_pipeline(
        &self,
        url: &str,
        prefs: &ExtractionPreferences,
        run: &Run<'_>,
    ) -> Result<ExtractionOutput, ExtractError> {
        // ── Acquire ──────────────────────────────────────────────────────
        run.enter(Stage::Acquiring);
        let acquire_start = Instant::now();
        let page_url = input::parse_source_url(url)?;
        let html = self.fetcher.fetch(&page_url).await?;
        let scraped = scrape::scrape_document(&html, &page_url);
        let acquire_duration_ms = acquire_start.elapsed().as_millis() as u64;
        if scraped.text.is_empty() {
            warn!("No visible text found on {}", page_url);
        }

        // ── Prompt ───────────────────────────────────────────────────────
        run.enter(Stage::Prompting);
        let (text, content_truncated) = self.config.content_limit.apply(&scraped.text);
        let content_chars = text.chars().count();
        if content_truncated {
            info!(
                "Page text truncated to {} of {} chars",
                content_chars,
                scraped.text.chars().count()
            );
        }
        let prompt = prompts::build_prompt(ExtractionContext {
            preferences: prefs.clone(),
            payload: Payload::Text(text.to_string()),
        });

        // ── Generate + parse ─────────────────────────────────────────────
        let (recipe, mut stats) = self.generate_and_parse(&prompt, run).await?;

        // ── Merge ────────────────────────────────────────────────────────
        run.enter(Stage::Merging);
        let recipe = merge::merge_image_url(recipe, scraped.image_url.as_deref());

        stats.content_chars = content_chars;
        stats.content_truncated = content_truncated;
        stats.acquire_duration_ms = acquire_duration_ms;
        stats.total_duration_ms = run.elapsed_ms();
        Ok(ExtractionOutput {
            recipe,
            source: SourceKind::Url,
            stats,
        })
    }

    async fn image_pipeline(
        &self,
        bytes: Vec<u8>,
        prefs: &ExtractionPreferences,
        run: &Run<'_>,
    ) -> Result<ExtractionOutput, ExtractError> {
        // ── Acquire: decode + normalise off the async workers ────────────
        run.enter(Stage::Acquiring);
        let acquire_start = Instant::now();
        let max_pixels = self.config.max_image_pixels;
        let image = tokio::task::spawn_blocking(move || encode::prepare_upload(&bytes, max_pixels))
            .await
            .map_err(|e| ExtractError::Internal(format!("Image task panicked: {e}")))??;
        let acquire_duration_ms = acquire_start.elapsed().as_millis() as u64;

        // ── Prompt ───────────────────────────────────────────────────────
        run.enter(Stage::Prompting);
        let prompt = prompts::build_prompt(ExtractionContext {
            preferences: prefs.clone(),
            payload: Payload::Image(image),
        });

        // ── Generate + parse ─────────────────────────────────────────────
        let (recipe, mut stats) = self.generate_and_parse(&prompt, run).await?;

        // ── Merge: no scraped fallback for uploads ───────────────────────
        run.enter(Stage::Merging);
        let recipe = merge::merge_image_url(recipe, None);

        stats.acquire_duration_ms = acquire_duration_ms;
        stats.total_duration_ms = run.elapsed_ms();
        Ok(ExtractionOutput {
            recipe,
            source: SourceKind::Image,
            stats,
        })
    }

    async fn generate_and_parse(
        &self,
        prompt: &PromptDocument,
        run: &Run<'_>,
    ) -> Result<(ExtractedRecipe, ExtractionStats), ExtractError> {
        run.enter(Stage::Generating);
        let llm_start = Instant::now();
        let raw = self.generator.generate(prompt).await?;
        let llm_duration_ms = llm_start.elapsed().as_millis() as u64;
        if let Some(cb) = run.callback {
            cb.on_generation_complete(raw.input_tokens, raw.output_tokens);
        }

        run.enter(Stage::Parsing);
        let parsed = postprocess::parse_recipe(&raw.text).and_then(|mut recipe| {
            recipe.tags =
                postprocess::apply_tag_policy(std::mem::take(&mut recipe.tags), self.config.tag_policy)?;
            Ok(recipe)
        });
        let recipe = parsed.inspect_err(|e| {
            warn!("Unusable model output: {}\n--- raw response ---\n{}", e, raw.text);
        })?;

        let stats = ExtractionStats {
            input_tokens: raw.input_tokens,
            output_tokens: raw.output_tokens,
            llm_duration_ms,
            ..Default::default()
        };
        Ok((recipe, stats))
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Stage bookkeeping for one pipeline run.
struct Run<'a> {
    callback: Option<&'a ProgressCallback>,
    started: Instant,
}

impl<'a> Run<'a> {
    fn new(callback: Option<&'a ProgressCallback>) -> Self {
        Self {
            callback,
            started: Instant::now(),
        }
    }

    fn enter(&self, stage: Stage) {
        debug!("Stage: {}", stage);
        if let Some(cb) = self.callback {
            cb.on_stage(stage);
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Report the terminal state and hand the result back.
    fn finish(
        &self,
        result: Result<ExtractionOutput, ExtractError>,
    ) -> Result<ExtractionOutput, ExtractError> {
        match &result {
            Ok(out) => {
                self.enter(Stage::Succeeded);
                info!(
                    "Extraction complete: '{}' ({} ingredients, {} steps) in {}ms",
                    out.recipe.title,
                    out.recipe.ingredients.len(),
                    out.recipe.steps.len(),
                    self.elapsed_ms()
                );
            }
            Err(e) => {
                self.enter(Stage::Failed(e.kind()));
                warn!("Extraction failed after {}ms: {}", self.elapsed_ms(), e);
            }
        }
        result
    }
}

fn new_runtime() -> Result<tokio::runtime::Runtime, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ExtractError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. **Pre-built provider** (`config.provider`): used as-is.
/// 2. **Named provider** (`config.provider_name`): with `config.model` or
///    [`DEFAULT_MODEL`]; the factory reads the matching API key.
/// 3. **Environment pair** (`RECIPE_EXTRACT_PROVIDER` + `RECIPE_EXTRACT_MODEL`).
/// 4. **`GEMINI_API_KEY` present**: Gemini with `config.model` or [`DEFAULT_MODEL`].
/// 5. **Full auto-detection** (`ProviderFactory::from_env`); its offline
///    `mock` fallback counts as no provider.
pub fn resolve_provider(config: &ExtractionConfig) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Some(prov), Some(model)) = (
        non_empty_env("RECIPE_EXTRACT_PROVIDER"),
        non_empty_env("RECIPE_EXTRACT_MODEL"),
    ) {
        return create_provider(&prov, &model);
    }

    if non_empty_env("GEMINI_API_KEY").is_some() {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider("gemini", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ExtractError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    // Auto-detection falls back to an offline mock when nothing is set.
    if llm_provider.name() == "mock" {
        return Err(ExtractError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: "No LLM credential found in the environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider."
                .to_string(),
        });
    }

    Ok(llm_provider)
}

/// Prompt that [`Extractor::extract_from_image`] would send for `bytes`.
///
/// The image is decoded and normalised first, so bytes the real run would
/// reject fail here too.
pub fn preview_image_prompt(
    bytes: &[u8],
    prefs: &ExtractionPreferences,
    config: &ExtractionConfig,
) -> Result<String, ExtractError> {
    encode::prepare_upload(bytes, config.max_image_pixels)?;
    Ok(prompts::build_image_prompt(prefs))
}

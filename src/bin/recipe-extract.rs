//! CLI binary for recipe-extract.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints the recipe as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use recipe_extract::pipeline::{input, scrape};
use recipe_extract::prompts::build_text_prompt;
use recipe_extract::{
    preview_image_prompt, ContentLimit, ExtractionConfig, ExtractionOutput,
    ExtractionPreferences, ExtractionProgressCallback, Extractor, HttpFetcher, PageFetcher,
    ProgressCallback, Stage, TagPolicy,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that follows the pipeline stages on stderr.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Extracting");
        bar.set_message("starting…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_stage(&self, stage: Stage) {
        match stage {
            Stage::Acquiring => self.bar.set_message("reading the source…"),
            Stage::Prompting => self.bar.set_message("building the prompt…"),
            Stage::Generating => self.bar.set_message("waiting for the model…"),
            Stage::Parsing => self.bar.set_message("validating the answer…"),
            Stage::Merging => self.bar.set_message("finishing…"),
            Stage::Succeeded => {
                self.bar.finish_and_clear();
                eprintln!("{} {}", green("✔"), bold("Recipe extracted"));
            }
            Stage::Failed(kind) => {
                self.bar.finish_and_clear();
                eprintln!("{} {}", red("✘"), bold(&format!("Extraction failed ({kind})")));
            }
        }
    }

    fn on_generation_complete(&self, input_tokens: usize, output_tokens: usize) {
        self.bar.println(format!(
            "  {} model answered  {}",
            green("✓"),
            dim(&format!("{input_tokens} tokens in / {output_tokens} tokens out")),
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract from a recipe page
  recipe-extract https://example.com/best-pancakes

  # Extract from a photo of a recipe card
  recipe-extract --image card.jpg --pretty

  # Spanish output, imperial units
  recipe-extract --language Spanish --units imperial https://example.com/chili

  # Use a specific provider and model
  recipe-extract --provider openai --model gpt-4.1-mini https://example.com/soup

  # Show the exact prompt without calling a model (no API key needed)
  recipe-extract --print-prompt https://example.com/best-pancakes

TAG POLICIES:
  filter       keep only tags from the fixed vocabulary (default)
  strict       like filter, but fail when no known tag remains
  permissive   keep every tag the model returned

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY            Google Gemini API key (default provider)
  OPENAI_API_KEY            OpenAI API key
  ANTHROPIC_API_KEY         Anthropic API key
  RECIPE_EXTRACT_PROVIDER   Override provider (gemini, openai, anthropic, ollama)
  RECIPE_EXTRACT_MODEL      Override model ID
"#;

/// Extract structured recipes from web pages and photos using LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "recipe-extract",
    version,
    about = "Extract structured recipes from web pages and photos using LLMs",
    long_about = "Turn a recipe web page (URL) or a photo of a recipe into a JSON object with \
title, ingredients, steps, tags and an image link. Supports Google Gemini, OpenAI, Anthropic \
and any provider edgequake-llm can reach.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// HTTP/HTTPS URL of a recipe page, or an image path with --image.
    source: String,

    /// Treat SOURCE as a local image file (PNG, JPEG, WebP, GIF).
    #[arg(long)]
    image: bool,

    /// Language for the extracted recipe.
    #[arg(long, env = "RECIPE_EXTRACT_LANGUAGE", default_value = "English")]
    language: String,

    /// Unit system for quantities (e.g. metric, imperial).
    #[arg(long, env = "RECIPE_EXTRACT_UNITS", default_value = "metric")]
    units: String,

    /// LLM provider: gemini, openai, anthropic, ollama.
    #[arg(
        long,
        env = "RECIPE_EXTRACT_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: gemini, openai, anthropic, azure, ollama."
    )]
    provider: Option<String>,

    /// LLM model ID (e.g. gemini-2.0-flash, gpt-4.1-mini).
    #[arg(long, env = "RECIPE_EXTRACT_MODEL")]
    model: Option<String>,

    /// Truncate page text sent to the model to this many characters.
    #[arg(long, env = "RECIPE_EXTRACT_MAX_CONTENT_CHARS",
          value_parser = clap::value_parser!(u64).range(1..))]
    max_content_chars: Option<u64>,

    /// How to treat tags outside the fixed vocabulary.
    #[arg(long, env = "RECIPE_EXTRACT_TAG_POLICY", value_enum, default_value = "filter")]
    tag_policy: TagPolicyArg,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "RECIPE_EXTRACT_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "RECIPE_EXTRACT_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// HTTP fetch timeout in seconds.
    #[arg(long, env = "RECIPE_EXTRACT_FETCH_TIMEOUT", default_value_t = 30)]
    fetch_timeout: u64,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,

    /// Print the prompt that would be sent and exit without calling a model.
    #[arg(long)]
    print_prompt: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "RECIPE_EXTRACT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "RECIPE_EXTRACT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "RECIPE_EXTRACT_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum TagPolicyArg {
    Filter,
    Strict,
    Permissive,
}

impl From<TagPolicyArg> for TagPolicy {
    fn from(v: TagPolicyArg) -> Self {
        match v {
            TagPolicyArg::Filter => TagPolicy::Filter,
            TagPolicyArg::Strict => TagPolicy::Strict,
            TagPolicyArg::Permissive => TagPolicy::Permissive,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.print_prompt;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let prefs = ExtractionPreferences::new(Some(&cli.language), Some(&cli.units));

    // ── Prompt preview (no model credential needed) ──────────────────────
    if cli.print_prompt {
        let config = build_config(&cli, None)?;
        let prompt = preview_prompt(&cli, &config, &prefs).await?;
        println!("{prompt}");
        return Ok(());
    }

    // ── Build extractor ──────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;
    let extractor = Extractor::new(config).context("Failed to set up the model provider")?;

    // ── Run extraction ───────────────────────────────────────────────────
    let output = if cli.image {
        extractor
            .extract_from_image_file(&PathBuf::from(&cli.source), &prefs)
            .await
    } else {
        extractor.extract_from_url(&cli.source, &prefs).await
    }
    .context("Extraction failed")?;

    write_recipe(&output, cli.pretty)?;

    if !cli.quiet {
        eprintln!(
            "   {} ingredients, {} steps  {}",
            output.recipe.ingredients.len(),
            output.recipe.steps.len(),
            dim(&format!(
                "{} tokens in / {} tokens out, {}ms total",
                output.stats.input_tokens,
                output.stats.output_tokens,
                output.stats.total_duration_ms
            )),
        );
        if output.stats.content_truncated {
            eprintln!(
                "   {}",
                dim(&format!(
                    "page text truncated to {} chars",
                    output.stats.content_chars
                ))
            );
        }
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let content_limit = match cli.max_content_chars {
        Some(n) => ContentLimit::Chars(n as usize),
        None => ContentLimit::Unlimited,
    };

    let mut builder = ExtractionConfig::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .content_limit(content_limit)
        .tag_policy(cli.tag_policy.clone().into())
        .fetch_timeout_secs(cli.fetch_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Render the prompt for `--print-prompt`, fetching the page when needed.
async fn preview_prompt(
    cli: &Cli,
    config: &ExtractionConfig,
    prefs: &ExtractionPreferences,
) -> Result<String> {
    if cli.image {
        let bytes = tokio::fs::read(&cli.source)
            .await
            .with_context(|| format!("Failed to read image {}", cli.source))?;
        return preview_image_prompt(&bytes, prefs, config)
            .with_context(|| format!("Unusable image {}", cli.source));
    }

    let url = input::parse_source_url(&cli.source)?;
    let fetcher = HttpFetcher::new(config)?;
    let html = fetcher
        .fetch(&url)
        .await
        .with_context(|| format!("Failed to fetch {url}"))?;
    let scraped = scrape::scrape_document(&html, &url);
    let (text, _) = config.content_limit.apply(&scraped.text);
    Ok(build_text_prompt(prefs, text))
}

fn write_recipe(output: &ExtractionOutput, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(&output.recipe)
    } else {
        serde_json::to_string(&output.recipe)
    }
    .context("Failed to serialise recipe")?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{json}").context("Failed to write to stdout")?;
    Ok(())
}

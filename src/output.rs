//! Data carried between pipeline stages and returned to callers.

use serde::{Deserialize, Serialize};

/// Cleaned text and best-effort image link taken from a recipe page.
///
/// `text` holds the visible text nodes of the page in document order, one
/// per line, trimmed, with blank lines removed. Script, style and hidden
/// markup never reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedContent {
    pub text: String,
    /// Social-preview image, else the first image inside a content region.
    pub image_url: Option<String>,
}

/// A validated, structured recipe.
///
/// On success `ingredients` and `steps` are never empty and every entry is
/// non-blank text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecipe {
    pub title: String,
    pub ingredients: Vec<String>,
    /// One atomic action per entry, in order.
    pub steps: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Which kind of source the recipe came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Url,
    Image,
}

/// Timing and usage figures for one extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Prompt tokens reported by the provider.
    pub input_tokens: usize,
    /// Completion tokens reported by the provider.
    pub output_tokens: usize,
    /// Characters of page text placed in the prompt (0 for images).
    pub content_chars: usize,
    /// Whether the page text was cut by the configured content limit.
    pub content_truncated: bool,
    /// Time spent fetching/decoding the source.
    pub acquire_duration_ms: u64,
    /// Time spent waiting on the model.
    pub llm_duration_ms: u64,
    /// Wall-clock time for the whole pipeline.
    pub total_duration_ms: u64,
}

/// Result of a successful extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub recipe: ExtractedRecipe,
    pub source: SourceKind,
    pub stats: ExtractionStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_image_url_is_not_serialised() {
        let r = ExtractedRecipe {
            title: "Toast".into(),
            ingredients: vec!["bread".into()],
            steps: vec!["Toast the bread.".into()],
            tags: vec![],
            image_url: None,
        };
        let json = serde_json::to_string(&r).unwrap();
        assert!(!json.contains("image_url"), "got: {json}");
    }

    #[test]
    fn source_kind_serialises_snake_case() {
        assert_eq!(serde_json::to_string(&SourceKind::Url).unwrap(), "\"url\"");
        assert_eq!(serde_json::to_string(&SourceKind::Image).unwrap(), "\"image\"");
    }
}

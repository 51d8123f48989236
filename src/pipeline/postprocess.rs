//! Post-processing: turn untrusted model text into an [`ExtractedRecipe`].
//!
//! The prompt asks for one bare JSON object, but models still wrap it in
//! ```` ```json ```` fences, prepend a byte-order mark, or answer in prose.
//! This module applies a few deterministic passes and then validates
//! strictly; anything that does not survive becomes
//! [`ExtractError::MalformedOutput`].
//!
//! ## Pass Order
//!
//! 1. Strip invisible Unicode (BOM, zero-width characters)
//! 2. Normalise line endings (CRLF → LF)
//! 3. Strip one outer code fence, with or without a language tag
//! 4. Parse JSON; the top-level value must be an object
//! 5. Validate fields: `title`, `ingredients`, `steps` required and non-empty
//! 6. Tidy entries: trim, drop blanks, lower-case and deduplicate tags

use crate::config::TagPolicy;
use crate::error::ExtractError;
use crate::output::ExtractedRecipe;
use crate::prompts::TAG_VOCABULARY;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

/// Sanitise and parse a raw model response.
///
/// Tags are tidied but not checked against the vocabulary; see
/// [`apply_tag_policy`].
pub fn parse_recipe(raw: &str) -> Result<ExtractedRecipe, ExtractError> {
    let s = remove_invisible_chars(raw);
    let s = normalise_line_endings(&s);
    let body = strip_code_fences(&s);

    let value: Value = serde_json::from_str(body)
        .map_err(|e| ExtractError::malformed(format!("response is not valid JSON ({e})")))?;

    let map = match value {
        Value::Object(map) => map,
        other => {
            return Err(ExtractError::malformed(format!(
                "expected a JSON object, got {}",
                json_type(&other)
            )))
        }
    };

    Ok(ExtractedRecipe {
        title: required_string(&map, "title")?,
        ingredients: required_list(&map, "ingredients")?,
        steps: required_list(&map, "steps")?,
        tags: tidy_tags(optional_list(&map, "tags")?),
        image_url: optional_image_url(&map),
    })
}

// ── Pass 1: Strip invisible Unicode ──────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| {
            !matches!(
                c,
                '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}'
            )
        })
        .collect()
}

// ── Pass 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Pass 3: Strip outer code fence ───────────────────────────────────────────

static RE_OPEN_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^```[a-z0-9_+.\-]*[ \t]*\n?").unwrap());

/// Remove one leading fence (and its language tag) plus the matching
/// closing fence.
///
/// Text that does not start with a fence is returned unchanged, which makes
/// the function idempotent on fenced and unfenced input alike.
pub fn strip_code_fences(input: &str) -> &str {
    let trimmed = input.trim();
    let Some(open) = RE_OPEN_FENCE.find(trimmed) else {
        return input;
    };
    let body = &trimmed[open.end()..];
    let body = body.strip_suffix("```").unwrap_or(body);
    body.trim()
}

// ── Pass 4/5: Field validation ───────────────────────────────────────────────

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn required_string(map: &Map<String, Value>, key: &str) -> Result<String, ExtractError> {
    match map.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::String(_)) => Err(ExtractError::malformed(format!("'{key}' is empty"))),
        Some(other) => Err(ExtractError::malformed(format!(
            "'{key}' must be a string, got {}",
            json_type(other)
        ))),
        None => Err(ExtractError::malformed(format!("missing required field '{key}'"))),
    }
}

/// A string array with at least one non-blank entry.
fn required_list(map: &Map<String, Value>, key: &str) -> Result<Vec<String>, ExtractError> {
    let items = match map.get(key) {
        Some(Value::Array(items)) => string_items(items, key)?,
        Some(other) => {
            return Err(ExtractError::malformed(format!(
                "'{key}' must be a list of strings, got {}",
                json_type(other)
            )))
        }
        None => return Err(ExtractError::malformed(format!("missing required field '{key}'"))),
    };
    if items.is_empty() {
        return Err(ExtractError::malformed(format!("'{key}' is empty")));
    }
    Ok(items)
}

/// A string array that may be absent or null.
fn optional_list(map: &Map<String, Value>, key: &str) -> Result<Vec<String>, ExtractError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => string_items(items, key),
        Some(other) => Err(ExtractError::malformed(format!(
            "'{key}' must be a list of strings, got {}",
            json_type(other)
        ))),
    }
}

fn string_items(items: &[Value], key: &str) -> Result<Vec<String>, ExtractError> {
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match item {
            Value::String(s) => {
                let s = s.trim();
                if !s.is_empty() {
                    out.push(s.to_string());
                }
            }
            other => {
                return Err(ExtractError::malformed(format!(
                    "'{key}[{i}]' must be a string, got {}",
                    json_type(other)
                )))
            }
        }
    }
    Ok(out)
}

/// The model's image link exactly as given; blank or non-string counts as absent.
fn optional_image_url(map: &Map<String, Value>) -> Option<String> {
    let raw = map.get("image_url")?.as_str()?.trim();
    (!raw.is_empty()).then(|| raw.to_string())
}

// ── Pass 6: Tags ─────────────────────────────────────────────────────────────

fn tidy_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.to_lowercase();
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Comparison key: lower-case alphanumerics only, so "Gluten Free",
/// "gluten_free" and "gluten-free" compare equal.
fn tag_key(tag: &str) -> String {
    tag.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// The vocabulary spelling of `tag`, if it has one.
pub fn canonical_tag(tag: &str) -> Option<&'static str> {
    let key = tag_key(tag);
    if key.is_empty() {
        return None;
    }
    TAG_VOCABULARY.iter().copied().find(|v| tag_key(v) == key)
}

/// Check tags against [`TAG_VOCABULARY`] according to `policy`.
pub fn apply_tag_policy(tags: Vec<String>, policy: TagPolicy) -> Result<Vec<String>, ExtractError> {
    if policy == TagPolicy::Permissive {
        return Ok(tags);
    }

    let mut kept: Vec<String> = Vec::with_capacity(tags.len());
    for tag in &tags {
        match canonical_tag(tag) {
            Some(canonical) => {
                if !kept.iter().any(|k| k == canonical) {
                    kept.push(canonical.to_string());
                }
            }
            None => debug!("Dropping off-vocabulary tag {:?}", tag),
        }
    }

    if policy == TagPolicy::Strict && kept.is_empty() {
        return Err(ExtractError::malformed(format!(
            "none of the returned tags {tags:?} is in the allowed vocabulary"
        )));
    }
    Ok(kept)
}

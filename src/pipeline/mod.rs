//! Pipeline stages for recipe extraction.
//!
//! Each submodule implements exactly one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! URL ──▶ input ──▶ scrape ──┐
//!                            ├──▶ prompts ──▶ llm ──▶ postprocess ──▶ merge
//! photo ──▶ encode ──────────┘
//! ```
//!
//! 1. [`input`]       — validate the URL and fetch the page (one request)
//! 2. [`scrape`]      — visible text + fallback image link from the markup
//! 3. [`encode`]      — decode, normalise and base64 an uploaded photo
//! 4. [`llm`]         — one model call; the only stage besides `input` with network I/O
//! 5. [`postprocess`] — fence stripping, strict JSON validation, tag policy
//! 6. [`merge`]       — fill the image link from the scraped fallback
//!
//! Prompt assembly sits in [`crate::prompts`] so template wording can change
//! without touching the stages.

pub mod encode;
pub mod input;
pub mod llm;
pub mod merge;
pub mod postprocess;
pub mod scrape;

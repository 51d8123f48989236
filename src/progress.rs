//! Pipeline stages and the progress-callback trait that observes them.
//!
//! Every extraction walks the same linear state machine:
//!
//! ```text
//! Acquiring → Prompting → Generating → Parsing → Merging → Succeeded
//!     └───────────┴────────────┴───────────┴─────────┴──→ Failed(kind)
//! ```
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to be told
//! about each transition, e.g. to drive a spinner or forward events to a
//! websocket.
//!
//! # Example
//!
//! ```rust
//! use recipe_extract::{ExtractionConfig, ExtractionProgressCallback, Stage};
//! use std::sync::{Arc, Mutex};
//!
//! struct Recorder(Mutex<Vec<Stage>>);
//!
//! impl ExtractionProgressCallback for Recorder {
//!     fn on_stage(&self, stage: Stage) {
//!         self.0.lock().unwrap().push(stage);
//!     }
//! }
//!
//! let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
//! let config = ExtractionConfig::builder()
//!     .progress_callback(recorder as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::FailureKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One state of the extraction state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    /// Fetching the page, or decoding the uploaded image.
    Acquiring,
    /// Rendering the instruction document.
    Prompting,
    /// Waiting on the model.
    Generating,
    /// Sanitising and validating the model output.
    Parsing,
    /// Reconciling the image link with the scraped fallback.
    Merging,
    /// Terminal: a complete recipe was produced.
    Succeeded,
    /// Terminal: the pipeline stopped; nothing was produced.
    Failed(FailureKind),
}

impl Stage {
    /// `true` for [`Stage::Succeeded`] and [`Stage::Failed`].
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Succeeded | Stage::Failed(_))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Acquiring => f.write_str("acquiring source"),
            Stage::Prompting => f.write_str("building prompt"),
            Stage::Generating => f.write_str("waiting for model"),
            Stage::Parsing => f.write_str("parsing response"),
            Stage::Merging => f.write_str("merging result"),
            Stage::Succeeded => f.write_str("done"),
            Stage::Failed(kind) => write!(f, "failed ({kind})"),
        }
    }
}

/// Called by the pipeline as it moves between stages.
///
/// Implementations must be `Send + Sync`: one callback may be shared by
/// many concurrent extractions. All methods default to no-ops.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called on every state transition, terminal states included.
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called once when the model has answered.
    ///
    /// # Arguments
    /// * `input_tokens`  — prompt tokens reported by the provider
    /// * `output_tokens` — completion tokens reported by the provider
    fn on_generation_complete(&self, input_tokens: usize, output_tokens: usize) {
        let _ = (input_tokens, output_tokens);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct TrackingCallback {
        stages: Mutex<Vec<Stage>>,
        tokens: AtomicUsize,
    }

    impl ExtractionProgressCallback for TrackingCallback {
        fn on_stage(&self, stage: Stage) {
            self.stages.lock().unwrap().push(stage);
        }

        fn on_generation_complete(&self, input_tokens: usize, output_tokens: usize) {
            self.tokens
                .store(input_tokens + output_tokens, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage(Stage::Acquiring);
        cb.on_generation_complete(10, 20);
        cb.on_stage(Stage::Failed(FailureKind::Generation));
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            stages: Mutex::new(Vec::new()),
            tokens: AtomicUsize::new(0),
        };
        tracker.on_stage(Stage::Acquiring);
        tracker.on_stage(Stage::Prompting);
        tracker.on_generation_complete(100, 50);

        assert_eq!(
            *tracker.stages.lock().unwrap(),
            vec![Stage::Acquiring, Stage::Prompting]
        );
        assert_eq!(tracker.tokens.load(Ordering::SeqCst), 150);
    }

    #[test]
    fn terminal_stages() {
        assert!(Stage::Succeeded.is_terminal());
        assert!(Stage::Failed(FailureKind::Fetch).is_terminal());
        assert!(!Stage::Generating.is_terminal());
    }

    #[test]
    fn failed_stage_display_names_kind() {
        let s = Stage::Failed(FailureKind::MalformedOutput).to_string();
        assert_eq!(s, "failed (malformed-output)");
    }
}

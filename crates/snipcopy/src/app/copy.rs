//! The copy pipeline: normalize, write to the clipboard, report the outcome.

use crate::app::normalize::normalize;
use crate::domain::errors::ClipboardError;
use crate::domain::model::{CopyOutcome, CopyRequest, CopyStatus, NormalizationOptions};
use crate::infra::clipboard::ClipboardBackend;
use crate::ui::toast::FeedbackSink;

/// Wraps a clipboard backend so that refusals are reported, never propagated.
#[derive(Debug, Default)]
pub struct ClipboardCopier<B> {
    backend: B,
}

impl<B: ClipboardBackend> ClipboardCopier<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn write(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.backend.write_text(text)
    }

    /// Write `text` and surface the result through `sink`.
    pub fn copy(&mut self, text: &str, sink: &mut dyn FeedbackSink) -> CopyOutcome {
        let outcome = match self.write(text) {
            Ok(()) => {
                tracing::debug!(chars = text.chars().count(), "copied to clipboard");
                CopyOutcome::copied()
            }
            Err(err) => {
                tracing::error!(error = %err, "copy failed");
                CopyOutcome::failed()
            }
        };
        sink.show(outcome.status.message());
        outcome
    }
}

/// Run one copy attempt end to end. The request is consumed.
pub fn perform_copy<B: ClipboardBackend>(
    request: CopyRequest,
    options: NormalizationOptions,
    copier: &mut ClipboardCopier<B>,
    sink: &mut dyn FeedbackSink,
) -> CopyOutcome {
    let text = if request.clean {
        normalize(&request.raw_text, options)
    } else {
        request.raw_text
    };
    copier.copy(&text, sink)
}

/// Report that there was nothing to copy. This is informational, not a failure.
pub fn report_nothing(status: CopyStatus, sink: &mut dyn FeedbackSink) -> CopyOutcome {
    tracing::debug!(status = status.message(), "nothing to copy");
    sink.show(status.message());
    CopyOutcome::not_found(status)
}

//! Domain models for code blocks and copy attempts.

use serde::{Deserialize, Serialize};

use crate::domain::dom::{Document, Element, NodeId};

/// Attribute carried by every injected copy control.
pub const CONTROL_MARKER: &str = "data-copy-control";

/// Whether an element is a copy control added by the injector.
pub fn is_control(element: &Element) -> bool {
    element.attr(CONTROL_MARKER).is_some()
}

/// A code-bearing region of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodeBlock {
    /// Element that receives the copy control.
    pub container: NodeId,
    /// Element whose rendered text is copied; the container or a nested `code` element.
    pub text_source: NodeId,
}

impl CodeBlock {
    /// Rendered text of the text source, leaving out any copy control inside it.
    pub fn text(&self, doc: &Document) -> String {
        doc.rendered_text(self.text_source, is_control)
    }
}

/// Which prompt marker classes the normalizer strips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationOptions {
    pub strip_shell: bool,
    pub strip_python: bool,
}

impl Default for NormalizationOptions {
    fn default() -> Self {
        Self {
            strip_shell: true,
            strip_python: true,
        }
    }
}

/// A single copy attempt, consumed by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRequest {
    pub raw_text: String,
    pub clean: bool,
}

impl CopyRequest {
    pub fn cleaned(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            clean: true,
        }
    }

    pub fn verbatim(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            clean: false,
        }
    }
}

/// Status text surfaced through the feedback sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyStatus {
    Copied,
    Failed,
    NothingSelected,
    NoCodeBlock,
}

impl CopyStatus {
    pub fn message(&self) -> &'static str {
        match self {
            CopyStatus::Copied => "Copied!",
            CopyStatus::Failed => "Copy failed",
            CopyStatus::NothingSelected => "No selection or code block found",
            CopyStatus::NoCodeBlock => "No code block found",
        }
    }
}

/// Result of one attempt; drives the feedback text only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyOutcome {
    pub succeeded: bool,
    pub status: CopyStatus,
}

impl CopyOutcome {
    pub fn copied() -> Self {
        Self {
            succeeded: true,
            status: CopyStatus::Copied,
        }
    }

    pub fn failed() -> Self {
        Self {
            succeeded: false,
            status: CopyStatus::Failed,
        }
    }

    /// Nothing was found to copy; no write was attempted.
    pub fn not_found(status: CopyStatus) -> Self {
        Self {
            succeeded: false,
            status,
        }
    }
}

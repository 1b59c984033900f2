//! Feedback sinks receiving copy status text.

use std::time::Duration;

/// Default time a status stays visible.
pub const DEFAULT_HIDE_AFTER: Duration = Duration::from_millis(2000);

/// Statuses a [`Toast`] remembers; older ones are dropped first.
pub const HISTORY_LIMIT: usize = 32;

/// Receives status text after each copy attempt.
pub trait FeedbackSink {
    fn show(&mut self, status: &str);

    /// Advance the sink's notion of time. Sinks without timers ignore it.
    fn tick(&mut self, _now: Duration) {}
}

/// Single-instance toast that hides itself a fixed interval after the latest message.
///
/// Every `show` replaces the text and restarts the hide deadline, so an older message can
/// never hide a newer one early.
#[derive(Debug, Clone)]
pub struct Toast {
    text: String,
    visible: bool,
    now: Duration,
    hide_at: Option<Duration>,
    hide_after: Duration,
    history: Vec<String>,
}

impl Default for Toast {
    fn default() -> Self {
        Self::new(DEFAULT_HIDE_AFTER)
    }
}

impl Toast {
    pub fn new(hide_after: Duration) -> Self {
        Self {
            text: String::new(),
            visible: false,
            now: Duration::ZERO,
            hide_at: None,
            hide_after,
            history: Vec::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// When the current message will hide, if one is showing.
    pub fn hide_at(&self) -> Option<Duration> {
        self.hide_at
    }

    /// The last [`HISTORY_LIMIT`] statuses shown, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }
}

impl FeedbackSink for Toast {
    fn show(&mut self, status: &str) {
        self.text = status.to_owned();
        self.visible = true;
        self.hide_at = Some(self.now + self.hide_after);
        if self.history.len() == HISTORY_LIMIT {
            self.history.remove(0);
        }
        self.history.push(status.to_owned());
    }

    fn tick(&mut self, now: Duration) {
        self.now = now;
        if self.hide_at.is_some_and(|deadline| now >= deadline) {
            self.visible = false;
            self.hide_at = None;
        }
    }
}

/// Sink for the command line: statuses go to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl FeedbackSink for ConsoleSink {
    fn show(&mut self, status: &str) {
        tracing::debug!(status, "feedback");
        eprintln!("{status}");
    }
}

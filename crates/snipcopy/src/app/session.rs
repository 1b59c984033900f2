//! Page session: the single-threaded event loop tying the pipeline together.
//!
//! Each [`PageEvent`] is handled to completion, then pending mutations and due timers are
//! flushed. Time is virtual so timers behave deterministically.

use std::time::Duration;

use crate::app::bridge::{BridgeAction, CommandBridge, CommandMessage, RoutedCommand};
use crate::app::copy::{ClipboardCopier, perform_copy, report_nothing};
use crate::app::inject::{ButtonInjector, ControlStyle, InjectReport};
use crate::app::locate::BlockLocator;
use crate::app::resolve::{InteractionContext, SelectionResolver};
use crate::app::watch::{DEFAULT_NAVIGATION_DELAY, MutationWatcher};
use crate::domain::dom::{Document, NodeId};
use crate::domain::errors::{CommandError, SelectorError};
use crate::domain::model::{CodeBlock, CopyOutcome, CopyRequest, CopyStatus, NormalizationOptions};
use crate::domain::rules::RuleSet;
use crate::infra::clipboard::ClipboardBackend;
use crate::infra::config::Config;
use crate::ui::toast::{DEFAULT_HIDE_AFTER, FeedbackSink};

/// Upper bound on mutation/re-scan rounds per event.
const MAX_FLUSH_ROUNDS: usize = 8;

/// Discrete inputs the page reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    /// Primary click on a node; only clicks inside copy controls do anything.
    Click(NodeId),
    /// Right-click (contextmenu, capture phase) on a node.
    ContextMenu(NodeId),
    /// Focus moved to a node, or away from everything.
    Focus(Option<NodeId>),
    /// The user's text selection changed.
    Select(Option<String>),
    /// Inbound command message from the host, as raw JSON.
    Message(String),
    /// Inbound command message already decoded by the host transport.
    Command(CommandMessage),
    /// History navigation without a document reload.
    PopState,
    /// Virtual time passes.
    Advance(Duration),
}

/// Settings resolved from configuration.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub rules: RuleSet,
    pub options: NormalizationOptions,
    pub control: ControlStyle,
    pub navigation_delay: Duration,
    /// How long feedback stays visible.
    pub hide_after: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            rules: RuleSet::builtin(),
            options: NormalizationOptions::default(),
            control: ControlStyle::default(),
            navigation_delay: DEFAULT_NAVIGATION_DELAY,
            hide_after: DEFAULT_HIDE_AFTER,
        }
    }
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Result<Self, SelectorError> {
        Ok(Self {
            rules: config.rules.compile()?,
            options: config.normalize.options(),
            control: config.control.style(),
            navigation_delay: config.watcher.navigation_delay(),
            hide_after: config.feedback.hide_after(),
        })
    }
}

/// Everything living for the lifetime of one loaded page.
pub struct PageSession<B, S> {
    document: Document,
    locator: BlockLocator,
    injector: ButtonInjector,
    watcher: MutationWatcher,
    bridge: CommandBridge,
    context: InteractionContext,
    copier: ClipboardCopier<B>,
    sink: S,
    options: NormalizationOptions,
    now: Duration,
}

impl<B: ClipboardBackend, S: FeedbackSink> PageSession<B, S> {
    /// Take ownership of a loaded page. Call [`PageSession::start`] to run the initial scan.
    pub fn new(document: Document, settings: SessionSettings, backend: B, sink: S) -> Self {
        let watcher = MutationWatcher::for_document(&document, settings.navigation_delay);
        Self {
            document,
            locator: BlockLocator::new(settings.rules),
            injector: ButtonInjector::new(settings.control),
            watcher,
            bridge: CommandBridge::new(),
            context: InteractionContext::new(),
            copier: ClipboardCopier::new(backend),
            sink,
            options: settings.options,
            now: Duration::ZERO,
        }
    }

    /// Initial injection pass over the whole document.
    pub fn start(&mut self) -> InjectReport {
        let report = self.rescan();
        self.flush_mutations();
        report
    }

    /// Handle one event, then flush mutations. Returns the copy outcome when the event led to
    /// a copy attempt (or to a "nothing found" report).
    pub fn dispatch(&mut self, event: PageEvent) -> Option<CopyOutcome> {
        tracing::trace!(?event, "dispatch");
        let outcome = match event {
            PageEvent::Click(target) => self.handle_click(target),
            PageEvent::ContextMenu(target) => {
                self.context.record_right_click(target);
                None
            }
            PageEvent::Focus(target) => {
                self.document.set_focus(target);
                None
            }
            PageEvent::Select(text) => {
                self.document.set_selection(text);
                None
            }
            PageEvent::Message(raw) => self.handle_routed(self.bridge.route_json(&raw)),
            PageEvent::Command(message) => self.handle_routed(self.bridge.route(&message)),
            PageEvent::PopState => {
                self.watcher.navigated(self.now);
                None
            }
            PageEvent::Advance(by) => {
                self.advance(by);
                None
            }
        };
        self.flush_mutations();
        outcome
    }

    /// Deliver pending mutation records to the watcher, re-scanning once per relevant batch.
    /// Returns how many controls were added.
    pub fn flush_mutations(&mut self) -> usize {
        let mut added = 0;
        for _ in 0..MAX_FLUSH_ROUNDS {
            let records = self.document.take_mutations();
            if records.is_empty() {
                return added;
            }
            if self.watcher.should_rescan(&self.document, &records) {
                added += self.rescan().injected.len();
            }
        }
        tracing::warn!(
            rounds = MAX_FLUSH_ROUNDS,
            "mutations still pending after re-scan limit"
        );
        added
    }

    fn advance(&mut self, by: Duration) {
        self.now += by;
        self.sink.tick(self.now);
        if self.watcher.take_due(self.now) {
            tracing::debug!("re-scanning after navigation");
            self.rescan();
        }
    }

    fn rescan(&mut self) -> InjectReport {
        let root = self.document.root();
        self.injector
            .inject(&mut self.document, &self.locator, root)
    }

    fn handle_click(&mut self, target: NodeId) -> Option<CopyOutcome> {
        let block = self.injector.binding_for(&self.document, target).or_else(|| {
            // Controls present in loaded markup have no binding; resolve from their position.
            let control = self.injector.control_for(&self.document, target)?;
            let container = self.document.parent(control)?;
            self.locator.nearest_block(&self.document, container)
        })?;
        Some(self.copy_block(block))
    }

    fn handle_routed(&mut self, routed: Result<RoutedCommand, CommandError>) -> Option<CopyOutcome> {
        let routed = match routed {
            Ok(routed) => routed,
            Err(err) => {
                tracing::debug!(error = %err, "ignoring command message");
                return None;
            }
        };

        let resolver = SelectionResolver::new(&self.locator);
        let outcome = match routed.action {
            BridgeAction::CopySelection => {
                let text = routed
                    .payload
                    .or_else(|| resolver.resolve_copy_text(&self.document, &self.context));
                match text {
                    Some(text) => self.copy_request(CopyRequest::cleaned(text)),
                    None => report_nothing(CopyStatus::NothingSelected, &mut self.sink),
                }
            }
            BridgeAction::CopyCodeAtCaret => {
                match resolver.resolve_reference_block(&self.document, &self.context) {
                    Some(block) => self.copy_block(block),
                    None => report_nothing(CopyStatus::NoCodeBlock, &mut self.sink),
                }
            }
        };
        Some(outcome)
    }

    /// Copy a block exactly as a click on its control would.
    pub fn copy_block(&mut self, block: CodeBlock) -> CopyOutcome {
        let text = block.text(&self.document);
        self.copy_request(CopyRequest::cleaned(text))
    }

    pub fn copy_request(&mut self, request: CopyRequest) -> CopyOutcome {
        perform_copy(request, self.options, &mut self.copier, &mut self.sink)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Mutable access for page scripts; changes are picked up by the next flush.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn locator(&self) -> &BlockLocator {
        &self.locator
    }

    pub fn injector(&self) -> &ButtonInjector {
        &self.injector
    }

    pub fn context(&self) -> &InteractionContext {
        &self.context
    }

    pub fn clipboard(&self) -> &B {
        self.copier.backend()
    }

    pub fn clipboard_mut(&mut self) -> &mut B {
        self.copier.backend_mut()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Blocks currently on the page.
    pub fn blocks(&self) -> Vec<CodeBlock> {
        self.locator.find(&self.document, self.document.root())
    }
}

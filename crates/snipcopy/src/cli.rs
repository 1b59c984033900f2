//! Command line surface over saved pages.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::app::bridge::{CommandBridge, HostTrigger, host_bindings};
use crate::app::normalize::normalize;
use crate::app::session::{PageEvent, PageSession, SessionSettings};
use crate::domain::dom::Document;
use crate::domain::model::{
    CodeBlock, CopyOutcome, CopyRequest, CopyStatus, NormalizationOptions,
};
use crate::infra::clipboard::{ClipboardBackend, MemoryClipboard, SystemClipboard};
use crate::infra::config::Config;
use crate::infra::html::load_page;
use crate::infra::page_watch::watch_page;
use crate::ui::toast::{ConsoleSink, FeedbackSink};

/// Characters of block text shown per line by `scan`.
const PREVIEW_WIDTH: usize = 60;

#[derive(Debug, Parser)]
#[command(name = "snipcopy", author, version, long_about = None)]
#[command(about = "Find code blocks in saved pages and copy them without prompt markers")]
pub struct Cli {
    /// Read configuration from this file only
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the code blocks found in a page
    Scan { page: PathBuf },

    /// Write the page back out with copy controls attached
    Inject {
        page: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Copy one block as if its copy control was clicked
    Copy {
        page: PathBuf,

        /// Index of the block, as listed by `scan`
        #[arg(short, long, default_value_t = 0)]
        block: usize,

        /// Skip prompt stripping
        #[arg(long)]
        raw: bool,

        /// Print the clipboard payload instead of writing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Deliver a host command message to a page
    Send {
        page: PathBuf,

        /// Message JSON, e.g. {"action":"copy-code-at-caret"}
        #[arg(short, long)]
        message: String,

        /// Right-click inside this block first
        #[arg(long, value_name = "BLOCK")]
        right_click: Option<usize>,

        /// Focus this block first
        #[arg(long, value_name = "BLOCK")]
        focus: Option<usize>,

        /// Current text selection
        #[arg(long, value_name = "TEXT")]
        select: Option<String>,

        /// Print the clipboard payload instead of writing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Strip prompt markers from stdin
    Normalize {
        /// Leave `$ ` and `> ` prompts in place
        #[arg(long)]
        keep_shell: bool,

        /// Leave `>>> ` and `... ` prompts in place
        #[arg(long)]
        keep_python: bool,
    },

    /// Re-scan a page every time it changes on disk
    Watch { page: PathBuf },

    /// List routable actions and host registrations
    Actions,

    /// Generate shell completions
    Completions { shell: Shell },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };
        let settings =
            SessionSettings::from_config(&config).context("invalid block rule in configuration")?;
        tracing::debug!(rules = settings.rules.len(), "configuration loaded");

        match self.command {
            Commands::Scan { page } => scan(&page, settings),
            Commands::Inject { page, output } => inject(&page, output.as_deref(), settings),
            Commands::Copy {
                page,
                block,
                raw,
                dry_run,
            } => {
                let document = load_page(&page)?;
                let plan = CopyPlan::Block { index: block, raw };
                if dry_run {
                    dry_run_copy(document, settings, plan)
                } else {
                    let mut session = started(document, settings, SystemClipboard::new());
                    finish(plan.run(&mut session)?)
                }
            }
            Commands::Send {
                page,
                message,
                right_click,
                focus,
                select,
                dry_run,
            } => {
                let document = load_page(&page)?;
                let plan = CopyPlan::Message {
                    raw: message,
                    right_click,
                    focus,
                    select,
                };
                if dry_run {
                    dry_run_copy(document, settings, plan)
                } else {
                    let mut session = started(document, settings, SystemClipboard::new());
                    finish(plan.run(&mut session)?)
                }
            }
            Commands::Normalize {
                keep_shell,
                keep_python,
            } => {
                let base = settings.options;
                let options = NormalizationOptions {
                    strip_shell: base.strip_shell && !keep_shell,
                    strip_python: base.strip_python && !keep_python,
                };
                let mut input = String::new();
                io::stdin()
                    .read_to_string(&mut input)
                    .context("failed to read stdin")?;
                print!("{}", normalize(&input, options));
                Ok(())
            }
            Commands::Watch { page } => watch_page(&page, |path| {
                let session = started(load_page(path)?, settings.clone(), MemoryClipboard::new());
                println!(
                    "{}: {} code block(s), {} control(s) attached",
                    path.display(),
                    session.blocks().len(),
                    session.injector().len()
                );
                Ok(())
            }),
            Commands::Actions => {
                actions();
                Ok(())
            }
            Commands::Completions { shell } => {
                clap_complete::generate(shell, &mut Cli::command(), "snipcopy", &mut io::stdout());
                Ok(())
            }
        }
    }
}

/// Which copy path a `copy` or `send` invocation drives.
enum CopyPlan {
    Block {
        index: usize,
        raw: bool,
    },
    Message {
        raw: String,
        right_click: Option<usize>,
        focus: Option<usize>,
        select: Option<String>,
    },
}

impl CopyPlan {
    fn run<B, S>(self, session: &mut PageSession<B, S>) -> Result<Option<CopyOutcome>>
    where
        B: ClipboardBackend,
        S: FeedbackSink,
    {
        let blocks = session.blocks();
        match self {
            CopyPlan::Block { index, raw } => {
                let block = block_at(&blocks, index)?;
                let outcome = if raw {
                    let text = block.text(session.document());
                    session.copy_request(CopyRequest::verbatim(text))
                } else {
                    session.copy_block(block)
                };
                Ok(Some(outcome))
            }
            CopyPlan::Message {
                raw,
                right_click,
                focus,
                select,
            } => {
                if let Some(index) = right_click {
                    let target = block_at(&blocks, index)?.text_source;
                    session.dispatch(PageEvent::ContextMenu(target));
                }
                if let Some(index) = focus {
                    let target = block_at(&blocks, index)?.text_source;
                    session.dispatch(PageEvent::Focus(Some(target)));
                }
                if select.is_some() {
                    session.dispatch(PageEvent::Select(select));
                }
                Ok(session.dispatch(PageEvent::Message(raw)))
            }
        }
    }
}

fn started<B: ClipboardBackend>(
    document: Document,
    settings: SessionSettings,
    backend: B,
) -> PageSession<B, ConsoleSink> {
    let mut session = PageSession::new(document, settings, backend, ConsoleSink);
    let report = session.start();
    tracing::debug!(
        injected = report.injected.len(),
        skipped = report.skipped,
        "initial scan"
    );
    session
}

fn dry_run_copy(document: Document, settings: SessionSettings, plan: CopyPlan) -> Result<()> {
    let mut session = started(document, settings, MemoryClipboard::new());
    let outcome = plan.run(&mut session)?;
    if let Some(payload) = session.clipboard().last() {
        println!("{payload}");
    }
    finish(outcome)
}

/// Only a failed clipboard write is an error. Unroutable messages are dropped, as the page
/// drops them.
fn finish(outcome: Option<CopyOutcome>) -> Result<()> {
    match outcome {
        None => {
            tracing::debug!("message was not routed to any action");
            Ok(())
        }
        Some(outcome) if outcome.status == CopyStatus::Failed => bail!("clipboard write failed"),
        Some(_) => Ok(()),
    }
}

fn block_at(blocks: &[CodeBlock], index: usize) -> Result<CodeBlock> {
    blocks
        .get(index)
        .copied()
        .ok_or_else(|| anyhow!("page has {} code block(s), no block {index}", blocks.len()))
}

fn scan(page: &Path, settings: SessionSettings) -> Result<()> {
    let session = started(load_page(page)?, settings, MemoryClipboard::new());
    let doc = session.document();
    for (index, block) in session.blocks().iter().enumerate() {
        println!(
            "{index}\t{}\t{}",
            describe(doc, block),
            preview(&block.text(doc))
        );
    }
    Ok(())
}

fn inject(page: &Path, output: Option<&Path>, settings: SessionSettings) -> Result<()> {
    let session = started(load_page(page)?, settings, MemoryClipboard::new());
    let html = session.document().to_html();
    match output {
        Some(path) => {
            fs::write(path, &html).with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(
                path = %path.display(),
                controls = session.injector().len(),
                "wrote injected page"
            );
        }
        None => println!("{html}"),
    }
    Ok(())
}

fn actions() {
    for (name, action) in CommandBridge::new().actions() {
        println!("{name}\t{action:?}");
    }
    for binding in host_bindings() {
        match binding.trigger {
            HostTrigger::ContextMenu { id, title, context } => {
                println!("menu {id}\t\"{title}\" on {context}\t-> {}", binding.action);
            }
            HostTrigger::KeyboardCommand { name } => {
                println!("command {name}\t-> {}", binding.action);
            }
        }
    }
}

/// `tag.class1.class2` for the block container.
fn describe(doc: &Document, block: &CodeBlock) -> String {
    match doc.element(block.container) {
        Some(element) => {
            let mut label = element.name().to_owned();
            for class in element.attr("class").unwrap_or("").split_ascii_whitespace() {
                label.push('.');
                label.push_str(class);
            }
            label
        }
        None => "#document".to_owned(),
    }
}

/// First line of the block, cut to [`PREVIEW_WIDTH`] characters.
fn preview(text: &str) -> String {
    let first = text.lines().next().unwrap_or_default();
    let mut line: String = first.chars().take(PREVIEW_WIDTH).collect();
    if first.chars().count() > PREVIEW_WIDTH || text.lines().nth(1).is_some() {
        line.push_str(" ...");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::html::parse_document;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn preview_marks_truncation() {
        assert_eq!(preview("ls"), "ls");
        assert_eq!(preview("ls\npwd"), "ls ...");
        let long = "x".repeat(PREVIEW_WIDTH + 5);
        assert_eq!(preview(&long), format!("{} ...", "x".repeat(PREVIEW_WIDTH)));
    }

    #[test]
    fn describe_names_the_container() {
        let doc = parse_document(
            r#"<div class="highlight py"><pre>x</pre></div><pre class="lang-py s1">y</pre>"#,
        );
        let session = PageSession::new(
            doc,
            SessionSettings::default(),
            MemoryClipboard::new(),
            ConsoleSink,
        );
        let blocks = session.blocks();
        assert_eq!(blocks.len(), 2);
        assert_eq!(describe(session.document(), &blocks[0]), "pre");
        assert_eq!(describe(session.document(), &blocks[1]), "pre.lang-py.s1");
    }

    #[test]
    fn message_plan_uses_right_click_block() {
        let doc = parse_document("<pre><code>$ one</code></pre><pre><code>$ two</code></pre>");
        let mut session = started(doc, SessionSettings::default(), MemoryClipboard::new());
        let plan = CopyPlan::Message {
            raw: r#"{"action":"copy-code-at-caret"}"#.to_owned(),
            right_click: Some(1),
            focus: None,
            select: None,
        };
        let outcome = plan.run(&mut session).expect("plan runs");
        assert_eq!(outcome, Some(CopyOutcome::copied()));
        assert_eq!(session.clipboard().last(), Some("two"));
    }

    #[test]
    fn raw_block_copy_keeps_prompts() {
        let doc = parse_document("<pre><code>$ ls</code></pre>");
        let mut session = started(doc, SessionSettings::default(), MemoryClipboard::new());
        CopyPlan::Block { index: 0, raw: true }
            .run(&mut session)
            .expect("plan runs");
        assert_eq!(session.clipboard().last(), Some("$ ls"));

        let missing = CopyPlan::Block { index: 3, raw: false }.run(&mut session);
        assert!(missing.is_err());
    }

    #[test]
    fn only_failed_copies_exit_nonzero() {
        assert!(finish(Some(CopyOutcome::copied())).is_ok());
        assert!(finish(Some(CopyOutcome::failed())).is_err());
        assert!(finish(Some(CopyOutcome::not_found(CopyStatus::NoCodeBlock))).is_ok());
        assert!(finish(None).is_ok());
    }
}

//! Clipboard backends.

use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, anyhow};

use crate::domain::errors::ClipboardError;

/// The platform clipboard-write capability. A write may be refused.
pub trait ClipboardBackend {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// System clipboard with fallbacks to shell utilities for headless environments.
pub struct SystemClipboard {
    primary: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    /// Attempt to initialize the system clipboard. When unavailable we fall back to shell-based
    /// clipboard utilities.
    pub fn new() -> Self {
        let primary = match arboard::Clipboard::new() {
            Ok(clipboard) => Some(clipboard),
            Err(err) => {
                tracing::debug!(error = %err, "system clipboard unavailable, using fallbacks");
                None
            }
        };
        Self { primary }
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardBackend for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        if let Some(primary) = self.primary.as_mut() {
            match primary.set_text(text.to_owned()) {
                Ok(()) => return Ok(()),
                Err(err) => tracing::debug!(error = %err, "arboard write failed"),
            }
        }

        self.primary = None;
        fallback_copy(text).map_err(|err| match err.downcast::<ClipboardError>() {
            Ok(clipboard_err) => clipboard_err,
            Err(err) => ClipboardError::Denied(format!("{err:#}")),
        })
    }
}

/// In-memory clipboard recording every write. Can be switched to refuse writes.
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    writes: Vec<String>,
    deny: bool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clipboard that refuses every write, as a page without clipboard permission would.
    pub fn denying() -> Self {
        Self {
            writes: Vec::new(),
            deny: true,
        }
    }

    pub fn set_deny(&mut self, deny: bool) {
        self.deny = deny;
    }

    pub fn writes(&self) -> &[String] {
        &self.writes
    }

    pub fn last(&self) -> Option<&str> {
        self.writes.last().map(String::as_str)
    }
}

impl ClipboardBackend for MemoryClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        if self.deny {
            return Err(ClipboardError::Denied("permission denied".into()));
        }
        self.writes.push(text.to_owned());
        Ok(())
    }
}

fn fallback_copy(text: &str) -> Result<()> {
    let commands = fallback_commands();
    if commands.is_empty() {
        return Err(anyhow!(ClipboardError::Unavailable));
    }
    for command in commands {
        match try_command_copy(command, text) {
            Ok(()) => return Ok(()),
            Err(err) => tracing::debug!(command = command[0], error = %err, "fallback failed"),
        }
    }

    Err(anyhow!(
        "failed to copy text to clipboard using available backends"
    ))
}

fn try_command_copy(command: &[&str], text: &str) -> Result<()> {
    let (program, args) = command
        .split_first()
        .context("clipboard command missing program")?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn clipboard command: {program}"))?;

    if let Some(mut stdin) = child.stdin.take()
        && let Err(err) = stdin.write_all(text.as_bytes())
    {
        drop(stdin);
        // The child is reaped on every path, including a failed write.
        let _ = child.kill();
        let _ = child.wait();
        return Err(err).context("failed to write clipboard contents");
    }

    let status = child
        .wait()
        .with_context(|| format!("clipboard command did not exit cleanly: {program}"))?;
    if status.success() {
        Ok(())
    } else {
        Err(anyhow!("clipboard command exited with status {status}"))
    }
}

#[cfg(target_os = "macos")]
fn fallback_commands() -> Vec<&'static [&'static str]> {
    vec![&["pbcopy"]]
}

#[cfg(all(unix, not(target_os = "macos")))]
fn fallback_commands() -> Vec<&'static [&'static str]> {
    vec![
        &["wl-copy"],
        &["xclip", "-selection", "clipboard"],
        &["xsel", "--clipboard", "--input"],
    ]
}

#[cfg(target_os = "windows")]
fn fallback_commands() -> Vec<&'static [&'static str]> {
    vec![&["powershell.exe", "-NoProfile", "-Command", "Set-Clipboard"]]
}

#[cfg(not(any(unix, target_os = "windows")))]
fn fallback_commands() -> Vec<&'static [&'static str]> {
    Vec::new()
}

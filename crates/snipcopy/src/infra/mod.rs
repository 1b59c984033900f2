//! Infrastructure adapters for the clipboard, config, markup, and the file system.

pub mod clipboard;
pub mod config;
pub mod html;
pub mod page_watch;

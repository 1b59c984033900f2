//! Core types: the page model, block rules, and copy requests.

pub mod dom;
pub mod errors;
pub mod model;
pub mod rules;

//! Structural rules identifying code-bearing elements, written as CSS selectors.

use std::fmt;

use crate::domain::dom::{Document, NodeId};
use crate::domain::errors::SelectorError;

/// Rules matching the markup of common documentation sites and highlighters.
pub const BUILTIN_SELECTORS: &[&str] = &[
    "pre > code",
    ".s-code-block",
    ".highlight pre",
    "pre[class*=\"lang-\"]",
    "div[class*=\"snippet\"]",
];

/// One configured rule: its source text and the compiled selector group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    source: String,
    selector: scraper::Selector,
}

impl Rule {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let source = source.trim();
        let selector =
            scraper::Selector::parse(source).map_err(|err| SelectorError::Invalid {
                selector: source.to_owned(),
                reason: err.to_string(),
            })?;
        Ok(Self {
            source: source.to_owned(),
            selector,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the node is an element matched by this rule.
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        doc.element_ref(node)
            .is_some_and(|element| self.selector.matches(&element))
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Union of rules. Order is kept for display only; there is no precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        Self::from_selectors(BUILTIN_SELECTORS.iter().copied())
            .unwrap_or_else(|err| unreachable!("built-in selectors must parse: {err}"))
    }

    /// Compile every entry; an entry may itself be a comma separated selector group.
    pub fn from_selectors<'a>(
        sources: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, SelectorError> {
        let mut rules = Self::new();
        for source in sources {
            rules.extend_from_str(source)?;
        }
        Ok(rules)
    }

    pub fn extend_from_str(&mut self, source: &str) -> Result<(), SelectorError> {
        self.rules.push(Rule::parse(source)?);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.rules.iter().any(|rule| rule.matches(doc, node))
    }
}

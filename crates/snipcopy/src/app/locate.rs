//! Locating code blocks in a document.

use std::collections::HashSet;

use crate::domain::dom::{Document, NodeId};
use crate::domain::model::CodeBlock;
use crate::domain::rules::RuleSet;

/// Tag of the text-only leaf element that carries code inside a block container.
pub const TEXT_LEAF_TAG: &str = "code";

/// Finds code blocks using a [`RuleSet`].
#[derive(Debug, Clone)]
pub struct BlockLocator {
    rules: RuleSet,
}

impl Default for BlockLocator {
    fn default() -> Self {
        Self::new(RuleSet::builtin())
    }
}

impl BlockLocator {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// All blocks under `root` (inclusive), in document order, one per container.
    pub fn find(&self, doc: &Document, root: NodeId) -> Vec<CodeBlock> {
        let mut seen = HashSet::new();
        let mut blocks = Vec::new();
        for node in doc.traverse(root) {
            if !self.rules.matches(doc, node) {
                continue;
            }
            if let Some(block) = block_for(doc, node)
                && seen.insert(block.container)
            {
                blocks.push(block);
            }
        }
        tracing::trace!(count = blocks.len(), "located code blocks");
        blocks
    }

    /// The block enclosing `reference`, found by walking up its ancestors.
    ///
    /// An ancestor qualifies when it matches a rule itself, or when it is the container of a
    /// matching text leaf (so a click on the padding of `<pre>` still finds `pre > code`).
    pub fn nearest_block(&self, doc: &Document, reference: NodeId) -> Option<CodeBlock> {
        for node in doc.ancestors(reference) {
            let Some(element) = doc.element(node) else {
                continue;
            };
            if self.rules.matches(doc, node)
                && let Some(block) = block_for(doc, node)
            {
                return Some(block);
            }
            if element.name() == TEXT_LEAF_TAG {
                continue;
            }
            if let Some(leaf) = doc.element_children(node).find(|child| {
                doc.element(*child)
                    .is_some_and(|el| el.name() == TEXT_LEAF_TAG)
                    && self.rules.matches(doc, *child)
            }) {
                return block_for(doc, leaf);
            }
        }
        None
    }
}

/// Map a matched element to its block: a text leaf hands the container role to its parent,
/// anything else is its own container.
fn block_for(doc: &Document, matched: NodeId) -> Option<CodeBlock> {
    let element = doc.element(matched)?;
    if element.name() == TEXT_LEAF_TAG {
        let container = doc.parent_element(matched)?;
        return Some(CodeBlock {
            container,
            text_source: matched,
        });
    }
    block_in(doc, matched)
}

/// The block held by `container` as its subtree stands now: the text source is the first
/// nested text leaf, or the container itself when it has none.
pub fn block_in(doc: &Document, container: NodeId) -> Option<CodeBlock> {
    doc.element(container)?;
    let text_source = doc
        .traverse(container)
        .skip(1)
        .find(|node| {
            doc.element(*node)
                .is_some_and(|el| el.name() == TEXT_LEAF_TAG)
        })
        .unwrap_or(container);
    Some(CodeBlock {
        container,
        text_source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dom::element;
    use crate::infra::html::parse_document;

    fn element_with_tag(doc: &Document, tag: &str, nth: usize) -> NodeId {
        doc.traverse(doc.root())
            .filter(|id| doc.element(*id).is_some_and(|el| el.name() == tag))
            .nth(nth)
            .expect("element present")
    }

    #[test]
    fn finds_blocks_across_markup_styles() {
        let doc = parse_document(
            r#"<body>
            <pre><code>$ ls</code></pre>
            <pre class="s-code-block"><code>echo hi</code></pre>
            <div class="highlight"><pre>plain</pre></div>
            <pre class="lang-python">print(1)</pre>
            <div class="code-snippet">snippet</div>
            <pre>not a block</pre>
            </body>"#,
        );
        let locator = BlockLocator::default();
        let blocks = locator.find(&doc, doc.root());
        let texts: Vec<_> = blocks.iter().map(|block| block.text(&doc)).collect();
        assert_eq!(texts, vec!["$ ls", "echo hi", "plain", "print(1)", "snippet"]);

        let first_pre = element_with_tag(&doc, "pre", 0);
        let first_code = element_with_tag(&doc, "code", 0);
        assert_eq!(
            blocks[0],
            CodeBlock {
                container: first_pre,
                text_source: first_code
            }
        );
    }

    #[test]
    fn deduplicates_containers_matched_by_several_rules() {
        let doc = parse_document(
            r#"<div class="highlight"><pre class="lang-rust s-code-block"><code>fn main() {}</code></pre></div>"#,
        );
        let blocks = BlockLocator::default().find(&doc, doc.root());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].container, element_with_tag(&doc, "pre", 0));
        assert_eq!(blocks[0].text_source, element_with_tag(&doc, "code", 0));
    }

    #[test]
    fn empty_document_yields_no_blocks() {
        let doc = Document::new();
        assert!(BlockLocator::default().find(&doc, doc.root()).is_empty());
    }

    #[test]
    fn find_is_scoped_to_root() {
        let doc = parse_document(
            r#"<section><pre><code>inside</code></pre></section><pre><code>outside</code></pre>"#,
        );
        let section = element_with_tag(&doc, "section", 0);
        let blocks = BlockLocator::default().find(&doc, section);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text(&doc), "inside");
    }

    #[test]
    fn nearest_block_walks_up_from_text_and_containers() {
        let doc = parse_document(r#"<pre><code><span>let</span> x = 1;</code></pre><p>prose</p>"#);
        let locator = BlockLocator::default();
        let pre = element_with_tag(&doc, "pre", 0);
        let code = element_with_tag(&doc, "code", 0);
        let span = element_with_tag(&doc, "span", 0);
        let span_text = doc.children(span).next().expect("span text");

        let expected = Some(CodeBlock {
            container: pre,
            text_source: code,
        });
        assert_eq!(locator.nearest_block(&doc, span_text), expected);
        assert_eq!(locator.nearest_block(&doc, code), expected);
        assert_eq!(locator.nearest_block(&doc, pre), expected);

        let paragraph = element_with_tag(&doc, "p", 0);
        assert_eq!(locator.nearest_block(&doc, paragraph), None);
    }

    #[test]
    fn custom_rules_extend_detection() {
        let doc = parse_document(r#"<div class="terminal"><span>$ make</span></div>"#);
        let mut rules = RuleSet::builtin();
        rules.extend_from_str("div.terminal").expect("valid selector");
        let blocks = BlockLocator::new(rules).find(&doc, doc.root());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text(&doc), "$ make");
    }

    #[test]
    fn block_in_follows_the_current_subtree() {
        let mut doc = parse_document(r#"<pre><code>$ old</code></pre>"#);
        let pre = element_with_tag(&doc, "pre", 0);
        let old = element_with_tag(&doc, "code", 0);
        assert_eq!(block_in(&doc, pre).map(|block| block.text_source), Some(old));

        doc.remove(old);
        assert_eq!(block_in(&doc, pre).map(|block| block.text_source), Some(pre));

        let replacement = doc.create_element(element("code"));
        doc.append_child(pre, replacement);
        assert_eq!(
            block_in(&doc, pre).map(|block| block.text_source),
            Some(replacement)
        );
        assert_eq!(block_in(&doc, doc.root()), None);
    }
}

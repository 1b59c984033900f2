//! Deciding what to copy when the user has not clicked a copy control.

use crate::app::locate::BlockLocator;
use crate::domain::dom::{Document, NodeId};
use crate::domain::model::CodeBlock;

/// Interaction state threaded into resolution. The contextmenu handler is its only writer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteractionContext {
    last_right_click: Option<NodeId>,
}

impl InteractionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the target of the most recent contextmenu event.
    pub fn record_right_click(&mut self, target: NodeId) {
        self.last_right_click = Some(target);
    }

    /// The last right-click target, if it is still part of the document.
    pub fn last_right_click(&self, doc: &Document) -> Option<NodeId> {
        self.last_right_click.filter(|target| doc.is_connected(*target))
    }
}

/// Resolves copy text from selection, focus, and right-click context.
#[derive(Debug, Clone, Copy)]
pub struct SelectionResolver<'a> {
    locator: &'a BlockLocator,
}

impl<'a> SelectionResolver<'a> {
    pub fn new(locator: &'a BlockLocator) -> Self {
        Self { locator }
    }

    /// Text to copy: a non-empty selection wins, then the block around the focused element,
    /// then the block around the last right-click target.
    pub fn resolve_copy_text(&self, doc: &Document, ctx: &InteractionContext) -> Option<String> {
        let selection = doc.selection_text().trim();
        if !selection.is_empty() {
            return Some(selection.to_owned());
        }
        self.resolve_reference_block(doc, ctx)
            .map(|block| block.text(doc))
    }

    /// The block under the caret or last right-click, ignoring any selection.
    pub fn resolve_reference_block(
        &self,
        doc: &Document,
        ctx: &InteractionContext,
    ) -> Option<CodeBlock> {
        doc.focused()
            .and_then(|focused| self.locator.nearest_block(doc, focused))
            .or_else(|| {
                ctx.last_right_click(doc)
                    .and_then(|target| self.locator.nearest_block(doc, target))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::html::parse_document;

    fn nth_tag(doc: &Document, tag: &str, nth: usize) -> NodeId {
        doc.traverse(doc.root())
            .filter(|id| doc.element(*id).is_some_and(|el| el.name() == tag))
            .nth(nth)
            .expect("element present")
    }

    const PAGE: &str = r#"<p>intro</p><pre><code>$ first</code></pre><pre class="lang-py"><code>>>> second</code></pre>"#;

    #[test]
    fn selection_wins_over_context() {
        let mut doc = parse_document(PAGE);
        let locator = BlockLocator::default();
        let mut ctx = InteractionContext::new();
        ctx.record_right_click(nth_tag(&doc, "code", 0));
        doc.set_focus(Some(nth_tag(&doc, "code", 1)));
        doc.set_selection(Some("  picked text \n".into()));

        let resolver = SelectionResolver::new(&locator);
        assert_eq!(
            resolver.resolve_copy_text(&doc, &ctx).as_deref(),
            Some("picked text")
        );
    }

    #[test]
    fn whitespace_selection_falls_back_to_right_click() {
        let mut doc = parse_document(PAGE);
        let locator = BlockLocator::default();
        let mut ctx = InteractionContext::new();
        ctx.record_right_click(nth_tag(&doc, "code", 1));
        doc.set_selection(Some("   ".into()));

        let resolver = SelectionResolver::new(&locator);
        assert_eq!(
            resolver.resolve_copy_text(&doc, &ctx).as_deref(),
            Some(">>> second")
        );
    }

    #[test]
    fn focus_inside_a_block_beats_right_click() {
        let mut doc = parse_document(PAGE);
        let locator = BlockLocator::default();
        let mut ctx = InteractionContext::new();
        ctx.record_right_click(nth_tag(&doc, "code", 1));
        doc.set_focus(Some(nth_tag(&doc, "pre", 0)));

        let resolver = SelectionResolver::new(&locator);
        assert_eq!(
            resolver.resolve_copy_text(&doc, &ctx).as_deref(),
            Some("$ first")
        );
    }

    #[test]
    fn focus_outside_blocks_is_ignored() {
        let mut doc = parse_document(PAGE);
        let locator = BlockLocator::default();
        let mut ctx = InteractionContext::new();
        ctx.record_right_click(nth_tag(&doc, "code", 0));
        doc.set_focus(Some(nth_tag(&doc, "p", 0)));

        let resolver = SelectionResolver::new(&locator);
        assert_eq!(
            resolver.resolve_copy_text(&doc, &ctx).as_deref(),
            Some("$ first")
        );
    }

    #[test]
    fn nothing_resolves_without_context() {
        let doc = parse_document(PAGE);
        let locator = BlockLocator::default();
        let resolver = SelectionResolver::new(&locator);
        assert_eq!(resolver.resolve_copy_text(&doc, &InteractionContext::new()), None);
    }

    #[test]
    fn detached_right_click_target_is_forgotten() {
        let mut doc = parse_document(PAGE);
        let locator = BlockLocator::default();
        let mut ctx = InteractionContext::new();
        let pre = nth_tag(&doc, "pre", 0);
        ctx.record_right_click(nth_tag(&doc, "code", 0));
        doc.remove(pre);

        assert_eq!(ctx.last_right_click(&doc), None);
        let resolver = SelectionResolver::new(&locator);
        assert_eq!(resolver.resolve_reference_block(&doc, &ctx), None);
    }
}

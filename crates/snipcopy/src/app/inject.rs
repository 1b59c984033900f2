//! Attaching copy controls to code blocks.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::app::locate::{BlockLocator, block_in};
use crate::domain::dom::{Document, ElementExt, NodeId, element};
use crate::domain::model::{CONTROL_MARKER, CodeBlock, is_control};

/// Appearance of the injected control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlStyle {
    pub label: String,
    pub class_name: String,
    pub aria_label: String,
}

impl Default for ControlStyle {
    fn default() -> Self {
        Self {
            label: "Copy".into(),
            class_name: "copy-code-btn".into(),
            aria_label: "Copy code".into(),
        }
    }
}

/// Summary of one injection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InjectReport {
    /// Controls created in this pass.
    pub injected: Vec<NodeId>,
    /// Blocks whose container already carried a control.
    pub skipped: usize,
}

impl InjectReport {
    pub fn is_noop(&self) -> bool {
        self.injected.is_empty()
    }
}

/// Adds one copy control per block container and remembers which container each control
/// copies. The text source is looked up again on every click, so a page script that swaps the
/// code element inside a container is followed.
#[derive(Debug, Clone, Default)]
pub struct ButtonInjector {
    style: ControlStyle,
    bindings: HashMap<NodeId, NodeId>,
}

impl ButtonInjector {
    pub fn new(style: ControlStyle) -> Self {
        Self {
            style,
            bindings: HashMap::new(),
        }
    }

    pub fn style(&self) -> &ControlStyle {
        &self.style
    }

    /// Attach controls to every block under `root` that does not have one yet. Running this
    /// again over an unchanged subtree changes nothing.
    pub fn inject(
        &mut self,
        doc: &mut Document,
        locator: &BlockLocator,
        root: NodeId,
    ) -> InjectReport {
        self.bindings.retain(|control, _| doc.is_connected(*control));

        let mut report = InjectReport::default();
        for block in locator.find(doc, root) {
            if has_control(doc, block.container) {
                report.skipped += 1;
                continue;
            }

            doc.update_element(block.container, |container| {
                if container.position() == "static" {
                    container.set_style_property("position", "relative");
                }
            });

            let control = self.create_control(doc);
            doc.append_child(block.container, control);
            self.bindings.insert(control, block.container);
            report.injected.push(control);
        }

        if !report.is_noop() {
            tracing::debug!(
                injected = report.injected.len(),
                skipped = report.skipped,
                "attached copy controls"
            );
        }
        report
    }

    /// The block bound to the control containing `target`, if `target` is inside one, resolved
    /// against the container's current subtree.
    pub fn binding_for(&self, doc: &Document, target: NodeId) -> Option<CodeBlock> {
        let container = doc
            .ancestors(target)
            .find_map(|node| self.bindings.get(&node).copied())?;
        block_in(doc, container)
    }

    /// The control element containing `target`, whether or not this injector created it.
    pub fn control_for(&self, doc: &Document, target: NodeId) -> Option<NodeId> {
        doc.ancestors(target)
            .find(|node| doc.element(*node).is_some_and(is_control))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn create_control(&self, doc: &mut Document) -> NodeId {
        let button = element("button")
            .with_attr("type", "button")
            .with_attr("class", &self.style.class_name)
            .with_attr("aria-label", &self.style.aria_label)
            .with_attr(CONTROL_MARKER, "");
        let control = doc.create_element(button);
        let label = doc.create_text(&self.style.label);
        doc.append_child(control, label);
        control
    }
}

/// Whether `container` already holds an injected control somewhere beneath it.
pub fn has_control(doc: &Document, container: NodeId) -> bool {
    doc.traverse(container)
        .skip(1)
        .any(|node| doc.element(node).is_some_and(is_control))
}

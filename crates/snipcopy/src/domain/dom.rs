//! The live page: a parsed [`scraper::Html`] tree plus the interaction state a browser keeps
//! next to it (focus, selection, pending mutation records).
//!
//! Removing a node only detaches it from the tree, so a [`NodeId`] held elsewhere stays valid
//! and can be checked with [`Document::is_connected`].

use html5ever::tendril::StrTendril;
use html5ever::{Attribute, LocalName, Namespace, QualName};
use scraper::node::Text;
use scraper::{ElementRef, Html, Node};

pub use ego_tree::NodeId;
pub use scraper::node::Element;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Tags that start and end a line in rendered text.
const BLOCK_TAGS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "dd",
    "details",
    "div",
    "dl",
    "dt",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "li",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "summary",
    "table",
    "tr",
    "ul",
];

/// A detached HTML element named `tag`, ready for [`Document::create_element`].
pub fn element(tag: &str) -> Element {
    let name = QualName::new(
        None,
        Namespace::from(HTML_NAMESPACE),
        LocalName::from(tag.to_ascii_lowercase()),
    );
    Element::new(name, Vec::new())
}

fn attribute_name(name: &str) -> QualName {
    QualName::new(
        None,
        Namespace::from(""),
        LocalName::from(name.to_ascii_lowercase()),
    )
}

/// Attribute and inline-style editing for page elements.
pub trait ElementExt: Sized {
    fn set_attr(&mut self, name: &str, value: &str);

    /// Builder-style attribute setter.
    fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Look up a property in the inline `style` attribute.
    fn style_property(&self, name: &str) -> Option<&str>;

    /// Set (or replace) a property in the inline `style` attribute, keeping the others in order.
    fn set_style_property(&mut self, name: &str, value: &str);

    /// Layout positioning mode. Only inline styles are known to the model, so anything not set
    /// inline is the CSS initial value.
    fn position(&self) -> &str {
        self.style_property("position").unwrap_or("static")
    }
}

impl ElementExt for Element {
    fn set_attr(&mut self, name: &str, value: &str) {
        // Rebuilt rather than edited in place: the element caches its id and classes on first read.
        let key = attribute_name(name);
        let mut replaced = false;
        let mut attributes: Vec<Attribute> = self
            .attrs
            .iter()
            .map(|(existing, current)| {
                let value = if *existing == key {
                    replaced = true;
                    value
                } else {
                    &**current
                };
                Attribute {
                    name: existing.clone(),
                    value: StrTendril::from_slice(value),
                }
            })
            .collect();
        if !replaced {
            attributes.push(Attribute {
                name: key,
                value: StrTendril::from_slice(value),
            });
        }
        *self = Element::new(self.name.clone(), attributes);
    }

    fn style_property(&self, name: &str) -> Option<&str> {
        self.attr("style")?
            .split(';')
            .filter_map(|decl| decl.split_once(':'))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case(name))
            .map(|(_, value)| value.trim())
    }

    fn set_style_property(&mut self, name: &str, value: &str) {
        let mut declarations: Vec<(String, String)> = self
            .attr("style")
            .unwrap_or("")
            .split(';')
            .filter_map(|decl| decl.split_once(':'))
            .map(|(key, value)| (key.trim().to_owned(), value.trim().to_owned()))
            .filter(|(key, _)| !key.is_empty())
            .collect();

        match declarations
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => *existing = value.to_owned(),
            None => declarations.push((name.to_owned(), value.to_owned())),
        }

        let style = declarations
            .iter()
            .map(|(key, value)| format!("{key}: {value}"))
            .collect::<Vec<_>>()
            .join("; ");
        self.set_attr("style", &style);
    }
}

/// One child-list change, as a mutation observer would report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Document {
    html: Html,
    focused: Option<NodeId>,
    selection: Option<String>,
    mutations: Vec<MutationRecord>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Html> for Document {
    fn from(html: Html) -> Self {
        Self {
            html,
            focused: None,
            selection: None,
            mutations: Vec::new(),
        }
    }
}

impl Document {
    /// An empty page with the usual `html`, `head` and `body` skeleton.
    pub fn new() -> Self {
        Self::from(Html::parse_document(""))
    }

    pub fn root(&self) -> NodeId {
        self.html.tree.root().id()
    }

    pub fn body(&self) -> Option<NodeId> {
        self.traverse(self.root())
            .find(|id| self.element(*id).is_some_and(|el| el.name() == "body"))
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.html.tree.get(id)?.value().as_element()
    }

    /// The element at `id` wrapped for selector matching and serialization.
    pub fn element_ref(&self, id: NodeId) -> Option<ElementRef<'_>> {
        ElementRef::wrap(self.html.tree.get(id)?)
    }

    /// Edit the element at `id` in place. Returns `None` when `id` is not an element.
    pub fn update_element<R>(
        &mut self,
        id: NodeId,
        edit: impl FnOnce(&mut Element) -> R,
    ) -> Option<R> {
        let mut node = self.html.tree.get_mut(id)?;
        match node.value() {
            Node::Element(element) => Some(edit(element)),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        Some(self.html.tree.get(id)?.parent()?.id())
    }

    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|parent| self.element(*parent).is_some())
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.html
            .tree
            .get(id)
            .into_iter()
            .flat_map(|node| node.children())
            .map(|child| child.id())
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .filter(|child| self.element(*child).is_some())
    }

    pub fn create_element(&mut self, element: Element) -> NodeId {
        self.html.tree.orphan(Node::Element(element)).id()
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        let text = Text {
            text: scraper::StrTendril::from_slice(text),
        };
        self.html.tree.orphan(Node::Text(text)).id()
    }

    /// Append `child` as the last child of `parent`, moving it if it is already attached. The
    /// change is recorded for mutation observers. Appending a node into its own subtree is
    /// ignored.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.html.tree.get(parent).is_none() || self.contains(child, parent) {
            return;
        }
        let previous = self.parent(child);
        if !self.attach(parent, child) {
            return;
        }
        if let Some(previous) = previous {
            self.mutations.push(MutationRecord {
                target: previous,
                added: Vec::new(),
                removed: vec![child],
            });
        }
        self.mutations.push(MutationRecord {
            target: parent,
            added: vec![child],
            removed: Vec::new(),
        });
    }

    /// Detach `id` from its parent. Returns whether anything changed.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        if let Some(mut node) = self.html.tree.get_mut(id) {
            node.detach();
        }
        self.mutations.push(MutationRecord {
            target: parent,
            added: Vec::new(),
            removed: vec![id],
        });
        true
    }

    /// Attach without recording a mutation, as markup loaded before any observer would be.
    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.html.tree.get(child).is_none() {
            return false;
        }
        match self.html.tree.get_mut(parent) {
            Some(mut node) => {
                node.append_id(child);
                true
            }
            None => false,
        }
    }

    /// Whether the node is still reachable from the document root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(self.root(), id)
    }

    /// Whether `node` is `ancestor` or one of its descendants.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|id| id == ancestor)
    }

    /// The node itself followed by its ancestors, innermost first. Empty for an unknown id.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let start = self.html.tree.get(id).map(|node| node.id());
        std::iter::successors(start, |current| self.parent(*current))
    }

    /// Pre-order walk of the subtree rooted at `id`, including `id`.
    pub fn traverse(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.html
            .tree
            .get(id)
            .into_iter()
            .flat_map(|node| node.descendants())
            .map(|node| node.id())
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused.filter(|id| self.is_connected(*id))
    }

    pub fn set_focus(&mut self, id: Option<NodeId>) {
        self.focused = id;
    }

    /// Current selection as the user sees it; empty when nothing is selected.
    pub fn selection_text(&self) -> &str {
        self.selection.as_deref().unwrap_or("")
    }

    pub fn set_selection(&mut self, text: Option<String>) {
        self.selection = text;
    }

    pub fn has_pending_mutations(&self) -> bool {
        !self.mutations.is_empty()
    }

    pub fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.mutations)
    }

    /// Rendered text of a subtree, laid out the way a browser's `innerText` is: text nodes in
    /// document order, `<br>` as a line break, and block elements on lines of their own.
    /// Elements for which `skip` returns true are left out together with their children.
    pub fn rendered_text(&self, id: NodeId, skip: impl Fn(&Element) -> bool) -> String {
        let mut text = RenderedText::default();
        self.collect_text(id, &skip, &mut text);
        text.out
    }

    fn collect_text(
        &self,
        id: NodeId,
        skip: &dyn Fn(&Element) -> bool,
        text: &mut RenderedText,
    ) {
        let Some(node) = self.html.tree.get(id) else {
            return;
        };
        match node.value() {
            Node::Text(content) => text.push(content),
            Node::Element(element) if skip(element) => {}
            Node::Element(element) if element.name() == "br" => text.push("\n"),
            Node::Element(element) if BLOCK_TAGS.contains(&element.name()) => {
                text.line_break();
                for child in node.children() {
                    self.collect_text(child.id(), skip, text);
                }
                text.line_break();
            }
            _ => {
                for child in node.children() {
                    self.collect_text(child.id(), skip, text);
                }
            }
        }
    }

    /// Serialize an element and its subtree back to markup.
    pub fn outer_html(&self, id: NodeId) -> Option<String> {
        self.element_ref(id).map(|element| element.html())
    }

    /// Serialize the whole document.
    pub fn to_html(&self) -> String {
        self.html.html()
    }
}

/// Text gathered by [`Document::rendered_text`]. Line breaks requested by block elements
/// collapse with each other and with adjacent newlines, and never lead or trail.
#[derive(Default)]
struct RenderedText {
    out: String,
    break_pending: bool,
}

impl RenderedText {
    fn line_break(&mut self) {
        self.break_pending = true;
    }

    fn push(&mut self, content: &str) {
        if content.is_empty() {
            return;
        }
        if std::mem::take(&mut self.break_pending)
            && !self.out.is_empty()
            && !self.out.ends_with('\n')
            && !content.starts_with('\n')
        {
            self.out.push('\n');
        }
        self.out.push_str(content);
    }
}

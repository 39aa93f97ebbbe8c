//! Section node types.
//!
//! A section is always the triple `Container[Title, Content]`:
//!
//! - [`ContainerNode`] carries the only attribute, `is_open`, which is presentation state and is
//!   never exported.
//! - [`TitleNode`] is the always-visible header. It normally holds one paragraph.
//! - [`ContentNode`] is the hideable body. It is a shadow root, so block insertion and
//!   top-level lookups inside it stay inside it.

use crate::convert::{
    DETAILS_BLOCK_CLASS, DETAILS_CLOSED_CLASS, DETAILS_CONTENT_CLASS, DETAILS_EDIT_CLASS,
    DETAILS_TITLE_CLASS,
};
use blockdoc_core::{DocumentTree, Element, ElementNode, NodeKey, TreeError, Transaction};
use std::any::Any;

/// Type name of section containers.
pub const CONTAINER_TYPE: &str = "collapsible-container";
/// Type name of section titles.
pub const TITLE_TYPE: &str = "collapsible-title";
/// Type name of section bodies.
pub const CONTENT_TYPE: &str = "collapsible-content";

/// Data attribute linking an editing-shape container back to its node.
pub const CONTAINER_KEY_ATTR: &str = "data-collapsible-key";

/// The section wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerNode {
    is_open: bool,
}

impl ContainerNode {
    /// A container in the given open state.
    pub fn new(is_open: bool) -> Self {
        Self { is_open }
    }

    /// Whether the body is shown.
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Set the open state.
    pub fn set_open(&mut self, is_open: bool) {
        self.is_open = is_open;
    }

    /// Flip the open state.
    pub fn toggle_open(&mut self) {
        self.is_open = !self.is_open;
    }
}

impl ElementNode for ContainerNode {
    fn node_type(&self) -> &'static str {
        CONTAINER_TYPE
    }

    fn clone_element(&self) -> Box<dyn ElementNode> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn export_markup(&self) -> Element {
        // Exported sections always start open.
        Element::new("details")
            .with_class(DETAILS_BLOCK_CLASS)
            .with_attr("open", "")
    }

    fn editing_markup(&self, key: NodeKey) -> Element {
        let mut element = Element::new("div")
            .with_class(DETAILS_BLOCK_CLASS)
            .with_class(DETAILS_EDIT_CLASS);
        if !self.is_open {
            element.add_class(DETAILS_CLOSED_CLASS);
        }
        element.with_attr(CONTAINER_KEY_ATTR, key.to_string())
    }

    fn export_markdown(&self, children: &[String]) -> String {
        let title = children.first().map_or("", String::as_str);
        let content = children.get(1..).map(|rest| rest.join("\n\n")).unwrap_or_default();
        format!("+++ {title}\n{content}\n+++")
    }
}

/// The section header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TitleNode;

impl ElementNode for TitleNode {
    fn node_type(&self) -> &'static str {
        TITLE_TYPE
    }

    fn clone_element(&self) -> Box<dyn ElementNode> {
        Box::new(*self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn export_markup(&self) -> Element {
        Element::new("summary").with_class(DETAILS_TITLE_CLASS)
    }

    fn editing_markup(&self, _key: NodeKey) -> Element {
        Element::new("div").with_class(DETAILS_TITLE_CLASS)
    }

    fn export_markdown(&self, children: &[String]) -> String {
        children.join(" ")
    }
}

/// The section body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentNode;

impl ElementNode for ContentNode {
    fn node_type(&self) -> &'static str {
        CONTENT_TYPE
    }

    fn clone_element(&self) -> Box<dyn ElementNode> {
        Box::new(*self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn is_shadow_root(&self) -> bool {
        true
    }

    fn export_markup(&self) -> Element {
        Element::new("div").with_class(DETAILS_CONTENT_CLASS)
    }

    fn editing_markup(&self, _key: NodeKey) -> Element {
        Element::new("div").with_class(DETAILS_CONTENT_CLASS)
    }
}

/// Keys of one well-formed section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionKeys {
    /// The container.
    pub container: NodeKey,
    /// Its title (first child).
    pub title: NodeKey,
    /// Its content (second child).
    pub content: NodeKey,
}

/// The title and content of `container`, if it has exactly the `[Title, Content]` shape.
pub fn section_keys(tree: &DocumentTree, container: NodeKey) -> Option<SectionKeys> {
    if !tree.is_type(container, CONTAINER_TYPE) {
        return None;
    }
    match tree.children(container) {
        [title, content]
            if tree.is_type(*title, TITLE_TYPE) && tree.is_type(*content, CONTENT_TYPE) =>
        {
            Some(SectionKeys {
                container,
                title: *title,
                content: *content,
            })
        }
        _ => None,
    }
}

/// Create a detached, well-formed section: each part holds one empty paragraph.
pub fn create_section(tx: &mut Transaction<'_>, is_open: bool) -> Result<SectionKeys, TreeError> {
    let container = tx.create_element(ContainerNode::new(is_open));
    let title = tx.create_element(TitleNode);
    let content = tx.create_element(ContentNode);
    let title_paragraph = tx.create_paragraph();
    let content_paragraph = tx.create_paragraph();
    tx.append(title, title_paragraph)?;
    tx.append(content, content_paragraph)?;
    tx.append(container, title)?;
    tx.append(container, content)?;
    Ok(SectionKeys {
        container,
        title,
        content,
    })
}

/// Flip `is_open` of a container. Returns `false` if `key` is not a container.
pub fn toggle_open(tx: &mut Transaction<'_>, key: NodeKey) -> bool {
    match tx.element_mut::<ContainerNode>(key) {
        Some(container) => {
            container.toggle_open();
            tracing::debug!(%key, is_open = container.is_open(), "section toggled");
            true
        }
        None => false,
    }
}

/// Set `is_open` of a container, writing only when it changes.
pub fn set_open(tx: &mut Transaction<'_>, key: NodeKey, is_open: bool) -> bool {
    match tx.element::<ContainerNode>(key) {
        Some(container) if container.is_open() == is_open => true,
        Some(_) => toggle_open(tx, key),
        None => false,
    }
}

/// Dissolve a section: every block of its title and content moves to the container's
/// position, then the container is removed. Nothing the author wrote is deleted.
pub fn unwrap_section(tx: &mut Transaction<'_>, container: NodeKey) -> Result<(), TreeError> {
    let parts = tx.children(container).to_vec();
    for part in parts {
        if tx.is_type(part, TITLE_TYPE) || tx.is_type(part, CONTENT_TYPE) {
            tx.unwrap(part)?;
        }
    }
    tx.unwrap(container)
}

/// Backspace at the very start of a section: unwrap it instead of deleting anything.
pub fn collapse_at_start(tx: &mut Transaction<'_>, container: NodeKey) -> bool {
    match unwrap_section(tx, container) {
        Ok(()) => {
            tracing::debug!(%container, "section unwrapped by backspace at start");
            true
        }
        Err(err) => {
            tracing::debug!(%container, %err, "could not unwrap section");
            false
        }
    }
}

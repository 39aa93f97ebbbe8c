//! Node identities and node payloads.
//!
//! The document is an arena of [`Node`] records keyed by [`NodeKey`]. Ownership flows strictly
//! root-to-leaf through `children`; `parent` is a plain back-reference used for upward traversal.
//!
//! Built-in payloads cover the document root, paragraphs, and text runs. Everything else is an
//! [`ElementNode`] trait object whose type must be registered on the editor through a
//! [`NodeTypeSpec`](crate::NodeTypeSpec).

use crate::markup::Element;
use std::any::Any;
use std::fmt;

/// Type name of the document root.
pub const ROOT_TYPE: &str = "root";
/// Type name of paragraph nodes.
pub const PARAGRAPH_TYPE: &str = "paragraph";
/// Type name of text nodes.
pub const TEXT_TYPE: &str = "text";

/// Stable identity of a node inside a [`DocumentTree`](crate::DocumentTree).
///
/// Keys are allocated monotonically and never reused, so a key taken from an older
/// [`EditorState`](crate::EditorState) either still names the same node or names nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey(u64);

impl NodeKey {
    /// Key of the document root.
    pub const ROOT: Self = Self(0);

    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the underlying numeric id.
    pub fn get(self) -> u64 {
        self.0
    }

    /// Parse a key rendered with `Display` (e.g. read back from a markup attribute).
    pub fn parse(raw: &str) -> Option<Self> {
        raw.trim().parse().ok().map(Self)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A block element type contributed by a plugin.
///
/// Implementations hold only the node's own attributes; children live in the tree. The editor
/// clones the boxed value on first write inside a transaction, so attribute changes never leak
/// into committed states.
pub trait ElementNode: fmt::Debug + Send + Sync + 'static {
    /// Registered type name.
    fn node_type(&self) -> &'static str;

    /// Clone into a fresh box.
    fn clone_element(&self) -> Box<dyn ElementNode>;

    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete type.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Whether this element behaves like the document root for its children.
    ///
    /// Top-level element lookups and block insertion stop at shadow roots.
    fn is_shadow_root(&self) -> bool {
        false
    }

    /// The element used for the data (storage/export) representation.
    ///
    /// The exporter appends the exported children.
    fn export_markup(&self) -> Element;

    /// The element used for the editing (on-screen) representation.
    fn editing_markup(&self, key: NodeKey) -> Element;

    /// Markdown for this element, given its already rendered block children.
    fn export_markdown(&self, children: &[String]) -> String {
        children.join("\n\n")
    }
}

impl Clone for Box<dyn ElementNode> {
    fn clone(&self) -> Self {
        self.clone_element()
    }
}

/// Payload of a node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// The document root.
    Root,
    /// A paragraph holding inline children.
    Paragraph,
    /// A run of text. Offsets into text nodes count `char`s.
    Text(String),
    /// A registered plugin element.
    Element(Box<dyn ElementNode>),
}

/// One record of the node arena.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) key: NodeKey,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub(crate) fn new(key: NodeKey, kind: NodeKind) -> Self {
        Self {
            key,
            parent: None,
            children: Vec::new(),
            kind,
        }
    }

    /// This node's key.
    pub fn key(&self) -> NodeKey {
        self.key
    }

    /// The parent key, if attached.
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    /// Ordered child keys.
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    /// The node payload.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Registered type name of this node.
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Root => ROOT_TYPE,
            NodeKind::Paragraph => PARAGRAPH_TYPE,
            NodeKind::Text(_) => TEXT_TYPE,
            NodeKind::Element(element) => element.node_type(),
        }
    }

    /// Returns `true` for text nodes.
    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text(_))
    }

    /// Returns `true` for paragraph nodes.
    pub fn is_paragraph(&self) -> bool {
        matches!(self.kind, NodeKind::Paragraph)
    }

    /// Text of a text node.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The plugin element payload, if any.
    pub fn element(&self) -> Option<&dyn ElementNode> {
        match &self.kind {
            NodeKind::Element(element) => Some(element.as_ref()),
            _ => None,
        }
    }

    /// Downcast the plugin element payload.
    pub fn downcast<T: ElementNode>(&self) -> Option<&T> {
        self.element()?.as_any().downcast_ref::<T>()
    }

    pub(crate) fn downcast_mut<T: ElementNode>(&mut self) -> Option<&mut T> {
        match &mut self.kind {
            NodeKind::Element(element) => element.as_any_mut().downcast_mut::<T>(),
            _ => None,
        }
    }

    /// Whether this node acts as a root for its children (the document root or a shadow root).
    pub fn is_root_like(&self) -> bool {
        match &self.kind {
            NodeKind::Root => true,
            NodeKind::Element(element) => element.is_shadow_root(),
            _ => false,
        }
    }
}

use crate::node::NodeKey;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced by structural tree operations.
pub enum TreeError {
    #[error("node {0} not found")]
    /// The key does not name a live node.
    NodeNotFound(NodeKey),

    #[error("node {0} is not attached to a parent")]
    /// An upward traversal ran off a detached subtree.
    Detached(NodeKey),

    #[error("node {0} has no top-level element")]
    /// The node is a root-like container itself, or hangs off one without a block in between.
    NoTopLevelElement(NodeKey),

    #[error("node {0} cannot hold children")]
    /// Attempted to insert a child under a text node.
    NotAnElement(NodeKey),

    #[error("node {0} is not inside a paragraph")]
    /// A paragraph-level operation was requested for a point outside any paragraph.
    NotInParagraph(NodeKey),

    #[error("cannot move node {node} into its own subtree")]
    /// Inserting the node would create a cycle.
    Cycle {
        /// The node being moved.
        node: NodeKey,
    },

    #[error("the root node cannot be moved or removed")]
    /// The document root is fixed.
    RootImmutable,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced while parsing markup.
pub enum MarkupError {
    #[error("unterminated tag starting at byte {position}")]
    /// A `<` opened a tag that never closed with `>`.
    UnterminatedTag {
        /// Byte offset of the `<`.
        position: usize,
    },

    #[error("unterminated comment starting at byte {position}")]
    /// A `<!--` without a matching `-->`.
    UnterminatedComment {
        /// Byte offset of the `<!--`.
        position: usize,
    },

    #[error("invalid tag name at byte {position}")]
    /// A tag with an empty or malformed name.
    InvalidTagName {
        /// Byte offset of the `<`.
        position: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors surfaced by [`Editor`](crate::Editor) entry points that load content.
pub enum EditorError {
    #[error(transparent)]
    /// The markup could not be parsed.
    Markup(#[from] MarkupError),

    #[error(transparent)]
    /// A structural operation failed while building the document.
    Tree(#[from] TreeError),
}

//! The node arena and its read-only traversal API.
//!
//! A [`DocumentTree`] stores every node behind an [`Arc`]. Cloning the tree shares all node
//! records; the first write to a record inside a [`Transaction`](crate::Transaction) clones that
//! single record (`Arc::make_mut`). Committed states are therefore never mutated in place.

use crate::error::TreeError;
use crate::node::{ElementNode, Node, NodeKey, NodeKind};
use crate::selection::{Point, PointKind};
use std::collections::HashMap;
use std::sync::Arc;

/// The document tree.
#[derive(Debug, Clone)]
pub struct DocumentTree {
    nodes: HashMap<NodeKey, Arc<Node>>,
    next_key: u64,
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentTree {
    /// Create a tree holding only the root.
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            NodeKey::ROOT,
            Arc::new(Node::new(NodeKey::ROOT, NodeKind::Root)),
        );
        Self { nodes, next_key: 1 }
    }

    /// Create a tree whose root holds one empty paragraph.
    pub fn with_empty_paragraph() -> Self {
        let mut tree = Self::new();
        let paragraph = tree.insert_detached(NodeKind::Paragraph);
        tree.link(NodeKey::ROOT, 0, paragraph);
        tree
    }

    /// Number of live nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether `key` names a live node.
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(&key)
    }

    /// Look up a node.
    pub fn get(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(&key).map(Arc::as_ref)
    }

    /// Look up a node, failing with [`TreeError::NodeNotFound`].
    pub fn node(&self, key: NodeKey) -> Result<&Node, TreeError> {
        self.get(key).ok_or(TreeError::NodeNotFound(key))
    }

    /// Registered type name of a node.
    pub fn type_name(&self, key: NodeKey) -> Option<&'static str> {
        self.get(key).map(Node::type_name)
    }

    /// Whether `key` names a node of the given type.
    pub fn is_type(&self, key: NodeKey, type_name: &str) -> bool {
        self.type_name(key) == Some(type_name)
    }

    /// Whether `key` names a paragraph.
    pub fn is_paragraph(&self, key: NodeKey) -> bool {
        self.get(key).is_some_and(Node::is_paragraph)
    }

    /// Whether `key` names a text node.
    pub fn is_text(&self, key: NodeKey) -> bool {
        self.get(key).is_some_and(Node::is_text)
    }

    /// Whether `key` is the document root or a shadow root.
    pub fn is_root_like(&self, key: NodeKey) -> bool {
        self.get(key).is_some_and(Node::is_root_like)
    }

    /// Downcast a plugin element.
    pub fn element<T: ElementNode>(&self, key: NodeKey) -> Option<&T> {
        self.get(key)?.downcast::<T>()
    }

    /// Parent of a node.
    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.get(key)?.parent
    }

    /// Children of a node (empty for unknown keys).
    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.get(key).map(Node::children).unwrap_or(&[])
    }

    /// First child.
    pub fn first_child(&self, key: NodeKey) -> Option<NodeKey> {
        self.children(key).first().copied()
    }

    /// Last child.
    pub fn last_child(&self, key: NodeKey) -> Option<NodeKey> {
        self.children(key).last().copied()
    }

    /// Position of a node among its siblings.
    pub fn index_in_parent(&self, key: NodeKey) -> Option<usize> {
        let parent = self.parent(key)?;
        self.children(parent).iter().position(|child| *child == key)
    }

    /// The sibling before `key`.
    pub fn previous_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let parent = self.parent(key)?;
        let index = self.index_in_parent(key)?;
        index
            .checked_sub(1)
            .and_then(|prev| self.children(parent).get(prev).copied())
    }

    /// The sibling after `key`.
    pub fn next_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let parent = self.parent(key)?;
        let index = self.index_in_parent(key)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Iterate over the ancestors of `key`, nearest first. `key` itself is not included.
    pub fn ancestors(&self, key: NodeKey) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(key),
        }
    }

    /// Whether `ancestor` is a proper ancestor of `key`.
    pub fn is_ancestor_of(&self, ancestor: NodeKey, key: NodeKey) -> bool {
        self.ancestors(key).any(|candidate| candidate == ancestor)
    }

    /// Whether the node is reachable from the root.
    pub fn is_attached(&self, key: NodeKey) -> bool {
        key == NodeKey::ROOT || self.ancestors(key).last() == Some(NodeKey::ROOT)
    }

    /// The nearest paragraph at or above `key`.
    pub fn enclosing_paragraph(&self, key: NodeKey) -> Option<NodeKey> {
        std::iter::once(key)
            .chain(self.ancestors(key))
            .find(|candidate| self.is_paragraph(*candidate))
    }

    /// The block directly under the nearest root-like ancestor of `key`.
    pub fn top_level_element(&self, key: NodeKey) -> Result<NodeKey, TreeError> {
        let mut current = self.node(key)?;
        if current.is_root_like() {
            return Err(TreeError::NoTopLevelElement(key));
        }
        loop {
            let parent_key = current.parent.ok_or(TreeError::Detached(current.key))?;
            let parent = self.node(parent_key)?;
            if parent.is_root_like() {
                return Ok(current.key);
            }
            current = parent;
        }
    }

    /// Descend through first children until a leaf.
    pub fn first_descendant(&self, key: NodeKey) -> NodeKey {
        let mut current = key;
        while let Some(child) = self.first_child(current) {
            current = child;
        }
        current
    }

    /// Descend through last children until a leaf.
    pub fn last_descendant(&self, key: NodeKey) -> NodeKey {
        let mut current = key;
        while let Some(child) = self.last_child(current) {
            current = child;
        }
        current
    }

    /// All descendants of `key` in document order (pre-order), excluding `key`.
    pub fn descendants(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeKey> = self.children(key).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Every paragraph in document order.
    pub fn leaf_blocks(&self) -> Vec<NodeKey> {
        self.descendants(NodeKey::ROOT)
            .into_iter()
            .filter(|key| self.is_paragraph(*key))
            .collect()
    }

    /// Every live node of the given type, in document order.
    pub fn nodes_of_type(&self, type_name: &str) -> Vec<NodeKey> {
        self.descendants(NodeKey::ROOT)
            .into_iter()
            .filter(|key| self.is_type(*key, type_name))
            .collect()
    }

    /// Concatenated text of a subtree.
    ///
    /// Sibling blocks are separated by a blank line, matching the usual rich-text convention.
    pub fn text_content(&self, key: NodeKey) -> String {
        let mut out = String::new();
        self.collect_text(key, &mut out);
        out
    }

    fn collect_text(&self, key: NodeKey, out: &mut String) {
        let Some(node) = self.get(key) else {
            return;
        };
        if let NodeKind::Text(text) = &node.kind {
            out.push_str(text);
            return;
        }
        let children = node.children();
        for (index, child) in children.iter().enumerate() {
            self.collect_text(*child, out);
            let is_block = !self.is_text(*child);
            if is_block && index + 1 < children.len() {
                out.push_str("\n\n");
            }
        }
    }

    /// Number of `char`s in a text node (0 for anything else).
    pub fn text_len(&self, key: NodeKey) -> usize {
        self.get(key)
            .and_then(Node::text)
            .map_or(0, |text| text.chars().count())
    }

    /// Whether the point is a live position.
    pub fn is_valid_point(&self, point: &Point) -> bool {
        match point.kind {
            PointKind::Text => self.is_text(point.key) && point.offset <= self.text_len(point.key),
            PointKind::Element => self
                .get(point.key)
                .is_some_and(|node| !node.is_text() && point.offset <= node.children.len()),
        }
    }

    /// Whether `point` is the very first caret position inside `ancestor`.
    pub fn point_is_at_start_of(&self, point: &Point, ancestor: NodeKey) -> bool {
        if point.offset != 0 {
            return false;
        }
        let mut current = point.key;
        while current != ancestor {
            if self.index_in_parent(current) != Some(0) {
                return false;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        true
    }

    /// Whether `point` is the very last caret position inside `ancestor`.
    pub fn point_is_at_end_of(&self, point: &Point, ancestor: NodeKey) -> bool {
        let end_offset = match point.kind {
            PointKind::Text => self.text_len(point.key),
            PointKind::Element => self.children(point.key).len(),
        };
        if point.offset != end_offset {
            return false;
        }
        let mut current = point.key;
        while current != ancestor {
            let Some(parent) = self.parent(current) else {
                return false;
            };
            if self.last_child(parent) != Some(current) {
                return false;
            }
            current = parent;
        }
        true
    }

    /// The caret position at the start of a subtree.
    pub fn start_point(&self, key: NodeKey) -> Point {
        let leaf = self.first_descendant(key);
        if self.is_text(leaf) {
            Point::text(leaf, 0)
        } else {
            Point::element(leaf, 0)
        }
    }

    /// The caret position at the end of a subtree.
    pub fn end_point(&self, key: NodeKey) -> Point {
        let leaf = self.last_descendant(key);
        if self.is_text(leaf) {
            Point::text(leaf, self.text_len(leaf))
        } else {
            Point::element(leaf, self.children(leaf).len())
        }
    }

    pub(crate) fn insert_detached(&mut self, kind: NodeKind) -> NodeKey {
        let key = NodeKey::new(self.next_key);
        self.next_key += 1;
        self.nodes.insert(key, Arc::new(Node::new(key, kind)));
        key
    }

    pub(crate) fn node_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(&key).map(Arc::make_mut)
    }

    pub(crate) fn drop_node(&mut self, key: NodeKey) -> Option<Arc<Node>> {
        self.nodes.remove(&key)
    }

    /// Attach a detached node. Callers guarantee `child` is detached and `parent` can hold it.
    pub(crate) fn link(&mut self, parent: NodeKey, index: usize, child: NodeKey) {
        if let Some(parent_node) = self.node_mut(parent) {
            let index = index.min(parent_node.children.len());
            parent_node.children.insert(index, child);
        }
        if let Some(child_node) = self.node_mut(child) {
            child_node.parent = Some(parent);
        }
    }

    /// Detach a node from its parent, returning the old parent and index.
    pub(crate) fn unlink(&mut self, key: NodeKey) -> Option<(NodeKey, usize)> {
        let parent = self.parent(key)?;
        let index = self.index_in_parent(key)?;
        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.children.remove(index);
        }
        if let Some(node) = self.node_mut(key) {
            node.parent = None;
        }
        Some((parent, index))
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.nodes.keys().copied()
    }
}

/// Iterator over ancestors, nearest first.
#[derive(Debug, Clone)]
pub struct Ancestors<'a> {
    tree: &'a DocumentTree,
    next: Option<NodeKey>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeKey;

    fn next(&mut self) -> Option<NodeKey> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

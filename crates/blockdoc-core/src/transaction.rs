//! Transaction-scoped writes.
//!
//! A [`Transaction`] owns a working copy of the tree (sharing every untouched node with the last
//! committed state) and the pending selection. It is only handed out by
//! [`Editor::update`](crate::Editor::update) and command handlers, so node records can never be
//! mutated outside an update.
//!
//! Every write marks the touched node and all of its ancestors dirty. Node transforms and
//! normalizers only look at dirty nodes.

use crate::error::TreeError;
use crate::node::{ElementNode, NodeKey, NodeKind};
use crate::registry::NodeRegistry;
use crate::selection::{NodeSelection, Point, PointKind, Selection};
use crate::tree::DocumentTree;
use std::collections::HashSet;
use std::ops::Deref;

/// A pending edit.
pub struct Transaction<'a> {
    tree: DocumentTree,
    selection: Option<Selection>,
    dirty: HashSet<NodeKey>,
    recent: HashSet<NodeKey>,
    removed: HashSet<NodeKey>,
    selection_changed: bool,
    registry: &'a NodeRegistry,
}

/// What a finished transaction produced.
#[derive(Debug)]
pub(crate) struct TransactionOutcome {
    pub(crate) tree: DocumentTree,
    pub(crate) selection: Option<Selection>,
    pub(crate) dirty: HashSet<NodeKey>,
    pub(crate) removed: HashSet<NodeKey>,
    pub(crate) selection_changed: bool,
}

impl TransactionOutcome {
    pub(crate) fn is_noop(&self) -> bool {
        self.dirty.is_empty() && self.removed.is_empty() && !self.selection_changed
    }
}

impl Deref for Transaction<'_> {
    type Target = DocumentTree;

    fn deref(&self) -> &DocumentTree {
        &self.tree
    }
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(
        tree: DocumentTree,
        selection: Option<Selection>,
        registry: &'a NodeRegistry,
    ) -> Self {
        Self {
            tree,
            selection,
            dirty: HashSet::new(),
            recent: HashSet::new(),
            removed: HashSet::new(),
            selection_changed: false,
            registry,
        }
    }

    /// The pending tree.
    pub fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    /// The node types known to the editor.
    pub fn registry(&self) -> &'a NodeRegistry {
        self.registry
    }

    /// The pending selection.
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Whether `key` was written in this transaction.
    pub fn is_dirty(&self, key: NodeKey) -> bool {
        self.dirty.contains(&key)
    }

    /// Keys written so far (in no particular order).
    pub fn dirty_nodes(&self) -> Vec<NodeKey> {
        self.dirty.iter().copied().collect()
    }

    /// Keys removed so far.
    pub fn removed_nodes(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.removed.iter().copied()
    }

    pub(crate) fn take_recent(&mut self) -> HashSet<NodeKey> {
        std::mem::take(&mut self.recent)
    }

    pub(crate) fn has_writes(&self) -> bool {
        !self.dirty.is_empty() || !self.removed.is_empty()
    }

    fn mark_dirty(&mut self, key: NodeKey) {
        let mut current = Some(key);
        while let Some(node) = current {
            if !self.tree.contains(node) {
                break;
            }
            self.dirty.insert(node);
            self.recent.insert(node);
            current = self.tree.parent(node);
        }
    }

    // ---- creation ----

    /// Create a detached, empty paragraph.
    pub fn create_paragraph(&mut self) -> NodeKey {
        let key = self.tree.insert_detached(NodeKind::Paragraph);
        self.mark_dirty(key);
        key
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeKey {
        let key = self.tree.insert_detached(NodeKind::Text(text.into()));
        self.mark_dirty(key);
        key
    }

    /// Create a detached plugin element.
    pub fn create_element(&mut self, element: impl ElementNode) -> NodeKey {
        self.create_boxed_element(Box::new(element))
    }

    /// Create a detached plugin element from a boxed payload.
    pub fn create_boxed_element(&mut self, element: Box<dyn ElementNode>) -> NodeKey {
        if !self.registry.contains(element.node_type()) {
            tracing::warn!(
                node_type = element.node_type(),
                "creating a node of an unregistered type"
            );
        }
        let key = self.tree.insert_detached(NodeKind::Element(element));
        self.mark_dirty(key);
        key
    }

    /// Create a paragraph holding `text` (no text node when `text` is empty).
    pub fn create_paragraph_with_text(&mut self, text: &str) -> NodeKey {
        let paragraph = self.create_paragraph();
        if !text.is_empty() {
            let text_key = self.create_text(text);
            self.tree.link(paragraph, 0, text_key);
        }
        paragraph
    }

    // ---- structure ----

    /// Append `child` to `parent`, moving it if already attached.
    pub fn append(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), TreeError> {
        let index = self.tree.node(parent)?.children().len();
        self.insert_at(parent, index, child)
    }

    /// Insert `child` at `index` among `parent`'s children, moving it if already attached.
    pub fn insert_at(
        &mut self,
        parent: NodeKey,
        index: usize,
        child: NodeKey,
    ) -> Result<(), TreeError> {
        if child == NodeKey::ROOT {
            return Err(TreeError::RootImmutable);
        }
        if self.tree.node(parent)?.is_text() {
            return Err(TreeError::NotAnElement(parent));
        }
        self.tree.node(child)?;
        if child == parent || self.tree.is_ancestor_of(child, parent) {
            return Err(TreeError::Cycle { node: child });
        }

        let mut index = index;
        if let Some((old_parent, old_index)) = self.tree.unlink(child) {
            self.mark_dirty(old_parent);
            if old_parent == parent && old_index < index {
                index -= 1;
            }
        }
        self.tree.link(parent, index, child);
        self.mark_dirty(child);
        Ok(())
    }

    /// Insert `node` directly before `sibling`.
    pub fn insert_before(&mut self, sibling: NodeKey, node: NodeKey) -> Result<(), TreeError> {
        let parent = self
            .tree
            .node(sibling)?
            .parent()
            .ok_or(TreeError::Detached(sibling))?;
        let index = self
            .tree
            .index_in_parent(sibling)
            .ok_or(TreeError::Detached(sibling))?;
        self.insert_at(parent, index, node)
    }

    /// Insert `node` directly after `sibling`.
    pub fn insert_after(&mut self, sibling: NodeKey, node: NodeKey) -> Result<(), TreeError> {
        let parent = self
            .tree
            .node(sibling)?
            .parent()
            .ok_or(TreeError::Detached(sibling))?;
        let index = self
            .tree
            .index_in_parent(sibling)
            .ok_or(TreeError::Detached(sibling))?;
        self.insert_at(parent, index + 1, node)
    }

    /// Detach `key` from its parent without deleting it.
    pub fn detach(&mut self, key: NodeKey) -> Result<(), TreeError> {
        if key == NodeKey::ROOT {
            return Err(TreeError::RootImmutable);
        }
        self.tree.node(key)?;
        if let Some((parent, _)) = self.tree.unlink(key) {
            self.mark_dirty(parent);
        }
        self.mark_dirty(key);
        Ok(())
    }

    /// Delete `key` and its whole subtree.
    pub fn remove(&mut self, key: NodeKey) -> Result<(), TreeError> {
        if key == NodeKey::ROOT {
            return Err(TreeError::RootImmutable);
        }
        self.tree.node(key)?;
        if let Some((parent, _)) = self.tree.unlink(key) {
            self.mark_dirty(parent);
        }
        let mut doomed = self.tree.descendants(key);
        doomed.push(key);
        for node in doomed {
            self.tree.drop_node(node);
            self.dirty.remove(&node);
            self.recent.remove(&node);
            self.removed.insert(node);
        }
        Ok(())
    }

    /// Put `replacement` where `old` is and delete `old`.
    pub fn replace(&mut self, old: NodeKey, replacement: NodeKey) -> Result<(), TreeError> {
        self.insert_before(old, replacement)?;
        self.remove(old)
    }

    /// Splice the children of `key` into its parent at its position, then delete `key`.
    ///
    /// Element points on `key` are moved onto the parent.
    pub fn unwrap(&mut self, key: NodeKey) -> Result<(), TreeError> {
        let parent = self
            .tree
            .node(key)?
            .parent()
            .ok_or(TreeError::Detached(key))?;
        let index = self
            .tree
            .index_in_parent(key)
            .ok_or(TreeError::Detached(key))?;
        let children = self.tree.children(key).to_vec();
        for (offset, child) in children.iter().enumerate() {
            self.insert_at(parent, index + offset, *child)?;
        }
        self.remap_element_points(key, parent, index);
        self.remove(key)
    }

    fn remap_element_points(&mut self, from: NodeKey, to: NodeKey, base: usize) {
        let Some(Selection::Range(range)) = self.selection.as_mut() else {
            return;
        };
        let mut changed = false;
        for point in [&mut range.anchor, &mut range.focus] {
            if point.key == from && point.kind == PointKind::Element {
                *point = Point::element(to, base + point.offset);
                changed = true;
            }
        }
        self.selection_changed |= changed;
    }

    /// Replace the text of a text node.
    pub fn set_text(&mut self, key: NodeKey, text: impl Into<String>) -> Result<(), TreeError> {
        let text = text.into();
        let len = text.chars().count();
        match self.tree.node_mut(key).map(|node| &mut node.kind) {
            Some(NodeKind::Text(value)) => *value = text,
            Some(_) => return Err(TreeError::NotAnElement(key)),
            None => return Err(TreeError::NodeNotFound(key)),
        }
        self.mark_dirty(key);
        if let Some(Selection::Range(range)) = self.selection.as_mut() {
            for point in [&mut range.anchor, &mut range.focus] {
                if point.key == key && point.offset > len {
                    point.offset = len;
                }
            }
        }
        Ok(())
    }

    /// Writable access to a plugin element's attributes.
    ///
    /// The node record is cloned on first write and marked dirty.
    pub fn element_mut<T: ElementNode>(&mut self, key: NodeKey) -> Option<&mut T> {
        self.tree.get(key)?.downcast::<T>()?;
        self.mark_dirty(key);
        self.tree.node_mut(key)?.downcast_mut::<T>()
    }

    // ---- selection ----

    /// Replace the selection.
    pub fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection;
        self.selection_changed = true;
    }

    /// Place a collapsed caret.
    pub fn set_cursor(&mut self, point: Point) {
        self.set_selection(Some(Selection::caret(point)));
    }

    /// Place the caret at the start of `key`'s subtree.
    pub fn select_start(&mut self, key: NodeKey) {
        let point = self.tree.start_point(key);
        self.set_cursor(point);
    }

    /// Place the caret at the end of `key`'s subtree.
    pub fn select_end(&mut self, key: NodeKey) {
        let point = self.tree.end_point(key);
        self.set_cursor(point);
    }

    /// Select `key` as a whole node.
    pub fn select_node(&mut self, key: NodeKey) {
        self.set_selection(Some(Selection::Node(NodeSelection::single(key))));
    }

    // ---- block insertion ----

    /// Insert a detached block at the nearest valid position relative to the selection.
    ///
    /// - Caret in an empty top-level paragraph: the paragraph is replaced.
    /// - Caret at the end (start) of a top-level paragraph: inserted after (before) it.
    /// - Caret inside a top-level paragraph: the paragraph is split and the block goes between.
    /// - Caret nested deeper, or a node selection: inserted after the enclosing top-level block.
    /// - No selection: appended to the root.
    pub fn insert_block_node(&mut self, block: NodeKey) -> Result<(), TreeError> {
        let anchor = match self.selection.clone() {
            None => return self.append(NodeKey::ROOT, block),
            Some(Selection::Node(nodes)) => match nodes.keys().last() {
                Some(key) => {
                    let top = self.tree.top_level_element(key)?;
                    return self.insert_after(top, block);
                }
                None => return self.append(NodeKey::ROOT, block),
            },
            Some(Selection::Range(range)) => range.anchor,
        };

        if anchor.kind == PointKind::Element && self.tree.is_root_like(anchor.key) {
            return self.insert_at(anchor.key, anchor.offset, block);
        }

        let top = self.tree.top_level_element(anchor.key)?;
        if !self.tree.is_paragraph(top) {
            return self.insert_after(top, block);
        }
        if self.tree.text_content(top).is_empty() {
            return self.replace(top, block);
        }
        if self.tree.point_is_at_end_of(&anchor, top) {
            return self.insert_after(top, block);
        }
        if self.tree.point_is_at_start_of(&anchor, top) {
            return self.insert_before(top, block);
        }
        self.split_paragraph_at(anchor)?;
        self.insert_after(top, block)
    }

    /// Split the paragraph containing `point`; the tail moves into a new paragraph inserted
    /// after it. Returns the new paragraph. The selection is left untouched.
    pub fn split_paragraph_at(&mut self, point: Point) -> Result<NodeKey, TreeError> {
        let paragraph = self
            .tree
            .enclosing_paragraph(point.key)
            .ok_or(TreeError::NotInParagraph(point.key))?;
        let tail = self.create_paragraph();
        self.insert_after(paragraph, tail)?;

        // Index of the first child of `paragraph` that moves to the tail.
        let split_index = match point.kind {
            PointKind::Element if point.key == paragraph => point.offset,
            _ => {
                let inline = std::iter::once(point.key)
                    .chain(self.tree.ancestors(point.key))
                    .find(|key| self.tree.parent(*key) == Some(paragraph))
                    .ok_or(TreeError::NotInParagraph(point.key))?;
                let index = self
                    .tree
                    .index_in_parent(inline)
                    .ok_or(TreeError::Detached(inline))?;
                if point.kind == PointKind::Text && inline == point.key {
                    let text = self.tree.get(inline).and_then(|n| n.text()).unwrap_or("");
                    let head: String = text.chars().take(point.offset).collect();
                    let rest: String = text.chars().skip(point.offset).collect();
                    if !rest.is_empty() {
                        let rest_key = self.create_text(rest);
                        self.append(tail, rest_key)?;
                    }
                    if head.is_empty() {
                        self.remove(inline)?;
                        index
                    } else {
                        self.set_text(inline, head)?;
                        index + 1
                    }
                } else if point.offset == 0 {
                    index
                } else {
                    index + 1
                }
            }
        };

        let moving: Vec<NodeKey> = self
            .tree
            .children(paragraph)
            .iter()
            .skip(split_index)
            .copied()
            .collect();
        for child in moving {
            self.append(tail, child)?;
        }
        self.mark_dirty(paragraph);
        Ok(tail)
    }

    pub(crate) fn finish(mut self) -> TransactionOutcome {
        self.selection = self.selection.take().and_then(|selection| match selection {
            Selection::Range(range) => {
                let valid = self.tree.is_valid_point(&range.anchor)
                    && self.tree.is_valid_point(&range.focus)
                    && self.tree.is_attached(range.anchor.key)
                    && self.tree.is_attached(range.focus.key);
                if valid {
                    Some(Selection::Range(range))
                } else {
                    tracing::debug!(?range, "dropping selection that points at removed nodes");
                    self.selection_changed = true;
                    None
                }
            }
            Selection::Node(mut nodes) => {
                let before = nodes.len();
                nodes.retain(|key| self.tree.is_attached(key));
                if nodes.len() != before {
                    self.selection_changed = true;
                }
                (!nodes.is_empty()).then_some(Selection::Node(nodes))
            }
        });
        TransactionOutcome {
            tree: self.tree,
            selection: self.selection,
            dirty: self.dirty,
            removed: self.removed,
            selection_changed: self.selection_changed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn setup(text: &str) -> (NodeRegistry, DocumentTree) {
        let registry = NodeRegistry::default();
        let mut tx = Transaction::new(DocumentTree::new(), None, &registry);
        let paragraph = tx.create_paragraph_with_text(text);
        tx.append(NodeKey::ROOT, paragraph).unwrap();
        let tree = tx.finish().tree;
        (registry, tree)
    }

    fn texts(tree: &DocumentTree) -> Vec<String> {
        tree.children(NodeKey::ROOT)
            .iter()
            .map(|key| tree.text_content(*key))
            .collect()
    }

    #[test]
    fn test_dirty_marks_ancestors() {
        let (registry, tree) = setup("abc");
        let paragraph = tree.first_child(NodeKey::ROOT).unwrap();
        let text = tree.first_child(paragraph).unwrap();
        let mut tx = Transaction::new(tree, None, &registry);
        tx.set_text(text, "abcd").unwrap();
        assert!(tx.is_dirty(text));
        assert!(tx.is_dirty(paragraph));
        assert!(tx.is_dirty(NodeKey::ROOT));
    }

    #[test]
    fn test_cycle_and_root_guards() {
        let (registry, tree) = setup("abc");
        let paragraph = tree.first_child(NodeKey::ROOT).unwrap();
        let text = tree.first_child(paragraph).unwrap();
        let mut tx = Transaction::new(tree, None, &registry);
        assert_eq!(
            tx.append(text, paragraph),
            Err(TreeError::NotAnElement(text))
        );
        let wrapper = tx.create_paragraph();
        tx.append(paragraph, wrapper).unwrap();
        assert_eq!(
            tx.append(wrapper, paragraph),
            Err(TreeError::Cycle { node: paragraph })
        );
        assert_eq!(tx.remove(NodeKey::ROOT), Err(TreeError::RootImmutable));
    }

    #[test]
    fn test_split_paragraph_mid_text() {
        let (registry, tree) = setup("hello");
        let paragraph = tree.first_child(NodeKey::ROOT).unwrap();
        let text = tree.first_child(paragraph).unwrap();
        let mut tx = Transaction::new(tree, None, &registry);
        tx.split_paragraph_at(Point::text(text, 2)).unwrap();
        assert_eq!(texts(&tx), vec!["he".to_string(), "llo".to_string()]);
    }

    #[test]
    fn test_split_paragraph_at_start_keeps_empty_head() {
        let (registry, tree) = setup("hello");
        let paragraph = tree.first_child(NodeKey::ROOT).unwrap();
        let text = tree.first_child(paragraph).unwrap();
        let mut tx = Transaction::new(tree, None, &registry);
        tx.split_paragraph_at(Point::text(text, 0)).unwrap();
        assert_eq!(texts(&tx), vec![String::new(), "hello".to_string()]);
        assert!(tx.children(paragraph).is_empty());
    }

    #[test]
    fn test_unwrap_moves_children_and_remaps_selection() {
        let (registry, tree) = setup("one");
        let paragraph = tree.first_child(NodeKey::ROOT).unwrap();
        let mut tx = Transaction::new(tree, None, &registry);
        let wrapper = tx.create_paragraph();
        tx.insert_before(paragraph, wrapper).unwrap();
        let inner_a = tx.create_paragraph_with_text("a");
        let inner_b = tx.create_paragraph_with_text("b");
        tx.append(wrapper, inner_a).unwrap();
        tx.append(wrapper, inner_b).unwrap();
        tx.set_cursor(Point::element(wrapper, 1));

        tx.unwrap(wrapper).unwrap();
        assert_eq!(tx.children(NodeKey::ROOT), &[inner_a, inner_b, paragraph]);
        assert_eq!(
            tx.selection().and_then(Selection::caret_point),
            Some(Point::element(NodeKey::ROOT, 1))
        );
        assert!(!tx.contains(wrapper));
    }

    #[test]
    fn test_insert_block_replaces_empty_paragraph() {
        let registry = NodeRegistry::default();
        let tree = DocumentTree::with_empty_paragraph();
        let paragraph = tree.first_child(NodeKey::ROOT).unwrap();
        let mut tx = Transaction::new(
            tree,
            Some(Selection::caret(Point::element(paragraph, 0))),
            &registry,
        );
        let block = tx.create_paragraph_with_text("new");
        tx.insert_block_node(block).unwrap();
        assert_eq!(tx.children(NodeKey::ROOT), &[block]);
        let outcome = tx.finish();
        assert_eq!(outcome.selection, None);
    }

    #[test]
    fn test_insert_block_splits_mid_paragraph() {
        let (registry, tree) = setup("abcd");
        let paragraph = tree.first_child(NodeKey::ROOT).unwrap();
        let text = tree.first_child(paragraph).unwrap();
        let mut tx = Transaction::new(
            tree,
            Some(Selection::caret(Point::text(text, 2))),
            &registry,
        );
        let block = tx.create_paragraph_with_text("X");
        tx.insert_block_node(block).unwrap();
        assert_eq!(
            texts(&tx),
            vec!["ab".to_string(), "X".to_string(), "cd".to_string()]
        );
    }

    #[test]
    fn test_element_mut_copy_on_write() {
        #[derive(Debug, Clone)]
        struct Flag(bool);
        impl ElementNode for Flag {
            fn node_type(&self) -> &'static str {
                "flag"
            }
            fn clone_element(&self) -> Box<dyn ElementNode> {
                Box::new(self.clone())
            }
            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
            fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
                self
            }
            fn export_markup(&self) -> crate::markup::Element {
                crate::markup::Element::new("div")
            }
            fn editing_markup(&self, _key: NodeKey) -> crate::markup::Element {
                crate::markup::Element::new("div")
            }
        }

        let registry = NodeRegistry::default();
        let mut tx = Transaction::new(DocumentTree::new(), None, &registry);
        let flag = tx.create_element(Flag(false));
        tx.append(NodeKey::ROOT, flag).unwrap();
        let committed = tx.finish().tree;

        let mut tx = Transaction::new(committed.clone(), None, &registry);
        tx.element_mut::<Flag>(flag).unwrap().0 = true;
        assert!(tx.element::<Flag>(flag).unwrap().0);
        assert!(!committed.element::<Flag>(flag).unwrap().0);
        assert!(tx.element_mut::<Flag>(NodeKey::ROOT).is_none());
    }
}

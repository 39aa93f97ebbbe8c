//! Committed editor state and change notifications.
//!
//! An [`EditorState`] is an immutable snapshot: the tree plus the selection. Every commit
//! produces a new snapshot and an [`UpdatePayload`] describing what changed, delivered to
//! update listeners after node transforms and normalizers have settled.
//!
//! # Example
//!
//! ```rust
//! use blockdoc_core::{Editor, MutationKind, NodeKey};
//!
//! let mut editor = Editor::new();
//! editor.register_update_listener(|payload| {
//!     let created = payload
//!         .mutations
//!         .iter()
//!         .filter(|m| m.kind == MutationKind::Created)
//!         .count();
//!     println!("v{} created {created} nodes", payload.version);
//! });
//!
//! editor.update(|tx| {
//!     let paragraph = tx.create_paragraph_with_text("Hello");
//!     tx.append(NodeKey::ROOT, paragraph).ok();
//! });
//! assert_eq!(editor.state().tree.text_content(NodeKey::ROOT), "\n\nHello");
//! ```

use crate::commands::CommandKind;
use crate::node::NodeKey;
use crate::selection::Selection;
use crate::tree::DocumentTree;
use std::collections::HashSet;
use std::sync::Arc;

/// A committed snapshot.
#[derive(Debug, Clone)]
pub struct EditorState {
    /// The document tree.
    pub tree: DocumentTree,
    /// The selection, if any.
    pub selection: Option<Selection>,
}

impl Default for EditorState {
    fn default() -> Self {
        Self {
            tree: DocumentTree::with_empty_paragraph(),
            selection: None,
        }
    }
}

/// How a node changed between two states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// The node did not exist before.
    Created,
    /// The node (or something under it) was written.
    Updated,
    /// The node no longer exists.
    Destroyed,
}

/// One node-level change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeMutation {
    /// The node.
    pub key: NodeKey,
    /// Its type name (taken from whichever state still has it).
    pub node_type: &'static str,
    /// What happened.
    pub kind: MutationKind,
}

/// What triggered a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOrigin {
    /// [`Editor::update`](crate::Editor::update) or `try_update`.
    Update,
    /// A dispatched command.
    Dispatch(CommandKind),
    /// History navigation.
    Undo,
    /// History navigation.
    Redo,
}

/// Change notification delivered to update listeners.
#[derive(Debug, Clone)]
pub struct UpdatePayload {
    /// The state before the commit.
    pub prev_state: Arc<EditorState>,
    /// The state after the commit (and any normalizer passes).
    pub state: Arc<EditorState>,
    /// Every key written during the commit, ancestors included.
    pub dirty: HashSet<NodeKey>,
    /// Node-level changes, sorted by key.
    pub mutations: Vec<NodeMutation>,
    /// What triggered the commit.
    pub origin: UpdateOrigin,
    /// Editor version after the commit.
    pub version: u64,
}

impl UpdatePayload {
    /// Mutations of a single node type.
    pub fn mutations_of<'a>(
        &'a self,
        node_type: &'a str,
    ) -> impl Iterator<Item = &'a NodeMutation> + 'a {
        self.mutations
            .iter()
            .filter(move |mutation| mutation.node_type == node_type)
    }

    /// Whether the selection differs between the two states.
    pub fn selection_changed(&self) -> bool {
        self.prev_state.selection != self.state.selection
    }
}

/// Diff two trees over a set of candidate keys.
pub(crate) fn diff_mutations(
    prev: &DocumentTree,
    next: &DocumentTree,
    candidates: impl IntoIterator<Item = NodeKey>,
) -> Vec<NodeMutation> {
    let mut mutations: Vec<NodeMutation> = candidates
        .into_iter()
        .collect::<HashSet<_>>()
        .into_iter()
        .filter_map(|key| match (prev.get(key), next.get(key)) {
            (None, Some(node)) => Some(NodeMutation {
                key,
                node_type: node.type_name(),
                kind: MutationKind::Created,
            }),
            (Some(old), Some(new)) if !std::ptr::eq(old, new) => Some(NodeMutation {
                key,
                node_type: new.type_name(),
                kind: MutationKind::Updated,
            }),
            (Some(old), None) => Some(NodeMutation {
                key,
                node_type: old.type_name(),
                kind: MutationKind::Destroyed,
            }),
            _ => None,
        })
        .collect();
    mutations.sort_by_key(|mutation| mutation.key);
    mutations
}

/// Diff two whole trees (used after history navigation).
pub(crate) fn diff_trees(prev: &DocumentTree, next: &DocumentTree) -> Vec<NodeMutation> {
    let candidates: Vec<NodeKey> = prev.keys().chain(next.keys()).collect();
    diff_mutations(prev, next, candidates)
}

//! Derived visual state of sections.
//!
//! Two flags are recomputed after every commit and never stored in the document: a container
//! is *selected* when it is part of a whole-node selection, and a title is *empty* when it has
//! no text. The set of rendered containers is maintained incrementally from each commit's
//! created and destroyed nodes, so a refresh costs one check per rendered section.

use crate::convert::{DETAILS_SELECTED_CLASS, DETAILS_TITLE_EMPTY_CLASS};
use crate::locate::title_is_empty;
use crate::nodes::{CONTAINER_TYPE, section_keys};
use blockdoc_core::{Element, EditorState, MutationKind, NodeKey, Selection, UpdatePayload};
use std::collections::BTreeSet;

/// Attribute carrying the placeholder text of an empty title in the editing markup.
pub const PLACEHOLDER_ATTR: &str = "data-placeholder";

/// Presentation flags of every rendered section.
#[derive(Debug, Clone, Default)]
pub struct SectionPresentation {
    rendered: BTreeSet<NodeKey>,
    selected: BTreeSet<NodeKey>,
    empty_titles: BTreeSet<NodeKey>,
    placeholder: String,
}

impl SectionPresentation {
    /// An empty presentation state using `placeholder` for empty titles.
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
            ..Self::default()
        }
    }

    /// Rebuild everything from a committed state.
    pub fn seed(&mut self, state: &EditorState) {
        self.rendered = state.tree.nodes_of_type(CONTAINER_TYPE).into_iter().collect();
        self.refresh(state);
    }

    /// Apply one commit.
    pub fn sync(&mut self, payload: &UpdatePayload) {
        for mutation in payload.mutations_of(CONTAINER_TYPE) {
            match mutation.kind {
                MutationKind::Created | MutationKind::Updated => {
                    self.rendered.insert(mutation.key);
                }
                MutationKind::Destroyed => {
                    self.rendered.remove(&mutation.key);
                }
            }
        }
        self.refresh(&payload.state);
    }

    fn refresh(&mut self, state: &EditorState) {
        self.selected.clear();
        self.empty_titles.clear();
        let nodes = state.selection.as_ref().and_then(Selection::as_node);
        for container in &self.rendered {
            if nodes.is_some_and(|nodes| nodes.contains(*container)) {
                self.selected.insert(*container);
            }
            if let Some(keys) = section_keys(&state.tree, *container)
                && title_is_empty(&state.tree, keys.title)
            {
                self.empty_titles.insert(keys.title);
            }
        }
    }

    /// Add presentation classes to a node's editing markup.
    pub fn decorate(&self, key: NodeKey, element: &mut Element) {
        if self.selected.contains(&key) {
            element.add_class(DETAILS_SELECTED_CLASS);
        }
        if self.empty_titles.contains(&key) {
            element.add_class(DETAILS_TITLE_EMPTY_CLASS);
            element.set_attr(PLACEHOLDER_ATTR, self.placeholder.as_str());
        }
    }

    /// Whether the container is node-selected.
    pub fn is_selected(&self, container: NodeKey) -> bool {
        self.selected.contains(&container)
    }

    /// Whether the title is flagged empty.
    pub fn is_title_empty(&self, title: NodeKey) -> bool {
        self.empty_titles.contains(&title)
    }

    /// Containers currently in the document.
    pub fn rendered_sections(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.rendered.iter().copied()
    }

    /// Placeholder text for empty titles.
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }
}

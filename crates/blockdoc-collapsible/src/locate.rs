//! Finding the section around a selection, and section-level edits shared by the handlers.

use crate::nodes::{CONTAINER_TYPE, CONTENT_TYPE, SectionKeys, TITLE_TYPE, section_keys};
use blockdoc_core::{DocumentTree, NodeKey, Point, Selection, Transaction, TreeError};

/// Which part of a section a point sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionPart {
    /// The header.
    Title,
    /// The body.
    Content,
}

/// The innermost well-formed section around a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionContext {
    /// The section's nodes.
    pub keys: SectionKeys,
    /// The part holding the point, or `None` when the point sits on the container itself.
    pub part: Option<SectionPart>,
    /// The point that was located.
    pub anchor: Point,
}

/// Locate the innermost section around `point`.
///
/// Returns `None` outside any section, and also when the nearest section part has drifted out
/// of shape (the integrity pass repairs it after the next commit).
pub fn locate(tree: &DocumentTree, point: Point) -> Option<SectionContext> {
    let mut chain = std::iter::once(point.key).chain(tree.ancestors(point.key));
    let found = chain.find(|key| {
        tree.is_type(*key, TITLE_TYPE)
            || tree.is_type(*key, CONTENT_TYPE)
            || tree.is_type(*key, CONTAINER_TYPE)
    })?;
    let (container, part) = if tree.is_type(found, TITLE_TYPE) {
        (tree.parent(found)?, Some(SectionPart::Title))
    } else if tree.is_type(found, CONTENT_TYPE) {
        (tree.parent(found)?, Some(SectionPart::Content))
    } else {
        (found, None)
    };
    let keys = section_keys(tree, container)?;
    let in_place = match part {
        Some(SectionPart::Title) => keys.title == found,
        Some(SectionPart::Content) => keys.content == found,
        None => true,
    };
    in_place.then_some(SectionContext {
        keys,
        part,
        anchor: point,
    })
}

/// Locate the section around the anchor of a range selection.
pub fn locate_selection(tree: &DocumentTree, selection: Option<&Selection>) -> Option<SectionContext> {
    let range = selection?.as_range()?;
    locate(tree, range.anchor)
}

/// The container chosen by a whole-node selection of exactly one section.
pub fn selected_container(tree: &DocumentTree, selection: Option<&Selection>) -> Option<NodeKey> {
    let key = selection?.as_node()?.sole()?;
    tree.is_type(key, CONTAINER_TYPE).then_some(key)
}

/// Whether the title holds no text.
pub fn title_is_empty(tree: &DocumentTree, title: NodeKey) -> bool {
    tree.text_content(title).is_empty()
}

/// Whether the content holds exactly one block, an empty paragraph.
pub fn content_is_single_empty_block(tree: &DocumentTree, content: NodeKey) -> bool {
    match tree.children(content) {
        [only] => tree.is_paragraph(*only) && tree.text_content(*only).is_empty(),
        _ => false,
    }
}

/// Delete a whole section.
///
/// The caret moves to the start of the following sibling, else the end of the preceding one,
/// else into a new empty paragraph put where the section was.
pub fn remove_section(tx: &mut Transaction<'_>, container: NodeKey) -> Result<(), TreeError> {
    let parent = tx.parent(container).ok_or(TreeError::Detached(container))?;
    if let Some(next) = tx.next_sibling(container) {
        tx.select_start(next);
    } else if let Some(previous) = tx.previous_sibling(container) {
        tx.select_end(previous);
    } else {
        let paragraph = tx.create_paragraph();
        tx.append(parent, paragraph)?;
        tx.select_start(paragraph);
    }
    tx.remove(container)?;
    tracing::debug!(%container, "section removed");
    Ok(())
}

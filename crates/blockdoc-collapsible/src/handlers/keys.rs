//! Keyboard navigation in and around sections.

use crate::locate::{
    SectionContext, SectionPart, content_is_single_empty_block, locate_selection, remove_section,
    selected_container, title_is_empty,
};
use crate::nodes::{CONTAINER_TYPE, set_open, unwrap_section};
use blockdoc_core::{EditorCommand, NodeKey, Point, Transaction, TreeError};
use tracing::debug;

/// The caret of a collapsed range selection.
fn caret(tx: &Transaction<'_>) -> Option<Point> {
    tx.selection()?.caret_point()
}

/// The section around a collapsed caret.
fn caret_section(tx: &Transaction<'_>) -> Option<SectionContext> {
    caret(tx)?;
    locate_selection(tx, tx.selection())
}

/// The block directly under the nearest root-like ancestor of the caret.
fn caret_block(tx: &Transaction<'_>, point: Point) -> Result<Option<NodeKey>, TreeError> {
    if tx.is_root_like(point.key) {
        return Ok(None);
    }
    tx.top_level_element(point.key).map(Some)
}

fn container_of_selection(tx: &Transaction<'_>) -> Option<NodeKey> {
    selected_container(tx, tx.selection())
}

fn first_block(tx: &Transaction<'_>, part: NodeKey) -> NodeKey {
    tx.first_child(part).unwrap_or(part)
}

/// Delete a section with no text at all; dissolve any other so nothing written is lost.
fn remove_or_unwrap(tx: &mut Transaction<'_>, section: SectionContext) -> Result<(), TreeError> {
    let keys = section.keys;
    if title_is_empty(tx, keys.title) && content_is_single_empty_block(tx, keys.content) {
        remove_section(tx, keys.container)
    } else {
        debug!(container = %keys.container, "non-empty section unwrapped instead of removed");
        unwrap_section(tx, keys.container)
    }
}

pub(super) fn enter(tx: &mut Transaction<'_>, _command: &EditorCommand) -> Result<bool, TreeError> {
    let Some(section) = caret_section(tx) else {
        return Ok(false);
    };
    let keys = section.keys;
    match section.part {
        Some(SectionPart::Title) => {
            set_open(tx, keys.container, true);
            let target = first_block(tx, keys.content);
            tx.select_start(target);
            Ok(true)
        }
        Some(SectionPart::Content) => {
            let Some(block) = caret_block(tx, section.anchor)? else {
                return Ok(false);
            };
            let is_empty_last = tx.is_paragraph(block)
                && tx.text_content(block).trim().is_empty()
                && tx.last_child(keys.content) == Some(block);
            if !is_empty_last {
                return Ok(false);
            }
            let paragraph = tx.create_paragraph();
            tx.insert_after(keys.container, paragraph)?;
            tx.remove(block)?;
            if tx.children(keys.content).is_empty() {
                let placeholder = tx.create_paragraph();
                tx.append(keys.content, placeholder)?;
            }
            tx.select_start(paragraph);
            debug!(container = %keys.container, "left section with enter");
            Ok(true)
        }
        None => Ok(false),
    }
}

pub(super) fn tab(tx: &mut Transaction<'_>, command: &EditorCommand) -> Result<bool, TreeError> {
    let shift = command.modifiers().is_some_and(|modifiers| modifiers.shift);
    let Some(section) = locate_selection(tx, tx.selection()) else {
        return Ok(false);
    };
    match (section.part, shift) {
        (Some(SectionPart::Title), false) => {
            let target = first_block(tx, section.keys.content);
            tx.select_start(target);
            Ok(true)
        }
        (Some(SectionPart::Content), true) => {
            tx.select_end(section.keys.title);
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Right and Down. `escape_right` enables the trailing-paragraph escape at the end of content.
pub(super) fn arrow_forward(tx: &mut Transaction<'_>, escape_right: bool) -> Result<bool, TreeError> {
    if let Some(container) = container_of_selection(tx) {
        match tx.next_sibling(container) {
            Some(next) => tx.select_start(next),
            None => {
                let paragraph = tx.create_paragraph();
                tx.insert_after(container, paragraph)?;
                tx.select_start(paragraph);
            }
        }
        return Ok(true);
    }
    if !escape_right {
        return Ok(false);
    }
    let Some(section) = caret_section(tx) else {
        return Ok(false);
    };
    let keys = section.keys;
    if section.part != Some(SectionPart::Content)
        || !tx.point_is_at_end_of(&section.anchor, keys.content)
        || tx.next_sibling(keys.container).is_some()
    {
        return Ok(false);
    }
    let paragraph = tx.create_paragraph();
    tx.insert_after(keys.container, paragraph)?;
    Ok(true)
}

/// Left and Up.
pub(super) fn arrow_backward(tx: &mut Transaction<'_>) -> Result<bool, TreeError> {
    if let Some(container) = container_of_selection(tx) {
        let content = tx.children(container).get(1).copied().unwrap_or(container);
        tx.select_end(content);
        return Ok(true);
    }
    let Some(point) = caret(tx) else {
        return Ok(false);
    };
    let Some(block) = caret_block(tx, point)? else {
        return Ok(false);
    };
    match tx.previous_sibling(block) {
        Some(previous)
            if tx.is_type(previous, CONTAINER_TYPE) && tx.point_is_at_start_of(&point, block) =>
        {
            tx.select_node(previous);
            Ok(true)
        }
        _ => Ok(false),
    }
}

pub(super) fn backspace(
    tx: &mut Transaction<'_>,
    _command: &EditorCommand,
) -> Result<bool, TreeError> {
    if let Some(container) = container_of_selection(tx) {
        remove_section(tx, container)?;
        return Ok(true);
    }
    let Some(section) = caret_section(tx) else {
        return Ok(false);
    };
    let keys = section.keys;
    match section.part {
        Some(SectionPart::Title)
            if tx.point_is_at_start_of(&section.anchor, keys.title)
                && title_is_empty(tx, keys.title) =>
        {
            remove_or_unwrap(tx, section)?;
            Ok(true)
        }
        Some(SectionPart::Content)
            if tx.point_is_at_start_of(&section.anchor, keys.content)
                && content_is_single_empty_block(tx, keys.content) =>
        {
            remove_or_unwrap(tx, section)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

pub(super) fn delete(tx: &mut Transaction<'_>, _command: &EditorCommand) -> Result<bool, TreeError> {
    if let Some(container) = container_of_selection(tx) {
        remove_section(tx, container)?;
        return Ok(true);
    }
    let Some(point) = caret(tx) else {
        return Ok(false);
    };
    if let Some(section) = caret_section(tx)
        && section.part == Some(SectionPart::Title)
        && tx.point_is_at_end_of(&point, section.keys.title)
        && content_is_single_empty_block(tx, section.keys.content)
    {
        remove_or_unwrap(tx, section)?;
        return Ok(true);
    }
    let Some(block) = caret_block(tx, point)? else {
        return Ok(false);
    };
    match tx.next_sibling(block) {
        Some(next) if tx.is_type(next, CONTAINER_TYPE) && tx.point_is_at_end_of(&point, block) => {
            tx.select_node(next);
            Ok(true)
        }
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::node_types;
    use crate::nodes::{SectionKeys, create_section};
    use blockdoc_core::{Editor, NodeSelection, RangeSelection, Selection};
    use pretty_assertions::assert_eq;

    /// A document holding a single section and nothing after it.
    fn lone_section() -> (Editor, SectionKeys) {
        let mut editor = Editor::builder().register_node_types(node_types()).build();
        let keys = editor.update(|tx| {
            let paragraph = tx.first_child(NodeKey::ROOT).unwrap();
            let keys = create_section(tx, true).unwrap();
            tx.replace(paragraph, keys.container).unwrap();
            keys
        });
        (editor, keys)
    }

    #[test]
    fn test_caret_requires_collapsed_range() {
        let mut editor = Editor::new();
        let paragraph = editor.state().tree.first_child(NodeKey::ROOT).unwrap();
        editor.update(|tx| {
            assert_eq!(caret(tx), None);
            tx.set_cursor(Point::element(paragraph, 0));
            assert_eq!(caret(tx), Some(Point::element(paragraph, 0)));
            tx.set_selection(Some(Selection::Range(RangeSelection {
                anchor: Point::element(paragraph, 0),
                focus: Point::element(NodeKey::ROOT, 1),
            })));
            assert_eq!(caret(tx), None);
        });
    }

    #[test]
    fn test_right_at_end_of_last_section_adds_paragraph_in_place() {
        let (mut editor, keys) = lone_section();
        editor.update(|tx| {
            let body = tx.first_child(keys.content).unwrap();
            tx.set_cursor(Point::element(body, 0));
            assert!(arrow_forward(tx, true).unwrap());

            let blocks = tx.children(NodeKey::ROOT).to_vec();
            assert_eq!(blocks.len(), 2);
            assert_eq!(blocks[0], keys.container);
            assert!(tx.is_paragraph(blocks[1]));
            assert_eq!(caret(tx), Some(Point::element(body, 0)));
        });
    }

    #[test]
    fn test_down_at_end_of_last_section_is_declined() {
        let (mut editor, keys) = lone_section();
        editor.update(|tx| {
            let body = tx.first_child(keys.content).unwrap();
            tx.set_cursor(Point::element(body, 0));
            assert!(!arrow_forward(tx, false).unwrap());
            assert_eq!(tx.children(NodeKey::ROOT), &[keys.container]);
        });
    }

    #[test]
    fn test_forward_from_selected_last_section_creates_paragraph() {
        for escape_right in [true, false] {
            let (mut editor, keys) = lone_section();
            editor.update(|tx| {
                tx.select_node(keys.container);
                assert_eq!(
                    tx.selection(),
                    Some(&Selection::Node(NodeSelection::single(keys.container)))
                );
                assert!(arrow_forward(tx, escape_right).unwrap());

                let blocks = tx.children(NodeKey::ROOT).to_vec();
                assert_eq!(blocks.len(), 2);
                assert!(tx.is_paragraph(blocks[1]));
                assert_eq!(caret(tx), Some(Point::element(blocks[1], 0)));
            });
        }
    }
}

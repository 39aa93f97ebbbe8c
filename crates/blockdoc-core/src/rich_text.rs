//! Built-in rich-text behaviour.
//!
//! These handlers are registered at [`CommandPriority::Editor`](crate::CommandPriority::Editor)
//! and are what a keystroke does when no plugin claims it:
//!
//! - text insertion at the caret (replacing a selection inside one text node)
//! - paragraph split on Enter
//! - grapheme-aware Backspace/Delete, merging blocks at their boundaries and offering the
//!   keystroke to `collapse_at_start` hooks first
//! - grapheme-aware caret movement across the document's paragraphs
//!
//! Range selections spanning several nodes are not edited here; those commands are declined.

use crate::commands::{CommandHandler, CommandKind, EditorCommand};
use crate::error::TreeError;
use crate::node::NodeKey;
use crate::selection::{Point, PointKind, Selection};
use crate::transaction::Transaction;
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

/// Default handlers for every built-in command kind.
pub(crate) fn default_handlers() -> Vec<(CommandKind, CommandHandler)> {
    vec![
        (CommandKind::InsertText, boxed(insert_text)),
        (CommandKind::KeyEnter, boxed(split_block)),
        (CommandKind::KeyBackspace, boxed(delete_backward)),
        (CommandKind::KeyDelete, boxed(delete_forward)),
        (CommandKind::KeyArrowLeft, boxed(|tx, _| move_horizontal(tx, Direction::Backward))),
        (CommandKind::KeyArrowRight, boxed(|tx, _| move_horizontal(tx, Direction::Forward))),
        (CommandKind::KeyArrowUp, boxed(|tx, _| move_vertical(tx, Direction::Backward))),
        (CommandKind::KeyArrowDown, boxed(|tx, _| move_vertical(tx, Direction::Forward))),
    ]
}

fn boxed(
    f: impl Fn(&mut Transaction<'_>, &EditorCommand) -> Result<bool, TreeError> + 'static,
) -> CommandHandler {
    Box::new(move |tx, command| match f(tx, command) {
        Ok(claimed) => claimed,
        Err(err) => {
            debug!(kind = ?command.kind(), %err, "default handler failed");
            false
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Backward,
    Forward,
}

// ---- grapheme helpers ----

fn byte_offset(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map_or(text.len(), |(byte, _)| byte)
}

fn char_offset(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}

/// Char offset of the grapheme boundary before `offset`.
pub(crate) fn previous_grapheme(text: &str, offset: usize) -> usize {
    let byte = byte_offset(text, offset);
    let start = text
        .grapheme_indices(true)
        .map(|(start, _)| start)
        .take_while(|start| *start < byte)
        .last()
        .unwrap_or(0);
    char_offset(text, start)
}

/// Char offset of the grapheme boundary after `offset`.
pub(crate) fn next_grapheme(text: &str, offset: usize) -> usize {
    let byte = byte_offset(text, offset);
    let end = text
        .grapheme_indices(true)
        .map(|(start, grapheme)| start + grapheme.len())
        .find(|end| *end > byte)
        .unwrap_or(text.len());
    char_offset(text, end)
}

fn splice_chars(text: &str, start: usize, end: usize, insert: &str) -> String {
    let mut out: String = text.chars().take(start).collect();
    out.push_str(insert);
    out.extend(text.chars().skip(end));
    out
}

fn text_of(tx: &Transaction<'_>, key: NodeKey) -> String {
    tx.get(key)
        .and_then(|node| node.text())
        .unwrap_or_default()
        .to_string()
}

/// Replace chars `start..end` of a text node, keeping the caret at `start + insert.len()`.
/// An emptied text node is removed and the caret becomes an element point in its parent.
fn edit_text(
    tx: &mut Transaction<'_>,
    key: NodeKey,
    start: usize,
    end: usize,
    insert: &str,
) -> Result<(), TreeError> {
    let updated = splice_chars(&text_of(tx, key), start, end, insert);
    if updated.is_empty() {
        let parent = tx.parent(key).ok_or(TreeError::Detached(key))?;
        let index = tx.index_in_parent(key).ok_or(TreeError::Detached(key))?;
        tx.remove(key)?;
        tx.set_cursor(Point::element(parent, index));
    } else {
        tx.set_text(key, updated)?;
        tx.set_cursor(Point::text(key, start + insert.chars().count()));
    }
    Ok(())
}

/// Resolve an element point inside a paragraph onto an adjacent text node.
fn normalize_point(tx: &Transaction<'_>, point: Point, direction: Direction) -> Point {
    if point.kind == PointKind::Text || !tx.is_paragraph(point.key) {
        return point;
    }
    let children = tx.children(point.key);
    let before = point.offset.checked_sub(1).and_then(|i| children.get(i));
    let after = children.get(point.offset);
    match (direction, before, after) {
        (Direction::Backward, Some(prev), _) | (Direction::Forward, Some(prev), None) => {
            tx.end_point(*prev)
        }
        (_, _, Some(next)) => tx.start_point(*next),
        _ => point,
    }
}

/// Delete the text inside a range selection confined to one text node. Returns `false` for
/// collapsed or multi-node ranges.
fn delete_selected_text(tx: &mut Transaction<'_>) -> Result<bool, TreeError> {
    let Some(Selection::Range(range)) = tx.selection().cloned() else {
        return Ok(false);
    };
    if range.is_collapsed() {
        return Ok(false);
    }
    let Some((start, end)) = range.ordered_in_text() else {
        debug!(?range, "multi-node range deletion is not supported");
        return Ok(false);
    };
    edit_text(tx, start.key, start.offset, end.offset, "")?;
    Ok(true)
}

/// Remove every node of a node selection; the caret lands next to where they were.
fn delete_selected_nodes(tx: &mut Transaction<'_>) -> Result<bool, TreeError> {
    let Some(Selection::Node(nodes)) = tx.selection().cloned() else {
        return Ok(false);
    };
    let keys: Vec<NodeKey> = nodes.keys().filter(|key| tx.contains(*key)).collect();
    let Some(first) = keys.first().copied() else {
        return Ok(false);
    };
    let parent = tx.parent(first).ok_or(TreeError::Detached(first))?;
    let previous = tx.previous_sibling(first).filter(|key| !keys.contains(key));
    let next = keys
        .last()
        .and_then(|last| tx.next_sibling(*last))
        .filter(|key| !keys.contains(key));
    for key in &keys {
        tx.remove(*key)?;
    }
    if let Some(next) = next {
        tx.select_start(next);
    } else if let Some(previous) = previous {
        tx.select_end(previous);
    } else {
        let paragraph = tx.create_paragraph();
        tx.append(parent, paragraph)?;
        tx.select_start(paragraph);
    }
    Ok(true)
}

// ---- handlers ----

fn insert_text(tx: &mut Transaction<'_>, command: &EditorCommand) -> Result<bool, TreeError> {
    let EditorCommand::InsertText(text) = command else {
        return Ok(false);
    };
    if text.is_empty() {
        return Ok(false);
    }
    let Some(range) = tx.selection().and_then(Selection::as_range).copied() else {
        return Ok(false);
    };
    let point = if range.is_collapsed() {
        range.anchor
    } else {
        let Some((start, end)) = range.ordered_in_text() else {
            debug!(?range, "multi-node range replacement is not supported");
            return Ok(false);
        };
        edit_text(tx, start.key, start.offset, end.offset, "")?;
        match tx.selection().and_then(Selection::caret_point) {
            Some(point) => point,
            None => return Ok(true),
        }
    };
    let point = normalize_point(tx, point, Direction::Backward);

    match point.kind {
        PointKind::Text => {
            edit_text(tx, point.key, point.offset, point.offset, text)?;
        }
        PointKind::Element if tx.is_paragraph(point.key) => {
            let text_key = tx.create_text(text.as_str());
            tx.insert_at(point.key, point.offset, text_key)?;
            tx.select_end(text_key);
        }
        PointKind::Element => {
            let paragraph = tx.create_paragraph_with_text(text);
            tx.insert_at(point.key, point.offset, paragraph)?;
            tx.select_end(paragraph);
        }
    }
    Ok(true)
}

fn split_block(tx: &mut Transaction<'_>, _command: &EditorCommand) -> Result<bool, TreeError> {
    if tx.selection().is_some_and(|s| s.as_node().is_some()) {
        return Ok(false);
    }
    delete_selected_text(tx)?;
    let Some(point) = tx.selection().and_then(Selection::caret_point) else {
        return Ok(false);
    };
    if tx.enclosing_paragraph(point.key).is_some() {
        let tail = tx.split_paragraph_at(point)?;
        tx.select_start(tail);
        return Ok(true);
    }
    if point.kind == PointKind::Element && !tx.is_text(point.key) {
        let paragraph = tx.create_paragraph();
        tx.insert_at(point.key, point.offset, paragraph)?;
        tx.select_start(paragraph);
        return Ok(true);
    }
    Ok(false)
}

/// Offer a Backspace at the start of `start` to `collapse_at_start` hooks, walking upward while
/// the node is the first child, up to the nearest root-like node.
fn collapse_at_start(tx: &mut Transaction<'_>, start: NodeKey) -> bool {
    let registry = tx.registry();
    let mut current = Some(start);
    while let Some(node) = current {
        if !tx.is_text(node) {
            let hook = tx
                .type_name(node)
                .and_then(|name| registry.collapse_hook(name));
            if let Some(hook) = hook
                && hook(tx, node)
            {
                debug!(%node, "backspace claimed by collapse_at_start hook");
                return true;
            }
            if tx.is_root_like(node) {
                break;
            }
        }
        if tx.previous_sibling(node).is_some() {
            break;
        }
        current = tx.parent(node);
    }
    false
}

/// Move `from`'s children to the end of `into`, joining touching text runs, then remove `from`.
/// Returns the caret position at the seam.
fn merge_blocks(
    tx: &mut Transaction<'_>,
    into: NodeKey,
    from: NodeKey,
) -> Result<Point, TreeError> {
    let seam = tx.end_point(into);
    let moving = tx.children(from).to_vec();
    for child in moving {
        tx.append(into, child)?;
    }
    tx.remove(from)?;
    if seam.kind == PointKind::Text
        && let Some(next) = tx.next_sibling(seam.key)
        && tx.is_text(next)
    {
        let joined = format!("{}{}", text_of(tx, seam.key), text_of(tx, next));
        tx.set_text(seam.key, joined)?;
        tx.remove(next)?;
    }
    Ok(seam)
}

fn last_paragraph_in(tx: &Transaction<'_>, key: NodeKey) -> Option<NodeKey> {
    if tx.is_paragraph(key) {
        return Some(key);
    }
    tx.descendants(key)
        .into_iter()
        .rev()
        .find(|candidate| tx.is_paragraph(*candidate))
}

fn first_paragraph_in(tx: &Transaction<'_>, key: NodeKey) -> Option<NodeKey> {
    if tx.is_paragraph(key) {
        return Some(key);
    }
    tx.descendants(key)
        .into_iter()
        .find(|candidate| tx.is_paragraph(*candidate))
}

fn delete_backward(tx: &mut Transaction<'_>, _command: &EditorCommand) -> Result<bool, TreeError> {
    if delete_selected_nodes(tx)? || delete_selected_text(tx)? {
        return Ok(true);
    }
    let Some(point) = tx.selection().and_then(Selection::caret_point) else {
        return Ok(false);
    };
    let point = normalize_point(tx, point, Direction::Backward);

    if point.kind == PointKind::Text && point.offset > 0 {
        let text = text_of(tx, point.key);
        let start = previous_grapheme(&text, point.offset);
        edit_text(tx, point.key, start, point.offset, "")?;
        return Ok(true);
    }
    if point.kind == PointKind::Text
        && let Some(previous) = tx.previous_sibling(point.key)
        && tx.is_text(previous)
    {
        let text = text_of(tx, previous);
        let end = text.chars().count();
        let start = previous_grapheme(&text, end);
        edit_text(tx, previous, start, end, "")?;
        return Ok(true);
    }

    if collapse_at_start(tx, point.key) {
        return Ok(true);
    }

    let Some(paragraph) = tx.enclosing_paragraph(point.key) else {
        return Ok(false);
    };
    if !tx.point_is_at_start_of(&point, paragraph) {
        return Ok(false);
    }
    let Some(previous) = tx.previous_sibling(paragraph) else {
        return Ok(false);
    };
    let Some(target) = last_paragraph_in(tx, previous) else {
        return Ok(false);
    };
    if target == previous && tx.text_content(previous).is_empty() {
        tx.remove(previous)?;
        return Ok(true);
    }
    if tx.text_content(paragraph).is_empty() {
        tx.remove(paragraph)?;
        tx.select_end(target);
        return Ok(true);
    }
    let seam = merge_blocks(tx, target, paragraph)?;
    tx.set_cursor(seam);
    Ok(true)
}

fn delete_forward(tx: &mut Transaction<'_>, _command: &EditorCommand) -> Result<bool, TreeError> {
    if delete_selected_nodes(tx)? || delete_selected_text(tx)? {
        return Ok(true);
    }
    let Some(point) = tx.selection().and_then(Selection::caret_point) else {
        return Ok(false);
    };
    let point = normalize_point(tx, point, Direction::Forward);

    if point.kind == PointKind::Text {
        let text = text_of(tx, point.key);
        if point.offset < text.chars().count() {
            let end = next_grapheme(&text, point.offset);
            edit_text(tx, point.key, point.offset, end, "")?;
            return Ok(true);
        }
        if let Some(next) = tx.next_sibling(point.key)
            && tx.is_text(next)
        {
            let next_text = text_of(tx, next);
            let end = next_grapheme(&next_text, 0);
            edit_text(tx, next, 0, end, "")?;
            tx.set_cursor(point);
            return Ok(true);
        }
    }

    let Some(paragraph) = tx.enclosing_paragraph(point.key) else {
        return Ok(false);
    };
    if !tx.point_is_at_end_of(&point, paragraph) {
        return Ok(false);
    }
    let Some(next) = tx.next_sibling(paragraph) else {
        return Ok(false);
    };
    let Some(source) = first_paragraph_in(tx, next) else {
        return Ok(false);
    };
    if tx.text_content(source).is_empty() {
        tx.remove(source)?;
        return Ok(true);
    }
    let seam = merge_blocks(tx, paragraph, source)?;
    tx.set_cursor(seam);
    Ok(true)
}

fn move_horizontal(tx: &mut Transaction<'_>, direction: Direction) -> Result<bool, TreeError> {
    let Some(selection) = tx.selection().cloned() else {
        return Ok(false);
    };
    let range = match selection {
        Selection::Node(nodes) => {
            let keys: Vec<NodeKey> = nodes.keys().collect();
            let (Some(first), Some(last)) = (keys.first().copied(), keys.last().copied()) else {
                return Ok(false);
            };
            match direction {
                Direction::Backward => match tx.previous_sibling(first) {
                    Some(previous) => tx.select_end(previous),
                    None => tx.select_start(first),
                },
                Direction::Forward => match tx.next_sibling(last) {
                    Some(next) => tx.select_start(next),
                    None => tx.select_end(last),
                },
            }
            return Ok(true);
        }
        Selection::Range(range) => range,
    };
    if !range.is_collapsed() {
        let target = match (range.ordered_in_text(), direction) {
            (Some((start, _)), Direction::Backward) => start,
            (Some((_, end)), Direction::Forward) => end,
            (None, _) => range.focus,
        };
        tx.set_cursor(target);
        return Ok(true);
    }

    let point = normalize_point(tx, range.anchor, direction);
    if point.kind == PointKind::Text {
        let text = text_of(tx, point.key);
        let len = text.chars().count();
        match direction {
            Direction::Backward if point.offset > 0 => {
                tx.set_cursor(Point::text(point.key, previous_grapheme(&text, point.offset)));
                return Ok(true);
            }
            Direction::Forward if point.offset < len => {
                tx.set_cursor(Point::text(point.key, next_grapheme(&text, point.offset)));
                return Ok(true);
            }
            _ => {}
        }
        let sibling = match direction {
            Direction::Backward => tx.previous_sibling(point.key),
            Direction::Forward => tx.next_sibling(point.key),
        };
        if let Some(sibling) = sibling.filter(|key| tx.is_text(*key)) {
            let text = text_of(tx, sibling);
            let offset = match direction {
                Direction::Backward => previous_grapheme(&text, text.chars().count()),
                Direction::Forward => next_grapheme(&text, 0),
            };
            tx.set_cursor(Point::text(sibling, offset));
            return Ok(true);
        }
    }
    Ok(step_block(tx, point, direction))
}

fn move_vertical(tx: &mut Transaction<'_>, direction: Direction) -> Result<bool, TreeError> {
    let Some(selection) = tx.selection().cloned() else {
        return Ok(false);
    };
    match selection {
        Selection::Node(_) => move_horizontal(tx, direction),
        Selection::Range(range) => Ok(step_block(tx, range.focus, direction)),
    }
}

/// Move the caret into the neighbouring paragraph (end of the previous one, start of the next).
fn step_block(tx: &mut Transaction<'_>, point: Point, direction: Direction) -> bool {
    let blocks = tx.leaf_blocks();
    let neighbour = match tx.enclosing_paragraph(point.key) {
        Some(paragraph) => {
            let Some(index) = blocks.iter().position(|key| *key == paragraph) else {
                return false;
            };
            let neighbour = match direction {
                Direction::Backward => index.checked_sub(1).and_then(|i| blocks.get(i)),
                Direction::Forward => blocks.get(index + 1),
            };
            neighbour.copied()
        }
        None if point.kind == PointKind::Element => {
            let children = tx.children(point.key);
            match direction {
                Direction::Backward => point
                    .offset
                    .checked_sub(1)
                    .and_then(|i| children.get(i))
                    .and_then(|key| last_paragraph_in(tx, *key)),
                Direction::Forward => children
                    .get(point.offset)
                    .and_then(|key| first_paragraph_in(tx, *key)),
            }
        }
        None => None,
    };
    match (neighbour, direction) {
        (Some(block), Direction::Backward) => {
            tx.select_end(block);
            true
        }
        (Some(block), Direction::Forward) => {
            tx.select_start(block);
            true
        }
        (None, _) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grapheme_boundaries() {
        let text = "ae\u{301}z";
        assert_eq!(previous_grapheme(text, 3), 1);
        assert_eq!(next_grapheme(text, 1), 3);
        assert_eq!(next_grapheme(text, 3), 4);
        assert_eq!(previous_grapheme(text, 0), 0);
    }

    #[test]
    fn test_splice_chars() {
        assert_eq!(splice_chars("héllo", 1, 3, "E"), "hElo");
        assert_eq!(splice_chars("abc", 3, 3, "d"), "abcd");
    }
}

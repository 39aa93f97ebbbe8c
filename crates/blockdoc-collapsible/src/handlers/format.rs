//! Creating and toggling sections: the insert and toggle commands, click-to-toggle, and the
//! typed auto-format trigger.

use crate::config::SectionsConfig;
use crate::convert::{DETAILS_BLOCK_CLASS, DETAILS_TITLE_CLASS};
use crate::nodes::{CONTAINER_TYPE, CONTAINER_KEY_ATTR, SectionKeys, create_section, toggle_open};
use blockdoc_core::{
    CommandId, CommandPayload, EditorCommand, NodeKey, Selection, Transaction, TreeError,
};
use tracing::debug;

/// Insert a new open section at the selection. Carries no payload.
pub const INSERT_COLLAPSIBLE_SECTION: CommandId = CommandId("INSERT_COLLAPSIBLE_SECTION_COMMAND");

/// Toggle the section named by a [`CommandPayload::Node`] payload.
pub const TOGGLE_COLLAPSIBLE_SECTION: CommandId = CommandId("TOGGLE_COLLAPSIBLE_SECTION_COMMAND");

fn select_title(tx: &mut Transaction<'_>, keys: SectionKeys) {
    let target = tx.first_child(keys.title).unwrap_or(keys.title);
    tx.select_start(target);
}

pub(super) fn insert_section(
    tx: &mut Transaction<'_>,
    _command: &EditorCommand,
) -> Result<bool, TreeError> {
    let keys = create_section(tx, true)?;
    tx.insert_block_node(keys.container)?;
    select_title(tx, keys);
    debug!(container = %keys.container, "section inserted");
    Ok(true)
}

pub(super) fn toggle_section(
    tx: &mut Transaction<'_>,
    command: &EditorCommand,
) -> Result<bool, TreeError> {
    let EditorCommand::Custom {
        payload: CommandPayload::Node(key),
        ..
    } = command
    else {
        return Ok(false);
    };
    Ok(toggle_open(tx, *key))
}

/// Toggle a section when its title bar is clicked inside the gutter.
pub(super) fn click_toggle(
    tx: &mut Transaction<'_>,
    command: &EditorCommand,
    config: &SectionsConfig,
) -> Result<bool, TreeError> {
    let EditorCommand::Click(click) = command else {
        return Ok(false);
    };
    let on_title_bar = click
        .target()
        .is_some_and(|target| target.has_class(DETAILS_TITLE_CLASS));
    if !on_title_bar || click.has_text_selection || !config.in_gutter(click.offset_x) {
        return Ok(false);
    }
    let Some(key) = click
        .closest(DETAILS_BLOCK_CLASS)
        .and_then(|container| container.attr(CONTAINER_KEY_ATTR))
        .and_then(NodeKey::parse)
    else {
        return Ok(false);
    };
    Ok(toggle_open(tx, key))
}

/// Turn a paragraph holding only a trigger token into a new section.
pub(super) fn autoformat(
    tx: &mut Transaction<'_>,
    text: NodeKey,
    config: &SectionsConfig,
) -> Result<(), TreeError> {
    let Some(content) = tx.get(text).and_then(|node| node.text()) else {
        return Ok(());
    };
    if !config.is_trigger(content) {
        return Ok(());
    }
    let Some(paragraph) = tx.parent(text) else {
        return Ok(());
    };
    if !tx.is_paragraph(paragraph) || tx.children(paragraph) != [text].as_slice() {
        return Ok(());
    }
    // Only a typed token converts; imported text has no caret.
    let caret_in_paragraph = tx
        .selection()
        .and_then(Selection::caret_point)
        .is_some_and(|point| tx.enclosing_paragraph(point.key) == Some(paragraph));
    if !caret_in_paragraph {
        return Ok(());
    }
    if tx
        .ancestors(paragraph)
        .any(|ancestor| tx.is_type(ancestor, CONTAINER_TYPE))
    {
        return Ok(());
    }

    let keys = create_section(tx, true)?;
    tx.replace(paragraph, keys.container)?;
    select_title(tx, keys);
    debug!(container = %keys.container, "section created from trigger");
    Ok(())
}

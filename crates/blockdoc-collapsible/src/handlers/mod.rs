//! Command handlers for sections.
//!
//! Every handler is registered at [`CommandPriority::Low`], so it runs before the built-in
//! rich-text behaviour and after anything a host registers at a higher priority. A handler
//! either claims the command (`true`) or declines without writing, letting the next handler
//! run. Traversal failures are logged and treated as a decline.

mod format;
mod keys;

pub use format::{INSERT_COLLAPSIBLE_SECTION, TOGGLE_COLLAPSIBLE_SECTION};

use crate::config::SectionsConfig;
use blockdoc_core::{
    CommandKind, CommandPriority, Editor, EditorCommand, Registration, TEXT_TYPE, Transaction,
    TreeError,
};
use std::rc::Rc;
use tracing::debug;

/// Wrap a fallible handler into a command handler that declines on error.
fn claim(
    name: &'static str,
    f: impl Fn(&mut Transaction<'_>, &EditorCommand) -> Result<bool, TreeError> + 'static,
) -> impl FnMut(&mut Transaction<'_>, &EditorCommand) -> bool + 'static {
    move |tx, command| match f(tx, command) {
        Ok(claimed) => claimed,
        Err(err) => {
            debug!(handler = name, %err, "section handler declined");
            false
        }
    }
}

/// Register every section command handler and the auto-format transform.
pub(crate) fn register_handlers(editor: &mut Editor, config: &Rc<SectionsConfig>) -> Vec<Registration> {
    let low = CommandPriority::Low;
    let mut registrations = vec![
        editor.register_command(
            CommandKind::Custom(INSERT_COLLAPSIBLE_SECTION),
            low,
            claim("insert", format::insert_section),
        ),
        editor.register_command(
            CommandKind::Custom(TOGGLE_COLLAPSIBLE_SECTION),
            low,
            claim("toggle", format::toggle_section),
        ),
        editor.register_command(CommandKind::KeyEnter, low, claim("enter", keys::enter)),
        editor.register_command(CommandKind::KeyTab, low, claim("tab", keys::tab)),
        editor.register_command(
            CommandKind::KeyArrowRight,
            low,
            claim("arrow-right", |tx, _| keys::arrow_forward(tx, true)),
        ),
        editor.register_command(
            CommandKind::KeyArrowDown,
            low,
            claim("arrow-down", |tx, _| keys::arrow_forward(tx, false)),
        ),
        editor.register_command(
            CommandKind::KeyArrowLeft,
            low,
            claim("arrow-left", |tx, _| keys::arrow_backward(tx)),
        ),
        editor.register_command(
            CommandKind::KeyArrowUp,
            low,
            claim("arrow-up", |tx, _| keys::arrow_backward(tx)),
        ),
        editor.register_command(
            CommandKind::KeyBackspace,
            low,
            claim("backspace", keys::backspace),
        ),
        editor.register_command(CommandKind::KeyDelete, low, claim("delete", keys::delete)),
    ];

    let click_config = Rc::clone(config);
    registrations.push(editor.register_command(
        CommandKind::Click,
        low,
        claim("click", move |tx, command| {
            format::click_toggle(tx, command, &click_config)
        }),
    ));

    let format_config = Rc::clone(config);
    registrations.push(editor.register_node_transform(TEXT_TYPE, move |tx, key| {
        if let Err(err) = format::autoformat(tx, key, &format_config) {
            debug!(%key, %err, "auto-format skipped");
        }
    }));
    registrations
}

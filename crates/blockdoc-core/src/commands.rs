//! Command interface
//!
//! Input reaches the editor as [`EditorCommand`]s. Each command is routed through a
//! priority-ordered list of handlers registered for its [`CommandKind`]: handlers run from the
//! highest [`CommandPriority`] down (registration order within a priority), and the first one
//! that returns `true` claims the command. The built-in rich-text behaviour is registered at
//! [`CommandPriority::Editor`], so any plugin handler runs before it.
//!
//! # Example
//!
//! ```rust
//! use blockdoc_core::{CommandKind, CommandPriority, Editor, EditorCommand, KeyModifiers};
//!
//! let mut editor = Editor::new();
//! let handle = editor.register_command(CommandKind::KeyTab, CommandPriority::Low, |_tx, _cmd| true);
//! assert!(editor.dispatch(EditorCommand::KeyTab(KeyModifiers::NONE)));
//! editor.unregister(handle);
//! assert!(!editor.dispatch(EditorCommand::KeyTab(KeyModifiers::NONE)));
//! ```

use crate::markup::Element;
use crate::node::NodeKey;
use crate::transaction::Transaction;
use std::collections::BTreeMap;
use std::fmt;

/// Name of a plugin-defined command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommandId(pub &'static str);

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Argument of a [`EditorCommand::Custom`] command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CommandPayload {
    /// No argument.
    #[default]
    None,
    /// A node key.
    Node(NodeKey),
    /// Free text.
    Text(String),
}

/// Modifier keys held during a key command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyModifiers {
    /// Shift
    pub shift: bool,
    /// Alt / Option
    pub alt: bool,
    /// Control
    pub ctrl: bool,
    /// Meta / Command
    pub meta: bool,
}

impl KeyModifiers {
    /// No modifiers.
    pub const NONE: Self = Self {
        shift: false,
        alt: false,
        ctrl: false,
        meta: false,
    };

    /// Shift only.
    pub const SHIFT: Self = Self {
        shift: true,
        alt: false,
        ctrl: false,
        meta: false,
    };
}

/// A pointer click, described by the element path under the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickEvent {
    /// Clicked element first, then its ancestors outward.
    pub path: Vec<Element>,
    /// Horizontal offset of the pointer from the clicked element's left edge, in pixels.
    pub offset_x: f64,
    /// Whether a non-collapsed text selection exists at click time.
    pub has_text_selection: bool,
}

impl ClickEvent {
    /// The clicked element.
    pub fn target(&self) -> Option<&Element> {
        self.path.first()
    }

    /// The nearest element on the path (target included) carrying `class`.
    pub fn closest(&self, class: &str) -> Option<&Element> {
        self.path.iter().find(|element| element.has_class(class))
    }
}

/// An input command.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorCommand {
    /// Insert text at the selection.
    InsertText(String),
    /// Enter / Return.
    KeyEnter(KeyModifiers),
    /// Tab.
    KeyTab(KeyModifiers),
    /// Left arrow.
    KeyArrowLeft(KeyModifiers),
    /// Right arrow.
    KeyArrowRight(KeyModifiers),
    /// Up arrow.
    KeyArrowUp(KeyModifiers),
    /// Down arrow.
    KeyArrowDown(KeyModifiers),
    /// Backspace.
    KeyBackspace(KeyModifiers),
    /// Forward delete.
    KeyDelete(KeyModifiers),
    /// A pointer click.
    Click(ClickEvent),
    /// A plugin-defined command.
    Custom {
        /// Command name.
        id: CommandId,
        /// Argument.
        payload: CommandPayload,
    },
}

impl EditorCommand {
    /// A custom command.
    pub fn custom(id: CommandId, payload: CommandPayload) -> Self {
        EditorCommand::Custom { id, payload }
    }

    /// Routing key.
    pub fn kind(&self) -> CommandKind {
        match self {
            EditorCommand::InsertText(_) => CommandKind::InsertText,
            EditorCommand::KeyEnter(_) => CommandKind::KeyEnter,
            EditorCommand::KeyTab(_) => CommandKind::KeyTab,
            EditorCommand::KeyArrowLeft(_) => CommandKind::KeyArrowLeft,
            EditorCommand::KeyArrowRight(_) => CommandKind::KeyArrowRight,
            EditorCommand::KeyArrowUp(_) => CommandKind::KeyArrowUp,
            EditorCommand::KeyArrowDown(_) => CommandKind::KeyArrowDown,
            EditorCommand::KeyBackspace(_) => CommandKind::KeyBackspace,
            EditorCommand::KeyDelete(_) => CommandKind::KeyDelete,
            EditorCommand::Click(_) => CommandKind::Click,
            EditorCommand::Custom { id, .. } => CommandKind::Custom(*id),
        }
    }

    /// Modifiers of a key command.
    pub fn modifiers(&self) -> Option<KeyModifiers> {
        match self {
            EditorCommand::KeyEnter(m)
            | EditorCommand::KeyTab(m)
            | EditorCommand::KeyArrowLeft(m)
            | EditorCommand::KeyArrowRight(m)
            | EditorCommand::KeyArrowUp(m)
            | EditorCommand::KeyArrowDown(m)
            | EditorCommand::KeyBackspace(m)
            | EditorCommand::KeyDelete(m) => Some(*m),
            _ => None,
        }
    }
}

/// Routing key of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommandKind {
    /// [`EditorCommand::InsertText`]
    InsertText,
    /// [`EditorCommand::KeyEnter`]
    KeyEnter,
    /// [`EditorCommand::KeyTab`]
    KeyTab,
    /// [`EditorCommand::KeyArrowLeft`]
    KeyArrowLeft,
    /// [`EditorCommand::KeyArrowRight`]
    KeyArrowRight,
    /// [`EditorCommand::KeyArrowUp`]
    KeyArrowUp,
    /// [`EditorCommand::KeyArrowDown`]
    KeyArrowDown,
    /// [`EditorCommand::KeyBackspace`]
    KeyBackspace,
    /// [`EditorCommand::KeyDelete`]
    KeyDelete,
    /// [`EditorCommand::Click`]
    Click,
    /// [`EditorCommand::Custom`]
    Custom(CommandId),
}

/// Handler priority. Higher runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommandPriority {
    /// Built-in editor behaviour.
    Editor,
    /// Plugin behaviour that should still yield to everything else.
    Low,
    /// Default plugin priority.
    Normal,
    /// Overrides.
    High,
    /// Must run first.
    Critical,
}

/// Handle returned by every `register_*` call, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Registration(pub(crate) u64);

/// A command handler. Returns `true` to claim the command.
pub type CommandHandler = Box<dyn FnMut(&mut Transaction<'_>, &EditorCommand) -> bool>;

struct HandlerEntry {
    id: Registration,
    priority: CommandPriority,
    handler: CommandHandler,
}

#[derive(Default)]
pub(crate) struct CommandBus {
    handlers: BTreeMap<CommandKind, Vec<HandlerEntry>>,
}

impl fmt::Debug for CommandBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: BTreeMap<&CommandKind, usize> = self
            .handlers
            .iter()
            .map(|(kind, entries)| (kind, entries.len()))
            .collect();
        f.debug_struct("CommandBus")
            .field("handlers", &counts)
            .finish()
    }
}

impl CommandBus {
    pub(crate) fn register(
        &mut self,
        kind: CommandKind,
        priority: CommandPriority,
        id: Registration,
        handler: CommandHandler,
    ) {
        let entries = self.handlers.entry(kind).or_default();
        let position = entries
            .iter()
            .position(|entry| entry.priority < priority)
            .unwrap_or(entries.len());
        entries.insert(
            position,
            HandlerEntry {
                id,
                priority,
                handler,
            },
        );
    }

    pub(crate) fn unregister(&mut self, id: Registration) -> bool {
        let mut found = false;
        for entries in self.handlers.values_mut() {
            let before = entries.len();
            entries.retain(|entry| entry.id != id);
            found |= entries.len() != before;
        }
        found
    }

    pub(crate) fn handler_count(&self, kind: CommandKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Run handlers for the command until one claims it.
    pub(crate) fn dispatch(&mut self, tx: &mut Transaction<'_>, command: &EditorCommand) -> bool {
        let kind = command.kind();
        let Some(entries) = self.handlers.get_mut(&kind) else {
            return false;
        };
        for entry in entries.iter_mut() {
            if (entry.handler)(tx, command) {
                tracing::trace!(?kind, priority = ?entry.priority, "command claimed");
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::NodeRegistry;
    use crate::tree::DocumentTree;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording(
        log: &Rc<RefCell<Vec<&'static str>>>,
        name: &'static str,
        claim: bool,
    ) -> CommandHandler {
        let log = log.clone();
        Box::new(move |_tx, _cmd| {
            log.borrow_mut().push(name);
            claim
        })
    }

    #[test]
    fn test_priority_order_and_short_circuit() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = CommandBus::default();
        let kind = CommandKind::KeyEnter;
        bus.register(kind, CommandPriority::Editor, Registration(1), recording(&log, "editor", true));
        bus.register(kind, CommandPriority::Low, Registration(2), recording(&log, "low-a", false));
        bus.register(kind, CommandPriority::High, Registration(3), recording(&log, "high", false));
        bus.register(kind, CommandPriority::Low, Registration(4), recording(&log, "low-b", true));

        let registry = NodeRegistry::default();
        let mut tx = Transaction::new(DocumentTree::new(), None, &registry);
        assert!(bus.dispatch(&mut tx, &EditorCommand::KeyEnter(KeyModifiers::NONE)));
        assert_eq!(*log.borrow(), vec!["high", "low-a", "low-b"]);

        assert!(bus.unregister(Registration(4)));
        log.borrow_mut().clear();
        assert!(bus.dispatch(&mut tx, &EditorCommand::KeyEnter(KeyModifiers::NONE)));
        assert_eq!(*log.borrow(), vec!["high", "low-a", "editor"]);
        assert_eq!(bus.handler_count(kind), 3);
    }

    #[test]
    fn test_custom_commands_route_by_id() {
        let a = CommandId("a");
        let command = EditorCommand::custom(a, CommandPayload::Node(NodeKey::ROOT));
        assert_eq!(command.kind(), CommandKind::Custom(a));
        assert_ne!(command.kind(), CommandKind::Custom(CommandId("b")));
        assert_eq!(command.modifiers(), None);
    }

    #[test]
    fn test_click_closest() {
        let title = Element::new("div").with_class("detailsBlockTitle");
        let container = Element::new("div").with_class("detailsBlock");
        let click = ClickEvent {
            path: vec![title.clone(), container.clone()],
            offset_x: 4.0,
            has_text_selection: false,
        };
        assert_eq!(click.target(), Some(&title));
        assert_eq!(click.closest("detailsBlock"), Some(&container));
        assert_eq!(click.closest("missing"), None);
    }
}

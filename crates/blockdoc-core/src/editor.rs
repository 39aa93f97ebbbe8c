//! The editor: committed state, the update pipeline, and plugin registration.
//!
//! Every change goes through the same pipeline:
//!
//! 1. a [`Transaction`] is opened on the committed state ([`Editor::update`],
//!    [`Editor::try_update`], or [`Editor::dispatch`]);
//! 2. node transforms run on the dirty nodes of their type until nothing new is dirtied;
//! 3. the result is committed and recorded in history;
//! 4. normalizers run as follow-up transactions over the accumulated dirty set, merged into
//!    the same commit and history entry, until a pass writes nothing;
//! 5. update listeners are notified once with the settled state.

use crate::commands::{
    CommandBus, CommandHandler, CommandKind, CommandPriority, EditorCommand, Registration,
};
use crate::error::EditorError;
use crate::history::History;
use crate::markup::{self, Element};
use crate::node::NodeKey;
use crate::registry::{NodeRegistry, NodeTypeSpec};
use crate::rich_text;
use crate::state::{EditorState, UpdateOrigin, UpdatePayload, diff_mutations, diff_trees};
use crate::transaction::{Transaction, TransactionOutcome};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Editor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Maximum number of undo entries kept.
    pub history_limit: usize,
    /// Upper bound on node transform passes per transaction.
    pub max_transform_passes: usize,
    /// Upper bound on normalizer passes per commit.
    pub max_normalize_passes: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: 1000,
            max_transform_passes: 8,
            max_normalize_passes: 8,
        }
    }
}

/// A node transform: runs on a dirty node of its registered type before commit.
pub type NodeTransform = Box<dyn FnMut(&mut Transaction<'_>, NodeKey)>;

/// A normalizer: runs after commit over every key dirtied by the commit so far.
pub type Normalizer = Box<dyn FnMut(&mut Transaction<'_>, &HashSet<NodeKey>)>;

/// An update listener.
pub type UpdateListener = Box<dyn FnMut(&UpdatePayload)>;

struct TransformEntry {
    id: Registration,
    node_type: &'static str,
    transform: NodeTransform,
}

/// Builds an [`Editor`] with its node types.
#[derive(Debug, Default)]
pub struct EditorBuilder {
    config: EditorConfig,
    registry: NodeRegistry,
}

impl EditorBuilder {
    /// A builder with default config and the built-in node types.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the configuration.
    pub fn config(mut self, config: EditorConfig) -> Self {
        self.config = config;
        self
    }

    /// Register an element type.
    pub fn register_node_type(mut self, spec: NodeTypeSpec) -> Self {
        self.registry.register(spec);
        self
    }

    /// Register several element types.
    pub fn register_node_types(mut self, specs: impl IntoIterator<Item = NodeTypeSpec>) -> Self {
        for spec in specs {
            self.registry.register(spec);
        }
        self
    }

    /// Build the editor, holding one empty paragraph and no selection.
    pub fn build(self) -> Editor {
        let mut editor = Editor {
            history: History::new(self.config.history_limit),
            config: self.config,
            registry: self.registry,
            state: Arc::new(EditorState::default()),
            commands: CommandBus::default(),
            transforms: Vec::new(),
            normalizers: Vec::new(),
            listeners: Vec::new(),
            next_registration: 0,
            version: 0,
        };
        for (kind, handler) in rich_text::default_handlers() {
            let id = editor.next_id();
            editor
                .commands
                .register(kind, CommandPriority::Editor, id, handler);
        }
        editor
    }
}

/// A headless block-tree editor.
pub struct Editor {
    config: EditorConfig,
    registry: NodeRegistry,
    state: Arc<EditorState>,
    history: History,
    commands: CommandBus,
    transforms: Vec<TransformEntry>,
    normalizers: Vec<(Registration, Normalizer)>,
    listeners: Vec<(Registration, UpdateListener)>,
    next_registration: u64,
    version: u64,
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editor")
            .field("config", &self.config)
            .field("version", &self.version)
            .field("node_count", &self.state.tree.node_count())
            .field("commands", &self.commands)
            .field("transforms", &self.transforms.len())
            .field("normalizers", &self.normalizers.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    /// An editor with default config and only the built-in node types.
    pub fn new() -> Self {
        EditorBuilder::new().build()
    }

    /// Start building an editor.
    pub fn builder() -> EditorBuilder {
        EditorBuilder::new()
    }

    /// The configuration.
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// The committed state.
    pub fn state(&self) -> &Arc<EditorState> {
        &self.state
    }

    /// Incremented on every commit and history step.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The registered node types.
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Whether a node type is registered.
    pub fn has_node_type(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    fn next_id(&mut self) -> Registration {
        self.next_registration += 1;
        Registration(self.next_registration)
    }

    // ---- registration ----

    /// Register a command handler.
    pub fn register_command(
        &mut self,
        kind: CommandKind,
        priority: CommandPriority,
        handler: impl FnMut(&mut Transaction<'_>, &EditorCommand) -> bool + 'static,
    ) -> Registration {
        let id = self.next_id();
        let handler: CommandHandler = Box::new(handler);
        self.commands.register(kind, priority, id, handler);
        id
    }

    /// Register a transform for dirty nodes of `node_type`.
    pub fn register_node_transform(
        &mut self,
        node_type: &'static str,
        transform: impl FnMut(&mut Transaction<'_>, NodeKey) + 'static,
    ) -> Registration {
        let id = self.next_id();
        self.transforms.push(TransformEntry {
            id,
            node_type,
            transform: Box::new(transform),
        });
        id
    }

    /// Register a post-commit normalizer.
    pub fn register_normalizer(
        &mut self,
        normalizer: impl FnMut(&mut Transaction<'_>, &HashSet<NodeKey>) + 'static,
    ) -> Registration {
        let id = self.next_id();
        self.normalizers.push((id, Box::new(normalizer)));
        id
    }

    /// Register an update listener.
    pub fn register_update_listener(
        &mut self,
        listener: impl FnMut(&UpdatePayload) + 'static,
    ) -> Registration {
        let id = self.next_id();
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a handler, transform, normalizer, or listener. Returns `false` if unknown.
    pub fn unregister(&mut self, registration: Registration) -> bool {
        let before = self.transforms.len() + self.normalizers.len() + self.listeners.len();
        self.transforms.retain(|entry| entry.id != registration);
        self.normalizers.retain(|(id, _)| *id != registration);
        self.listeners.retain(|(id, _)| *id != registration);
        let after = self.transforms.len() + self.normalizers.len() + self.listeners.len();
        self.commands.unregister(registration) || before != after
    }

    /// Number of handlers registered for a command kind.
    pub fn command_handler_count(&self, kind: CommandKind) -> usize {
        self.commands.handler_count(kind)
    }

    // ---- updates ----

    /// Run `f` in a transaction and commit whatever it wrote.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut Transaction<'_>) -> R) -> R {
        let mut tx = Transaction::new(
            self.state.tree.clone(),
            self.state.selection.clone(),
            &self.registry,
        );
        let result = f(&mut tx);
        run_transforms(&mut self.transforms, &mut tx, self.config.max_transform_passes);
        let outcome = tx.finish();
        self.commit(outcome, UpdateOrigin::Update);
        result
    }

    /// Run `f` in a transaction; commit on `Ok`, discard every write on `Err`.
    pub fn try_update<T, E>(
        &mut self,
        f: impl FnOnce(&mut Transaction<'_>) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut tx = Transaction::new(
            self.state.tree.clone(),
            self.state.selection.clone(),
            &self.registry,
        );
        let value = f(&mut tx)?;
        run_transforms(&mut self.transforms, &mut tx, self.config.max_transform_passes);
        let outcome = tx.finish();
        self.commit(outcome, UpdateOrigin::Update);
        Ok(value)
    }

    /// Route a command through the registered handlers. Returns whether any handler claimed it.
    ///
    /// Writes made by handlers that decline are discarded.
    pub fn dispatch(&mut self, command: EditorCommand) -> bool {
        let kind = command.kind();
        let mut tx = Transaction::new(
            self.state.tree.clone(),
            self.state.selection.clone(),
            &self.registry,
        );
        if !self.commands.dispatch(&mut tx, &command) {
            trace!(?kind, "command not claimed");
            return false;
        }
        run_transforms(&mut self.transforms, &mut tx, self.config.max_transform_passes);
        let outcome = tx.finish();
        self.commit(outcome, UpdateOrigin::Dispatch(kind));
        true
    }

    fn commit(&mut self, outcome: TransactionOutcome, origin: UpdateOrigin) {
        if outcome.is_noop() {
            return;
        }
        let prev_state = self.state.clone();
        let mut dirty = outcome.dirty;
        let mut removed = outcome.removed;
        let mut state = Arc::new(EditorState {
            tree: outcome.tree,
            selection: outcome.selection,
        });

        if !self.normalizers.is_empty() {
            let mut settled = false;
            for pass in 0..self.config.max_normalize_passes {
                let mut tx =
                    Transaction::new(state.tree.clone(), state.selection.clone(), &self.registry);
                for (_, normalizer) in self.normalizers.iter_mut() {
                    normalizer(&mut tx, &dirty);
                }
                run_transforms(&mut self.transforms, &mut tx, self.config.max_transform_passes);
                let wrote = tx.has_writes();
                let pass_outcome = tx.finish();
                if pass_outcome.selection_changed || wrote {
                    state = Arc::new(EditorState {
                        tree: pass_outcome.tree,
                        selection: pass_outcome.selection,
                    });
                }
                if !wrote {
                    settled = true;
                    break;
                }
                debug!(pass, dirty = pass_outcome.dirty.len(), "normalizer pass wrote");
                dirty.extend(pass_outcome.dirty);
                removed.extend(pass_outcome.removed);
            }
            if !settled {
                warn!(
                    passes = self.config.max_normalize_passes,
                    "normalizers did not settle"
                );
            }
        }

        let document_changed = !dirty.is_empty() || !removed.is_empty();
        if document_changed {
            self.history.push(prev_state.clone());
        }
        self.state = state.clone();
        self.version += 1;

        let candidates: Vec<NodeKey> = dirty.iter().chain(removed.iter()).copied().collect();
        let mutations = diff_mutations(&prev_state.tree, &state.tree, candidates);
        let payload = UpdatePayload {
            prev_state,
            state,
            dirty,
            mutations,
            origin,
            version: self.version,
        };
        self.notify(&payload);
    }

    fn notify(&mut self, payload: &UpdatePayload) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(payload);
        }
    }

    // ---- history ----

    /// Whether there is anything to undo.
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether there is anything to redo.
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Number of undo entries.
    pub fn undo_depth(&self) -> usize {
        self.history.undo_depth()
    }

    /// Restore the state before the last commit.
    pub fn undo(&mut self) -> bool {
        match self.history.undo(self.state.clone()) {
            Some(previous) => {
                self.restore(previous, UpdateOrigin::Undo);
                true
            }
            None => false,
        }
    }

    /// Re-apply the last undone commit.
    pub fn redo(&mut self) -> bool {
        match self.history.redo(self.state.clone()) {
            Some(next) => {
                self.restore(next, UpdateOrigin::Redo);
                true
            }
            None => false,
        }
    }

    fn restore(&mut self, state: Arc<EditorState>, origin: UpdateOrigin) {
        let prev_state = std::mem::replace(&mut self.state, state.clone());
        self.version += 1;
        let mutations = diff_trees(&prev_state.tree, &state.tree);
        let dirty = mutations.iter().map(|mutation| mutation.key).collect();
        let payload = UpdatePayload {
            prev_state,
            state,
            dirty,
            mutations,
            origin,
            version: self.version,
        };
        self.notify(&payload);
    }

    // ---- markup ----

    /// Replace the document with parsed HTML (either the data or the editing shape).
    pub fn import_html(&mut self, html: &str) -> Result<(), EditorError> {
        let nodes = markup::parse_html(html)?;
        self.try_update(|tx| {
            let existing = tx.children(NodeKey::ROOT).to_vec();
            for child in existing {
                tx.remove(child)?;
            }
            markup::import_markup(tx, NodeKey::ROOT, &nodes)?;
            if tx.children(NodeKey::ROOT).is_empty() {
                let paragraph = tx.create_paragraph();
                tx.append(NodeKey::ROOT, paragraph)?;
            }
            tx.set_selection(None);
            Ok::<(), EditorError>(())
        })
    }

    /// The document as data markup.
    pub fn export_html(&self) -> String {
        markup::export_html(&self.state.tree)
    }

    /// The document as markdown.
    pub fn export_markdown(&self) -> String {
        markup::export_markdown(&self.state.tree)
    }

    /// The document as editing markup. `decorate` may adjust each element's rendering.
    pub fn render_editing_markup(&self, decorate: impl FnMut(NodeKey, &mut Element)) -> Element {
        markup::render_editing_markup(&self.state.tree, decorate)
    }
}

fn run_transforms(transforms: &mut [TransformEntry], tx: &mut Transaction<'_>, max_passes: usize) {
    if transforms.is_empty() {
        tx.take_recent();
        return;
    }
    for _ in 0..max_passes {
        let mut keys: Vec<NodeKey> = tx.take_recent().into_iter().collect();
        if keys.is_empty() {
            return;
        }
        keys.sort();
        for key in keys {
            for entry in transforms.iter_mut() {
                if tx.is_type(key, entry.node_type) {
                    (entry.transform)(tx, key);
                }
            }
        }
    }
    if !tx.take_recent().is_empty() {
        warn!(passes = max_passes, "node transforms did not converge");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::KeyModifiers;
    use crate::selection::{Point, Selection};
    use crate::state::MutationKind;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn first_paragraph(editor: &Editor) -> NodeKey {
        editor.state().tree.first_child(NodeKey::ROOT).unwrap()
    }

    #[test]
    fn test_update_commits_and_notifies() {
        let mut editor = Editor::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        editor.register_update_listener(move |payload| {
            sink.borrow_mut().push(payload.mutations.clone());
        });

        let paragraph = first_paragraph(&editor);
        let text = editor.update(|tx| {
            let text = tx.create_text("hi");
            tx.append(paragraph, text).unwrap();
            text
        });

        assert_eq!(editor.version(), 1);
        assert_eq!(editor.state().tree.text_content(NodeKey::ROOT), "hi");
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert!(
            seen[0]
                .iter()
                .any(|m| m.key == text && m.kind == MutationKind::Created)
        );
    }

    #[test]
    fn test_noop_update_does_not_commit() {
        let mut editor = Editor::new();
        editor.update(|_tx| {});
        assert_eq!(editor.version(), 0);
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_try_update_discards_on_error() {
        let mut editor = Editor::new();
        let paragraph = first_paragraph(&editor);
        let result: Result<(), &str> = editor.try_update(|tx| {
            tx.remove(paragraph).unwrap();
            Err("nope")
        });
        assert_eq!(result, Err("nope"));
        assert!(editor.state().tree.contains(paragraph));
        assert_eq!(editor.version(), 0);
    }

    #[test]
    fn test_normalizer_merges_into_same_history_entry() {
        let mut editor = Editor::new();
        editor.register_normalizer(|tx, _dirty| {
            if let Some(last) = tx.last_child(NodeKey::ROOT)
                && !tx.text_content(last).is_empty()
            {
                let paragraph = tx.create_paragraph();
                tx.append(NodeKey::ROOT, paragraph).unwrap();
            }
        });
        let paragraph = first_paragraph(&editor);
        editor.update(|tx| {
            let text = tx.create_text("x");
            tx.append(paragraph, text).unwrap();
        });
        assert_eq!(editor.state().tree.children(NodeKey::ROOT).len(), 2);
        assert_eq!(editor.undo_depth(), 1);
        assert!(editor.undo());
        assert_eq!(editor.state().tree.children(NodeKey::ROOT).len(), 1);
        assert!(editor.redo());
        assert_eq!(editor.state().tree.children(NodeKey::ROOT).len(), 2);
    }

    #[test]
    fn test_transform_runs_on_dirty_nodes_of_type() {
        let mut editor = Editor::new();
        editor.register_node_transform(crate::node::TEXT_TYPE, |tx, key| {
            let upper = tx.get(key).and_then(|n| n.text()).map(str::to_uppercase);
            if let Some(upper) = upper
                && tx.get(key).and_then(|n| n.text()) != Some(upper.as_str())
            {
                tx.set_text(key, upper).unwrap();
            }
        });
        let paragraph = first_paragraph(&editor);
        editor.update(|tx| tx.set_cursor(Point::element(paragraph, 0)));
        assert!(editor.dispatch(EditorCommand::InsertText("abc".to_string())));
        assert_eq!(editor.state().tree.text_content(NodeKey::ROOT), "ABC");
    }

    #[test]
    fn test_declined_dispatch_discards_writes() {
        let mut editor = Editor::new();
        let paragraph = first_paragraph(&editor);
        editor.register_command(CommandKind::KeyTab, CommandPriority::Low, move |tx, _| {
            tx.remove(paragraph).ok();
            false
        });
        assert!(!editor.dispatch(EditorCommand::KeyTab(KeyModifiers::NONE)));
        assert!(editor.state().tree.contains(paragraph));
    }

    #[test]
    fn test_selection_only_update_skips_history() {
        let mut editor = Editor::new();
        let paragraph = first_paragraph(&editor);
        editor.update(|tx| tx.set_cursor(Point::element(paragraph, 0)));
        assert_eq!(editor.version(), 1);
        assert!(!editor.can_undo());
        assert_eq!(
            editor.state().selection,
            Some(Selection::caret(Point::element(paragraph, 0)))
        );
    }
}

#![warn(missing_docs)]
//! Blockdoc Core - Headless Block-Tree Document Engine
//!
//! # Overview
//!
//! `blockdoc-core` is a headless rich-text document engine focused on the document tree, its
//! transactional editing, and the selection model. It does not render anything: the upper layer
//! receives committed [`EditorState`] snapshots and an editing-markup view of them, and feeds
//! input back as [`EditorCommand`]s.
//!
//! # Core Features
//!
//! - **Arena Tree**: nodes keyed by stable [`NodeKey`]s, parent links as plain keys
//! - **Copy-on-Write Snapshots**: committed states share untouched nodes (`Arc<Node>`)
//! - **Transactions**: all writes go through a [`Transaction`], with dirty tracking
//! - **Command Bus**: priority-ordered, first-claim-wins handlers per [`CommandKind`]
//! - **Self-Healing Hooks**: node transforms before commit, normalizers after commit
//! - **Snapshot History**: undo/redo of whole committed states
//! - **Markup**: HTML import/export through per-type import rules
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Editor (update / dispatch / history)       │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Command Bus + Built-in Rich Text           │  ← Input Handling
//! ├─────────────────────────────────────────────┤
//! │  Transforms & Normalizers                   │  ← Structural Repair
//! ├─────────────────────────────────────────────┤
//! │  Transaction (writes, selection, dirty set) │  ← Mutation
//! ├─────────────────────────────────────────────┤
//! │  DocumentTree (Arc node arena)              │  ← Storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use blockdoc_core::{Editor, EditorCommand, KeyModifiers, NodeKey, Point};
//!
//! let mut editor = Editor::new();
//! let paragraph = editor.state().tree.first_child(NodeKey::ROOT).unwrap();
//!
//! // Place the caret, then type.
//! editor.update(|tx| tx.set_cursor(Point::element(paragraph, 0)));
//! editor.dispatch(EditorCommand::InsertText("Hello".to_string()));
//! editor.dispatch(EditorCommand::KeyEnter(KeyModifiers::NONE));
//! editor.dispatch(EditorCommand::InsertText("World".to_string()));
//!
//! assert_eq!(editor.export_html(), "<p>Hello</p><p>World</p>");
//!
//! editor.undo();
//! assert_eq!(editor.export_html(), "<p>Hello</p><p><br></p>");
//! ```
//!
//! # Module Description
//!
//! - [`tree`] - Node arena and read-only traversal
//! - [`transaction`] - Transaction-scoped writes and block insertion
//! - [`selection`] - Range and node selections
//! - [`commands`] - Command types and the priority command bus
//! - [`state`] - Committed state and update payloads
//! - [`markup`] - Markup model, HTML parser, import/export
//! - [`registry`] - Node type registration

pub mod commands;
mod editor;
mod error;
mod history;
pub mod markup;
mod node;
pub mod registry;
mod rich_text;
pub mod selection;
pub mod state;
pub mod transaction;
pub mod tree;

pub use commands::{
    ClickEvent, CommandHandler, CommandId, CommandKind, CommandPayload, CommandPriority,
    EditorCommand, KeyModifiers, Registration,
};
pub use editor::{Editor, EditorBuilder, EditorConfig, NodeTransform, Normalizer, UpdateListener};
pub use error::{EditorError, MarkupError, TreeError};
pub use markup::{Element, MarkupNode};
pub use node::{ElementNode, Node, NodeKey, NodeKind, PARAGRAPH_TYPE, ROOT_TYPE, TEXT_TYPE};
pub use registry::{
    AfterImportFn, CollapseAtStartFn, ImportFn, ImportRule, ImportedElement, NodeRegistry,
    NodeTypeSpec,
};
pub use selection::{NodeSelection, Point, PointKind, RangeSelection, Selection};
pub use state::{EditorState, MutationKind, NodeMutation, UpdateOrigin, UpdatePayload};
pub use transaction::Transaction;
pub use tree::{Ancestors, DocumentTree};

#![warn(missing_docs)]
//! Blockdoc Collapsible - Disclosure Sections for `blockdoc-core`
//!
//! # Overview
//!
//! A collapsible section is a composite block: a title that is always visible and a content
//! body that can be hidden. This crate keeps such sections well-formed while the generic editor
//! (which knows nothing about them) edits the document around and inside them.
//!
//! # Components
//!
//! - [`nodes`] - the three node types and section-level edits
//! - [`convert`] - markup import of both the data and the editing shape
//! - [`enforcer`] - post-commit structural repair
//! - [`handlers`] - command handlers for the insert/toggle commands, clicks, and keys
//! - [`presentation`] - selected / empty-title flags for rendering
//! - [`locate`] - finding the section around a selection
//!
//! # Quick Start
//!
//! ```rust
//! use blockdoc_collapsible::{CollapsibleSections, SectionsConfig, node_types};
//! use blockdoc_core::{Editor, EditorCommand, NodeKey, Point};
//!
//! let mut editor = Editor::builder().register_node_types(node_types()).build();
//! let sections = CollapsibleSections::register(&mut editor, SectionsConfig::default()).unwrap();
//!
//! let paragraph = editor.state().tree.first_child(NodeKey::ROOT).unwrap();
//! editor.update(|tx| tx.set_cursor(Point::element(paragraph, 0)));
//! editor.dispatch(EditorCommand::InsertText("+++".to_string()));
//!
//! assert_eq!(sections.presentation().rendered_sections().count(), 1);
//! assert_eq!(
//!     editor.export_html(),
//!     "<details class=\"detailsBlock\" open><summary class=\"detailsBlockTitle\"><p><br></p></summary>\
//!      <div class=\"detailsBlockContent\"><p><br></p></div></details><p><br></p>"
//! );
//! ```

pub mod config;
pub mod convert;
pub mod enforcer;
mod error;
pub mod handlers;
pub mod locate;
pub mod nodes;
pub mod presentation;

pub use config::SectionsConfig;
pub use convert::node_types;
pub use enforcer::{RepairReport, repair_sections};
pub use error::SectionsError;
pub use handlers::{INSERT_COLLAPSIBLE_SECTION, TOGGLE_COLLAPSIBLE_SECTION};
pub use locate::{SectionContext, SectionPart};
pub use nodes::{
    CONTAINER_TYPE, CONTENT_TYPE, ContainerNode, ContentNode, SectionKeys, TITLE_TYPE, TitleNode,
};
pub use presentation::SectionPresentation;

use blockdoc_core::{CommandPayload, Editor, EditorCommand, Element, NodeKey, Registration};
use std::cell::{Ref, RefCell};
use std::rc::Rc;
use tracing::debug;

/// The insert command.
pub fn insert_section_command() -> EditorCommand {
    EditorCommand::custom(INSERT_COLLAPSIBLE_SECTION, CommandPayload::None)
}

/// The toggle command for one container.
pub fn toggle_section_command(container: NodeKey) -> EditorCommand {
    EditorCommand::custom(TOGGLE_COLLAPSIBLE_SECTION, CommandPayload::Node(container))
}

/// Collapsible sections activated on one editor.
///
/// Holds the registrations (so the plugin can be removed again) and the presentation state the
/// update listener keeps current.
#[derive(Debug)]
pub struct CollapsibleSections {
    config: Rc<SectionsConfig>,
    presentation: Rc<RefCell<SectionPresentation>>,
    registrations: Vec<Registration>,
}

impl CollapsibleSections {
    /// Activate sections on `editor`.
    ///
    /// The three node types from [`node_types`] must have been registered on the editor's
    /// builder; otherwise this fails with [`SectionsError::UnregisteredNodeType`].
    pub fn register(editor: &mut Editor, config: SectionsConfig) -> Result<Self, SectionsError> {
        for name in [CONTAINER_TYPE, TITLE_TYPE, CONTENT_TYPE] {
            if !editor.has_node_type(name) {
                return Err(SectionsError::UnregisteredNodeType(name));
            }
        }

        let config = Rc::new(config);
        let mut registrations = handlers::register_handlers(editor, &config);

        registrations.push(editor.register_normalizer(|tx, dirty| {
            if let Err(err) = repair_sections(tx, dirty) {
                debug!(%err, "section repair aborted");
            }
        }));

        let mut initial = SectionPresentation::new(config.title_placeholder.clone());
        initial.seed(editor.state());
        let presentation = Rc::new(RefCell::new(initial));
        let sink = Rc::clone(&presentation);
        registrations.push(editor.register_update_listener(move |payload| {
            sink.borrow_mut().sync(payload);
        }));

        debug!(handlers = registrations.len(), "collapsible sections registered");
        Ok(Self {
            config,
            presentation,
            registrations,
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &SectionsConfig {
        &self.config
    }

    /// The current presentation state.
    pub fn presentation(&self) -> Ref<'_, SectionPresentation> {
        self.presentation.borrow()
    }

    /// The editing markup of the document with presentation classes applied.
    pub fn render_editing_markup(&self, editor: &Editor) -> Element {
        let presentation = self.presentation.borrow();
        editor.render_editing_markup(|key, element| presentation.decorate(key, element))
    }

    /// Remove every handler, the repair pass, and the listener from `editor`.
    pub fn unregister(self, editor: &mut Editor) {
        for registration in self.registrations {
            editor.unregister(registration);
        }
    }
}

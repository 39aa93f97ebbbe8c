//! A short editing session with collapsible sections.
//!
//! Run with `RUST_LOG=blockdoc_collapsible=trace` to see the repair pass at work.

use blockdoc_collapsible::{
    CONTAINER_TYPE, CollapsibleSections, SectionsConfig, node_types, toggle_section_command,
};
use blockdoc_core::{Editor, EditorCommand, KeyModifiers, NodeKey, Point};
use tracing_subscriber::EnvFilter;

fn type_text(editor: &mut Editor, text: &str) {
    editor.dispatch(EditorCommand::InsertText(text.to_string()));
}

fn key(editor: &mut Editor, command: EditorCommand) {
    editor.dispatch(command);
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .init();

    let mut editor = Editor::builder().register_node_types(node_types()).build();
    let sections = match CollapsibleSections::register(&mut editor, SectionsConfig::default()) {
        Ok(sections) => sections,
        Err(err) => {
            eprintln!("failed to register sections: {err}");
            return;
        }
    };

    let Some(paragraph) = editor.state().tree.first_child(NodeKey::ROOT) else {
        return;
    };
    editor.update(|tx| tx.set_cursor(Point::element(paragraph, 0)));

    println!("=== Autoformat ===");
    type_text(&mut editor, "Intro");
    key(&mut editor, EditorCommand::KeyEnter(KeyModifiers::NONE));
    type_text(&mut editor, "+++");
    println!("{}", editor.export_html());

    println!("\n=== Title, Tab, body ===");
    type_text(&mut editor, "Release notes");
    key(&mut editor, EditorCommand::KeyTab(KeyModifiers::NONE));
    type_text(&mut editor, "Fixed the parser");
    key(&mut editor, EditorCommand::KeyEnter(KeyModifiers::NONE));
    type_text(&mut editor, "Faster startup");
    println!("{}", editor.export_html());

    println!("\n=== Enter twice leaves the section ===");
    key(&mut editor, EditorCommand::KeyEnter(KeyModifiers::NONE));
    key(&mut editor, EditorCommand::KeyEnter(KeyModifiers::NONE));
    type_text(&mut editor, "Outro");
    println!("{}", editor.export_html());

    println!("\n=== Collapse ===");
    let containers = editor.state().tree.nodes_of_type(CONTAINER_TYPE);
    for container in &containers {
        key(&mut editor, toggle_section_command(*container));
    }
    let markup = sections.render_editing_markup(&editor);
    println!("{}", blockdoc_core::markup::render_html(&markup.children));

    println!("\n=== Markdown ===");
    println!("{}", editor.export_markdown());

    println!("\n=== Undo all ===");
    let mut steps = 0;
    while editor.undo() {
        steps += 1;
    }
    println!("undid {steps} steps: {}", editor.export_html());
    println!(
        "rendered sections: {}",
        sections.presentation().rendered_sections().count()
    );
}

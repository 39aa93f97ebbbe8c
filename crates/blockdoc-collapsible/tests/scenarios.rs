use blockdoc_collapsible::nodes::section_keys;
use blockdoc_collapsible::{
    CONTAINER_TYPE, CONTENT_TYPE, CollapsibleSections, ContainerNode, SectionKeys,
    SectionsConfig, TITLE_TYPE, insert_section_command, node_types, repair_sections,
};
use blockdoc_core::{
    ClickEvent, DocumentTree, Editor, EditorCommand, Element, KeyModifiers, NodeKey, Point,
    Selection,
};
use pretty_assertions::assert_eq;
use std::collections::HashSet;

fn setup() -> (Editor, CollapsibleSections) {
    let mut editor = Editor::builder().register_node_types(node_types()).build();
    let sections = CollapsibleSections::register(&mut editor, SectionsConfig::default()).unwrap();
    let paragraph = editor.state().tree.first_child(NodeKey::ROOT).unwrap();
    editor.update(|tx| tx.set_cursor(Point::element(paragraph, 0)));
    (editor, sections)
}

fn type_text(editor: &mut Editor, text: &str) {
    assert!(editor.dispatch(EditorCommand::InsertText(text.to_string())));
}

fn caret(editor: &Editor) -> Option<Point> {
    editor
        .state()
        .selection
        .as_ref()
        .and_then(Selection::caret_point)
}

fn only_section(editor: &Editor) -> SectionKeys {
    let tree = &editor.state().tree;
    let containers = tree.nodes_of_type(CONTAINER_TYPE);
    assert_eq!(containers.len(), 1, "expected exactly one section");
    section_keys(tree, containers[0]).expect("section is well formed")
}

fn is_open(editor: &Editor, container: NodeKey) -> bool {
    editor
        .state()
        .tree
        .element::<ContainerNode>(container)
        .unwrap()
        .is_open()
}

fn assert_well_formed(tree: &DocumentTree) {
    for container in tree.nodes_of_type(CONTAINER_TYPE) {
        let keys = section_keys(tree, container).expect("container shaped [Title, Content]");
        assert!(!tree.children(keys.title).is_empty(), "title has a block");
        assert!(!tree.children(keys.content).is_empty(), "content has a block");
    }
    let parts = tree
        .nodes_of_type(TITLE_TYPE)
        .into_iter()
        .chain(tree.nodes_of_type(CONTENT_TYPE));
    for part in parts {
        let parent = tree.parent(part).unwrap();
        assert!(tree.is_type(parent, CONTAINER_TYPE), "part {part} is inside a container");
    }
}

fn title_click(sections: &CollapsibleSections, editor: &Editor, offset_x: f64) -> ClickEvent {
    let markup = sections.render_editing_markup(editor);
    let container = markup
        .find(&|element: &Element| element.has_class("detailsBlock"))
        .unwrap();
    let title = container
        .find(&|element: &Element| element.has_class("detailsBlockTitle"))
        .unwrap();
    ClickEvent {
        path: vec![title.shallow(), container.shallow(), markup.shallow()],
        offset_x,
        has_text_selection: false,
    }
}

#[test]
fn test_trigger_creates_section() {
    let (mut editor, _sections) = setup();
    type_text(&mut editor, "+");
    type_text(&mut editor, "+");
    assert!(editor.state().tree.nodes_of_type(CONTAINER_TYPE).is_empty());
    type_text(&mut editor, "+");

    let keys = only_section(&editor);
    let tree = &editor.state().tree;
    assert!(is_open(&editor, keys.container));
    assert_eq!(tree.text_content(keys.title), "");
    assert_eq!(tree.children(keys.content).len(), 1);
    assert_eq!(tree.text_content(keys.content), "");

    let title_paragraph = tree.first_child(keys.title).unwrap();
    assert_eq!(caret(&editor), Some(Point::element(title_paragraph, 0)));
}

#[test]
fn test_details_trigger_with_space() {
    let (mut editor, _sections) = setup();
    type_text(&mut editor, "<details> ");
    only_section(&editor);
}

#[test]
fn test_trigger_inside_section_is_plain_text() {
    let (mut editor, _sections) = setup();
    type_text(&mut editor, "+++");
    let keys = only_section(&editor);
    type_text(&mut editor, "+++");
    assert_eq!(editor.state().tree.text_content(keys.title), "+++");
    only_section(&editor);
}

#[test]
fn test_backspace_in_empty_title_removes_section() {
    let (mut editor, _sections) = setup();
    let before = editor.export_html();
    type_text(&mut editor, "+++");
    only_section(&editor);

    assert!(editor.dispatch(EditorCommand::KeyBackspace(KeyModifiers::NONE)));
    assert!(editor.state().tree.nodes_of_type(CONTAINER_TYPE).is_empty());
    assert_eq!(editor.export_html(), before);
    assert_well_formed(&editor.state().tree);
}

#[test]
fn test_tab_moves_to_content() {
    let (mut editor, _sections) = setup();
    type_text(&mut editor, "+++");
    type_text(&mut editor, "Heading");
    let keys = only_section(&editor);

    assert!(editor.dispatch(EditorCommand::KeyTab(KeyModifiers::NONE)));
    let content_paragraph = editor.state().tree.first_child(keys.content).unwrap();
    assert_eq!(caret(&editor), Some(Point::element(content_paragraph, 0)));
    assert!(is_open(&editor, keys.container));

    assert!(editor.dispatch(EditorCommand::KeyTab(KeyModifiers::SHIFT)));
    let title_text = editor.state().tree.last_descendant(keys.title);
    assert_eq!(caret(&editor), Some(Point::text(title_text, 7)));
}

#[test]
fn test_click_in_gutter_toggles() {
    let (mut editor, sections) = setup();
    type_text(&mut editor, "+++");
    let keys = only_section(&editor);
    assert!(is_open(&editor, keys.container));

    let click = title_click(&sections, &editor, 10.0);
    assert!(editor.dispatch(EditorCommand::Click(click.clone())));
    assert!(!is_open(&editor, keys.container));
    let markup = sections.render_editing_markup(&editor);
    assert!(markup.find(&|e: &Element| e.has_class("detailsBlockClosed")).is_some());

    assert!(editor.dispatch(EditorCommand::Click(click)));
    assert!(is_open(&editor, keys.container));
}

#[test]
fn test_click_outside_gutter_or_with_selection_is_ignored() {
    let (mut editor, sections) = setup();
    type_text(&mut editor, "+++");
    let keys = only_section(&editor);

    let far = title_click(&sections, &editor, 120.0);
    assert!(!editor.dispatch(EditorCommand::Click(far)));

    let mut selecting = title_click(&sections, &editor, 4.0);
    selecting.has_text_selection = true;
    assert!(!editor.dispatch(EditorCommand::Click(selecting)));

    let mut on_content = title_click(&sections, &editor, 4.0);
    on_content.path.remove(0);
    assert!(!editor.dispatch(EditorCommand::Click(on_content)));

    assert!(is_open(&editor, keys.container));
}

#[test]
fn test_enter_on_empty_last_block_exits() {
    let (mut editor, _sections) = setup();
    type_text(&mut editor, "+++");
    type_text(&mut editor, "Notes");
    assert!(editor.dispatch(EditorCommand::KeyEnter(KeyModifiers::NONE)));
    type_text(&mut editor, "body");
    assert!(editor.dispatch(EditorCommand::KeyEnter(KeyModifiers::NONE)));
    let keys = only_section(&editor);
    assert_eq!(editor.state().tree.children(keys.content).len(), 2);

    assert!(editor.dispatch(EditorCommand::KeyEnter(KeyModifiers::NONE)));
    let tree = &editor.state().tree;
    assert_eq!(tree.text_content(keys.content), "body");
    assert_eq!(tree.children(keys.content).len(), 1);
    let after = tree.next_sibling(keys.container).unwrap();
    assert!(tree.is_paragraph(after));
    assert_eq!(caret(&editor), Some(Point::element(after, 0)));
}

#[test]
fn test_content_keeps_placeholder() {
    let (mut editor, _sections) = setup();
    type_text(&mut editor, "+++");
    let keys = only_section(&editor);
    assert!(editor.dispatch(EditorCommand::KeyTab(KeyModifiers::NONE)));
    assert!(editor.dispatch(EditorCommand::KeyEnter(KeyModifiers::NONE)));

    let tree = &editor.state().tree;
    assert_eq!(tree.children(keys.content).len(), 1);
    let caret_block = caret(&editor).unwrap().key;
    assert_eq!(tree.previous_sibling(caret_block), Some(keys.container));
}

#[test]
fn test_export_import_preserves_text() {
    let (mut editor, _sections) = setup();
    type_text(&mut editor, "+++");
    type_text(&mut editor, "Spoilers");
    assert!(editor.dispatch(EditorCommand::KeyTab(KeyModifiers::NONE)));
    type_text(&mut editor, "It was the butler.");
    let keys = only_section(&editor);
    editor.dispatch(blockdoc_collapsible::toggle_section_command(keys.container));
    assert!(!is_open(&editor, keys.container));
    let html = editor.export_html();

    let (mut imported, _sections) = setup();
    imported.import_html(&html).unwrap();
    let copy = only_section(&imported);
    let tree = &imported.state().tree;
    assert_eq!(tree.text_content(copy.title), "Spoilers");
    assert_eq!(tree.text_content(copy.content), "It was the butler.");
    // Exported sections always come back open.
    assert!(is_open(&imported, copy.container));
    assert_eq!(imported.export_html(), html);
}

#[test]
fn test_import_keeps_literal_trigger_paragraphs() {
    let (mut editor, _sections) = setup();
    let html = "<p>Intro</p><p>+++</p><p>&lt;details&gt;</p>";
    editor.import_html(html).unwrap();

    assert!(editor.state().tree.nodes_of_type(CONTAINER_TYPE).is_empty());
    assert_eq!(editor.export_html(), html);
    assert_eq!(editor.export_markdown(), "Intro\n\n+++\n\n<details>");
}

#[test]
fn test_sections_stay_well_formed_through_an_editing_session() {
    let (mut editor, _sections) = setup();
    let script = vec![
        EditorCommand::InsertText("+++".to_string()),
        EditorCommand::InsertText("Title".to_string()),
        EditorCommand::KeyEnter(KeyModifiers::NONE),
        EditorCommand::InsertText("Line one".to_string()),
        EditorCommand::KeyEnter(KeyModifiers::NONE),
        EditorCommand::InsertText("Line two".to_string()),
        EditorCommand::KeyTab(KeyModifiers::SHIFT),
        EditorCommand::KeyBackspace(KeyModifiers::NONE),
        EditorCommand::KeyBackspace(KeyModifiers::NONE),
        EditorCommand::KeyTab(KeyModifiers::NONE),
        EditorCommand::KeyArrowRight(KeyModifiers::NONE),
        EditorCommand::KeyArrowDown(KeyModifiers::NONE),
        EditorCommand::KeyArrowDown(KeyModifiers::NONE),
        EditorCommand::KeyArrowDown(KeyModifiers::NONE),
        EditorCommand::KeyArrowLeft(KeyModifiers::NONE),
        EditorCommand::KeyArrowUp(KeyModifiers::NONE),
        EditorCommand::KeyDelete(KeyModifiers::NONE),
        insert_section_command(),
        EditorCommand::InsertText("Inner".to_string()),
        EditorCommand::KeyEnter(KeyModifiers::NONE),
        EditorCommand::KeyEnter(KeyModifiers::NONE),
        EditorCommand::KeyBackspace(KeyModifiers::NONE),
        EditorCommand::KeyBackspace(KeyModifiers::NONE),
        EditorCommand::KeyBackspace(KeyModifiers::NONE),
        EditorCommand::KeyBackspace(KeyModifiers::NONE),
        EditorCommand::KeyDelete(KeyModifiers::NONE),
        EditorCommand::KeyDelete(KeyModifiers::NONE),
    ];
    for command in script {
        editor.dispatch(command.clone());
        assert_well_formed(&editor.state().tree);
    }
    while editor.undo() {
        assert_well_formed(&editor.state().tree);
    }
    while editor.redo() {
        assert_well_formed(&editor.state().tree);
    }
}

#[test]
fn test_repair_is_idempotent_and_adds_no_history() {
    let (mut editor, _sections) = setup();
    type_text(&mut editor, "+++");
    type_text(&mut editor, "T");
    let depth = editor.undo_depth();
    let version = editor.version();

    editor.update(|tx| {
        let mut dirty: HashSet<NodeKey> = tx.descendants(NodeKey::ROOT).into_iter().collect();
        dirty.insert(NodeKey::ROOT);
        assert!(repair_sections(tx, &dirty).unwrap().is_clean());
        assert!(repair_sections(tx, &dirty).unwrap().is_clean());
    });
    assert_eq!(editor.undo_depth(), depth);
    assert_eq!(editor.version(), version);
}

#[test]
fn test_broken_structure_is_healed_in_the_same_commit() {
    let (mut editor, _sections) = setup();
    type_text(&mut editor, "+++");
    let keys = only_section(&editor);
    let depth = editor.undo_depth();

    // Drop the content the way a section-unaware edit might.
    editor.update(|tx| tx.remove(keys.content).unwrap());
    assert_well_formed(&editor.state().tree);
    assert!(!editor.state().tree.contains(keys.container));
    assert_eq!(editor.undo_depth(), depth + 1);

    editor.undo();
    assert_eq!(only_section(&editor), keys);
}

#[test]
fn test_boundary_deletes_never_lose_text() {
    // Backspace at the start of an empty body keeps a non-empty title.
    let (mut editor, _sections) = setup();
    type_text(&mut editor, "+++");
    type_text(&mut editor, "Keep me");
    assert!(editor.dispatch(EditorCommand::KeyTab(KeyModifiers::NONE)));
    assert!(editor.dispatch(EditorCommand::KeyBackspace(KeyModifiers::NONE)));
    assert!(editor.state().tree.nodes_of_type(CONTAINER_TYPE).is_empty());
    assert!(editor.state().tree.text_content(NodeKey::ROOT).contains("Keep me"));

    // Delete at the end of a titled section with an empty body.
    let (mut editor, _sections) = setup();
    type_text(&mut editor, "+++");
    type_text(&mut editor, "Also me");
    assert!(editor.dispatch(EditorCommand::KeyDelete(KeyModifiers::NONE)));
    assert!(editor.state().tree.nodes_of_type(CONTAINER_TYPE).is_empty());
    assert!(editor.state().tree.text_content(NodeKey::ROOT).contains("Also me"));

    // Backspace in an empty title keeps a non-empty body.
    let (mut editor, _sections) = setup();
    type_text(&mut editor, "+++");
    assert!(editor.dispatch(EditorCommand::KeyTab(KeyModifiers::NONE)));
    type_text(&mut editor, "Body text");
    assert!(editor.dispatch(EditorCommand::KeyTab(KeyModifiers::SHIFT)));
    assert!(editor.dispatch(EditorCommand::KeyBackspace(KeyModifiers::NONE)));
    assert!(editor.state().tree.nodes_of_type(CONTAINER_TYPE).is_empty());
    assert!(editor.state().tree.text_content(NodeKey::ROOT).contains("Body text"));
}

#[test]
fn test_unregistered_node_types_are_rejected() {
    let mut editor = Editor::new();
    let err = CollapsibleSections::register(&mut editor, SectionsConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        blockdoc_collapsible::SectionsError::UnregisteredNodeType(CONTAINER_TYPE)
    ));
}

#[test]
fn test_unregister_restores_default_behaviour() {
    let (mut editor, sections) = setup();
    sections.unregister(&mut editor);
    type_text(&mut editor, "+++");
    assert!(editor.state().tree.nodes_of_type(CONTAINER_TYPE).is_empty());
    assert!(!editor.dispatch(insert_section_command()));
}

use blockdoc_collapsible::nodes::section_keys;
use blockdoc_collapsible::presentation::PLACEHOLDER_ATTR;
use blockdoc_collapsible::{
    CONTAINER_TYPE, CollapsibleSections, SectionKeys, SectionsConfig, node_types,
};
use blockdoc_core::{Editor, EditorCommand, Element, KeyModifiers, NodeKey, Point};
use pretty_assertions::assert_eq;

fn setup_with(config: SectionsConfig) -> (Editor, CollapsibleSections) {
    let mut editor = Editor::builder().register_node_types(node_types()).build();
    let sections = CollapsibleSections::register(&mut editor, config).unwrap();
    let paragraph = editor.state().tree.first_child(NodeKey::ROOT).unwrap();
    editor.update(|tx| tx.set_cursor(Point::element(paragraph, 0)));
    (editor, sections)
}

fn setup() -> (Editor, CollapsibleSections) {
    setup_with(SectionsConfig::default())
}

fn type_text(editor: &mut Editor, text: &str) {
    assert!(editor.dispatch(EditorCommand::InsertText(text.to_string())));
}

fn only_section(editor: &Editor) -> SectionKeys {
    let tree = &editor.state().tree;
    let containers = tree.nodes_of_type(CONTAINER_TYPE);
    assert_eq!(containers.len(), 1);
    section_keys(tree, containers[0]).unwrap()
}

fn find_class<'a>(root: &'a Element, class: &'static str) -> Option<&'a Element> {
    root.find(&move |element: &Element| element.has_class(class))
}

#[test]
fn test_empty_title_flag_follows_typing() {
    let (mut editor, sections) = setup();
    type_text(&mut editor, "+++");
    let keys = only_section(&editor);
    assert!(sections.presentation().is_title_empty(keys.title));

    let markup = sections.render_editing_markup(&editor);
    let title = find_class(&markup, "detailsBlockTitleEmpty").unwrap();
    assert_eq!(title.attr(PLACEHOLDER_ATTR), Some("Collapsible Section Title"));

    type_text(&mut editor, "Named");
    assert!(!sections.presentation().is_title_empty(keys.title));
    let markup = sections.render_editing_markup(&editor);
    assert!(find_class(&markup, "detailsBlockTitleEmpty").is_none());
}

#[test]
fn test_selected_flag_follows_node_selection() {
    let (mut editor, sections) = setup();
    type_text(&mut editor, "+++");
    let keys = only_section(&editor);
    let trailing = editor.state().tree.next_sibling(keys.container).unwrap();
    editor.update(|tx| tx.select_start(trailing));
    assert!(!sections.presentation().is_selected(keys.container));

    assert!(editor.dispatch(EditorCommand::KeyArrowLeft(KeyModifiers::NONE)));
    assert!(sections.presentation().is_selected(keys.container));
    let markup = sections.render_editing_markup(&editor);
    let selected = find_class(&markup, "detailsBlockSelected").unwrap();
    assert_eq!(
        selected.attr("data-collapsible-key"),
        Some(keys.container.to_string().as_str())
    );

    assert!(editor.dispatch(EditorCommand::KeyArrowRight(KeyModifiers::NONE)));
    assert!(!sections.presentation().is_selected(keys.container));
}

#[test]
fn test_rendered_sections_track_creation_removal_and_undo() {
    let (mut editor, sections) = setup();
    assert_eq!(sections.presentation().rendered_sections().count(), 0);
    type_text(&mut editor, "+++");
    let keys = only_section(&editor);
    assert_eq!(
        sections.presentation().rendered_sections().collect::<Vec<_>>(),
        vec![keys.container]
    );

    assert!(editor.dispatch(EditorCommand::KeyBackspace(KeyModifiers::NONE)));
    assert_eq!(sections.presentation().rendered_sections().count(), 0);

    assert!(editor.undo());
    assert_eq!(
        sections.presentation().rendered_sections().collect::<Vec<_>>(),
        vec![keys.container]
    );
}

#[test]
fn test_presentation_is_seeded_from_existing_document() {
    let mut editor = Editor::builder().register_node_types(node_types()).build();
    editor
        .import_html("<details><summary></summary><p>body</p></details><p>after</p>")
        .unwrap();
    let sections = CollapsibleSections::register(&mut editor, SectionsConfig::default()).unwrap();
    let keys = only_section(&editor);
    let presentation = sections.presentation();
    assert_eq!(presentation.rendered_sections().collect::<Vec<_>>(), vec![keys.container]);
    assert!(presentation.is_title_empty(keys.title));
}

#[test]
fn test_custom_placeholder() {
    let config = SectionsConfig::from_json(r#"{ "title_placeholder": "Summary" }"#).unwrap();
    let (mut editor, sections) = setup_with(config);
    type_text(&mut editor, "<details>");
    assert_eq!(sections.presentation().placeholder(), "Summary");
    assert_eq!(sections.config().title_placeholder, "Summary");
    let markup = sections.render_editing_markup(&editor);
    let title = find_class(&markup, "detailsBlockTitleEmpty").unwrap();
    assert_eq!(title.attr(PLACEHOLDER_ATTR), Some("Summary"));
}

#[test]
fn test_closed_section_editing_markup() {
    let (mut editor, sections) = setup();
    type_text(&mut editor, "+++");
    let keys = only_section(&editor);
    assert!(editor.dispatch(blockdoc_collapsible::toggle_section_command(keys.container)));

    let markup = sections.render_editing_markup(&editor);
    let container = find_class(&markup, "detailsBlock").unwrap();
    assert!(container.has_class("detailsBlockEdit"));
    assert!(container.has_class("detailsBlockClosed"));
    assert!(find_class(container, "detailsBlockContent").is_some());
}

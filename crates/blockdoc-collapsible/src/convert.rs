//! Markup conversion for sections.
//!
//! Export lives on the node types themselves ([`ElementNode::export_markup`] for the data shape,
//! [`ElementNode::editing_markup`] for the editing shape). This module holds the import side:
//! it accepts both shapes and always yields a well-formed `Container[Title, Content]`.
//!
//! [`ElementNode::export_markup`]: blockdoc_core::ElementNode::export_markup
//! [`ElementNode::editing_markup`]: blockdoc_core::ElementNode::editing_markup

use crate::nodes::{
    CONTAINER_TYPE, CONTENT_TYPE, ContainerNode, ContentNode, TITLE_TYPE, TitleNode,
    collapse_at_start,
};
use blockdoc_core::{Element, ImportedElement, NodeKey, NodeTypeSpec, Transaction, TreeError};

/// Class of a section container, in both shapes.
pub const DETAILS_BLOCK_CLASS: &str = "detailsBlock";
/// Marks the editing shape of a container.
pub const DETAILS_EDIT_CLASS: &str = "detailsBlockEdit";
/// Marks a closed container in the editing shape.
pub const DETAILS_CLOSED_CLASS: &str = "detailsBlockClosed";
/// Class of a section title.
pub const DETAILS_TITLE_CLASS: &str = "detailsBlockTitle";
/// Class of a section body.
pub const DETAILS_CONTENT_CLASS: &str = "detailsBlockContent";
/// Presentation flag: the container is node-selected.
pub const DETAILS_SELECTED_CLASS: &str = "detailsBlockSelected";
/// Presentation flag: the title has no text.
pub const DETAILS_TITLE_EMPTY_CLASS: &str = "detailsBlockTitleEmpty";

const IMPORT_PRIORITY: u8 = 1;

/// Registration specs for the three section node types.
pub fn node_types() -> Vec<NodeTypeSpec> {
    vec![
        NodeTypeSpec::new(CONTAINER_TYPE)
            .with_import_rule("details", IMPORT_PRIORITY, import_details)
            .with_import_rule("div", IMPORT_PRIORITY, import_container_div)
            .with_collapse_at_start(collapse_at_start),
        NodeTypeSpec::new(TITLE_TYPE)
            .with_import_rule("summary", IMPORT_PRIORITY, import_summary)
            .with_import_rule("div", IMPORT_PRIORITY, import_title_div),
        NodeTypeSpec::new(CONTENT_TYPE).with_import_rule(
            "div",
            IMPORT_PRIORITY,
            import_content_div,
        ),
    ]
}

fn import_details(element: &Element) -> Option<ImportedElement> {
    let is_open = element.has_attr("open");
    Some(ImportedElement::new(ContainerNode::new(is_open)).with_after(ensure_section_shape))
}

fn import_container_div(element: &Element) -> Option<ImportedElement> {
    let is_part =
        element.has_class(DETAILS_TITLE_CLASS) || element.has_class(DETAILS_CONTENT_CLASS);
    if !element.has_class(DETAILS_BLOCK_CLASS) || is_part {
        return None;
    }
    let is_open = !element.has_class(DETAILS_CLOSED_CLASS);
    Some(ImportedElement::new(ContainerNode::new(is_open)).with_after(ensure_section_shape))
}

fn import_summary(_element: &Element) -> Option<ImportedElement> {
    Some(ImportedElement::new(TitleNode))
}

fn import_title_div(element: &Element) -> Option<ImportedElement> {
    element
        .has_class(DETAILS_TITLE_CLASS)
        .then(|| ImportedElement::new(TitleNode))
}

fn import_content_div(element: &Element) -> Option<ImportedElement> {
    element
        .has_class(DETAILS_CONTENT_CLASS)
        .then(|| ImportedElement::new(ContentNode))
}

/// Bring a freshly imported container into the `[Title, Content]` shape.
///
/// The first title and first content found are kept. A missing part is created, anything else
/// under the container is moved into the content (extra parts give up their children first),
/// and an empty part receives a paragraph.
pub fn ensure_section_shape(tx: &mut Transaction<'_>, container: NodeKey) -> Result<(), TreeError> {
    let mut title = None;
    let mut content = None;
    let mut strays = Vec::new();
    for child in tx.children(container).to_vec() {
        if title.is_none() && tx.is_type(child, TITLE_TYPE) {
            title = Some(child);
        } else if content.is_none() && tx.is_type(child, CONTENT_TYPE) {
            content = Some(child);
        } else {
            strays.push(child);
        }
    }

    let title = match title {
        Some(key) => key,
        None => tx.create_element(TitleNode),
    };
    let content = match content {
        Some(key) => key,
        None => tx.create_element(ContentNode),
    };
    tx.insert_at(container, 0, title)?;
    tx.insert_at(container, 1, content)?;

    for stray in strays {
        if tx.is_type(stray, TITLE_TYPE) || tx.is_type(stray, CONTENT_TYPE) {
            for child in tx.children(stray).to_vec() {
                tx.append(content, child)?;
            }
            tx.remove(stray)?;
        } else {
            tx.append(content, stray)?;
        }
    }

    for part in [title, content] {
        if tx.children(part).is_empty() {
            let paragraph = tx.create_paragraph();
            tx.append(part, paragraph)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::section_keys;
    use blockdoc_core::Editor;
    use pretty_assertions::assert_eq;

    fn editor() -> Editor {
        Editor::builder().register_node_types(node_types()).build()
    }

    fn only_section(editor: &Editor) -> crate::nodes::SectionKeys {
        let tree = &editor.state().tree;
        let containers = tree.nodes_of_type(CONTAINER_TYPE);
        assert_eq!(containers.len(), 1);
        section_keys(tree, containers[0]).expect("well-formed section")
    }

    #[test]
    fn test_import_data_shape() {
        let mut editor = editor();
        editor
            .import_html(
                "<details class=\"detailsBlock\" open><summary class=\"detailsBlockTitle\">Hi</summary>\
                 <div class=\"detailsBlockContent\"><p>Body</p></div></details>",
            )
            .unwrap();
        let keys = only_section(&editor);
        let tree = &editor.state().tree;
        assert!(tree.element::<ContainerNode>(keys.container).unwrap().is_open());
        assert_eq!(tree.text_content(keys.title), "Hi");
        assert_eq!(tree.text_content(keys.content), "Body");
    }

    #[test]
    fn test_import_closed_editing_shape() {
        let mut editor = editor();
        editor
            .import_html(
                "<div class=\"detailsBlock detailsBlockEdit detailsBlockClosed\" data-collapsible-key=\"9\">\
                 <div class=\"detailsBlockTitle\"><p>T</p></div>\
                 <div class=\"detailsBlockContent\"><p>C</p></div></div>",
            )
            .unwrap();
        let keys = only_section(&editor);
        let tree = &editor.state().tree;
        assert!(!tree.element::<ContainerNode>(keys.container).unwrap().is_open());
        assert_eq!(tree.text_content(keys.title), "T");
        assert_eq!(tree.text_content(keys.content), "C");
    }

    #[test]
    fn test_details_without_open_is_closed() {
        let mut editor = editor();
        editor
            .import_html("<details><summary>T</summary><p>loose</p></details>")
            .unwrap();
        let keys = only_section(&editor);
        let tree = &editor.state().tree;
        assert!(!tree.element::<ContainerNode>(keys.container).unwrap().is_open());
        assert_eq!(tree.text_content(keys.content), "loose");
    }

    #[test]
    fn test_missing_parts_are_created() {
        let mut editor = editor();
        editor.import_html("<details></details>").unwrap();
        let keys = only_section(&editor);
        let tree = &editor.state().tree;
        assert_eq!(tree.children(keys.title).len(), 1);
        assert_eq!(tree.children(keys.content).len(), 1);
        assert!(tree.is_paragraph(tree.children(keys.title)[0]));
    }

    #[test]
    fn test_parts_are_reordered_and_extras_merged() {
        let mut editor = editor();
        editor
            .import_html(
                "<details open><div class=\"detailsBlockContent\"><p>one</p></div>\
                 <summary>T</summary><div class=\"detailsBlockContent\"><p>two</p></div></details>",
            )
            .unwrap();
        let keys = only_section(&editor);
        let tree = &editor.state().tree;
        assert_eq!(tree.text_content(keys.title), "T");
        assert_eq!(tree.text_content(keys.content), "one\n\ntwo");
    }

    #[test]
    fn test_plain_div_is_not_a_section() {
        let mut editor = editor();
        editor.import_html("<div class=\"note\"><p>x</p></div>").unwrap();
        assert!(editor.state().tree.nodes_of_type(CONTAINER_TYPE).is_empty());
        assert_eq!(editor.export_html(), "<p>x</p>");
    }

    #[test]
    fn test_export_round_trip_shape() {
        let mut editor = editor();
        let html = "<details class=\"detailsBlock\" open><summary class=\"detailsBlockTitle\"><p>T</p></summary>\
                    <div class=\"detailsBlockContent\"><p>C</p></div></details>";
        editor.import_html(html).unwrap();
        assert_eq!(editor.export_html(), html);
    }
}

//! Node → markup export and serialization.

use super::{Element, MarkupNode};
use crate::node::{NodeKey, NodeKind};
use crate::tree::DocumentTree;

const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input", "meta", "link", "wbr"];

/// Serialize the document as data markup.
pub fn export_html(tree: &DocumentTree) -> String {
    let nodes: Vec<MarkupNode> = tree
        .children(NodeKey::ROOT)
        .iter()
        .filter_map(|key| export_node(tree, *key))
        .collect();
    render_html(&nodes)
}

fn export_node(tree: &DocumentTree, key: NodeKey) -> Option<MarkupNode> {
    let node = tree.get(key)?;
    let mut element = match node.kind() {
        NodeKind::Root => return None,
        NodeKind::Text(text) => return Some(MarkupNode::Text(text.clone())),
        NodeKind::Paragraph => Element::new("p"),
        NodeKind::Element(element) => element.export_markup(),
    };
    element.children.extend(
        node.children()
            .iter()
            .filter_map(|child| export_node(tree, *child)),
    );
    if node.is_paragraph() && element.children.is_empty() {
        element.children.push(Element::new("br").into());
    }
    Some(MarkupNode::Element(element))
}

/// Build the editing representation of the document.
///
/// The returned root is a `div` holding every top-level block. `decorate` is called for each
/// element-producing node (paragraphs and plugin elements) after its own markup is built and
/// before its children are attached.
pub fn render_editing_markup(
    tree: &DocumentTree,
    mut decorate: impl FnMut(NodeKey, &mut Element),
) -> Element {
    let mut root = Element::new("div").with_attr("data-editor-root", "");
    for child in tree.children(NodeKey::ROOT) {
        if let Some(node) = editing_node(tree, *child, &mut decorate) {
            root.children.push(node);
        }
    }
    root
}

fn editing_node(
    tree: &DocumentTree,
    key: NodeKey,
    decorate: &mut dyn FnMut(NodeKey, &mut Element),
) -> Option<MarkupNode> {
    let node = tree.get(key)?;
    let mut element = match node.kind() {
        NodeKind::Root => return None,
        NodeKind::Text(text) => return Some(MarkupNode::Text(text.clone())),
        NodeKind::Paragraph => Element::new("p"),
        NodeKind::Element(element) => element.editing_markup(key),
    };
    decorate(key, &mut element);
    for child in node.children() {
        if let Some(rendered) = editing_node(tree, *child, decorate) {
            element.children.push(rendered);
        }
    }
    if node.is_paragraph() && element.children.is_empty() {
        element.children.push(Element::new("br").into());
    }
    Some(MarkupNode::Element(element))
}

/// Serialize the document as markdown. Blocks are separated by a blank line.
pub fn export_markdown(tree: &DocumentTree) -> String {
    block_markdown(tree, tree.children(NodeKey::ROOT))
}

fn block_markdown(tree: &DocumentTree, blocks: &[NodeKey]) -> String {
    blocks
        .iter()
        .map(|key| node_markdown(tree, *key))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn node_markdown(tree: &DocumentTree, key: NodeKey) -> String {
    let Some(node) = tree.get(key) else {
        return String::new();
    };
    match node.kind() {
        NodeKind::Root => block_markdown(tree, node.children()),
        NodeKind::Text(text) => text.clone(),
        NodeKind::Paragraph => tree.text_content(key),
        NodeKind::Element(element) => {
            let children: Vec<String> = node
                .children()
                .iter()
                .map(|child| node_markdown(tree, *child))
                .collect();
            element.export_markdown(&children)
        }
    }
}

/// Serialize markup nodes as HTML.
pub fn render_html(nodes: &[MarkupNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, &mut out);
    }
    out
}

fn write_node(node: &MarkupNode, out: &mut String) {
    match node {
        MarkupNode::Element(element) => write_element(element, out),
        MarkupNode::Text(text) => escape_into(text, false, out),
    }
}

pub(super) fn write_element(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&element.tag);
    for (name, value) in &element.attrs {
        out.push(' ');
        out.push_str(name);
        if !value.is_empty() {
            out.push_str("=\"");
            escape_into(value, true, out);
            out.push('"');
        }
    }
    out.push('>');
    if VOID_ELEMENTS.contains(&element.tag.as_str()) {
        return;
    }
    for child in &element.children {
        write_node(child, out);
    }
    out.push_str("</");
    out.push_str(&element.tag);
    out.push('>');
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;

    #[test]
    fn test_export_paragraphs() {
        let mut tree = DocumentTree::with_empty_paragraph();
        let paragraph = tree.insert_detached(NodeKind::Paragraph);
        let text = tree.insert_detached(NodeKind::Text("a & b".to_string()));
        tree.link(paragraph, 0, text);
        tree.link(NodeKey::ROOT, 1, paragraph);
        assert_eq!(export_html(&tree), "<p><br></p><p>a &amp; b</p>");
        assert_eq!(export_markdown(&tree), "\n\na & b");
    }

    #[test]
    fn test_editing_markup_decorates_every_block() {
        let tree = DocumentTree::with_empty_paragraph();
        let mut seen = Vec::new();
        let root = render_editing_markup(&tree, |key, element| {
            seen.push(key);
            element.add_class("seen");
        });
        assert_eq!(seen, tree.children(NodeKey::ROOT).to_vec());
        assert_eq!(root.to_html(), "<div data-editor-root><p class=\"seen\"><br></p></div>");
    }
}

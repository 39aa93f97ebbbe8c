//! Markup → node import.

use super::{Element, MarkupNode};
use crate::error::TreeError;
use crate::node::NodeKey;
use crate::registry::ImportedElement;
use crate::transaction::Transaction;

const PARAGRAPH_TAGS: &[&str] = &["p", "h1", "h2", "h3", "h4", "h5", "h6", "pre", "li", "dt", "dd"];

const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "cite", "code", "em", "i", "kbd", "mark", "q", "s", "small", "span",
    "strong", "sub", "sup", "u",
];

/// Import block-level markup as children of `parent`.
///
/// Registered import rules are tried first (highest priority first). Paragraph-like tags become
/// paragraphs, inline runs are wrapped into paragraphs, and any other element is unwrapped so
/// that its content is imported in its place.
pub fn import_markup(
    tx: &mut Transaction<'_>,
    parent: NodeKey,
    nodes: &[MarkupNode],
) -> Result<(), TreeError> {
    let mut run: Option<NodeKey> = None;
    for node in nodes {
        match node {
            MarkupNode::Text(text) => {
                if run.is_none() && text.trim().is_empty() {
                    continue;
                }
                let paragraph = open_run(tx, parent, &mut run)?;
                append_text(tx, paragraph, text)?;
            }
            MarkupNode::Element(element) => {
                if let Some(imported) = convert(tx, element) {
                    close_run(tx, &mut run)?;
                    let key = tx.create_boxed_element(imported.node);
                    tx.append(parent, key)?;
                    import_markup(tx, key, &element.children)?;
                    if let Some(after) = imported.after {
                        after(tx, key)?;
                    }
                } else if PARAGRAPH_TAGS.contains(&element.tag.as_str()) {
                    close_run(tx, &mut run)?;
                    let paragraph = tx.create_paragraph();
                    tx.append(parent, paragraph)?;
                    import_inline(tx, paragraph, &element.children)?;
                    trim_edges(tx, paragraph)?;
                } else if element.tag == "br" {
                    close_run(tx, &mut run)?;
                } else if INLINE_TAGS.contains(&element.tag.as_str()) {
                    let paragraph = open_run(tx, parent, &mut run)?;
                    import_inline(tx, paragraph, &element.children)?;
                } else {
                    close_run(tx, &mut run)?;
                    import_markup(tx, parent, &element.children)?;
                }
            }
        }
    }
    close_run(tx, &mut run)
}

fn convert(tx: &Transaction<'_>, element: &Element) -> Option<ImportedElement> {
    tx.registry()
        .import_rules_for(&element.tag)
        .into_iter()
        .find_map(|rule| (rule.convert)(element))
}

fn open_run(
    tx: &mut Transaction<'_>,
    parent: NodeKey,
    run: &mut Option<NodeKey>,
) -> Result<NodeKey, TreeError> {
    if let Some(paragraph) = *run {
        return Ok(paragraph);
    }
    let paragraph = tx.create_paragraph();
    tx.append(parent, paragraph)?;
    *run = Some(paragraph);
    Ok(paragraph)
}

fn close_run(tx: &mut Transaction<'_>, run: &mut Option<NodeKey>) -> Result<(), TreeError> {
    match run.take() {
        Some(paragraph) => trim_edges(tx, paragraph),
        None => Ok(()),
    }
}

/// Flatten inline markup into text runs of `paragraph`.
fn import_inline(
    tx: &mut Transaction<'_>,
    paragraph: NodeKey,
    nodes: &[MarkupNode],
) -> Result<(), TreeError> {
    for node in nodes {
        match node {
            MarkupNode::Text(text) => append_text(tx, paragraph, text)?,
            MarkupNode::Element(element) if element.tag == "br" => {}
            MarkupNode::Element(element) => import_inline(tx, paragraph, &element.children)?,
        }
    }
    Ok(())
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

fn append_text(tx: &mut Transaction<'_>, paragraph: NodeKey, raw: &str) -> Result<(), TreeError> {
    let text = collapse_whitespace(raw);
    if text.is_empty() {
        return Ok(());
    }
    if let Some(last) = tx.last_child(paragraph)
        && let Some(existing) = tx.get(last).and_then(|node| node.text())
    {
        let joined = if existing.ends_with(' ') && text.starts_with(' ') {
            format!("{existing}{}", &text[1..])
        } else {
            format!("{existing}{text}")
        };
        return tx.set_text(last, joined);
    }
    let key = tx.create_text(text);
    tx.append(paragraph, key)
}

/// Drop the leading and trailing whitespace of a paragraph's text.
fn trim_edges(tx: &mut Transaction<'_>, paragraph: NodeKey) -> Result<(), TreeError> {
    let Some(text_key) = tx.first_child(paragraph).filter(|key| tx.is_text(*key)) else {
        return Ok(());
    };
    let text = tx.get(text_key).and_then(|node| node.text()).unwrap_or("");
    let trimmed = text.trim_matches(|c: char| c.is_ascii_whitespace()).to_string();
    if trimmed.is_empty() {
        tx.remove(text_key)
    } else if trimmed != text {
        tx.set_text(text_key, trimmed)
    } else {
        Ok(())
    }
}

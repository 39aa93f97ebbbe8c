//! Markup model, HTML parsing, and the import/export pipelines.
//!
//! The editor speaks a small DOM-like model ([`MarkupNode`] / [`Element`]). Both
//! representations of the document go through it:
//!
//! - **Data markup** (storage/export): produced by [`export_html`] from each element's
//!   [`ElementNode::export_markup`](crate::ElementNode::export_markup).
//! - **Editing markup** (on-screen): produced by [`render_editing_markup`] from each element's
//!   [`ElementNode::editing_markup`](crate::ElementNode::editing_markup).
//!
//! [`import_markup`] maps either shape back to nodes through the registered
//! [`ImportRule`](crate::ImportRule)s.

mod export;
mod import;
mod parser;

pub use export::{export_html, export_markdown, render_editing_markup, render_html};
pub use import::import_markup;
pub use parser::parse_html;

/// A node of the markup model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    /// An element with attributes and children.
    Element(Element),
    /// A run of (decoded) text.
    Text(String),
}

impl MarkupNode {
    /// The element, if this is one.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            MarkupNode::Element(element) => Some(element),
            MarkupNode::Text(_) => None,
        }
    }

    /// Concatenated text of the subtree.
    pub fn text_content(&self) -> String {
        match self {
            MarkupNode::Element(element) => element.text_content(),
            MarkupNode::Text(text) => text.clone(),
        }
    }
}

impl From<Element> for MarkupNode {
    fn from(element: Element) -> Self {
        MarkupNode::Element(element)
    }
}

/// An element of the markup model.
///
/// Attribute order is preserved. Tag names are stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    /// Lowercase tag name.
    pub tag: String,
    /// Attributes in source order. An empty value serializes as a bare attribute.
    pub attrs: Vec<(String, String)>,
    /// Child nodes.
    pub children: Vec<MarkupNode>,
}

impl Element {
    /// Create an element with no attributes or children.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder: set an attribute.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder: add a class token.
    pub fn with_class(mut self, class: &str) -> Self {
        self.add_class(class);
        self
    }

    /// Builder: append a child.
    pub fn with_child(mut self, child: impl Into<MarkupNode>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Attribute value by name (case-insensitive).
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether the attribute is present (with any value).
    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Set (or overwrite) an attribute.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .attrs
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(&name))
        {
            Some((_, existing)) => *existing = value,
            None => self.attrs.push((name, value)),
        }
    }

    /// Class tokens.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_ascii_whitespace()
    }

    /// Whether the class list contains exactly this token.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|token| token == class)
    }

    /// Add a class token if absent.
    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let joined = match self.attr("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {class}", existing.trim()),
            _ => class.to_string(),
        };
        self.set_attr("class", joined);
    }

    /// Concatenated text of the subtree.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                MarkupNode::Element(element) => out.push_str(&element.text_content()),
                MarkupNode::Text(text) => out.push_str(text),
            }
        }
        out
    }

    /// Child elements, skipping text.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(MarkupNode::as_element)
    }

    /// Depth-first search for the first descendant element matching `predicate`.
    pub fn find(&self, predicate: &dyn Fn(&Element) -> bool) -> Option<&Element> {
        for child in self.child_elements() {
            if predicate(child) {
                return Some(child);
            }
            if let Some(found) = child.find(predicate) {
                return Some(found);
            }
        }
        None
    }

    /// A copy of this element without children.
    pub fn shallow(&self) -> Element {
        Element {
            tag: self.tag.clone(),
            attrs: self.attrs.clone(),
            children: Vec::new(),
        }
    }

    /// Serialize as HTML.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        export::write_element(self, &mut out);
        out
    }
}

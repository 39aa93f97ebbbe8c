//! A small, lenient HTML parser for pasted and stored document markup.
//!
//! Handles comments, doctypes, void elements, self-closing tags, quoted/unquoted/bare
//! attributes, and the common named and numeric character references. Mismatched closing tags
//! close up to the nearest open element of the same name and are otherwise ignored; elements
//! left open at end of input are closed implicitly.

use super::{Element, MarkupNode};
use crate::error::MarkupError;
use regex::Regex;
use std::sync::OnceLock;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

fn tag_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9:-]*").expect("valid tag name pattern"))
}

fn attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
            .expect("valid attribute pattern")
    })
}

/// Parse an HTML fragment into markup nodes.
pub fn parse_html(input: &str) -> Result<Vec<MarkupNode>, MarkupError> {
    let mut parser = Parser {
        input,
        pos: 0,
        roots: Vec::new(),
        stack: Vec::new(),
    };
    parser.run()?;
    Ok(parser.finish())
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    roots: Vec<MarkupNode>,
    stack: Vec<Element>,
}

impl Parser<'_> {
    fn run(&mut self) -> Result<(), MarkupError> {
        while self.pos < self.input.len() {
            let rest = &self.input[self.pos..];
            if rest.starts_with("<!--") {
                let end = rest
                    .find("-->")
                    .ok_or(MarkupError::UnterminatedComment { position: self.pos })?;
                self.pos += end + 3;
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                let end = rest
                    .find('>')
                    .ok_or(MarkupError::UnterminatedTag { position: self.pos })?;
                self.pos += end + 1;
            } else if let Some(after) = rest.strip_prefix("</") {
                let end = after
                    .find('>')
                    .ok_or(MarkupError::UnterminatedTag { position: self.pos })?;
                let name = after[..end].trim().to_ascii_lowercase();
                if name.is_empty() || !tag_name_regex().is_match(&name) {
                    return Err(MarkupError::InvalidTagName { position: self.pos });
                }
                self.close(&name);
                self.pos += end + 3;
            } else if rest.starts_with('<')
                && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic())
            {
                self.open_tag()?;
            } else {
                let first = rest.chars().next().map_or(1, char::len_utf8);
                let end = rest[first..]
                    .find('<')
                    .map_or(rest.len(), |index| index + first);
                let text = decode_entities(&rest[..end]);
                self.push_node(MarkupNode::Text(text));
                self.pos += end;
            }
        }
        Ok(())
    }

    fn open_tag(&mut self) -> Result<(), MarkupError> {
        let start = self.pos;
        let rest = &self.input[start + 1..];
        let end = find_tag_end(rest).ok_or(MarkupError::UnterminatedTag { position: start })?;
        let body = &rest[..end];
        let name_match = tag_name_regex()
            .find(body)
            .ok_or(MarkupError::InvalidTagName { position: start })?;
        let mut element = Element::new(name_match.as_str());

        let mut attrs_src = &body[name_match.end()..];
        let self_closing = attrs_src.trim_end().ends_with('/');
        if self_closing {
            attrs_src = attrs_src.trim_end().trim_end_matches('/');
        }
        for caps in attr_regex().captures_iter(attrs_src) {
            let name = caps[1].to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or(String::new(), |m| decode_entities(m.as_str()));
            if !element.has_attr(&name) {
                element.attrs.push((name, value));
            }
        }
        self.pos = start + 1 + end + 1;

        if self_closing || VOID_ELEMENTS.contains(&element.tag.as_str()) {
            self.push_node(MarkupNode::Element(element));
        } else {
            self.stack.push(element);
        }
        Ok(())
    }

    fn close(&mut self, name: &str) {
        let Some(depth) = self.stack.iter().rposition(|open| open.tag == name) else {
            return;
        };
        while self.stack.len() > depth {
            self.pop_one();
        }
    }

    fn pop_one(&mut self) {
        if let Some(element) = self.stack.pop() {
            self.push_node(MarkupNode::Element(element));
        }
    }

    fn push_node(&mut self, node: MarkupNode) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }

    fn finish(mut self) -> Vec<MarkupNode> {
        while !self.stack.is_empty() {
            self.pop_one();
        }
        self.roots
    }
}

/// Byte index of the `>` closing a tag body, skipping quoted attribute values.
fn find_tag_end(body: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (index, c) in body.char_indices() {
        match (quote, c) {
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(index),
            (None, _) => {}
        }
    }
    None
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|semi| *semi <= 10).and_then(|semi| {
            let entity = &rest[1..semi];
            decode_entity(entity).map(|c| (c, semi + 1))
        });
        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let numeric = entity.strip_prefix('#')?;
            let code = match numeric.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => numeric.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

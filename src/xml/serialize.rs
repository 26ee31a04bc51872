//! Canonical rendering of an element tree.
//!
//! The output is a re-render, not a patch of the source bytes: one element
//! per line, one tab per nesting level, no blank lines. Text-only elements
//! stay on a single line and empty elements self-close. Output is always
//! UTF-8, whatever the source was decoded from, so the declaration never
//! names an encoding.

use crate::xml::tree::{Document, Element};
use quick_xml::escape::{escape, partial_escape};
use std::fmt::Write as _;

const INDENT: &str = "\t";
const DECLARATION: &str = "<?xml version=\"1.0\" ?>";

/// Render a whole document, declaration line first.
pub fn to_pretty_string(document: &Document) -> String {
    let mut lines = Vec::with_capacity(document.root.element_count() * 2 + 1);
    lines.push(DECLARATION.to_string());
    render_element(&document.root, 0, &mut lines);
    lines.join("\n")
}

impl Element {
    /// Render this subtree without a declaration line.
    pub fn to_pretty_string(&self) -> String {
        let mut lines = Vec::new();
        render_element(self, 0, &mut lines);
        lines.join("\n")
    }
}

fn render_element(element: &Element, depth: usize, lines: &mut Vec<String>) {
    let indent = INDENT.repeat(depth);
    let open = open_tag(element);
    let text = element
        .text()
        .map(str::trim)
        .filter(|text| !text.is_empty());

    match (text, element.children.is_empty()) {
        (None, true) => lines.push(format!("{indent}<{open}/>")),
        (Some(text), true) => lines.push(format!(
            "{indent}<{open}>{}</{}>",
            partial_escape(text),
            element.name
        )),
        (text, false) => {
            lines.push(format!("{indent}<{open}>"));
            if let Some(text) = text {
                lines.push(format!("{indent}{INDENT}{}", partial_escape(text)));
            }
            for child in &element.children {
                render_element(child, depth + 1, lines);
                if let Some(tail) = child.tail.as_deref().map(str::trim) {
                    if !tail.is_empty() {
                        lines.push(format!("{indent}{INDENT}{}", partial_escape(tail)));
                    }
                }
            }
            lines.push(format!("{indent}</{}>", element.name));
        }
    }
}

fn open_tag(element: &Element) -> String {
    let mut tag = element.name.clone();
    for (name, value) in &element.attributes {
        let _ = write!(tag, " {name}=\"{}\"", escape(value));
    }
    tag
}

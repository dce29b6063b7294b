//! Markup serializer for node trees.
//!
//! Extension points serialize as `<Hatch sock="...">` wrappers, the same form
//! the text emitter produces.

use lazy_static::lazy_static;
use std::collections::HashSet;

use crate::ir::{ElementNode, TemplateNode};
use crate::scanner::MARKER_INFIX;

lazy_static! {
    static ref VOID_ELEMENTS: HashSet<&'static str> = [
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
        "source", "track", "wbr",
    ]
    .into_iter()
    .collect();
}

/// Encoded socket tags (`img-af-sock-0-...`) count as their base tag.
pub fn is_void_element(tag: &str) -> bool {
    let base = tag.split(MARKER_INFIX).next().unwrap_or(tag);
    VOID_ELEMENTS.contains(base.to_ascii_lowercase().as_str())
}

pub fn render_html(nodes: &[TemplateNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, &mut out);
    }
    out
}

pub fn render_element(element: &ElementNode) -> String {
    let mut out = String::new();
    write_element(element, &mut out);
    out
}

fn write_node(node: &TemplateNode, out: &mut String) {
    match node {
        TemplateNode::Element(el) => write_element(el, out),
        TemplateNode::Text(t) => out.push_str(&escape_text(&t.value)),
        TemplateNode::Hatch(h) => {
            out.push_str(&format!("<Hatch sock=\"{}\">", escape_attr(&h.sock)));
            write_element(&h.element, out);
            out.push_str("</Hatch>");
        }
        TemplateNode::Compose(c) => {
            if let Some(element) = &c.element {
                write_node(element, out);
            }
        }
    }
}

fn write_element(element: &ElementNode, out: &mut String) {
    out.push('<');
    out.push_str(&element.tag);
    for attr in &element.attributes {
        out.push_str(&format!(" {}=\"{}\"", attr.name, escape_attr(&attr.value)));
    }

    if element.children.is_empty() && is_void_element(&element.tag) {
        out.push_str(" />");
        return;
    }

    out.push('>');
    for child in &element.children {
        write_node(child, out);
    }
    out.push_str(&format!("</{}>", element.tag));
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

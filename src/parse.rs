//! Parse Module
//!
//! HTML5-compliant document parsing into the node tree. Only the body is
//! kept; `<head>` content (scripts, styles, metadata) belongs to other
//! pipeline stages.

use html5ever::parse_document;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use tendril::TendrilSink;

use crate::error::SocketError;
use crate::ir::{AttributeIR, ElementNode, TemplateNode};

/// Body of a parsed document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedBody {
    pub attributes: Vec<AttributeIR>,
    pub children: Vec<TemplateNode>,
}

impl ParsedBody {
    /// With `wrap_body`, the content is wrapped in a `div` inheriting the
    /// body's attributes so body styling survives without a `<body>` tag.
    pub fn into_nodes(self, wrap_body: bool) -> Vec<TemplateNode> {
        if !wrap_body {
            return self.children;
        }
        vec![TemplateNode::Element(ElementNode {
            tag: "div".to_string(),
            attributes: self.attributes,
            children: self.children,
            ..Default::default()
        })]
    }
}

/// Parse a full document (or a fragment, which html5ever wraps in a body).
pub fn parse_body(html: &str, file_path: &str) -> Result<ParsedBody, SocketError> {
    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .map_err(|e| SocketError::Parse {
            file: file_path.to_string(),
            message: e.to_string(),
        })?;

    let body = find_element(&dom.document, "body").ok_or_else(|| SocketError::Parse {
        file: file_path.to_string(),
        message: "document has no body".to_string(),
    })?;

    let attributes = match &body.data {
        NodeData::Element { attrs, .. } => convert_attributes(&attrs.borrow()),
        _ => Vec::new(),
    };

    Ok(ParsedBody {
        attributes,
        children: convert_children(&body),
    })
}

fn find_element(handle: &Handle, tag: &str) -> Option<Handle> {
    if let NodeData::Element { name, .. } = &handle.data {
        if &*name.local == tag {
            return Some(handle.clone());
        }
    }
    handle
        .children
        .borrow()
        .iter()
        .find_map(|child| find_element(child, tag))
}

fn convert_children(handle: &Handle) -> Vec<TemplateNode> {
    handle
        .children
        .borrow()
        .iter()
        .filter_map(convert_node)
        .collect()
}

fn convert_node(handle: &Handle) -> Option<TemplateNode> {
    match &handle.data {
        NodeData::Element { name, attrs, .. } => Some(TemplateNode::Element(ElementNode {
            tag: name.local.to_string(),
            attributes: convert_attributes(&attrs.borrow()),
            children: convert_children(handle),
            ..Default::default()
        })),
        NodeData::Text { contents } => {
            let text = contents.borrow().to_string();
            // Formatting whitespace between tags
            if text.trim().is_empty() {
                None
            } else {
                Some(TemplateNode::text(text))
            }
        }
        NodeData::Document
        | NodeData::Doctype { .. }
        | NodeData::Comment { .. }
        | NodeData::ProcessingInstruction { .. } => None,
    }
}

fn convert_attributes(attrs: &[html5ever::Attribute]) -> Vec<AttributeIR> {
    attrs
        .iter()
        .map(|attr| {
            let name = match &attr.name.prefix {
                Some(prefix) => format!("{}:{}", prefix, attr.name.local),
                None => attr.name.local.to_string(),
            };
            AttributeIR {
                name,
                value: attr.value.to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fragment() {
        let body = parse_body(r#"<nav af-sock="nav"><a href="/">Home</a></nav>"#, "t.html")
            .unwrap();
        assert!(body.attributes.is_empty());
        assert_eq!(body.children.len(), 1);

        let nav = body.children[0].as_element().unwrap();
        assert_eq!(nav.tag, "nav");
        assert_eq!(nav.attr("af-sock"), Some("nav"));
        let link = nav.children[0].as_element().unwrap();
        assert_eq!(link.attr("href"), Some("/"));
        assert_eq!(link.children, vec![TemplateNode::text("Home")]);
    }

    #[test]
    fn test_body_is_wrapped_with_its_attributes() {
        let html = r#"<!DOCTYPE html><html><head><title>x</title></head>
            <body class="body"><!-- c --><p>Hi</p></body></html>"#;
        let nodes = parse_body(html, "t.html").unwrap().into_nodes(true);

        assert_eq!(nodes.len(), 1);
        let wrapper = nodes[0].as_element().unwrap();
        assert_eq!(wrapper.tag, "div");
        assert_eq!(wrapper.attr("class"), Some("body"));
        assert_eq!(wrapper.children.len(), 1);
        assert_eq!(wrapper.children[0].as_element().unwrap().tag, "p");
    }
}

//! Template Emitter
//!
//! Turns socket elements into `Hatch` extension points, either on converted
//! template text (`bind_sockets`, decoding tag-name suffixes) or on a node
//! tree (`bind_socket_tree`, reading the socket id side table).

use lazy_static::lazy_static;
#[cfg(feature = "napi")]
use napi_derive::napi;
use regex::Regex;
use tracing::debug;

use crate::error::SocketError;
use crate::ir::{HatchNode, TemplateNode};
use crate::scanner::{decode_payload, SocketTable, MARKER_INFIX, SOCKET_ID_ATTR};

lazy_static! {
    static ref OPEN_MARKER_RE: Regex =
        Regex::new(r"<([A-Za-z][\w.:\-]*?)-af-sock-(\d+)-([0-9A-Fa-f]+)").unwrap();
    static ref TAG_MARKER_RE: Regex =
        Regex::new(r"^([A-Za-z][\w.:\-]*?)-af-sock-(\d+)-([0-9A-Fa-f]+)$").unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEXT BINDING
// ═══════════════════════════════════════════════════════════════════════════════

/// Rewrites encoded socket tags in `source` into `<Hatch sock="...">`
/// wrappers. Paired tags are bound first (innermost first), then
/// self-closing ones. Text without markers is returned unchanged.
pub fn bind_sockets(source: &str) -> Result<String, SocketError> {
    if !source.contains(MARKER_INFIX) {
        return Ok(source.to_string());
    }
    let paired = bind_pairs(source)?;
    bind_self_closing(&paired)
}

struct OpenTag<'s> {
    start: usize,
    end: usize,
    tag: &'s str,
    marker_tag: &'s str,
    payload: &'s str,
    attrs: &'s str,
    self_closing: bool,
}

/// Next encoded opening tag at or after `from`.
fn next_open_tag(source: &str, from: usize) -> Result<Option<OpenTag<'_>>, SocketError> {
    let mut search = from;
    while let Some(caps) = OPEN_MARKER_RE.captures_at(source, search) {
        let (Some(whole), Some(tag), Some(payload)) = (caps.get(0), caps.get(1), caps.get(3)) else {
            break;
        };

        // The payload must end the tag name
        let boundary = source[whole.end()..].chars().next();
        if !matches!(boundary, Some(c) if c.is_whitespace() || c == '/' || c == '>') {
            search = whole.end();
            continue;
        }

        let marker_tag = &source[whole.start() + 1..whole.end()];
        let end = find_tag_end(source, whole.end()).ok_or_else(|| SocketError::MalformedEncodedMarker {
            marker: marker_tag.to_string(),
            reason: "unterminated tag".to_string(),
        })?;

        let body = source[whole.end()..end - 1].trim_end();
        let (attrs, self_closing) = match body.strip_suffix('/') {
            Some(attrs) => (attrs, true),
            None => (body, false),
        };

        return Ok(Some(OpenTag {
            start: whole.start(),
            end,
            tag: tag.as_str(),
            marker_tag,
            payload: payload.as_str(),
            attrs,
            self_closing,
        }));
    }
    Ok(None)
}

fn bind_pairs(source: &str) -> Result<String, SocketError> {
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;

    while let Some(open) = next_open_tag(source, cursor)? {
        if open.self_closing {
            out.push_str(&source[cursor..open.end]);
            cursor = open.end;
            continue;
        }

        let close = format!("</{}>", open.marker_tag);
        let close_at = source[open.end..]
            .find(&close)
            .map(|i| open.end + i)
            .ok_or_else(|| SocketError::MalformedEncodedMarker {
                marker: open.marker_tag.to_string(),
                reason: "missing closing tag".to_string(),
            })?;

        let sock = decode_payload(open.payload)?;
        let inner = bind_sockets(&source[open.end..close_at])?;

        out.push_str(&source[cursor..open.start]);
        out.push_str(&format!(
            "<Hatch sock=\"{}\"><{}>{}</{}></Hatch>",
            sock,
            element_and_attrs(open.tag, open.attrs),
            inner,
            open.tag
        ));
        cursor = close_at + close.len();
    }

    out.push_str(&source[cursor..]);
    Ok(out)
}

fn bind_self_closing(source: &str) -> Result<String, SocketError> {
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;

    while let Some(open) = next_open_tag(source, cursor)? {
        out.push_str(&source[cursor..open.start]);
        if open.self_closing {
            let sock = decode_payload(open.payload)?;
            out.push_str(&format!(
                "<Hatch sock=\"{}\"><{} /></Hatch>",
                sock,
                element_and_attrs(open.tag, open.attrs)
            ));
        } else {
            out.push_str(&source[open.start..open.end]);
        }
        cursor = open.end;
    }

    out.push_str(&source[cursor..]);
    Ok(out)
}

fn element_and_attrs(tag: &str, attrs: &str) -> String {
    format!("{} {}", tag, attrs.trim_start()).trim_end().to_string()
}

/// Index just past the `>` closing the tag whose attributes start at `from`.
/// Quotes and `{...}` expressions may contain `>`.
fn find_tag_end(source: &str, from: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut prev = ' ';

    for (i, c) in source[from..].char_indices() {
        match quote {
            Some(q) if c == q && prev != '\\' => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '{' => depth += 1,
                '}' => depth = depth.saturating_sub(1),
                '>' if depth == 0 => return Some(from + i + 1),
                _ => {}
            },
        }
        prev = c;
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════════
// STRUCTURAL BINDING
// ═══════════════════════════════════════════════════════════════════════════════

/// Wraps every socket element of `nodes` in a `Hatch`. Elements are found by
/// their socket id attribute, or by an encoded tag-name suffix when the tree
/// went through a text round-trip.
pub fn bind_socket_tree(
    nodes: Vec<TemplateNode>,
    table: &SocketTable,
) -> Result<Vec<TemplateNode>, SocketError> {
    let mut bound = 0usize;
    let nodes = bind_nodes(nodes, table, &mut bound)?;
    debug!(sockets = bound, "bound socket tree");
    Ok(nodes)
}

fn bind_nodes(
    nodes: Vec<TemplateNode>,
    table: &SocketTable,
    bound: &mut usize,
) -> Result<Vec<TemplateNode>, SocketError> {
    nodes
        .into_iter()
        .map(|node| bind_node(node, table, bound))
        .collect()
}

fn bind_node(node: TemplateNode, table: &SocketTable, bound: &mut usize) -> Result<TemplateNode, SocketError> {
    let mut el = match node {
        TemplateNode::Element(el) => el,
        other => return Ok(other),
    };

    el.children = bind_nodes(std::mem::take(&mut el.children), table, bound)?;

    let sock = match el.remove_attr(SOCKET_ID_ATTR) {
        Some(id) => Some(lookup(table, &id)?),
        None => {
            let decoded = TAG_MARKER_RE
                .captures(&el.tag)
                .map(|caps| (caps[1].to_string(), decode_payload(&caps[3])));
            match decoded {
                Some((tag, sock)) => {
                    el.tag = tag;
                    Some(sock?)
                }
                None => None,
            }
        }
    };

    Ok(match sock {
        Some(sock) => {
            *bound += 1;
            TemplateNode::Hatch(HatchNode { sock, element: el })
        }
        None => TemplateNode::Element(el),
    })
}

fn lookup(table: &SocketTable, id: &str) -> Result<String, SocketError> {
    id.trim()
        .parse::<u32>()
        .ok()
        .and_then(|id| table.get(id))
        .map(|entry| entry.name.clone())
        .ok_or_else(|| SocketError::MalformedEncodedMarker {
            marker: format!("{}=\"{}\"", SOCKET_ID_ATTR, id),
            reason: "unknown socket id".to_string(),
        })
}

#[cfg(feature = "napi")]
#[napi]
pub fn bind_sockets_native(source: String) -> napi::Result<String> {
    bind_sockets(&source).map_err(|e| napi::Error::from_reason(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::encode_marker;
    use pretty_assertions::assert_eq;

    fn tag(name: &str, index: u32, sock: &str) -> String {
        format!("{}{}", name, encode_marker(index, sock))
    }

    #[test]
    fn test_no_markers_is_identity() {
        let source = r#"<div className="a"><img src="b" /></div>"#;
        assert_eq!(bind_sockets(source).unwrap(), source);
    }

    #[test]
    fn test_paired_tags_bind_innermost_first() {
        let nav = tag("nav", 0, "nav");
        let link = tag("a", 1, "home");
        let source = format!(
            r#"<div><{nav} className="top"><{link} href="/">Home</{link}></{nav}></div>"#
        );

        assert_eq!(
            bind_sockets(&source).unwrap(),
            concat!(
                r#"<div><Hatch sock="nav"><nav className="top">"#,
                r#"<Hatch sock="home"><a href="/">Home</a></Hatch>"#,
                r#"</nav></Hatch></div>"#
            )
        );
    }

    #[test]
    fn test_self_closing_tags() {
        let img = tag("img", 3, "logo");
        let source = format!(r#"<header><{img} src="/l.png" alt="x > y"/><{img}/></header>"#);
        assert_eq!(
            bind_sockets(&source).unwrap(),
            concat!(
                r#"<header><Hatch sock="logo"><img src="/l.png" alt="x > y" /></Hatch>"#,
                r#"<Hatch sock="logo"><img /></Hatch></header>"#
            )
        );
    }

    #[test]
    fn test_binding_is_idempotent() {
        let source = format!("<{t}>x</{t}>", t = tag("p", 0, "lead"));
        let once = bind_sockets(&source).unwrap();
        assert_eq!(bind_sockets(&once).unwrap(), once);
    }

    #[test]
    fn test_undecodable_payload_is_fatal() {
        let err = bind_sockets("<p-af-sock-0-7b7a>x</p-af-sock-0-7b7a>").unwrap_err();
        assert_eq!(err.code(), crate::error::ERR_MALFORMED_MARKER);

        let err = bind_sockets(&format!("<{}>x", tag("p", 0, "lead"))).unwrap_err();
        assert!(matches!(err, SocketError::MalformedEncodedMarker { reason, .. } if reason == "missing closing tag"));
    }

    #[test]
    fn test_structural_binding_reads_side_table() {
        let nodes = vec![crate::ir::ElementNode::new("ul")
            .with_child(crate::ir::ElementNode::new("li").with_attr("af-sock", "item"))
            .into()];
        let doc = crate::scanner::scan(nodes, "list").unwrap();
        let bound = bind_socket_tree(doc.nodes.clone(), &doc.table).unwrap();

        let ul = bound[0].as_element().unwrap();
        match &ul.children[0] {
            TemplateNode::Hatch(h) => {
                assert_eq!(h.sock, "item");
                assert_eq!(h.element.tag, "li");
                assert!(h.element.attributes.is_empty());
            }
            other => panic!("expected hatch, got {:?}", other),
        }

        // Same result through tag-name suffixes
        let from_tags = bind_socket_tree(doc.encode_tag_names(), &SocketTable::default()).unwrap();
        assert_eq!(from_tags, bound);
    }

    #[test]
    fn test_unknown_socket_id_is_fatal() {
        let nodes = vec![crate::ir::ElementNode::new("p").with_attr(SOCKET_ID_ATTR, "9").into()];
        let err = bind_socket_tree(nodes, &SocketTable::default()).unwrap_err();
        assert_eq!(err.code(), crate::error::ERR_MALFORMED_MARKER);
    }
}

//! Socket Scanner
//!
//! Compile-time discovery of `af-sock` annotated elements:
//! 1. Document preparation (`af-ignore`, `af-empty`, inline script removal,
//!    absolute `href`/`src`, `af-view` alias).
//! 2. Name validation and normalization, with the ancestor namespace in errors.
//! 3. Socket tree construction, keyed by name at each nesting level.
//! 4. Identity assignment: each socket element receives a synthetic id
//!    (`data-af-sock-id`) recorded in the `SocketTable` side table.
//!
//! The tag-suffix encoding (`<tag>-af-sock-<index>-<payload>`) is produced on
//! demand for converters that only round-trip markup text.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SocketError;
use crate::exporter::SocketSpec;
use crate::ir::{ElementNode, TemplateNode};
use crate::naming;
use crate::visitor::{walk_children, walk_element, TemplateVisitor};

pub const SOCK_ATTR: &str = "af-sock";
pub const VIEW_ATTR: &str = "af-view";
pub const IGNORE_ATTR: &str = "af-ignore";
pub const EMPTY_ATTR: &str = "af-empty";
pub const LEGACY_ATTRS: [&str; 2] = ["af-repeat", "af-el"];

/// Synthetic identity of a socket element; structural conversions must keep it.
pub const SOCKET_ID_ATTR: &str = "data-af-sock-id";

pub const MARKER_INFIX: &str = "-af-sock-";

/// Attributes holding document-relative URLs.
pub const URL_ATTRS: [&str; 2] = ["href", "src"];

lazy_static! {
    static ref SCHEME_RE: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").unwrap();
    static ref DOT_PREFIX_RE: Regex = Regex::new(r"^[./]+").unwrap();
    static ref JAVASCRIPT_TYPE_RE: Regex = Regex::new(r"(?i)javascript").unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// SOCKET TREE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SocketTree(pub IndexMap<String, SocketTreeNode>);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketTreeNode {
    /// Tag of the first element declaring this socket.
    pub tag: String,
    pub path: String,
    pub children: SocketTree,
}

impl SocketTree {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lookup by dotted path relative to this level, e.g. `form.first`.
    pub fn get(&self, relative: &str) -> Option<&SocketTreeNode> {
        let mut parts = relative.split('.');
        let mut node = self.0.get(parts.next()?)?;
        for part in parts {
            node = node.children.0.get(part)?;
        }
        Some(node)
    }

    /// All full paths, depth-first.
    pub fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        for node in self.0.values() {
            out.push(node.path.clone());
            out.extend(node.children.paths());
        }
        out
    }

    pub fn to_spec(&self) -> SocketSpec {
        SocketSpec(
            self.0
                .iter()
                .map(|(name, node)| {
                    let nested = (!node.children.is_empty()).then(|| node.children.to_spec());
                    (name.clone(), nested)
                })
                .collect(),
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SIDE TABLE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketEntry {
    pub id: u32,
    pub name: String,
    pub path: String,
    pub tag: String,
}

/// Socket metadata keyed by synthetic element id (document order).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SocketTable(pub Vec<SocketEntry>);

impl SocketTable {
    pub fn get(&self, id: u32) -> Option<&SocketEntry> {
        self.0.get(id as usize).filter(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A JavaScript `<script>` lifted out of the template. The host loads it once
/// the view is mounted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default)]
    pub is_async: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedDocument {
    pub namespace: String,
    pub nodes: Vec<TemplateNode>,
    pub tree: SocketTree,
    pub table: SocketTable,
    /// Scripts removed from `nodes`, document order.
    pub scripts: Vec<ScriptRef>,
}

impl ScannedDocument {
    /// Copy of the nodes with socket identity moved into tag-name suffixes.
    pub fn encode_tag_names(&self) -> Vec<TemplateNode> {
        let mut nodes = self.nodes.clone();
        let mut encoder = MarkerEncoder { table: &self.table };
        encoder.visit_children(&mut nodes);
        nodes
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCANNING
// ═══════════════════════════════════════════════════════════════════════════════

/// Scan `nodes` for sockets under the root `namespace`.
pub fn scan(mut nodes: Vec<TemplateNode>, namespace: &str) -> Result<ScannedDocument, SocketError> {
    IgnorePass.visit_children(&mut nodes);
    EmptyPass.visit_children(&mut nodes);
    UrlPass.visit_children(&mut nodes);
    let mut scripts = ScriptPass::default();
    scripts.visit_children(&mut nodes);
    ViewAliasPass.visit_children(&mut nodes);

    let mut scanner = Scanner {
        namespace,
        table: Vec::new(),
    };
    let mut tree = SocketTree::default();
    let mut ancestors = Vec::new();
    scanner.scan_children(&mut nodes, &mut ancestors, &mut tree)?;

    debug!(
        namespace,
        sockets = scanner.table.len(),
        scripts = scripts.0.len(),
        "scanned document sockets"
    );

    Ok(ScannedDocument {
        namespace: namespace.to_string(),
        nodes,
        tree,
        table: SocketTable(scanner.table),
        scripts: scripts.0,
    })
}

struct Scanner<'a> {
    namespace: &'a str,
    table: Vec<SocketEntry>,
}

impl Scanner<'_> {
    fn scan_children(
        &mut self,
        children: &mut [TemplateNode],
        ancestors: &mut Vec<String>,
        tree: &mut SocketTree,
    ) -> Result<(), SocketError> {
        for node in children.iter_mut() {
            if let TemplateNode::Element(el) = node {
                self.scan_element(el, ancestors, tree)?;
            }
        }
        Ok(())
    }

    fn scan_element(
        &mut self,
        el: &mut ElementNode,
        ancestors: &mut Vec<String>,
        tree: &mut SocketTree,
    ) -> Result<(), SocketError> {
        el.remove_attr(SOCKET_ID_ATTR);
        for attr in LEGACY_ATTRS {
            el.remove_attr(attr);
        }

        let name = match el.remove_attr(SOCK_ATTR) {
            Some(raw) => naming::validate_name(&raw, &self.namespace_of(ancestors))?,
            None => None,
        };

        let Some(name) = name else {
            return self.scan_children(&mut el.children, ancestors, tree);
        };

        let id = self.table.len() as u32;
        let path = join_path(&self.namespace_of(ancestors), &name);
        el.set_attr(SOCKET_ID_ATTR, id.to_string());
        self.table.push(SocketEntry {
            id,
            name: name.clone(),
            path: path.clone(),
            tag: el.tag.clone(),
        });

        // Repeated names at one level share an entry; the first tag wins.
        let entry = tree
            .0
            .entry(name.clone())
            .or_insert_with(|| SocketTreeNode {
                tag: el.tag.clone(),
                path,
                children: SocketTree::default(),
            });

        ancestors.push(name);
        let result = self.scan_children(&mut el.children, ancestors, &mut entry.children);
        ancestors.pop();
        result
    }

    fn namespace_of(&self, ancestors: &[String]) -> String {
        std::iter::once(self.namespace)
            .chain(ancestors.iter().map(String::as_str))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(".")
    }
}

fn join_path(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", namespace, name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PREPARATION PASSES
// ═══════════════════════════════════════════════════════════════════════════════

/// Drops `af-ignore` elements with their subtree.
struct IgnorePass;

impl TemplateVisitor for IgnorePass {
    fn visit_children(&mut self, children: &mut Vec<TemplateNode>) {
        children.retain(|node| !matches!(node, TemplateNode::Element(el) if el.has_attr(IGNORE_ATTR)));
        walk_children(self, children);
    }
}

/// Empties `af-empty` elements.
struct EmptyPass;

impl TemplateVisitor for EmptyPass {
    fn visit_element(&mut self, element: &mut ElementNode) {
        if element.remove_attr(EMPTY_ATTR).is_some() {
            element.children.clear();
        }
        walk_element(self, element);
    }
}

/// Makes `href`/`src` values absolute.
struct UrlPass;

impl TemplateVisitor for UrlPass {
    fn visit_element(&mut self, element: &mut ElementNode) {
        for attr in element.attributes.iter_mut() {
            if URL_ATTRS.contains(&attr.name.as_str()) {
                attr.value = absolute_href(&attr.value);
            }
        }
        walk_element(self, element);
    }
}

/// `css/site.css` and `../../css/site.css` -> `/css/site.css`. Empty values,
/// root paths, fragments and URLs with a scheme (`https:`, `mailto:`) are kept.
pub fn absolute_href(href: &str) -> String {
    if href.is_empty() || href.starts_with('/') || href.starts_with('#') || SCHEME_RE.is_match(href) {
        return href.to_string();
    }
    format!("/{}", DOT_PREFIX_RE.replace(href, ""))
}

/// Lifts JavaScript `<script>` elements out of the tree. Scripts whose
/// `type` names another language (templates, JSON data) stay in place.
#[derive(Default)]
struct ScriptPass(Vec<ScriptRef>);

impl ScriptPass {
    fn is_javascript(el: &ElementNode) -> bool {
        el.tag.eq_ignore_ascii_case("script")
            && el.attr("type").map_or(true, |t| t.is_empty() || JAVASCRIPT_TYPE_RE.is_match(t))
    }
}

impl TemplateVisitor for ScriptPass {
    fn visit_children(&mut self, children: &mut Vec<TemplateNode>) {
        let mut kept = Vec::with_capacity(children.len());
        for node in children.drain(..) {
            match node {
                TemplateNode::Element(el) if Self::is_javascript(&el) => {
                    let src = el.attr("src").filter(|s| !s.is_empty()).map(str::to_string);
                    let body = match src {
                        Some(_) => None,
                        None => Some(
                            el.children
                                .iter()
                                .filter_map(|c| match c {
                                    TemplateNode::Text(t) => Some(t.value.as_str()),
                                    _ => None,
                                })
                                .collect::<String>(),
                        ),
                    };
                    self.0.push(ScriptRef {
                        src,
                        body,
                        is_async: el.has_attr("async"),
                    });
                }
                other => kept.push(other),
            }
        }
        *children = kept;
        walk_children(self, children);
    }
}

/// `af-view="x"` declares socket `x` unless `af-sock` is already set.
struct ViewAliasPass;

impl TemplateVisitor for ViewAliasPass {
    fn visit_element(&mut self, element: &mut ElementNode) {
        if let Some(view) = element.remove_attr(VIEW_ATTR) {
            let has_sock = element.attr(SOCK_ATTR).is_some_and(|s| !s.is_empty());
            if !has_sock {
                element.set_attr(SOCK_ATTR, view);
            }
        }
        walk_element(self, element);
    }
}

struct MarkerEncoder<'t> {
    table: &'t SocketTable,
}

impl TemplateVisitor for MarkerEncoder<'_> {
    fn visit_element(&mut self, element: &mut ElementNode) {
        let entry = element
            .attr(SOCKET_ID_ATTR)
            .and_then(|id| id.parse::<u32>().ok())
            .and_then(|id| self.table.get(id));
        if let Some(entry) = entry {
            let (id, name) = (entry.id, entry.name.clone());
            encode(element, id, &name);
        }
        walk_element(self, element);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TAG-SUFFIX ENCODING
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize, Deserialize)]
struct MarkerPayload {
    sock: String,
}

/// `-af-sock-<index>-<payload>`; the payload is lowercase hex of
/// `{"sock":"<name>"}` so it survives case-folding markup parsers.
pub fn encode_marker(index: u32, name: &str) -> String {
    let payload = serde_json::json!({ "sock": name }).to_string();
    format!("{}{}-{}", MARKER_INFIX, index, hex::encode(payload))
}

/// Moves socket identity into the element's tag name.
pub fn encode(element: &mut ElementNode, index: u32, name: &str) {
    element.tag.push_str(&encode_marker(index, name));
    element.remove_attr(SOCK_ATTR);
    element.remove_attr(SOCKET_ID_ATTR);
}

pub fn decode_payload(payload: &str) -> Result<String, SocketError> {
    let malformed = |reason: String| SocketError::MalformedEncodedMarker {
        marker: payload.to_string(),
        reason,
    };
    let bytes = hex::decode(payload).map_err(|e| malformed(e.to_string()))?;
    let decoded: MarkerPayload =
        serde_json::from_slice(&bytes).map_err(|e| malformed(e.to_string()))?;
    Ok(decoded.sock)
}

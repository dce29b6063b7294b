//! Socket tree export.
//!
//! `define_sock` turns a nested `SocketSpec` into an immutable `SockNode`
//! whose every level carries its own full path under the reserved `""` key,
//! so a node can be used both to reach nested sockets and as a path value.
//!
//! ```text
//! define_sock("login", { form: { first: null } })
//!   => { form: { first: "login.form.first", "": "login.form" }, "": "login" }
//! ```

use indexmap::IndexMap;
#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};
use std::ops::Index;

use crate::error::SocketError;

/// Reserved key holding a node's own path.
pub const SELF_KEY: &str = "";

/// Nested socket description; leaves are `None` (`null` in JSON).
///
/// The reserved `""` key is rejected when deserializing at any level.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(
    into = "IndexMap<String, Option<SocketSpec>>",
    try_from = "IndexMap<String, Option<SocketSpec>>"
)]
pub struct SocketSpec(pub IndexMap<String, Option<SocketSpec>>);

impl SocketSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, SocketError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn leaf(mut self, name: impl Into<String>) -> Self {
        self.0.insert(name.into(), None);
        self
    }

    pub fn node(mut self, name: impl Into<String>, spec: SocketSpec) -> Self {
        self.0.insert(name.into(), Some(spec));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Option<SocketSpec>)> {
        self.0.iter()
    }
}

impl From<SocketSpec> for IndexMap<String, Option<SocketSpec>> {
    fn from(spec: SocketSpec) -> Self {
        spec.0
    }
}

impl TryFrom<IndexMap<String, Option<SocketSpec>>> for SocketSpec {
    type Error = String;

    fn try_from(entries: IndexMap<String, Option<SocketSpec>>) -> Result<Self, Self::Error> {
        if entries.contains_key(SELF_KEY) {
            return Err("socket spec key \"\" is reserved for the node's own path".to_string());
        }
        Ok(SocketSpec(entries))
    }
}

/// A socket addressed either by path string or by exported node. Exported
/// nodes hold these as their entries: leaves are paths, inner sockets nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnySock {
    Path(String),
    Node(SockNode),
}

impl AnySock {
    pub fn resolve(&self) -> &str {
        match self {
            AnySock::Path(path) => path,
            AnySock::Node(node) => node.path(),
        }
    }

    pub fn as_node(&self) -> Option<&SockNode> {
        match self {
            AnySock::Node(node) => Some(node),
            AnySock::Path(_) => None,
        }
    }
}

/// Absent → `""`, path → itself, node → its reserved `""` entry.
pub fn resolve_sock(sock: Option<&AnySock>) -> &str {
    sock.map(AnySock::resolve).unwrap_or_default()
}

impl From<&str> for AnySock {
    fn from(path: &str) -> Self {
        AnySock::Path(path.to_string())
    }
}

impl From<String> for AnySock {
    fn from(path: String) -> Self {
        AnySock::Path(path)
    }
}

impl From<SockNode> for AnySock {
    fn from(node: SockNode) -> Self {
        AnySock::Node(node)
    }
}

impl From<&SockNode> for AnySock {
    fn from(node: &SockNode) -> Self {
        AnySock::Node(node.clone())
    }
}

/// One exported level of a socket tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    into = "IndexMap<String, AnySock>",
    try_from = "IndexMap<String, AnySock>"
)]
pub struct SockNode {
    entries: IndexMap<String, AnySock>,
}

impl SockNode {
    pub fn path(&self) -> &str {
        self.entries
            .get(SELF_KEY)
            .map(AnySock::resolve)
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&AnySock> {
        self.entries.get(key)
    }

    pub fn node(&self, key: &str) -> Option<&SockNode> {
        self.get(key).and_then(AnySock::as_node)
    }

    /// Socket names at this level, excluding the reserved key.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .keys()
            .map(String::as_str)
            .filter(|k| *k != SELF_KEY)
    }

    /// Every path under this node (itself first), depth-first.
    pub fn paths(&self) -> Vec<String> {
        let mut out = vec![self.path().to_string()];
        for name in self.names() {
            match &self.entries[name] {
                AnySock::Path(path) => out.push(path.clone()),
                AnySock::Node(node) => out.extend(node.paths()),
            }
        }
        out
    }
}

impl Index<&str> for SockNode {
    type Output = AnySock;

    fn index(&self, key: &str) -> &AnySock {
        &self.entries[key]
    }
}

impl From<SockNode> for IndexMap<String, AnySock> {
    fn from(node: SockNode) -> Self {
        node.entries
    }
}

impl TryFrom<IndexMap<String, AnySock>> for SockNode {
    type Error = String;

    fn try_from(entries: IndexMap<String, AnySock>) -> Result<Self, Self::Error> {
        match entries.get(SELF_KEY) {
            Some(AnySock::Path(_)) => Ok(SockNode { entries }),
            _ => Err("sock node is missing its \"\" path entry".to_string()),
        }
    }
}

/// Builds the exported tree rooted at `name`. A `""` key placed in `spec`
/// through the builder is skipped; that slot always holds the node's path.
pub fn define_sock(name: &str, spec: &SocketSpec) -> SockNode {
    let mut entries: IndexMap<String, AnySock> = spec
        .iter()
        .filter(|(key, _)| key.as_str() != SELF_KEY)
        .map(|(key, value)| {
            let full = format!("{}.{}", name, key);
            let value = match value {
                Some(nested) => AnySock::Node(define_sock(&full, nested)),
                None => AnySock::Path(full),
            };
            (key.clone(), value)
        })
        .collect();
    entries.insert(SELF_KEY.to_string(), AnySock::Path(name.to_string()));
    SockNode { entries }
}

#[cfg(feature = "napi")]
#[napi]
pub fn define_sock_native(name: String, spec: serde_json::Value) -> napi::Result<serde_json::Value> {
    let spec: SocketSpec = serde_json::from_value(spec)
        .map_err(|e| napi::Error::from_reason(SocketError::from(e).to_string()))?;
    serde_json::to_value(define_sock(&name, &spec)).map_err(|e| napi::Error::from_reason(e.to_string()))
}

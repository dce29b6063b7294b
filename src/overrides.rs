//! Override declarations: modes, content shapes, target resolution and
//! grouping by relative socket path.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::EngineConfig;
use crate::error::SocketError;
use crate::exporter::AnySock;
use crate::ir::{AttributeIR, ElementNode, TemplateNode};

// ═══════════════════════════════════════════════════════════════════════════════
// DECLARATIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverrideMode {
    /// Keep the template element, replace its children.
    #[default]
    ContentOnly,
    /// Emit the override content in place of the template element.
    ReplaceAll,
    /// Overlay the override element onto the template element.
    Merge,
}

impl fmt::Display for OverrideMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OverrideMode::ContentOnly => "contentOnly",
            OverrideMode::ReplaceAll => "replaceAll",
            OverrideMode::Merge => "merge",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverrideContent {
    #[default]
    Empty,
    Text(String),
    Element(ElementNode),
    Children(Vec<TemplateNode>),
}

impl OverrideContent {
    pub fn is_empty(&self) -> bool {
        match self {
            OverrideContent::Empty => true,
            OverrideContent::Children(children) => children.is_empty(),
            OverrideContent::Text(_) | OverrideContent::Element(_) => false,
        }
    }

    /// The single structured element merge mode works with, if any.
    pub fn as_single_element(&self) -> Option<&ElementNode> {
        match self {
            OverrideContent::Element(el) => Some(el),
            OverrideContent::Children(children) if children.len() == 1 => children[0].as_element(),
            _ => None,
        }
    }
}

impl From<ElementNode> for OverrideContent {
    fn from(el: ElementNode) -> Self {
        OverrideContent::Element(el)
    }
}

impl From<&str> for OverrideContent {
    fn from(text: &str) -> Self {
        OverrideContent::Text(text.to_string())
    }
}

impl From<Vec<TemplateNode>> for OverrideContent {
    fn from(children: Vec<TemplateNode>) -> Self {
        OverrideContent::Children(children)
    }
}

/// `{ target, mode?, content?, key? }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideDecl {
    pub target: AnySock,
    #[serde(default)]
    pub mode: OverrideMode,
    #[serde(default)]
    pub content: OverrideContent,
    /// Identity handle for the emitted instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl OverrideDecl {
    pub fn new(target: impl Into<AnySock>) -> Self {
        Self {
            target: target.into(),
            mode: OverrideMode::default(),
            content: OverrideContent::Empty,
            key: None,
        }
    }

    pub fn content_only(mut self, content: impl Into<OverrideContent>) -> Self {
        self.mode = OverrideMode::ContentOnly;
        self.content = content.into();
        self
    }

    pub fn replace_all(mut self, content: impl Into<OverrideContent>) -> Self {
        self.mode = OverrideMode::ReplaceAll;
        self.content = content.into();
        self
    }

    pub fn merge(mut self, content: impl Into<OverrideContent>) -> Self {
        self.mode = OverrideMode::Merge;
        self.content = content.into();
        self
    }

    pub fn with_mode(mut self, mode: OverrideMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESOLUTION & GROUPING
// ═══════════════════════════════════════════════════════════════════════════════

/// One validated declaration; `order` indexes the declaration list it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideItem {
    pub sock: String,
    pub mode: OverrideMode,
    pub order: usize,
}

/// Relative socket path → items in declaration order.
pub type OverrideGroups = IndexMap<String, Vec<OverrideItem>>;

/// `nav.home` under `nav` → `home`.
pub fn relative_sock<'s>(sock: &'s str, namespace: &str) -> Option<&'s str> {
    sock.strip_prefix(namespace)
        .and_then(|rest| rest.strip_prefix('.'))
        .filter(|rest| !rest.is_empty())
}

/// Resolves the target against `namespace`, then against the root namespace.
pub fn resolve_target<'s>(target: &'s str, namespace: &str) -> Result<&'s str, SocketError> {
    relative_sock(target, namespace)
        .or_else(|| relative_sock(target, ""))
        .ok_or_else(|| SocketError::InvalidOverrideTarget {
            namespace: namespace.to_string(),
            target: target.to_string(),
        })
}

pub fn validate(decl: &OverrideDecl, order: usize, namespace: &str) -> Result<OverrideItem, SocketError> {
    let target = decl.target.resolve();
    let sock = resolve_target(target, namespace)?;

    if decl.mode == OverrideMode::Merge
        && !decl.content.is_empty()
        && decl.content.as_single_element().is_none()
    {
        return Err(SocketError::InvalidOverrideShape {
            namespace: namespace.to_string(),
            target: target.to_string(),
            mode: decl.mode,
            reason: "requires a single element".to_string(),
        });
    }

    Ok(OverrideItem {
        sock: sock.to_string(),
        mode: decl.mode,
        order,
    })
}

/// Validates every declaration and groups them, first-seen order.
pub fn group(decls: &[OverrideDecl], namespace: &str) -> Result<OverrideGroups, SocketError> {
    let mut groups = OverrideGroups::new();
    for (order, decl) in decls.iter().enumerate() {
        let item = validate(decl, order, namespace)?;
        groups.entry(item.sock.clone()).or_default().push(item);
    }
    Ok(groups)
}

// ═══════════════════════════════════════════════════════════════════════════════
// ATTRIBUTE MERGE
// ═══════════════════════════════════════════════════════════════════════════════

/// Overlays `layers` onto `base` in order. List-valued attributes (per
/// `config`) are space-joined instead of overwritten.
pub fn merge_attributes(
    config: &EngineConfig,
    base: &[AttributeIR],
    layers: &[&[AttributeIR]],
) -> Vec<AttributeIR> {
    let mut out = ElementNode {
        attributes: base.to_vec(),
        ..Default::default()
    };

    for layer in layers {
        for attr in layer.iter() {
            let joined = match out.attr(&attr.name) {
                Some(existing) if config.is_list_attribute(&attr.name) => [existing, attr.value.as_str()]
                    .iter()
                    .filter(|v| !v.is_empty())
                    .copied()
                    .collect::<Vec<_>>()
                    .join(" "),
                _ => attr.value.clone(),
            };
            out.set_attr(attr.name.clone(), joined);
        }
    }

    out.attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_relative_sock() {
        assert_eq!(relative_sock("nav.home", "nav"), Some("home"));
        assert_eq!(relative_sock("nav.home.icon", "nav"), Some("home.icon"));
        assert_eq!(relative_sock("navbar.home", "nav"), None);
        assert_eq!(relative_sock("nav", "nav"), None);
        assert_eq!(relative_sock(".home", ""), Some("home"));
        assert_eq!(relative_sock("nav.home", ""), None);
    }

    #[test]
    fn test_resolve_target_against_namespace_then_root() {
        assert_eq!(resolve_target("nav.home", "nav").unwrap(), "home");
        assert_eq!(resolve_target(".home", "nav").unwrap(), "home");

        let err = resolve_target("nav.home", "").unwrap_err();
        assert_eq!(
            err,
            SocketError::InvalidOverrideTarget {
                namespace: String::new(),
                target: "nav.home".to_string(),
            }
        );
    }

    #[test]
    fn test_group_preserves_first_seen_order() {
        let decls = vec![
            OverrideDecl::new("list.item").content_only("one"),
            OverrideDecl::new("list.title").content_only("Title"),
            OverrideDecl::new("list.item").content_only("two"),
        ];
        let groups = group(&decls, "list").unwrap();

        assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["item", "title"]);
        assert_eq!(
            groups["item"].iter().map(|i| i.order).collect::<Vec<_>>(),
            vec![0, 2]
        );
    }

    #[test]
    fn test_merge_shape_validation() {
        let ok = OverrideDecl::new("a.b").merge(ElementNode::new("a"));
        assert!(validate(&ok, 0, "a").is_ok());

        let empty = OverrideDecl::new("a.b").with_mode(OverrideMode::Merge);
        assert!(validate(&empty, 0, "a").is_ok());

        let single_child = OverrideDecl::new("a.b").merge(vec![TemplateNode::from(ElementNode::new("a"))]);
        assert!(validate(&single_child, 0, "a").is_ok());

        let text = OverrideDecl::new("a.b").merge("label");
        let err = validate(&text, 0, "a").unwrap_err();
        assert_eq!(err.code(), crate::error::ERR_INVALID_OVERRIDE_SHAPE);
        assert_eq!(
            err.to_string(),
            "override \"a.b\" in \"a\": merge mode requires a single element"
        );

        let many = OverrideDecl::new("a.b").merge(vec![
            TemplateNode::from(ElementNode::new("a")),
            TemplateNode::from(ElementNode::new("b")),
        ]);
        assert!(validate(&many, 0, "a").is_err());

        // Other modes take any shape
        let text = OverrideDecl::new("a.b").replace_all("label");
        assert!(validate(&text, 0, "a").is_ok());
    }

    #[test]
    fn test_merge_attributes_concatenates_list_attributes() {
        let config = EngineConfig::default();
        let base = ElementNode::new("a")
            .with_attr("class", "btn")
            .with_attr("href", "/");
        let layer = ElementNode::new("a")
            .with_attr("href", "/home")
            .with_attr("class", "btn-primary")
            .with_attr("title", "Home");

        let merged = merge_attributes(&config, &base.attributes, &[&layer.attributes]);
        let merged = ElementNode {
            attributes: merged,
            ..ElementNode::new("a")
        };
        assert_eq!(merged.attr("class"), Some("btn btn-primary"));
        assert_eq!(merged.attr("href"), Some("/home"));
        assert_eq!(merged.attr("title"), Some("Home"));
        assert_eq!(merged.attributes[0].name, "class");
    }

    #[test]
    fn test_decl_json_surface() {
        let decl: OverrideDecl = serde_json::from_value(json!({
            "target": {"": "nav.home", "icon": "nav.home.icon"},
            "mode": "replaceAll",
            "content": {"text": "Start"}
        }))
        .unwrap();
        assert_eq!(decl.target.resolve(), "nav.home");
        assert_eq!(decl.mode, OverrideMode::ReplaceAll);
        assert_eq!(decl.content, OverrideContent::Text("Start".to_string()));

        let bare: OverrideDecl = serde_json::from_value(json!({"target": "nav.home"})).unwrap();
        assert_eq!(bare.mode, OverrideMode::ContentOnly);
        assert!(bare.content.is_empty());
    }
}

//! Template node tree shared by the compile-time and render-time halves.
//!
//! Documents are parsed into `Element`/`Text` nodes. The emitter turns socket
//! elements into `Hatch` nodes, and callers describe per-instance overrides
//! with `Compose` nodes. A finished render contains only `Element` and `Text`.

use serde::{Deserialize, Serialize};

use crate::overrides::OverrideDecl;

// ═══════════════════════════════════════════════════════════════════════════════
// NODES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TemplateNode {
    Element(ElementNode),
    Text(TextNode),
    Hatch(HatchNode),
    Compose(ComposeNode),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementNode {
    pub tag: String,
    #[serde(default)]
    pub attributes: Vec<AttributeIR>,
    #[serde(default)]
    pub children: Vec<TemplateNode>,
    /// Identity handle used to tell sibling instances apart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// External-reference handle owned by the host.
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextNode {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeIR {
    pub name: String,
    pub value: String,
}

/// An extension point: socket `sock` wrapping the template element it was
/// declared on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HatchNode {
    pub sock: String,
    pub element: ElementNode,
}

/// A compose boundary: one level of override declarations.
///
/// Renders `element` when present (keeping the enclosing template available to
/// nested boundaries), otherwise consumes the enclosing template.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposeNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<crate::exporter::AnySock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<Box<TemplateNode>>,
    #[serde(default)]
    pub overrides: Vec<OverrideDecl>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTRUCTORS & ACCESSORS
// ═══════════════════════════════════════════════════════════════════════════════

impl TemplateNode {
    pub fn text(value: impl Into<String>) -> Self {
        TemplateNode::Text(TextNode {
            value: value.into(),
        })
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            TemplateNode::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn compose(overrides: Vec<OverrideDecl>) -> Self {
        TemplateNode::Compose(ComposeNode {
            overrides,
            ..Default::default()
        })
    }
}

impl From<ElementNode> for TemplateNode {
    fn from(el: ElementNode) -> Self {
        TemplateNode::Element(el)
    }
}

impl From<ComposeNode> for TemplateNode {
    fn from(compose: ComposeNode) -> Self {
        TemplateNode::Compose(compose)
    }
}

impl ElementNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_child(mut self, child: impl Into<TemplateNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_text(self, value: impl Into<String>) -> Self {
        self.with_child(TemplateNode::text(value))
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    /// Overwrites in place, keeping attribute order stable.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(AttributeIR { name, value }),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|a| a.name == name)?;
        Some(self.attributes.remove(index).value)
    }
}

//! Boundary-style override engine.
//!
//! A render pass walks the caller's content with a scope chain:
//!
//! - ENTER-TEMPLATE: root scope with the view namespace and template body.
//! - ENTER-COMPOSE: validates and groups the boundary's declarations, pushes a
//!   scope, renders its element (or the enclosing template), then pops and
//!   reports groups nobody consulted.
//! - ENTER-HATCH: climbs for overrides of the socket and renders them by mode;
//!   nested content renders in a scope named after the socket.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::GroupCache;
use crate::config::{EngineConfig, UnusedOverridePolicy};
use crate::error::{Diagnostic, SocketError};
use crate::exporter::resolve_sock;
use crate::ir::{ComposeNode, ElementNode, HatchNode, TemplateNode};
use crate::overrides::{merge_attributes, OverrideContent, OverrideDecl, OverrideMode};
use crate::ready::ReadyGate;
use crate::scope::{ScopeChain, ScopeId};

/// A bound template: extension points are `Hatch` nodes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewTemplate {
    pub namespace: String,
    pub nodes: Vec<TemplateNode>,
}

impl ViewTemplate {
    pub fn new(namespace: impl Into<String>, nodes: Vec<TemplateNode>) -> Self {
        Self {
            namespace: namespace.into(),
            nodes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOutput {
    /// Only `Element` and `Text` nodes.
    pub nodes: Vec<TemplateNode>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug)]
pub struct Renderer {
    config: EngineConfig,
    cache: GroupCache,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Renderer {
    pub fn new(config: EngineConfig) -> Self {
        let cache = GroupCache::with_capacity(config.group_cache_capacity);
        Self { config, cache }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &GroupCache {
        &self.cache
    }

    /// Renders `content` against `view`. Content usually is one or more
    /// compose boundaries; a boundary without an element renders the view.
    pub fn render(
        &self,
        view: &ViewTemplate,
        content: &[TemplateNode],
    ) -> Result<RenderOutput, SocketError> {
        let mut pass = Pass {
            config: &self.config,
            cache: &self.cache,
            chain: ScopeChain::new(),
            diagnostics: Vec::new(),
        };

        let root = pass.chain.push_root(&view.namespace, &view.nodes);
        let mut nodes = Vec::new();
        pass.render_nodes(content, root, &mut nodes)?;
        pass.chain.pop(root);

        debug!(
            namespace = %view.namespace,
            nodes = nodes.len(),
            diagnostics = pass.diagnostics.len(),
            "rendered view"
        );

        Ok(RenderOutput {
            nodes,
            diagnostics: pass.diagnostics,
        })
    }

    /// Renders the view with no overrides.
    pub fn render_template(&self, view: &ViewTemplate) -> Result<RenderOutput, SocketError> {
        self.render(view, &[TemplateNode::compose(Vec::new())])
    }

    /// Emits `fallback` until `gate` reports ready.
    pub fn render_when_ready(
        &self,
        gate: &ReadyGate,
        view: &ViewTemplate,
        content: &[TemplateNode],
        fallback: &[TemplateNode],
    ) -> Result<RenderOutput, SocketError> {
        if !gate.is_ready() {
            return Ok(RenderOutput {
                nodes: fallback.to_vec(),
                diagnostics: Vec::new(),
            });
        }
        self.render(view, content)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RENDER PASS
// ═══════════════════════════════════════════════════════════════════════════════

struct Pass<'r, 'a> {
    config: &'r EngineConfig,
    cache: &'r GroupCache,
    chain: ScopeChain<'a>,
    diagnostics: Vec<Diagnostic>,
}

impl<'r, 'a> Pass<'r, 'a> {
    fn render_nodes(
        &mut self,
        nodes: &'a [TemplateNode],
        scope: ScopeId,
        out: &mut Vec<TemplateNode>,
    ) -> Result<(), SocketError> {
        for node in nodes {
            self.render_node(node, scope, out)?;
        }
        Ok(())
    }

    fn render_node(
        &mut self,
        node: &'a TemplateNode,
        scope: ScopeId,
        out: &mut Vec<TemplateNode>,
    ) -> Result<(), SocketError> {
        match node {
            TemplateNode::Element(el) => out.push(self.render_element(el, scope)?.into()),
            TemplateNode::Text(_) => out.push(node.clone()),
            TemplateNode::Hatch(hatch) => self.enter_hatch(hatch, scope, out)?,
            TemplateNode::Compose(compose) => self.enter_compose(compose, scope, out)?,
        }
        Ok(())
    }

    fn render_element(&mut self, el: &'a ElementNode, scope: ScopeId) -> Result<ElementNode, SocketError> {
        let mut children = Vec::with_capacity(el.children.len());
        self.render_nodes(&el.children, scope, &mut children)?;
        Ok(ElementNode {
            children,
            ..shallow(el)
        })
    }

    fn render_content(
        &mut self,
        content: &'a OverrideContent,
        scope: ScopeId,
    ) -> Result<Vec<TemplateNode>, SocketError> {
        let mut out = Vec::new();
        match content {
            OverrideContent::Empty => {}
            OverrideContent::Text(text) => out.push(TemplateNode::text(text.clone())),
            OverrideContent::Element(el) => out.push(self.render_element(el, scope)?.into()),
            OverrideContent::Children(nodes) => self.render_nodes(nodes, scope, &mut out)?,
        }
        Ok(out)
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Compose boundaries
    // ───────────────────────────────────────────────────────────────────────────

    fn enter_compose(
        &mut self,
        compose: &'a ComposeNode,
        scope: ScopeId,
        out: &mut Vec<TemplateNode>,
    ) -> Result<(), SocketError> {
        let parent = self.chain.get(scope);
        let namespace = match resolve_sock(compose.namespace.as_ref()) {
            "" => parent.namespace.clone(),
            ns => ns.to_string(),
        };
        let parent_template = parent.template;
        let template = if compose.element.is_some() {
            parent_template
        } else {
            None
        };

        let groups = self.cache.get_or_group(&compose.overrides, &namespace)?;
        let id = self
            .chain
            .push_compose(scope, namespace, template, &compose.overrides, groups);

        let result = match compose.element.as_deref() {
            Some(element) => self.render_node(element, id, out),
            None => match parent_template {
                Some(nodes) => self.render_nodes(nodes, id, out),
                None => Ok(()),
            },
        };

        // EXIT-COMPOSE
        let record = self.chain.pop(id);
        result?;
        match record {
            Some(record) => report_unused(
                self.config,
                &record.namespace,
                record.unused(),
                &mut self.diagnostics,
            ),
            None => Ok(()),
        }
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Extension points
    // ───────────────────────────────────────────────────────────────────────────

    fn enter_hatch(
        &mut self,
        hatch: &'a HatchNode,
        scope: ScopeId,
        out: &mut Vec<TemplateNode>,
    ) -> Result<(), SocketError> {
        let found = self.chain.find_overrides(scope, &hatch.sock);
        let id = self.chain.push_hatch(scope, &hatch.sock, &hatch.element.children);

        let result = match found {
            None => self
                .render_element(&hatch.element, id)
                .map(|el| out.push(el.into())),
            Some(found) => {
                debug!(
                    sock = %hatch.sock,
                    target = %found.sock,
                    count = found.items.len(),
                    "applying overrides"
                );
                found
                    .items
                    .iter()
                    .filter_map(|item| found.decls.get(item.order))
                    .try_for_each(|decl| self.apply(decl, &hatch.element, id, out))
            }
        };

        self.chain.pop(id);
        result
    }

    fn apply(
        &mut self,
        decl: &'a OverrideDecl,
        template: &'a ElementNode,
        scope: ScopeId,
        out: &mut Vec<TemplateNode>,
    ) -> Result<(), SocketError> {
        match decl.mode {
            OverrideMode::ContentOnly => {
                let children = self.render_content(&decl.content, scope)?;
                let mut el = ElementNode {
                    children,
                    ..shallow(template)
                };
                if decl.key.is_some() {
                    el.key = decl.key.clone();
                }
                out.push(el.into());
            }
            OverrideMode::ReplaceAll => {
                out.extend(self.render_content(&decl.content, scope)?);
            }
            OverrideMode::Merge => match decl.content.as_single_element() {
                Some(over) => {
                    let mut children = Vec::new();
                    self.render_nodes(&over.children, scope, &mut children)?;
                    out.push(
                        ElementNode {
                            tag: over.tag.clone(),
                            attributes: merge_attributes(
                                self.config,
                                &template.attributes,
                                &[&over.attributes],
                            ),
                            children,
                            key: over
                                .key
                                .clone()
                                .or_else(|| decl.key.clone())
                                .or_else(|| template.key.clone()),
                            reference: over.reference.clone().or_else(|| template.reference.clone()),
                        }
                        .into(),
                    );
                }
                // Merging nothing leaves the template as it is
                None => {
                    let mut el = self.render_element(template, scope)?;
                    if decl.key.is_some() {
                        el.key = decl.key.clone();
                    }
                    out.push(el.into());
                }
            },
        }
        Ok(())
    }
}

fn shallow(el: &ElementNode) -> ElementNode {
    ElementNode {
        tag: el.tag.clone(),
        attributes: el.attributes.clone(),
        children: Vec::new(),
        key: el.key.clone(),
        reference: el.reference.clone(),
    }
}

/// Applies the unused-override policy to the groups nobody consulted.
pub(crate) fn report_unused<'s>(
    config: &EngineConfig,
    namespace: &str,
    unused: impl IntoIterator<Item = &'s str>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<(), SocketError> {
    for socket in unused {
        match config.unused_overrides {
            UnusedOverridePolicy::Warn => {
                warn!(namespace, socket, "unused override");
                diagnostics.push(Diagnostic::unused_override(namespace, socket));
            }
            UnusedOverridePolicy::Error => {
                return Err(SocketError::UnrecognizedOverride {
                    namespace: namespace.to_string(),
                    socket: socket.to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::HatchNode;
    use pretty_assertions::assert_eq;

    fn hatch(sock: &str, element: ElementNode) -> TemplateNode {
        TemplateNode::Hatch(HatchNode {
            sock: sock.to_string(),
            element,
        })
    }

    fn view() -> ViewTemplate {
        ViewTemplate::new(
            "card",
            vec![ElementNode::new("div")
                .with_child(hatch("title", ElementNode::new("h2").with_text("Title")))
                .into()],
        )
    }

    #[test]
    fn test_render_without_overrides_strips_hatches() {
        let out = Renderer::default().render_template(&view()).unwrap();
        let expected: Vec<TemplateNode> = vec![ElementNode::new("div")
            .with_child(ElementNode::new("h2").with_text("Title"))
            .into()];
        assert_eq!(out.nodes, expected);
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_content_only_keeps_wrapper() {
        let content = vec![TemplateNode::compose(vec![
            OverrideDecl::new("card.title").content_only("Hello")
        ])];
        let out = Renderer::default().render(&view(), &content).unwrap();
        assert_eq!(
            crate::html::render_html(&out.nodes),
            "<div><h2>Hello</h2></div>"
        );
    }

    #[test]
    fn test_unused_override_warns_by_default() {
        let content = vec![TemplateNode::compose(vec![
            OverrideDecl::new("card.subtitle").content_only("x")
        ])];
        let out = Renderer::default().render(&view(), &content).unwrap();
        assert_eq!(out.diagnostics, vec![Diagnostic::unused_override("card", "subtitle")]);
        assert_eq!(out.diagnostics[0].code, crate::error::WARN_UNUSED_OVERRIDE);
    }

    #[test]
    fn test_unused_override_is_fatal_when_strict() {
        let content = vec![TemplateNode::compose(vec![
            OverrideDecl::new("card.subtitle").content_only("x")
        ])];
        let err = Renderer::new(EngineConfig::strict())
            .render(&view(), &content)
            .unwrap_err();
        assert_eq!(
            err,
            SocketError::UnrecognizedOverride {
                namespace: "card".to_string(),
                socket: "subtitle".to_string(),
            }
        );
    }

    #[test]
    fn test_fallback_until_ready() {
        let gate = ReadyGate::new();
        let fallback = vec![TemplateNode::text("Loading")];
        let renderer = Renderer::default();
        let content = vec![TemplateNode::compose(Vec::new())];

        let out = renderer
            .render_when_ready(&gate, &view(), &content, &fallback)
            .unwrap();
        assert_eq!(out.nodes, fallback);

        gate.mark_ready();
        let out = renderer
            .render_when_ready(&gate, &view(), &content, &fallback)
            .unwrap();
        assert_eq!(out.nodes.len(), 1);
        assert_eq!(out.nodes[0].as_element().unwrap().tag, "div");
    }
}

//! Arena-backed scope chain for one render pass.
//!
//! Records refer to their parent by index, and a parent always has a lower
//! index than its children, so climbing the chain strictly decreases the
//! index and terminates after at most `depth` steps. Scopes are nested like a
//! stack: popping a scope truncates the arena back to it.

use std::collections::HashSet;
use std::sync::Arc;

use crate::ir::TemplateNode;
use crate::overrides::{OverrideDecl, OverrideGroups, OverrideItem};

pub type ScopeId = usize;

#[derive(Debug)]
pub struct ScopeRecord<'a> {
    pub namespace: String,
    /// Socket name when this scope is an extension-point boundary.
    pub hatch: Option<String>,
    /// Subtree a compose boundary without its own element renders.
    pub template: Option<&'a [TemplateNode]>,
    pub decls: &'a [OverrideDecl],
    pub groups: Option<Arc<OverrideGroups>>,
    /// Relative paths consulted by an extension point during this pass.
    pub used: HashSet<String>,
    pub parent: Option<ScopeId>,
}

impl<'a> ScopeRecord<'a> {
    fn new(namespace: String, parent: Option<ScopeId>) -> Self {
        Self {
            namespace,
            hatch: None,
            template: None,
            decls: &[],
            groups: None,
            used: HashSet::new(),
            parent,
        }
    }

    /// Group paths never consulted, declaration order.
    pub fn unused(&self) -> Vec<&str> {
        self.groups
            .iter()
            .flat_map(|groups| groups.keys())
            .filter(|sock| !self.used.contains(sock.as_str()))
            .map(String::as_str)
            .collect()
    }
}

/// Overrides found for an extension point.
#[derive(Debug, Clone)]
pub struct Found<'a> {
    pub scope: ScopeId,
    /// Path the group was found under, relative to `scope`.
    pub sock: String,
    pub items: Vec<OverrideItem>,
    pub decls: &'a [OverrideDecl],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Climb {
    pub found: Option<(ScopeId, String)>,
    pub steps: usize,
}

#[derive(Debug, Default)]
pub struct ScopeChain<'a> {
    records: Vec<ScopeRecord<'a>>,
}

impl<'a> ScopeChain<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: ScopeId) -> &ScopeRecord<'a> {
        &self.records[id]
    }

    /// ENTER-TEMPLATE
    pub fn push_root(&mut self, namespace: &str, template: &'a [TemplateNode]) -> ScopeId {
        let mut record = ScopeRecord::new(namespace.to_string(), None);
        record.template = Some(template);
        self.push(record)
    }

    /// ENTER-COMPOSE
    pub fn push_compose(
        &mut self,
        parent: ScopeId,
        namespace: String,
        template: Option<&'a [TemplateNode]>,
        decls: &'a [OverrideDecl],
        groups: Arc<OverrideGroups>,
    ) -> ScopeId {
        let mut record = ScopeRecord::new(namespace, Some(parent));
        record.template = template;
        record.decls = decls;
        record.groups = Some(groups);
        self.push(record)
    }

    /// ENTER-HATCH: the scope nested content of socket `sock` renders in.
    pub fn push_hatch(&mut self, parent: ScopeId, sock: &str, template: &'a [TemplateNode]) -> ScopeId {
        let namespace = format!("{}.{}", self.records[parent].namespace, sock);
        let mut record = ScopeRecord::new(namespace, Some(parent));
        record.hatch = Some(sock.to_string());
        record.template = Some(template);
        self.push(record)
    }

    fn push(&mut self, record: ScopeRecord<'a>) -> ScopeId {
        debug_assert!(record.parent.map_or(true, |p| p < self.records.len()));
        self.records.push(record);
        self.records.len() - 1
    }

    /// EXIT: drops `id` and everything nested in it.
    pub fn pop(&mut self, id: ScopeId) -> Option<ScopeRecord<'a>> {
        if id >= self.records.len() {
            return None;
        }
        self.records.truncate(id + 1);
        self.records.pop()
    }

    /// Number of scopes from `id` up to the root, inclusive.
    pub fn depth(&self, id: ScopeId) -> usize {
        std::iter::successors(Some(id), |&s| self.records[s].parent).count()
    }

    pub(crate) fn climb(&self, from: ScopeId, sock: &str) -> Climb {
        let mut sock = sock.to_string();
        let mut current = Some(from);
        let mut steps = 0;

        while let Some(id) = current {
            steps += 1;
            let record = &self.records[id];
            if record
                .groups
                .as_ref()
                .is_some_and(|groups| groups.contains_key(&sock))
            {
                return Climb {
                    found: Some((id, sock)),
                    steps,
                };
            }
            if let Some(hatch) = &record.hatch {
                sock = format!("{}.{}", hatch, sock);
            }
            current = record.parent;
        }

        Climb { found: None, steps }
    }

    /// Climbs outward from `from` to the nearest scope holding a group for
    /// `sock` and marks that group used.
    pub fn find_overrides(&mut self, from: ScopeId, sock: &str) -> Option<Found<'a>> {
        let (id, sock) = self.climb(from, sock).found?;
        let record = &mut self.records[id];
        let items = record.groups.as_ref()?.get(&sock)?.clone();
        record.used.insert(sock.clone());
        Some(Found {
            scope: id,
            sock,
            items,
            decls: record.decls,
        })
    }
}

use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use crate::error::SocketError;
use crate::overrides::{self, OverrideContent, OverrideDecl, OverrideGroups};

pub const DEFAULT_CAPACITY: usize = 64;

/// Memo of override grouping keyed by the structural identity of a
/// declaration list plus the namespace it was resolved in.
///
/// Grouping only looks at targets, modes and content shape, so lists that
/// differ in content alone share an entry. At most `capacity` entries are
/// kept; the least recently used one is evicted first.
#[derive(Debug)]
pub struct GroupCache {
    entries: Mutex<LruCache<String, Arc<OverrideGroups>>>,
}

impl Default for GroupCache {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// A zero capacity falls back to `DEFAULT_CAPACITY`.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or_else(|| NonZeroUsize::new(DEFAULT_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn compute_hash(decls: &[OverrideDecl], namespace: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(namespace.as_bytes());
        for decl in decls {
            hasher.update([0u8]);
            hasher.update(decl.target.resolve().as_bytes());
            hasher.update([0u8]);
            hasher.update(decl.mode.to_string().as_bytes());
            hasher.update([shape_tag(&decl.content)]);
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().map(|e| e.cap().get()).unwrap_or(0)
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    /// Groups `decls`, reusing a previous result for a structurally identical
    /// list. Validation failures are never cached.
    pub fn get_or_group(
        &self,
        decls: &[OverrideDecl],
        namespace: &str,
    ) -> Result<Arc<OverrideGroups>, SocketError> {
        let hash = Self::compute_hash(decls, namespace);

        if let Some(hit) = self.entries.lock().ok().and_then(|mut e| e.get(&hash).cloned()) {
            return Ok(hit);
        }

        let groups = Arc::new(overrides::group(decls, namespace)?);
        if let Ok(mut entries) = self.entries.lock() {
            entries.put(hash, groups.clone());
        }
        Ok(groups)
    }
}

/// The part of the content that shape validation depends on.
fn shape_tag(content: &OverrideContent) -> u8 {
    if content.is_empty() {
        1
    } else if content.as_single_element().is_some() {
        2
    } else {
        3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ElementNode;

    #[test]
    fn test_identical_declarations_share_groups() {
        let cache = GroupCache::new();
        let decls = vec![OverrideDecl::new("nav.home").content_only("Home")];

        let a = cache.get_or_group(&decls, "nav").unwrap();
        let b = cache.get_or_group(&decls.clone(), "nav").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);

        // Same list, different namespace
        let c = cache.get_or_group(&decls, "").unwrap_err();
        assert_eq!(c.code(), crate::error::ERR_INVALID_OVERRIDE_TARGET);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_content_changes_reuse_one_entry() {
        let cache = GroupCache::new();
        for i in 0..1000 {
            let decls = vec![
                OverrideDecl::new("nav.home").content_only(format!("Home {}", i).as_str()),
                OverrideDecl::new("nav.about").with_key(format!("k{}", i)),
            ];
            cache.get_or_group(&decls, "nav").unwrap();
        }
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_distinct_targets_stay_within_capacity() {
        let cache = GroupCache::with_capacity(8);
        for i in 0..100 {
            let decls = vec![OverrideDecl::new(format!("nav.item{}", i))];
            cache.get_or_group(&decls, "nav").unwrap();
        }
        assert_eq!(cache.len(), 8);
        assert_eq!(cache.capacity(), 8);
    }

    #[test]
    fn test_zero_capacity_uses_default() {
        assert_eq!(GroupCache::with_capacity(0).capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn test_hash_depends_on_shape_not_text() {
        let a = vec![OverrideDecl::new("nav.home").merge(ElementNode::new("a"))];
        let b = vec![OverrideDecl::new("nav.home").merge(ElementNode::new("button").with_text("Go"))];
        let c = vec![OverrideDecl::new("nav.home").merge("text")];
        let d = vec![OverrideDecl::new("nav.home").replace_all(ElementNode::new("a"))];

        assert_eq!(GroupCache::compute_hash(&a, "nav"), GroupCache::compute_hash(&b, "nav"));
        assert_ne!(GroupCache::compute_hash(&a, "nav"), GroupCache::compute_hash(&c, "nav"));
        assert_ne!(GroupCache::compute_hash(&a, "nav"), GroupCache::compute_hash(&d, "nav"));
        assert_ne!(GroupCache::compute_hash(&a, "nav"), GroupCache::compute_hash(&a, "page"));
    }
}

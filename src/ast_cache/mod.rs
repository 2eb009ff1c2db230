//! AST Cache (§4.2, §9): a bounded LRU of parsed syntax trees keyed by file
//! path, with a disposal hook guaranteed to run exactly once per evicted or
//! cleared entry.
//!
//! This is the single point of truth for trees across the extraction and
//! resolver phases (§4.5): a cache miss simply means "re-parse from the
//! original bytes", never a hard failure.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::collections::VecDeque;
use tree_sitter::Tree;

/// Invoked exactly once, with the evicted path and tree, whenever an entry
/// leaves the cache (via capacity eviction, explicit `clear`, or replacement).
/// The default hook only logs; callers that attach out-of-band native
/// resources to a tree can supply their own.
pub type DisposalHook = Box<dyn Fn(&str, Tree) + Send + Sync>;

struct Inner {
    capacity: usize,
    entries: HashMap<String, Tree>,
    /// Most-recently-used at the back.
    recency: VecDeque<String>,
    disposer: DisposalHook,
}

pub struct AstCache {
    inner: Mutex<Inner>,
}

impl AstCache {
    pub fn new(capacity: usize) -> Self {
        Self::with_disposal_hook(capacity, Box::new(|path, _tree| {
            tracing::trace!("disposing cached AST for '{path}'");
        }))
    }

    pub fn with_disposal_hook(capacity: usize, disposer: DisposalHook) -> Self {
        Self {
            inner: Mutex::new(Inner {
                capacity: capacity.max(1),
                entries: HashMap::new(),
                recency: VecDeque::new(),
                disposer,
            }),
        }
    }

    /// Fetch a cached tree for `path`, marking it most-recently-used.
    /// `tree_sitter::Tree` is cheap to clone (it's reference-counted
    /// internally), so callers get an owned copy without disturbing the
    /// cached entry's lifetime.
    pub fn get(&self, path: &str) -> Option<Tree> {
        let mut inner = self.inner.lock();
        if let Some(tree) = inner.entries.get(path).cloned() {
            inner.touch(path);
            Some(tree)
        } else {
            None
        }
    }

    /// Insert or replace the cached tree for `path`, evicting the
    /// least-recently-used entry if over capacity.
    pub fn set(&self, path: &str, tree: Tree) {
        let mut inner = self.inner.lock();
        if let Some(old) = inner.entries.insert(path.to_string(), tree) {
            (inner.disposer)(path, old);
        }
        inner.touch(path);
        inner.evict_if_needed();
    }

    /// Drop every entry, invoking the disposal hook for each.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        let keys: Vec<String> = inner.recency.drain(..).collect();
        for key in keys {
            if let Some(tree) = inner.entries.remove(&key) {
                (inner.disposer)(&key, tree);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Inner {
    fn touch(&mut self, path: &str) {
        if let Some(pos) = self.recency.iter().position(|p| p == path) {
            self.recency.remove(pos);
        }
        self.recency.push_back(path.to_string());
    }

    fn evict_if_needed(&mut self) {
        while self.entries.len() > self.capacity {
            if let Some(lru) = self.recency.pop_front() {
                if let Some(tree) = self.entries.remove(&lru) {
                    (self.disposer)(&lru, tree);
                }
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn parse(src: &str) -> Tree {
        let mut parser = tree_sitter::Parser::new();
        parser.set_language(&tree_sitter_rust::LANGUAGE.into()).unwrap();
        parser.parse(src, None).unwrap()
    }

    #[test]
    fn evicts_least_recently_used_and_disposes_exactly_once() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let disposed_clone = disposed.clone();
        let cache = AstCache::with_disposal_hook(
            2,
            Box::new(move |_path, _tree| {
                disposed_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );

        cache.set("a.rs", parse("fn a() {}"));
        cache.set("b.rs", parse("fn b() {}"));
        // touch a.rs so b.rs becomes LRU
        assert!(cache.get("a.rs").is_some());
        cache.set("c.rs", parse("fn c() {}"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b.rs").is_none(), "b.rs should have been evicted");
        assert_eq!(disposed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clear_disposes_every_entry_once() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let disposed_clone = disposed.clone();
        let cache = AstCache::with_disposal_hook(
            10,
            Box::new(move |_path, _tree| {
                disposed_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );
        cache.set("a.rs", parse("fn a() {}"));
        cache.set("b.rs", parse("fn b() {}"));
        cache.clear();
        assert_eq!(disposed.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn miss_is_rebuildable_from_bytes() {
        let cache = AstCache::new(1);
        assert!(cache.get("missing.rs").is_none());
        cache.set("missing.rs", parse("fn x() {}"));
        assert!(cache.get("missing.rs").is_some());
    }
}

//! Bounded LRU content cache for snippet/file-content generation during CSV
//! building (§4.10, §9: "owns a bounded LRU content cache that lazily reads
//! from disk"). Mirrors the recency-list shape of [`crate::ast_cache`] but
//! holds file bytes rather than parsed trees, and has no disposal hook since
//! plain `String`s need no explicit release.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;

pub struct ContentCache {
    capacity: usize,
    entries: HashMap<String, Arc<str>>,
    recency: VecDeque<String>,
}

impl ContentCache {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, entries: HashMap::new(), recency: VecDeque::new() }
    }

    /// Returns the full text of `file_path` (relative to `repo_root`),
    /// reading from disk on a cache miss.
    pub fn get(&mut self, repo_root: &Path, file_path: &str) -> std::io::Result<Arc<str>> {
        if let Some(content) = self.entries.get(file_path) {
            self.touch(file_path);
            return Ok(content.clone());
        }

        let bytes = std::fs::read(repo_root.join(file_path))?;
        let text: Arc<str> = Arc::from(String::from_utf8_lossy(&bytes).into_owned());
        self.entries.insert(file_path.to_string(), text.clone());
        self.recency.push_back(file_path.to_string());
        self.evict_if_needed();
        Ok(text)
    }

    fn touch(&mut self, file_path: &str) {
        if let Some(pos) = self.recency.iter().position(|p| p == file_path) {
            self.recency.remove(pos);
        }
        self.recency.push_back(file_path.to_string());
    }

    fn evict_if_needed(&mut self) {
        while self.entries.len() > self.capacity {
            if let Some(oldest) = self.recency.pop_front() {
                self.entries.remove(&oldest);
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_used_entry() {
        let dir = std::env::temp_dir().join(format!("gitnexus-cache-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a.txt"), "a").unwrap();
        std::fs::write(dir.join("b.txt"), "b").unwrap();
        std::fs::write(dir.join("c.txt"), "c").unwrap();

        let mut cache = ContentCache::new(2);
        cache.get(&dir, "a.txt").unwrap();
        cache.get(&dir, "b.txt").unwrap();
        cache.get(&dir, "c.txt").unwrap();

        assert_eq!(cache.len(), 2);
        std::fs::remove_dir_all(&dir).ok();
    }
}

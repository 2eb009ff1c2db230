//! `meta.json` (§6): the small sidecar recording what was last indexed, used
//! both for display and for the idempotency check (`lastCommit == HEAD`)
//! that lets `analyze` skip a no-op re-run.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    pub files: usize,
    pub nodes: usize,
    pub edges: usize,
    pub communities: usize,
    pub processes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meta {
    pub repo_path: String,
    pub last_commit: Option<String>,
    pub indexed_at: DateTime<Utc>,
    pub stats: Stats,
}

impl Meta {
    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    pub fn read(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(std::io::Error::other)
    }

    /// Whether the previous run already covered `current_commit` (§6
    /// `analyze` idempotency: skip unless `--force`).
    pub fn is_up_to_date(&self, current_commit: Option<&str>) -> bool {
        match (&self.last_commit, current_commit) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let dir = std::env::temp_dir().join(format!("gitnexus-meta-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("meta.json");

        let meta = Meta {
            repo_path: "/repo".to_string(),
            last_commit: Some("abc123".to_string()),
            indexed_at: Utc::now(),
            stats: Stats { files: 10, nodes: 100, edges: 200, communities: 3, processes: 5 },
        };
        meta.write(&path).unwrap();
        let loaded = Meta::read(&path).unwrap();
        assert_eq!(loaded.repo_path, "/repo");
        assert!(loaded.is_up_to_date(Some("abc123")));
        assert!(!loaded.is_up_to_date(Some("def456")));

        std::fs::remove_dir_all(&dir).ok();
    }
}

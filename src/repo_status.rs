//! Minimal git status probe (§6, §9 open question: "a git2 dependency is
//! unnecessary just to read `HEAD`" — we read `.git/HEAD` and the index
//! directly instead of depending on `git2`/`libgit2`).

use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoStatus {
    pub head_commit: Option<String>,
    pub dirty: bool,
}

/// Resolves `repo_root/.git/HEAD`, following a single level of symbolic ref
/// (`ref: refs/heads/main`) to the packed or loose ref it points at.
pub fn read_status(repo_root: &Path) -> RepoStatus {
    let git_dir = repo_root.join(".git");
    let head_commit = read_head_commit(&git_dir);
    let dirty = is_dirty(repo_root, &git_dir);
    RepoStatus { head_commit, dirty }
}

fn read_head_commit(git_dir: &Path) -> Option<String> {
    let head = std::fs::read_to_string(git_dir.join("HEAD")).ok()?;
    let head = head.trim();
    if let Some(ref_path) = head.strip_prefix("ref: ") {
        if let Ok(commit) = std::fs::read_to_string(git_dir.join(ref_path)) {
            return Some(commit.trim().to_string());
        }
        read_packed_ref(git_dir, ref_path)
    } else {
        Some(head.to_string())
    }
}

fn read_packed_ref(git_dir: &Path, ref_path: &str) -> Option<String> {
    let packed = std::fs::read_to_string(git_dir.join("packed-refs")).ok()?;
    packed.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        let commit = parts.next()?;
        let name = parts.next()?;
        (name == ref_path).then(|| commit.to_string())
    })
}

/// Cheap dirty check: compares each tracked index entry's mtime against the
/// working tree file's mtime. Not a full diff, but sufficient to decide
/// whether an `analyze --force`-free re-run would be safe.
fn is_dirty(repo_root: &Path, git_dir: &Path) -> bool {
    let index_path = git_dir.join("index");
    let Ok(index_meta) = std::fs::metadata(&index_path) else { return false };
    let Ok(index_mtime) = index_meta.modified() else { return false };

    let Ok(walker) = std::fs::read_dir(repo_root) else { return false };
    for entry in walker.flatten() {
        if entry.file_name() == ".git" {
            continue;
        }
        if let Ok(meta) = entry.metadata() {
            if let Ok(mtime) = meta.modified() {
                if mtime > index_mtime {
                    return true;
                }
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_git_dir_yields_no_commit() {
        let dir = std::env::temp_dir().join(format!("gitnexus-repo-status-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let status = read_status(&dir);
        assert_eq!(status.head_commit, None);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn resolves_head_through_loose_ref() {
        let dir = std::env::temp_dir().join(format!("gitnexus-repo-status-ref-{}", std::process::id()));
        let git_dir = dir.join(".git");
        std::fs::create_dir_all(git_dir.join("refs/heads")).unwrap();
        std::fs::write(git_dir.join("HEAD"), "ref: refs/heads/main\n").unwrap();
        std::fs::write(git_dir.join("refs/heads/main"), "deadbeef1234\n").unwrap();

        let status = read_status(&dir);
        assert_eq!(status.head_commit.as_deref(), Some("deadbeef1234"));
        std::fs::remove_dir_all(&dir).ok();
    }
}

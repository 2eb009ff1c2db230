//! The persisted data model (§3): node entities and the single typed
//! relationship edge.

mod node;
mod relation;

pub use node::{
    CodeEmbeddingNode, CodeSymbolNode, CommunityNode, EnrichedBy, FileNode, FolderNode, GraphNode,
    ProcessNode, ProcessType,
};
pub use relation::CodeRelation;

/// Build a File node id: `File:<path>` (§3).
pub fn file_id(path: &str) -> String {
    format!("File:{path}")
}

/// Build a Folder node id.
pub fn folder_id(path: &str) -> String {
    format!("Folder:{path}")
}

/// Build a CodeSymbol node id: `<Label>:<filePath>:<name>` (§3).
pub fn symbol_id(label: crate::types::SymbolLabel, file_path: &str, name: &str) -> String {
    format!("{}:{file_path}:{name}", label.as_str())
}

/// Build a Community node id: `comm_<N>`.
pub fn community_id(n: usize) -> String {
    format!("comm_{n}")
}

/// Build a Process node id: `proc_<N>`.
pub fn process_id(n: usize) -> String {
    format!("proc_{n}")
}

/// A synthetic, dangling target id for an unresolved heritage parent (§4.5(c)):
/// `<Label>:<name>`, deliberately missing the `filePath` segment so it can
/// never collide with a real symbol id.
pub fn synthetic_id(label: crate::types::SymbolLabel, name: &str) -> String {
    format!("{}:{name}", label.as_str())
}

/// Normalize a filesystem path to the repo-relative, forward-slash form
/// every node id and `filePath` attribute must use (§3).
pub fn normalize_path(path: &std::path::Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SymbolLabel;

    #[test]
    fn ids_follow_the_spec_format() {
        assert_eq!(file_id("app/a.ts"), "File:app/a.ts");
        assert_eq!(symbol_id(SymbolLabel::Function, "app/a.ts", "foo"), "Function:app/a.ts:foo");
        assert_eq!(community_id(3), "comm_3");
        assert_eq!(process_id(1), "proc_1");
        assert_eq!(synthetic_id(SymbolLabel::Class, "Base"), "Class:Base");
    }

    #[test]
    fn normalize_path_uses_forward_slashes() {
        let p = std::path::Path::new("app").join("a.ts");
        assert_eq!(normalize_path(&p), "app/a.ts");
    }
}

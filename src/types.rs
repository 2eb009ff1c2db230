//! Core identifier and position types shared across every phase of the
//! pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 0-based, half-open source range, matching the row convention used by
/// tree-sitter and required by the CodeSymbol `startLine`/`endLine` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Range {
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self { start_line, start_column, end_line, end_column }
    }

    pub fn contains_line(&self, line: u32) -> bool {
        line >= self.start_line && line <= self.end_line
    }
}

/// The closed set of node labels a symbol-producing definition capture can
/// resolve to (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolLabel {
    Function,
    Class,
    Interface,
    Method,
    CodeElement,
    Struct,
    Enum,
    Macro,
    Typedef,
    Union,
    Namespace,
    Trait,
    Impl,
    TypeAlias,
    Const,
    Static,
    Property,
    Record,
    Delegate,
    Annotation,
    Constructor,
    Template,
    Module,
}

impl SymbolLabel {
    /// Labels whose `isExported` attribute is meaningful (§3). All other
    /// labels default `isExported` to `false` rather than omitting it, so
    /// downstream consumers never have to special-case a missing field.
    pub fn tracks_exported(self) -> bool {
        matches!(
            self,
            SymbolLabel::Function
                | SymbolLabel::Class
                | SymbolLabel::Interface
                | SymbolLabel::Method
                | SymbolLabel::CodeElement
        )
    }

    /// Whether this label participates in the community/process subgraph
    /// (§4.6, §4.9: `{Function, Class, Method, Interface}`).
    pub fn is_callable_surface(self) -> bool {
        matches!(
            self,
            SymbolLabel::Function | SymbolLabel::Class | SymbolLabel::Method | SymbolLabel::Interface
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SymbolLabel::Function => "Function",
            SymbolLabel::Class => "Class",
            SymbolLabel::Interface => "Interface",
            SymbolLabel::Method => "Method",
            SymbolLabel::CodeElement => "CodeElement",
            SymbolLabel::Struct => "Struct",
            SymbolLabel::Enum => "Enum",
            SymbolLabel::Macro => "Macro",
            SymbolLabel::Typedef => "Typedef",
            SymbolLabel::Union => "Union",
            SymbolLabel::Namespace => "Namespace",
            SymbolLabel::Trait => "Trait",
            SymbolLabel::Impl => "Impl",
            SymbolLabel::TypeAlias => "TypeAlias",
            SymbolLabel::Const => "Const",
            SymbolLabel::Static => "Static",
            SymbolLabel::Property => "Property",
            SymbolLabel::Record => "Record",
            SymbolLabel::Delegate => "Delegate",
            SymbolLabel::Annotation => "Annotation",
            SymbolLabel::Constructor => "Constructor",
            SymbolLabel::Template => "Template",
            SymbolLabel::Module => "Module",
        }
    }
}

impl fmt::Display for SymbolLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source language tag produced by the Language Router (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    TypeScript,
    JavaScript,
    Python,
    Go,
    Rust,
    Java,
    CSharp,
    C,
    Cpp,
}

impl Language {
    /// Map a file extension (without the leading dot) to a language tag.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "ts" | "tsx" | "mts" | "cts" => Some(Language::TypeScript),
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            "py" | "pyi" => Some(Language::Python),
            "go" => Some(Language::Go),
            "rs" => Some(Language::Rust),
            "java" => Some(Language::Java),
            "cs" => Some(Language::CSharp),
            "c" | "h" => Some(Language::C),
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Some(Language::Cpp),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Java => "java",
            Language::CSharp => "csharp",
            Language::C => "c",
            Language::Cpp => "cpp",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A relationship discriminator for the single `CodeRelation` edge type (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationType {
    Contains,
    Defines,
    Imports,
    Calls,
    Extends,
    Implements,
    MemberOf,
    StepInProcess,
}

impl RelationType {
    pub fn as_str(self) -> &'static str {
        match self {
            RelationType::Contains => "CONTAINS",
            RelationType::Defines => "DEFINES",
            RelationType::Imports => "IMPORTS",
            RelationType::Calls => "CALLS",
            RelationType::Extends => "EXTENDS",
            RelationType::Implements => "IMPLEMENTS",
            RelationType::MemberOf => "MEMBER_OF",
            RelationType::StepInProcess => "STEP_IN_PROCESS",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resolver's confidence tag for a `CALLS` edge (§4.5(b)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallReason {
    ImportResolved,
    SameFile,
    FuzzyGlobal,
}

impl CallReason {
    pub fn as_str(self) -> &'static str {
        match self {
            CallReason::ImportResolved => "import-resolved",
            CallReason::SameFile => "same-file",
            CallReason::FuzzyGlobal => "fuzzy-global",
        }
    }
}

impl fmt::Display for CallReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_from_extension() {
        assert_eq!(Language::from_extension("ts"), Some(Language::TypeScript));
        assert_eq!(Language::from_extension("TSX"), Some(Language::TypeScript));
        assert_eq!(Language::from_extension("go"), Some(Language::Go));
        assert_eq!(Language::from_extension("unknown"), None);
    }

    #[test]
    fn range_contains_line() {
        let r = Range::new(10, 0, 20, 0);
        assert!(r.contains_line(10));
        assert!(r.contains_line(20));
        assert!(!r.contains_line(9));
        assert!(!r.contains_line(21));
    }

    #[test]
    fn symbol_label_exported_tracking() {
        assert!(SymbolLabel::Function.tracks_exported());
        assert!(!SymbolLabel::Struct.tracks_exported());
    }
}

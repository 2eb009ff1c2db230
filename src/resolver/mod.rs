//! Reference Resolver (§4.5): imports, calls, heritage — three streaming
//! sub-phases sharing the Symbol Table and AST cache.

pub mod calls;
pub mod heritage;
pub mod imports;
pub mod stoplist;

pub use calls::resolve_calls;
pub use heritage::resolve_heritage;
pub use imports::{extract_imports, ImportMap, ImportPatch, ImportResolver};

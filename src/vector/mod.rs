//! Vector Index (§4.9): embeddable-node selection, input formatting, and
//! the HNSW cosine index.

pub mod embedding;
pub mod hnsw_index;

pub use embedding::{EmbeddingError, EmbeddingGenerator, NullEmbeddingGenerator};
pub use hnsw_index::VectorIndex;

use crate::model::CodeSymbolNode;

/// Forms the embedding input text for a symbol: name + snippet + file path
/// (§4.9).
pub fn embedding_input(symbol: &CodeSymbolNode) -> String {
    format!("{}\n{}\n{}", symbol.name, symbol.content, symbol.file_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SymbolLabel;

    #[test]
    fn embedding_input_combines_name_snippet_and_path() {
        let symbol = CodeSymbolNode {
            id: "Function:a.ts:foo".to_string(),
            label: SymbolLabel::Function,
            name: "foo".to_string(),
            file_path: "a.ts".to_string(),
            start_line: 0,
            end_line: 1,
            content: "function foo() {}".to_string(),
            is_exported: true,
            description: None,
        };
        let input = embedding_input(&symbol);
        assert!(input.contains("foo"));
        assert!(input.contains("function foo() {}"));
        assert!(input.contains("a.ts"));
    }
}

use crate::parsing::profile::LanguageProfile;
use crate::types::Language;
use tree_sitter::{Node, Query};

pub struct RustProfile {
    language: tree_sitter::Language,
    definitions: Query,
    imports: Query,
    calls: Query,
    heritage: Query,
}

const DEFINITION_QUERY: &str = r#"
(function_item name: (identifier) @name) @definition.function
(struct_item name: (type_identifier) @name) @definition.struct
(enum_item name: (type_identifier) @name) @definition.enum
(trait_item name: (type_identifier) @name) @definition.trait
(mod_item name: (identifier) @name) @definition.module
(impl_item type: (type_identifier) @name) @definition.impl
(type_item name: (type_identifier) @name) @definition.type
(const_item name: (identifier) @name) @definition.const
"#;

const IMPORT_QUERY: &str = r#"
(use_declaration argument: (scoped_identifier) @import.source)
(use_declaration argument: (identifier) @import.source)
(use_declaration argument: (use_as_clause path: (_) @import.source))
"#;

const CALL_QUERY: &str = r#"
(call_expression function: (identifier) @call.name)
(call_expression function: (field_expression field: (field_identifier) @call.name))
(call_expression function: (scoped_identifier name: (identifier) @call.name))
"#;

const HERITAGE_QUERY: &str = r#"
(impl_item
  trait: (type_identifier) @heritage.trait
  type: (type_identifier) @heritage.class)
"#;

impl RustProfile {
    pub fn new() -> Result<Self, crate::error::ParseError> {
        let language: tree_sitter::Language = tree_sitter_rust::LANGUAGE.into();
        let init = |src: &str| {
            Query::new(&language, src).map_err(|e| crate::error::ParseError::ParserInit {
                language: "rust".into(),
                reason: e.to_string(),
            })
        };
        Ok(Self {
            definitions: init(DEFINITION_QUERY)?,
            imports: init(IMPORT_QUERY)?,
            calls: init(CALL_QUERY)?,
            heritage: init(HERITAGE_QUERY)?,
            language,
        })
    }
}

impl LanguageProfile for RustProfile {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn ts_language(&self) -> tree_sitter::Language {
        self.language.clone()
    }

    fn definition_query(&self) -> &Query {
        &self.definitions
    }

    fn import_query(&self) -> &Query {
        &self.imports
    }

    fn call_query(&self) -> &Query {
        &self.calls
    }

    fn heritage_query(&self) -> &Query {
        &self.heritage
    }

    /// True iff the definition has a direct `visibility_modifier` child
    /// whose text contains `pub` (§4.3).
    fn is_exported(&self, node: Node, code: &str, _name: &str) -> bool {
        let mut cursor = node.walk();
        node.children(&mut cursor).any(|child| {
            child.kind() == "visibility_modifier"
                && code.get(child.byte_range()).map(|t| t.contains("pub")).unwrap_or(false)
        })
    }

    fn enclosing_function_kinds(&self) -> &'static [&'static str] {
        &["function_item", "closure_expression"]
    }

    fn doc_comment_prefixes(&self) -> &'static [&'static str] {
        &["///", "//!"]
    }

    fn relative_import_extensions(&self) -> &'static [&'static str] {
        &[".rs", "/mod.rs"]
    }
}

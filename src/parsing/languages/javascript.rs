use crate::parsing::profile::{ancestor_kind_is, LanguageProfile};
use crate::types::Language;
use tree_sitter::{Node, Query};

pub struct JavaScriptProfile {
    language: tree_sitter::Language,
    definitions: Query,
    imports: Query,
    calls: Query,
    heritage: Query,
}

const DEFINITION_QUERY: &str = r#"
(function_declaration name: (identifier) @name) @definition.function
(class_declaration name: (identifier) @name) @definition.class
(method_definition name: (property_identifier) @name) @definition.method
"#;

const IMPORT_QUERY: &str = r#"
(import_statement source: (string (string_fragment) @import.source))
"#;

const CALL_QUERY: &str = r#"
(call_expression function: (identifier) @call.name)
(call_expression function: (member_expression property: (property_identifier) @call.name))
"#;

const HERITAGE_QUERY: &str = r#"
(class_declaration
  name: (identifier) @heritage.class
  (class_heritage (identifier) @heritage.extends))
"#;

impl JavaScriptProfile {
    pub fn new() -> Result<Self, crate::error::ParseError> {
        let language: tree_sitter::Language = tree_sitter_javascript::LANGUAGE.into();
        let init = |src: &str| {
            Query::new(&language, src).map_err(|e| crate::error::ParseError::ParserInit {
                language: "javascript".into(),
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

impl LanguageProfile for JavaScriptProfile {
    fn language(&self) -> Language {
        Language::JavaScript
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

    fn is_exported(&self, node: Node, code: &str, _name: &str) -> bool {
        if ancestor_kind_is(node, &["export_statement", "export_specifier"]) {
            return true;
        }
        code.get(node.byte_range()).map(|t| t.trim_start().starts_with("export ")).unwrap_or(false)
    }

    fn enclosing_function_kinds(&self) -> &'static [&'static str] {
        &["function_declaration", "method_definition", "arrow_function", "function_expression"]
    }

    fn doc_comment_prefixes(&self) -> &'static [&'static str] {
        &["/**"]
    }

    fn relative_import_extensions(&self) -> &'static [&'static str] {
        &[".js", ".jsx", "/index.js", "/index.jsx"]
    }
}

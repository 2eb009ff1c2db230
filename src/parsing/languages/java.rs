use crate::parsing::profile::{sibling_kind_text_contains, LanguageProfile};
use crate::types::Language;
use tree_sitter::{Node, Query};

pub struct JavaProfile {
    language: tree_sitter::Language,
    definitions: Query,
    imports: Query,
    calls: Query,
    heritage: Query,
}

const DEFINITION_QUERY: &str = r#"
(class_declaration name: (identifier) @name) @definition.class
(interface_declaration name: (identifier) @name) @definition.interface
(method_declaration name: (identifier) @name) @definition.method
(constructor_declaration name: (identifier) @name) @definition.constructor
(enum_declaration name: (identifier) @name) @definition.enum
(record_declaration name: (identifier) @name) @definition.record
(annotation_type_declaration name: (identifier) @name) @definition.annotation
"#;

const IMPORT_QUERY: &str = r#"
(import_declaration (scoped_identifier) @import.source)
"#;

const CALL_QUERY: &str = r#"
(method_invocation name: (identifier) @call.name)
(object_creation_expression type: (type_identifier) @call.name)
"#;

const HERITAGE_QUERY: &str = r#"
(class_declaration
  name: (identifier) @heritage.class
  superclass: (superclass (type_identifier) @heritage.extends))
(class_declaration
  name: (identifier) @heritage.class
  interfaces: (super_interfaces (type_list (type_identifier) @heritage.implements)))
(interface_declaration
  name: (identifier) @heritage.class
  (extends_interfaces (type_list (type_identifier) @heritage.extends)))
"#;

impl JavaProfile {
    pub fn new() -> Result<Self, crate::error::ParseError> {
        let language: tree_sitter::Language = tree_sitter_java::LANGUAGE.into();
        let init = |src: &str| {
            Query::new(&language, src).map_err(|e| crate::error::ParseError::ParserInit {
                language: "java".into(),
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

impl LanguageProfile for JavaProfile {
    fn language(&self) -> Language {
        Language::Java
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

    /// True iff a sibling `modifiers` node contains `public`, or the
    /// declaration's own text begins with `public` (§4.3).
    fn is_exported(&self, node: Node, code: &str, _name: &str) -> bool {
        if sibling_kind_text_contains(node, code, "modifiers", "public") {
            return true;
        }
        code.get(node.byte_range()).map(|t| t.trim_start().starts_with("public")).unwrap_or(false)
    }

    fn enclosing_function_kinds(&self) -> &'static [&'static str] {
        &["method_declaration", "constructor_declaration", "lambda_expression"]
    }

    fn doc_comment_prefixes(&self) -> &'static [&'static str] {
        &["/**"]
    }

    fn relative_import_extensions(&self) -> &'static [&'static str] {
        &[".java"]
    }
}

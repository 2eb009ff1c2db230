use crate::parsing::profile::LanguageProfile;
use crate::types::Language;
use tree_sitter::{Node, Query};

pub struct CSharpProfile {
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
(struct_declaration name: (identifier) @name) @definition.struct
(enum_declaration name: (identifier) @name) @definition.enum
(delegate_declaration name: (identifier) @name) @definition.delegate
(record_declaration name: (identifier) @name) @definition.record
(namespace_declaration name: (identifier) @name) @definition.namespace
"#;

const IMPORT_QUERY: &str = r#"
(using_directive (qualified_name) @import.source)
(using_directive (identifier) @import.source)
"#;

const CALL_QUERY: &str = r#"
(invocation_expression function: (identifier) @call.name)
(invocation_expression function: (member_access_expression name: (identifier) @call.name))
(object_creation_expression type: (identifier) @call.name)
"#;

const HERITAGE_QUERY: &str = r#"
(class_declaration
  name: (identifier) @heritage.class
  (base_list (identifier) @heritage.extends))
(interface_declaration
  name: (identifier) @heritage.class
  (base_list (identifier) @heritage.extends))
"#;

impl CSharpProfile {
    pub fn new() -> Result<Self, crate::error::ParseError> {
        let language: tree_sitter::Language = tree_sitter_c_sharp::LANGUAGE.into();
        let init = |src: &str| {
            Query::new(&language, src).map_err(|e| crate::error::ParseError::ParserInit {
                language: "csharp".into(),
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

impl LanguageProfile for CSharpProfile {
    fn language(&self) -> Language {
        Language::CSharp
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

    /// True iff a direct `modifier` child's text is `public` (§4.3).
    fn is_exported(&self, node: Node, code: &str, _name: &str) -> bool {
        let mut cursor = node.walk();
        node.children(&mut cursor).any(|child| {
            child.kind() == "modifier"
                && code.get(child.byte_range()).map(|t| t.contains("public")).unwrap_or(false)
        })
    }

    fn enclosing_function_kinds(&self) -> &'static [&'static str] {
        &["method_declaration", "constructor_declaration", "lambda_expression", "local_function_statement"]
    }

    fn doc_comment_prefixes(&self) -> &'static [&'static str] {
        &["///"]
    }

    fn relative_import_extensions(&self) -> &'static [&'static str] {
        &[".cs"]
    }
}

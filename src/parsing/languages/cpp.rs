use crate::parsing::profile::LanguageProfile;
use crate::types::Language;
use tree_sitter::{Node, Query};

pub struct CppProfile {
    language: tree_sitter::Language,
    definitions: Query,
    imports: Query,
    calls: Query,
    heritage: Query,
}

const DEFINITION_QUERY: &str = r#"
(function_definition declarator: (function_declarator declarator: (identifier) @name)) @definition.function
(function_definition declarator: (function_declarator declarator: (field_identifier) @name)) @definition.method
(class_specifier name: (type_identifier) @name) @definition.class
(struct_specifier name: (type_identifier) @name) @definition.struct
(enum_specifier name: (type_identifier) @name) @definition.enum
(namespace_definition name: (identifier) @name) @definition.namespace
(alias_declaration name: (type_identifier) @name) @definition.typedef
"#;

const IMPORT_QUERY: &str = r#"
(preproc_include path: (string_literal) @import.source)
(preproc_include path: (system_lib_string) @import.source)
"#;

const CALL_QUERY: &str = r#"
(call_expression function: (identifier) @call.name)
(call_expression function: (field_expression field: (field_identifier) @call.name))
(call_expression function: (qualified_identifier name: (identifier) @call.name))
"#;

const HERITAGE_QUERY: &str = r#"
(class_specifier
  name: (type_identifier) @heritage.class
  (base_class_clause (type_identifier) @heritage.extends))
(struct_specifier
  name: (type_identifier) @heritage.class
  (base_class_clause (type_identifier) @heritage.extends))
"#;

impl CppProfile {
    pub fn new() -> Result<Self, crate::error::ParseError> {
        let language: tree_sitter::Language = tree_sitter_cpp::LANGUAGE.into();
        let init = |src: &str| {
            Query::new(&language, src).map_err(|e| crate::error::ParseError::ParserInit {
                language: "cpp".into(),
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

impl LanguageProfile for CppProfile {
    fn language(&self) -> Language {
        Language::Cpp
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

    /// C++ has no module visibility keyword comparable to the others;
    /// entry-point heuristics handle `main` separately (§4.3, §4.7).
    fn is_exported(&self, _node: Node, _code: &str, _name: &str) -> bool {
        false
    }

    fn enclosing_function_kinds(&self) -> &'static [&'static str] {
        &["function_definition", "lambda_expression"]
    }

    fn doc_comment_prefixes(&self) -> &'static [&'static str] {
        &["/**"]
    }

    fn relative_import_extensions(&self) -> &'static [&'static str] {
        &[".hpp", ".h", ".cpp", ".cc"]
    }
}

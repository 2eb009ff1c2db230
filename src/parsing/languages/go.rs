use crate::parsing::profile::LanguageProfile;
use crate::types::Language;
use tree_sitter::{Node, Query};

pub struct GoProfile {
    language: tree_sitter::Language,
    definitions: Query,
    imports: Query,
    calls: Query,
    heritage: Query,
}

const DEFINITION_QUERY: &str = r#"
(function_declaration name: (identifier) @name) @definition.function
(method_declaration name: (field_identifier) @name) @definition.method
(type_declaration (type_spec name: (type_identifier) @name type: (struct_type))) @definition.struct
(type_declaration (type_spec name: (type_identifier) @name type: (interface_type))) @definition.interface
(const_declaration (const_spec name: (identifier) @name)) @definition.const
"#;

const IMPORT_QUERY: &str = r#"
(import_spec path: (interpreted_string_literal) @import.source)
"#;

const CALL_QUERY: &str = r#"
(call_expression function: (identifier) @call.name)
(call_expression function: (selector_expression field: (field_identifier) @call.name))
"#;

impl GoProfile {
    pub fn new() -> Result<Self, crate::error::ParseError> {
        let language: tree_sitter::Language = tree_sitter_go::LANGUAGE.into();
        let init = |src: &str| {
            Query::new(&language, src).map_err(|e| crate::error::ParseError::ParserInit {
                language: "go".into(),
                reason: e.to_string(),
            })
        };
        Ok(Self {
            definitions: init(DEFINITION_QUERY)?,
            imports: init(IMPORT_QUERY)?,
            calls: init(CALL_QUERY)?,
            heritage: init("")?,
            language,
        })
    }
}

impl LanguageProfile for GoProfile {
    fn language(&self) -> Language {
        Language::Go
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

    /// True iff the first character of `name` is an uppercase letter,
    /// Unicode-aware (§4.3).
    fn is_exported(&self, _node: Node, _code: &str, name: &str) -> bool {
        name.chars().next().map(|c| c.is_uppercase() && !c.is_lowercase()).unwrap_or(false)
    }

    fn enclosing_function_kinds(&self) -> &'static [&'static str] {
        &["function_declaration", "method_declaration", "func_literal"]
    }

    fn doc_comment_prefixes(&self) -> &'static [&'static str] {
        &["//"]
    }

    fn relative_import_extensions(&self) -> &'static [&'static str] {
        &[".go"]
    }
}

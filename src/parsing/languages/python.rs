use crate::parsing::profile::LanguageProfile;
use crate::types::Language;
use tree_sitter::{Node, Query};

pub struct PythonProfile {
    language: tree_sitter::Language,
    definitions: Query,
    imports: Query,
    calls: Query,
    heritage: Query,
}

const DEFINITION_QUERY: &str = r#"
(function_definition name: (identifier) @name) @definition.function
(class_definition name: (identifier) @name) @definition.class
"#;

const IMPORT_QUERY: &str = r#"
(import_from_statement module_name: (dotted_name) @import.source)
(import_from_statement module_name: (relative_import) @import.source)
(import_statement name: (dotted_name) @import.source)
"#;

const CALL_QUERY: &str = r#"
(call function: (identifier) @call.name)
(call function: (attribute attribute: (identifier) @call.name))
"#;

const HERITAGE_QUERY: &str = r#"
(class_definition
  name: (identifier) @heritage.class
  superclasses: (argument_list (identifier) @heritage.extends))
"#;

impl PythonProfile {
    pub fn new() -> Result<Self, crate::error::ParseError> {
        let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
        let init = |src: &str| {
            Query::new(&language, src).map_err(|e| crate::error::ParseError::ParserInit {
                language: "python".into(),
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

impl LanguageProfile for PythonProfile {
    fn language(&self) -> Language {
        Language::Python
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

    /// True iff `name` does not start with `_` (§4.3).
    fn is_exported(&self, _node: Node, _code: &str, name: &str) -> bool {
        !name.starts_with('_')
    }

    fn enclosing_function_kinds(&self) -> &'static [&'static str] {
        &["function_definition"]
    }

    fn doc_comment_prefixes(&self) -> &'static [&'static str] {
        &["\"\"\"", "'''"]
    }

    fn relative_import_extensions(&self) -> &'static [&'static str] {
        &[".py", "/__init__.py"]
    }
}

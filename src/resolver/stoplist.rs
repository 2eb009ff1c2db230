//! Exact stop-lists and built-in sets from §6, shared by the call resolver
//! and the BM25 tokenizer.

/// Call-resolver built-ins to skip (§6): JS globals, React hooks, common
/// collection methods, Python built-ins. One flat case-sensitive set since
/// the spec's list is not namespaced per language.
pub const CALL_BUILTINS: &[&str] = &[
    // JS globals
    "console", "log", "warn", "error", "info", "debug",
    "setTimeout", "setInterval", "clearTimeout", "clearInterval",
    "parseInt", "parseFloat", "isNaN", "isFinite",
    "encodeURI", "decodeURI", "encodeURIComponent", "decodeURIComponent",
    "JSON", "parse", "stringify",
    "Object", "Array", "String", "Number", "Boolean", "Symbol", "BigInt",
    "Map", "Set", "WeakMap", "WeakSet",
    "Promise", "resolve", "reject", "then", "catch", "finally",
    "Math", "Date", "RegExp", "Error",
    "require", "import", "export",
    "fetch", "Response", "Request",
    // React hooks/primitives
    "useState", "useEffect", "useCallback", "useMemo", "useRef", "useContext",
    "useReducer", "useLayoutEffect", "useImperativeHandle", "useDebugValue",
    "createElement", "createContext", "createRef", "forwardRef", "memo", "lazy",
    // Collection methods
    "map", "filter", "reduce", "forEach", "find", "findIndex", "some", "every",
    "includes", "indexOf", "slice", "splice", "concat", "join", "split",
    "push", "pop", "shift", "unshift", "sort", "reverse",
    "keys", "values", "entries", "assign", "freeze", "seal",
    "hasOwnProperty", "toString", "valueOf",
    // Python built-ins
    "print", "len", "range", "str", "int", "float", "list", "dict", "set",
    "tuple", "open", "read", "write", "close", "append", "extend", "update",
    "super", "type", "isinstance", "issubclass", "getattr", "setattr",
    "hasattr", "enumerate", "zip", "sorted", "reversed", "min", "max", "sum", "abs",
];

/// BM25 stop-words (§6): common language keywords plus common English
/// function words.
pub const BM25_STOPWORDS: &[&str] = &[
    "const", "let", "var", "function", "return", "if", "else", "for", "while",
    "class", "new", "this", "import", "export", "from", "default", "async",
    "await", "try", "catch", "throw", "typeof", "instanceof", "true", "false",
    "null", "undefined",
    "the", "is", "at", "which", "on", "a", "an", "and", "or", "but", "in",
    "with", "to", "of", "it", "be", "as", "by", "that", "for", "are", "was",
    "were",
];

pub fn is_call_builtin(name: &str) -> bool {
    CALL_BUILTINS.contains(&name)
}

pub fn is_bm25_stopword(token: &str) -> bool {
    BM25_STOPWORDS.contains(&token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_js_and_python_builtins() {
        assert!(is_call_builtin("console"));
        assert!(is_call_builtin("map"));
        assert!(is_call_builtin("isinstance"));
        assert!(!is_call_builtin("computeTotal"));
    }

    #[test]
    fn recognizes_stopwords() {
        assert!(is_bm25_stopword("const"));
        assert!(is_bm25_stopword("the"));
        assert!(!is_bm25_stopword("gitnexus"));
    }
}

//! BM25 tokenizer (§4.8): fixed character-class split, camelCase splitting,
//! stop-word/length filtering.

use crate::resolver::stoplist::is_bm25_stopword;

/// Splits `text` on `[whitespace \-_./\\(){}[\]<>:;,!?'"]+`, lowercases,
/// expands camelCase tokens into their parts (keeping the original whole
/// token alongside the parts when the split produced more than one piece),
/// then drops empties, single characters, and stop-words (§4.8).
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for raw in split_on_delimiters(text) {
        let lower = raw.to_lowercase();
        let camel_parts = split_camel_case(&raw);
        if camel_parts.len() > 1 {
            tokens.push(lower.clone());
            for part in camel_parts {
                tokens.push(part.to_lowercase());
            }
        } else {
            tokens.push(lower);
        }
    }

    tokens
        .into_iter()
        .filter(|t| t.len() > 1 && !is_bm25_stopword(t))
        .collect()
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || "-_./\\(){}[]<>:;,!?'\"".contains(c)
}

fn split_on_delimiters(text: &str) -> Vec<String> {
    text.split(is_delimiter).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

/// Splits `getUserById` into `["get", "User", "Id"]`-style parts at
/// lower-to-upper transitions.
fn split_camel_case(token: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in token.chars() {
        if c.is_uppercase() && prev_lower {
            parts.push(std::mem::take(&mut current));
        }
        current.push(c);
        prev_lower = c.is_lowercase();
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_camel_case_and_keeps_whole_token() {
        let tokens = tokenize("getUserById");
        assert!(tokens.contains(&"getuserbyid".to_string()));
        assert!(tokens.contains(&"get".to_string()));
        assert!(tokens.contains(&"user".to_string()));
        assert!(tokens.contains(&"by".to_string()));
        assert!(tokens.contains(&"id".to_string()));
    }

    #[test]
    fn drops_stopwords_and_single_characters() {
        let tokens = tokenize("const x = function() { return 1; }");
        assert!(!tokens.contains(&"const".to_string()));
        assert!(!tokens.contains(&"x".to_string()));
        assert!(!tokens.contains(&"function".to_string()));
    }

    #[test]
    fn splits_on_fixed_delimiter_class() {
        let tokens = tokenize("path/to/module.rs");
        assert!(tokens.contains(&"path".to_string()));
        assert!(tokens.contains(&"module".to_string()));
        assert!(tokens.contains(&"rs".to_string()));
    }
}

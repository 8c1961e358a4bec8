//! Built-in tokenizers
//!
//! A tokenizer turns a query string, or a datum, into the tokens the index
//! matches on. Query tokenizers take `&str`; datum tokenizers take `&D`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Tokenizer applied to every datum added to the index
pub type DatumTokenizer<D> = Arc<dyn Fn(&D) -> Vec<String> + Send + Sync>;

/// Tokenizer applied to every query
pub type QueryTokenizer = Arc<dyn Fn(&str) -> Vec<String> + Send + Sync>;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static NONWORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").expect("valid regex"));

/// Split on runs of whitespace
pub fn whitespace(s: &str) -> Vec<String> {
    split(&WHITESPACE, s)
}

/// Split on runs of non-word characters
pub fn nonword(s: &str) -> Vec<String> {
    split(&NONWORD, s)
}

fn split(pattern: &Regex, s: &str) -> Vec<String> {
    pattern
        .split(s.trim())
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Tokenizers for structured datums
///
/// The datum is converted to JSON and the named fields are tokenized.
/// Strings and numbers are read; any other field type is skipped.
pub mod obj {
    use super::{nonword as nonword_str, whitespace as whitespace_str, DatumTokenizer};
    use serde::Serialize;
    use std::sync::Arc;

    /// Whitespace-tokenize the given fields
    pub fn whitespace<D, I, S>(keys: I) -> DatumTokenizer<D>
    where
        D: Serialize + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        fields(keys, whitespace_str)
    }

    /// Nonword-tokenize the given fields
    pub fn nonword<D, I, S>(keys: I) -> DatumTokenizer<D>
    where
        D: Serialize + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        fields(keys, nonword_str)
    }

    fn fields<D, I, S>(keys: I, tokenize: fn(&str) -> Vec<String>) -> DatumTokenizer<D>
    where
        D: Serialize + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();

        Arc::new(move |datum: &D| {
            let value = match serde_json::to_value(datum) {
                Ok(v) => v,
                Err(_) => return Vec::new(),
            };

            keys.iter()
                .filter_map(|key| value.get(key))
                .flat_map(|field| match field {
                    serde_json::Value::String(s) => tokenize(s),
                    serde_json::Value::Number(n) => tokenize(&n.to_string()),
                    _ => Vec::new(),
                })
                .collect()
        })
    }
}

/// Default datum tokenizer
///
/// Whitespace-tokenizes every string and number found in the datum's JSON
/// form, nested fields included.
pub fn default_datum<D: serde::Serialize + 'static>() -> DatumTokenizer<D> {
    Arc::new(|datum: &D| match serde_json::to_value(datum) {
        Ok(value) => {
            let mut tokens = Vec::new();
            collect_leaves(&value, &mut tokens);
            tokens
        }
        Err(_) => Vec::new(),
    })
}

fn collect_leaves(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::String(s) => out.extend(whitespace(s)),
        serde_json::Value::Number(n) => out.push(n.to_string()),
        serde_json::Value::Array(items) => items.iter().for_each(|v| collect_leaves(v, out)),
        serde_json::Value::Object(map) => map.values().for_each(|v| collect_leaves(v, out)),
        serde_json::Value::Bool(_) | serde_json::Value::Null => {}
    }
}

/// Default query tokenizer
pub fn default_query() -> QueryTokenizer {
    Arc::new(whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Person {
        first: String,
        last: String,
        age: u32,
    }

    #[test]
    fn test_whitespace() {
        assert_eq!(whitespace("  hello   big\tworld "), vec!["hello", "big", "world"]);
        assert!(whitespace("   ").is_empty());
    }

    #[test]
    fn test_nonword() {
        assert_eq!(nonword("new-york, ny"), vec!["new", "york", "ny"]);
    }

    #[test]
    fn test_obj_whitespace() {
        let tokenize = obj::whitespace::<Person, _, _>(["first", "last", "age", "missing"]);
        let person = Person {
            first: "Mary Ann".to_string(),
            last: "Smith".to_string(),
            age: 42,
        };
        assert_eq!(tokenize(&person), vec!["Mary", "Ann", "Smith", "42"]);
    }

    #[test]
    fn test_default_datum_tokenizer() {
        let tokenize = default_datum::<serde_json::Value>();
        let tokens = tokenize(&serde_json::json!({"name": "Joe Schmoe", "tags": ["a"], "ok": true}));
        assert!(tokens.contains(&"Joe".to_string()));
        assert!(tokens.contains(&"Schmoe".to_string()));
        assert!(tokens.contains(&"a".to_string()));
        assert_eq!(tokens.len(), 3);
    }
}

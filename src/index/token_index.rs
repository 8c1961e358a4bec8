//! Prefix trie over datum tokens

use super::SearchIndex;
use crate::error::IndexError;
use crate::tokenizers::{DatumTokenizer, QueryTokenizer};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Trie node; `ids` holds every datum whose tokens pass through this node
///
/// Nodes live in a flat arena and refer to their children by position, so
/// token length never turns into recursion depth.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Node {
    #[serde(default)]
    ids: Vec<usize>,
    #[serde(default)]
    children: BTreeMap<char, usize>,
}

const ROOT: usize = 0;

/// Serialized form of a [`TokenIndex`]
#[derive(Deserialize)]
struct Snapshot<D> {
    datums: Vec<D>,
    nodes: Vec<Node>,
}

#[derive(Serialize)]
struct SnapshotRef<'a, D> {
    datums: &'a [D],
    nodes: &'a [Node],
}

impl<D> Snapshot<D> {
    fn check(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("missing root node".to_string());
        }
        for node in &self.nodes {
            if let Some(child) = node.children.values().find(|&&c| c >= self.nodes.len()) {
                return Err(format!("child {} out of range", child));
            }
            if let Some(id) = node.ids.iter().find(|&&id| id >= self.datums.len()) {
                return Err(format!("datum {} out of range", id));
            }
        }
        Ok(())
    }
}

/// Token index with prefix matching
///
/// A query matches a datum when every query token is a prefix of at least
/// one datum token. Matching is case-insensitive. Results come back in
/// insertion order.
pub struct TokenIndex<D> {
    datum_tokenizer: DatumTokenizer<D>,
    query_tokenizer: QueryTokenizer,
    datums: Vec<D>,
    nodes: Vec<Node>,
}

impl<D> TokenIndex<D> {
    /// Create an empty index from a tokenizer pair
    pub fn new(datum_tokenizer: DatumTokenizer<D>, query_tokenizer: QueryTokenizer) -> Self {
        Self {
            datum_tokenizer,
            query_tokenizer,
            datums: Vec::new(),
            nodes: vec![Node::default()],
        }
    }

    fn insert(&mut self, id: usize, token: &str) {
        let mut current = ROOT;
        for ch in token.chars() {
            current = match self.nodes[current].children.get(&ch) {
                Some(&child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(Node::default());
                    self.nodes[current].children.insert(ch, child);
                    child
                }
            };

            let ids = &mut self.nodes[current].ids;
            // ids are handed out in increasing order, so checking the tail is enough
            if ids.last() != Some(&id) {
                ids.push(id);
            }
        }
    }

    fn lookup(&self, token: &str) -> Option<&[usize]> {
        let mut current = ROOT;
        for ch in token.chars() {
            current = *self.nodes[current].children.get(&ch)?;
        }
        Some(&self.nodes[current].ids)
    }
}

fn normalize(tokens: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = tokens
        .into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    normalized.sort();
    normalized.dedup();
    normalized
}

impl<D> SearchIndex<D> for TokenIndex<D>
where
    D: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    fn add(&mut self, data: Vec<D>) {
        for datum in data {
            let id = self.datums.len();
            let tokens = normalize((self.datum_tokenizer)(&datum));
            for token in &tokens {
                self.insert(id, token);
            }
            self.datums.push(datum);
        }
    }

    fn get(&self, query: &str) -> Vec<D> {
        let tokens = normalize((self.query_tokenizer)(query));
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut matched: Option<Vec<usize>> = None;
        for token in &tokens {
            let ids = match self.lookup(token) {
                Some(ids) if !ids.is_empty() => ids,
                _ => return Vec::new(),
            };

            matched = Some(match matched {
                None => ids.to_vec(),
                Some(mut current) => {
                    current.retain(|id| ids.binary_search(id).is_ok());
                    current
                }
            });

            if matched.as_ref().is_some_and(Vec::is_empty) {
                return Vec::new();
            }
        }

        matched
            .unwrap_or_default()
            .into_iter()
            .filter_map(|id| self.datums.get(id).cloned())
            .collect()
    }

    fn reset(&mut self) {
        self.datums.clear();
        self.nodes = vec![Node::default()];
    }

    fn serialize(&self) -> Result<serde_json::Value, IndexError> {
        serde_json::to_value(SnapshotRef {
            datums: &self.datums,
            nodes: &self.nodes,
        })
        .map_err(IndexError::Encode)
    }

    fn bootstrap(&mut self, blob: serde_json::Value) -> Result<(), IndexError> {
        let snapshot: Snapshot<D> = serde_json::from_value(blob).map_err(IndexError::Corrupt)?;
        snapshot
            .check()
            .map_err(|msg| IndexError::Corrupt(serde::de::Error::custom(msg)))?;
        self.datums = snapshot.datums;
        self.nodes = snapshot.nodes;
        Ok(())
    }

    fn len(&self) -> usize {
        self.datums.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizers::{self, obj};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn people() -> TokenIndex<Value> {
        let mut index = TokenIndex::new(
            obj::whitespace(["first", "last"]),
            Arc::new(tokenizers::whitespace),
        );
        index.add(vec![
            json!({"first": "Joe", "last": "Schmoe"}),
            json!({"first": "Jim", "last": "Bob"}),
            json!({"first": "Franken", "last": "Stein"}),
        ]);
        index
    }

    #[test]
    fn test_prefix_match() {
        let index = people();
        let matches = index.get("j");
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0]["first"], "Joe");
        assert_eq!(matches[1]["first"], "Jim");
    }

    #[test]
    fn test_all_tokens_must_match() {
        let index = people();
        assert_eq!(index.get("jo sch").len(), 1);
        assert!(index.get("jo bob").is_empty());
        assert!(index.get("zed").is_empty());
    }

    #[test]
    fn test_case_insensitive() {
        let index = people();
        assert_eq!(index.get("FRANK")[0]["last"], "Stein");
    }

    #[test]
    fn test_empty_query_matches_nothing() {
        let index = people();
        assert!(index.get("").is_empty());
        assert!(index.get("   ").is_empty());
    }

    #[test]
    fn test_reset() {
        let mut index = people();
        index.reset();
        assert!(index.is_empty());
        assert!(index.get("j").is_empty());
    }

    #[test]
    fn test_bootstrap_from_serialized() {
        let index = people();
        let blob = index.serialize().unwrap();

        let mut restored: TokenIndex<Value> = TokenIndex::new(
            obj::whitespace(["first", "last"]),
            Arc::new(tokenizers::whitespace),
        );
        restored.bootstrap(blob).unwrap();
        assert_eq!(restored.len(), 3);
        assert_eq!(restored.get("sch")[0]["first"], "Joe");
    }

    #[test]
    fn test_bootstrap_rejects_garbage() {
        let mut index = people();
        let result = index.bootstrap(json!({"nope": 1}));
        assert!(matches!(result, Err(IndexError::Corrupt(_))));
        // the previous state survives a failed bootstrap
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_bootstrap_rejects_dangling_child() {
        let mut index = people();
        let blob = json!({
            "datums": [{"first": "Joe"}],
            "nodes": [{"ids": [], "children": {"j": 7}}],
        });
        assert!(matches!(index.bootstrap(blob), Err(IndexError::Corrupt(_))));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_very_long_token() {
        let long = "a".repeat(10_000);
        let mut index = TokenIndex::new(tokenizers::default_datum(), tokenizers::default_query());
        index.add(vec![long.clone()]);
        assert_eq!(index.get("aaa"), vec![long.clone()]);
        assert_eq!(index.get(&long), vec![long.clone()]);

        // the blob stays shallow enough to go through a JSON text round trip
        let text = serde_json::to_string(&index.serialize().unwrap()).unwrap();
        let blob: Value = serde_json::from_str(&text).unwrap();

        let mut restored: TokenIndex<String> =
            TokenIndex::new(tokenizers::default_datum(), tokenizers::default_query());
        restored.bootstrap(blob).unwrap();
        assert_eq!(restored.get(&long[..200]), vec![long]);
    }

    #[test]
    fn test_repeated_token_indexed_once() {
        let mut index = TokenIndex::new(tokenizers::default_datum(), tokenizers::default_query());
        index.add(vec!["ha ha ha".to_string()]);
        assert_eq!(index.get("ha"), vec!["ha ha ha".to_string()]);
    }
}

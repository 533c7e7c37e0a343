use crate::utils::{LocaleFillError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// One uploaded locale file, e.g. `en.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub name: String,
    pub entries: BTreeMap<String, String>,
}

impl SourceDocument {
    /// Parses a flat JSON object. Strings are kept as-is, other scalars keep
    /// their JSON text; nested objects and arrays are rejected.
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self> {
        let name = name.into();
        let parse_error = |reason: String| LocaleFillError::CorpusParseError {
            document: name.clone(),
            reason,
        };

        let value: JsonValue =
            serde_json::from_str(text).map_err(|e| parse_error(e.to_string()))?;
        let object = match value {
            JsonValue::Object(map) => map,
            other => {
                return Err(parse_error(format!(
                    "expected a JSON object at the top level, found {}",
                    json_kind(&other)
                )))
            }
        };

        let mut entries = BTreeMap::new();
        for (key, value) in object {
            let text = match value {
                JsonValue::String(s) => s,
                JsonValue::Number(_) | JsonValue::Bool(_) | JsonValue::Null => value.to_string(),
                JsonValue::Array(_) | JsonValue::Object(_) => {
                    return Err(parse_error(format!(
                        "key \"{}\" holds {}, only flat key/value files are supported",
                        key,
                        json_kind(&value)
                    )))
                }
            };
            entries.insert(key, text);
        }

        Ok(Self { name, entries })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn key_count(&self) -> usize {
        self.entries.len()
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

/// All source documents for one run, keyed by document name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCorpus {
    documents: BTreeMap<String, SourceDocument>,
}

impl SourceCorpus {
    /// Builds a corpus from `(name, text)` buffers. The first buffer that fails
    /// to parse, or that reuses an earlier buffer's name, fails the whole corpus.
    pub fn from_buffers<I, N, T>(buffers: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: AsRef<str>,
    {
        let mut documents = BTreeMap::new();
        for (name, text) in buffers {
            let document = SourceDocument::parse(name, text.as_ref())?;
            if documents.contains_key(&document.name) {
                return Err(LocaleFillError::CorpusParseError {
                    document: document.name,
                    reason: "duplicate document name".to_string(),
                });
            }
            documents.insert(document.name.clone(), document);
        }
        Ok(Self { documents })
    }

    /// Reads every path and names each document after its file name.
    pub async fn load_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut buffers = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            if !file_exists(path) {
                return Err(LocaleFillError::FileNotFound(path.display().to_string()));
            }
            let text = tokio::fs::read_to_string(path).await?;
            buffers.push((document_name(path), text));
        }

        let corpus = Self::from_buffers(buffers)?;
        tracing::debug!(documents = corpus.len(), "Loaded source corpus");
        Ok(corpus)
    }

    pub fn documents(&self) -> impl Iterator<Item = &SourceDocument> {
        self.documents.values()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Keys present in every document. Empty for an empty corpus.
    pub fn common_keys(&self) -> BTreeSet<String> {
        let mut documents = self.documents.values();
        let Some(first) = documents.next() else {
            return BTreeSet::new();
        };

        let mut common: BTreeSet<String> = first.entries.keys().cloned().collect();
        for document in documents {
            common.retain(|key| document.contains_key(key));
        }
        common
    }
}

fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn file_exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_object_and_stringifies_scalars() {
        let doc = SourceDocument::parse("en.json", r#"{"a":"1","count":3,"on":true}"#).unwrap();
        assert_eq!(doc.get("a"), Some("1"));
        assert_eq!(doc.get("count"), Some("3"));
        assert_eq!(doc.get("on"), Some("true"));
    }

    #[test]
    fn rejects_nested_values() {
        let err = SourceDocument::parse("en.json", r#"{"menu":{"open":"Open"}}"#).unwrap_err();
        assert!(matches!(err, LocaleFillError::CorpusParseError { ref document, .. } if document == "en.json"));
    }

    #[test]
    fn one_bad_buffer_fails_the_corpus() {
        let err = SourceCorpus::from_buffers([
            ("en.json", r#"{"a":"1"}"#),
            ("de.json", "{not json"),
        ])
        .unwrap_err();
        match err {
            LocaleFillError::CorpusParseError { document, .. } => assert_eq!(document, "de.json"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = SourceCorpus::from_buffers([
            ("en.json", r#"{"x":"1"}"#),
            ("en.json", r#"{"y":"2"}"#),
        ])
        .unwrap_err();
        match err {
            LocaleFillError::CorpusParseError { document, reason } => {
                assert_eq!(document, "en.json");
                assert_eq!(reason, "duplicate document name");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn same_file_name_in_two_directories_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a/en.json");
        let second = dir.path().join("b/en.json");
        std::fs::create_dir_all(first.parent().unwrap()).unwrap();
        std::fs::create_dir_all(second.parent().unwrap()).unwrap();
        std::fs::write(&first, r#"{"x":"1","y":"2"}"#).unwrap();
        std::fs::write(&second, r#"{"x":"1"}"#).unwrap();

        let err = SourceCorpus::load_files(&[first, second]).await.unwrap_err();
        assert!(matches!(err, LocaleFillError::CorpusParseError { ref document, .. } if document == "en.json"));
    }

    #[test]
    fn top_level_array_is_a_parse_error() {
        assert!(SourceCorpus::from_buffers([("en.json", "[1,2]")]).is_err());
    }

    #[test]
    fn common_keys_is_the_intersection() {
        let corpus = SourceCorpus::from_buffers([
            ("en.json", r#"{"greeting":"Hello","bye":"Bye"}"#),
            ("fr.json", r#"{"greeting":"Bonjour","thanks":"Merci"}"#),
        ])
        .unwrap();
        let keys: Vec<_> = corpus.common_keys().into_iter().collect();
        assert_eq!(keys, vec!["greeting".to_string()]);
    }

    #[test]
    fn empty_corpus_has_no_common_keys() {
        assert!(SourceCorpus::default().common_keys().is_empty());
    }
}

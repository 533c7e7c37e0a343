use crate::translation::extractor::ResponseExtractor;
use crate::utils::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// The target-language document under construction.
///
/// Keys are only ever added or overwritten. Merges are right-biased: the
/// incoming value wins for a key that is already present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslationAccumulator {
    entries: BTreeMap<String, JsonValue>,
}

impl TranslationAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds from pasted text, tolerating prose or code fences around the
    /// JSON object.
    pub fn from_paste(text: &str) -> Result<Self> {
        let mut seed = Self::new();
        seed.merge(ResponseExtractor::new().extract(text)?);
        Ok(seed)
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: JsonValue) -> Option<JsonValue> {
        self.entries.insert(key.into(), value)
    }

    /// Returns how many keys were new to the accumulator.
    pub fn merge<I>(&mut self, translated: I) -> usize
    where
        I: IntoIterator<Item = (String, JsonValue)>,
    {
        let mut added = 0;
        for (key, value) in translated {
            if self.entries.insert(key, value).is_none() {
                added += 1;
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    pub fn into_inner(self) -> BTreeMap<String, JsonValue> {
        self.entries
    }
}

impl From<BTreeMap<String, JsonValue>> for TranslationAccumulator {
    fn from(entries: BTreeMap<String, JsonValue>) -> Self {
        Self { entries }
    }
}

impl FromIterator<(String, JsonValue)> for TranslationAccumulator {
    fn from_iter<T: IntoIterator<Item = (String, JsonValue)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

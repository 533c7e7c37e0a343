use crate::corpus::document::SourceCorpus;
use crate::translation::accumulator::TranslationAccumulator;
use crate::utils::DEFAULT_BATCH_SIZE;
use serde::{Deserialize, Serialize};

/// Keys requested from the completion service in one round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBatch {
    keys: Vec<String>,
}

impl KeyBatch {
    pub fn new(keys: Vec<String>) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn into_keys(self) -> Vec<String> {
        self.keys
    }
}

pub struct KeySelector {
    batch_size: usize,
}

impl KeySelector {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    /// Common keys not yet translated, in lexicographic order, at most
    /// `batch_size` of them. An empty batch means nothing is left.
    pub fn next_batch(
        &self,
        corpus: &SourceCorpus,
        translated: &TranslationAccumulator,
    ) -> KeyBatch {
        let keys = corpus
            .common_keys()
            .into_iter()
            .filter(|key| !translated.contains_key(key))
            .take(self.batch_size)
            .collect();

        KeyBatch { keys }
    }

    /// Number of common keys still missing from `translated`.
    pub fn remaining(&self, corpus: &SourceCorpus, translated: &TranslationAccumulator) -> usize {
        corpus
            .common_keys()
            .iter()
            .filter(|key| !translated.contains_key(key))
            .count()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl Default for KeySelector {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

use crate::corpus::document::SourceCorpus;
use crate::corpus::selector::KeySelector;
use crate::translation::accumulator::TranslationAccumulator;
use crate::translation::prompt::PromptBuilder;
use crate::utils::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tiktoken_rs::cl100k_base;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CorpusMetadata {
    pub total_documents: usize,
    pub documents: Vec<DocumentSummary>,
    pub common_keys: usize,
    pub estimated_rounds: usize,
    pub estimated_prompt_tokens: usize,
    pub sample_keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DocumentSummary {
    pub name: String,
    pub key_count: usize,
}

pub async fn analyze_corpus<P: AsRef<Path>>(paths: &[P], batch_size: usize) -> Result<CorpusMetadata> {
    let corpus = SourceCorpus::load_files(paths).await?;
    Ok(describe_corpus(&corpus, batch_size))
}

/// Summarizes a corpus and estimates the token size of one full prompt.
pub fn describe_corpus(corpus: &SourceCorpus, batch_size: usize) -> CorpusMetadata {
    let selector = KeySelector::new(batch_size);
    let common_keys = corpus.common_keys().len();

    let first_batch = selector.next_batch(corpus, &TranslationAccumulator::new());
    let sample_prompt = PromptBuilder::new("xx").build(corpus, &first_batch);

    CorpusMetadata {
        total_documents: corpus.len(),
        documents: corpus
            .documents()
            .map(|doc| DocumentSummary {
                name: doc.name.clone(),
                key_count: doc.key_count(),
            })
            .collect(),
        common_keys,
        estimated_rounds: common_keys.div_ceil(selector.batch_size()),
        estimated_prompt_tokens: estimate_tokens(&sample_prompt),
        sample_keys: first_batch.into_keys(),
    }
}

pub fn estimate_tokens(text: &str) -> usize {
    match cl100k_base() {
        Ok(bpe) => bpe.encode_with_special_tokens(text).len(),
        Err(_) => text.len() / 4,
    }
}

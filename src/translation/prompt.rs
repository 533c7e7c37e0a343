use crate::corpus::{KeyBatch, SourceCorpus};

pub struct PromptBuilder {
    target_language: String,
}

impl PromptBuilder {
    pub fn new(target_language: impl Into<String>) -> Self {
        Self {
            target_language: target_language.into(),
        }
    }

    /// One labeled block per source document listing the batch keys with that
    /// document's values, preceded by the instruction naming the target
    /// language. Keys a document lacks are left out of its block.
    pub fn build(&self, corpus: &SourceCorpus, batch: &KeyBatch) -> String {
        let mut prompt = build_instruction(&self.target_language);

        let chunks: Vec<String> = corpus
            .documents()
            .map(|document| {
                let key_values: Vec<String> = batch
                    .keys()
                    .iter()
                    .filter_map(|key| {
                        document
                            .get(key)
                            .map(|value| format!("  \"{}\": \"{}\"", key, value))
                    })
                    .collect();

                format!(
                    "Chunk of file {}\n{{\n{}\n}}",
                    document.name,
                    key_values.join(",\n")
                )
            })
            .collect();

        prompt.push_str(&chunks.join("\n\n"));
        prompt
    }
}

pub fn build_instruction(target_language: &str) -> String {
    format!(
        "Given the following chunks, can you provide the JSON for the chunk of the language {}?\n\
         Reply with a single JSON object that maps every key below to its {} value.\n\n",
        target_language, target_language
    )
}

#![allow(dead_code)]

use async_trait::async_trait;
use locale_fill::{CompletionService, LocaleFillError, Result, SourceCorpus, TranslationSessionConfig};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Replays canned replies in order and records every prompt it receives.
#[derive(Default)]
pub struct ScriptedService {
    replies: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
    call_times: Mutex<Vec<Instant>>,
}

impl ScriptedService {
    pub fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Result<String>>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn replying<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(replies.into_iter().map(|r| Ok(r.into())))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedService {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.call_times.lock().unwrap().push(Instant::now());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LocaleFillError::ServiceError("no scripted reply left".into())))
    }
}

/// Never answers within any reasonable timeout.
pub struct StalledService;

#[async_trait]
impl CompletionService for StalledService {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
        Ok("{}".to_string())
    }
}

pub fn session_config(target_language: &str) -> TranslationSessionConfig {
    TranslationSessionConfig {
        target_language: target_language.to_string(),
        batch_size: 10,
        pacing_interval_ms: 15_000,
        timeout_seconds: 30,
        api_key: "test-key".to_string(),
        ..TranslationSessionConfig::default()
    }
}

pub fn corpus(documents: &[(&str, &str)]) -> SourceCorpus {
    SourceCorpus::from_buffers(documents.iter().copied()).unwrap()
}

mod common;

use common::ScriptedService;
use locale_fill::server::{ServiceFactory, SessionRequest};
use locale_fill::{
    AppConfig, AppState, Checkpoint, CheckpointManager, CompletionService, LocaleFillError, RunState,
    SessionService, TranslationSessionConfig,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    files: Vec<PathBuf>,
}

impl Fixture {
    fn new(documents: &[(&str, serde_json::Value)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let files = documents
            .iter()
            .map(|(name, body)| {
                let path = dir.path().join(name);
                std::fs::write(&path, body.to_string()).unwrap();
                path
            })
            .collect();
        Self { dir, files }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }
}

fn factory_for(service: Arc<ScriptedService>) -> ServiceFactory {
    Arc::new(
        move |_config: &TranslationSessionConfig| -> locale_fill::Result<Arc<dyn CompletionService>> {
            Ok(service.clone())
        },
    )
}

fn app_state(checkpoints: Option<CheckpointManager>) -> AppState {
    let mut config = AppConfig::default();
    config.translation.pacing_interval_ms = 0;
    AppState::new(config, checkpoints)
}

fn greetings() -> Fixture {
    Fixture::new(&[
        ("en.json", json!({"greeting": "Hello", "farewell": "Goodbye", "only_en": "x"})),
        ("de.json", json!({"greeting": "Hallo", "farewell": "Tschüss"})),
    ])
}

#[tokio::test]
async fn manual_prompt_and_reply_loop() {
    let fixture = greetings();
    let sessions = SessionService::new(app_state(None), factory_for(Arc::default()));

    let created = sessions
        .init_session(SessionRequest {
            files: fixture.files.clone(),
            target_language: Some("es".into()),
            ..SessionRequest::default()
        })
        .await
        .unwrap();
    assert_eq!(created.metadata.common_keys, 2);
    assert_eq!(created.seeded_keys, 0);

    let next = sessions.next_prompt(&created.session_id).await.unwrap();
    assert_eq!(next.keys, vec!["farewell".to_string(), "greeting".to_string()]);
    let prompt = next.prompt.unwrap();
    assert!(prompt.contains("Chunk of file de.json"));
    assert!(prompt.contains("language es"));

    let merged = sessions
        .submit_reply(
            &created.session_id,
            "```json\n{\"greeting\": \"Hola\", \"farewell\": \"Adiós\"}\n```",
        )
        .await
        .unwrap();
    assert_eq!(merged.added_keys, 2);
    assert_eq!(merged.remaining_keys, 0);

    let next = sessions.next_prompt(&created.session_id).await.unwrap();
    assert!(next.keys.is_empty());
    assert!(next.prompt.is_none());

    let progress = sessions.progress(&created.session_id).await.unwrap();
    assert_eq!(progress.status, "exhausted");
    assert_eq!(progress.translated_keys, 2);
    assert!((progress.progress - 1.0).abs() < f32::EPSILON);
}

#[tokio::test]
async fn malformed_manual_reply_is_rejected_without_changes() {
    let fixture = greetings();
    let sessions = SessionService::new(app_state(None), factory_for(Arc::default()));
    let created = sessions
        .init_session(SessionRequest {
            files: fixture.files.clone(),
            target_language: Some("es".into()),
            ..SessionRequest::default()
        })
        .await
        .unwrap();

    let err = sessions
        .submit_reply(&created.session_id, "no structure here")
        .await
        .unwrap_err();
    assert!(matches!(err, LocaleFillError::MalformedResponse(_)));
    assert!(sessions
        .translations(&created.session_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn unparsable_source_file_fails_init() {
    let fixture = Fixture::new(&[("en.json", json!({"a": "1"}))]);
    let broken = fixture.path().join("de.json");
    std::fs::write(&broken, "{ \"a\": ").unwrap();

    let sessions = SessionService::new(app_state(None), factory_for(Arc::default()));
    let err = sessions
        .init_session(SessionRequest {
            files: vec![fixture.files[0].clone(), broken],
            target_language: Some("es".into()),
            ..SessionRequest::default()
        })
        .await
        .unwrap_err();

    match err {
        LocaleFillError::CorpusParseError { document, .. } => assert_eq!(document, "de.json"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn missing_target_language_is_rejected() {
    let fixture = greetings();
    let sessions = SessionService::new(app_state(None), factory_for(Arc::default()));
    let err = sessions
        .init_session(SessionRequest {
            files: fixture.files.clone(),
            ..SessionRequest::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, LocaleFillError::ConfigError(_)));
}

#[tokio::test]
async fn automatic_run_exports_and_checkpoints() {
    let fixture = greetings();
    let checkpoints = CheckpointManager::new(&fixture.path().join("data/checkpoints.redb")).unwrap();
    let service = Arc::new(ScriptedService::replying([
        r#"{"farewell": "Adiós", "greeting": "Hola"}"#,
    ]));
    let sessions = SessionService::new(
        app_state(Some(checkpoints.clone())),
        factory_for(service.clone()),
    );

    let seed_path = fixture.path().join("pasted.json");
    std::fs::write(&seed_path, r#"{"greeting": "Buenas"}"#).unwrap();

    let created = sessions
        .init_session(SessionRequest {
            files: fixture.files.clone(),
            target_language: Some("es".into()),
            seed_file: Some(seed_path),
            ..SessionRequest::default()
        })
        .await
        .unwrap();
    assert_eq!(created.seeded_keys, 1);

    let handle = sessions.start_run(&created.session_id).await.unwrap();
    handle.await.unwrap();

    let progress = sessions.progress(&created.session_id).await.unwrap();
    assert_eq!(progress.status, "exhausted");
    assert_eq!(progress.rounds_completed, 1);
    assert!(service.prompts()[0].contains("\"farewell\": \"Goodbye\""));
    assert!(!service.prompts()[0].contains("\"greeting\": \"Hello\""));

    let out_dir = fixture.path().join("out");
    let path = sessions
        .export(&created.session_id, out_dir.clone())
        .await
        .unwrap();
    assert_eq!(path, out_dir.join("es.json"));
    let exported: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(exported, json!({"farewell": "Adiós", "greeting": "Hola"}));

    let checkpoint = checkpoints
        .load_checkpoint(&created.session_id)
        .unwrap()
        .unwrap();
    assert_eq!(checkpoint.status, RunState::StoppedByExhaustion);
    assert_eq!(checkpoint.translations.len(), 2);
}

#[tokio::test]
async fn failed_run_can_resume_from_checkpoint() {
    let fixture = greetings();
    let checkpoints = CheckpointManager::new(&fixture.path().join("checkpoints.redb")).unwrap();

    let failing = Arc::new(ScriptedService::replying(["I am not able to do that."]));
    let sessions = SessionService::new(app_state(Some(checkpoints.clone())), factory_for(failing));
    let created = sessions
        .init_session(SessionRequest {
            files: fixture.files.clone(),
            target_language: Some("fr".into()),
            ..SessionRequest::default()
        })
        .await
        .unwrap();
    sessions
        .submit_reply(&created.session_id, r#"{"farewell": "Au revoir"}"#)
        .await
        .unwrap();
    sessions
        .start_run(&created.session_id)
        .await
        .unwrap()
        .await
        .unwrap();

    let progress = sessions.progress(&created.session_id).await.unwrap();
    assert_eq!(progress.status, "failed");
    assert!(progress.last_error.is_some());
    assert_eq!(progress.translated_keys, 1);

    let working = Arc::new(ScriptedService::replying([r#"{"greeting": "Bonjour"}"#]));
    let resumed_sessions =
        SessionService::new(app_state(Some(checkpoints)), factory_for(working.clone()));
    let resumed = resumed_sessions
        .init_session(SessionRequest {
            resume_session_id: Some(created.session_id.clone()),
            ..SessionRequest::default()
        })
        .await
        .unwrap();
    assert_eq!(resumed.session_id, created.session_id);
    assert_eq!(resumed.target_language, "fr");
    assert_eq!(resumed.seeded_keys, 1);

    resumed_sessions
        .start_run(&resumed.session_id)
        .await
        .unwrap()
        .await
        .unwrap();

    let translations = resumed_sessions
        .translations(&resumed.session_id)
        .await
        .unwrap();
    assert_eq!(
        serde_json::to_value(&translations).unwrap(),
        json!({"farewell": "Au revoir", "greeting": "Bonjour"})
    );
    assert_eq!(working.call_count(), 1);
}

#[tokio::test]
async fn cancel_without_run_reports_false() {
    let fixture = greetings();
    let sessions = SessionService::new(app_state(None), factory_for(Arc::default()));
    let created = sessions
        .init_session(SessionRequest {
            files: fixture.files.clone(),
            target_language: Some("es".into()),
            ..SessionRequest::default()
        })
        .await
        .unwrap();

    assert!(!sessions.cancel_run(&created.session_id).await.unwrap());
    assert!(matches!(
        sessions.cancel_run("missing").await,
        Err(LocaleFillError::SessionNotFound(_))
    ));
}

#[tokio::test]
async fn new_session_reports_idle_until_a_run_starts() {
    let fixture = greetings();
    let sessions = SessionService::new(app_state(None), factory_for(Arc::default()));
    let created = sessions
        .init_session(SessionRequest {
            files: fixture.files.clone(),
            target_language: Some("es".into()),
            ..SessionRequest::default()
        })
        .await
        .unwrap();

    let progress = sessions.progress(&created.session_id).await.unwrap();
    assert_eq!(progress.status, "idle");

    sessions
        .submit_reply(&created.session_id, r#"{"greeting": "Hola"}"#)
        .await
        .unwrap();
    let progress = sessions.progress(&created.session_id).await.unwrap();
    assert_eq!(progress.status, "idle");
    assert_eq!(progress.translated_keys, 1);
}

#[tokio::test]
async fn resumed_session_keeps_creation_time_and_is_listed() {
    let fixture = greetings();
    let checkpoints = CheckpointManager::new(&fixture.path().join("checkpoints.redb")).unwrap();

    let mut stored = Checkpoint::new("earlier", fixture.files.clone(), "it");
    stored.created_at = 1;
    stored.updated_at = 1;
    checkpoints.save_checkpoint(&stored).unwrap();

    let sessions =
        SessionService::new(app_state(Some(checkpoints.clone())), factory_for(Arc::default()));
    let listed = sessions.stored_sessions().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].session_id, "earlier");
    assert_eq!(listed[0].target_language, "it");
    assert_eq!(listed[0].status, "idle");

    sessions
        .init_session(SessionRequest {
            resume_session_id: Some("earlier".into()),
            ..SessionRequest::default()
        })
        .await
        .unwrap();
    sessions
        .submit_reply("earlier", r#"{"greeting": "Ciao"}"#)
        .await
        .unwrap();

    let saved = checkpoints.load_checkpoint("earlier").unwrap().unwrap();
    assert_eq!(saved.created_at, 1);
    assert!(saved.updated_at > 1);
    assert_eq!(saved.translations.len(), 1);
}

#[tokio::test]
async fn listing_sessions_without_checkpoints_fails() {
    let sessions = SessionService::new(app_state(None), factory_for(Arc::default()));
    assert!(matches!(
        sessions.stored_sessions(),
        Err(LocaleFillError::CheckpointError(_))
    ));
}

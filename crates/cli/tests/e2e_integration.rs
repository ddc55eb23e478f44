//! End-to-end integration tests for Impersonator.
//!
//! These tests exercise the full pipeline from persisted settings and a chat
//! snapshot to generated text, including preset management, export/import
//! and the single-flight gate.

use std::sync::Arc;

use impersonator_agent::{Impersonator, PromptAssembler, Trigger};
use impersonator_config::PersistedSettings;
use impersonator_core::{
    BackendError, DomainEvent, EventBus, GenerationError, GenerationRequest, Generator,
    HostContext, NotificationLevel, PointOfView, PresetError, ResponseStyle,
};
use impersonator_presets::{FieldEdit, PresetExport, PresetSession, DEFAULT_PRESET};

// ── Mock Generator ───────────────────────────────────────────────────────

/// A mock generator that returns scripted replies in sequence and records
/// every request it receives.
struct ScriptedGenerator {
    replies: std::sync::Mutex<Vec<Result<String, BackendError>>>,
    requests: std::sync::Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    fn new(replies: Vec<Result<String, BackendError>>) -> Self {
        Self {
            replies: std::sync::Mutex::new(replies),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    fn text(reply: &str) -> Self {
        Self::new(vec![Ok(reply.to_string())])
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last_request(&self) -> GenerationRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request recorded")
    }
}

#[async_trait::async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, BackendError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        let replies = self.replies.lock().unwrap();
        if call > replies.len() {
            panic!("ScriptedGenerator exhausted: call #{call}, have {}", replies.len());
        }
        replies[call - 1].clone()
    }
}

/// A SillyTavern-style chat export.
fn chat() -> HostContext {
    serde_json::from_str(
        r#"{
            "name1": "Alice",
            "persona": "Alice is a retired sea captain.",
            "character": {"id": "3", "name": "Bob", "description": "Bob keeps the lighthouse."},
            "input": "mention the storm",
            "chat": [
                {"name": "Bob", "mes": "Welcome aboard.", "is_user": false},
                {"name": "Alice", "mes": "hi", "is_user": true},
                {"name": "Bob", "mes": "hello"},
                {"name": "System", "mes": "Bob lights the lamp.", "is_system": true},
                {"name": "Alice", "mes": "how are you", "is_user": true},
                {"name": "Bob", "mes": "fine"}
            ]
        }"#,
    )
    .unwrap()
}

fn enabled_session() -> PresetSession {
    let mut session = PresetSession::default();
    session.set_enabled(true);
    session
}

// ── E2E: Generation pipeline ─────────────────────────────────────────────

#[tokio::test]
async fn e2e_generate_with_builtin_preset() {
    let generator = Arc::new(ScriptedGenerator::text("\n  I grip the rail and grin.  \n"));
    let imp = Impersonator::new(generator.clone(), Arc::new(chat()));
    let mut session = enabled_session();
    session.switch("First Person Short").unwrap();

    let text = imp.command(session.active(), true).await;
    assert_eq!(text, "I grip the rail and grin.");

    let request = generator.last_request();
    assert_eq!(request.response_length, Some(100));
    assert!(request.system_prompt.starts_with("You are Alice."));
    assert!(request.system_prompt.contains("### Your Persona (Alice):\nAlice is a retired sea captain."));
    assert!(!request.system_prompt.contains("lighthouse"));
    // Window of 5 turns: the first greeting and the system note drop out
    assert!(!request.prompt.contains("Welcome aboard."));
    assert!(!request.prompt.contains("lights the lamp"));
    assert!(request.prompt.contains("Alice: hi\n\nBob: hello\n\nAlice: how are you\n\nBob: fine"));
    assert!(request.prompt.ends_with("Alice:"));
}

#[tokio::test]
async fn e2e_edits_flow_into_prompt_after_commit_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    let mut session = enabled_session();
    session.create("Captain").unwrap();
    session.edit(FieldEdit::parse("contextSize", "2").unwrap());
    session.edit(FieldEdit::parse("pov", "third").unwrap());
    session.edit(FieldEdit::parse("responseStyle", "long").unwrap());
    session.edit(FieldEdit::parse("includeCharCard", "true").unwrap());
    session.edit(FieldEdit::parse("maxTokens", "-20").unwrap());
    session.commit().unwrap();
    session.to_settings().save_to(&path).unwrap();

    let reloaded = PresetSession::load(&PersistedSettings::load_or_default(&path));
    assert!(reloaded.is_enabled());
    assert_eq!(reloaded.active().name(), "Captain");
    assert_eq!(reloaded.active().bundle.point_of_view, PointOfView::Third);
    assert_eq!(reloaded.active().bundle.response_style, ResponseStyle::Long);
    assert_eq!(reloaded.active().bundle.max_tokens, 0);

    let generator = Arc::new(ScriptedGenerator::text("Alice squints at the horizon."));
    let imp = Impersonator::new(generator.clone(), Arc::new(chat()));
    assert_eq!(
        imp.generate(reloaded.active()).await.unwrap(),
        "Alice squints at the horizon."
    );

    let request = generator.last_request();
    assert_eq!(request.response_length, None);
    assert!(request.system_prompt.contains("### Character Information (Bob):\nBob keeps the lighthouse."));
    assert!(request.system_prompt.contains("third-person, using Alice's name or pronouns"));
    assert!(request.system_prompt.contains("4+ paragraphs"));
    assert!(request.prompt.starts_with("### Recent Conversation:\n\nAlice: how are you\n\nBob: fine"));
}

#[tokio::test]
async fn e2e_no_chat_does_not_generate() {
    let generator = Arc::new(ScriptedGenerator::text("unused"));
    let events = Arc::new(EventBus::default());
    let mut rx = events.subscribe();
    let imp = Impersonator::new(generator.clone(), Arc::new(|| None::<HostContext>))
        .with_events(events.clone());

    assert_eq!(imp.run(enabled_session().active(), Trigger::Manual).await, None);
    assert_eq!(generator.calls(), 0);
    assert!(!imp.is_busy());

    let event = rx.try_recv().unwrap();
    match event.as_ref() {
        DomainEvent::Notification { level, message, .. } => {
            assert_eq!(*level, NotificationLevel::Error);
            assert_eq!(message, "No conversation context available");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn e2e_backend_failure_then_recovery() {
    let generator = Arc::new(ScriptedGenerator::new(vec![
        Err(BackendError::RateLimited { retry_after_secs: 5 }),
        Ok("   ".into()),
        Ok("Second time lucky.".into()),
    ]));
    let imp = Impersonator::new(generator.clone(), Arc::new(chat()));
    let session = enabled_session();

    assert!(matches!(
        imp.generate(session.active()).await,
        Err(GenerationError::Failed(BackendError::RateLimited { .. }))
    ));
    assert!(matches!(
        imp.generate(session.active()).await,
        Err(GenerationError::EmptyResponse)
    ));
    assert_eq!(imp.generate(session.active()).await.unwrap(), "Second time lucky.");
    assert_eq!(generator.calls(), 3);
}

#[tokio::test]
async fn e2e_disabled_session_is_a_silent_noop() {
    let generator = Arc::new(ScriptedGenerator::text("unused"));
    let imp = Impersonator::new(generator.clone(), Arc::new(chat()));
    let mut rx = imp.events().subscribe();
    let session = PresetSession::default();

    assert_eq!(imp.command(session.active(), false).await, "");
    assert_eq!(imp.run(session.active(), Trigger::HostEvent).await, None);
    assert!(rx.try_recv().is_err());
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn e2e_test_impersonation_reports_stats() {
    let imp = Impersonator::new(
        Arc::new(ScriptedGenerator::text("Aye, fine weather.")),
        Arc::new(chat()),
    );
    let report = imp.test(enabled_session().active()).await.unwrap();
    assert_eq!(report.words, 3);
    assert_eq!(report.characters, 18);
}

// ── E2E: Presets ─────────────────────────────────────────────────────────

#[test]
fn e2e_export_import_roundtrip_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = PresetSession::default();
    session.create("Storm Watch").unwrap();
    session.edit(FieldEdit::Instruction("Talk about weather.".into()));
    session.commit().unwrap();

    let export = session.export("Storm Watch").unwrap();
    assert!(export.file_name().starts_with("impersonator-storm-watch-"));
    let file = dir.path().join(export.file_name());
    std::fs::write(&file, export.to_json().unwrap()).unwrap();
    let payload = std::fs::read_to_string(&file).unwrap();

    let mut other = PresetSession::default();
    let before = other.store().len();
    let name = other.import(&payload, None).unwrap();
    assert_eq!(name, "Storm Watch");
    assert_eq!(other.store().len(), before + 1);
    assert_eq!(other.store().get("Storm Watch"), session.store().get("Storm Watch"));
}

#[test]
fn e2e_import_collision_needs_new_name() {
    let mut session = PresetSession::default();
    let original = session.store().get(DEFAULT_PRESET).cloned().unwrap();
    let mut modified = original.clone();
    modified.context_size = 3;
    let payload = PresetExport::new(&modified).to_json().unwrap();
    let before = session.store().len();

    match session.import(&payload, None) {
        Err(PresetError::NameConflict { name, suggestion }) => {
            assert_eq!(name, DEFAULT_PRESET);
            assert_eq!(suggestion, "Default (imported)");
        }
        other => panic!("expected a name conflict, got {other:?}"),
    }
    assert_eq!(session.store().len(), before);
    assert_eq!(session.store().get(DEFAULT_PRESET), Some(&original));

    let name = session.import(&payload, Some("Default (imported)")).unwrap();
    assert_eq!(session.store().len(), before + 1);
    assert_eq!(session.store().get(&name).unwrap().context_size, 3);
    assert_eq!(session.store().get(DEFAULT_PRESET), Some(&original));
}

#[test]
fn e2e_builtins_survive_delete_and_settings_import() {
    let mut session = PresetSession::default();
    let before = session.store().clone();
    assert_eq!(
        session.remove("Third Person"),
        Err(PresetError::Protected("Third Person".into()))
    );
    assert_eq!(session.store(), &before);

    let payload = r#"{
        "version": "1.0",
        "settings": {
            "enabled": true,
            "activeName": "Gone",
            "presets": {"Mine": {"name": "Mine", "contextSize": "4"}},
            "currentSettings": {"contextSize": 99}
        },
        "timestamp": "2025-03-01T12:00:00.000Z"
    }"#;
    session.import_settings(payload).unwrap();
    assert!(session.is_enabled());
    assert_eq!(session.active().name(), DEFAULT_PRESET);
    assert_eq!(session.store().get("Mine").unwrap().context_size, 4);
    for builtin in impersonator_presets::BUILTIN_NAMES {
        assert!(session.store().contains(builtin), "missing {builtin}");
    }
}

#[test]
fn e2e_dry_run_is_deterministic() {
    let session = PresetSession::default();
    let ctx = chat();
    let assembler = PromptAssembler::new();
    let first = assembler.assemble(&session.active().bundle, Some(&ctx)).unwrap();
    let second = assembler.assemble(&session.active().bundle, Some(&ctx)).unwrap();
    assert_eq!(first, second);
    assert!(first.user_prompt.contains(
        "### Idea for Alice's next message (guidance only, do not copy verbatim):\nmention the storm"
    ));
}

//! The impersonation command surface.
//!
//! [`Impersonator::generate`] is the typed pipeline: gate, assemble, call the
//! generator, trim. [`Impersonator::run`] and friends are the recovery
//! boundary: every failure becomes a notification and an empty result, never
//! a crash.

use crate::context::{ImpersonationPrompt, PromptAssembler};
use crate::gate::GenerationGate;
use chrono::Utc;
use impersonator_core::{
    ContextSource, DomainEvent, EventBus, GenerationError, GenerationRequest, Generator,
    MacroSource, NotificationLevel,
};
use impersonator_presets::ActiveConfiguration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// What asked for an impersonation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The impersonate button; warns when the feature is off
    Manual,
    /// `/impersonate [quiet=true]`
    SlashCommand { quiet: bool },
    /// The host's own impersonate event; silently ignored when off
    HostEvent,
}

impl Trigger {
    /// Only a non-quiet slash command shows the "generating" toast.
    fn announces(self) -> bool {
        matches!(self, Self::SlashCommand { quiet: false })
    }
}

/// Result of a test impersonation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestReport {
    pub text: String,
    pub characters: usize,
    pub words: usize,
}

impl TestReport {
    pub fn new(text: String) -> Self {
        Self {
            characters: text.chars().count(),
            words: text.split_whitespace().count(),
            text,
        }
    }
}

/// Orchestrates one impersonation at a time.
pub struct Impersonator {
    /// Text generation backend
    generator: Arc<dyn Generator>,

    /// Live chat snapshot supplier
    context: Arc<dyn ContextSource>,

    /// Event bus for notifications and lifecycle events
    events: Arc<EventBus>,

    assembler: PromptAssembler,
    gate: GenerationGate,
}

impl Impersonator {
    pub fn new(generator: Arc<dyn Generator>, context: Arc<dyn ContextSource>) -> Self {
        Self {
            generator,
            context,
            events: Arc::new(EventBus::default()),
            assembler: PromptAssembler::new(),
            gate: GenerationGate::new(),
        }
    }

    /// Publish on a shared bus instead of a private one.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    /// Expand host macros through the host's own lookup.
    pub fn with_macros(mut self, macros: Arc<dyn MacroSource>) -> Self {
        self.assembler = self.assembler.with_macros(macros);
        self
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn is_busy(&self) -> bool {
        self.gate.is_busy()
    }

    /// Assemble prompts without generating (dry run). Ignores `enabled`.
    pub fn prompt(&self, config: &ActiveConfiguration) -> Result<ImpersonationPrompt, GenerationError> {
        let snapshot = self.context.snapshot();
        Ok(self.assembler.assemble(&config.bundle, snapshot.as_ref())?)
    }

    /// Run one impersonation and return the trimmed text.
    ///
    /// Rejected up front with `AlreadyInProgress` or `Disabled`. The gate is
    /// held from here until return, whatever the outcome.
    pub async fn generate(&self, config: &ActiveConfiguration) -> Result<String, GenerationError> {
        let _busy = self.gate.try_acquire()?;

        if !config.enabled {
            debug!("Impersonation is disabled");
            return Err(GenerationError::Disabled);
        }

        let snapshot = self.context.snapshot();
        let prompt = self.assembler.assemble(&config.bundle, snapshot.as_ref())?;

        let request_id = Uuid::new_v4();
        let preset = config.name().to_string();
        info!(
            %request_id,
            preset = %preset,
            turns = prompt.metadata.turns_included,
            "Starting impersonation"
        );
        self.events.publish(DomainEvent::ImpersonationStarted {
            request_id,
            preset,
            turns: prompt.metadata.turns_included,
            timestamp: Utc::now(),
        });

        let request = GenerationRequest {
            prompt: prompt.user_prompt,
            system_prompt: prompt.system_prompt,
            response_length: config.bundle.response_length(),
        };

        let started = Instant::now();
        let outcome = match self.generator.generate(request).await {
            Ok(text) if text.trim().is_empty() => Err(GenerationError::EmptyResponse),
            Ok(text) => Ok(text.trim().to_string()),
            Err(e) => Err(GenerationError::Failed(e)),
        };

        match &outcome {
            Ok(text) => {
                let characters = text.chars().count();
                let duration_ms = started.elapsed().as_millis() as u64;
                info!(%request_id, characters, duration_ms, "Impersonation successful");
                self.events.publish(DomainEvent::ImpersonationCompleted {
                    request_id,
                    characters,
                    duration_ms,
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                error!(%request_id, generator = self.generator.name(), "Impersonation failed: {e}");
                self.events.publish(DomainEvent::ImpersonationFailed {
                    request_id,
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }

        outcome
    }

    /// Handle a trigger. Failures are notified and yield `None`.
    pub async fn run(&self, config: &ActiveConfiguration, trigger: Trigger) -> Option<String> {
        if !config.enabled {
            match trigger {
                Trigger::Manual => self.notify(NotificationLevel::Warning, "Impersonator is disabled"),
                _ => debug!(?trigger, "Ignoring trigger while disabled"),
            }
            return None;
        }

        if trigger.announces() {
            self.notify(NotificationLevel::Info, "Generating impersonated response...");
        }

        self.recover(self.generate(config).await)
    }

    /// The slash command: generated text, or `""` on any failure.
    pub async fn command(&self, config: &ActiveConfiguration, quiet: bool) -> String {
        self.run(config, Trigger::SlashCommand { quiet })
            .await
            .unwrap_or_default()
    }

    /// Generate once and report basic stats.
    pub async fn test(&self, config: &ActiveConfiguration) -> Option<TestReport> {
        let text = self.recover(self.generate(config).await)?;
        self.notify(NotificationLevel::Success, "Test successful!");
        Some(TestReport::new(text))
    }

    fn recover(&self, outcome: Result<String, GenerationError>) -> Option<String> {
        match outcome {
            Ok(text) => Some(text),
            Err(e) => {
                if e.is_user_facing() {
                    let (level, message) = Self::describe(&e);
                    self.notify(level, message);
                } else {
                    debug!("Impersonation skipped: {e}");
                }
                None
            }
        }
    }

    fn describe(err: &GenerationError) -> (NotificationLevel, String) {
        match err {
            GenerationError::AlreadyInProgress => (NotificationLevel::Warning, err.to_string()),
            GenerationError::EmptyResponse => (
                NotificationLevel::Error,
                format!("Failed to generate response: {err}"),
            ),
            _ => (NotificationLevel::Error, err.to_string()),
        }
    }

    fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        let message = message.into();
        if level == NotificationLevel::Warning {
            warn!("{message}");
        }
        self.events.notify(level, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use impersonator_core::{BackendError, ConversationTurn, HostContext, PresetBundle};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// Returns a fixed reply and records every request.
    struct Recording {
        reply: Result<String, BackendError>,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    impl Recording {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn failing(err: BackendError) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(err),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Generator for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        async fn generate(&self, request: GenerationRequest) -> Result<String, BackendError> {
            self.requests.lock().unwrap().push(request);
            self.reply.clone()
        }
    }

    /// Blocks until released, so a second request can arrive mid-flight.
    struct Blocking {
        release: Notify,
        entered: Notify,
    }

    #[async_trait]
    impl Generator for Blocking {
        fn name(&self) -> &str {
            "blocking"
        }

        async fn generate(&self, _request: GenerationRequest) -> Result<String, BackendError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok("  first  ".into())
        }
    }

    fn chat() -> HostContext {
        HostContext {
            user_name: "A".into(),
            turns: vec![
                ConversationTurn::user("A", "hi"),
                ConversationTurn::character("B", "hello"),
            ],
            ..Default::default()
        }
    }

    fn enabled() -> ActiveConfiguration {
        ActiveConfiguration::new(true, PresetBundle::named("Default"))
    }

    #[tokio::test]
    async fn returns_trimmed_text_and_passes_bounds() {
        let generator = Recording::replying("\n  Sure thing.  \n");
        let imp = Impersonator::new(generator.clone(), Arc::new(chat()));

        let mut config = enabled();
        assert_eq!(imp.generate(&config).await.unwrap(), "Sure thing.");
        assert_eq!(generator.requests.lock().unwrap()[0].response_length, None);

        config.bundle.max_tokens = 120;
        imp.generate(&config).await.unwrap();
        let requests = generator.requests.lock().unwrap();
        assert_eq!(requests[1].response_length, Some(120));
        assert!(requests[1].prompt.ends_with("A:"));
    }

    #[tokio::test]
    async fn no_context_never_calls_generator() {
        let generator = Recording::replying("unused");
        let imp = Impersonator::new(generator.clone(), Arc::new(HostContext::default()));
        assert!(matches!(imp.generate(&enabled()).await, Err(GenerationError::NoContext)));

        let no_chat = Impersonator::new(generator.clone(), Arc::new(|| None::<HostContext>));
        assert!(matches!(no_chat.generate(&enabled()).await, Err(GenerationError::NoContext)));
        assert_eq!(generator.calls(), 0);
        assert!(!imp.is_busy());
    }

    #[tokio::test]
    async fn disabled_is_rejected_silently() {
        let generator = Recording::replying("unused");
        let imp = Impersonator::new(generator.clone(), Arc::new(chat()));
        let mut rx = imp.events().subscribe();
        let config = ActiveConfiguration::new(false, PresetBundle::named("Default"));

        assert!(matches!(imp.generate(&config).await, Err(GenerationError::Disabled)));
        assert_eq!(imp.command(&config, false).await, "");
        assert_eq!(imp.run(&config, Trigger::HostEvent).await, None);
        assert!(rx.try_recv().is_err());
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn manual_trigger_warns_when_disabled() {
        let imp = Impersonator::new(Recording::replying("x"), Arc::new(chat()));
        let mut rx = imp.events().subscribe();
        let config = ActiveConfiguration::new(false, PresetBundle::named("Default"));

        assert_eq!(imp.run(&config, Trigger::Manual).await, None);
        let event = rx.try_recv().unwrap();
        assert!(matches!(
            event.as_ref(),
            DomainEvent::Notification { level: NotificationLevel::Warning, message, .. }
                if message == "Impersonator is disabled"
        ));
    }

    #[tokio::test]
    async fn empty_output_is_an_error_and_releases_gate() {
        let imp = Impersonator::new(Recording::replying("   \n "), Arc::new(chat()));
        assert!(matches!(imp.generate(&enabled()).await, Err(GenerationError::EmptyResponse)));
        assert!(!imp.is_busy());
    }

    #[tokio::test]
    async fn backend_failure_is_notified_and_releases_gate() {
        let generator = Recording::failing(BackendError::Network("connection reset".into()));
        let imp = Impersonator::new(generator.clone(), Arc::new(chat()));
        let mut rx = imp.events().subscribe();

        assert_eq!(imp.command(&enabled(), true).await, "");
        assert!(!imp.is_busy());
        assert_eq!(generator.calls(), 1);

        let mut saw_error = false;
        while let Ok(event) = rx.try_recv() {
            if let DomainEvent::Notification { level: NotificationLevel::Error, message, .. } = event.as_ref() {
                assert!(message.starts_with("Failed to generate response"));
                saw_error = true;
            }
        }
        assert!(saw_error);
    }

    #[tokio::test]
    async fn second_request_while_busy_is_rejected() {
        let generator = Arc::new(Blocking {
            release: Notify::new(),
            entered: Notify::new(),
        });
        let imp = Impersonator::new(generator.clone(), Arc::new(chat()));
        let config = enabled();

        let first = imp.generate(&config);
        let second = async {
            generator.entered.notified().await;
            assert!(imp.is_busy());
            let rejected = imp.generate(&config).await;
            generator.release.notify_one();
            rejected
        };

        let (first, second) = tokio::join!(first, second);
        assert_eq!(first.unwrap(), "first");
        assert!(matches!(second, Err(GenerationError::AlreadyInProgress)));
        assert!(!imp.is_busy());
    }

    #[tokio::test]
    async fn test_reports_stats() {
        let imp = Impersonator::new(Recording::replying(" I wave back, smiling. "), Arc::new(chat()));
        let report = imp.test(&enabled()).await.unwrap();
        assert_eq!(report.text, "I wave back, smiling.");
        assert_eq!(report.words, 4);
        assert_eq!(report.characters, 21);
    }

    #[tokio::test]
    async fn lifecycle_events_share_request_id() {
        let imp = Impersonator::new(Recording::replying("ok"), Arc::new(chat()));
        let mut rx = imp.events().subscribe();
        imp.generate(&enabled()).await.unwrap();

        let started = rx.try_recv().unwrap();
        let completed = rx.try_recv().unwrap();
        match (started.as_ref(), completed.as_ref()) {
            (
                DomainEvent::ImpersonationStarted { request_id: a, preset, turns, .. },
                DomainEvent::ImpersonationCompleted { request_id: b, characters, .. },
            ) => {
                assert_eq!(a, b);
                assert_eq!(preset, "Default");
                assert_eq!(*turns, 2);
                assert_eq!(*characters, 2);
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[tokio::test]
    async fn host_macros_reach_the_request() {
        let generator = Recording::replying("ok");
        let mut config = enabled();
        config.bundle.system_prompt = "It is {{time}} for {{user}}.".into();
        let imp = Impersonator::new(generator.clone(), Arc::new(chat()))
            .with_macros(Arc::new(|name: &str| (name == "time").then(|| "dawn".to_string())));

        imp.generate(&config).await.unwrap();
        let requests = generator.requests.lock().unwrap();
        assert!(requests[0].system_prompt.starts_with("It is dawn for A."));
    }

    #[test]
    fn dry_run_ignores_enabled_flag() {
        let imp = Impersonator::new(Recording::replying("x"), Arc::new(chat()));
        let config = ActiveConfiguration::new(false, PresetBundle::named("Default"));
        let prompt = imp.prompt(&config).unwrap();
        assert!(prompt.user_prompt.contains("B: hello"));
    }
}

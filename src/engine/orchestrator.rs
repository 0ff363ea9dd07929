// Valet Engine — Escalation Orchestrator
// Sequences the resolution stages for one turn — rules, contact heuristic,
// AI router, answer-or-search — and owns the cross-turn conversation state
// (interaction timestamp, pending command, last answer). The first stage to
// produce a classification short-circuits the rest, with one exception:
// in ai_default_mode, non-action classifications go straight to the
// answer/search stage even when a rule matched.

use crate::atoms::traits::{LanguageModel, SpeechOutput, WebBrowser};
use crate::atoms::types::{AssistantConfig, ContactBook, CustomCommands, Intent};
use crate::engine::answer::{answer_or_search, is_question};
use crate::engine::{contacts, router, rules};
use log::info;
use std::sync::Arc;
use std::time::Instant;

/// Which stage produced the turn's classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Rules,
    Contacts,
    AiRouter,
    AnswerOrSearch,
}

/// Outcome of one turn through the chain.
#[derive(Debug, PartialEq)]
pub enum Resolution {
    /// A classification to hand to the executor.
    Act { intent: Intent, stage: Stage },
    /// The answer/search stage already produced the user-visible output.
    Answered,
}

/// Process-lifetime conversational state. Mutated after every turn, never
/// persisted.
#[derive(Default)]
pub struct ConversationState {
    last_interaction: Option<Instant>,
    pending_command: Option<String>,
    last_answer: String,
}

pub struct Orchestrator {
    config: AssistantConfig,
    contacts: ContactBook,
    custom: CustomCommands,
    model: Arc<dyn LanguageModel>,
    speech: Arc<dyn SpeechOutput>,
    browser: Arc<dyn WebBrowser>,
    state: ConversationState,
}

impl Orchestrator {
    pub fn new(
        config: AssistantConfig,
        contacts: ContactBook,
        custom: CustomCommands,
        model: Arc<dyn LanguageModel>,
        speech: Arc<dyn SpeechOutput>,
        browser: Arc<dyn WebBrowser>,
    ) -> Self {
        Orchestrator {
            config,
            contacts,
            custom,
            model,
            speech,
            browser,
            state: ConversationState::default(),
        }
    }

    // ── Conversation window & cross-turn state ─────────────────────────

    /// True while the follow-up window is open: wake-word re-detection is
    /// bypassed and the loop goes straight to command capture.
    pub fn in_conversation_window(&self) -> bool {
        let window = self.config.conversation_window_seconds;
        window > 0
            && self
                .state
                .last_interaction
                .is_some_and(|t| t.elapsed().as_secs() <= window)
    }

    /// Stamp a successful turn.
    pub fn note_interaction(&mut self) {
        self.state.last_interaction = Some(Instant::now());
    }

    /// Stash a command already captured alongside the wake phrase.
    pub fn set_pending_command(&mut self, command: impl Into<String>) {
        self.state.pending_command = Some(command.into());
    }

    pub fn take_pending_command(&mut self) -> Option<String> {
        self.state.pending_command.take()
    }

    pub fn last_answer(&self) -> &str {
        &self.state.last_answer
    }

    fn note_answer(&mut self, answer: String) {
        if !answer.is_empty() {
            self.state.last_answer = answer;
        }
    }

    // ── The escalation chain ───────────────────────────────────────────

    /// Resolve one utterance to exactly one outcome.
    pub async fn resolve(&mut self, utterance: &str) -> Resolution {
        let intent = rules::match_intent(utterance, &self.custom);
        info!("[orchestrator] rules classified '{}' as '{}'", utterance, intent.tag());

        // ai_default_mode: non-action classifications skip straight to the
        // generic answer/search stage, definite or not.
        if self.config.ai_default_mode && !intent.is_action() {
            if let Some(outcome) = self.try_answer(utterance).await {
                return outcome;
            }
        }

        // Questions-only variant of the same override.
        if self.config.ai_default_for_questions
            && !intent.is_action()
            && is_question(utterance)
        {
            if let Some(outcome) = self.try_answer(utterance).await {
                return outcome;
            }
        }

        if matches!(intent, Intent::Unknown(_)) {
            // Contact-aware quick match before AI routing.
            if let Some(contact_intent) = contacts::resolve(utterance, &self.contacts) {
                info!("[orchestrator] contact fallback matched '{}'", contact_intent.tag());
                return Resolution::Act { intent: contact_intent, stage: Stage::Contacts };
            }

            if self.config.ai_action_routing {
                if let Some(ai_intent) = router::route(&*self.model, utterance).await {
                    info!("[orchestrator] AI routed to '{}'", ai_intent.tag());
                    return Resolution::Act { intent: ai_intent, stage: Stage::AiRouter };
                }
            }

            if let Some(outcome) = self.try_answer(utterance).await {
                return outcome;
            }
        }

        // A definite classification (or an unanswerable unknown, which the
        // executor turns into the generic not-understood reply).
        Resolution::Act { intent, stage: Stage::Rules }
    }

    async fn try_answer(&mut self, utterance: &str) -> Option<Resolution> {
        let answer = answer_or_search(
            &*self.speech,
            &*self.browser,
            &self.config,
            &*self.model,
            utterance,
        )
        .await?;
        self.note_answer(answer);
        self.note_interaction();
        info!("[orchestrator] handled via answer/search");
        Some(Resolution::Answered)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::error::{EngineError, EngineResult};
    use crate::atoms::types::{Contact, VolumeDirection};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Model stub that counts calls and replies with a fixed string.
    struct CountingModel {
        calls: AtomicU32,
        reply: Option<String>,
    }

    impl CountingModel {
        fn new(reply: Option<&str>) -> Arc<Self> {
            Arc::new(CountingModel {
                calls: AtomicU32::new(0),
                reply: reply.map(str::to_string),
            })
        }
    }

    #[async_trait]
    impl LanguageModel for CountingModel {
        async fn generate(&self, _prompt: &str) -> EngineResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Some(r) => Ok(r.clone()),
                None => Err(EngineError::capability("model", "down")),
            }
        }
    }

    struct Recorder {
        spoken: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SpeechOutput for Recorder {
        async fn say(&self, text: &str) -> EngineResult<()> {
            self.spoken.lock().push(text.to_string());
            Ok(())
        }
    }

    #[async_trait]
    impl WebBrowser for Recorder {
        async fn open(&self, _url: &str) -> EngineResult<()> {
            Ok(())
        }
    }

    fn orchestrator(
        config: AssistantConfig,
        contacts: ContactBook,
        model: Arc<CountingModel>,
    ) -> (Orchestrator, Arc<Recorder>) {
        let rec = Arc::new(Recorder { spoken: Mutex::new(Vec::new()) });
        let orch = Orchestrator::new(
            config,
            contacts,
            HashMap::new(),
            model,
            rec.clone(),
            rec.clone(),
        );
        (orch, rec)
    }

    fn mom() -> ContactBook {
        let mut book = ContactBook::new();
        book.insert("mom", Contact { phone: Some("+15551234".into()), ..Default::default() });
        book
    }

    #[tokio::test]
    async fn test_rule_match_short_circuits_later_stages() {
        let model = CountingModel::new(Some("should never be called"));
        let (mut orch, _) = orchestrator(AssistantConfig::default(), mom(), model.clone());

        let got = orch.resolve("open notepad").await;
        assert_eq!(
            got,
            Resolution::Act { intent: Intent::OpenApp("notepad".into()), stage: Stage::Rules }
        );
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_contact_stage_runs_before_ai() {
        let model = CountingModel::new(Some(r#"{"intent":"greet","args":{}}"#));
        let (mut orch, _) = orchestrator(AssistantConfig::default(), mom(), model.clone());

        // Rule-unknown phrasing that still contains "call mom".
        let got = orch.resolve("would you call mom").await;
        assert_eq!(
            got,
            Resolution::Act { intent: Intent::Call("mom".into()), stage: Stage::Contacts }
        );
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ai_stage_classifies_unknowns() {
        let model = CountingModel::new(Some(r#"{"intent":"volume","args":{"direction":"up"}}"#));
        let (mut orch, _) =
            orchestrator(AssistantConfig::default(), ContactBook::new(), model.clone());

        let got = orch.resolve("crank it a bit louder").await;
        assert_eq!(
            got,
            Resolution::Act {
                intent: Intent::Volume(VolumeDirection::Up),
                stage: Stage::AiRouter
            }
        );
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ai_rejection_falls_through_to_answer() {
        // Not JSON, so the router rejects it; the same text then becomes the
        // spoken answer of the fallback stage.
        let model = CountingModel::new(Some("The capital of France is Paris."));
        let (mut orch, rec) =
            orchestrator(AssistantConfig::default(), ContactBook::new(), model.clone());

        let got = orch.resolve("capital of france").await;
        assert_eq!(got, Resolution::Answered);
        assert_eq!(orch.last_answer(), "The capital of France is Paris.");
        assert_eq!(*rec.spoken.lock(), vec!["The capital of France is Paris.".to_string()]);
        // One router call + one answer call.
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_ai_routing_disabled_skips_router() {
        let model = CountingModel::new(Some("answer text"));
        let config = AssistantConfig { ai_action_routing: false, ..Default::default() };
        let (mut orch, _) = orchestrator(config, ContactBook::new(), model.clone());

        let got = orch.resolve("something unclassifiable").await;
        assert_eq!(got, Resolution::Answered);
        // Only the answer stage called the model.
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ai_default_mode_overrides_non_action_rule_match() {
        let model = CountingModel::new(Some("It looks sunny."));
        let config = AssistantConfig {
            ai_default_mode: true,
            also_open_web_on_ai_answer: false,
            ..Default::default()
        };
        let (mut orch, _) = orchestrator(config, ContactBook::new(), model.clone());

        // "weather" is a definite rule classification but not an action
        // intent, so it goes straight to answer/search.
        let got = orch.resolve("weather").await;
        assert_eq!(got, Resolution::Answered);
        assert_eq!(orch.last_answer(), "It looks sunny.");

        // Action intents are untouched by the override.
        let got = orch.resolve("open notepad").await;
        assert_eq!(
            got,
            Resolution::Act { intent: Intent::OpenApp("notepad".into()), stage: Stage::Rules }
        );
    }

    #[tokio::test]
    async fn test_total_capability_absence_degrades_to_unknown_action() {
        let model = CountingModel::new(None);
        let config = AssistantConfig { web_fallback_on_ai_failure: true, ..Default::default() };
        let rec = Arc::new(Recorder { spoken: Mutex::new(Vec::new()) });
        // Browser that always fails: nothing can produce output.
        struct DeadBrowser;
        #[async_trait]
        impl WebBrowser for DeadBrowser {
            async fn open(&self, _url: &str) -> EngineResult<()> {
                Err(EngineError::capability("browser", "gone"))
            }
        }
        let mut orch = Orchestrator::new(
            config,
            ContactBook::new(),
            HashMap::new(),
            model,
            rec,
            Arc::new(DeadBrowser),
        );

        let got = orch.resolve("mystery phrase").await;
        assert_eq!(
            got,
            Resolution::Act { intent: Intent::Unknown("mystery phrase".into()), stage: Stage::Rules }
        );
    }

    #[test]
    fn test_conversation_window() {
        let model = CountingModel::new(None);
        let config = AssistantConfig { conversation_window_seconds: 60, ..Default::default() };
        let (mut orch, _) = orchestrator(config, ContactBook::new(), model);

        assert!(!orch.in_conversation_window());
        orch.note_interaction();
        assert!(orch.in_conversation_window());
    }

    #[test]
    fn test_zero_window_never_opens() {
        let model = CountingModel::new(None);
        let (mut orch, _) = orchestrator(AssistantConfig::default(), ContactBook::new(), model);
        orch.note_interaction();
        assert!(!orch.in_conversation_window());
    }

    #[test]
    fn test_pending_command_is_consumed_once() {
        let model = CountingModel::new(None);
        let (mut orch, _) = orchestrator(AssistantConfig::default(), ContactBook::new(), model);
        orch.set_pending_command("open notepad");
        assert_eq!(orch.take_pending_command().as_deref(), Some("open notepad"));
        assert_eq!(orch.take_pending_command(), None);
    }
}

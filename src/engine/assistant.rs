// Valet Engine — Command Loop
// The single-threaded cooperative loop: wait for a wake word (or an external
// trigger), capture a command, run it through the escalation chain, execute,
// stamp the conversation window. Each turn runs the stages synchronously in
// sequence; network-bound stages block the turn for their duration.
//
// Triggers arrive over an mpsc channel consumed only by this loop, so a
// hotkey press can neither be lost nor double-fire a turn.

use crate::atoms::constants::WAKE_WORDS;
use crate::atoms::error::EngineResult;
use crate::atoms::traits::{SpeechInput, SpeechOutput};
use crate::atoms::types::AssistantConfig;
use crate::engine::executor::Executor;
use crate::engine::orchestrator::{Orchestrator, Resolution};
use log::info;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Handle other threads/tasks use to fire a turn immediately (the hotkey
/// path). Cloneable; sends never block the sender.
#[derive(Clone)]
pub struct TriggerHandle(mpsc::Sender<()>);

impl TriggerHandle {
    pub fn trigger(&self) {
        let _ = self.0.try_send(());
    }
}

pub fn contains_wake_word(text: &str) -> bool {
    WAKE_WORDS.iter().any(|w| text.contains(w))
}

/// Remove every wake phrase from an utterance, leaving the command tail the
/// user said in the same breath.
pub fn strip_wake_words(text: &str) -> String {
    let mut tail = text.to_string();
    for w in WAKE_WORDS {
        tail = tail.replace(w, " ");
    }
    tail.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub struct Assistant {
    input: Arc<dyn SpeechInput>,
    speech: Arc<dyn SpeechOutput>,
    orchestrator: Orchestrator,
    executor: Executor,
    config: AssistantConfig,
    trigger_rx: mpsc::Receiver<()>,
    // Keeps the channel open even when no external trigger source exists.
    _trigger_tx: mpsc::Sender<()>,
}

impl Assistant {
    pub fn new(
        input: Arc<dyn SpeechInput>,
        speech: Arc<dyn SpeechOutput>,
        orchestrator: Orchestrator,
        executor: Executor,
        config: AssistantConfig,
    ) -> (Self, TriggerHandle) {
        let (tx, rx) = mpsc::channel(8);
        let handle = TriggerHandle(tx.clone());
        let assistant = Assistant {
            input,
            speech,
            orchestrator,
            executor,
            config,
            trigger_rx: rx,
            _trigger_tx: tx,
        };
        (assistant, handle)
    }

    /// Run until the exit intent or a fatal input failure. Transient input
    /// noise (empty transcriptions) is silently ignored.
    pub async fn run(&mut self) -> EngineResult<()> {
        loop {
            let triggered = self.trigger_rx.try_recv().is_ok();

            if !triggered && !self.orchestrator.in_conversation_window() {
                if self.config.wake_word_enabled {
                    info!("[assistant] listening for wake word");
                    tokio::select! {
                        // A trigger arms the turn directly.
                        _ = self.trigger_rx.recv() => {}
                        heard = self.input.listen() => {
                            let text = heard?;
                            if text.is_empty() || !contains_wake_word(&text) {
                                continue;
                            }
                            // A command said in the same breath as the wake
                            // phrase skips the second capture entirely.
                            let tail = strip_wake_words(&text);
                            if !tail.is_empty() {
                                self.orchestrator.set_pending_command(tail);
                            } else {
                                let reply = self.config.wake_reply.clone();
                                let _ = self.speech.say(&reply).await;
                            }
                        }
                    }
                } else if self.trigger_rx.recv().await.is_none() {
                    // No wake word and no trigger source left.
                    return Ok(());
                }
            }

            info!("[assistant] waiting for command");
            let command = match self.orchestrator.take_pending_command() {
                Some(pending) => pending,
                None => self.input.listen().await?,
            };
            if command.is_empty() {
                info!("[assistant] empty command");
                continue;
            }
            info!("[assistant] command: {command}");

            match self.orchestrator.resolve(&command).await {
                Resolution::Answered => {
                    // The answer/search stage spoke already and stamped the
                    // window itself.
                }
                Resolution::Act { intent, .. } => {
                    let last_answer = self.orchestrator.last_answer().to_string();
                    let keep_running = self.executor.execute(intent, &last_answer).await;
                    self.orchestrator.note_interaction();
                    if !keep_running {
                        info!("[assistant] exit requested");
                        return Ok(());
                    }
                }
            }
        }
    }
}

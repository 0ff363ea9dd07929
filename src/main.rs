// Valet binary — wires console speech I/O and the configured model into the
// engine and runs the command loop. Real audio/OS backends plug in by
// swapping the capability implementations built here.

use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;
use valet::atoms::error::EngineResult;
use valet::atoms::traits::{LanguageModel, NullModel, NullSystem, SpeechOutput, WebBrowser};
use valet::engine::assistant::Assistant;
use valet::engine::config::{load_config, load_contacts, load_custom_commands};
use valet::engine::executor::Executor;
use valet::engine::orchestrator::Orchestrator;
use valet::engine::providers::GeminiModel;
use valet::engine::reminders::{ReminderScheduler, ReminderStore};
use valet::engine::speech::{ConsoleInput, ConsoleSpeech, SerializedSpeech};

/// Browser stand-in for the console build: prints the URL it would open.
struct ConsoleBrowser;

#[async_trait::async_trait]
impl WebBrowser for ConsoleBrowser {
    async fn open(&self, url: &str) -> EngineResult<()> {
        println!("[open] {url}");
        Ok(())
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir().map(|d| d.join("valet")).unwrap_or_else(|| PathBuf::from("."))
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let dir = data_dir();
    let config = load_config(&dir.join("config.json"));
    let contacts = load_contacts(&dir.join("contacts.json"));
    let custom = load_custom_commands(&dir.join("custom_commands.json"));

    let model: Arc<dyn LanguageModel> = match std::env::var("GOOGLE_API_KEY") {
        Ok(key) if !key.is_empty() => {
            info!("[valet] language model: {}", config.model);
            Arc::new(GeminiModel::new(key, config.model.clone()))
        }
        _ => {
            info!("[valet] no GOOGLE_API_KEY set, AI stages disabled");
            Arc::new(NullModel)
        }
    };

    let speech = Arc::new(SerializedSpeech::new(Arc::new(ConsoleSpeech)));
    let browser = Arc::new(ConsoleBrowser);

    let store = Arc::new(ReminderStore::new(dir.join("reminders.json")));
    let scheduler = Arc::new(ReminderScheduler::new(store, speech.clone()));
    // Restore reminders before we start listening.
    scheduler.restore_on_startup();

    let orchestrator = Orchestrator::new(
        config.clone(),
        contacts.clone(),
        custom,
        model.clone(),
        speech.clone(),
        browser.clone(),
    );
    let executor = Executor::new(
        speech.clone(),
        browser,
        Arc::new(NullSystem),
        model,
        scheduler,
        contacts,
        config.clone(),
    );

    let (mut assistant, _trigger) = Assistant::new(
        Arc::new(ConsoleInput::new()),
        speech.clone(),
        orchestrator,
        executor,
        config,
    );

    let _ = speech.say("Valet online. Say my name or type a command.").await;
    if let Err(e) = assistant.run().await {
        // Fatal acquisition failure (e.g. input gone); persisted state is intact.
        error!("[valet] input loop stopped: {e}");
    }
    info!("[valet] stopped");
}

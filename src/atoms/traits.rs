// ── Valet Atoms: Capability Traits ─────────────────────────────────────────
// Every external effect the pipeline needs is behind one of these traits:
// speech capture, speech playback, the language model, the browser, and
// OS-level actions. The core depends only on the interfaces; concrete
// backends are injected at startup. Null implementations are provided so
// the pipeline runs (and is testable) with no capability present at all.

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::{BrightnessDirection, MediaAction, ScrollDirection, VolumeDirection};
use async_trait::async_trait;

// ── Speech ─────────────────────────────────────────────────────────────────

/// Speech capture + transcription. Returns the transcribed utterance, or an
/// empty string on timeout / no-match — transient input noise is not an
/// error and must not surface as one.
#[async_trait]
pub trait SpeechInput: Send + Sync {
    async fn listen(&self) -> EngineResult<String>;
}

/// Text-to-speech playback of a single utterance. Implementations do not
/// need to serialize calls; the engine wraps them in `SerializedSpeech`.
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    async fn say(&self, text: &str) -> EngineResult<()>;
}

// ── Language model ─────────────────────────────────────────────────────────

/// One bounded call to an external language model: prompt in, text out.
/// Used by both the AI router (classification) and the answer stage.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> EngineResult<String>;
}

// ── Browser & OS actions ───────────────────────────────────────────────────

/// Open a URL in the user's browser.
#[async_trait]
pub trait WebBrowser: Send + Sync {
    async fn open(&self, url: &str) -> EngineResult<()>;
}

/// OS-level actions: app lifecycle, volume/brightness/media, input
/// injection. An `Err` means the action is unavailable or failed; the
/// executor translates that into the action-specific spoken failure.
#[async_trait]
pub trait SystemActions: Send + Sync {
    async fn launch_app(&self, launch_target: &str) -> EngineResult<()>;
    async fn close_app(&self, app: &str) -> EngineResult<()>;
    async fn close_browser(&self) -> EngineResult<()>;
    async fn volume(&self, direction: VolumeDirection) -> EngineResult<()>;
    async fn brightness(&self, direction: BrightnessDirection) -> EngineResult<()>;
    async fn media(&self, action: MediaAction) -> EngineResult<()>;
    async fn type_text(&self, text: &str) -> EngineResult<()>;
    async fn press_keys(&self, keys: &[String]) -> EngineResult<()>;
    async fn scroll(&self, direction: ScrollDirection) -> EngineResult<()>;
    async fn screenshot(&self) -> EngineResult<()>;
}

// ── Null implementations ───────────────────────────────────────────────────

/// Hears nothing, ever.
pub struct NullInput;

#[async_trait]
impl SpeechInput for NullInput {
    async fn listen(&self) -> EngineResult<String> {
        Ok(String::new())
    }
}

/// Swallows all playback.
pub struct NullSpeech;

#[async_trait]
impl SpeechOutput for NullSpeech {
    async fn say(&self, _text: &str) -> EngineResult<()> {
        Ok(())
    }
}

/// No model configured. Every call fails, which the router and answer
/// stage both treat as "no match".
pub struct NullModel;

#[async_trait]
impl LanguageModel for NullModel {
    async fn generate(&self, _prompt: &str) -> EngineResult<String> {
        Err(EngineError::capability("model", "no language model configured"))
    }
}

/// Browser absent; opening anything fails.
pub struct NullBrowser;

#[async_trait]
impl WebBrowser for NullBrowser {
    async fn open(&self, _url: &str) -> EngineResult<()> {
        Err(EngineError::capability("browser", "no browser available"))
    }
}

/// OS control absent. Every action reports unavailable so the executor
/// speaks the matching failure phrase.
pub struct NullSystem;

macro_rules! unavailable {
    ($what:expr) => {
        Err(EngineError::capability("system", concat!($what, " not available")))
    };
}

#[async_trait]
impl SystemActions for NullSystem {
    async fn launch_app(&self, _launch_target: &str) -> EngineResult<()> {
        unavailable!("app launch")
    }
    async fn close_app(&self, _app: &str) -> EngineResult<()> {
        unavailable!("app termination")
    }
    async fn close_browser(&self) -> EngineResult<()> {
        unavailable!("browser termination")
    }
    async fn volume(&self, _direction: VolumeDirection) -> EngineResult<()> {
        unavailable!("volume control")
    }
    async fn brightness(&self, _direction: BrightnessDirection) -> EngineResult<()> {
        unavailable!("brightness control")
    }
    async fn media(&self, _action: MediaAction) -> EngineResult<()> {
        unavailable!("media control")
    }
    async fn type_text(&self, _text: &str) -> EngineResult<()> {
        unavailable!("typing")
    }
    async fn press_keys(&self, _keys: &[String]) -> EngineResult<()> {
        unavailable!("key press")
    }
    async fn scroll(&self, _direction: ScrollDirection) -> EngineResult<()> {
        unavailable!("scrolling")
    }
    async fn screenshot(&self) -> EngineResult<()> {
        unavailable!("screenshot")
    }
}

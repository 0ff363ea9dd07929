// ── Valet Atoms: Core Types ────────────────────────────────────────────────
// The intent model, contact directory, reminder record, and assistant config.
// Everything here is plain data — construction and matching only.

use serde::{Deserialize, Serialize};

// ── Units & directions ─────────────────────────────────────────────────────

/// Time unit for relative reminders. Parses singular and plural spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
}

impl TimeUnit {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "second" | "seconds" => Some(TimeUnit::Seconds),
            "minute" | "minutes" => Some(TimeUnit::Minutes),
            "hour" | "hours" => Some(TimeUnit::Hours),
            _ => None,
        }
    }

    /// Seconds per unit.
    pub fn secs(self) -> u64 {
        match self {
            TimeUnit::Seconds => 1,
            TimeUnit::Minutes => 60,
            TimeUnit::Hours => 3600,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeDirection {
    Up,
    Down,
    Mute,
}

impl VolumeDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "mute" => Some(Self::Mute),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrightnessDirection {
    Up,
    Down,
}

impl BrightnessDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaAction {
    PlayPause,
    Next,
    Previous,
}

impl MediaAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "play_pause" => Some(Self::PlayPause),
            "next" => Some(Self::Next),
            "previous" => Some(Self::Previous),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
    Top,
    Bottom,
}

impl ScrollDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "top" => Some(Self::Top),
            "bottom" => Some(Self::Bottom),
            _ => None,
        }
    }
}

// ── Intent ─────────────────────────────────────────────────────────────────

/// The closed set of classifications the pipeline can resolve an utterance
/// to, each carrying its intent-specific argument. Produced by exactly one
/// of the rule matcher, the contact resolver, or the AI router.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    OpenApp(String),
    OpenSite(String),
    OpenBrowser,
    OpenUrl(String),
    /// Bare "open" with no target — ask what to open.
    PromptOpen,
    UnknownOpen(String),
    CloseApp(String),
    CloseBrowser,
    UnknownClose(String),
    UnknownSite(String),
    SearchWeb(String),
    SearchYoutube(String),
    /// Payload preserves the original casing of the dictated text.
    TypeText(String),
    PressKey(Vec<String>),
    Scroll(ScrollDirection),
    Screenshot,
    Time,
    Date,
    Volume(VolumeDirection),
    Brightness(BrightnessDirection),
    Media(MediaAction),
    RemindIn { amount: u64, unit: TimeUnit, message: String },
    RemindAt { hour: u32, minute: u32, message: String },
    Greet,
    Exit,
    Calc(String),
    Convert { value: f64, src: String, dst: String },
    DateOfWeek(String),
    ReadFullAnswer,
    ProtocolStealth,
    ProtocolHouseParty,
    ProtocolCleanSlate,
    Message { name: String, body: String },
    Email { name: String, body: String },
    Call(String),
    /// Optional location; empty string means "here".
    Weather(String),
    Wiki(String),
    Translate { text: String, lang: String },
    News(String),
    Unknown(String),
}

impl Intent {
    /// The fixed allow-list of action intents. When `ai_default_mode` is on,
    /// everything outside this set routes straight to answer/search.
    pub fn is_action(&self) -> bool {
        matches!(
            self,
            Intent::OpenApp(_)
                | Intent::OpenBrowser
                | Intent::OpenSite(_)
                | Intent::CloseApp(_)
                | Intent::CloseBrowser
                | Intent::SearchWeb(_)
                | Intent::SearchYoutube(_)
                | Intent::Time
                | Intent::Date
                | Intent::Volume(_)
                | Intent::Brightness(_)
                | Intent::Media(_)
                | Intent::RemindIn { .. }
                | Intent::RemindAt { .. }
                | Intent::Calc(_)
                | Intent::Convert { .. }
                | Intent::DateOfWeek(_)
                | Intent::TypeText(_)
                | Intent::PressKey(_)
                | Intent::Scroll(_)
                | Intent::Screenshot
                | Intent::Greet
                | Intent::Exit
                | Intent::Call(_)
                | Intent::Message { .. }
                | Intent::Email { .. }
        )
    }

    /// Stable tag name, used in logs and custom-command files.
    pub fn tag(&self) -> &'static str {
        match self {
            Intent::OpenApp(_) => "open_app",
            Intent::OpenSite(_) => "open_site",
            Intent::OpenBrowser => "open_browser",
            Intent::OpenUrl(_) => "open_url",
            Intent::PromptOpen => "prompt_open",
            Intent::UnknownOpen(_) => "unknown_open",
            Intent::CloseApp(_) => "close_app",
            Intent::CloseBrowser => "close_browser",
            Intent::UnknownClose(_) => "unknown_close",
            Intent::UnknownSite(_) => "unknown_site",
            Intent::SearchWeb(_) => "search_web",
            Intent::SearchYoutube(_) => "search_youtube",
            Intent::TypeText(_) => "type_text",
            Intent::PressKey(_) => "press_key",
            Intent::Scroll(_) => "scroll",
            Intent::Screenshot => "screenshot",
            Intent::Time => "time",
            Intent::Date => "date",
            Intent::Volume(_) => "volume",
            Intent::Brightness(_) => "brightness",
            Intent::Media(_) => "media",
            Intent::RemindIn { .. } => "remind_in",
            Intent::RemindAt { .. } => "remind_at",
            Intent::Greet => "greet",
            Intent::Exit => "exit",
            Intent::Calc(_) => "calc",
            Intent::Convert { .. } => "convert",
            Intent::DateOfWeek(_) => "date_of_week",
            Intent::ReadFullAnswer => "read_full_answer",
            Intent::ProtocolStealth => "protocol_stealth",
            Intent::ProtocolHouseParty => "protocol_house_party",
            Intent::ProtocolCleanSlate => "protocol_clean_slate",
            Intent::Message { .. } => "message",
            Intent::Email { .. } => "email",
            Intent::Call(_) => "call",
            Intent::Weather(_) => "weather",
            Intent::Wiki(_) => "wiki",
            Intent::Translate { .. } => "translate",
            Intent::News(_) => "news",
            Intent::Unknown(_) => "unknown",
        }
    }
}

// ── Contacts ───────────────────────────────────────────────────────────────

/// One contact record. All channels optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub whatsapp: Option<String>,
}

/// Contact directory keyed by lowercase display name.
/// Iteration order is file order — resolution is first-containment-wins,
/// so the order entries were written in is part of the contract.
#[derive(Debug, Clone, Default)]
pub struct ContactBook {
    entries: Vec<(String, Contact)>,
}

impl ContactBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a JSON object `{ "name": { "phone": … }, … }`, keeping
    /// the object's key order.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
        let mut entries = Vec::with_capacity(map.len());
        for (name, value) in map {
            let contact: Contact = serde_json::from_value(value)?;
            entries.push((name.to_lowercase(), contact));
        }
        Ok(Self { entries })
    }

    pub fn insert(&mut self, name: impl Into<String>, contact: Contact) {
        self.entries.push((name.into().to_lowercase(), contact));
    }

    pub fn get(&self, name: &str) -> Option<&Contact> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    /// Names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Custom commands ────────────────────────────────────────────────────────

/// A user-defined exact-phrase override: maps a verbatim lowercase phrase
/// to a pre-resolved (action, target) pair. Consulted before any rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomCommand {
    pub action: String,
    #[serde(default)]
    pub target: Option<String>,
}

pub type CustomCommands = std::collections::HashMap<String, CustomCommand>;

// ── Reminders ──────────────────────────────────────────────────────────────

/// A pending reminder. Identity is the full `(when, message)` pair — there
/// is no separate identifier, so equal pairs collapse into one firing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub when: chrono::DateTime<chrono::Local>,
    pub message: String,
}

// ── Assistant configuration ────────────────────────────────────────────────

/// Behavioral configuration for the pipeline. Loaded once at startup and
/// passed by reference — no process-wide singleton.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_true")]
    pub wake_word_enabled: bool,
    #[serde(default = "default_wake_reply")]
    pub wake_reply: String,
    /// Grace period after a successful turn during which wake-word
    /// re-detection is skipped. Zero disables chaining.
    #[serde(default)]
    pub conversation_window_seconds: u64,
    /// Route every non-action classification straight to answer/search.
    #[serde(default)]
    pub ai_default_mode: bool,
    /// Route non-action classifications that look like questions to
    /// answer/search.
    #[serde(default)]
    pub ai_default_for_questions: bool,
    /// Let the AI router classify rule-unknown utterances.
    #[serde(default = "default_true")]
    pub ai_action_routing: bool,
    /// Open a web search when the model has no answer.
    #[serde(default = "default_true")]
    pub web_fallback_on_ai_failure: bool,
    /// Also open related web results when the model did answer.
    #[serde(default = "default_true")]
    pub also_open_web_on_ai_answer: bool,
    /// Spoken snippet size for a fresh answer.
    #[serde(default = "default_snippet_chars")]
    pub answer_snippet_chars: usize,
    /// Chunk size for full-answer replay. Clamped to 200..=1200 at use.
    #[serde(default = "default_chunk_chars")]
    pub answer_chunk_chars: usize,
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_true() -> bool { true }
fn default_wake_reply() -> String { "Yes?".into() }
fn default_snippet_chars() -> usize { 400 }
fn default_chunk_chars() -> usize { 500 }
fn default_model() -> String { "gemini-1.5-flash".into() }

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            wake_word_enabled: true,
            wake_reply: default_wake_reply(),
            conversation_window_seconds: 0,
            ai_default_mode: false,
            ai_default_for_questions: false,
            ai_action_routing: true,
            web_fallback_on_ai_failure: true,
            also_open_web_on_ai_answer: true,
            answer_snippet_chars: default_snippet_chars(),
            answer_chunk_chars: default_chunk_chars(),
            model: default_model(),
        }
    }
}

// ── Valet Atoms: Constants ─────────────────────────────────────────────────
// All named constants for the crate live here.
// Rationale: collecting constants in one place eliminates magic strings,
// makes auditing easier, and keeps every layer's code self-documenting.

/// Wake phrases the listening loop accepts, including common mishearings
/// produced by speech backends.
pub const WAKE_WORDS: &[&str] = &["valet", "va let", "val it", "wallet"];

/// Apps the assistant may launch, mapped to their launch target.
/// Anything outside this table resolves to `unknown_open`.
pub const WHITELISTED_APPS: &[(&str, &str)] = &[
    ("notepad", "notepad"),
    ("calculator", "calc"),
    ("paint", "mspaint"),
    ("vscode", "code"),
    ("explorer", "explorer"),
    // common browsers/apps
    ("chrome", "chrome"),
    ("edge", "msedge"),
    ("firefox", "firefox"),
    ("brave", "brave"),
    ("opera", "opera"),
    // popular desktop apps (may require being on PATH)
    ("spotify", "spotify"),
    ("whatsapp", "whatsapp"),
    ("zoom", "zoom"),
];

/// Sites the assistant may open by name.
pub const WHITELISTED_SITES: &[(&str, &str)] = &[
    ("google", "https://www.google.com"),
    ("youtube", "https://www.youtube.com"),
    ("github", "https://github.com"),
    ("gmail", "https://mail.google.com"),
    // commonly used sites
    ("wikipedia", "https://www.wikipedia.org"),
    ("stackoverflow", "https://stackoverflow.com"),
    ("netflix", "https://www.netflix.com"),
    ("whatsapp", "https://web.whatsapp.com"),
];

/// Spoken names that all mean "close the browser".
pub const BROWSER_CLOSE_SYNONYMS: &[&str] =
    &["browser", "chrome", "google", "edge", "firefox", "brave", "opera"];

/// Key-name synonyms for the `press …` rule.
pub const KEY_SYNONYMS: &[(&str, &str)] = &[
    ("enter", "enter"),
    ("return", "enter"),
    ("escape", "esc"),
    ("esc", "esc"),
    ("control", "ctrl"),
    ("ctrl", "ctrl"),
    ("alternate", "alt"),
    ("alt", "alt"),
    ("tab", "tab"),
    ("space", "space"),
    ("delete", "delete"),
    ("backspace", "backspace"),
];

/// Body-delimiting markers for "message {name} …" contact resolution.
pub const MESSAGE_BODY_MARKERS: &[&str] = &[":", ",", " that ", " saying ", " say "];

pub fn whitelisted_app(name: &str) -> Option<&'static str> {
    WHITELISTED_APPS.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
}

pub fn whitelisted_site(name: &str) -> Option<&'static str> {
    WHITELISTED_SITES.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
}

// ── Valet Atoms: Error Types ───────────────────────────────────────────────
// Single canonical error enum for the engine, built with `thiserror`.
//
// Design rules:
//   • Variants are coarse-grained by domain (I/O, Serialization, Network…).
//   • The `#[from]` attribute wires std/external error conversions automatically.
//   • Classification failures are NOT errors: the escalation pipeline models
//     "no match" as `Option::None` and degrades to the next stage instead of
//     raising. Only capability and infrastructure failures travel as errors.

use thiserror::Error;

// ── Primary error enum ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EngineError {
    /// Filesystem or OS-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP / network failure (reqwest layer).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// External capability (speech, model, browser, OS actions) failure.
    #[error("Capability error: {capability}: {message}")]
    Capability { capability: String, message: String },

    /// Assistant configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catch-all for errors that do not yet have a dedicated variant.
    /// Prefer adding a specific variant over using this in new code.
    #[error("{0}")]
    Other(String),
}

// ── Convenience constructors ───────────────────────────────────────────────

impl EngineError {
    /// Create a capability error with name and message.
    pub fn capability(capability: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Capability { capability: capability.into(), message: message.into() }
    }
}

impl From<String> for EngineError {
    fn from(s: String) -> Self {
        EngineError::Other(s)
    }
}

impl From<&str> for EngineError {
    fn from(s: &str) -> Self {
        EngineError::Other(s.to_string())
    }
}

// ── Convenience alias ──────────────────────────────────────────────────────

/// All engine operations should return this type.
pub type EngineResult<T> = Result<T, EngineError>;

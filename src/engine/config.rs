// Valet Engine — Configuration & Directory Loading
// JSON file loaders with parse-or-default semantics: a missing or malformed
// file never stops startup, it just yields the default and a warning.

use crate::atoms::types::{AssistantConfig, ContactBook, CustomCommands};
use log::warn;
use std::path::Path;

pub fn load_config(path: &Path) -> AssistantConfig {
    match std::fs::read_to_string(path) {
        Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
            warn!("[config] {} is malformed, using defaults: {e}", path.display());
            AssistantConfig::default()
        }),
        Err(_) => AssistantConfig::default(),
    }
}

pub fn load_contacts(path: &Path) -> ContactBook {
    match std::fs::read_to_string(path) {
        Ok(json) => ContactBook::from_json(&json).unwrap_or_else(|e| {
            warn!("[config] {} is malformed, contacts empty: {e}", path.display());
            ContactBook::new()
        }),
        Err(_) => ContactBook::new(),
    }
}

pub fn load_custom_commands(path: &Path) -> CustomCommands {
    match std::fs::read_to_string(path) {
        Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
            warn!("[config] {} is malformed, no custom commands: {e}", path.display());
            CustomCommands::default()
        }),
        Err(_) => CustomCommands::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("valet-cfg-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_missing_files_yield_defaults() {
        let nowhere = Path::new("/definitely/not/here.json");
        assert!(load_config(nowhere).wake_word_enabled);
        assert!(load_contacts(nowhere).is_empty());
        assert!(load_custom_commands(nowhere).is_empty());
    }

    #[test]
    fn test_malformed_json_yields_defaults() {
        let path = temp_file("{{{");
        assert_eq!(load_config(&path).conversation_window_seconds, 0);
        assert!(load_contacts(&path).is_empty());
    }

    #[test]
    fn test_partial_config_fills_in_defaults() {
        let path = temp_file(r#"{"conversation_window_seconds": 45, "ai_default_mode": true}"#);
        let cfg = load_config(&path);
        assert_eq!(cfg.conversation_window_seconds, 45);
        assert!(cfg.ai_default_mode);
        assert!(cfg.ai_action_routing);
        assert_eq!(cfg.answer_chunk_chars, 500);
    }

    #[test]
    fn test_contacts_and_custom_commands_load() {
        let contacts = temp_file(r#"{"Mom": {"phone": "+15551234"}}"#);
        let book = load_contacts(&contacts);
        assert_eq!(book.get("mom").unwrap().phone.as_deref(), Some("+15551234"));

        let custom = temp_file(r#"{"battle stations": {"action": "open_app", "target": "vscode"}}"#);
        let cmds = load_custom_commands(&custom);
        assert_eq!(cmds.get("battle stations").unwrap().action, "open_app");
    }
}

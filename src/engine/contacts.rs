// Valet Engine — Contact Resolver
// Heuristic fallback for call/message intents when the rule matcher came up
// unknown: scan known contact names in directory order and return the first
// one the utterance contains. No ranking — first containment hit wins.

use crate::atoms::constants::MESSAGE_BODY_MARKERS;
use crate::atoms::types::{ContactBook, Intent};

/// Infer a call/message intent from a rule-unknown utterance by substring
/// match against known contact names. Returns `None` when no name is
/// contained in the utterance.
pub fn resolve(utterance: &str, contacts: &ContactBook) -> Option<Intent> {
    let c = utterance.to_lowercase();
    let c = c.trim();

    // call patterns
    if c.starts_with("call ") || c.starts_with("dial ") || c.contains(" call ") || c.contains(" dial ")
    {
        for name in contacts.names() {
            if c.contains(&format!("call {name}")) || c.contains(&format!("dial {name}")) {
                return Some(Intent::Call(name.to_string()));
            }
        }
    }

    // message patterns, with or without a body
    if c.starts_with("message ") || c.contains(" message ") || c.starts_with("send message") {
        for name in contacts.names() {
            for marker in MESSAGE_BODY_MARKERS {
                let key = format!("message {name}{marker}");
                if let Some(idx) = c.find(&key) {
                    let body = c[idx + key.len()..].trim().to_string();
                    return Some(Intent::Message { name: name.to_string(), body });
                }
            }
            if c.contains(&format!("message {name}")) {
                return Some(Intent::Message { name: name.to_string(), body: String::new() });
            }
        }
    }

    None
}

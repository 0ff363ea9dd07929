// Valet Engine — Answer-or-Search Stage
// Terminal stage of the escalation chain: either the model answers and a
// snippet is spoken, or a web search is opened. It cannot fail to produce
// user-visible output except on total capability absence. Also owns the
// chunked replay of the last full answer.

use crate::atoms::traits::{LanguageModel, SpeechOutput, WebBrowser};
use crate::atoms::types::AssistantConfig;
use log::info;

/// Ask the model directly. Empty string on any failure — answer absence is
/// not an error.
pub async fn ai_answer(model: &dyn LanguageModel, question: &str) -> String {
    if question.is_empty() {
        return String::new();
    }
    match model.generate(question).await {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            info!("[answer] model unavailable: {e}");
            String::new()
        }
    }
}

/// Question heuristic used by the `ai_default_for_questions` override.
pub fn is_question(text: &str) -> bool {
    let t = text.trim().to_lowercase();
    if t.is_empty() {
        return false;
    }
    if t.ends_with('?') {
        return true;
    }
    const STARTERS: &[&str] = &[
        "what", "who", "why", "how", "when", "where", "which", "explain", "define", "tell me",
        "describe", "compare", "summarize",
    ];
    STARTERS.iter().any(|s| t.starts_with(s))
}

/// Try an AI answer; if unavailable or empty, open a web search instead.
/// Returns the answer text when handled (empty when the search fallback
/// ran), or `None` when nothing could produce user-visible output.
pub async fn answer_or_search(
    speech: &dyn SpeechOutput,
    browser: &dyn WebBrowser,
    config: &AssistantConfig,
    model: &dyn LanguageModel,
    query: &str,
) -> Option<String> {
    if query.is_empty() {
        return None;
    }

    let answer = ai_answer(model, query).await;
    if !answer.is_empty() {
        let snippet = truncate_chars(&answer, config.answer_snippet_chars);
        let _ = speech.say(&snippet).await;
        if config.also_open_web_on_ai_answer {
            let _ = browser.open(&search_url(query)).await;
        }
        return Some(answer);
    }

    if !config.web_fallback_on_ai_failure {
        let _ = speech.say("I don't have that answer right now.").await;
        return Some(String::new());
    }
    if browser.open(&search_url(query)).await.is_ok() {
        let _ = speech.say(&format!("Searching Google for {query}")).await;
        return Some(String::new());
    }
    None
}

/// Replay the last answer in full, chunked to a bounded size per utterance.
pub async fn speak_full_answer(speech: &dyn SpeechOutput, config: &AssistantConfig, answer: &str) {
    if answer.is_empty() {
        let _ = speech.say("I don't have an answer to read yet").await;
        return;
    }
    let chunk = config.answer_chunk_chars.clamp(200, 1200);
    for piece in chunks_of(answer, chunk) {
        let _ = speech.say(&piece).await;
    }
}

pub fn search_url(query: &str) -> String {
    format!("https://www.google.com/search?q={}", query.replace(' ', "+"))
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn chunks_of(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size.max(1)).map(|c| c.iter().collect()).collect()
}

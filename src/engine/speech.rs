// Valet Engine — Speech Plumbing
// `SerializedSpeech` enforces the playback discipline: one utterance at a
// time, one retry after a short delay on failure, then drop silently.
// Console implementations of both speech traits let the binary run with no
// audio stack at all.

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::{SpeechInput, SpeechOutput};
use async_trait::async_trait;
use log::warn;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;

const RETRY_DELAY_MS: u64 = 150;

/// Serializing wrapper around any `SpeechOutput`. A pending utterance waits
/// for in-flight playback to finish; a failed attempt gets exactly one
/// retry before being dropped.
pub struct SerializedSpeech {
    inner: Arc<dyn SpeechOutput>,
    playing: Mutex<()>,
}

impl SerializedSpeech {
    pub fn new(inner: Arc<dyn SpeechOutput>) -> Self {
        SerializedSpeech { inner, playing: Mutex::new(()) }
    }
}

#[async_trait]
impl SpeechOutput for SerializedSpeech {
    async fn say(&self, text: &str) -> EngineResult<()> {
        let _guard = self.playing.lock().await;
        if self.inner.say(text).await.is_ok() {
            return Ok(());
        }
        tokio::time::sleep(std::time::Duration::from_millis(RETRY_DELAY_MS)).await;
        if let Err(e) = self.inner.say(text).await {
            // Dropped after the single retry; playback failures never
            // propagate to the pipeline.
            warn!("[speech] playback dropped after retry: {e}");
        }
        Ok(())
    }
}

// ── Console implementations ────────────────────────────────────────────────

/// Prints every utterance to stdout.
pub struct ConsoleSpeech;

#[async_trait]
impl SpeechOutput for ConsoleSpeech {
    async fn say(&self, text: &str) -> EngineResult<()> {
        println!("{text}");
        Ok(())
    }
}

/// Reads one line per listen from stdin. EOF is fatal — there is no input
/// device left to acquire from.
pub struct ConsoleInput {
    reader: Mutex<BufReader<tokio::io::Stdin>>,
}

impl ConsoleInput {
    pub fn new() -> Self {
        ConsoleInput { reader: Mutex::new(BufReader::new(tokio::io::stdin())) }
    }
}

impl Default for ConsoleInput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechInput for ConsoleInput {
    async fn listen(&self) -> EngineResult<String> {
        let mut line = String::new();
        let n = self.reader.lock().await.read_line(&mut line).await?;
        if n == 0 {
            return Err(EngineError::capability("input", "stdin closed"));
        }
        Ok(line.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `fail_count` calls, then records successes.
    struct FlakySpeech {
        fail_count: u32,
        calls: AtomicU32,
        spoken: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SpeechOutput for FlakySpeech {
        async fn say(&self, text: &str) -> EngineResult<()> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_count {
                return Err(EngineError::capability("tts", "busy"));
            }
            self.spoken.lock().await.push(text.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_retry_once_then_succeed() {
        let flaky = Arc::new(FlakySpeech {
            fail_count: 1,
            calls: AtomicU32::new(0),
            spoken: Mutex::new(Vec::new()),
        });
        let speech = SerializedSpeech::new(flaky.clone());
        speech.say("hello").await.unwrap();
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);
        assert_eq!(*flaky.spoken.lock().await, vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_dropped_after_single_retry() {
        let flaky = Arc::new(FlakySpeech {
            fail_count: 10,
            calls: AtomicU32::new(0),
            spoken: Mutex::new(Vec::new()),
        });
        let speech = SerializedSpeech::new(flaky.clone());
        // Never errors out to the caller, even when playback is gone.
        speech.say("lost").await.unwrap();
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);
        assert!(flaky.spoken.lock().await.is_empty());
    }
}

// Valet Engine — Durable Reminders
// A flat JSON-array store rewritten in full on every mutation, and a
// scheduler that runs one waiting task per reminder. The store invariant:
// at any point observed between mutations, the file equals the set of
// reminders that have been scheduled but not yet fired.
//
// Every mutation is a read-modify-write of the whole list under one mutex,
// with the file replaced atomically (temp file + rename), so a fire racing
// a new schedule cannot lose either write. Persistence failures are
// swallowed with a warning: an already-running task still fires on time,
// the durable record may just be stale across a crash.

use crate::atoms::traits::SpeechOutput;
use crate::atoms::types::Reminder;
use chrono::{DateTime, Local};
use log::{info, warn};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::AbortHandle;

// ── Store ──────────────────────────────────────────────────────────────────

pub struct ReminderStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ReminderStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ReminderStore { path: path.into(), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current store contents. A missing or unreadable file reads as empty.
    pub fn load(&self) -> Vec<Reminder> {
        let _guard = self.lock.lock();
        self.read_unlocked()
    }

    /// Append one reminder (read-modify-write of the whole list).
    pub fn append(&self, reminder: &Reminder) {
        let _guard = self.lock.lock();
        let mut items = self.read_unlocked();
        items.push(reminder.clone());
        self.write_unlocked(&items);
    }

    /// Remove **every** entry equal to `reminder`. Equality is the full
    /// `(when, message)` pair, so duplicates collapse into one removal.
    pub fn remove_all(&self, reminder: &Reminder) {
        let _guard = self.lock.lock();
        let mut items = self.read_unlocked();
        items.retain(|r| r != reminder);
        self.write_unlocked(&items);
    }

    /// Replace the store with exactly `items`. Used by the startup restore
    /// so surviving entries are not appended on top of themselves.
    pub fn replace(&self, items: &[Reminder]) {
        let _guard = self.lock.lock();
        self.write_unlocked(items);
    }

    fn read_unlocked(&self) -> Vec<Reminder> {
        match std::fs::read_to_string(&self.path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    fn write_unlocked(&self, items: &[Reminder]) {
        if let Err(e) = self.try_write(items) {
            warn!("[reminders] store write failed, durable record may be stale: {e}");
        }
    }

    fn try_write(&self, items: &[Reminder]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(items)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let tmp = self.path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4()));
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)
    }
}

// ── Scheduler ──────────────────────────────────────────────────────────────

pub struct ReminderScheduler {
    store: Arc<ReminderStore>,
    speech: Arc<dyn SpeechOutput>,
    /// Abort handles for in-flight waiting tasks. Aborting cancels the wait
    /// without touching the durable record, so the reminder survives into
    /// the next restore.
    tasks: Mutex<Vec<AbortHandle>>,
}

impl ReminderScheduler {
    pub fn new(store: Arc<ReminderStore>, speech: Arc<dyn SpeechOutput>) -> Self {
        ReminderScheduler { store, speech, tasks: Mutex::new(Vec::new()) }
    }

    pub fn store(&self) -> &ReminderStore {
        &self.store
    }

    /// Persist a reminder and start its waiting task.
    pub fn schedule(&self, when: DateTime<Local>, message: impl Into<String>) {
        let reminder = Reminder { when, message: message.into() };
        self.store.append(&reminder);
        self.spawn_wait(reminder);
    }

    /// Reload the persisted store, keep only future-dated entries, and
    /// reschedule them. The store is rewritten with exactly the survivors —
    /// not appended to — so nothing duplicates. Entries already past are
    /// dropped without firing; a missed reminder is simply discarded.
    pub fn restore_on_startup(&self) -> usize {
        let now = Local::now();
        let survivors: Vec<Reminder> = self
            .store
            .load()
            .into_iter()
            .filter(|r| !r.message.trim().is_empty() && r.when > now)
            .collect();
        self.store.replace(&survivors);
        for reminder in &survivors {
            self.spawn_wait(reminder.clone());
        }
        if !survivors.is_empty() {
            info!("[reminders] restored {} pending reminder(s)", survivors.len());
        }
        survivors.len()
    }

    /// Cancel every in-flight waiting task. Durable entries are untouched.
    pub fn abort_all(&self) {
        for handle in self.tasks.lock().drain(..) {
            handle.abort();
        }
    }

    fn spawn_wait(&self, reminder: Reminder) {
        let store = Arc::clone(&self.store);
        let speech = Arc::clone(&self.speech);
        let handle = tokio::spawn(async move {
            let delay = (reminder.when - Local::now())
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);
            tokio::time::sleep(delay).await;
            let _ = speech.say(&format!("Reminder: {}", reminder.message)).await;
            store.remove_all(&reminder);
        });
        let mut tasks = self.tasks.lock();
        tasks.retain(|h| !h.is_finished());
        tasks.push(handle.abort_handle());
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        self.abort_all();
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

// Cross-module properties of the escalation pipeline and the reminder
// scheduler: restart round trips, concurrent store mutations, and full
// turns from utterance to executed effect.

use async_trait::async_trait;
use chrono::{Duration, Local};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use valet::atoms::error::{EngineError, EngineResult};
use valet::atoms::traits::{
    LanguageModel, NullSpeech, NullSystem, SpeechOutput, WebBrowser,
};
use valet::atoms::types::{AssistantConfig, Contact, ContactBook, Intent, TimeUnit};
use valet::engine::executor::Executor;
use valet::engine::orchestrator::{Orchestrator, Resolution, Stage};
use valet::engine::reminders::{ReminderScheduler, ReminderStore};

// ── Shared stubs ───────────────────────────────────────────────────────────

struct Recorder {
    spoken: Mutex<Vec<String>>,
    opened: Mutex<Vec<String>>,
}

impl Recorder {
    fn new() -> Arc<Self> {
        Arc::new(Recorder { spoken: Mutex::new(Vec::new()), opened: Mutex::new(Vec::new()) })
    }

    fn last_spoken(&self) -> String {
        self.spoken.lock().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl SpeechOutput for Recorder {
    async fn say(&self, text: &str) -> EngineResult<()> {
        self.spoken.lock().push(text.to_string());
        Ok(())
    }
}

#[async_trait]
impl WebBrowser for Recorder {
    async fn open(&self, url: &str) -> EngineResult<()> {
        self.opened.lock().push(url.to_string());
        Ok(())
    }
}

struct CannedModel(Option<String>);

#[async_trait]
impl LanguageModel for CannedModel {
    async fn generate(&self, _prompt: &str) -> EngineResult<String> {
        match &self.0 {
            Some(text) => Ok(text.clone()),
            None => Err(EngineError::capability("model", "down")),
        }
    }
}

fn temp_store() -> Arc<ReminderStore> {
    let path = std::env::temp_dir().join(format!("valet-it-{}.json", uuid::Uuid::new_v4()));
    Arc::new(ReminderStore::new(path))
}

fn full_executor(
    rec: Arc<Recorder>,
    scheduler: Arc<ReminderScheduler>,
    contacts: ContactBook,
) -> Executor {
    Executor::new(
        rec.clone(),
        rec,
        Arc::new(NullSystem),
        Arc::new(CannedModel(None)),
        scheduler,
        contacts,
        AssistantConfig::default(),
    )
}

// ── Reminder durability ────────────────────────────────────────────────────

#[tokio::test]
async fn reminder_survives_restart_without_duplication() {
    let store = temp_store();
    let path = store.path().to_path_buf();
    let when = Local::now() + Duration::seconds(3600);

    // First process lifetime: schedule, then die before firing.
    {
        let scheduler = ReminderScheduler::new(store.clone(), Arc::new(NullSpeech));
        scheduler.schedule(when, "water the plants");
        assert_eq!(store.load().len(), 1);
        scheduler.abort_all();
    }

    // Second lifetime: a fresh store handle over the same file.
    let store2 = Arc::new(ReminderStore::new(path));
    let scheduler2 = ReminderScheduler::new(store2.clone(), Arc::new(NullSpeech));
    assert_eq!(scheduler2.restore_on_startup(), 1);

    let items = store2.load();
    assert_eq!(items.len(), 1, "restore must replace, not append");
    assert_eq!(items[0].message, "water the plants");
    assert_eq!(items[0].when, when);
    scheduler2.abort_all();
}

#[tokio::test]
async fn restart_with_past_entry_drops_it_silently() {
    let store = temp_store();
    let speech = Recorder::new();
    store.replace(&[valet::atoms::types::Reminder {
        when: Local::now() - Duration::seconds(3600),
        message: "x".into(),
    }]);

    let scheduler = ReminderScheduler::new(store.clone(), speech.clone());
    assert_eq!(scheduler.restore_on_startup(), 0);
    assert!(store.load().is_empty());

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert!(speech.spoken.lock().is_empty(), "missed reminders must not fire late");
}

#[tokio::test]
async fn concurrent_schedules_lose_nothing() {
    let store = temp_store();
    let scheduler = Arc::new(ReminderScheduler::new(store.clone(), Arc::new(NullSpeech)));
    let when = Local::now() + Duration::seconds(3600);

    let mut joins = Vec::new();
    for i in 0..10 {
        let scheduler = scheduler.clone();
        joins.push(tokio::spawn(async move {
            scheduler.schedule(when, format!("task {i}"));
        }));
    }
    for j in joins {
        j.await.unwrap();
    }

    assert_eq!(store.load().len(), 10, "every concurrent append must survive");
    scheduler.abort_all();
}

#[tokio::test]
async fn fire_racing_new_schedules_keeps_both_sides() {
    let store = temp_store();
    let speech = Recorder::new();
    let scheduler = Arc::new(ReminderScheduler::new(store.clone(), speech.clone()));

    // One reminder fires almost immediately while others are being added.
    scheduler.schedule(Local::now() + Duration::milliseconds(50), "now-ish");
    let far = Local::now() + Duration::seconds(3600);
    let mut joins = Vec::new();
    for i in 0..5 {
        let scheduler = scheduler.clone();
        joins.push(tokio::spawn(async move {
            scheduler.schedule(far, format!("later {i}"));
        }));
    }
    for j in joins {
        j.await.unwrap();
    }
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;

    let remaining = store.load();
    assert_eq!(remaining.len(), 5, "the fire must not clobber concurrent appends");
    assert!(remaining.iter().all(|r| r.message.starts_with("later")));
    assert_eq!(*speech.spoken.lock(), vec!["Reminder: now-ish".to_string()]);
    scheduler.abort_all();
}

// ── Full turns ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn remind_in_turn_lands_in_the_store() {
    let rec = Recorder::new();
    let scheduler = Arc::new(ReminderScheduler::new(temp_store(), Arc::new(NullSpeech)));
    let mut orch = Orchestrator::new(
        AssistantConfig::default(),
        ContactBook::new(),
        HashMap::new(),
        Arc::new(CannedModel(None)),
        rec.clone(),
        rec.clone(),
    );
    let exec = full_executor(rec.clone(), scheduler.clone(), ContactBook::new());

    let before = Local::now();
    let resolution = orch.resolve("remind me in 10 minutes to stretch").await;
    let Resolution::Act { intent, stage } = resolution else {
        panic!("expected an action")
    };
    assert_eq!(stage, Stage::Rules);
    assert_eq!(
        intent,
        Intent::RemindIn { amount: 10, unit: TimeUnit::Minutes, message: "stretch".into() }
    );

    exec.execute(intent, "").await;
    assert_eq!(rec.last_spoken(), "Reminder set in 10 minutes");

    let stored = scheduler.store().load();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].message, "stretch");
    let delta = stored[0].when - before;
    assert!(delta >= Duration::seconds(595) && delta <= Duration::seconds(605));
    scheduler.abort_all();
}

#[tokio::test]
async fn calc_and_convert_turns_speak_results() {
    let rec = Recorder::new();
    let scheduler = Arc::new(ReminderScheduler::new(temp_store(), Arc::new(NullSpeech)));
    let mut orch = Orchestrator::new(
        AssistantConfig::default(),
        ContactBook::new(),
        HashMap::new(),
        Arc::new(CannedModel(None)),
        rec.clone(),
        rec.clone(),
    );
    let exec = full_executor(rec.clone(), scheduler, ContactBook::new());

    let Resolution::Act { intent, .. } = orch.resolve("what is 2+2").await else {
        panic!("expected an action")
    };
    assert_eq!(intent, Intent::Calc("2+2".into()));
    exec.execute(intent, "").await;
    assert_eq!(rec.last_spoken(), "The result is 4");

    let Resolution::Act { intent, .. } = orch.resolve("convert 100 c to f").await else {
        panic!("expected an action")
    };
    assert_eq!(intent, Intent::Convert { value: 100.0, src: "c".into(), dst: "f".into() });
    exec.execute(intent, "").await;
    assert_eq!(rec.last_spoken(), "100 c is 212 f");
}

#[tokio::test]
async fn call_turn_reaches_the_contact() {
    let mut contacts = ContactBook::new();
    contacts.insert("mom", Contact { phone: Some("+15551234".into()), ..Default::default() });

    let rec = Recorder::new();
    let scheduler = Arc::new(ReminderScheduler::new(temp_store(), Arc::new(NullSpeech)));
    let mut orch = Orchestrator::new(
        AssistantConfig::default(),
        contacts.clone(),
        HashMap::new(),
        Arc::new(CannedModel(None)),
        rec.clone(),
        rec.clone(),
    );
    let exec = full_executor(rec.clone(), scheduler, contacts);

    let Resolution::Act { intent, .. } = orch.resolve("call mom").await else {
        panic!("expected an action")
    };
    assert_eq!(intent, Intent::Call("mom".into()));
    exec.execute(intent, "").await;
    assert_eq!(rec.last_spoken(), "Trying to call mom");
    assert_eq!(rec.opened.lock().last().unwrap(), "tel:+15551234");
}

#[tokio::test]
async fn malformed_ai_route_escalates_to_answer_stage() {
    // The router must reject a bad direction; the model's text then serves
    // as the generic answer instead.
    let rec = Recorder::new();
    let mut orch = Orchestrator::new(
        AssistantConfig { also_open_web_on_ai_answer: false, ..Default::default() },
        ContactBook::new(),
        HashMap::new(),
        Arc::new(CannedModel(Some(
            r#"{"intent":"volume","args":{"direction":"sideways"}}"#.into(),
        ))),
        rec.clone(),
        rec.clone(),
    );

    let got = orch.resolve("make it sideways loud").await;
    assert_eq!(got, Resolution::Answered);
    // The "answer" is the same canned JSON string, spoken as-is — what
    // matters is that no volume intent ever reached an executor.
    assert_eq!(rec.spoken.lock().len(), 1);
}

// ── Valet Engine ───────────────────────────────────────────────────────────
// The two core subsystems — the intent escalation pipeline and the durable
// reminder scheduler — plus the ambient plumbing they need (config loading,
// serialized speech, the answer stage, the command loop).

pub mod answer;
pub mod assistant;
pub mod calc;
pub mod config;
pub mod contacts;
pub mod executor;
pub mod orchestrator;
pub mod providers;
pub mod reminders;
pub mod router;
pub mod rules;
pub mod speech;

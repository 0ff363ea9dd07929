// Valet — voice/text command assistant core.
//
// Two subsystems do the real work:
//   • the escalation pipeline (rules → contact heuristic → AI router →
//     answer/search) in engine/{rules,contacts,router,orchestrator}.rs;
//   • the durable reminder scheduler in engine/reminders.rs.
// Everything external — speech, the model, the browser, OS actions — sits
// behind the capability traits in atoms/traits.rs.

pub mod atoms;
pub mod engine;

pub use atoms::error::{EngineError, EngineResult};
pub use atoms::types::{AssistantConfig, Intent};

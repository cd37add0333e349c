//! The CareBridge turn pipeline.
//!
//! One user utterance flows through a fixed set of stages:
//!
//! 1. **Load** the user's profile from memory
//! 2. **Classify** intent and emotional risk (supervisor)
//! 3. **Route** to a specialist: welfare, companion or daily life
//! 4. **Respond**, sanitizing whatever the model wrote
//! 5. **Persist** the turn
//!
//! A farewell skips straight from classification to persistence. Nothing
//! inside the pipeline is fatal: every failure becomes a safe reply plus an
//! `error` annotation on the turn state.

pub mod alert;
pub mod memory_stage;
pub mod orchestrator;
pub mod prompts;
pub mod router;
pub mod runtime;
pub mod sanitizer;
pub mod specialists;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use alert::LoggingCrisisAlert;
pub use orchestrator::{Orchestrator, Stage, TurnInput, TurnOutput};
pub use router::{NextStage, route, route_label};
pub use runtime::Runtime;
pub use sanitizer::sanitize;
pub use specialists::{CompanionSpecialist, DailySpecialist, Specialist, WelfareSpecialist};
pub use supervisor::{Classification, ClassifyError, Resolution, Supervisor};

pub mod commands;
pub mod config;
pub mod db;
pub mod llm;
pub mod mesocycle;
pub mod models;
pub mod program_store;
pub mod prompt;
pub mod routine;
pub mod routine_store;
pub mod volume;

#[cfg(test)]
mod test_utils;

pub use config::AppConfig;
pub use db::{initialize_db, AppState};
pub use mesocycle::{CompletionOutcome, MesocycleError};
pub use models::{CompletedMesocycleSummary, MesocyclePhase, Program, StoredRoutine};
pub use prompt::{assemble_planning_prompt, ProgramContext};
pub use volume::{extract_mesocycle_summary, ExtractionError};

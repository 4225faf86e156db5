use crate::db::AppState;
use crate::mesocycle;
use crate::models::{MesocyclePhase, Program, ProgramUpdate};

/// ---------------------------------------------------------------------------
/// Program Commands
/// ---------------------------------------------------------------------------

pub async fn list_programs(state: &AppState) -> Result<Vec<Program>, String> {
  state
    .programs
    .get_programs()
    .await
    .map_err(|e| format!("Failed to list programs: {}", e))
}

pub async fn get_program(state: &AppState, program_id: &str) -> Result<Program, String> {
  state
    .programs
    .get_program(program_id)
    .await
    .map_err(|e| format!("Failed to get program: {}", e))
}

pub async fn create_program(
  state: &AppState,
  name: &str,
  program_duration: &str,
  total_mesocycles: u32,
  roadmap: Vec<MesocyclePhase>,
  roadmap_text: &str,
) -> Result<Program, String> {
  if name.trim().is_empty() {
    return Err("Program name must not be empty".to_string());
  }
  if total_mesocycles == 0 {
    return Err("A program needs at least one mesocycle".to_string());
  }

  mesocycle::create_program(
    &state.programs,
    name,
    program_duration,
    total_mesocycles,
    roadmap,
    roadmap_text,
  )
  .await
  .map_err(|e| format!("Failed to create program: {}", e))
}

pub async fn update_program(
  state: &AppState,
  program_id: &str,
  update: ProgramUpdate,
) -> Result<Program, String> {
  state
    .programs
    .update_program(program_id, update)
    .await
    .map_err(|e| format!("Failed to update program: {}", e))
}

pub async fn delete_program(state: &AppState, program_id: &str) -> Result<(), String> {
  state
    .programs
    .delete_program(program_id)
    .await
    .map_err(|e| format!("Failed to delete program: {}", e))
}

/// Replace the roadmap; `roadmap_text` must be the verbatim source of `roadmap`
pub async fn update_roadmap(
  state: &AppState,
  program_id: &str,
  roadmap_text: &str,
  roadmap: Vec<MesocyclePhase>,
) -> Result<Program, String> {
  state
    .programs
    .update_mesocycle_roadmap(program_id, roadmap_text, roadmap)
    .await
    .map_err(|e| format!("Failed to update roadmap: {}", e))
}

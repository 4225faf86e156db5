use crate::config::AppConfig;
use crate::db::AppState;
use crate::llm::{roadmap_text, GeneratedPlan, GenerationClient};
use crate::mesocycle::{self, CompletionOutcome};
use crate::prompt::assemble_planning_prompt;

/// ---------------------------------------------------------------------------
/// Mesocycle Commands
/// ---------------------------------------------------------------------------

/// Summarize the active mesocycle and advance the program
pub async fn complete_mesocycle(
  state: &AppState,
  program_id: &str,
) -> Result<CompletionOutcome, String> {
  mesocycle::complete_current_mesocycle(&state.programs, &state.routines, program_id)
    .await
    .map_err(|e| format!("Failed to complete mesocycle: {}", e))
}

/// Planning brief for a program's active mesocycle, or a single-phase brief
/// when no program is given
pub async fn get_planning_prompt(
  state: &AppState,
  program_id: Option<&str>,
  questionnaire_specs: &str,
) -> Result<String, String> {
  match program_id {
    Some(id) => mesocycle::planning_prompt(&state.programs, id, questionnaire_specs)
      .await
      .map_err(|e| format!("Failed to build planning prompt: {}", e)),
    None => Ok(assemble_planning_prompt(questionnaire_specs, None)),
  }
}

/// Send the brief for the active mesocycle to the generation service.
///
/// On the first mesocycle a roadmap found in the reply replaces the stored one;
/// only the roadmap itself is kept as text, not the mesocycle design.
pub async fn generate_mesocycle(
  state: &AppState,
  config: &AppConfig,
  program_id: &str,
  questionnaire_specs: &str,
) -> Result<GeneratedPlan, String> {
  let client = GenerationClient::from_config(config).map_err(|e| e.to_string())?;

  let program = state
    .programs
    .get_program(program_id)
    .await
    .map_err(|e| format!("Failed to get program: {}", e))?;

  let context = mesocycle::build_program_context(&program);
  let prompt = assemble_planning_prompt(questionnaire_specs, Some(&context));

  let plan = client
    .generate_mesocycle(&prompt)
    .await
    .map_err(|e| format!("Failed to generate mesocycle: {}", e))?;

  if program.current_mesocycle <= 1 {
    if let Some(roadmap) = plan.roadmap.clone() {
      let text = roadmap_text(&roadmap);
      state
        .programs
        .update_mesocycle_roadmap(program_id, &text, roadmap)
        .await
        .map_err(|e| format!("Failed to store roadmap: {}", e))?;
    }
  }

  Ok(plan)
}

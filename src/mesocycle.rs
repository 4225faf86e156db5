//! Mesocycle progression workflow
//!
//! Ties the stores, the routine parser, the volume extractor and the prompt
//! assembler together:
//! - importing a routine tags it with the active mesocycle and attaches it
//! - completing a mesocycle summarizes its routines and advances the program
//! - the planning context for the next brief comes from the stored program

use serde::{Deserialize, Serialize};

use crate::models::{MesocyclePhase, Program, RoutinePayload, StoredRoutine};
use crate::models::CompletedMesocycleSummary;
use crate::program_store::{check_completable, ProgramStore, StoreError};
use crate::prompt::{assemble_planning_prompt, ProgramContext};
use crate::routine::parse;
use crate::routine_store::RoutineStore;
use crate::volume::{extract_mesocycle_summary, ExtractionError};

/// Used when the roadmap has no entry for the active mesocycle
pub const DEFAULT_MESOCYCLE_WEEKS: u32 = 4;
pub const DEFAULT_MESOCYCLE_BLOCKS: u32 = 1;

// ---------------------------------------------------------------------------
/// Error Types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum MesocycleError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

impl Serialize for MesocycleError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

// ---------------------------------------------------------------------------
/// Completion Outcome
// ---------------------------------------------------------------------------

/// A routine left out of the summary because its data could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRoutine {
    pub routine_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionOutcome {
    pub summary: CompletedMesocycleSummary,
    pub skipped: Vec<SkippedRoutine>,
    pub program: Program,
}

// ---------------------------------------------------------------------------
// Program Lifecycle
// ---------------------------------------------------------------------------

/// Create and persist a program positioned at mesocycle 1
pub async fn create_program(
    programs: &ProgramStore,
    name: &str,
    program_duration: &str,
    total_mesocycles: u32,
    roadmap: Vec<MesocyclePhase>,
    roadmap_text: &str,
) -> Result<Program, MesocycleError> {
    let program = Program::new(name, program_duration, total_mesocycles, roadmap, roadmap_text);
    Ok(programs.add_program(program).await?)
}

/// Store an imported routine for the program's active mesocycle and attach it
pub async fn import_routine(
    programs: &ProgramStore,
    routines: &RoutineStore,
    program_id: &str,
    name: &str,
    payload: RoutinePayload,
) -> Result<StoredRoutine, MesocycleError> {
    let program = programs.get_program(program_id).await?;

    let mut routine = StoredRoutine::new(name, Some(payload));
    routine.program_id = Some(program.id.clone());
    routine.mesocycle_number = Some(program.current_mesocycle);

    let routine = routines.save_routine(routine).await?;
    programs
        .add_routine_to_program(&program.id, &routine.id)
        .await?;

    tracing::info!(
        program_id = %program.id,
        routine_id = %routine.id,
        mesocycle = program.current_mesocycle,
        "Routine imported"
    );
    Ok(routine)
}

/// Detach a routine from a program; the routine record itself is kept
pub async fn detach_routine(
    programs: &ProgramStore,
    program_id: &str,
    routine_id: &str,
) -> Result<Program, MesocycleError> {
    Ok(programs
        .remove_routine_from_program(program_id, routine_id)
        .await?)
}

/// Routines attached to the program and tagged with the active mesocycle
pub async fn current_mesocycle_routines(
    routines: &RoutineStore,
    program: &Program,
) -> Result<Vec<StoredRoutine>, MesocycleError> {
    let all = routines.list_routines().await?;
    let mut selected = Vec::new();

    for id in &program.routine_ids {
        match all.iter().find(|r| &r.id == id) {
            Some(routine) if routine.mesocycle_number == Some(program.current_mesocycle) => {
                selected.push(routine.clone());
            }
            Some(_) => {}
            None => {
                tracing::warn!(program_id = %program.id, routine_id = %id, "Attached routine missing from store");
            }
        }
    }

    Ok(selected)
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

/// Summarize the active mesocycle's routines and advance the program.
///
/// Routines whose data is missing or malformed are skipped and reported; the
/// completion fails only when none of them can be parsed. A mesocycle is
/// summarized at most once, so the final one cannot be completed twice.
pub async fn complete_current_mesocycle(
    programs: &ProgramStore,
    routines: &RoutineStore,
    program_id: &str,
) -> Result<CompletionOutcome, MesocycleError> {
    let program = programs.get_program(program_id).await?;
    let mesocycle_number = program.current_mesocycle;

    // Fail fast; the store repeats this check under its writer lock
    check_completable(&program, mesocycle_number)?;

    let stored = current_mesocycle_routines(routines, &program).await?;

    let mut parsed = Vec::new();
    let mut skipped = Vec::new();
    for routine in &stored {
        match parse(routine) {
            Ok(data) => parsed.push(data),
            Err(e) => {
                tracing::warn!(routine_id = %e.routine_id(), error = %e, "Skipping routine");
                skipped.push(SkippedRoutine {
                    routine_id: e.routine_id().to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let phase_name = program
        .phase(mesocycle_number)
        .map(|p| p.phase_name.clone())
        .unwrap_or_else(|| format!("Mesocycle {}", mesocycle_number));

    let summary = extract_mesocycle_summary(&parsed, &phase_name)?.numbered(mesocycle_number);
    let program = programs
        .complete_mesocycle_at(&program.id, mesocycle_number, summary.clone())
        .await?;

    Ok(CompletionOutcome {
        summary,
        skipped,
        program,
    })
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Planning context for the program's active mesocycle
pub fn build_program_context(program: &Program) -> ProgramContext {
    let phase = program.current_phase();

    let previous_mesocycle_summary = if program.current_mesocycle > 1 {
        program
            .completed_mesocycles
            .iter()
            .rev()
            .find(|s| s.mesocycle_number == program.current_mesocycle - 1)
            .or_else(|| program.latest_summary())
            .cloned()
    } else {
        None
    };

    ProgramContext {
        total_mesocycles: program.total_mesocycles,
        current_mesocycle: program.current_mesocycle,
        mesocycle_weeks: phase.map_or(DEFAULT_MESOCYCLE_WEEKS, |p| p.weeks),
        mesocycle_blocks: phase.map_or(DEFAULT_MESOCYCLE_BLOCKS, |p| p.blocks),
        mesocycle_roadmap_text: Some(program.mesocycle_roadmap_text.clone())
            .filter(|t| !t.trim().is_empty()),
        previous_mesocycle_summary,
    }
}

/// Brief for the program's active mesocycle
pub async fn planning_prompt(
    programs: &ProgramStore,
    program_id: &str,
    questionnaire_specs: &str,
) -> Result<String, MesocycleError> {
    let program = programs.get_program(program_id).await?;
    let context = build_program_context(&program);
    Ok(assemble_planning_prompt(questionnaire_specs, Some(&context)))
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------

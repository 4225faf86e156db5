//! Program Store
//!
//! Owns the persisted `Program` records and is the single source of truth for
//! which mesocycle is active. All programs live as one JSON array under the
//! `programs` key of the injected key-value store.
//!
//! Key rules:
//! - Every mutation is load-all -> mutate-one -> save-all, serialized behind
//!   one writer lock so concurrent callers cannot overwrite each other
//! - Storage failures propagate as `StoreError::Storage`, never a silent no-op
//! - `current_mesocycle` never moves past `total_mesocycles`

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::db::{load_json_list, save_json_list, KeyValueStore, StorageError};
use crate::models::{CompletedMesocycleSummary, MesocyclePhase, Program, ProgramUpdate};

pub const PROGRAMS_KEY: &str = "programs";

// ---------------------------------------------------------------------------
/// Error Types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Program not found: {0}")]
    ProgramNotFound(String),

    #[error("Program already exists: {0}")]
    ProgramExists(String),

    #[error("Invalid program {id}: {reason}")]
    InvalidProgram { id: String, reason: String },

    #[error("Routine not found: {0}")]
    RoutineNotFound(String),

    #[error("Program {id} is at mesocycle {current}, not {expected}")]
    MesocycleMismatch {
        id: String,
        expected: u32,
        current: u32,
    },

    #[error("Mesocycle {mesocycle} of program {id} is already completed")]
    MesocycleAlreadyCompleted { id: String, mesocycle: u32 },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl Serialize for StoreError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

// ---------------------------------------------------------------------------
/// Program Store
// ---------------------------------------------------------------------------

pub struct ProgramStore {
    kv: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl ProgramStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            write_lock: Mutex::new(()),
        }
    }

    async fn load_all(&self) -> Result<Vec<Program>, StoreError> {
        Ok(load_json_list(self.kv.as_ref(), PROGRAMS_KEY).await?)
    }

    async fn save_all(&self, programs: &[Program]) -> Result<(), StoreError> {
        Ok(save_json_list(self.kv.as_ref(), PROGRAMS_KEY, programs).await?)
    }

    async fn modify<T, F>(&self, id: &str, mutate: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Program) -> T,
    {
        self.try_modify(id, |program| Ok(mutate(program))).await
    }

    /// Load, mutate one program, validate, save. Holds the writer lock throughout.
    ///
    /// When `mutate` fails nothing is written.
    async fn try_modify<T, F>(&self, id: &str, mutate: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Program) -> Result<T, StoreError>,
    {
        let _guard = self.write_lock.lock().await;

        let mut programs = self.load_all().await?;
        let program = programs
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::ProgramNotFound(id.to_string()))?;

        let result = mutate(program)?;
        program
            .validate()
            .map_err(|reason| StoreError::InvalidProgram {
                id: id.to_string(),
                reason,
            })?;

        self.save_all(&programs).await?;
        Ok(result)
    }

    // -----------------------------------------------------------------------
    // CRUD
    // -----------------------------------------------------------------------

    /// All stored programs, in insertion order
    pub async fn get_programs(&self) -> Result<Vec<Program>, StoreError> {
        self.load_all().await
    }

    pub async fn get_program(&self, id: &str) -> Result<Program, StoreError> {
        self.load_all()
            .await?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::ProgramNotFound(id.to_string()))
    }

    pub async fn add_program(&self, program: Program) -> Result<Program, StoreError> {
        program
            .validate()
            .map_err(|reason| StoreError::InvalidProgram {
                id: program.id.clone(),
                reason,
            })?;

        let _guard = self.write_lock.lock().await;
        let mut programs = self.load_all().await?;
        if programs.iter().any(|p| p.id == program.id) {
            return Err(StoreError::ProgramExists(program.id));
        }

        programs.push(program.clone());
        self.save_all(&programs).await?;

        tracing::info!(program_id = %program.id, name = %program.name, "Program added");
        Ok(program)
    }

    /// Shallow-merge `update` into the stored program
    pub async fn update_program(
        &self,
        id: &str,
        update: ProgramUpdate,
    ) -> Result<Program, StoreError> {
        let program = self
            .modify(id, |program| {
                update.apply_to(program);
                program.clone()
            })
            .await?;
        tracing::debug!(program_id = %id, "Program updated");
        Ok(program)
    }

    pub async fn delete_program(&self, id: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut programs = self.load_all().await?;

        let before = programs.len();
        programs.retain(|p| p.id != id);
        if programs.len() == before {
            return Err(StoreError::ProgramNotFound(id.to_string()));
        }

        self.save_all(&programs).await?;
        tracing::info!(program_id = %id, "Program deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Domain Operations
    // -----------------------------------------------------------------------

    /// Attach a routine id; a no-op when it is already attached
    pub async fn add_routine_to_program(
        &self,
        program_id: &str,
        routine_id: &str,
    ) -> Result<Program, StoreError> {
        self.modify(program_id, |program| {
            if !program.routine_ids.iter().any(|r| r == routine_id) {
                program.routine_ids.push(routine_id.to_string());
            }
            program.clone()
        })
        .await
    }

    pub async fn remove_routine_from_program(
        &self,
        program_id: &str,
        routine_id: &str,
    ) -> Result<Program, StoreError> {
        self.modify(program_id, |program| {
            program.routine_ids.retain(|r| r != routine_id);
            program.clone()
        })
        .await
    }

    /// Append the summary, then advance to the next mesocycle (clamped at the last)
    pub async fn complete_mesocycle(
        &self,
        program_id: &str,
        summary: CompletedMesocycleSummary,
    ) -> Result<Program, StoreError> {
        let program = self
            .modify(program_id, |program| {
                advance(program, summary);
                program.clone()
            })
            .await?;

        tracing::info!(
            program_id = %program_id,
            current_mesocycle = program.current_mesocycle,
            total_mesocycles = program.total_mesocycles,
            "Mesocycle completed"
        );
        Ok(program)
    }

    /// Complete `expected_mesocycle` only if it is still the active, unsummarized one.
    ///
    /// The check and the write happen under the writer lock, so concurrent
    /// completions of the same mesocycle append exactly one summary.
    pub async fn complete_mesocycle_at(
        &self,
        program_id: &str,
        expected_mesocycle: u32,
        summary: CompletedMesocycleSummary,
    ) -> Result<Program, StoreError> {
        let program = self
            .try_modify(program_id, |program| {
                check_completable(program, expected_mesocycle)?;
                advance(program, summary);
                Ok(program.clone())
            })
            .await?;

        tracing::info!(
            program_id = %program_id,
            completed = expected_mesocycle,
            current_mesocycle = program.current_mesocycle,
            "Mesocycle completed"
        );
        Ok(program)
    }

    /// Replace the roadmap text and its structured form together
    pub async fn update_mesocycle_roadmap(
        &self,
        program_id: &str,
        roadmap_text: &str,
        roadmap_data: Vec<MesocyclePhase>,
    ) -> Result<Program, StoreError> {
        let phases = roadmap_data.len();
        let program = self
            .modify(program_id, |program| {
                program.mesocycle_roadmap_text = roadmap_text.to_string();
                program.mesocycle_roadmap = roadmap_data;
                program.clone()
            })
            .await?;

        tracing::info!(program_id = %program_id, phases, "Roadmap replaced");
        Ok(program)
    }
}

/// Fail unless `mesocycle` is the program's active mesocycle and has no summary yet
pub fn check_completable(program: &Program, mesocycle: u32) -> Result<(), StoreError> {
    if program.current_mesocycle != mesocycle {
        return Err(StoreError::MesocycleMismatch {
            id: program.id.clone(),
            expected: mesocycle,
            current: program.current_mesocycle,
        });
    }
    if program
        .completed_mesocycles
        .iter()
        .any(|s| s.mesocycle_number == mesocycle)
    {
        return Err(StoreError::MesocycleAlreadyCompleted {
            id: program.id.clone(),
            mesocycle,
        });
    }
    Ok(())
}

fn advance(program: &mut Program, summary: CompletedMesocycleSummary) {
    program.completed_mesocycles.push(summary);
    program.current_mesocycle = program
        .current_mesocycle
        .saturating_add(1)
        .min(program.total_mesocycles);
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------

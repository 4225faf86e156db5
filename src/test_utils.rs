//! Test utilities and helpers for integration and unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Routine and program factories
//! - A key-value store that always fails

use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::db::{KeyValueStore, StorageError};
use crate::models::{
  CompletedMesocycleSummary, Exercise, MesocyclePhase, ParsedWorkoutData, Program, WorkoutBlock,
  WorkoutDay,
};

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// Store whose every call fails, for error propagation tests
pub struct FailingKvStore;

#[async_trait]
impl KeyValueStore for FailingKvStore {
  async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
    Err(StorageError::Io(std::io::Error::other("disk unavailable")))
  }

  async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
    Err(StorageError::Io(std::io::Error::other("disk unavailable")))
  }
}

/// ---------------------------------------------------------------------------
/// Routine Factories
/// ---------------------------------------------------------------------------

pub fn strength_exercise(name: &str, sets: u32, primary: &[&str], reps: &str) -> Exercise {
  Exercise {
    exercise_type: Some("strength".to_string()),
    exercise: Some(name.to_string()),
    sets: Some(serde_json::json!(sets)),
    reps: Some(reps.to_string()),
    primary_muscles: Some(primary.iter().map(|m| m.to_string()).collect()),
    secondary_muscles: Some(Vec::new()),
  }
}

/// One-block routine; the block name carries no rep range
pub fn routine_with_block(
  weeks: &str,
  structure: Option<&str>,
  days: Vec<(&str, Vec<Exercise>)>,
) -> ParsedWorkoutData {
  ParsedWorkoutData {
    routine_name: Some("Test Routine".to_string()),
    description: None,
    days_per_week: None,
    blocks: vec![WorkoutBlock {
      block_name: Some("Main Block".to_string()),
      weeks: Some(weeks.to_string()),
      structure: structure.map(str::to_string),
      deload_weeks: None,
      days: days
        .into_iter()
        .map(|(name, exercises)| WorkoutDay {
          day_name: Some(name.to_string()),
          exercises,
        })
        .collect(),
    }],
  }
}

/// Upper/lower block, weeks 1-4, rep range in the block name
pub fn upper_lower_routine_json() -> String {
  r#"{
    "routine_name": "Upper Lower Hypertrophy",
    "description": "Four day upper/lower split",
    "days_per_week": 4,
    "blocks": [
      {
        "block_name": "Block 1 — Hypertrophy: 8-12 reps",
        "weeks": "1-4",
        "days": [
          {
            "day_name": "Upper A",
            "exercises": [
              {
                "type": "strength",
                "exercise": "Bench Press",
                "sets": 4,
                "reps": "8-12",
                "primaryMuscles": ["Chest", "Front Delts"],
                "secondaryMuscles": ["Triceps"]
              },
              {
                "type": "strength",
                "exercise": "Chest Supported Row",
                "sets": 3,
                "reps": "10-12",
                "primaryMuscles": ["Lats"],
                "secondaryMuscles": ["Biceps"]
              }
            ]
          },
          {
            "day_name": "Lower A",
            "exercises": [
              {
                "type": "strength",
                "exercise": "Back Squat",
                "sets": 4,
                "reps": "6-8",
                "primaryMuscles": ["Quads", "Glutes"],
                "secondaryMuscles": ["Adductors"]
              },
              {
                "type": "cardio",
                "exercise": "Incline Walk",
                "sets": 1,
                "reps": "20 min",
                "primaryMuscles": ["Calves"]
              }
            ]
          }
        ]
      }
    ]
  }"#
  .to_string()
}

/// Push/pull/legs block, weeks 1-5 with week 5 as deload
pub fn ppl_routine_json() -> String {
  r#"{
    "routine_name": "PPL Intensification",
    "description": "Push pull legs with a deload",
    "days_per_week": 3,
    "blocks": [
      {
        "block_name": "Block 2 — Intensification",
        "weeks": "1-5",
        "structure": "Push / Pull / Legs",
        "deload_weeks": [5],
        "days": [
          {
            "day_name": "Push",
            "exercises": [
              {
                "type": "strength",
                "exercise": "Incline Dumbbell Press",
                "sets": 3,
                "reps": "6-10",
                "primaryMuscles": ["Chest"],
                "secondaryMuscles": ["Front Delts", "Triceps"]
              }
            ]
          },
          {
            "day_name": "Pull",
            "exercises": [
              {
                "type": "strength",
                "exercise": "Weighted Pull-up",
                "sets": 4,
                "reps": "5-8",
                "primaryMuscles": ["Lats", "Upper Back"],
                "secondaryMuscles": ["Biceps"]
              }
            ]
          },
          {
            "day_name": "Legs",
            "exercises": [
              {
                "type": "strength",
                "exercise": "Romanian Deadlift",
                "sets": 3,
                "reps": "6-10",
                "primaryMuscles": ["Hamstrings", "Glutes"],
                "secondaryMuscles": ["Lower Back"]
              }
            ]
          }
        ]
      }
    ]
  }"#
  .to_string()
}

/// ---------------------------------------------------------------------------
/// Program Factories
/// ---------------------------------------------------------------------------

/// Program with roadmap entries for mesocycles 1 and 2 only
pub fn make_program(total_mesocycles: u32) -> Program {
  Program::new(
    "Test Program",
    "6 months",
    total_mesocycles,
    vec![
      MesocyclePhase {
        mesocycle_number: 1,
        phase_name: "Hypertrophy".to_string(),
        rep_focus: "8-12 reps".to_string(),
        emphasis: "Volume accumulation".to_string(),
        weeks: 4,
        blocks: 2,
      },
      MesocyclePhase {
        mesocycle_number: 2,
        phase_name: "Strength".to_string(),
        rep_focus: "4-6 reps".to_string(),
        emphasis: "Heavy compounds".to_string(),
        weeks: 5,
        blocks: 1,
      },
    ],
    "Mesocycle 1 — Hypertrophy (8-12 reps, 4 weeks, 2 blocks)\nMesocycle 2 — Strength (4-6 reps, 5 weeks, 1 block)",
  )
}

pub fn make_summary(mesocycle_number: u32) -> CompletedMesocycleSummary {
  CompletedMesocycleSummary {
    mesocycle_number,
    phase_name: "Hypertrophy".to_string(),
    split_structure: "Upper / Lower (4x/week)".to_string(),
    rep_range_focus: "8-12 reps".to_string(),
    exercises_used: vec![
      "Back Squat".to_string(),
      "Barbell Row".to_string(),
      "Bench Press".to_string(),
    ],
    volume_per_muscle: BTreeMap::from([
      ("Quads".to_string(), 20),
      ("Chest".to_string(), 16),
      ("Lats".to_string(), 12),
    ]),
  }
}

//! Deterministic volume & exercise extraction for completed mesocycles
//!
//! Turns the parsed routines of one mesocycle into a summary of what was
//! actually trained: split, rep-range focus, exercise roster and weekly sets
//! per primary muscle. The planning prompt consumes these numbers as-is.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{CompletedMesocycleSummary, Exercise, ParsedWorkoutData};

/// ---------------------------------------------------------------------------
/// Constants
/// ---------------------------------------------------------------------------

pub const MIXED_REP_RANGES: &str = "Mixed rep ranges";
pub const UNKNOWN_SPLIT: &str = "Unknown Split";

/// Compound exercises sampled when the block name carries no rep range
const COMPOUND_SAMPLE_SIZE: usize = 3;

static REPS_PATTERN: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(\d+)-(\d+)\s*reps?").expect("valid reps regex"));

static BARE_RANGE_PATTERN: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(\d+)-(\d+)").expect("valid range regex"));

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ExtractionError {
  #[error("Invalid week range: {0:?}")]
  InvalidWeekRange(String),

  #[error("No routines provided for mesocycle summary")]
  NoRoutinesProvided,
}

impl Serialize for ExtractionError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

/// ---------------------------------------------------------------------------
/// Week Arithmetic
/// ---------------------------------------------------------------------------

/// Count non-deload weeks in an inclusive range like `"1-4"` or `"5"`
pub fn calculate_training_weeks(
  weeks_range: &str,
  deload_weeks: &HashSet<u32>,
) -> Result<u32, ExtractionError> {
  let invalid = || ExtractionError::InvalidWeekRange(weeks_range.to_string());
  let parse_week = |s: &str| s.trim().parse::<u32>().map_err(|_| invalid());

  let (start, end) = match weeks_range.split_once('-') {
    Some((start, end)) => (parse_week(start)?, parse_week(end)?),
    None => {
      let week = parse_week(weeks_range)?;
      (week, week)
    }
  };

  if start > end {
    return Err(invalid());
  }

  let span = u64::from(end - start) + 1;
  let deloads_in_range = deload_weeks
    .iter()
    .filter(|w| (start..=end).contains(*w))
    .count() as u64;

  u32::try_from(span - deloads_in_range).map_err(|_| invalid())
}

/// ---------------------------------------------------------------------------
/// Exercise Roster & Volume
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseVolume {
  pub exercises_used: BTreeSet<String>,
  pub volume_per_muscle: BTreeMap<String, u32>,
}

/// Walk every strength exercise across all routines.
///
/// Sets are assumed to repeat every non-deload week of their block, so each
/// primary muscle gains `sets * training_weeks`.
pub fn extract_exercises_and_volume(
  routines: &[ParsedWorkoutData],
) -> Result<ExerciseVolume, ExtractionError> {
  let mut result = ExerciseVolume::default();

  for routine in routines {
    for block in &routine.blocks {
      // Computed lazily: a block without weighted strength work never needs its range
      let mut training_weeks: Option<u32> = None;

      for exercise in block.days.iter().flat_map(|d| d.exercises.iter()) {
        if !exercise.is_strength() {
          continue;
        }
        let Some(name) = exercise.exercise.as_ref().filter(|n| !n.trim().is_empty()) else {
          continue;
        };
        result.exercises_used.insert(name.clone());

        let (Some(muscles), Some(sets)) = (&exercise.primary_muscles, exercise.numeric_sets())
        else {
          continue;
        };

        let weeks = match training_weeks {
          Some(w) => w,
          None => {
            let deloads: HashSet<u32> = block.deload_weeks.iter().flatten().copied().collect();
            let w = calculate_training_weeks(block.weeks.as_deref().unwrap_or(""), &deloads)?;
            training_weeks = Some(w);
            w
          }
        };

        let contribution = sets.saturating_mul(weeks);
        if contribution == 0 {
          continue;
        }
        for muscle in muscles {
          let total = result.volume_per_muscle.entry(muscle.clone()).or_insert(0);
          *total = total.saturating_add(contribution);
        }
      }
    }
  }

  Ok(result)
}

/// ---------------------------------------------------------------------------
/// Rep Range & Split Inference
/// ---------------------------------------------------------------------------

fn normalize_range(caps: &regex::Captures<'_>) -> String {
  format!("{}-{} reps", &caps[1], &caps[2])
}

/// Infer the rep-range focus of a routine.
///
/// Order: the first block's name, then the most frequent range among the first
/// few compound lifts (ties go to the range seen first), then a fixed fallback.
pub fn extract_rep_range_focus(data: &ParsedWorkoutData) -> String {
  if let Some(name) = data.blocks.first().and_then(|b| b.block_name.as_deref()) {
    if let Some(caps) = REPS_PATTERN
      .captures(name)
      .or_else(|| BARE_RANGE_PATTERN.captures(name))
    {
      return normalize_range(&caps);
    }
  }

  let compounds = data
    .blocks
    .iter()
    .flat_map(|b| b.days.iter())
    .flat_map(|d| d.exercises.iter())
    .filter(|e| e.is_strength() && e.primary_muscle_count() >= 2)
    .take(COMPOUND_SAMPLE_SIZE);

  // Ordered (range, count) pairs keep the first-encountered tie-break explicit
  let mut counts: Vec<(String, usize)> = Vec::new();
  for range in compounds.filter_map(rep_range_of) {
    match counts.iter_mut().find(|(r, _)| *r == range) {
      Some((_, count)) => *count += 1,
      None => counts.push((range, 1)),
    }
  }

  let mut best: Option<&(String, usize)> = None;
  for entry in &counts {
    if best.is_none_or(|(_, top)| entry.1 > *top) {
      best = Some(entry);
    }
  }

  best
    .map(|(range, _)| range.clone())
    .unwrap_or_else(|| MIXED_REP_RANGES.to_string())
}

fn rep_range_of(exercise: &Exercise) -> Option<String> {
  let reps = exercise.reps.as_deref()?;
  BARE_RANGE_PATTERN.captures(reps).map(|caps| normalize_range(&caps))
}

/// Fallback split description built from the first block's day names
pub fn infer_split_from_day_names(data: &ParsedWorkoutData) -> String {
  let Some(block) = data.blocks.first().filter(|b| !b.days.is_empty()) else {
    return UNKNOWN_SPLIT.to_string();
  };

  let names: Vec<String> = block
    .days
    .iter()
    .enumerate()
    .map(|(i, day)| {
      day
        .day_name
        .clone()
        .unwrap_or_else(|| format!("Day {}", i + 1))
    })
    .collect();

  let days_per_week = data
    .days_per_week
    .clone()
    .unwrap_or_else(|| block.days.len().to_string());

  format!("{} ({}x/week)", names.join(" / "), days_per_week)
}

/// ---------------------------------------------------------------------------
/// Mesocycle Summary
/// ---------------------------------------------------------------------------

/// Summary of an executed mesocycle before it is given its roadmap position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedSummary {
  pub phase_name: String,
  pub split_structure: String,
  pub rep_range_focus: String,
  pub exercises_used: BTreeSet<String>,
  pub volume_per_muscle: BTreeMap<String, u32>,
}

impl ExtractedSummary {
  pub fn numbered(self, mesocycle_number: u32) -> CompletedMesocycleSummary {
    CompletedMesocycleSummary {
      mesocycle_number,
      phase_name: self.phase_name,
      split_structure: self.split_structure,
      rep_range_focus: self.rep_range_focus,
      exercises_used: self.exercises_used.into_iter().collect(),
      volume_per_muscle: self.volume_per_muscle,
    }
  }
}

/// Summarize every routine of one mesocycle.
///
/// Split and rep focus come from the first routine; roster and volume are
/// summed across all of them, since each block is usually a separate import.
pub fn extract_mesocycle_summary(
  routines: &[ParsedWorkoutData],
  phase_name: &str,
) -> Result<ExtractedSummary, ExtractionError> {
  let first = routines.first().ok_or(ExtractionError::NoRoutinesProvided)?;

  let split_structure = first
    .blocks
    .first()
    .and_then(|b| b.structure.as_deref())
    .filter(|s| !s.trim().is_empty())
    .map(str::to_string)
    .unwrap_or_else(|| infer_split_from_day_names(first));

  let rep_range_focus = extract_rep_range_focus(first);
  let ExerciseVolume {
    exercises_used,
    volume_per_muscle,
  } = extract_exercises_and_volume(routines)?;

  Ok(ExtractedSummary {
    phase_name: phase_name.to_string(),
    split_structure,
    rep_range_focus,
    exercises_used,
    volume_per_muscle,
  })
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Normalized routine document: blocks -> days -> exercises
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedWorkoutData {
  #[serde(default)]
  pub routine_name: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default, deserialize_with = "string_or_number")]
  pub days_per_week: Option<String>,
  #[serde(default)]
  pub blocks: Vec<WorkoutBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkoutBlock {
  #[serde(default)]
  pub block_name: Option<String>,
  /// Week range, `"1-4"` or `"5"`
  #[serde(default, deserialize_with = "string_or_number")]
  pub weeks: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub structure: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub deload_weeks: Option<Vec<u32>>,
  #[serde(default)]
  pub days: Vec<WorkoutDay>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkoutDay {
  #[serde(default)]
  pub day_name: Option<String>,
  #[serde(default)]
  pub exercises: Vec<Exercise>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
  /// Discriminator: "strength", "cardio", ...
  #[serde(rename = "type", default)]
  pub exercise_type: Option<String>,
  #[serde(default)]
  pub exercise: Option<String>,
  /// Kept raw: only a JSON number counts as a set count
  #[serde(default)]
  pub sets: Option<serde_json::Value>,
  #[serde(default, deserialize_with = "string_or_number")]
  pub reps: Option<String>,
  #[serde(rename = "primaryMuscles", default)]
  pub primary_muscles: Option<Vec<String>>,
  #[serde(rename = "secondaryMuscles", default)]
  pub secondary_muscles: Option<Vec<String>>,
}

impl Exercise {
  pub fn is_strength(&self) -> bool {
    self.exercise_type.as_deref() == Some("strength")
  }

  /// Set count when `sets` is a JSON number holding a whole, non-negative value.
  ///
  /// `3.0` counts as 3; fractional or string values yield `None`.
  pub fn numeric_sets(&self) -> Option<u32> {
    let Some(serde_json::Value::Number(n)) = &self.sets else {
      return None;
    };
    if let Some(v) = n.as_u64() {
      return u32::try_from(v).ok();
    }
    n.as_f64()
      .filter(|v| v.fract() == 0.0 && *v >= 0.0 && *v <= f64::from(u32::MAX))
      .map(|v| v as u32)
  }

  pub fn primary_muscle_count(&self) -> usize {
    self.primary_muscles.as_ref().map_or(0, Vec::len)
  }
}

/// Imported routine payload: a JSON-encoded string or an already-structured object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoutinePayload {
  Encoded(String),
  Structured(ParsedWorkoutData),
}

/// Routine as held by the routine store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRoutine {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub data: Option<RoutinePayload>,
  #[serde(default)]
  pub program_id: Option<String>,
  /// Mesocycle that was active when the routine was imported
  #[serde(default)]
  pub mesocycle_number: Option<u32>,
  pub created_at: DateTime<Utc>,
}

impl StoredRoutine {
  pub fn new(name: &str, data: Option<RoutinePayload>) -> Self {
    Self {
      id: uuid::Uuid::new_v4().to_string(),
      name: name.to_string(),
      data,
      program_id: None,
      mesocycle_number: None,
      created_at: Utc::now(),
    }
  }
}

/// Accept `"1-4"`, `5` or `null` for text-ish fields
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Raw {
    Text(String),
    Number(serde_json::Number),
  }

  Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
    Raw::Text(s) => s,
    Raw::Number(n) => n.to_string(),
  }))
}

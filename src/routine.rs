//! Routine parser
//!
//! Normalizes an imported routine payload into `ParsedWorkoutData` once, at
//! the ingestion boundary. Nothing downstream re-checks the payload shape.

use serde::Serialize;

use crate::models::{ParsedWorkoutData, RoutinePayload, StoredRoutine};

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RoutineError {
  #[error("Routine {routine_id} has no workout data")]
  MissingData { routine_id: String },

  #[error("Routine {routine_id} contains malformed JSON: {source}")]
  MalformedJson {
    routine_id: String,
    #[source]
    source: serde_json::Error,
  },
}

impl RoutineError {
  /// Id of the routine that failed, so callers can skip it
  pub fn routine_id(&self) -> &str {
    match self {
      Self::MissingData { routine_id } | Self::MalformedJson { routine_id, .. } => routine_id,
    }
  }
}

impl Serialize for RoutineError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

/// ---------------------------------------------------------------------------
/// Parsing
/// ---------------------------------------------------------------------------

/// Parse a stored routine's payload
pub fn parse(routine: &StoredRoutine) -> Result<ParsedWorkoutData, RoutineError> {
  parse_payload(&routine.id, routine.data.as_ref())
}

/// Parse a raw payload on behalf of `routine_id`
pub fn parse_payload(
  routine_id: &str,
  data: Option<&RoutinePayload>,
) -> Result<ParsedWorkoutData, RoutineError> {
  match data {
    None => Err(RoutineError::MissingData {
      routine_id: routine_id.to_string(),
    }),
    Some(RoutinePayload::Encoded(text)) => {
      serde_json::from_str(text).map_err(|source| RoutineError::MalformedJson {
        routine_id: routine_id.to_string(),
        source,
      })
    }
    Some(RoutinePayload::Structured(data)) => Ok(data.clone()),
  }
}

/// Interpret raw import text: a JSON object becomes a structured payload,
/// anything else is kept as an encoded string for the parser to judge.
pub fn payload_from_import(text: &str) -> RoutinePayload {
  match serde_json::from_str::<ParsedWorkoutData>(text) {
    Ok(data) if text.trim_start().starts_with('{') => RoutinePayload::Structured(data),
    _ => RoutinePayload::Encoded(text.to_string()),
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::upper_lower_routine_json;

  #[test]
  fn test_parse_missing_data() {
    let routine = StoredRoutine::new("Empty", None);
    let err = parse(&routine).unwrap_err();
    assert!(matches!(err, RoutineError::MissingData { .. }));
    assert_eq!(err.routine_id(), routine.id);
  }

  #[test]
  fn test_parse_encoded_string() {
    let routine = StoredRoutine::new(
      "Upper Lower",
      Some(RoutinePayload::Encoded(upper_lower_routine_json())),
    );
    let data = parse(&routine).expect("Should parse encoded routine");
    assert_eq!(data.routine_name.as_deref(), Some("Upper Lower Hypertrophy"));
    assert_eq!(data.blocks.len(), 1);
    assert_eq!(data.blocks[0].days.len(), 2);
  }

  #[test]
  fn test_parse_malformed_string_identifies_routine() {
    let routine = StoredRoutine::new(
      "Broken",
      Some(RoutinePayload::Encoded("{\"blocks\": [".to_string())),
    );
    let err = parse(&routine).unwrap_err();
    assert!(matches!(err, RoutineError::MalformedJson { .. }));
    assert_eq!(err.routine_id(), routine.id);
    assert!(err.to_string().contains("malformed JSON"));
  }

  #[test]
  fn test_parse_structured_passes_through() {
    let data: ParsedWorkoutData = serde_json::from_str(&upper_lower_routine_json()).unwrap();
    let routine = StoredRoutine::new("Structured", Some(RoutinePayload::Structured(data.clone())));
    assert_eq!(parse(&routine).unwrap(), data);
  }

  #[test]
  fn test_payload_from_import() {
    let structured = payload_from_import(&upper_lower_routine_json());
    assert!(matches!(structured, RoutinePayload::Structured(_)));

    let garbage = payload_from_import("not json at all");
    assert!(matches!(garbage, RoutinePayload::Encoded(_)));
  }
}

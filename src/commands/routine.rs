use crate::db::AppState;
use crate::mesocycle;
use crate::models::StoredRoutine;
use crate::routine::payload_from_import;

/// ---------------------------------------------------------------------------
/// Routine Commands
/// ---------------------------------------------------------------------------

/// Import raw routine text (JSON) for the program's active mesocycle
pub async fn import_routine(
  state: &AppState,
  program_id: &str,
  name: &str,
  raw: &str,
) -> Result<StoredRoutine, String> {
  let payload = payload_from_import(raw);
  mesocycle::import_routine(&state.programs, &state.routines, program_id, name, payload)
    .await
    .map_err(|e| format!("Failed to import routine: {}", e))
}

/// Routines referenced by a program, or every stored routine
pub async fn list_routines(
  state: &AppState,
  program_id: Option<&str>,
) -> Result<Vec<StoredRoutine>, String> {
  let routines = state
    .routines
    .list_routines()
    .await
    .map_err(|e| format!("Failed to list routines: {}", e))?;

  let Some(program_id) = program_id else {
    return Ok(routines);
  };

  let program = state
    .programs
    .get_program(program_id)
    .await
    .map_err(|e| format!("Failed to get program: {}", e))?;

  Ok(
    routines
      .into_iter()
      .filter(|r| program.routine_ids.contains(&r.id))
      .collect(),
  )
}

/// Detach a routine from a program; with `delete` the routine record goes too
pub async fn remove_routine(
  state: &AppState,
  program_id: &str,
  routine_id: &str,
  delete: bool,
) -> Result<(), String> {
  mesocycle::detach_routine(&state.programs, program_id, routine_id)
    .await
    .map_err(|e| format!("Failed to remove routine: {}", e))?;

  if delete {
    state
      .routines
      .delete_routine(routine_id)
      .await
      .map_err(|e| format!("Failed to delete routine: {}", e))?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::RoutinePayload;
  use crate::test_utils::*;

  #[tokio::test]
  async fn test_import_and_list_routines() {
    let pool = setup_test_db().await;
    let state = AppState::new(pool.clone());
    let program = state.programs.add_program(make_program(3)).await.unwrap();

    let routine = import_routine(&state, &program.id, "Block 1", &upper_lower_routine_json())
      .await
      .expect("Should import routine");
    assert!(matches!(routine.data, Some(RoutinePayload::Structured(_))));

    // Unattached routine is not listed for the program
    state
      .routines
      .save_routine(StoredRoutine::new("Loose", None))
      .await
      .unwrap();

    let listed = list_routines(&state, Some(&program.id)).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, routine.id);
    assert_eq!(list_routines(&state, None).await.unwrap().len(), 2);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_remove_routine_detaches() {
    let pool = setup_test_db().await;
    let state = AppState::new(pool.clone());
    let program = state.programs.add_program(make_program(3)).await.unwrap();
    let routine = import_routine(&state, &program.id, "Block 1", &ppl_routine_json())
      .await
      .unwrap();

    remove_routine(&state, &program.id, &routine.id, false).await.unwrap();

    assert!(list_routines(&state, Some(&program.id)).await.unwrap().is_empty());
    // Routine record survives
    assert!(state.routines.get_routine(&routine.id).await.is_ok());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_remove_routine_with_delete() {
    let pool = setup_test_db().await;
    let state = AppState::new(pool.clone());
    let program = state.programs.add_program(make_program(3)).await.unwrap();
    let routine = import_routine(&state, &program.id, "Block 1", &ppl_routine_json())
      .await
      .unwrap();

    remove_routine(&state, &program.id, &routine.id, true).await.unwrap();

    assert!(list_routines(&state, None).await.unwrap().is_empty());
    let program = state.programs.get_program(&program.id).await.unwrap();
    assert!(program.routine_ids.is_empty());

    let err = remove_routine(&state, &program.id, &routine.id, true)
      .await
      .unwrap_err();
    assert!(err.contains("Routine not found"), "{}", err);

    teardown_test_db(pool).await;
  }
}

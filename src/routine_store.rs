//! Routine store
//!
//! Holds imported routines as one JSON array under the `routines` key. Programs
//! only reference routines by id; a routine is never copied into a program.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{load_json_list, save_json_list, KeyValueStore};
use crate::models::StoredRoutine;
use crate::program_store::StoreError;

pub const ROUTINES_KEY: &str = "routines";

pub struct RoutineStore {
  kv: Arc<dyn KeyValueStore>,
  write_lock: Mutex<()>,
}

impl RoutineStore {
  pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
    Self {
      kv,
      write_lock: Mutex::new(()),
    }
  }

  pub async fn list_routines(&self) -> Result<Vec<StoredRoutine>, StoreError> {
    Ok(load_json_list(self.kv.as_ref(), ROUTINES_KEY).await?)
  }

  /// Insert or replace a routine by id
  pub async fn save_routine(&self, routine: StoredRoutine) -> Result<StoredRoutine, StoreError> {
    let _guard = self.write_lock.lock().await;
    let mut routines = self.list_routines().await?;

    match routines.iter_mut().find(|r| r.id == routine.id) {
      Some(existing) => *existing = routine.clone(),
      None => routines.push(routine.clone()),
    }

    save_json_list(self.kv.as_ref(), ROUTINES_KEY, &routines).await?;
    tracing::debug!(routine_id = %routine.id, "Routine saved");
    Ok(routine)
  }

  pub async fn get_routine(&self, id: &str) -> Result<StoredRoutine, StoreError> {
    self
      .list_routines()
      .await?
      .into_iter()
      .find(|r| r.id == id)
      .ok_or_else(|| StoreError::RoutineNotFound(id.to_string()))
  }

  pub async fn delete_routine(&self, id: &str) -> Result<(), StoreError> {
    let _guard = self.write_lock.lock().await;
    let mut routines = self.list_routines().await?;

    let before = routines.len();
    routines.retain(|r| r.id != id);
    if routines.len() == before {
      return Err(StoreError::RoutineNotFound(id.to_string()));
    }

    save_json_list(self.kv.as_ref(), ROUTINES_KEY, &routines).await?;
    tracing::debug!(routine_id = %id, "Routine deleted");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::MemoryKvStore;
  use crate::models::RoutinePayload;

  fn store() -> RoutineStore {
    RoutineStore::new(Arc::new(MemoryKvStore::new()))
  }

  #[tokio::test]
  async fn test_save_and_get_routine() {
    let store = store();
    let routine = StoredRoutine::new("Block 1", Some(RoutinePayload::Encoded("{}".to_string())));
    store.save_routine(routine.clone()).await.unwrap();

    assert_eq!(store.get_routine(&routine.id).await.unwrap(), routine);
  }

  #[tokio::test]
  async fn test_save_replaces_existing() {
    let store = store();
    let mut routine = StoredRoutine::new("Block 1", None);
    store.save_routine(routine.clone()).await.unwrap();

    routine.name = "Block 1 (revised)".to_string();
    store.save_routine(routine.clone()).await.unwrap();

    let all = store.list_routines().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, "Block 1 (revised)");
  }

  #[tokio::test]
  async fn test_delete_routine() {
    let store = store();
    let routine = store.save_routine(StoredRoutine::new("A", None)).await.unwrap();

    store.delete_routine(&routine.id).await.unwrap();
    assert!(store.list_routines().await.unwrap().is_empty());
    assert!(matches!(
      store.delete_routine(&routine.id).await,
      Err(StoreError::RoutineNotFound(_))
    ));
  }
}

//! Application commands over `AppState`
//!
//! Each command returns `Result<T, String>` so any front end can surface the
//! failure message directly.

pub mod mesocycle;
pub mod program;
pub mod routine;

pub mod program;
pub mod routine;

pub use program::{CompletedMesocycleSummary, MesocyclePhase, Program, ProgramUpdate};
pub use routine::{
  Exercise, ParsedWorkoutData, RoutinePayload, StoredRoutine, WorkoutBlock, WorkoutDay,
};

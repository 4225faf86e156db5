use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A planned (not yet executed) phase of the program roadmap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MesocyclePhase {
  pub mesocycle_number: u32,
  pub phase_name: String,
  pub rep_focus: String,
  pub emphasis: String,
  pub weeks: u32,
  pub blocks: u32,
}

impl MesocyclePhase {
  /// Stand-in phase used until a real roadmap has been generated
  pub fn placeholder(weeks: u32, blocks: u32) -> Self {
    Self {
      mesocycle_number: 1,
      phase_name: "Mesocycle 1".to_string(),
      rep_focus: "To be determined".to_string(),
      emphasis: "To be determined".to_string(),
      weeks,
      blocks,
    }
  }
}

/// What was actually trained during an executed mesocycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedMesocycleSummary {
  pub mesocycle_number: u32,
  pub phase_name: String,
  pub split_structure: String,
  pub rep_range_focus: String,
  /// Sorted, de-duplicated, exact-string identity
  pub exercises_used: Vec<String>,
  /// Muscle name -> working sets per week
  pub volume_per_muscle: BTreeMap<String, u32>,
}

/// Persistent aggregate root for a multi-mesocycle program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
  pub id: String,
  pub name: String,
  pub created_at: DateTime<Utc>,
  pub program_duration: String,
  pub total_mesocycles: u32,
  /// 1-indexed, always within `1..=total_mesocycles`
  pub current_mesocycle: u32,
  pub mesocycle_roadmap: Vec<MesocyclePhase>,
  /// Verbatim roadmap text, re-injected unmodified into later prompts
  pub mesocycle_roadmap_text: String,
  pub completed_mesocycles: Vec<CompletedMesocycleSummary>,
  pub routine_ids: Vec<String>,
}

impl Program {
  /// Create a fresh program positioned at mesocycle 1.
  ///
  /// An empty roadmap is replaced by a single placeholder phase.
  pub fn new(
    name: &str,
    program_duration: &str,
    total_mesocycles: u32,
    roadmap: Vec<MesocyclePhase>,
    roadmap_text: &str,
  ) -> Self {
    let mesocycle_roadmap = if roadmap.is_empty() {
      vec![MesocyclePhase::placeholder(4, 1)]
    } else {
      roadmap
    };

    Self {
      id: uuid::Uuid::new_v4().to_string(),
      name: name.to_string(),
      created_at: Utc::now(),
      program_duration: program_duration.to_string(),
      total_mesocycles: total_mesocycles.max(1),
      current_mesocycle: 1,
      mesocycle_roadmap,
      mesocycle_roadmap_text: roadmap_text.to_string(),
      completed_mesocycles: Vec::new(),
      routine_ids: Vec::new(),
    }
  }

  /// Roadmap entry for the given mesocycle, if the roadmap covers it
  pub fn phase(&self, mesocycle_number: u32) -> Option<&MesocyclePhase> {
    self
      .mesocycle_roadmap
      .iter()
      .find(|p| p.mesocycle_number == mesocycle_number)
  }

  pub fn current_phase(&self) -> Option<&MesocyclePhase> {
    self.phase(self.current_mesocycle)
  }

  pub fn latest_summary(&self) -> Option<&CompletedMesocycleSummary> {
    self.completed_mesocycles.last()
  }

  /// Check the `1 <= current <= total` invariant
  pub fn validate(&self) -> Result<(), String> {
    if self.total_mesocycles == 0 {
      return Err("total mesocycles must be at least 1".to_string());
    }
    if self.current_mesocycle == 0 || self.current_mesocycle > self.total_mesocycles {
      return Err(format!(
        "current mesocycle {} outside 1..={}",
        self.current_mesocycle, self.total_mesocycles
      ));
    }
    Ok(())
  }
}

/// Shallow partial update for a stored program.
///
/// Every `Some` field replaces the stored value wholesale, arrays included.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramUpdate {
  pub name: Option<String>,
  pub program_duration: Option<String>,
  pub total_mesocycles: Option<u32>,
  pub current_mesocycle: Option<u32>,
  pub mesocycle_roadmap: Option<Vec<MesocyclePhase>>,
  pub mesocycle_roadmap_text: Option<String>,
  pub completed_mesocycles: Option<Vec<CompletedMesocycleSummary>>,
  pub routine_ids: Option<Vec<String>>,
}

impl ProgramUpdate {
  pub fn apply_to(self, program: &mut Program) {
    if let Some(name) = self.name {
      program.name = name;
    }
    if let Some(duration) = self.program_duration {
      program.program_duration = duration;
    }
    if let Some(total) = self.total_mesocycles {
      program.total_mesocycles = total;
    }
    if let Some(current) = self.current_mesocycle {
      program.current_mesocycle = current;
    }
    if let Some(roadmap) = self.mesocycle_roadmap {
      program.mesocycle_roadmap = roadmap;
    }
    if let Some(text) = self.mesocycle_roadmap_text {
      program.mesocycle_roadmap_text = text;
    }
    if let Some(completed) = self.completed_mesocycles {
      program.completed_mesocycles = completed;
    }
    if let Some(ids) = self.routine_ids {
      program.routine_ids = ids;
    }
  }
}

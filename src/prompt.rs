//! Planning prompt assembly
//!
//! Builds the design brief for the next mesocycle. Output is pure text
//! assembly: identical inputs always produce byte-identical output, so there
//! are no timestamps and every map is rendered in sorted order.

use serde::{Deserialize, Serialize};

use crate::models::CompletedMesocycleSummary;

pub const PREVIOUS_SUMMARY_HEADING: &str = "## Previous Mesocycle Summary";

const ROTATION_INSTRUCTION: &str = include_str!("prompts/rotation_instruction.txt");

/// Where the program stands when the brief is requested
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramContext {
  pub total_mesocycles: u32,
  pub current_mesocycle: u32,
  pub mesocycle_weeks: u32,
  pub mesocycle_blocks: u32,
  #[serde(default)]
  pub mesocycle_roadmap_text: Option<String>,
  #[serde(default)]
  pub previous_mesocycle_summary: Option<CompletedMesocycleSummary>,
}

/// Assemble the brief sent to the generation service.
///
/// The questionnaire specs are always the final section, inserted verbatim.
pub fn assemble_planning_prompt(questionnaire_specs: &str, context: Option<&ProgramContext>) -> String {
  let mut sections: Vec<String> = Vec::new();

  match context {
    None => sections.push(single_phase_header()),
    Some(ctx) => {
      sections.push(program_header(ctx));

      if ctx.current_mesocycle <= 1 {
        if ctx.total_mesocycles > 1 {
          sections.push(roadmap_instruction(ctx.total_mesocycles));
        }
      } else {
        if let Some(summary) = &ctx.previous_mesocycle_summary {
          sections.push(render_previous_summary(summary));
        }
        if let Some(text) = ctx.mesocycle_roadmap_text.as_deref().filter(|t| !t.trim().is_empty()) {
          sections.push(format!("## Program Roadmap\n{}", text));
        }
        if ctx.previous_mesocycle_summary.is_some() {
          sections.push(ROTATION_INSTRUCTION.trim_end().to_string());
        }
      }
    }
  }

  sections.push(format!("## Program Specification\n{}", questionnaire_specs));
  sections.join("\n\n")
}

fn plural(count: u32, word: &str) -> String {
  if count == 1 {
    format!("{} {}", count, word)
  } else {
    format!("{} {}s", count, word)
  }
}

fn single_phase_header() -> String {
  r#"# Training Program Design Brief

Design a single training phase from the program specification below. Lay it out block by block, with every training day listing its exercises, sets, reps, primary muscles and secondary muscles."#
    .to_string()
}

fn program_header(ctx: &ProgramContext) -> String {
  format!(
    r#"# Mesocycle Design Brief

This program consists of {total} mesocycles. You are designing Mesocycle {current} of {total}.

## Mesocycle {current} Structure
Plan exactly {blocks} spanning {weeks} for this mesocycle."#,
    total = ctx.total_mesocycles,
    current = ctx.current_mesocycle,
    blocks = plural(ctx.mesocycle_blocks, "block"),
    weeks = plural(ctx.mesocycle_weeks, "week"),
  )
}

fn roadmap_instruction(total: u32) -> String {
  format!(
    r#"## Program Roadmap
Design Mesocycle 1 in full AND produce the full roadmap for the remaining mesocycles (2 through {total}). For every mesocycle in the roadmap give:
- Phase name
- Rep focus
- Emphasis
- Number of weeks
- Number of blocks

After the roadmap text, repeat it as a JSON code block shaped like:
{{"mesocycle_roadmap": [{{"mesocycleNumber": 1, "phaseName": "...", "repFocus": "...", "emphasis": "...", "weeks": 4, "blocks": 1}}]}}"#,
    total = total,
  )
}

fn render_previous_summary(summary: &CompletedMesocycleSummary) -> String {
  let mut out = format!(
    "{}\nMesocycle {}: {}\n- Split structure: {}\n- Rep range focus: {}\n\n### Weekly Volume\n",
    PREVIOUS_SUMMARY_HEADING,
    summary.mesocycle_number,
    summary.phase_name,
    summary.split_structure,
    summary.rep_range_focus,
  );

  if summary.volume_per_muscle.is_empty() {
    out.push_str("No strength volume recorded.\n");
  } else {
    out.push_str("| Muscle | Sets/Week |\n| --- | --- |\n");
    // BTreeMap iterates in muscle-name order
    for (muscle, sets) in &summary.volume_per_muscle {
      out.push_str(&format!("| {} | {} |\n", muscle, sets));
    }
  }

  out.push_str("\n### Exercises Used\n");
  if summary.exercises_used.is_empty() {
    out.push_str("- (none recorded)");
  } else {
    let lines: Vec<String> = summary
      .exercises_used
      .iter()
      .map(|e| format!("- {}", e))
      .collect();
    out.push_str(&lines.join("\n"));
  }

  out
}

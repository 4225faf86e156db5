use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;

use mesocycle_planner::commands::{mesocycle, program, routine};
use mesocycle_planner::llm::extract_roadmap;
use mesocycle_planner::{initialize_db, AppConfig, AppState};

#[derive(Parser)]
#[command(name = "mesocycle", about = "Multi-mesocycle training program tracker")]
struct Cli {
  /// SQLite database path (overrides MESOCYCLE_DB_PATH env var)
  #[arg(long, global = true)]
  db_path: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Program management
  Program {
    #[command(subcommand)]
    command: ProgramCommands,
  },
  /// Routine management
  Routine {
    #[command(subcommand)]
    command: RoutineCommands,
  },
  /// Mesocycle progression
  Mesocycle {
    #[command(subcommand)]
    command: MesocycleCommands,
  },
  /// Print the planning brief, or send it to the generation service
  Prompt {
    /// File holding the questionnaire specifications
    #[arg(long)]
    specs_file: PathBuf,
    /// Program to plan for (omit for a single-phase brief)
    #[arg(long)]
    program: Option<String>,
    /// Send the brief and print the generated plan
    #[arg(long)]
    send: bool,
  },
}

#[derive(Subcommand)]
enum ProgramCommands {
  /// Create a program
  Create {
    #[arg(long)]
    name: String,
    /// Free-form duration label, e.g. "6 months"
    #[arg(long)]
    duration: String,
    /// Planned number of mesocycles
    #[arg(long, default_value_t = 1)]
    mesocycles: u32,
    /// Roadmap text containing a `mesocycle_roadmap` JSON block
    #[arg(long)]
    roadmap_file: Option<PathBuf>,
  },
  /// List all programs
  List,
  /// Show one program
  Show { program_id: String },
  /// Delete a program (its routines are kept)
  Delete { program_id: String },
  /// Replace a program's roadmap from a text file
  Roadmap {
    program_id: String,
    #[arg(long)]
    file: PathBuf,
  },
}

#[derive(Subcommand)]
enum RoutineCommands {
  /// Import a routine JSON file into the program's active mesocycle
  Import {
    program_id: String,
    #[arg(long)]
    file: PathBuf,
    /// Routine name (defaults to the file stem)
    #[arg(long)]
    name: Option<String>,
  },
  /// List routines, optionally only those attached to a program
  List {
    #[arg(long)]
    program: Option<String>,
  },
  /// Detach a routine from a program
  Remove {
    program_id: String,
    routine_id: String,
    /// Also delete the stored routine
    #[arg(long)]
    delete: bool,
  },
}

#[derive(Subcommand)]
enum MesocycleCommands {
  /// Summarize the active mesocycle and advance the program
  Complete { program_id: String },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn read_text(path: &Path) -> anyhow::Result<String> {
  std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

async fn run_program_command(state: &AppState, command: ProgramCommands) -> anyhow::Result<()> {
  match command {
    ProgramCommands::Create {
      name,
      duration,
      mesocycles,
      roadmap_file,
    } => {
      let roadmap_text = match roadmap_file {
        Some(path) => read_text(&path)?,
        None => String::new(),
      };
      let roadmap = extract_roadmap(&roadmap_text).unwrap_or_default();
      let created =
        program::create_program(state, &name, &duration, mesocycles, roadmap, &roadmap_text)
          .await
          .map_err(|e| anyhow!(e))?;
      print_json(&created)
    }
    ProgramCommands::List => print_json(&program::list_programs(state).await.map_err(|e| anyhow!(e))?),
    ProgramCommands::Show { program_id } => {
      print_json(&program::get_program(state, &program_id).await.map_err(|e| anyhow!(e))?)
    }
    ProgramCommands::Delete { program_id } => {
      program::delete_program(state, &program_id)
        .await
        .map_err(|e| anyhow!(e))?;
      println!("Deleted program {program_id}");
      Ok(())
    }
    ProgramCommands::Roadmap { program_id, file } => {
      let text = read_text(&file)?;
      let Some(roadmap) = extract_roadmap(&text) else {
        bail!("no mesocycle_roadmap block found in {}", file.display());
      };
      let updated = program::update_roadmap(state, &program_id, &text, roadmap)
        .await
        .map_err(|e| anyhow!(e))?;
      print_json(&updated)
    }
  }
}

async fn run_routine_command(state: &AppState, command: RoutineCommands) -> anyhow::Result<()> {
  match command {
    RoutineCommands::Import {
      program_id,
      file,
      name,
    } => {
      let raw = read_text(&file)?;
      let name = name.unwrap_or_else(|| {
        file
          .file_stem()
          .map(|s| s.to_string_lossy().into_owned())
          .unwrap_or_else(|| "Imported routine".to_string())
      });
      let imported = routine::import_routine(state, &program_id, &name, &raw)
        .await
        .map_err(|e| anyhow!(e))?;
      print_json(&imported)
    }
    RoutineCommands::List { program } => {
      let routines = routine::list_routines(state, program.as_deref())
        .await
        .map_err(|e| anyhow!(e))?;
      print_json(&routines)
    }
    RoutineCommands::Remove {
      program_id,
      routine_id,
      delete,
    } => {
      routine::remove_routine(state, &program_id, &routine_id, delete)
        .await
        .map_err(|e| anyhow!(e))?;
      if delete {
        println!("Deleted routine {routine_id} and removed it from program {program_id}");
      } else {
        println!("Removed routine {routine_id} from program {program_id}");
      }
      Ok(())
    }
  }
}

async fn run_prompt(
  state: &AppState,
  config: &AppConfig,
  specs_file: &Path,
  program_id: Option<String>,
  send: bool,
) -> anyhow::Result<()> {
  let specs = read_text(specs_file)?;

  if !send {
    let prompt = mesocycle::get_planning_prompt(state, program_id.as_deref(), &specs)
      .await
      .map_err(|e| anyhow!(e))?;
    println!("{prompt}");
    return Ok(());
  }

  let Some(program_id) = program_id else {
    bail!("--send requires --program");
  };
  let plan = mesocycle::generate_mesocycle(state, config, &program_id, &specs)
    .await
    .map_err(|e| anyhow!(e))?;
  println!("{}", plan.text);
  Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let config = AppConfig::from_env()?.with_database_path(cli.db_path);
  let pool = initialize_db(&config.database_path).await?;
  let state = AppState::new(pool);

  let result = match cli.command {
    Commands::Program { command } => run_program_command(&state, command).await,
    Commands::Routine { command } => run_routine_command(&state, command).await,
    Commands::Mesocycle {
      command: MesocycleCommands::Complete { program_id },
    } => match mesocycle::complete_mesocycle(&state, &program_id).await {
      Ok(outcome) => print_json(&outcome),
      Err(e) => Err(anyhow!(e)),
    },
    Commands::Prompt {
      specs_file,
      program,
      send,
    } => run_prompt(&state, &config, &specs_file, program, send).await,
  };

  state.db.close().await;
  result
}

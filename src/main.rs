//! Gantry CLI - track construction project activities and schedules.

use clap::Parser;
use gantry::action_log;
use gantry::cli::{
    ActivityCommands, Cli, Commands, ConfigCommands, StageCommands, SystemCommands,
};
use gantry::commands::{self, ActivityUpdate, Output};
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

fn main() {
    let cli = Cli::parse();
    let human = cli.human_readable;

    // Determine project path: --project flag > GY_PROJECT env > cwd
    let project_path = resolve_project_path(cli.project_path, human);

    // Serialize command for logging
    let (cmd_name, args_json) = serialize_command(&cli.command);

    let start = Instant::now();
    let result = run_command(cli.command, &project_path, human);
    let duration = start.elapsed().as_millis() as u64;

    let (success, error) = match &result {
        Ok(_) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };

    // Log the action (silently fails if logging is disabled or errors out)
    let _ = action_log::log_action(&project_path, &cmd_name, args_json, success, error, duration);

    if let Err(e) = result {
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!(
                "{}",
                serde_json::json!({ "error": e.to_string() })
            );
        }
        process::exit(1);
    }
}

/// Resolve the project path from the explicit flag, environment variable,
/// or the current working directory.
fn resolve_project_path(explicit_path: Option<PathBuf>, human: bool) -> PathBuf {
    match explicit_path {
        Some(path) => {
            if !path.exists() {
                if human {
                    eprintln!(
                        "Error: Specified project path does not exist: {}",
                        path.display()
                    );
                } else {
                    eprintln!(
                        "{}",
                        serde_json::json!({
                            "error": format!("Specified project path does not exist: {}", path.display())
                        })
                    );
                }
                process::exit(1);
            }
            path
        }
        None => env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Derive a loggable command name and argument payload.
fn serialize_command(command: &Option<Commands>) -> (String, serde_json::Value) {
    let name = match command {
        Some(Commands::Activity { command }) => match command {
            ActivityCommands::Create { .. } => "activity create",
            ActivityCommands::List { .. } => "activity list",
            ActivityCommands::Show { .. } => "activity show",
            ActivityCommands::Update { .. } => "activity update",
            ActivityCommands::Delete { .. } => "activity delete",
        },
        Some(Commands::Stage { command }) => match command {
            StageCommands::List => "stage list",
            StageCommands::Rename { .. } => "stage rename",
        },
        Some(Commands::Move { .. }) => "move",
        Some(Commands::Tree { .. }) => "tree",
        Some(Commands::Log { .. }) => "log",
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Get { .. } => "config get",
            ConfigCommands::Set { .. } => "config set",
            ConfigCommands::List => "config list",
        },
        Some(Commands::System { command }) => match command {
            SystemCommands::Init => "system init",
            SystemCommands::Info => "system info",
            SystemCommands::Rebuild => "system rebuild",
        },
        None => "help",
    };
    let args = serde_json::json!({ "command": format!("{:?}", command) });
    (name.to_string(), args)
}

fn run_command(
    command: Option<Commands>,
    project_path: &Path,
    human: bool,
) -> Result<(), gantry::Error> {
    match command {
        Some(Commands::Activity { command }) => match command {
            ActivityCommands::Create {
                name,
                stage,
                parent,
                description,
                assignee,
                start,
                end,
                duration,
            } => {
                let result = commands::activity_create(
                    project_path,
                    name,
                    stage,
                    parent,
                    description,
                    assignee,
                    start,
                    end,
                    duration,
                )?;
                output(&result, human);
            }
            ActivityCommands::List {
                stage,
                status,
                assignee,
            } => {
                let result = commands::activity_list(project_path, stage, status, assignee)?;
                output(&result, human);
            }
            ActivityCommands::Show { id } => {
                let result = commands::activity_show(project_path, &id)?;
                output(&result, human);
            }
            ActivityCommands::Update {
                id,
                name,
                description,
                status,
                progress,
                assignee,
                health,
                progress_status,
                at_risk,
                expanded,
                start,
                end,
                duration,
            } => {
                let update = ActivityUpdate {
                    name,
                    description,
                    status,
                    progress,
                    assignee,
                    health,
                    progress_status,
                    at_risk,
                    expanded,
                    start,
                    end,
                    duration,
                };
                let result = commands::activity_update(project_path, &id, update)?;
                output(&result, human);
            }
            ActivityCommands::Delete { id } => {
                let result = commands::activity_delete(project_path, &id)?;
                output(&result, human);
            }
        },

        Some(Commands::Stage { command }) => match command {
            StageCommands::List => {
                let result = commands::stage_list(project_path)?;
                output(&result, human);
            }
            StageCommands::Rename { old, new } => {
                let result = commands::stage_rename(project_path, &old, &new)?;
                output(&result, human);
            }
        },

        Some(Commands::Move { id, stage, index }) => {
            let result = commands::move_activity(project_path, &id, stage, index)?;
            output(&result, human);
        }

        Some(Commands::Tree { stage, desc, all }) => {
            let result = commands::tree(project_path, stage, desc, all)?;
            output(&result, human);
        }

        Some(Commands::Log { id, limit }) => {
            let result = commands::log_show(project_path, id, limit)?;
            output(&result, human);
        }

        Some(Commands::Config { command }) => match command {
            ConfigCommands::Get { key } => {
                let result = commands::config_get(project_path, &key)?;
                output(&result, human);
            }
            ConfigCommands::Set { key, value } => {
                let result = commands::config_set(project_path, &key, &value)?;
                output(&result, human);
            }
            ConfigCommands::List => {
                let result = commands::config_list(project_path)?;
                output(&result, human);
            }
        },

        Some(Commands::System { command }) => match command {
            SystemCommands::Init => {
                let result = commands::system_init(project_path)?;
                output(&result, human);
            }
            SystemCommands::Info => {
                let result = commands::system_info(project_path)?;
                output(&result, human);
            }
            SystemCommands::Rebuild => {
                let result = commands::system_rebuild(project_path)?;
                output(&result, human);
            }
        },

        None => {
            // No subcommand: point at the entry points
            if human {
                println!("Run `gy system init` to start, then `gy activity create` and `gy tree`.");
                println!("Use `gy --help` for the full command list.");
            } else {
                println!(
                    "{}",
                    serde_json::json!({
                        "hint": "Run `gy system init` to start, then `gy activity create` and `gy tree`."
                    })
                );
            }
        }
    }

    Ok(())
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

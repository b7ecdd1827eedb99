//! Rule editor for autoswitch.
//!
//! Lists, adds, edits and removes tracked applications in `rules.json`. A
//! running daemon picks up each save as it lands.

use autoswitch_lib::config::{ConfigStore, Paths};
use autoswitch_lib::error::AppError;
use autoswitch_lib::models::Rule;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(version, about = "Manage autoswitch rules")]
struct Cli {
    /// Configuration directory (defaults to the per-user config dir)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show rules in scan order
    List,
    /// Track a new executable
    Add {
        /// Executable file name suffix, e.g. Celeste.exe
        executable: String,
        /// Twitch category (game) id
        category_id: String,
        /// Display name
        name: String,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        priority: i32,
        #[arg(long)]
        artwork: Option<PathBuf>,
    },
    /// Replace the rule tracking an executable
    Edit {
        /// Executable the rule currently tracks
        executable: String,
        #[arg(long)]
        new_executable: Option<String>,
        #[arg(long)]
        category_id: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        priority: Option<i32>,
        #[arg(long)]
        artwork: Option<PathBuf>,
    },
    /// Stop tracking an executable
    Remove { executable: String },
}

fn execute(cli: Cli) -> Result<String, AppError> {
    let paths = match cli.config_dir {
        Some(dir) => Paths::at(&dir),
        None => Paths::discover()?,
    };
    let path = paths.rules_file();
    let mut store = ConfigStore::load(&path);

    match cli.command {
        Command::List => Ok(render(&store)),
        Command::Add {
            executable,
            category_id,
            name,
            priority,
            artwork,
        } => {
            let mut rule = Rule::new(priority, &name, &category_id, &executable);
            rule.artwork_path = artwork.map(|p| p.to_string_lossy().into_owned());
            store.insert(rule)?;
            store.save(&path)?;
            Ok(format!("Added {name}"))
        }
        Command::Edit {
            executable,
            new_executable,
            category_id,
            name,
            priority,
            artwork,
        } => {
            let mut rule = store
                .find(&executable)
                .cloned()
                .ok_or(AppError::NotFound { entity: "Rule" })?;
            if let Some(value) = new_executable {
                rule.executable_match = value;
            }
            if let Some(value) = category_id {
                rule.category_id = value;
            }
            if let Some(value) = name {
                rule.name = value;
            }
            if let Some(value) = priority {
                rule.priority = value;
            }
            if let Some(value) = artwork {
                rule.artwork_path = Some(value.to_string_lossy().into_owned());
            }
            let label = rule.name.clone();
            store.update(&executable, rule)?;
            store.save(&path)?;
            Ok(format!("Updated {label}"))
        }
        Command::Remove { executable } => {
            let removed = store.remove(&executable)?;
            store.save(&path)?;
            Ok(format!("Removed {}", removed.name))
        }
    }
}

fn render(store: &ConfigStore) -> String {
    if store.is_empty() {
        return "No rules".to_string();
    }
    let mut out = format!("{:>8}  {:<24}  {:<12}  {}", "PRIORITY", "EXECUTABLE", "CATEGORY", "NAME");
    for rule in store.rules() {
        out.push('\n');
        out.push_str(&format!(
            "{:>8}  {:<24}  {:<12}  {}",
            rule.priority, rule.executable_match, rule.category_id, rule.name
        ));
    }
    out
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let (text, code) = match execute(cli) {
        Ok(text) => (text, ExitCode::SUCCESS),
        Err(e) if e.is_conflict() => (format!("Conflict: {e}"), ExitCode::from(2)),
        Err(e) => (format!("Error: {e}"), ExitCode::FAILURE),
    };

    // Output is the product here, so it goes to stdout rather than the log
    let mut stdout = std::io::stdout().lock();
    if writeln!(stdout, "{text}").is_err() {
        return ExitCode::FAILURE;
    }
    code
}

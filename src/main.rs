use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ruleforge::ai::DocKind;
use ruleforge::app::App;
use ruleforge::config::ConfigStore;
use ruleforge::records::{RuleRecord, WorkflowRecord};
use ruleforge::validate;
use ruleforge::{analyzer, GenerationEvent};

#[derive(Parser)]
#[command(name = "ruleforge")]
#[command(about = "Generate rule and workflow Markdown documents, optionally AI-assisted", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to the settings file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a single rule document
    Rule {
        #[arg(long)]
        title: String,
        #[arg(long)]
        category: String,
        #[arg(long, default_value = "Always On")]
        activation: String,
        #[arg(long, default_value = "")]
        glob: String,
        #[arg(long)]
        description: String,
        /// Rule item; repeat for multiple items
        #[arg(long = "item")]
        items: Vec<String>,
        /// Output directory (defaults to the configured rules path)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate a single workflow document
    Workflow {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        /// Workflow step; repeat for multiple steps
        #[arg(long = "step")]
        steps: Vec<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Summarize a project directory (languages, frameworks, file count)
    Analyze { path: PathBuf },
    /// Draft rules or workflows with the configured AI backend
    Ai {
        #[command(subcommand)]
        command: AiCommand,
    },
    /// Inspect and edit the settings document
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum AiCommand {
    Rules {
        /// Free-text description of the project
        #[arg(long)]
        idea: String,
        /// Project directory to analyze for context
        #[arg(long, default_value = ".")]
        project: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Workflows {
        #[arg(long)]
        idea: String,
        #[arg(long, default_value = ".")]
        project: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print a value by dotted key, e.g. ui_settings.theme
    Get { key: String },
    /// Set a value by dotted key; the value is parsed as JSON when possible
    Set { key: String, value: String },
    AddCategory { name: String },
    RemoveCategory { name: String },
    /// Replace the settings with the compiled-in defaults
    Reset,
    Export { path: PathBuf },
    Import { path: PathBuf },
    /// Print the settings file location
    Path,
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn resolve_out_dir(out: Option<PathBuf>, configured: &str) -> Result<PathBuf> {
    let dir = out.unwrap_or_else(|| PathBuf::from(configured));
    let check = validate::validate_directory_path(&dir.to_string_lossy());
    if !check.ok {
        anyhow::bail!(check.message);
    }
    Ok(dir)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match cli.config {
        Some(path) => ConfigStore::load(path),
        None => ConfigStore::load_default_location(),
    };
    let mut app = App::new(config);

    match cli.command {
        Command::Rule {
            title,
            category,
            activation,
            glob,
            description,
            items,
            out,
        } => {
            let glob_check = validate::validate_glob_pattern(&glob);
            if !glob_check.ok {
                anyhow::bail!(glob_check.message);
            }
            let out_dir = resolve_out_dir(out, &app.config.settings.default_paths.rules.clone())?;
            let record = RuleRecord {
                title,
                category,
                activation,
                glob,
                description,
                rules: items,
            };
            let path = app.generate_rule_file(&record, &out_dir)?;
            println!("{}", path.display());
        }
        Command::Workflow {
            title,
            description,
            steps,
            out,
        } => {
            let out_dir =
                resolve_out_dir(out, &app.config.settings.default_paths.workflows.clone())?;
            let record = WorkflowRecord {
                title,
                description,
                steps,
            };
            let path = app.generate_workflow_file(&record, &out_dir)?;
            println!("{}", path.display());
        }
        Command::Analyze { path } => {
            let info = analyzer::analyze(&path);
            println!("Files: {}", info.file_count);
            println!("Languages: {}", info.languages.join(", "));
            println!("Frameworks: {}", info.frameworks.join(", "));
        }
        Command::Ai { command } => {
            let (kind, idea, project, out) = match command {
                AiCommand::Rules {
                    idea,
                    project,
                    out,
                } => (DocKind::Rules, idea, project, out),
                AiCommand::Workflows {
                    idea,
                    project,
                    out,
                } => (DocKind::Workflows, idea, project, out),
            };

            let idea_check = validate::validate_project_idea(&idea);
            if !idea_check.ok {
                anyhow::bail!(idea_check.message);
            }
            if !app.ai.is_available() {
                anyhow::bail!(app.ai.status_message());
            }
            let configured = match kind {
                DocKind::Rules => app.config.settings.default_paths.rules.clone(),
                DocKind::Workflows => app.config.settings.default_paths.workflows.clone(),
            };
            let out_dir = resolve_out_dir(out, &configured)?;

            app.start_generation(kind, idea, project);
            while let Some(event) = app.next_generation_event().await {
                match event {
                    GenerationEvent::Progress(message) => eprintln!("{message}"),
                    GenerationEvent::Rules { records, warnings } => {
                        for warning in &warnings {
                            log::warn!("{warning}");
                        }
                        let report = app.save_all_rules(&records, &out_dir);
                        println!("{}", report.message("rules"));
                    }
                    GenerationEvent::Workflows { records, warnings } => {
                        for warning in &warnings {
                            log::warn!("{warning}");
                        }
                        let report = app.save_all_workflows(&records, &out_dir);
                        println!("{}", report.message("workflows"));
                    }
                    GenerationEvent::Finished { success, message } => {
                        eprintln!("{message}");
                        if !success {
                            std::process::exit(1);
                        }
                    }
                }
            }
        }
        Command::Config { command } => match command {
            ConfigCommand::Get { key } => {
                let value = app
                    .config
                    .get::<serde_json::Value>(&key, serde_json::Value::Null);
                println!("{value}");
            }
            ConfigCommand::Set { key, value } => {
                let value: serde_json::Value = serde_json::from_str(&value)
                    .unwrap_or(serde_json::Value::String(value));
                if !app.config.set(&key, value) {
                    anyhow::bail!("could not set '{key}'");
                }
                if !app.config.save() {
                    anyhow::bail!("could not save settings");
                }
            }
            ConfigCommand::AddCategory { name } => {
                if app.config.add_category(&name) {
                    println!("added '{name}'");
                } else {
                    println!("'{name}' already exists");
                }
            }
            ConfigCommand::RemoveCategory { name } => {
                if app.config.remove_category(&name) {
                    println!("removed '{name}'");
                } else {
                    println!("'{name}' not found");
                }
            }
            ConfigCommand::Reset => {
                app.config.reset_to_defaults();
                println!("settings reset to defaults");
            }
            ConfigCommand::Export { path } => {
                if !app.config.export_to(&path) {
                    anyhow::bail!("export failed");
                }
                println!("{}", path.display());
            }
            ConfigCommand::Import { path } => {
                if !app.config.import_from(&path) {
                    anyhow::bail!("import failed");
                }
                println!("imported {}", path.display());
            }
            ConfigCommand::Path => {
                println!("{}", app.config.path().display());
            }
        },
    }

    Ok(())
}

//! `fieldnotes` command-line front end.
//!
//! # Responsibility
//! - Map subcommands onto core note operations and the corpus rebuild.
//! - Print structured results as pretty JSON, reports as plain text.
//!
//! # Invariants
//! - The process exits non-zero when a command fails or validation finds
//!   errors.

use clap::{Args, Parser, Subcommand};
use log::error;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use fieldnotes_core::parser::normalize_date;
use fieldnotes_core::service::load_corpus;
use fieldnotes_core::{
    init_logging, validate_corpus, CreateNote, DeleteOptions, FieldnotesConfig,
    FsNoteRepository, LexicalHighlighter, MarkdownCompiler, NoteService, RebuildService,
    ValidationMode,
};

#[derive(Parser)]
#[command(
    name = "fieldnotes",
    version,
    about = "Compile and check a cross-referenced markdown note corpus"
)]
struct Cli {
    /// Config file; defaults apply when it does not exist.
    #[arg(long, value_name = "PATH", default_value = fieldnotes_core::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Overrides {
    #[arg(long, value_name = "DIR")]
    content_dir: Option<PathBuf>,
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
    #[arg(long, value_name = "PREFIX")]
    link_base: Option<String>,
    /// Enable code highlighting.
    #[arg(long)]
    highlight: bool,
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild every artifact from the content directory.
    Build,
    /// Check the corpus, or a single draft file against it.
    Validate {
        /// Print issues as JSON instead of the text report.
        #[arg(long)]
        quiet: bool,
        /// Draft note to check without saving it.
        #[arg(long, value_name = "FILE")]
        draft: Option<PathBuf>,
    },
    /// Create a note at an address.
    New {
        address: String,
        #[arg(long)]
        name: Option<String>,
        /// Publication date, e.g. 2024-03-01.
        #[arg(long)]
        date: Option<String>,
    },
    /// Print the raw text of a note.
    Show { uid: String },
    /// Replace a note's file with the contents of FILE.
    Save {
        uid: String,
        #[arg(value_name = "FILE")]
        from: PathBuf,
    },
    /// Replace a note body with a placeholder.
    Stub { uid: String },
    /// Delete a note, optionally cleaning references to it.
    Delete {
        uid: String,
        /// Drop trailing refs pointing at the note.
        #[arg(long)]
        prune_trailing: bool,
        /// Turn inline links to the note into plain text.
        #[arg(long)]
        unlink: bool,
        /// Restrict cleanup to these notes.
        #[arg(long = "only", value_name = "UID")]
        only: Vec<String>,
    },
    /// Show what references or hangs below a note.
    Impact { uid: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    start_logging(&config);

    match run(cli.command, &config) {
        Ok(code) => code,
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<FieldnotesConfig, Box<dyn std::error::Error>> {
    let mut config = FieldnotesConfig::load(&cli.config)?;
    let overrides = &cli.overrides;
    if let Some(dir) = &overrides.content_dir {
        config.content_dir = dir.clone();
    }
    if let Some(dir) = &overrides.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(base) = &overrides.link_base {
        config.link_base = base.clone();
    }
    if overrides.highlight {
        config.highlight = true;
    }
    if let Some(level) = &overrides.log_level {
        config.log_level = level.clone();
    }
    if let Some(dir) = &overrides.log_dir {
        config.log_dir = Some(dir.clone());
    }
    config.validate()?;
    Ok(config)
}

/// File logging is optional; without a log dir only stderr output remains.
fn start_logging(config: &FieldnotesConfig) {
    let Some(dir) = &config.log_dir else {
        return;
    };
    let absolute = if dir.is_absolute() {
        dir.clone()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(dir),
            Err(err) => {
                eprintln!("warning: logging disabled: {err}");
                return;
            }
        }
    };
    if let Err(err) = init_logging(&config.log_level, &absolute.to_string_lossy()) {
        eprintln!("warning: logging disabled: {err}");
    }
}

fn compiler(config: &FieldnotesConfig) -> MarkdownCompiler {
    if config.highlight {
        MarkdownCompiler::with_highlighter(Box::new(LexicalHighlighter))
    } else {
        MarkdownCompiler::new()
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(command: Command, config: &FieldnotesConfig) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let repo = FsNoteRepository::new(&config.content_dir);
    match command {
        Command::Build => {
            let service =
                RebuildService::new(repo, compiler(config), &config.link_base, &config.output_dir);
            let output = service.rebuild_all()?;
            print!("{}", output.report.render());
            print_json(&json!({
                "notes": output.index.len(),
                "compiled": output.contents.len(),
                "skipped": output.skipped,
                "output_dir": service.output_dir(),
            }))?;
            Ok(exit_for(output.report.has_errors()))
        }
        Command::Validate { quiet, draft } => {
            if let Some(path) = draft {
                let raw = fs::read_to_string(&path)?;
                let issues = NoteService::new(repo).validate(&raw)?;
                print_json(&issues)?;
                let failed = issues
                    .iter()
                    .any(|issue| issue.severity == fieldnotes_core::Severity::Error);
                return Ok(exit_for(failed));
            }
            let loaded = load_corpus(&repo)?;
            let mode = if quiet {
                ValidationMode::Silent
            } else {
                ValidationMode::Verbose
            };
            let report = validate_corpus(&loaded.corpus, mode);
            if quiet {
                print_json(&json!({ "issues": report.issues, "skipped": loaded.skipped }))?;
            } else {
                print!("{}", report.render());
                for skipped in &loaded.skipped {
                    println!("skipped {}: {}", skipped.uid, skipped.reason);
                }
            }
            Ok(exit_for(report.has_errors()))
        }
        Command::New {
            address,
            name,
            date,
        } => {
            let date = match date {
                Some(value) => Some(
                    normalize_date(&value).ok_or_else(|| format!("invalid date `{value}`"))?,
                ),
                None => None,
            };
            let uid = NoteService::new(repo).create(CreateNote {
                address,
                name,
                date,
                body: None,
            })?;
            print_json(&json!({ "uid": uid }))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Show { uid } => {
            print!("{}", NoteService::new(repo).read_raw(&uid)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Save { uid, from } => {
            let raw = fs::read_to_string(&from)?;
            let outcome = NoteService::new(repo).save(&uid, &raw)?;
            print_json(&outcome)?;
            Ok(exit_for(!outcome.persisted))
        }
        Command::Stub { uid } => {
            NoteService::new(repo).convert_to_stub(&uid)?;
            print_json(&json!({ "stubbed": uid }))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Delete {
            uid,
            prune_trailing,
            unlink,
            only,
        } => {
            let options = DeleteOptions {
                cleanup_trailing_refs: prune_trailing,
                target_uids: only,
                unlink_body_refs: unlink,
            };
            print_json(&NoteService::new(repo).delete_note(&uid, &options)?)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Impact { uid } => {
            print_json(&NoteService::new(repo).analyze_impact(&uid)?)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn exit_for(failed: bool) -> ExitCode {
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

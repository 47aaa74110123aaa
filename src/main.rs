//! # docchat CLI
//!
//! ## Usage
//!
//! ```bash
//! docchat --config ./config/docchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docchat init` | Create the SQLite database and run schema migrations |
//! | `docchat ingest <file> --project <p>` | Extract, chunk, embed, and store a document |
//! | `docchat ask "<question>" --project <p>` | Answer a question from the project's documents |
//! | `docchat history --project <p>` | Print the project's chat transcript |
//! | `docchat delete-project <p>` | Remove a project's chunks and chat turns |
//!
//! A missing config file is not an error: built-in defaults apply.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use docchat::config::{self, Config};
use docchat::logging;
use docchat::pipeline::{self, QueryContext, UploadedDocument};
use docchat_core::models::DocumentKind;

/// Ask questions about your documents.
#[derive(Parser)]
#[command(name = "docchat", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docchat.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Add a document to a project.
    Ingest {
        /// Document to upload (.txt, .pdf or .docx).
        file: PathBuf,

        /// Target project.
        #[arg(long)]
        project: String,

        /// Document type, overriding the file extension (`txt`, `pdf`, `docx`).
        #[arg(long = "type")]
        kind: Option<DocumentKind>,
    },

    /// Ask a question within a project.
    Ask {
        question: String,

        #[arg(long)]
        project: String,

        /// Number of context chunks to retrieve.
        #[arg(long)]
        k: Option<usize>,

        /// Ignore and do not extend the stored chat transcript.
        #[arg(long)]
        no_history: bool,

        /// Print the retrieved context chunks to stderr.
        #[arg(long)]
        show_context: bool,
    },

    /// Print a project's chat transcript, oldest first.
    History {
        #[arg(long)]
        project: String,
    },

    /// Delete every chunk and chat turn of a project.
    DeleteProject { project: String },
}

fn read_config(path: &Path) -> anyhow::Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        tracing::info!(path = %path.display(), "config file not found; using defaults");
        Ok(Config::default())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let cfg = read_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            pipeline::open_store(&cfg).await?;
            println!("Database initialized at {}", cfg.db.path.display());
        }
        Commands::Ingest {
            file,
            project,
            kind,
        } => {
            let doc = UploadedDocument::from_path(&file, kind)?;
            let pipeline = pipeline::build(&cfg).await?;
            let report = pipeline
                .ingest(&project, doc)
                .await
                .with_context(|| format!("Failed to ingest {}", file.display()))?;
            println!(
                "Ingested {} ({}) into '{}': {} chunks, {} characters, sha256 {}",
                report.document,
                report.kind,
                report.project,
                report.chunks,
                report.chars,
                report.sha256
            );
        }
        Commands::Ask {
            question,
            project,
            k,
            no_history,
            show_context,
        } => {
            let pipeline = pipeline::build(&cfg).await?;
            let ctx = if no_history {
                QueryContext::new(&project)
            } else {
                pipeline.load_context(&project).await?
            };
            let k = k.unwrap_or(pipeline.settings().top_k);
            let answer = pipeline.ask_with_k(&ctx, &question, k).await?;

            if show_context {
                for (i, chunk) in answer.context.iter().enumerate() {
                    eprintln!("--- context {} ---\n{}", i + 1, chunk);
                }
            }
            println!("{}", answer.text);

            if !no_history {
                pipeline.record_turn(&project, &question, &answer).await?;
            }
        }
        Commands::History { project } => {
            let pipeline = pipeline::build_store_only(&cfg).await?;
            let entries = pipeline.history(&project).await?;
            if entries.is_empty() {
                println!("No chat history for '{}'.", project);
            }
            for entry in entries {
                println!(
                    "[{}] {}: {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.role,
                    entry.content
                );
            }
        }
        Commands::DeleteProject { project } => {
            let pipeline = pipeline::build_store_only(&cfg).await?;
            pipeline.delete_project(&project).await?;
            println!("Deleted project '{}'", project);
        }
    }

    Ok(())
}

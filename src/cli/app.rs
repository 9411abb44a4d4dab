//! Main CLI application structure

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::{book, chapter};
use crate::domain::Direction;
use crate::storage::{find_book_root, BookRegistry, Config, GitCli};

#[derive(Parser)]
#[command(name = "gtbook")]
#[command(author, version, about = "Organize a book as a tree of markdown chapters")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Book root (defaults to the nearest directory containing gtbook.yaml)
    #[arg(long, short = 'b', global = true, env = "GTBOOK_ROOT")]
    pub book: Option<PathBuf>,

    /// Output format (defaults to the configured format)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new book folder
    NewBook {
        /// Directory to create the book folder in
        parent: PathBuf,

        /// Book title, also used as the folder name
        title: String,
    },

    /// Show the chapter tree
    Tree,

    /// List the books in the workspace
    Books,

    /// Add a chapter
    Add {
        /// Chapter title
        title: String,

        /// Parent chapter ID (top level if omitted)
        #[arg(long, short)]
        parent: Option<String>,
    },

    /// Rename a chapter
    Rename {
        /// Chapter ID
        id: String,

        /// New title
        title: String,
    },

    /// Delete a chapter and all of its sub-chapters
    Rm {
        /// Chapter ID
        id: String,

        /// Also delete the content files of removed chapters
        #[arg(long)]
        purge: bool,
    },

    /// Move a chapter before its previous sibling
    Up {
        /// Chapter ID
        id: String,
    },

    /// Move a chapter after its next sibling
    Down {
        /// Chapter ID
        id: String,
    },

    /// Move chapters under another chapter
    Mv {
        /// Chapter IDs to move
        #[arg(required = true)]
        ids: Vec<String>,

        /// Target chapter ID (top level if omitted)
        #[arg(long)]
        to: Option<String>,
    },

    /// Show where a chapter sits in the tree
    Path {
        /// Chapter ID
        id: String,
    },

    /// List content files that belong to no chapter
    Orphans,

    /// Show book overview and repository status
    Status,
}

/// Per-invocation state shared by all commands
pub struct Session {
    pub output: Output,
    pub config: Config,
    book: Option<PathBuf>,
}

impl Session {
    /// Resolves the book root from `--book` or the current directory
    pub fn book_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.book {
            return Ok(root.clone());
        }

        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        find_book_root(&cwd).ok_or_else(|| {
            anyhow::anyhow!("Not inside a gtbook book. Pass --book or run 'gtbook new-book' first.")
        })
    }

    /// A registry that reports git status for loaded books
    pub fn registry(&self) -> BookRegistry {
        BookRegistry::new(Some(Arc::new(GitCli::new())))
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "gtbook=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    // Ignore a second initialization; only the first subscriber wins.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load()?;
    let format = cli
        .format
        .unwrap_or_else(|| config.global.default_format.into());
    let mut session = Session {
        output: Output::new(format),
        config,
        book: cli.book,
    };

    tracing::debug!(config = ?session.config.path, "gtbook starting");

    match cli.command {
        Commands::NewBook { parent, title } => book::new_book(&mut session, &parent, &title)?,
        Commands::Tree => book::tree(&session)?,
        Commands::Books => book::books(&session)?,
        Commands::Orphans => book::orphans(&session)?,
        Commands::Status => book::status(&session)?,

        Commands::Add { title, parent } => chapter::add(&session, &title, parent.as_deref())?,
        Commands::Rename { id, title } => chapter::rename(&session, &id, &title)?,
        Commands::Rm { id, purge } => chapter::remove(&session, &id, purge)?,
        Commands::Up { id } => chapter::step(&session, &id, Direction::Up)?,
        Commands::Down { id } => chapter::step(&session, &id, Direction::Down)?,
        Commands::Mv { ids, to } => chapter::move_chapters(&session, &ids, to.as_deref())?,
        Commands::Path { id } => chapter::path(&session, &id)?,
    }

    tracing::debug!("command completed");
    Ok(())
}

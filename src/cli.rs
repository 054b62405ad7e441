use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bookforge")]
#[command(author, version, about = "Resumable LLM translation pipeline for book series")]
pub struct Cli {
    /// Series directory (defaults to the nearest parent holding bookforge.toml)
    #[arg(short, long, global = true)]
    pub series: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new series directory
    Init {
        /// Series name, also used as the directory name
        name: String,

        /// Source language (ISO 639-1)
        #[arg(long, default_value = "ja")]
        source_lang: String,

        /// Target language (ISO 639-1)
        #[arg(long, default_value = "ru")]
        target_lang: String,
    },

    /// Translate a chapter (<volume>/source/<chapter>.txt)
    Translate {
        /// Chapter source file
        #[arg(required = true)]
        chapter: PathBuf,

        /// Resume an interrupted or failed run
        #[arg(long)]
        resume: bool,

        /// Discard the chapter's saved state and start over
        #[arg(long)]
        force: bool,

        /// Write engine prompts and responses to the volume's log directory
        #[arg(long)]
        debug: bool,

        /// Add discovered terms to the glossary without review
        #[arg(long)]
        auto_approve: bool,
    },

    /// Manage the series glossary
    Glossary {
        #[command(subcommand)]
        command: GlossaryCommand,
    },

    /// Show series, glossary and chapter progress
    Status,
}

#[derive(Subcommand)]
pub enum GlossaryCommand {
    /// Export the glossary as TSV
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import terms from a TSV file
    Import {
        /// TSV file to read
        file: PathBuf,
    },

    /// List all terms
    List,
}

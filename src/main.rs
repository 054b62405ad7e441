mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "bookforge=debug,bf_pipeline=debug,bf_engine=debug,bf_db=debug,bf_core=debug".to_string()
        } else {
            "bookforge=info,bf_pipeline=info,bf_engine=warn,bf_db=warn,bf_core=warn".to_string()
        }
    });

    // Logs go to stderr so exported data on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init {
            name,
            source_lang,
            target_lang,
        } => {
            let cwd = std::env::current_dir()?;
            commands::init::run(&cwd, &name, &source_lang, &target_lang)?;
            Ok(())
        }
        Commands::Translate {
            chapter,
            resume,
            force,
            debug,
            auto_approve,
        } => {
            let (paths, config) = commands::open_series(cli.series.as_deref())?;
            let args = commands::translate::TranslateArgs {
                chapter: &chapter,
                resume,
                force,
                debug,
                auto_approve,
            };
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(commands::translate::run(&paths, &config, args))
        }
        Commands::Glossary { command } => {
            let (paths, config) = commands::open_series(cli.series.as_deref())?;
            commands::glossary::run(&paths, &config, command)
        }
        Commands::Status => {
            let (paths, config) = commands::open_series(cli.series.as_deref())?;
            commands::status::run(&paths, &config)
        }
    }
}

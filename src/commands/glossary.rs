use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};
use bf_core::config::SeriesConfig;
use bf_core::paths::SeriesPaths;
use bf_pipeline::glossary as tsv;

use crate::cli::GlossaryCommand;

use super::open_glossary;

pub fn run(paths: &SeriesPaths, config: &SeriesConfig, command: GlossaryCommand) -> Result<()> {
    let store = open_glossary(paths, config)?;

    match command {
        GlossaryCommand::Export { output } => {
            let terms = store.list()?;
            match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("failed to create {}", path.display()))?;
                    let mut out = BufWriter::new(file);
                    tsv::write_terms(&mut out, &terms)?;
                    out.flush()?;
                    eprintln!("Exported {} terms to {}", terms.len(), path.display());
                }
                None => {
                    let mut out = std::io::stdout().lock();
                    tsv::write_terms(&mut out, &terms)?;
                    out.flush()?;
                }
            }
        }
        GlossaryCommand::Import { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let terms: Vec<_> = tsv::parse(&text)
                .iter()
                .map(|row| store.term(&row.source, &row.target, &row.comment))
                .collect();
            store.upsert_all(&terms)?;
            println!("Imported {} terms", terms.len());
        }
        GlossaryCommand::List => {
            let terms = store.list()?;
            if terms.is_empty() {
                println!("Glossary is empty");
            }
            for term in &terms {
                if term.comment.is_empty() {
                    println!("{} → {}", term.term_source, term.term_target);
                } else {
                    println!("{} → {} ({})", term.term_source, term.term_target, term.comment);
                }
            }
            if !terms.is_empty() {
                println!("\n{} terms ({} → {})", terms.len(), store.source_lang(), store.target_lang());
            }
        }
    }
    Ok(())
}

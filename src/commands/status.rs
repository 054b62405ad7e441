use anyhow::Result;
use bf_core::config::SeriesConfig;
use bf_core::paths::SeriesPaths;
use bf_db::pool::{get_conn, init_pool, Schema};
use bf_db::queries::chunks;
use bf_db::ChunkStore;

use super::open_glossary;

pub fn run(paths: &SeriesPaths, config: &SeriesConfig) -> Result<()> {
    println!("Series: {}", config.series.name);
    println!(
        "  Languages: {} → {}",
        config.series.source_lang, config.series.target_lang
    );
    println!("  Model: {}", config.engine.model);
    println!("  Root: {}", paths.root().display());
    println!("  Glossary: {} terms", open_glossary(paths, config)?.count()?);

    println!("\nVolumes:");
    let volumes = paths.volumes()?;
    if volumes.is_empty() {
        println!("  (none)");
    }
    for volume in volumes {
        let sources = volume.chapters()?;
        let db = volume.chunks_db();
        if !db.is_file() {
            println!("  {}: {} chapters (not started)", volume.name(), sources.len());
            continue;
        }

        let pool = init_pool(&db, Schema::Chunks)?;
        let started = chunks::list_chapters(&*get_conn(&pool)?)?;
        println!(
            "  {}: {} chapters, {} started",
            volume.name(),
            sources.len(),
            started.len()
        );
        for chapter in started {
            let store = ChunkStore::new(pool.clone(), chapter.as_str());
            let breakdown: Vec<String> = store
                .status_counts()?
                .into_iter()
                .map(|(status, n)| format!("{status}: {n}"))
                .collect();
            let done = volume.output_file(&chapter).is_file();
            println!(
                "    {chapter}: {} chunks [{}]{}",
                store.count()?,
                breakdown.join(", "),
                if done { " (output written)" } else { "" }
            );
        }
    }
    Ok(())
}

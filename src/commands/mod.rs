pub mod glossary;
pub mod init;
pub mod status;
pub mod translate;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bf_core::config::{find_series_root, SeriesConfig};
use bf_core::paths::SeriesPaths;
use bf_db::GlossaryStore;

/// Locate the series (explicit directory or the nearest parent of the
/// working directory holding a config file) and load its config.
pub fn open_series(series: Option<&Path>) -> Result<(SeriesPaths, SeriesConfig)> {
    let root: PathBuf = match series {
        Some(dir) => dir.to_path_buf(),
        None => {
            let cwd = std::env::current_dir()?;
            find_series_root(&cwd).with_context(|| {
                format!(
                    "no {} found in {} or any parent directory",
                    bf_core::config::CONFIG_FILE_NAME,
                    cwd.display()
                )
            })?
        }
    };

    let paths = SeriesPaths::new(root);
    let config = SeriesConfig::load(&paths.config_file())
        .with_context(|| format!("invalid series config in {}", paths.root().display()))?;
    Ok((paths, config))
}

pub fn open_glossary(paths: &SeriesPaths, config: &SeriesConfig) -> Result<GlossaryStore> {
    GlossaryStore::open(
        &paths.glossary_db(),
        config.series.source_lang.as_str(),
        config.series.target_lang.as_str(),
    )
    .context("failed to open glossary database")
}

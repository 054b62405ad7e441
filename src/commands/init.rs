use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bf_core::config::SeriesConfig;
use bf_core::paths::{SeriesPaths, STYLE_GUIDE_FILE, WORLD_INFO_FILE};
use bf_db::GlossaryStore;
use bf_pipeline::{PromptKind, PromptSet};

const STYLE_GUIDE_TEMPLATE: &str = "# Style guide

- Keep honorifics (-san, -kun, -sama) as they are.
- Render onomatopoeia with natural equivalents in the target language.
- Keep dialogue punctuation consistent across chapters.
- Preserve the narrator's register; do not modernise archaic speech.
";

const WORLD_INFO_TEMPLATE: &str = "# World info

Describe the setting, factions, magic system and anything else a translator
should know before starting. This text is passed to every prompt.

## Characters

## Places

## Terms
";

const FIRST_VOLUME: &str = "volume-01";

/// Scaffold a new series directory under `parent`.
pub fn run(parent: &Path, name: &str, source_lang: &str, target_lang: &str) -> Result<PathBuf> {
    let root = parent.join(name);
    if root.exists() {
        anyhow::bail!("{} already exists", root.display());
    }
    let paths = SeriesPaths::new(&root);

    std::fs::create_dir_all(&root).with_context(|| format!("failed to create {}", root.display()))?;

    let config = SeriesConfig::new(name, source_lang, target_lang);
    std::fs::write(paths.config_file(), config.to_toml()?)?;
    std::fs::write(root.join(STYLE_GUIDE_FILE), STYLE_GUIDE_TEMPLATE)?;
    std::fs::write(root.join(WORLD_INFO_FILE), WORLD_INFO_TEMPLATE)?;

    let prompts_dir = paths.prompts_dir();
    std::fs::create_dir_all(&prompts_dir)?;
    for kind in PromptKind::ALL {
        std::fs::write(
            prompts_dir.join(format!("{}.txt", kind.name())),
            PromptSet::bundled(kind),
        )?;
    }

    GlossaryStore::open(&paths.glossary_db(), source_lang, target_lang)
        .context("failed to create glossary database")?;

    let volume = paths.volume(FIRST_VOLUME);
    std::fs::create_dir_all(volume.source_dir())?;
    std::fs::create_dir_all(volume.output_dir())?;

    tracing::info!(series = name, root = %root.display(), "Series created");
    println!("Created series '{name}' in {}", root.display());
    println!("Put chapter files in {}", volume.source_dir().display());
    Ok(root)
}

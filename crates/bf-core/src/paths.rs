//! On-disk layout of a translation series.
//!
//! ```text
//! <series>/bookforge.toml
//! <series>/glossary.db
//! <series>/prompts/<name>.txt
//! <series>/<volume>/source/<chapter>.txt
//! <series>/<volume>/output/<chapter>.txt
//! <series>/<volume>/.state/chunks.db
//! <series>/<volume>/.state/logs/
//! <series>/<volume>/.state/<chapter>/
//! ```

use std::path::{Path, PathBuf};

use crate::config::CONFIG_FILE_NAME;
use crate::error::Result;
use crate::Error;

pub const STYLE_GUIDE_FILE: &str = "style_guide.md";
pub const WORLD_INFO_FILE: &str = "world_info.md";

// ---------------------------------------------------------------------------
// SeriesPaths
// ---------------------------------------------------------------------------

/// Paths rooted at a series directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesPaths {
    root: PathBuf,
}

impl SeriesPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    pub fn glossary_db(&self) -> PathBuf {
        self.root.join("glossary.db")
    }

    pub fn prompts_dir(&self) -> PathBuf {
        self.root.join("prompts")
    }

    pub fn volume(&self, name: &str) -> VolumePaths {
        VolumePaths::new(self.root.join(name))
    }

    /// Volume directories (those with a `source/` subdirectory), sorted by
    /// name.
    pub fn volumes(&self) -> Result<Vec<VolumePaths>> {
        let mut volumes = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.is_dir() && path.join("source").is_dir() {
                volumes.push(VolumePaths::new(path));
            }
        }
        volumes.sort_by(|a, b| a.root.cmp(&b.root));
        Ok(volumes)
    }

    /// Locate a context file, preferring the volume's copy over the
    /// series-wide one.
    pub fn context_file(&self, volume: &VolumePaths, file_name: &str) -> Option<PathBuf> {
        [volume.root().join(file_name), self.root.join(file_name)]
            .into_iter()
            .find(|p| p.is_file())
    }

    /// Resolve a chapter source file to its volume and chapter name.
    ///
    /// The file must live at `<series>/<volume>/source/<chapter>.txt`.
    pub fn resolve_chapter(&self, chapter_file: &Path) -> Result<ChapterRef> {
        let file = chapter_file.canonicalize().map_err(|e| {
            Error::Validation(format!("cannot open chapter {}: {e}", chapter_file.display()))
        })?;
        let root = self.root.canonicalize()?;

        let invalid = || {
            Error::Validation(format!(
                "chapter must be at <series>/<volume>/source/<chapter>.txt, got {}",
                chapter_file.display()
            ))
        };

        if file.extension().and_then(|e| e.to_str()) != Some("txt") {
            return Err(invalid());
        }
        let source_dir = file.parent().ok_or_else(invalid)?;
        if source_dir.file_name().and_then(|n| n.to_str()) != Some("source") {
            return Err(invalid());
        }
        let volume_dir = source_dir.parent().ok_or_else(invalid)?;
        if !volume_dir.starts_with(&root) || volume_dir == root {
            return Err(invalid());
        }
        let name = file
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(invalid)?
            .to_string();

        Ok(ChapterRef {
            name,
            source_file: file.clone(),
            volume: VolumePaths::new(volume_dir),
        })
    }
}

// ---------------------------------------------------------------------------
// VolumePaths
// ---------------------------------------------------------------------------

/// Paths rooted at one volume directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumePaths {
    root: PathBuf,
}

impl VolumePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn source_dir(&self) -> PathBuf {
        self.root.join("source")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join(".state")
    }

    pub fn chunks_db(&self) -> PathBuf {
        self.state_dir().join("chunks.db")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.state_dir().join("logs")
    }

    /// Lock, checkpoints and discovery cache for one chapter.
    pub fn chapter_state_dir(&self, chapter: &str) -> PathBuf {
        self.state_dir().join(chapter)
    }

    pub fn output_file(&self, chapter: &str) -> PathBuf {
        self.output_dir().join(format!("{chapter}.txt"))
    }

    /// Chapter names (file stems of `source/*.txt`), sorted.
    pub fn chapters(&self) -> Result<Vec<String>> {
        let mut chapters = Vec::new();
        let dir = self.source_dir();
        if !dir.is_dir() {
            return Ok(chapters);
        }
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("txt") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    chapters.push(stem.to_string());
                }
            }
        }
        chapters.sort();
        Ok(chapters)
    }
}

/// A resolved chapter source file.
#[derive(Debug, Clone)]
pub struct ChapterRef {
    pub name: String,
    pub source_file: PathBuf,
    pub volume: VolumePaths,
}

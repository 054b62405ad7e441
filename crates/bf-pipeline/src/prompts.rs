//! Prompt templates, bundled defaults with per-series overrides.

use std::path::Path;

use bf_core::{Result, Stage};

/// The four prompts a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    TermDiscovery,
    Translation,
    Proofreading,
    GlobalProofreading,
}

impl PromptKind {
    pub const ALL: [PromptKind; 4] = [
        PromptKind::TermDiscovery,
        PromptKind::Translation,
        PromptKind::Proofreading,
        PromptKind::GlobalProofreading,
    ];

    /// Override file stem under `<series>/prompts/`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TermDiscovery => "term_discovery",
            Self::Translation => "translation",
            Self::Proofreading => "proofreading",
            Self::GlobalProofreading => "global_proofreading",
        }
    }

    pub fn for_stage(stage: Stage) -> Self {
        match stage {
            Stage::Discovery => Self::TermDiscovery,
            Stage::Translation => Self::Translation,
            Stage::Reading => Self::Proofreading,
        }
    }

    fn bundled(&self) -> &'static str {
        match self {
            Self::TermDiscovery => include_str!("../prompts/term_discovery.txt"),
            Self::Translation => include_str!("../prompts/translation.txt"),
            Self::Proofreading => include_str!("../prompts/proofreading.txt"),
            Self::GlobalProofreading => include_str!("../prompts/global_proofreading.txt"),
        }
    }
}

/// Resolved prompt templates for a run.
#[derive(Debug, Clone)]
pub struct PromptSet {
    term_discovery: String,
    translation: String,
    proofreading: String,
    global_proofreading: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            term_discovery: PromptKind::TermDiscovery.bundled().to_string(),
            translation: PromptKind::Translation.bundled().to_string(),
            proofreading: PromptKind::Proofreading.bundled().to_string(),
            global_proofreading: PromptKind::GlobalProofreading.bundled().to_string(),
        }
    }
}

impl PromptSet {
    /// Load templates, preferring `<prompts_dir>/<name>.txt` over the
    /// bundled default for each prompt.
    pub fn load(prompts_dir: &Path) -> Result<Self> {
        let mut set = Self::default();
        for kind in PromptKind::ALL {
            let path = prompts_dir.join(format!("{}.txt", kind.name()));
            if path.is_file() {
                tracing::info!(prompt = kind.name(), path = %path.display(), "Using prompt override");
                set.set(kind, std::fs::read_to_string(&path)?);
            }
        }
        Ok(set)
    }

    pub fn get(&self, kind: PromptKind) -> &str {
        match kind {
            PromptKind::TermDiscovery => &self.term_discovery,
            PromptKind::Translation => &self.translation,
            PromptKind::Proofreading => &self.proofreading,
            PromptKind::GlobalProofreading => &self.global_proofreading,
        }
    }

    pub fn set(&mut self, kind: PromptKind, template: impl Into<String>) {
        let slot = match kind {
            PromptKind::TermDiscovery => &mut self.term_discovery,
            PromptKind::Translation => &mut self.translation,
            PromptKind::Proofreading => &mut self.proofreading,
            PromptKind::GlobalProofreading => &mut self.global_proofreading,
        };
        *slot = template.into();
    }

    /// Bundled default text, as written out by `bookforge init`.
    pub fn bundled(kind: PromptKind) -> &'static str {
        kind.bundled()
    }
}

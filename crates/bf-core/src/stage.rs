//! Chunk stage/status state machine.
//!
//! Every chunk carries a [`ChunkStatus`]: the [`Stage`] it is in and its
//! [`Phase`] within that stage. The status is persisted as a single string
//! such as `"translation_pending"`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Per-chunk pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Discovery,
    Translation,
    Reading,
}

impl Stage {
    /// All per-chunk stages in execution order.
    pub const ALL: [Stage; 3] = [Stage::Discovery, Stage::Translation, Stage::Reading];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::Translation => "translation",
            Self::Reading => "reading",
        }
    }

    /// The stage that follows this one, if any.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Self::Discovery => Some(Self::Translation),
            Self::Translation => Some(Self::Reading),
            Self::Reading => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discovery" => Ok(Self::Discovery),
            "translation" => Ok(Self::Translation),
            "reading" => Ok(Self::Reading),
            other => Err(Error::Validation(format!("unknown stage '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Progress of a chunk within a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Pending,
    InProgress,
    Done,
    Failed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ChunkStatus
// ---------------------------------------------------------------------------

/// Combined stage and phase of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkStatus {
    pub stage: Stage,
    pub phase: Phase,
}

impl ChunkStatus {
    /// Status of a freshly split chunk.
    pub const INITIAL: ChunkStatus = ChunkStatus::new(Stage::Discovery, Phase::Pending);

    pub const fn new(stage: Stage, phase: Phase) -> Self {
        Self { stage, phase }
    }

    pub const fn pending(stage: Stage) -> Self {
        Self::new(stage, Phase::Pending)
    }

    pub const fn in_progress(stage: Stage) -> Self {
        Self::new(stage, Phase::InProgress)
    }

    pub const fn done(stage: Stage) -> Self {
        Self::new(stage, Phase::Done)
    }

    pub const fn failed(stage: Stage) -> Self {
        Self::new(stage, Phase::Failed)
    }

    /// Whether the chunk finished its stage, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, Phase::Done | Phase::Failed)
    }

    /// Status after a resume: interrupted and failed work goes back to
    /// pending in the same stage. Other statuses are unchanged.
    pub fn requeued(&self) -> Self {
        match self.phase {
            Phase::InProgress | Phase::Failed => Self::pending(self.stage),
            Phase::Pending | Phase::Done => *self,
        }
    }

    /// Status after the stage completes: `S_done` becomes `(S+1)_pending`.
    ///
    /// Returns `None` for anything that is not a done status with a
    /// following stage.
    pub fn advanced(&self) -> Option<Self> {
        if self.phase != Phase::Done {
            return None;
        }
        self.stage.next().map(Self::pending)
    }
}

impl fmt::Display for ChunkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.stage, self.phase)
    }
}

impl FromStr for ChunkStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (stage, phase) = s
            .split_once('_')
            .ok_or_else(|| Error::Validation(format!("malformed chunk status '{s}'")))?;
        let stage: Stage = stage.parse()?;
        let phase = match phase {
            "pending" => Phase::Pending,
            "in_progress" => Phase::InProgress,
            "done" => Phase::Done,
            "failed" => Phase::Failed,
            other => {
                return Err(Error::Validation(format!(
                    "unknown phase '{other}' in chunk status '{s}'"
                )))
            }
        };
        Ok(Self::new(stage, phase))
    }
}

impl Serialize for ChunkStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChunkStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

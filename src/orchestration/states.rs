use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline loop states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Constructed, loop not started
    #[default]
    Idle,
    /// Waiting on the queue for the next batch
    Fetching,
    /// Converting the fetched batch into rows
    Transforming,
    /// Writing the batch inside one transaction
    Persisting,
    /// Deleting the committed batch from the queue
    Acknowledging,
    /// Queue drained or batch limit reached
    Done,
    /// Halted on an unrecoverable error, in-flight batch left unacknowledged
    Failed,
}

impl PipelineState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Check if a batch is currently held under lease
    pub fn holds_batch(&self) -> bool {
        matches!(
            self,
            Self::Transforming | Self::Persisting | Self::Acknowledging
        )
    }

    /// Whether the loop may move from `self` to `to`
    pub fn can_transition_to(&self, to: PipelineState) -> bool {
        use PipelineState::*;

        match (self, to) {
            (Idle, Fetching) => true,
            (Fetching, Transforming | Done) => true,
            (Transforming, Persisting) => true,
            (Persisting, Acknowledging) => true,
            (Acknowledging, Fetching | Done) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Fetching => write!(f, "fetching"),
            Self::Transforming => write!(f, "transforming"),
            Self::Persisting => write!(f, "persisting"),
            Self::Acknowledging => write!(f, "acknowledging"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for PipelineState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "fetching" => Ok(Self::Fetching),
            "transforming" => Ok(Self::Transforming),
            "persisting" => Ok(Self::Persisting),
            "acknowledging" => Ok(Self::Acknowledging),
            "done" => Ok(Self::Done),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid pipeline state: {s}")),
        }
    }
}

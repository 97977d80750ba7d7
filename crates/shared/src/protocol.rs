use serde::{Deserialize, Serialize};

use crate::{
    domain::{PageNumber, ViewerState},
    error::UnavailableReason,
};

/// Lifecycle of the most recent navigation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ViewPhase {
    #[default]
    Idle,
    Loading {
        page: PageNumber,
        epoch: u64,
    },
    Loaded {
        page: PageNumber,
    },
    Unavailable {
        page: PageNumber,
        reason: UnavailableReason,
    },
    Failed {
        page: PageNumber,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerSnapshot {
    pub state: ViewerState,
    pub phase: ViewPhase,
    pub latest_epoch: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ViewerEvent {
    NavigationRequested {
        page: PageNumber,
        epoch: u64,
    },
    ChapterLoaded {
        page: PageNumber,
        total_pages: u32,
    },
    ChapterUnavailable {
        page: PageNumber,
        reason: UnavailableReason,
    },
    LoadFailed {
        page: PageNumber,
        message: String,
    },
    StaleCompletionDiscarded {
        page: PageNumber,
        epoch: u64,
        latest_epoch: u64,
    },
}

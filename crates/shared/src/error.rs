use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::PageNumber;

/// Why a requested chapter could not be displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnavailableReason {
    /// The transport answered with a non-success status.
    Status { code: u16 },
    /// The page lies outside `1..=total_pages`.
    OutOfRange { total_pages: u32 },
}

impl UnavailableReason {
    pub fn describe(&self) -> String {
        match self {
            Self::Status { code } => format!("the server answered with status {code}"),
            Self::OutOfRange { total_pages } => {
                format!("it is outside the {total_pages} available chapters")
            }
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("chapter {page} is unavailable: {}", .reason.describe())]
pub struct ContentUnavailable {
    pub page: PageNumber,
    pub reason: UnavailableReason,
}

impl ContentUnavailable {
    pub fn new(page: PageNumber, reason: UnavailableReason) -> Self {
        Self { page, reason }
    }
}

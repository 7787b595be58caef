use thiserror::Error;
use uuid::Uuid;

use crate::focus::FocusHandle;

/// Problems with emission source data. Any of these aborts initialisation.
#[derive(Debug, Error, PartialEq)]
pub enum SourceError {
    #[error("source data contains no frames")]
    NoFrames,
    #[error("frame {frame} contains no particles")]
    EmptyFrame { frame: usize },
    #[error("frame {frame} row {row}: expected 7 columns, found {found}")]
    BadRow { frame: usize, row: usize, found: usize },
    #[error("frame {frame} row {row}: non-finite value in column {column}")]
    NonFinite { frame: usize, row: usize, column: usize },
    #[error("line {line}: could not parse '{value}' as a number")]
    BadNumber { line: usize, value: String },
}

/// A component was torn down while still referenced from a shared registry.
/// Observing one of these means aggregation state can no longer be trusted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TeardownError {
    #[error("focus region {0:?} still registered but its scene anchor is gone")]
    StaleFocusRegion(FocusHandle),
    #[error("released widget {0} still registered but its scene entity is gone")]
    StaleWidget(Uuid),
    #[error("session was poisoned by an earlier teardown fault")]
    Poisoned,
    #[error("session has been disposed")]
    Disposed,
}

use sovscan_core::{ScanStatus, StoreError};
use thiserror::Error;

/// Errors surfaced by the orchestration engine.
///
/// Provider failures never appear here: they are contained per iteration
/// (recorded rows) or turned into pause/fail decisions on the scan itself.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An entry point was invoked against a scan in the wrong lifecycle
    /// state (e.g. `resume` on a running scan).
    #[error("scan {id} is in status '{status}', expected '{expected}'")]
    InvalidState {
        id: i64,
        status: ScanStatus,
        expected: &'static str,
    },
}

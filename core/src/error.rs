//! Error taxonomy shared by every streamgrid operation.
//!
//! All variants are terminal for the current invocation. Nothing in the core
//! retries; the caller decides whether to run the operation again.

use std::path::PathBuf;

use thiserror::Error;


#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("maximum number of streams supported is 6, but {0} streams specified")]
    UnsupportedCardinality(usize),

    #[error("session registry unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("display probe unavailable: {0}")]
    ProbeUnavailable(String),

    #[error("no active display mode found; cannot determine display resolution")]
    ResolutionUnknown,

    #[error("launching session '{session}' failed with exit code {exit_code}")]
    LaunchFailed { session: String, exit_code: i32 },

    #[error("terminating session '{session}' failed with exit code {exit_code}")]
    TerminateFailed { session: String, exit_code: i32 },

    #[error("'{}' executable not found", path.display())]
    MissingExecutable { path: PathBuf },

    #[error("failed to read configuration file '{}': {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}


pub type Result<T> = std::result::Result<T, ReconcileError>;

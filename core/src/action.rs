//! Action — one line of the execution log.

use std::fmt;

use crate::infrastructure::process::CommandSpec;
use crate::types::geometry::{Anchor, GridDims, Resolution};


#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Grid {
        dims: GridDims,
        resolution: Resolution,
    },
    AlreadyRunning {
        session: String,
    },
    AlreadyStopped {
        session: String,
    },
    Launch {
        session: String,
        stream: String,
        command: CommandSpec,
        dry_run: bool,
    },
    Terminate {
        session: String,
        dry_run: bool,
    },
    Settle {
        delay_ms: u64,
    },
    SurfacePresent {
        session: String,
        anchor: Anchor,
    },
    SurfaceMissing {
        session: String,
        anchor: Anchor,
    },
    /// A repaired session still showed as running after its stop, so it was
    /// not relaunched.
    NotRelaunched {
        session: String,
    },
    NoActionRequired,
}


impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Grid { dims, resolution } => write!(
                f,
                "Grid dimensions: {} x {} on {} display",
                dims.cols, dims.rows, resolution
            ),
            Action::AlreadyRunning { session } => {
                write!(f, "Screen session '{}' already exists; skipping.", session)
            }
            Action::AlreadyStopped { session } => {
                write!(f, "Screen session '{}' already stopped; skipping.", session)
            }
            Action::Launch {
                session,
                stream,
                command,
                dry_run,
            } => write!(
                f,
                "{}start '{}' as '{}': {}",
                dry_prefix(*dry_run),
                stream,
                session,
                command
            ),
            Action::Terminate { session, dry_run } => {
                write!(f, "{}stop session '{}'", dry_prefix(*dry_run), session)
            }
            Action::Settle { delay_ms } => {
                write!(f, "Waiting {} ms for display to settle", delay_ms)
            }
            Action::SurfacePresent { session, anchor } => {
                write!(f, "Stream '{}' is displayed at {}", session, anchor)
            }
            Action::SurfaceMissing { session, anchor } => {
                write!(f, "Stream '{}' missing from display at {}", session, anchor)
            }
            Action::NotRelaunched { session } => write!(
                f,
                "Screen session '{}' still registered after stop; not relaunched.",
                session
            ),
            Action::NoActionRequired => write!(f, "All streams displayed; no action required."),
        }
    }
}


fn dry_prefix(dry_run: bool) -> &'static str {
    if dry_run {
        "[dry run] "
    } else {
        ""
    }
}

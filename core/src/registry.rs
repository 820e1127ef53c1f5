//! Session registry — named background sessions, one per stream index.
//!
//! Nothing is cached: every `exists` call asks the session manager again,
//! since sessions can exit or be killed outside this program.

use std::io;

use tracing::debug;

use crate::error::{ReconcileError, Result};
use crate::infrastructure::process::{exit_code, CommandSpec};
use crate::infrastructure::screen::{parse_list_sessions, ScreenCommandBuilder};
use crate::types::config::Settings;


pub trait SessionRegistry {
    /// Whether a session called `name` is running. An unavailable session
    /// manager is an error, a missing session is `Ok(false)`.
    fn exists(&self, name: &str) -> Result<bool>;

    /// Launch `command` detached under `name`.
    fn create(&mut self, name: &str, command: &CommandSpec) -> Result<()>;

    /// Ask the session `name` to quit. Callers check `exists` first.
    fn terminate(&mut self, name: &str) -> Result<()>;
}


/// GNU screen backed registry.
#[derive(Debug, Clone)]
pub struct ScreenRegistry {
    builder: ScreenCommandBuilder,
}


impl ScreenRegistry {
    pub fn new(settings: &Settings) -> Self {
        ScreenRegistry {
            builder: ScreenCommandBuilder::new(&settings.screen_bin),
        }
    }

    /// All live session names.
    pub fn list(&self) -> Result<Vec<String>> {
        let spec = self.builder.list();
        // screen -list exits nonzero when there are no sessions, so only the
        // spawn itself can fail here.
        let output = spec.output().map_err(|e| unavailable(&spec, e))?;
        let raw = String::from_utf8_lossy(&output.stdout);
        Ok(parse_list_sessions(&raw))
    }
}


impl SessionRegistry for ScreenRegistry {
    fn exists(&self, name: &str) -> Result<bool> {
        let found = self.list()?.iter().any(|n| n == name);
        debug!(session = name, found, "session lookup");
        Ok(found)
    }

    fn create(&mut self, name: &str, command: &CommandSpec) -> Result<()> {
        let spec = self.builder.create(name, command);
        let status = spec.status().map_err(|e| unavailable(&spec, e))?;
        if !status.success() {
            return Err(ReconcileError::LaunchFailed {
                session: name.to_string(),
                exit_code: exit_code(&status),
            });
        }
        Ok(())
    }

    fn terminate(&mut self, name: &str) -> Result<()> {
        let spec = self.builder.quit(name);
        let status = spec.status().map_err(|e| unavailable(&spec, e))?;
        if !status.success() {
            return Err(ReconcileError::TerminateFailed {
                session: name.to_string(),
                exit_code: exit_code(&status),
            });
        }
        Ok(())
    }
}


fn unavailable(spec: &CommandSpec, err: io::Error) -> ReconcileError {
    ReconcileError::RegistryUnavailable(format!(
        "failed to run '{}': {}",
        spec.program.display(),
        err
    ))
}

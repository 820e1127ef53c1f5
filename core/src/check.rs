//! Executable presence checks, run before any operation touches the system.

use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::command::Operation;
use crate::error::{ReconcileError, Result};
use crate::types::config::Settings;


/// Binaries `op` will invoke under `settings`.
pub fn required_executables(settings: &Settings, op: Operation) -> Vec<PathBuf> {
    let mut bins = vec![settings.screen_bin.clone()];
    if op.needs_layout() {
        bins.push(settings.player_bin.clone());
        if settings.resolution.is_none() {
            bins.push(settings.tvservice_bin.clone());
        }
    }
    if op == Operation::Repair {
        bins.push(settings.vcgencmd_bin.clone());
    }
    bins
}


/// Fail with the first path that is not an executable file.
pub fn require_executables<I, P>(paths: I) -> Result<()>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    for path in paths {
        let path = path.as_ref();
        let found = resolve_executable(path);
        debug!(path = %path.display(), found = ?found, "executable check");
        if found.is_none() {
            return Err(ReconcileError::MissingExecutable {
                path: path.to_path_buf(),
            });
        }
    }
    Ok(())
}


/// Full path of `name`: itself when it contains a separator, otherwise the
/// first match on `PATH`.
pub fn resolve_executable(name: &Path) -> Option<PathBuf> {
    if name.components().count() > 1 {
        return is_executable(name).then(|| name.to_path_buf());
    }
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}


#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

//! Display surface probe — what the compositor is actually showing.

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::{ReconcileError, Result};
use crate::infrastructure::dispmanx::{parse_layer_anchors, parse_resolution, DispmanxCommands};
use crate::infrastructure::process::{exit_code, CommandSpec};
use crate::types::config::Settings;
use crate::types::geometry::{Anchor, Resolution};


pub trait DisplaySurfaceProbe {
    /// Top-left anchors of every active, known-format layer.
    fn list_active_surface_anchors(&self) -> Result<BTreeSet<Anchor>>;

    /// Resolution of the currently negotiated output mode.
    fn current_display_resolution(&self) -> Result<Resolution>;
}


/// Probe backed by the Raspberry Pi firmware tools.
#[derive(Debug, Clone)]
pub struct DispmanxProbe {
    commands: DispmanxCommands,
}


impl DispmanxProbe {
    pub fn new(settings: &Settings) -> Self {
        DispmanxProbe {
            commands: DispmanxCommands::new(&settings.vcgencmd_bin, &settings.tvservice_bin),
        }
    }
}


impl DisplaySurfaceProbe for DispmanxProbe {
    fn list_active_surface_anchors(&self) -> Result<BTreeSet<Anchor>> {
        let raw = run_query(&self.commands.list_layers())?;
        let anchors = parse_layer_anchors(&raw).map_err(ReconcileError::ProbeUnavailable)?;
        debug!(count = anchors.len(), "active display layers");
        Ok(anchors)
    }

    fn current_display_resolution(&self) -> Result<Resolution> {
        let raw = run_query(&self.commands.display_state())?;
        let res = parse_resolution(&raw).ok_or(ReconcileError::ResolutionUnknown)?;
        debug!(resolution = %res, "display mode");
        Ok(res)
    }
}


fn run_query(spec: &CommandSpec) -> Result<String> {
    let output = spec.output().map_err(|e| {
        ReconcileError::ProbeUnavailable(format!("failed to run '{}': {}", spec, e))
    })?;
    if !output.status.success() {
        return Err(ReconcileError::ProbeUnavailable(format!(
            "'{}' exited with code {}",
            spec,
            exit_code(&output.status)
        )));
    }
    String::from_utf8(output.stdout).map_err(|e| {
        ReconcileError::ProbeUnavailable(format!("invalid UTF-8 from '{}': {}", spec, e))
    })
}

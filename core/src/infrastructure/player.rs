//! omxplayer invocation for one stream tile.

use std::path::PathBuf;

use crate::infrastructure::process::CommandSpec;
use crate::types::config::Settings;
use crate::types::geometry::BoundingBox;
use crate::types::stream::Stream;


#[derive(Debug, Clone)]
pub struct PlayerCommandBuilder {
    bin: PathBuf,
    fps: u32,
}


impl PlayerCommandBuilder {
    pub fn new(bin: impl Into<PathBuf>, fps: u32) -> Self {
        PlayerCommandBuilder {
            bin: bin.into(),
            fps,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.player_bin, settings.fps)
    }

    /// Live, muted playback of `stream` inside `bbox`. The URI is passed
    /// through unchanged as the final argument.
    pub fn build(&self, stream: &Stream, bbox: &BoundingBox) -> CommandSpec {
        CommandSpec::new(&self.bin)
            .args(["--avdict".to_string(), format!("rtsp_transport:{}", stream.transport)])
            .arg("--live")
            .args(["-n", "-1"])
            .args(["--win".to_string(), bbox.to_string()])
            .args(["--fps".to_string(), self.fps.to_string()])
            .arg(stream.uri.clone())
    }
}

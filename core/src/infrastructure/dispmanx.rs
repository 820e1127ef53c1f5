//! Raspberry Pi display queries — `vcgencmd dispmanx_list` and `tvservice -s`.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::infrastructure::process::CommandSpec;
use crate::types::geometry::{Anchor, Resolution};


/// Layer formats the firmware reports for placeholder layers.
const IGNORED_FORMATS: [&str; 2] = ["UNKNOWN", "INVALID"];


#[derive(Debug, Clone)]
pub struct DispmanxCommands {
    vcgencmd_bin: PathBuf,
    tvservice_bin: PathBuf,
}


impl DispmanxCommands {
    pub fn new(vcgencmd_bin: impl Into<PathBuf>, tvservice_bin: impl Into<PathBuf>) -> Self {
        DispmanxCommands {
            vcgencmd_bin: vcgencmd_bin.into(),
            tvservice_bin: tvservice_bin.into(),
        }
    }

    /// `vcgencmd dispmanx_list`
    pub fn list_layers(&self) -> CommandSpec {
        CommandSpec::new(&self.vcgencmd_bin).arg("dispmanx_list")
    }

    /// `tvservice -s`
    pub fn display_state(&self) -> CommandSpec {
        CommandSpec::new(&self.tvservice_bin).arg("-s")
    }
}


/// Collect the `dst:` anchors of every active layer.
///
/// A layer line is any line with both `format:` and `dst:` fields, e.g.
///
/// ```text
/// display:2 format:YUV_UV transform:0 layer:0 src:0,0,1920,1080 dst:960,0,960,540 cost:1034 lbm:0
/// ```
///
/// Layers whose format is `UNKNOWN` or `INVALID` are skipped. A `dst:` field
/// that is not four unsigned integers makes the whole listing unparsable.
pub fn parse_layer_anchors(raw: &str) -> Result<BTreeSet<Anchor>, String> {
    let mut anchors = BTreeSet::new();
    for line in raw.lines() {
        let mut format = None;
        let mut dst = None;
        for field in line.split_whitespace() {
            if let Some(v) = field.strip_prefix("format:") {
                format = Some(v);
            } else if let Some(v) = field.strip_prefix("dst:") {
                dst = Some(v);
            }
        }
        let (Some(format), Some(dst)) = (format, dst) else {
            continue;
        };
        if IGNORED_FORMATS
            .iter()
            .any(|f| format.eq_ignore_ascii_case(f))
        {
            continue;
        }
        anchors.insert(parse_dst(dst).map_err(|e| format!("{} in line '{}'", e, line.trim()))?);
    }
    Ok(anchors)
}


fn parse_dst(dst: &str) -> Result<Anchor, String> {
    let parts: Vec<&str> = dst.split(',').collect();
    if parts.len() != 4 {
        return Err(format!("malformed dst '{}'", dst));
    }
    let nums = parts
        .iter()
        .map(|p| p.parse::<u32>())
        .collect::<Result<Vec<u32>, _>>()
        .map_err(|_| format!("non-numeric dst '{}'", dst))?;
    Ok(Anchor {
        x: nums[0],
        y: nums[1],
    })
}


/// Find the active mode in `tvservice -s` output, e.g.
/// `state 0x12000a [HDMI CEA (16) RGB lim 16:9], 1920x1080 @ 60.00Hz, progressive`.
pub fn parse_resolution(raw: &str) -> Option<Resolution> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    tokens.windows(2).find_map(|pair| {
        if !pair[1].starts_with('@') {
            return None;
        }
        let (w, h) = pair[0].trim_end_matches(',').split_once('x')?;
        let width = w.parse::<u32>().ok()?;
        let height = h.parse::<u32>().ok()?;
        (width > 0 && height > 0).then_some(Resolution { width, height })
    })
}

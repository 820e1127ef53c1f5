//! Layout management — grid planning and drift detection.
//!
//! The `grid` module maps a stream count and display resolution to a fixed
//! tiling and a window rectangle per stream index. The `drift` module compares
//! the anchors that tiling expects against the anchors the display reports,
//! naming the streams whose surfaces have gone missing.

pub mod drift;
pub mod grid;

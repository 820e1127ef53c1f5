//! Drift detection — which streams are not on screen.
//!
//! Only top-left anchors are compared. A surface that kept its anchor but
//! changed size (for example after the HDMI mode changed) still counts as
//! present.

use std::collections::BTreeSet;

use crate::layout::grid::GridPlan;
use crate::types::geometry::Anchor;


/// Expected vs. observed placement of one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceCheck {
    pub index: usize,
    pub expected: Anchor,
    pub present: bool,
}


/// Check every planned stream against the observed anchor set.
pub fn check_surfaces(plan: &GridPlan, observed: &BTreeSet<Anchor>) -> Vec<SurfaceCheck> {
    plan.anchors()
        .into_iter()
        .enumerate()
        .map(|(index, expected)| SurfaceCheck {
            index,
            expected,
            present: observed.contains(&expected),
        })
        .collect()
}

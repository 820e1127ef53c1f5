//! Grid planner — fixed tilings for one to six streams.
//!
//! The grid is a lookup, not a formula:
//!
//! | streams | cols x rows |
//! |---------|-------------|
//! | 1       | 1 x 1       |
//! | 2-4     | 2 x 2       |
//! | 5-6     | 3 x 2       |
//!
//! Tiles are `floor(width / cols)` by `floor(height / rows)` pixels. When the
//! resolution does not divide evenly the right and bottom edges are left
//! uncovered.

use crate::error::{ReconcileError, Result};
use crate::types::geometry::{Anchor, BoundingBox, GridDims, Resolution};


/// Largest number of streams the planner can tile.
pub const MAX_STREAMS: usize = 6;


/// Choose grid dimensions for `stream_count` streams.
pub fn compute_grid(stream_count: usize) -> Result<GridDims> {
    let (cols, rows) = match stream_count {
        1 => (1, 1),
        2..=4 => (2, 2),
        5..=6 => (3, 2),
        n => return Err(ReconcileError::UnsupportedCardinality(n)),
    };
    Ok(GridDims { cols, rows })
}


/// Pixel rectangle of the tile at `(col, row)`.
pub fn compute_bounding_box(dims: GridDims, res: Resolution, col: u32, row: u32) -> BoundingBox {
    let tile_w = res.width / dims.cols;
    let tile_h = res.height / dims.rows;
    let left = col * tile_w;
    let top = row * tile_h;
    BoundingBox {
        left,
        top,
        right: left + tile_w,
        bottom: top + tile_h,
    }
}


/// Grid cell of a stream index, filled row by row.
pub fn cell_of(dims: GridDims, index: usize) -> (u32, u32) {
    let index = index as u32;
    (index % dims.cols, index / dims.cols)
}


/// The layout for one invocation: grid dimensions plus one box per stream.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPlan {
    pub dims: GridDims,
    pub resolution: Resolution,
    boxes: Vec<BoundingBox>,
}


impl GridPlan {
    /// Lay out `stream_count` streams on `dims`, which must come from
    /// `compute_grid(stream_count)`.
    pub fn new(dims: GridDims, stream_count: usize, resolution: Resolution) -> GridPlan {
        let boxes = (0..stream_count)
            .map(|idx| {
                let (col, row) = cell_of(dims, idx);
                compute_bounding_box(dims, resolution, col, row)
            })
            .collect();
        GridPlan {
            dims,
            resolution,
            boxes,
        }
    }

    pub fn boxes(&self) -> &[BoundingBox] {
        &self.boxes
    }

    /// Expected top-left anchor for each stream index, in index order.
    pub fn anchors(&self) -> Vec<Anchor> {
        self.boxes.iter().map(|b| b.anchor()).collect()
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

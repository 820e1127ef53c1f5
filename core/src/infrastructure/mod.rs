//! Adapters for the external tools streamgrid drives.
//!
//! Each submodule owns the argument shapes and output parsing for one tool so
//! that the registry and probe implementations only deal with process I/O.

pub mod dispmanx;
pub mod player;
pub mod process;
pub mod screen;

//! streamgrid core — keeps a grid of RTSP stream players on screen.
//!
//! Each configured stream runs as a detached screen session named
//! `<prefix><index>` and plays in a fixed tile of the display. The
//! [`sys::Reconciler`] drives four operations over that set:
//!
//! - `start` launches streams without a session,
//! - `stop` quits running sessions,
//! - `restart` stops, waits for the display to settle, then starts,
//! - `repair` asks the display which layers are actually showing and
//!   relaunches the streams whose tile is empty.
//!
//! Sessions and display layers live outside the process. They are reached
//! through the [`registry::SessionRegistry`] and [`probe::DisplaySurfaceProbe`]
//! traits, with GNU screen and Raspberry Pi firmware implementations.

pub mod action;
pub mod check;
pub mod command;
pub mod error;
pub mod infrastructure;
pub mod layout;
pub mod probe;
pub mod registry;
pub mod sys;
pub mod types;

pub use action::Action;
pub use command::Operation;
pub use error::{ReconcileError, Result};
pub use probe::{DisplaySurfaceProbe, DispmanxProbe};
pub use registry::{ScreenRegistry, SessionRegistry};
pub use sys::Reconciler;

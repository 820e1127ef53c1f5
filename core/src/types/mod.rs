//! Plain data types shared across the core.

pub mod config;
pub mod geometry;
pub mod stream;

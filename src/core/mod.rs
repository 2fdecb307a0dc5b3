//! Core layer - compression filter and frame timing.
//!
//! This module provides:
//! - [`deflate`] / [`inflate`] - zlib chunk filter
//! - [`FrameRate`] - uniform frame/time conversion

mod compression;
mod frame_rate;

pub use compression::{deflate, inflate};
pub use frame_rate::{Chrono, FrameRate, FPS};

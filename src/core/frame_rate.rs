//! Uniform frame sampling.
//!
//! Motion tables store one row per frame. Frame `i` is sampled at
//! `i / fps`; there is no start offset.

/// Time value in seconds.
pub type Chrono = f64;

/// Fixed sample rate of motion tables.
pub const FPS: Chrono = 30.0;

/// Uniform frame rate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameRate {
    fps: Chrono,
}

impl FrameRate {
    /// Create a frame rate of `fps` samples per second.
    pub const fn new(fps: Chrono) -> Self {
        Self { fps }
    }

    /// Samples per second.
    #[inline]
    pub const fn fps(&self) -> Chrono {
        self.fps
    }

    /// Seconds per sample.
    #[inline]
    pub fn time_per_frame(&self) -> Chrono {
        1.0 / self.fps
    }

    /// Time of frame `index`. Negative indices are not rejected.
    #[inline]
    pub fn frame_time(&self, index: i32) -> Chrono {
        index as Chrono / self.fps
    }

    /// Frame containing `time`, truncated toward zero.
    ///
    /// Out-of-range inputs saturate at `i32::MIN`/`i32::MAX`, NaN maps to 0.
    #[inline]
    pub fn frame_index(&self, time: Chrono) -> i32 {
        (time * self.fps) as i32
    }

    /// Length in seconds of `frames` samples.
    #[inline]
    pub fn duration(&self, frames: usize) -> Chrono {
        frames as Chrono / self.fps
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::new(FPS)
    }
}

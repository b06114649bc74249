//! Frame timing and delta time.
//!
//! The [`Time`] resource is advanced by the engine at the start of each tick
//! with the frame's delta. Systems get the same delta as their `dt` argument;
//! the resource adds elapsed time and a frame counter for things like the
//! frusta fitting animation.

use std::time::Duration;

/// Frame timing resource. Inserted by the engine and advanced each tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct Time {
    /// Duration of the current frame.
    delta: Duration,
    /// Total time since the engine started.
    elapsed: Duration,
    /// Frame counter.
    frame_count: u64,
}

impl Time {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward by one frame of length `delta`.
    pub(crate) fn advance(&mut self, delta: Duration) {
        self.delta = delta;
        self.elapsed += delta;
        self.frame_count += 1;
    }

    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Delta time in seconds (f32), the most common way to use it.
    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Number of frames run so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Estimated FPS based on the last frame's delta.
    pub fn fps(&self) -> f32 {
        if self.delta.as_secs_f32() > 0.0 {
            1.0 / self.delta.as_secs_f32()
        } else {
            0.0
        }
    }
}

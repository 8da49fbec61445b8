//! Frame clock.
use std::{thread, time::Instant};

use chip8::constants::CLOCK_CYCLE_TIME;

/// Paces the host loop to the 60 Hz timer frequency of the VM.
///
/// Time spent outside of [`Clock::wait`] counts towards the current frame.
pub struct Clock(Instant);

impl Clock {
    pub fn new() -> Self {
        Self(Instant::now())
    }

    pub fn reset(&mut self) {
        self.0 = Instant::now()
    }

    /// Block the current thread until the next frame is due.
    pub fn wait(&mut self) {
        while self.0.elapsed().as_nanos() < u128::from(CLOCK_CYCLE_TIME) {
            // Sleep resolution is too coarse for 16ms frames.
            thread::yield_now();
        }

        // Don't try to catch up after a stall.
        self.reset();
    }
}

//! Delay and sound timers.

/// The two countdown registers.
///
/// Both count down towards zero at 60 Hz and stop there.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Timers {
    /// (DT) Delay timer, readable by programs.
    pub delay: u8,
    /// (ST) Sound timer. The buzzer beeps once when it runs out.
    pub sound: u8,
}

impl Timers {
    /// Count both timers down by one.
    ///
    /// Returns `true` when the sound timer ran out on this tick, which
    /// happens exactly once per countdown, when it goes from 1 to 0.
    #[inline]
    pub fn tick(&mut self) -> bool {
        self.delay = self.delay.saturating_sub(1);

        let beep = self.sound == 1;
        self.sound = self.sound.saturating_sub(1);
        beep
    }
}

/// Divides the step rate down to the timer rate.
///
/// The timers tick once every `ratio` steps. A ratio of 1 ties the timers
/// to the instruction rate one-to-one.
#[derive(Debug, Clone)]
pub(crate) struct TimerDivider {
    ratio: u32,
    counter: u32,
}

impl TimerDivider {
    pub(crate) fn new(ratio: u32) -> Self {
        Self {
            ratio: ratio.max(1),
            counter: 0,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.counter = 0;
    }

    /// Count one step, returns `true` when the timers are due for a tick.
    #[inline]
    pub(crate) fn step(&mut self) -> bool {
        self.counter += 1;
        if self.counter >= self.ratio {
            self.counter = 0;
            true
        } else {
            false
        }
    }
}

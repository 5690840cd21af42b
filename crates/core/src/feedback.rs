//! Wrong-answer shake, as a pure function of elapsed time.
//!
//! The shake value rises from 0 to `SHAKE_PEAK` with a bounce curve, then
//! eases back to 0. The card's horizontal offset interpolates that value over
//! `[0, 1, 2, 3] -> [0, -15, 15, 0]`, so the card swings left, right, and
//! back to rest. The timeline has a fixed length, which lets the session
//! schedule the advance right after it instead of racing it.

use std::time::Duration;

use crate::easing;

pub const SHAKE_PEAK: f32 = 3.0;
pub const SHAKE_RISE: Duration = Duration::from_millis(400);
pub const SHAKE_FALL: Duration = Duration::from_millis(300);

const OFFSET_STOPS: [f32; 4] = [0.0, -15.0, 15.0, 0.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShakeTimeline {
    rise: Duration,
    fall: Duration,
}

impl Default for ShakeTimeline {
    fn default() -> Self {
        Self {
            rise: SHAKE_RISE,
            fall: SHAKE_FALL,
        }
    }
}

impl ShakeTimeline {
    #[must_use]
    pub fn new(rise: Duration, fall: Duration) -> Self {
        Self { rise, fall }
    }

    /// Total length of the sequence.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.rise + self.fall
    }

    #[must_use]
    pub fn is_complete_at(&self, elapsed: Duration) -> bool {
        elapsed >= self.duration()
    }

    /// Shake value in `[0, SHAKE_PEAK]` at `elapsed`.
    #[must_use]
    pub fn value_at(&self, elapsed: Duration) -> f32 {
        if elapsed < self.rise {
            let t = fraction(elapsed, self.rise);
            SHAKE_PEAK * easing::bounce(t)
        } else if elapsed < self.duration() {
            let t = fraction(elapsed - self.rise, self.fall);
            SHAKE_PEAK * (1.0 - easing::in_out_quad(t))
        } else {
            0.0
        }
    }

    /// Horizontal card offset at `elapsed`.
    #[must_use]
    pub fn offset_at(&self, elapsed: Duration) -> f32 {
        offset_for_value(self.value_at(elapsed))
    }
}

fn fraction(elapsed: Duration, total: Duration) -> f32 {
    if total.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f32() / total.as_secs_f32()).clamp(0.0, 1.0)
}

fn offset_for_value(value: f32) -> f32 {
    let value = value.clamp(0.0, SHAKE_PEAK);
    // Stops are one unit apart, so the integer part picks the segment.
    let segment = (value.floor() as usize).min(OFFSET_STOPS.len() - 2);
    let local = value - segment as f32;
    let from = OFFSET_STOPS[segment];
    let to = OFFSET_STOPS[segment + 1];
    from + (to - from) * local
}

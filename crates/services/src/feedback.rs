use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};

use quiz_core::feedback::ShakeTimeline;

use crate::platform::Haptics;

/// Frame spacing for published shake offsets (~60 fps).
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Plays the wrong-answer shake alongside one haptic pulse.
///
/// `play` always runs the full timeline and returns once, when the card is
/// back at rest.
#[derive(Clone)]
pub struct FeedbackAnimator {
    haptics: Arc<dyn Haptics>,
    timeline: ShakeTimeline,
    frame: Duration,
}

impl FeedbackAnimator {
    #[must_use]
    pub fn new(haptics: Arc<dyn Haptics>) -> Self {
        Self {
            haptics,
            timeline: ShakeTimeline::default(),
            frame: FRAME_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_timeline(mut self, timeline: ShakeTimeline) -> Self {
        self.timeline = timeline;
        self
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.timeline.duration()
    }

    /// Pulse once, then publish card offsets into `offsets` until the
    /// timeline ends. The last published offset is always 0.
    pub async fn play(&self, offsets: &watch::Sender<f32>) {
        self.haptics.notify_error();

        let start = Instant::now();
        let end = start + self.timeline.duration();
        loop {
            let now = Instant::now();
            if now >= end {
                break;
            }
            offsets.send_replace(self.timeline.offset_at(now - start));
            sleep_until((now + self.frame).min(end)).await;
        }
        offsets.send_replace(0.0);
    }
}

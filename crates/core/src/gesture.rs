//! Horizontal drag tracking for the question card.
//!
//! A drag lifecycle is press, any number of updates, release. Release emits
//! `Intent::Swipe` at most once, and only when the card was dragged further
//! left than the skip threshold. In every case the card then springs back to
//! rest.

use std::time::Duration;

use crate::easing;
use crate::session::Intent;

/// Drag offset past which a release skips the question.
pub const CARD_SKIP_AREA: f32 = -200.0;
/// Offset units per degree of card rotation.
pub const CARD_INCLINATION: f32 = 10.0;
pub const SPRING_BACK: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureConfig {
    pub skip_threshold: f32,
    pub inclination: f32,
    pub spring_back: Duration,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            skip_threshold: CARD_SKIP_AREA,
            inclination: CARD_INCLINATION,
            spring_back: SPRING_BACK,
        }
    }
}

/// How the card should be drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardTransform {
    pub translate_x: f32,
    pub rotate_deg: f32,
}

impl CardTransform {
    pub const REST: CardTransform = CardTransform {
        translate_x: 0.0,
        rotate_deg: 0.0,
    };
}

/// Animated return of the card to offset 0 after a release.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringBack {
    from: f32,
    duration: Duration,
    inclination: f32,
    release_id: u64,
}

impl SpringBack {
    /// Distinguishes this release from every other release of the same
    /// controller, including ones from the same offset.
    #[must_use]
    pub fn release_id(&self) -> u64 {
        self.release_id
    }

    #[must_use]
    pub fn from_offset(&self) -> f32 {
        self.from
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    #[must_use]
    pub fn offset_at(&self, elapsed: Duration) -> f32 {
        if self.duration.is_zero() || elapsed >= self.duration {
            return 0.0;
        }
        let t = elapsed.as_secs_f32() / self.duration.as_secs_f32();
        self.from * (1.0 - easing::in_out_quad(t))
    }

    #[must_use]
    pub fn transform_at(&self, elapsed: Duration) -> CardTransform {
        transform(self.offset_at(elapsed), self.inclination)
    }
}

/// Card pose as seen by a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CardPose {
    #[default]
    Rest,
    Dragging(CardTransform),
    Returning(SpringBack),
}

/// What a release produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Release {
    pub intent: Option<Intent>,
    pub spring_back: SpringBack,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragState {
    Idle,
    Dragging { offset: f32 },
}

#[derive(Debug, Clone)]
pub struct GestureController {
    config: GestureConfig,
    state: DragState,
    last_release: Option<SpringBack>,
    releases: u64,
}

impl Default for GestureController {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

impl GestureController {
    #[must_use]
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            state: DragState::Idle,
            last_release: None,
            releases: 0,
        }
    }

    #[must_use]
    pub fn config(&self) -> GestureConfig {
        self.config
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Start a drag lifecycle. A press during an active drag restarts it.
    pub fn press(&mut self) {
        self.state = DragState::Dragging { offset: 0.0 };
        self.last_release = None;
    }

    /// Record the drag's horizontal translation since the press.
    ///
    /// Ignored outside a drag and for non-finite input.
    pub fn update(&mut self, translation_x: f32) {
        if !translation_x.is_finite() {
            return;
        }
        if let DragState::Dragging { offset } = &mut self.state {
            *offset = translation_x;
        }
    }

    /// End the drag lifecycle.
    ///
    /// Returns `None` when no drag was active, so a stray second release can
    /// never produce a second intent.
    pub fn release(&mut self) -> Option<Release> {
        let DragState::Dragging { offset } = self.state else {
            return None;
        };
        self.state = DragState::Idle;
        self.releases += 1;

        let intent = (offset < self.config.skip_threshold).then_some(Intent::Swipe);
        let spring_back = SpringBack {
            from: offset,
            duration: self.config.spring_back,
            inclination: self.config.inclination,
            release_id: self.releases,
        };
        self.last_release = Some(spring_back);
        Some(Release {
            intent,
            spring_back,
        })
    }

    /// The spring-back of release `release_id` has played out. Returns
    /// `false` if a newer press or release already replaced it.
    pub fn settle(&mut self, release_id: u64) -> bool {
        match (self.state, self.last_release) {
            (DragState::Idle, Some(spring_back)) if spring_back.release_id == release_id => {
                self.last_release = None;
                true
            }
            _ => false,
        }
    }

    /// Drop any drag in progress and put the card straight back at rest,
    /// without producing an intent.
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
        self.last_release = None;
    }

    #[must_use]
    pub fn pose(&self) -> CardPose {
        match (self.state, self.last_release) {
            (DragState::Dragging { offset }, _) => {
                CardPose::Dragging(transform(offset, self.config.inclination))
            }
            (DragState::Idle, Some(spring_back)) => CardPose::Returning(spring_back),
            (DragState::Idle, None) => CardPose::Rest,
        }
    }
}

fn transform(offset: f32, inclination: f32) -> CardTransform {
    let rotate_deg = if inclination == 0.0 { 0.0 } else { offset / inclination };
    CardTransform {
        translate_x: offset,
        rotate_deg,
    }
}

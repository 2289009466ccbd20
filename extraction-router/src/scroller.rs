//! Human-like scrolling.
//!
//! A scroll is one animated motion: the requested distance is jittered, a
//! duration is drawn, and the viewport position follows an ease-in-out curve
//! sampled once per animation frame. Some motions end with a short
//! micro-pause.
//!
//! Timing goes through `tokio::time`, so tests running with a paused runtime
//! see exact frame counts. Dropping the future stops the motion; whatever
//! movement was already applied stays applied.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, trace};

/// Bézier control points of the ease-in-out curve.
const EASE_P1: f64 = 0.42;
const EASE_P2: f64 = 0.58;

/// Scroll position of some scrollable surface.
pub trait Viewport {
    fn scroll_top(&self) -> f64;
    fn set_scroll_top(&mut self, top: f64);
}

/// In-memory viewport clamped to `[0, max_top]`.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryViewport {
    top: f64,
    max_top: f64,
}

impl MemoryViewport {
    pub fn new(top: f64, max_top: f64) -> Self {
        let max_top = max_top.max(0.0);
        Self {
            top: top.clamp(0.0, max_top),
            max_top,
        }
    }
}

impl Viewport for MemoryViewport {
    fn scroll_top(&self) -> f64 {
        self.top
    }

    fn set_scroll_top(&mut self, top: f64) {
        self.top = top.clamp(0.0, self.max_top);
    }
}

impl<V: Viewport + ?Sized> Viewport for &mut V {
    fn scroll_top(&self) -> f64 {
        (**self).scroll_top()
    }

    fn set_scroll_top(&mut self, top: f64) {
        (**self).set_scroll_top(top)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

/// Randomization ranges for a motion.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollerConfig {
    /// Relative distance jitter (0.15 = ±15%)
    pub distance_jitter: f64,
    pub min_duration_ms: u64,
    pub max_duration_ms: u64,
    /// Chance of a micro-pause after the motion
    pub pause_probability: f64,
    pub pause_min_ms: u64,
    pub pause_max_ms: u64,
    /// Animation frame cadence
    pub frame_interval_ms: u64,
}

impl Default for ScrollerConfig {
    fn default() -> Self {
        Self {
            distance_jitter: 0.15,
            min_duration_ms: 300,
            max_duration_ms: 500,
            pause_probability: 0.3,
            pause_min_ms: 50,
            pause_max_ms: 200,
            frame_interval_ms: 16,
        }
    }
}

/// A planned motion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionProfile {
    pub direction: ScrollDirection,
    /// Jittered distance in pixels
    pub distance: f64,
    pub duration_ms: u64,
    /// Micro-pause after the motion, if any
    pub pause_ms: Option<u64>,
}

impl MotionProfile {
    /// Signed offset from the starting position after elapsed fraction `p`.
    pub fn offset_at(&self, p: f64) -> f64 {
        let offset = self.distance * ease_in_out(p);
        match self.direction {
            ScrollDirection::Up => -offset,
            ScrollDirection::Down => offset,
        }
    }
}

/// What a motion actually did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScrollOutcome {
    /// Observed displacement in pixels
    pub distance: f64,
    /// Wall-clock time including any micro-pause
    pub duration_ms: u64,
}

/// Cubic Bézier ease-in-out with control points `(0, 0.42, 0.58, 1)`.
///
/// `p` is clamped to `[0, 1]`.
///
/// # Example
///
/// ```
/// use extraction_router::scroller::ease_in_out;
///
/// assert_eq!(ease_in_out(0.0), 0.0);
/// assert_eq!(ease_in_out(1.0), 1.0);
/// assert!((ease_in_out(0.5) - 0.5).abs() < 1e-12);
/// ```
pub fn ease_in_out(p: f64) -> f64 {
    let p = p.clamp(0.0, 1.0);
    let q = 1.0 - p;
    3.0 * q * q * p * EASE_P1 + 3.0 * q * p * p * EASE_P2 + p * p * p
}

/// Drives a [`Viewport`] with randomized, eased motions.
pub struct HeuristicScroller<V: Viewport, R: Rng = StdRng> {
    viewport: V,
    rng: R,
    config: ScrollerConfig,
}

impl<V: Viewport> HeuristicScroller<V> {
    pub fn new(viewport: V) -> Self {
        Self::with_rng(viewport, ScrollerConfig::default(), StdRng::from_entropy())
    }
}

impl<V: Viewport, R: Rng> HeuristicScroller<V, R> {
    pub fn with_rng(viewport: V, config: ScrollerConfig, rng: R) -> Self {
        Self {
            viewport,
            rng,
            config,
        }
    }

    pub fn viewport(&self) -> &V {
        &self.viewport
    }

    pub fn into_viewport(self) -> V {
        self.viewport
    }

    /// Scroll towards the top (older content) by about `distance` pixels.
    pub async fn scroll_up(&mut self, distance: f64) -> ScrollOutcome {
        let profile = self.plan(ScrollDirection::Up, distance);
        self.perform(profile).await
    }

    /// Scroll towards the bottom by about `distance` pixels.
    pub async fn scroll_down(&mut self, distance: f64) -> ScrollOutcome {
        let profile = self.plan(ScrollDirection::Down, distance);
        self.perform(profile).await
    }

    /// Draw the random parts of a motion.
    pub fn plan(&mut self, direction: ScrollDirection, distance: f64) -> MotionProfile {
        let jitter = self.config.distance_jitter.abs();
        let factor = if jitter > 0.0 {
            self.rng.gen_range(1.0 - jitter..=1.0 + jitter)
        } else {
            1.0
        };

        let duration_ms = draw_between(
            &mut self.rng,
            self.config.min_duration_ms,
            self.config.max_duration_ms,
        );

        let pause_ms = if self.rng.gen_bool(self.config.pause_probability.clamp(0.0, 1.0)) {
            Some(draw_between(
                &mut self.rng,
                self.config.pause_min_ms,
                self.config.pause_max_ms,
            ))
        } else {
            None
        };

        MotionProfile {
            direction,
            distance: distance.abs() * factor,
            duration_ms,
            pause_ms,
        }
    }

    /// Animate `profile` on the viewport.
    ///
    /// Frame pacing and the reported duration come from `tokio::time` rather
    /// than a [`Clock`](crate::clock::Clock): the motion has to sleep between
    /// frames anyway, and a paused runtime controls both.
    pub async fn perform(&mut self, profile: MotionProfile) -> ScrollOutcome {
        let started = Instant::now();
        let origin = self.viewport.scroll_top();
        let frame = Duration::from_millis(self.config.frame_interval_ms.max(1));
        let total = profile.duration_ms as f64;

        trace!(
            "Scrolling {:?} {:.0}px over {}ms",
            profile.direction,
            profile.distance,
            profile.duration_ms
        );

        loop {
            let elapsed = started.elapsed().as_millis() as f64;
            let p = if total > 0.0 {
                (elapsed / total).min(1.0)
            } else {
                1.0
            };
            self.viewport.set_scroll_top(origin + profile.offset_at(p));
            if p >= 1.0 {
                break;
            }
            sleep(frame).await;
        }

        if let Some(pause) = profile.pause_ms {
            trace!("Micro-pause {}ms", pause);
            sleep(Duration::from_millis(pause)).await;
        }

        let outcome = ScrollOutcome {
            distance: (self.viewport.scroll_top() - origin).abs(),
            duration_ms: started.elapsed().as_millis() as u64,
        };
        debug!(
            "Scrolled {:?} {:.0}px in {}ms",
            profile.direction, outcome.distance, outcome.duration_ms
        );
        outcome
    }
}

fn draw_between<R: Rng>(rng: &mut R, a: u64, b: u64) -> u64 {
    if a <= b {
        rng.gen_range(a..=b)
    } else {
        rng.gen_range(b..=a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn scroller(top: f64, seed: u64) -> HeuristicScroller<MemoryViewport, StdRng> {
        HeuristicScroller::with_rng(
            MemoryViewport::new(top, 100_000.0),
            ScrollerConfig::default(),
            StdRng::seed_from_u64(seed),
        )
    }

    #[test]
    fn test_ease_endpoints_and_symmetry() {
        assert_eq!(ease_in_out(-1.0), 0.0);
        assert_eq!(ease_in_out(2.0), 1.0);
        for i in 0..=10 {
            let p = i as f64 / 10.0;
            assert!((ease_in_out(p) + ease_in_out(1.0 - p) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_memory_viewport_clamps() {
        let mut viewport = MemoryViewport::new(50.0, 100.0);
        viewport.set_scroll_top(-20.0);
        assert_eq!(viewport.scroll_top(), 0.0);
        viewport.set_scroll_top(500.0);
        assert_eq!(viewport.scroll_top(), 100.0);
    }

    #[test]
    fn test_plan_ranges() {
        let mut scroller = scroller(0.0, 3);
        for _ in 0..200 {
            let profile = scroller.plan(ScrollDirection::Down, 600.0);
            assert!(profile.distance >= 510.0 && profile.distance <= 690.0);
            assert!((300..=500).contains(&profile.duration_ms));
            if let Some(pause) = profile.pause_ms {
                assert!((50..=200).contains(&pause));
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_scroll_up_moves_towards_top() {
        let mut scroller = scroller(5_000.0, 11);
        let outcome = scroller.scroll_up(600.0).await;

        let top = scroller.viewport().scroll_top();
        assert!(top < 5_000.0);
        assert!((outcome.distance - (5_000.0 - top)).abs() < 1e-9);
        assert!(outcome.distance >= 510.0 && outcome.distance <= 690.0);
        assert!(outcome.duration_ms >= 300 && outcome.duration_ms <= 500 + 16 + 200);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scroll_down_reports_observed_distance() {
        let mut scroller = HeuristicScroller::with_rng(
            MemoryViewport::new(0.0, 100.0),
            ScrollerConfig::default(),
            StdRng::seed_from_u64(5),
        );
        let outcome = scroller.scroll_down(600.0).await;
        // clamped by the viewport
        assert_eq!(outcome.distance, 100.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_perform_exact_timing() {
        let mut scroller = scroller(1_000.0, 1);
        let outcome = scroller
            .perform(MotionProfile {
                direction: ScrollDirection::Down,
                distance: 320.0,
                duration_ms: 320,
                pause_ms: Some(100),
            })
            .await;
        assert_eq!(outcome.distance, 320.0);
        assert_eq!(outcome.duration_ms, 420);
        assert_eq!(scroller.viewport().scroll_top(), 1_320.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_motion_keeps_partial_movement() {
        let mut scroller = scroller(1_000.0, 1);
        let motion = scroller.perform(MotionProfile {
            direction: ScrollDirection::Up,
            distance: 400.0,
            duration_ms: 480,
            pause_ms: None,
        });
        let _ = tokio::time::timeout(Duration::from_millis(200), motion).await;

        let top = scroller.viewport().scroll_top();
        assert!(top < 1_000.0 && top > 600.0);
    }

    proptest! {
        #[test]
        fn prop_ease_is_monotonic(a in 0.0f64..1.0, b in 0.0f64..1.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(ease_in_out(lo) <= ease_in_out(hi) + 1e-12);
        }
    }
}

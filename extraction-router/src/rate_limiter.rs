//! Token-bucket rate limiter with mandatory cooldown pauses.
//!
//! Every extraction round costs tokens. Tokens refill continuously at a fixed
//! rate up to a cap. Independently of the bucket, a cooldown is armed each
//! time the pause interval elapses; while it is active every request is
//! refused, however many tokens are available.
//!
//! The limiter holds plain mutable state and is owned by a single session.
//! It never fails; callers poll [`RateLimiter::try_consume`] and
//! [`RateLimiter::get_resume_time`].

use crate::clock::Clock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

/// Bucket and cooldown parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimiterConfig {
    /// Bucket capacity
    pub max_tokens: f64,
    /// Tokens added per elapsed millisecond
    pub refill_rate: f64,
    /// Time between cooldowns; 0 disables them
    pub pause_interval_ms: u64,
    pub pause_min_ms: u64,
    pub pause_max_ms: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_tokens: 10.0,
            refill_rate: 0.0005,
            pause_interval_ms: 300_000,
            pause_min_ms: 30_000,
            pause_max_ms: 90_000,
        }
    }
}

/// Token bucket plus cooldown window.
pub struct RateLimiter<C: Clock, R: Rng = StdRng> {
    config: RateLimiterConfig,
    clock: C,
    rng: R,
    tokens: f64,
    last_refill: u64,
    last_pause_check: u64,
    paused_until: Option<u64>,
}

impl<C: Clock> RateLimiter<C> {
    /// Create a limiter with a full bucket and an entropy-seeded RNG.
    pub fn new(config: RateLimiterConfig, clock: C) -> Self {
        Self::with_rng(config, clock, StdRng::from_entropy())
    }
}

impl<C: Clock, R: Rng> RateLimiter<C, R> {
    /// Create a limiter drawing cooldown durations from `rng`.
    pub fn with_rng(config: RateLimiterConfig, clock: C, rng: R) -> Self {
        let now = clock.now_ms();
        Self {
            tokens: config.max_tokens,
            config,
            clock,
            rng,
            last_refill: now,
            last_pause_check: now,
            paused_until: None,
        }
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Current time according to the limiter's clock.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Try to take `count` tokens.
    ///
    /// Arms a cooldown first if one is due. Returns `false` during a
    /// cooldown or when the refilled bucket holds fewer than `count` tokens;
    /// a refused request debits nothing.
    pub fn try_consume(&mut self, count: u32) -> bool {
        let now = self.clock.now_ms();
        self.arm_pause_if_due(now);

        if let Some(until) = self.paused_until {
            if now < until {
                trace!("Refusing {} tokens, paused until {}", count, until);
                return false;
            }
        }

        self.refill(now);

        let wanted = f64::from(count);
        if self.tokens >= wanted {
            self.tokens -= wanted;
            trace!("Consumed {} tokens, {:.2} left", count, self.tokens);
            true
        } else {
            trace!("Refusing {} tokens, only {:.2} available", count, self.tokens);
            false
        }
    }

    /// Whole tokens available right now, counting pending refill.
    pub fn get_tokens(&self) -> u32 {
        let now = self.clock.now_ms();
        let elapsed = now.saturating_sub(self.last_refill) as f64;
        let tokens = (self.tokens + elapsed * self.config.refill_rate).min(self.config.max_tokens);
        tokens.max(0.0).floor() as u32
    }

    /// Whether a cooldown is active. An expired cooldown is cleared here.
    pub fn is_paused(&mut self) -> bool {
        match self.paused_until {
            Some(until) if self.clock.now_ms() < until => true,
            Some(_) => {
                debug!("Cooldown expired");
                self.paused_until = None;
                false
            }
            None => false,
        }
    }

    /// End of the current cooldown, if one is armed.
    pub fn get_resume_time(&self) -> Option<u64> {
        self.paused_until
    }

    /// Refill the bucket and clear cooldown bookkeeping as of now.
    pub fn reset(&mut self) {
        let now = self.clock.now_ms();
        self.tokens = self.config.max_tokens;
        self.last_refill = now;
        self.last_pause_check = now;
        self.paused_until = None;
    }

    fn arm_pause_if_due(&mut self, now: u64) {
        if self.config.pause_interval_ms == 0 {
            return;
        }
        if now.saturating_sub(self.last_pause_check) < self.config.pause_interval_ms {
            return;
        }

        let (low, high) = if self.config.pause_min_ms <= self.config.pause_max_ms {
            (self.config.pause_min_ms, self.config.pause_max_ms)
        } else {
            (self.config.pause_max_ms, self.config.pause_min_ms)
        };
        let duration = self.rng.gen_range(low..=high);
        self.paused_until = Some(now + duration);
        self.last_pause_check = now;
        debug!("Cooldown armed for {}ms", duration);
    }

    fn refill(&mut self, now: u64) {
        let elapsed = now.saturating_sub(self.last_refill) as f64;
        self.tokens = (self.tokens + elapsed * self.config.refill_rate).min(self.config.max_tokens);
        self.last_refill = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use proptest::prelude::*;

    fn limiter(clock: &ManualClock) -> RateLimiter<ManualClock, StdRng> {
        RateLimiter::with_rng(
            RateLimiterConfig {
                max_tokens: 10.0,
                refill_rate: 0.01,
                pause_interval_ms: 1_000,
                pause_min_ms: 500,
                pause_max_ms: 800,
            },
            clock.clone(),
            StdRng::seed_from_u64(7),
        )
    }

    fn without_pauses(clock: &ManualClock) -> RateLimiter<ManualClock, StdRng> {
        RateLimiter::with_rng(
            RateLimiterConfig {
                max_tokens: 10.0,
                refill_rate: 0.01,
                pause_interval_ms: 0,
                pause_min_ms: 0,
                pause_max_ms: 0,
            },
            clock.clone(),
            StdRng::seed_from_u64(7),
        )
    }

    #[test]
    fn test_starts_full() {
        let clock = ManualClock::new(0);
        let limiter = limiter(&clock);
        assert_eq!(limiter.get_tokens(), 10);
        assert_eq!(limiter.get_resume_time(), None);
    }

    #[test]
    fn test_refill_is_capped() {
        let clock = ManualClock::new(0);
        let mut limiter = without_pauses(&clock);
        assert!(limiter.try_consume(10));
        assert_eq!(limiter.get_tokens(), 0);

        clock.advance(1_000);
        assert_eq!(limiter.get_tokens(), 10);

        clock.advance(5_000);
        assert_eq!(limiter.get_tokens(), 10);
    }

    #[test]
    fn test_partial_refill_floors() {
        let clock = ManualClock::new(0);
        let mut limiter = without_pauses(&clock);
        assert!(limiter.try_consume(10));
        clock.advance(350);
        assert_eq!(limiter.get_tokens(), 3);
        assert!(limiter.try_consume(3));
        assert!(!limiter.try_consume(1));
    }

    #[test]
    fn test_no_partial_debit() {
        let clock = ManualClock::new(0);
        let mut limiter = limiter(&clock);
        assert!(!limiter.try_consume(11));
        assert_eq!(limiter.get_tokens(), 10);
    }

    #[test]
    fn test_pause_arms_after_interval() {
        let clock = ManualClock::new(0);
        let mut limiter = limiter(&clock);

        clock.advance(1_001);
        assert!(!limiter.try_consume(1));
        assert!(limiter.is_paused());

        let resume = limiter.get_resume_time().unwrap();
        assert!((1_501..=1_801).contains(&resume));
        // refused during the pause without touching tokens
        assert_eq!(limiter.get_tokens(), 10);

        clock.set(resume);
        assert!(!limiter.is_paused());
        assert_eq!(limiter.get_resume_time(), None);
        assert!(limiter.try_consume(1));
    }

    #[test]
    fn test_pause_not_armed_before_interval() {
        let clock = ManualClock::new(0);
        let mut limiter = limiter(&clock);
        clock.advance(999);
        assert!(limiter.try_consume(1));
        assert!(!limiter.is_paused());
    }

    #[test]
    fn test_pause_check_advances_while_paused() {
        let clock = ManualClock::new(0);
        let mut limiter = RateLimiter::with_rng(
            RateLimiterConfig {
                max_tokens: 10.0,
                refill_rate: 0.01,
                pause_interval_ms: 1_000,
                pause_min_ms: 5_000,
                pause_max_ms: 5_000,
            },
            clock.clone(),
            StdRng::seed_from_u64(1),
        );

        clock.set(1_000);
        assert!(!limiter.try_consume(1));
        assert_eq!(limiter.get_resume_time(), Some(6_000));

        // another interval passes inside the active pause: a new window is armed
        clock.set(2_000);
        assert!(!limiter.try_consume(1));
        assert_eq!(limiter.get_resume_time(), Some(7_000));
    }

    #[test]
    fn test_reset_restores_everything() {
        let clock = ManualClock::new(0);
        let mut limiter = limiter(&clock);
        assert!(limiter.try_consume(8));
        clock.advance(1_200);
        assert!(!limiter.try_consume(1));
        assert!(limiter.is_paused());

        limiter.reset();
        assert!(!limiter.is_paused());
        assert_eq!(limiter.get_tokens(), 10);
        assert!(limiter.try_consume(10));
    }

    proptest! {
        #[test]
        fn prop_tokens_never_exceed_max(
            steps in proptest::collection::vec((0u64..5_000, 0u32..4), 1..40)
        ) {
            let clock = ManualClock::new(0);
            let mut limiter = limiter(&clock);
            for (advance, count) in steps {
                clock.advance(advance);
                let before = limiter.get_tokens();
                let ok = limiter.try_consume(count);
                prop_assert!(limiter.get_tokens() <= 10);
                if ok {
                    prop_assert!(before >= count);
                }
            }
        }
    }
}

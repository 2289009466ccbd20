//! Extraction session control loop.
//!
//! A session runs against one open conversation:
//!
//! 1. **Drift check**: the layout fingerprint must match the stored one;
//!    a mismatch ends the session before anything is read.
//! 2. **Rounds**: each round waits for the rate limiter, extracts a message
//!    batch from the current tree, merges unseen messages, and scrolls up to
//!    load older history.
//! 3. **Stop**: after the scroll budget is spent, after a number of
//!    consecutive rounds that found nothing new, or once the rate limiter
//!    is empty and can never refill.

use crate::clock::Clock;
use crate::config::ScrollConfig;
use crate::drift::{HostDocument, VersionCheck, VersionGuard};
use crate::rate_limiter::RateLimiter;
use crate::scroller::{HeuristicScroller, Viewport};
use crate::store::FingerprintStore;
use fiber_extractor::{
    extract_messages, NormalizedMessage, ParseError, TreeSource, DEFAULT_MAX_NODES,
};
use rand::Rng;
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that end a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("host layout changed: {0}")]
    VersionMismatch(ParseError),

    #[error("UI tree unavailable: {0}")]
    TreeUnavailable(ParseError),
}

/// Round and scroll limits for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub distance_px: f64,
    pub max_scrolls: u32,
    pub idle_rounds: u32,
    pub poll_interval_ms: u64,
    /// Cap on nodes visited per extraction round
    pub max_nodes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&ScrollConfig::default())
    }
}

impl From<&ScrollConfig> for SessionConfig {
    fn from(scroll: &ScrollConfig) -> Self {
        Self {
            distance_px: scroll.distance_px,
            max_scrolls: scroll.max_scrolls,
            idle_rounds: scroll.idle_rounds.max(1),
            poll_interval_ms: scroll.poll_interval_ms.max(1),
            max_nodes: DEFAULT_MAX_NODES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    /// `idle_rounds` consecutive rounds found nothing new
    HistoryExhausted,
    /// `max_scrolls` scrolls were made
    ScrollBudget,
    /// The token bucket ran dry and its refill rate is zero
    TokensExhausted,
}

/// Summary of a finished session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    /// Unique messages, oldest first
    pub messages: Vec<NormalizedMessage>,
    /// Candidate nodes that failed to parse, summed over rounds
    pub skipped: usize,
    pub rounds: u32,
    pub scrolls: u32,
    /// Observed pixels scrolled
    pub scrolled_distance: f64,
    /// Time spent waiting on the rate limiter
    pub waited_ms: u64,
    pub stop_reason: StopReason,
    pub version: VersionCheck,
}

/// Runs extraction rounds against a [`TreeSource`].
#[derive(Debug, Clone, Default)]
pub struct ExtractionSession {
    config: SessionConfig,
}

impl ExtractionSession {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run one session to completion.
    ///
    /// # Arguments
    ///
    /// * `source` - Supplies the current UI tree root each round
    /// * `guard` - Layout fingerprint check, run once before the first round
    /// * `limiter` - Paces rounds; one token per round
    /// * `scroller` - Scrolls the message pane between rounds
    ///
    /// # Errors
    ///
    /// [`SessionError::VersionMismatch`] when the layout changed,
    /// [`SessionError::TreeUnavailable`] when the tree root cannot be found.
    pub async fn run<T, D, S, C, LR, V, SR>(
        &self,
        source: &T,
        guard: &VersionGuard<D, S>,
        limiter: &mut RateLimiter<C, LR>,
        scroller: &mut HeuristicScroller<V, SR>,
    ) -> Result<SessionReport, SessionError>
    where
        T: TreeSource,
        D: HostDocument,
        S: FingerprintStore,
        C: Clock,
        LR: Rng,
        V: Viewport,
        SR: Rng,
    {
        let version = guard
            .require_compatible()
            .map_err(SessionError::VersionMismatch)?;

        let mut seen: HashSet<String> = HashSet::new();
        let mut messages: Vec<NormalizedMessage> = Vec::new();
        let mut skipped = 0;
        let mut rounds = 0;
        let mut scrolls = 0;
        let mut idle = 0;
        let mut scrolled_distance = 0.0;
        let mut waited_ms = 0;

        let stop_reason = loop {
            match self.acquire(limiter).await {
                Some(waited) => waited_ms += waited,
                None => break StopReason::TokensExhausted,
            }
            rounds += 1;

            let (fresh, failed) = {
                let root = source.root().map_err(SessionError::TreeUnavailable)?;
                let batch = extract_messages(&root, self.config.max_nodes);
                let fresh: Vec<NormalizedMessage> = batch
                    .records
                    .into_iter()
                    .filter(|m| seen.insert(m.id.clone()))
                    .collect();
                (fresh, batch.skipped)
            };
            skipped += failed;

            debug!(
                "Round {}: {} new messages, {} skipped",
                rounds,
                fresh.len(),
                failed
            );

            if fresh.is_empty() {
                idle += 1;
            } else {
                idle = 0;
                messages.extend(fresh);
            }

            if idle >= self.config.idle_rounds {
                break StopReason::HistoryExhausted;
            }
            if scrolls >= self.config.max_scrolls {
                break StopReason::ScrollBudget;
            }

            let outcome = scroller.scroll_up(self.config.distance_px).await;
            scrolls += 1;
            scrolled_distance += outcome.distance;
        };

        messages.sort_by_key(|m| m.timestamp);

        info!(
            "Session finished ({:?}): {} messages in {} rounds, {} scrolls",
            stop_reason,
            messages.len(),
            rounds,
            scrolls
        );

        Ok(SessionReport {
            messages,
            skipped,
            rounds,
            scrolls,
            scrolled_distance,
            waited_ms,
            stop_reason,
            version,
        })
    }

    /// Wait until the limiter grants a token; returns the time waited, or
    /// `None` when the bucket is empty and does not refill.
    async fn acquire<C: Clock, R: Rng>(&self, limiter: &mut RateLimiter<C, R>) -> Option<u64> {
        let started = limiter.now_ms();

        while !limiter.try_consume(1) {
            let now = limiter.now_ms();
            let wait = if limiter.is_paused() {
                let remaining = limiter
                    .get_resume_time()
                    .map_or(0, |resume| resume.saturating_sub(now));
                warn!("Cooldown active, resuming in {}ms", remaining);
                remaining.max(1)
            } else if limiter.config().refill_rate > 0.0 {
                self.config.poll_interval_ms
            } else {
                warn!("Token bucket is empty and refill rate is zero");
                return None;
            };
            tokio::time::sleep(Duration::from_millis(wait)).await;
        }

        Some(limiter.now_ms().saturating_sub(started))
    }
}

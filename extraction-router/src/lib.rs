//! Extraction Router - paced, human-like extraction sessions
//!
//! This crate wraps the pure `fiber_extractor` core with the behavior needed
//! to read a live conversation without looking automated:
//!
//! - **Rate limiting**: a token bucket with mandatory cooldown windows
//! - **Scrolling**: jittered, eased scroll motions at animation-frame cadence
//! - **Drift detection**: a layout fingerprint that blocks extraction when
//!   the host page changed shape
//!
//! # Architecture
//!
//! An [`ExtractionSession`] checks the layout fingerprint once, then runs
//! rounds of wait-for-token, extract, merge, and scroll up, until history
//! stops yielding new messages or the scroll budget is spent. Every
//! collaborator is an explicit handle owned by the caller: clock, RNG,
//! viewport, host document, and fingerprint store.

pub mod clock;
pub mod config;
pub mod drift;
pub mod rate_limiter;
pub mod scroller;
pub mod session;
pub mod snapshot;
pub mod store;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock, TokioClock};
pub use config::Config;
pub use drift::{
    compute_fingerprint, ElementProbe, HostDocument, StaticDocument, VersionCheck, VersionGuard,
};
pub use rate_limiter::{RateLimiter, RateLimiterConfig};
pub use scroller::{
    HeuristicScroller, MemoryViewport, MotionProfile, ScrollDirection, ScrollOutcome,
    ScrollerConfig, Viewport,
};
pub use session::{ExtractionSession, SessionConfig, SessionError, SessionReport, StopReason};
pub use snapshot::PageSnapshot;
pub use store::{FingerprintStore, MemoryStore, SqliteStore, StoreError};

//! The request admission gate.
//!
//! Tracks consecutive failures against one logical remote endpoint and
//! decides, before each outbound call, whether the caller may send it.
//! Successful responses clear the schedule; failures open a backoff window
//! sized by the status class: a long fixed silence for non-retryable
//! statuses, a jittered capped exponential for everything else.
//!
//! Semantics worth knowing:
//! - A client that waits out a backoff window is granted exactly one probing
//!   request. Waiting does not forgive the failure streak; if the probe fails
//!   too, the next window is computed from the incremented count.
//! - The two state fields are only ever read and written together under one
//!   lock acquisition, so racing checks and recordings cannot interleave or
//!   lose updates.
//! - The gate never sleeps and never does I/O; every operation completes in
//!   bounded time.

use crate::backoff::{self, MAX_RETRYABLE_BACKOFF, NON_RETRYABLE_BACKOFF};
use crate::clock::{Clock, SystemClock};
use crate::jitter::{JitterSource, UniformJitter};
use crate::status::StatusClass;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const STATUS_OK: u16 = 200;

/// Sentinel deadline meaning "no restriction is active".
const UNRESTRICTED: u64 = u64::MAX;

/// Validated configuration for the gate's two backoff schedules.
#[derive(Debug, Clone)]
pub struct GateConfig {
    non_retryable_backoff: Duration,
    retryable_cap: Duration,
}

/// Errors produced when validating gate configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateConfigError {
    /// The non-retryable silence period must be > 0.
    InvalidNonRetryableBackoff(Duration),
    /// The retryable cap must be > 0.
    InvalidRetryableCap(Duration),
}

impl std::fmt::Display for GateConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateConfigError::InvalidNonRetryableBackoff(d) => {
                write!(f, "non_retryable_backoff must be > 0 (got {:?})", d)
            }
            GateConfigError::InvalidRetryableCap(d) => {
                write!(f, "retryable_cap must be > 0 (got {:?})", d)
            }
        }
    }
}

impl std::error::Error for GateConfigError {}

impl GateConfig {
    /// Create a config with validation.
    pub fn new(
        non_retryable_backoff: Duration,
        retryable_cap: Duration,
    ) -> Result<Self, GateConfigError> {
        if non_retryable_backoff.is_zero() {
            return Err(GateConfigError::InvalidNonRetryableBackoff(non_retryable_backoff));
        }
        if retryable_cap.is_zero() {
            return Err(GateConfigError::InvalidRetryableCap(retryable_cap));
        }
        Ok(Self { non_retryable_backoff, retryable_cap })
    }

    /// Silence period after a non-retryable status.
    pub fn non_retryable_backoff(&self) -> Duration {
        self.non_retryable_backoff
    }

    /// Cap on the exponential schedule for retryable statuses.
    pub fn retryable_cap(&self) -> Duration {
        self.retryable_cap
    }
}

impl Default for GateConfig {
    /// 24 hours of silence for non-retryable statuses, a 30 minute cap for
    /// retryable ones.
    fn default() -> Self {
        Self { non_retryable_backoff: NON_RETRYABLE_BACKOFF, retryable_cap: MAX_RETRYABLE_BACKOFF }
    }
}

/// The decision returned by an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request may be sent.
    Allowed,
    /// The request must wait.
    Denied {
        /// Remaining backoff, or `None` while an earlier probe's response is
        /// still outstanding (the schedule resumes once it is recorded).
        wait: Option<Duration>,
        /// Consecutive failures recorded so far.
        attempts: u32,
    },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// Error returned by [`RequestGate::execute`] when admission is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Denied {
    /// Remaining backoff, or `None` while a probe's response is outstanding.
    pub wait: Option<Duration>,
    /// Consecutive failures recorded so far.
    pub attempts: u32,
}

impl std::fmt::Display for Denied {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.wait {
            Some(wait) => write!(
                f,
                "request denied ({} consecutive failures, retry in {:?})",
                self.attempts, wait
            ),
            None => write!(
                f,
                "request denied ({} consecutive failures, probe response outstanding)",
                self.attempts
            ),
        }
    }
}

impl std::error::Error for Denied {}

/// Read-only view of a gate's current schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateSnapshot {
    /// Consecutive failures since the last success.
    pub attempts: u32,
    /// Whether a backoff deadline is currently set.
    pub in_backoff: bool,
}

#[derive(Debug)]
struct GateState {
    attempts: u32,
    next_allowed_at: u64,
}

impl GateState {
    fn unrestricted() -> Self {
        Self { attempts: 0, next_allowed_at: UNRESTRICTED }
    }
}

/// Admission gate for one logical remote endpoint.
///
/// Clones share the same underlying state via `Arc`, so all handles observe
/// and affect the same backoff schedule. Clients talking to several endpoints
/// keep one gate per endpoint.
#[derive(Debug, Clone)]
pub struct RequestGate {
    state: Arc<Mutex<GateState>>,
    config: GateConfig,
    clock: Arc<dyn Clock>,
    jitter: Arc<dyn JitterSource>,
}

impl Default for RequestGate {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestGate {
    /// Create a gate with the default schedules, the wall clock, and uniform
    /// jitter.
    ///
    /// # Examples
    /// ```
    /// use turnstile::RequestGate;
    /// let gate = RequestGate::new();
    /// assert!(gate.is_request_allowed());
    /// ```
    pub fn new() -> Self {
        Self::with_config(GateConfig::default())
    }

    /// Create a gate from an explicit config. Use [`GateConfig::new`] to
    /// build a validated config.
    pub fn with_config(config: GateConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(GateState::unrestricted())),
            config,
            clock: Arc::new(SystemClock),
            jitter: Arc::new(UniformJitter::default()),
        }
    }

    /// Override the clock (useful for deterministic tests).
    ///
    /// # Example
    /// ```
    /// # use turnstile::RequestGate;
    /// use turnstile::ManualClock;
    /// let clock = ManualClock::new();
    /// let gate = RequestGate::new().with_clock(clock.clone());
    /// ```
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Override the jitter source.
    pub fn with_jitter<J: JitterSource + 'static>(mut self, jitter: J) -> Self {
        self.jitter = Arc::new(jitter);
        self
    }

    /// Decide whether a request may be sent right now.
    ///
    /// Clearing an expired window does not clear the failure count: the
    /// caller gets exactly one probe, and further checks are denied until
    /// that probe's response is recorded. A success then clears the schedule;
    /// a failure escalates from the preserved count.
    pub fn check(&self) -> Decision {
        let now = self.clock.now_millis();
        let mut state = self.state.lock().expect("gate state poisoned");

        if state.attempts == 0 {
            return Decision::Allowed;
        }
        if now > state.next_allowed_at {
            // Window expired: grant one probe and park the deadline at the
            // sentinel so further checks deny until the response lands.
            tracing::debug!(attempts = state.attempts, "backoff window expired; allowing a probe");
            state.next_allowed_at = UNRESTRICTED;
            return Decision::Allowed;
        }

        let wait = if state.next_allowed_at == UNRESTRICTED {
            None
        } else {
            Some(Duration::from_millis(state.next_allowed_at.saturating_sub(now)))
        };
        Decision::Denied { wait, attempts: state.attempts }
    }

    /// True if the caller may send a request right now.
    ///
    /// Boolean convenience over [`check`](Self::check), including its
    /// expired-window side effect.
    pub fn is_request_allowed(&self) -> bool {
        self.check().is_allowed()
    }

    /// Record the status of a completed request and reschedule.
    ///
    /// `200` clears the schedule entirely; it is the only path that resets
    /// the failure count besides [`reset`](Self::reset). Any other status opens a
    /// backoff window sized by its [`StatusClass`]. Transport failures that
    /// produced no status at all should be mapped to a representative
    /// retryable code (for example 503) before calling.
    pub fn record_response(&self, status: u16) {
        let mut state = self.state.lock().expect("gate state poisoned");

        if status == STATUS_OK {
            if state.attempts > 0 {
                tracing::info!(attempts = state.attempts, "success; backoff schedule cleared");
            }
            *state = GateState::unrestricted();
            return;
        }

        state.attempts = state.attempts.saturating_add(1);
        let backoff_ms = self.backoff_millis(status, state.attempts);
        state.next_allowed_at = self.clock.now_millis().saturating_add(backoff_ms);
        tracing::debug!(
            status,
            attempts = state.attempts,
            backoff_ms,
            "failure recorded; backoff window opened"
        );
    }

    /// Run `operation` under admission control.
    ///
    /// Denied calls return [`Denied`] without running the operation. Allowed
    /// calls run it, record the status it resolves with, and hand back its
    /// value. The operation resolves to `(status, value)`; map a transport
    /// failure with no status to a representative retryable code.
    ///
    /// # Errors
    /// Returns [`Denied`] when the gate is inside a backoff window or an
    /// earlier probe's response has not been recorded yet.
    pub async fn execute<T, Fut, Op>(&self, operation: Op) -> Result<T, Denied>
    where
        T: Send,
        Fut: Future<Output = (u16, T)> + Send,
        Op: FnOnce() -> Fut + Send,
    {
        match self.check() {
            Decision::Denied { wait, attempts } => Err(Denied { wait, attempts }),
            Decision::Allowed => {
                let (status, value) = operation().await;
                self.record_response(status);
                Ok(value)
            }
        }
    }

    /// Return the gate to its initial, unrestricted state.
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("gate state poisoned");
        *state = GateState::unrestricted();
    }

    /// Observe the current schedule without affecting it.
    pub fn snapshot(&self) -> GateSnapshot {
        let state = self.state.lock().expect("gate state poisoned");
        GateSnapshot {
            attempts: state.attempts,
            in_backoff: state.next_allowed_at != UNRESTRICTED,
        }
    }

    fn backoff_millis(&self, status: u16, attempts: u32) -> u64 {
        match StatusClass::of(status) {
            StatusClass::NonRetryable => {
                backoff::millis_saturated(self.config.non_retryable_backoff)
            }
            StatusClass::Retryable => backoff::millis_saturated(backoff::exponential_delay(
                attempts,
                self.jitter.next_millis(),
                self.config.retryable_cap,
            )),
        }
    }
}

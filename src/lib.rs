#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # Turnstile
//!
//! Admission gate for clients of rate-sensitive remote services: ask before
//! every outbound request, report the status code afterwards, and let the
//! gate keep the backoff schedule.
//!
//! ## Policy
//!
//! - **Non-retryable statuses** (`400`, `403`) open a long fixed silence
//!   window (24 hours by default).
//! - **Every other status** opens a jittered exponential window, capped
//!   (30 minutes by default).
//! - **A `200`** clears the schedule entirely.
//! - A client that waits out a window is granted exactly one probing request;
//!   the failure streak is only forgiven by a success.
//!
//! ## Quick Start
//!
//! ```rust
//! use turnstile::RequestGate;
//!
//! let gate = RequestGate::new();
//! assert!(gate.is_request_allowed());
//!
//! // the request went out and came back 503
//! gate.record_response(503);
//! assert!(!gate.is_request_allowed()); // wait out the window first
//! ```
//!
//! Time and randomness are injected capabilities so tests run
//! deterministically:
//!
//! ```rust
//! use turnstile::{ManualClock, NoJitter, RequestGate};
//!
//! let clock = ManualClock::new();
//! let gate = RequestGate::new().with_clock(clock.clone()).with_jitter(NoJitter);
//!
//! gate.record_response(500);
//! assert!(!gate.is_request_allowed());
//! clock.advance(3); // first retryable window is 2ms
//! assert!(gate.is_request_allowed());
//! ```

pub mod backoff;
pub mod clock;
pub mod gate;
pub mod jitter;
pub mod prelude;
pub mod registry;
pub mod status;

// Re-exports
pub use clock::{Clock, ManualClock, MonotonicClock, SystemClock};
pub use gate::{Decision, Denied, GateConfig, GateConfigError, GateSnapshot, RequestGate};
pub use jitter::{FixedJitter, JitterSource, NoJitter, UniformJitter};
pub use registry::{GateRegistry, InMemoryGateRegistry, RegistryError};
pub use status::StatusClass;

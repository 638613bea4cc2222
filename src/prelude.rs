//! Convenient re-exports for common Turnstile types.
pub use crate::{
    backoff::{exponential_delay, MAX_RETRYABLE_BACKOFF, NON_RETRYABLE_BACKOFF},
    clock::{Clock, ManualClock, MonotonicClock, SystemClock},
    gate::{Decision, Denied, GateConfig, GateConfigError, GateSnapshot, RequestGate},
    jitter::{FixedJitter, JitterSource, NoJitter, UniformJitter},
    registry::{GateRegistry, InMemoryGateRegistry, RegistryError},
    status::StatusClass,
};

//! Response status classification.
//!
//! Exactly two buckets. `400` and `403` indicate a client-side
//! misconfiguration that will not self-resolve, so retrying soon wastes
//! resources; every other status (server errors included) is worth another
//! try after a backoff. Callers that got no response at all map the transport
//! failure to a representative retryable code before recording it.

/// How a response status affects the backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// Retrying is pointless until a long fixed interval has passed.
    NonRetryable,
    /// Eligible for capped exponential backoff.
    Retryable,
}

impl StatusClass {
    /// Classify a status code.
    ///
    /// Codes outside any realistic HTTP range are still `Retryable`;
    /// classification never rejects input.
    pub fn of(status: u16) -> Self {
        match status {
            400 | 403 => StatusClass::NonRetryable,
            _ => StatusClass::Retryable,
        }
    }

    pub fn is_non_retryable(self) -> bool {
        matches!(self, StatusClass::NonRetryable)
    }
}

//! Per-dependency circuit breaker.
//!
//! One breaker guards one upstream dependency and is shared by every
//! concurrent request targeting it. All state inspection and transitions
//! happen under a single mutex; the guarded operation itself runs outside the
//! lock so slow upstream calls never serialize each other.
//!
//! ```text
//!            failures >= failure_threshold
//!   CLOSED ─────────────────────────────────▶ OPEN
//!     ▲                                        │ now >= next_attempt_at
//!     │ successes >= success_threshold         ▼
//!     └──────────────────────────────────── HALF_OPEN
//!                  any failure ──▶ OPEN
//! ```

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Runtime circuit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "CLOSED",
            Self::Open => "OPEN",
            Self::HalfOpen => "HALF_OPEN",
        }
    }
}

impl Display for CircuitState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Circuit breaker thresholds and timers. Immutable once a breaker is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            reset_timeout: Duration::from_secs(60),
        }
    }
}

/// Rejection or wrapped failure returned by [`CircuitBreaker::execute`].
#[derive(Debug, Error)]
pub enum CircuitError<E> {
    /// The breaker declined to call the dependency; nothing was invoked.
    #[error("circuit '{name}' is open; next probe in {}ms", .retry_after.as_millis())]
    Open { name: String, retry_after: Duration },

    /// The guarded operation ran and failed.
    #[error("{0}")]
    Operation(E),
}

/// Read-only snapshot for operator dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerStatus {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub failure_threshold: u32,
    pub success_count: u32,
    pub success_threshold: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_attempt_in_ms: Option<u64>,
}

#[derive(Debug)]
struct CircuitInner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    next_attempt_at: Option<Instant>,
}

impl Default for CircuitInner {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            next_attempt_at: None,
        }
    }
}

/// Thread-safe circuit breaker for one named dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<CircuitInner>,
}

impl CircuitBreaker {
    /// Thresholds below one are raised to one.
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config: CircuitBreakerConfig {
                failure_threshold: config.failure_threshold.max(1),
                success_threshold: config.success_threshold.max(1),
                reset_timeout: config.reset_timeout,
            },
            inner: Mutex::new(CircuitInner::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> CircuitBreakerConfig {
        self.config
    }

    /// Runs `operation` unless the circuit is open.
    ///
    /// Any `Err` from the operation counts as a failure and any `Ok` as a
    /// success, including empty payloads. Deadlines are the caller's job.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.try_acquire()?;

        match operation().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(error) => {
                self.record_failure();
                Err(CircuitError::Operation(error))
            }
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    pub fn success_count(&self) -> u32 {
        self.lock().success_count
    }

    pub fn status(&self) -> BreakerStatus {
        let inner = self.lock();
        let now = Instant::now();
        BreakerStatus {
            name: self.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            failure_threshold: self.config.failure_threshold,
            success_count: inner.success_count,
            success_threshold: self.config.success_threshold,
            next_attempt_in_ms: inner
                .next_attempt_at
                .map(|at| duration_ms(at.saturating_duration_since(now))),
        }
    }

    /// Forces the circuit closed with zeroed counters.
    pub fn reset(&self) {
        let mut inner = self.lock();
        if inner.state != CircuitState::Closed {
            info!(
                breaker = %self.name,
                from = %inner.state,
                "circuit breaker manually reset to CLOSED"
            );
        }
        *inner = CircuitInner::default();
    }

    fn try_acquire<E>(&self) -> Result<(), CircuitError<E>> {
        let mut inner = self.lock();
        if inner.state != CircuitState::Open {
            return Ok(());
        }

        let now = Instant::now();
        match inner.next_attempt_at {
            Some(at) if now < at => Err(CircuitError::Open {
                name: self.name.clone(),
                retry_after: at - now,
            }),
            _ => {
                inner.state = CircuitState::HalfOpen;
                inner.success_count = 0;
                inner.next_attempt_at = None;
                info!(breaker = %self.name, "circuit breaker OPEN -> HALF_OPEN, probing");
                Ok(())
            }
        }
    }

    fn record_success(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                inner.success_count = inner.success_count.saturating_add(1);
                debug!(
                    breaker = %self.name,
                    successes = inner.success_count,
                    threshold = self.config.success_threshold,
                    "half-open probe succeeded"
                );
                if inner.success_count >= self.config.success_threshold {
                    *inner = CircuitInner::default();
                    info!(breaker = %self.name, "circuit breaker HALF_OPEN -> CLOSED");
                }
            }
            CircuitState::Open => {
                // Admitted before the circuit tripped; the trip stands.
                debug!(breaker = %self.name, "ignoring late success while OPEN");
            }
        }
    }

    fn record_failure(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.failure_count = inner.failure_count.saturating_add(1);
                if inner.failure_count >= self.config.failure_threshold {
                    self.trip(&mut inner);
                } else {
                    debug!(
                        breaker = %self.name,
                        failures = inner.failure_count,
                        threshold = self.config.failure_threshold,
                        "call failed"
                    );
                }
            }
            CircuitState::HalfOpen => {
                inner.failure_count = self.config.failure_threshold;
                self.trip(&mut inner);
            }
            CircuitState::Open => {
                debug!(breaker = %self.name, "ignoring late failure while OPEN");
            }
        }
    }

    fn trip(&self, inner: &mut CircuitInner) {
        let from = inner.state;
        inner.state = CircuitState::Open;
        inner.success_count = 0;
        inner.next_attempt_at = Some(Instant::now() + self.config.reset_timeout);
        info!(
            breaker = %self.name,
            %from,
            failures = inner.failure_count,
            reset_timeout_ms = duration_ms(self.config.reset_timeout),
            "circuit breaker tripped to OPEN"
        );
    }

    fn lock(&self) -> MutexGuard<'_, CircuitInner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!(breaker = %self.name, "circuit breaker lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

fn duration_ms(duration: Duration) -> u64 {
    duration.as_millis().min(u128::from(u64::MAX)) as u64
}

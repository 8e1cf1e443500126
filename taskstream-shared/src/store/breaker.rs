/// Circuit breaker for the session store
///
/// Tracks call outcomes over a rolling window and opens when the error rate
/// crosses the threshold. While open, calls are rejected immediately instead
/// of piling up on a struggling store. After the reset timeout one trial
/// call is admitted (half-open); its outcome decides whether the circuit
/// closes again or re-opens.
///
/// State transitions:
///
/// ```text
/// Closed --(error rate >= threshold)--> Open
/// Open --(reset timeout elapsed)-->     HalfOpen (one trial admitted)
/// HalfOpen --(trial succeeds)-->        Closed
/// HalfOpen --(trial fails)-->           Open
/// ```

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Calls flow normally; outcomes are recorded
    Closed,

    /// Calls are rejected without touching the store
    Open,

    /// One trial call is in flight
    HalfOpen,
}

/// Circuit breaker tuning
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Error rate (0.0..=1.0) at which the circuit opens
    pub error_threshold: f64,

    /// Rolling window over which outcomes are counted
    pub window: Duration,

    /// Time the circuit stays open before admitting a trial call
    pub reset_timeout: Duration,

    /// Minimum calls in the window before the error rate is evaluated
    pub min_calls: usize,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            error_threshold: 0.5,
            window: Duration::from_secs(10),
            reset_timeout: Duration::from_secs(10),
            min_calls: 4,
        }
    }
}

/// Rolling-window circuit breaker
///
/// Not internally synchronized; the owner wraps it in a mutex.
pub struct CircuitBreaker {
    config: BreakerConfig,
    state: BreakerState,
    opened_at: Option<Instant>,
    // (when, success) outcomes inside the rolling window
    outcomes: VecDeque<(Instant, bool)>,
}

impl CircuitBreaker {
    /// Creates a closed breaker with the given tuning
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            state: BreakerState::Closed,
            opened_at: None,
            outcomes: VecDeque::new(),
        }
    }

    /// Current state, after applying any due open -> half-open transition
    pub fn state(&mut self) -> BreakerState {
        self.maybe_enter_half_open();
        self.state
    }

    /// Decides whether a call may proceed
    ///
    /// Returns `false` while the circuit is open, and for every call beyond
    /// the single admitted trial while half-open.
    pub fn check(&mut self) -> bool {
        self.maybe_enter_half_open();

        match self.state {
            BreakerState::Closed => true,
            BreakerState::Open => false,
            // The trial slot was taken when we transitioned to half-open;
            // concurrent callers wait for its verdict
            BreakerState::HalfOpen => false,
        }
    }

    /// Records a successful call
    pub fn record_success(&mut self) {
        match self.state {
            BreakerState::HalfOpen => {
                tracing::info!("Session store circuit closed after successful trial");
                self.state = BreakerState::Closed;
                self.opened_at = None;
                self.outcomes.clear();
            }
            BreakerState::Closed => {
                self.push_outcome(true);
            }
            BreakerState::Open => {}
        }
    }

    /// Records a failed or timed-out call
    pub fn record_failure(&mut self) {
        match self.state {
            BreakerState::HalfOpen => {
                tracing::warn!("Session store circuit re-opened: trial call failed");
                self.open();
            }
            BreakerState::Closed => {
                self.push_outcome(false);
                self.evaluate();
            }
            BreakerState::Open => {}
        }
    }

    fn push_outcome(&mut self, success: bool) {
        let now = Instant::now();
        self.outcomes.push_back((now, success));

        let cutoff = now - self.config.window;
        while let Some(&(when, _)) = self.outcomes.front() {
            if when < cutoff {
                self.outcomes.pop_front();
            } else {
                break;
            }
        }
    }

    fn evaluate(&mut self) {
        if self.outcomes.len() < self.config.min_calls {
            return;
        }

        let failures = self.outcomes.iter().filter(|(_, ok)| !ok).count();
        let rate = failures as f64 / self.outcomes.len() as f64;

        if rate >= self.config.error_threshold {
            tracing::warn!(
                error_rate = rate,
                calls = self.outcomes.len(),
                "Session store circuit opened"
            );
            self.open();
        }
    }

    fn open(&mut self) {
        self.state = BreakerState::Open;
        self.opened_at = Some(Instant::now());
        self.outcomes.clear();
    }

    fn maybe_enter_half_open(&mut self) {
        if self.state != BreakerState::Open {
            return;
        }
        if let Some(opened_at) = self.opened_at {
            if opened_at.elapsed() >= self.config.reset_timeout {
                tracing::info!("Session store circuit half-open: admitting trial call");
                self.state = BreakerState::HalfOpen;
            }
        }
    }

    /// Takes the half-open trial slot if it is available
    ///
    /// Returns `true` exactly once per open -> half-open transition; the
    /// caller owning the trial must report its outcome via
    /// [`record_success`](Self::record_success) or
    /// [`record_failure`](Self::record_failure).
    pub fn try_acquire_trial(&mut self) -> bool {
        self.maybe_enter_half_open();

        if self.state == BreakerState::Open {
            return false;
        }
        if self.state == BreakerState::HalfOpen {
            // First caller after the transition gets the slot
            if self.opened_at.is_some() {
                self.opened_at = None;
                return true;
            }
            return false;
        }
        true
    }
}

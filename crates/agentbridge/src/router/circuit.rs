use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
	Closed,
	Open,
	HalfOpen,
}

/// Per-backend circuit breaker state machine (§4.4). `closed → open` on
/// `consecutive_failures ≥ threshold`; `open → half-open` after
/// `timeout` elapses past `opened_at`; `half-open → closed` on success,
/// `half-open → open` on failure.
#[derive(Debug)]
pub struct CircuitBreaker {
	state: CircuitState,
	consecutive_failures: u32,
	opened_at: Option<Instant>,
	threshold: u32,
	timeout: Duration,
}

impl CircuitBreaker {
	pub fn new(threshold: u32, timeout: Duration) -> Self {
		Self { state: CircuitState::Closed, consecutive_failures: 0, opened_at: None, threshold, timeout }
	}

	/// Whether a request may currently be dispatched. `Open` transitions
	/// itself to `HalfOpen` as a side effect of this check once the timeout
	/// has elapsed — the one probe that follows decides `closed` vs `open`.
	pub fn allow(&mut self) -> bool {
		match self.state {
			CircuitState::Closed | CircuitState::HalfOpen => true,
			CircuitState::Open => {
				let elapsed = self.opened_at.map(|t| t.elapsed()).unwrap_or_default();
				if elapsed > self.timeout {
					self.state = CircuitState::HalfOpen;
					true
				} else {
					false
				}
			},
		}
	}

	pub fn record_success(&mut self) {
		self.consecutive_failures = 0;
		self.state = CircuitState::Closed;
		self.opened_at = None;
	}

	pub fn record_failure(&mut self) {
		self.consecutive_failures += 1;
		match self.state {
			CircuitState::HalfOpen => {
				self.state = CircuitState::Open;
				self.opened_at = Some(Instant::now());
			},
			CircuitState::Closed if self.consecutive_failures >= self.threshold => {
				self.state = CircuitState::Open;
				self.opened_at = Some(Instant::now());
			},
			_ => {},
		}
	}

	pub fn state(&self) -> CircuitState {
		self.state
	}

	pub fn consecutive_failures(&self) -> u32 {
		self.consecutive_failures
	}

	pub fn is_available(&self) -> bool {
		!matches!(self.state, CircuitState::Open)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn opens_after_threshold_failures() {
		let mut cb = CircuitBreaker::new(3, Duration::from_secs(60));
		for _ in 0..2 {
			cb.record_failure();
			assert_eq!(cb.state(), CircuitState::Closed);
		}
		cb.record_failure();
		assert_eq!(cb.state(), CircuitState::Open);
	}

	#[test]
	fn half_open_closes_on_success_and_reopens_on_failure() {
		let mut cb = CircuitBreaker::new(1, Duration::from_millis(0));
		cb.record_failure();
		assert_eq!(cb.state(), CircuitState::Open);
		assert!(cb.allow());
		assert_eq!(cb.state(), CircuitState::HalfOpen);
		cb.record_success();
		assert_eq!(cb.state(), CircuitState::Closed);

		cb.record_failure();
		assert!(cb.allow());
		assert_eq!(cb.state(), CircuitState::HalfOpen);
		cb.record_failure();
		assert_eq!(cb.state(), CircuitState::Open);
	}

	#[test]
	fn open_blocks_until_timeout_elapses() {
		let mut cb = CircuitBreaker::new(1, Duration::from_secs(60));
		cb.record_failure();
		assert!(!cb.allow());
	}
}

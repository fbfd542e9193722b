use std::collections::VecDeque;

/// Bounded latency sample ring (≤100 entries, oldest evicted on push) shared
/// by the Bridge's and the Router's statistics, per §4.3/§4.4. Percentiles
/// are computed on demand from a sorted copy rather than maintained
/// incrementally — sample counts are small enough (≤100) that this is
/// cheaper than a streaming-percentile structure.
#[derive(Debug, Default)]
pub struct LatencyRing {
	samples: VecDeque<u64>,
	capacity: usize,
}

impl LatencyRing {
	pub fn new(capacity: usize) -> Self {
		Self { samples: VecDeque::with_capacity(capacity), capacity }
	}

	pub fn push(&mut self, latency_ms: u64) {
		if self.samples.len() >= self.capacity {
			self.samples.pop_front();
		}
		self.samples.push_back(latency_ms);
	}

	pub fn average(&self) -> f64 {
		if self.samples.is_empty() {
			return 0.0;
		}
		self.samples.iter().sum::<u64>() as f64 / self.samples.len() as f64
	}

	pub fn percentile(&self, p: f64) -> u64 {
		if self.samples.is_empty() {
			return 0;
		}
		let mut sorted: Vec<u64> = self.samples.iter().copied().collect();
		sorted.sort_unstable();
		let idx = ((p / 100.0) * (sorted.len() as f64 - 1.0)).round() as usize;
		sorted[idx.min(sorted.len() - 1)]
	}

	pub fn len(&self) -> usize {
		self.samples.len()
	}

	pub fn is_empty(&self) -> bool {
		self.samples.is_empty()
	}
}

/// Terminal-outcome counters plus a latency ring, the shape both `Bridge`
/// and per-backend `BackendState` use for their statistics.
#[derive(Debug, Default)]
pub struct Counters {
	pub total_requests: u64,
	pub successful_requests: u64,
	pub failed_requests: u64,
	pub total_cost: f64,
	latencies: LatencyRing,
}

impl Counters {
	pub fn new() -> Self {
		Self { total_requests: 0, successful_requests: 0, failed_requests: 0, total_cost: 0.0, latencies: LatencyRing::new(100) }
	}

	pub fn record_success(&mut self, latency_ms: u64) {
		self.total_requests += 1;
		self.successful_requests += 1;
		self.latencies.push(latency_ms);
	}

	pub fn record_failure(&mut self) {
		self.total_requests += 1;
		self.failed_requests += 1;
	}

	pub fn success_rate(&self) -> f64 {
		if self.total_requests == 0 {
			return 0.0;
		}
		self.successful_requests as f64 / self.total_requests as f64
	}

	pub fn average_latency_ms(&self) -> f64 {
		self.latencies.average()
	}

	pub fn percentile_latency_ms(&self, p: f64) -> u64 {
		self.latencies.percentile(p)
	}
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StatsSnapshot {
	pub total_requests: u64,
	pub successful_requests: u64,
	pub failed_requests: u64,
	pub success_rate: f64,
	pub average_latency_ms: f64,
	pub p50_latency_ms: u64,
	pub p95_latency_ms: u64,
	pub p99_latency_ms: u64,
}

impl From<&Counters> for StatsSnapshot {
	fn from(c: &Counters) -> Self {
		Self {
			total_requests: c.total_requests,
			successful_requests: c.successful_requests,
			failed_requests: c.failed_requests,
			success_rate: c.success_rate(),
			average_latency_ms: c.average_latency_ms(),
			p50_latency_ms: c.percentile_latency_ms(50.0),
			p95_latency_ms: c.percentile_latency_ms(95.0),
			p99_latency_ms: c.percentile_latency_ms(99.0),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ring_evicts_oldest_past_capacity() {
		let mut ring = LatencyRing::new(3);
		for v in [10, 20, 30, 40] {
			ring.push(v);
		}
		assert_eq!(ring.len(), 3);
		assert_eq!(ring.percentile(0.0), 20);
	}

	#[test]
	fn counters_track_success_rate() {
		let mut c = Counters::new();
		c.record_success(100);
		c.record_success(200);
		c.record_failure();
		assert_eq!(c.total_requests, 3);
		assert!((c.success_rate() - (2.0 / 3.0)).abs() < 1e-9);
	}
}

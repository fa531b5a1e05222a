use std::time::{Duration, Instant};

/// Fixed-period schedule. Ticks that could not start on time because the
/// previous one was still running are dropped rather than queued.
pub struct Ticker {
	period: Duration,
	deadline: Instant,
}

impl Ticker {
	// The first tick is due immediately.
	pub fn new(period: Duration, start: Instant) -> Self {
		Self{
			period: period,
			deadline: start,
		}
	}

	pub fn due(&self, now: Instant) -> bool {
		now >= self.deadline
	}

	pub fn remaining(&self, now: Instant) -> Duration {
		self.deadline.saturating_duration_since(now)
	}

	/// Call once a tick has finished. Moves the deadline to the next slot
	/// still in the future and returns how many slots were missed.
	pub fn advance(&mut self, now: Instant) -> u32 {
		let mut next = self.deadline + self.period;
		let mut skipped = 0;
		while next <= now {
			next += self.period;
			skipped += 1;
		}
		self.deadline = next;
		skipped
	}
}

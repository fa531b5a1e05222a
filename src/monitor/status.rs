use std::fmt;

use serde::Serialize;

use crate::signals::Signals;

/// What the monitor reports after each tick.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
	pub timestamp: u64,
	pub face_count: usize,
	pub head_movement: bool,
	pub talking: bool,
	pub attentive: bool,
	// Simulated, not sensed
	#[serde(skip_serializing_if = "Option::is_none")]
	pub other_devices: Option<u32>,
	pub skipped_ticks: u32,
	pub labels: Vec<String>,
}

impl Status {
	pub fn new(timestamp: u64, signals: Signals) -> Self {
		Self{
			timestamp: timestamp,
			face_count: signals.face_count,
			head_movement: signals.head_movement,
			talking: signals.talking,
			attentive: signals.attentive,
			..Self::default()
		}
	}

	pub fn head_movement_text(&self) -> &'static str {
		if self.head_movement { "Moved Head" } else { "No Movement" }
	}

	pub fn talking_text(&self) -> &'static str {
		if self.talking { "Yes" } else { "No" }
	}

	pub fn attentive_text(&self) -> &'static str {
		if self.attentive { "Yes" } else { "No" }
	}
}

impl fmt::Display for Status {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Faces detected: {} | Head Movement: {} | Talking: {} | Attentive: {}",
			self.face_count,
			self.head_movement_text(),
			self.talking_text(),
			self.attentive_text())?;
		if let Some(n) = self.other_devices {
			write!(f, " | Other devices: {}", n)?;
		}
		Ok(())
	}
}

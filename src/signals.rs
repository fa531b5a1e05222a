//! Threshold heuristics over the landmarks of one tick.
//!
//! Head movement and talking compare the first detected face against the
//! values remembered from the last tick that saw a face. Attentiveness looks
//! at every face independently.

use crate::detector::{Detection, Point};
use crate::facewatch::Config;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
	/// Nose travel in pixels that counts as moving the head.
	pub head_movement: f64,
	/// Change in mouth opening in pixels that counts as talking.
	pub talking: f64,
	/// Eye span over face width above which the face is turned to the camera.
	pub attentive_ratio: f64,
}

impl Default for Thresholds {
	fn default() -> Self {
		Self{
			head_movement: 40.0,
			talking: 5.0,
			attentive_ratio: 0.2,
		}
	}
}

impl Thresholds {
	pub fn from_config(config: &Config) -> Self {
		Self{
			head_movement: config.head_movement_threshold,
			talking: config.talking_threshold,
			attentive_ratio: config.attentive_ratio,
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Signals {
	pub face_count: usize,
	pub head_movement: bool,
	pub talking: bool,
	pub attentive: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HeuristicState {
	previous_nose: Point,
	previous_mouth_openness: f64,
}

impl HeuristicState {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn previous_nose(&self) -> Point {
		self.previous_nose
	}

	pub fn previous_mouth_openness(&self) -> f64 {
		self.previous_mouth_openness
	}

	pub fn derive(&mut self, detections: &[Detection], thresholds: &Thresholds) -> Signals {
		let mut signals = Signals{
			face_count: detections.len(),
			attentive: detections.iter()
				.any(|d| eye_span_ratio(d) > thresholds.attentive_ratio),
			..Signals::default()
		};

		// No face: keep the last-seen values for the next comparison
		let first = match detections.first() {
			Some(d) => d,
			None => return signals,
		};

		let nose = first.landmarks.nose()[0];
		signals.head_movement =
			nose.distance(&self.previous_nose) > thresholds.head_movement;
		self.previous_nose = nose;

		let openness = mouth_openness(first);
		signals.talking =
			(openness - self.previous_mouth_openness).abs() > thresholds.talking;
		self.previous_mouth_openness = openness;

		signals
	}
}

/// Vertical gap between the inner upper and lower lip centres.
pub fn mouth_openness(detection: &Detection) -> f64 {
	let mouth = detection.landmarks.mouth();
	(mouth[14].y - mouth[18].y).abs()
}

/// Outer eye-corner distance normalized by face width.
pub fn eye_span_ratio(detection: &Detection) -> f64 {
	let left = detection.landmarks.left_eye()[0];
	let right = detection.landmarks.right_eye()[3];
	if detection.bbox.width <= 0.0 {
		return 0.0;
	}
	left.distance(&right) / detection.bbox.width
}

use log::warn;
use rand::Rng;

use crate::detector::FaceDetector;
use crate::errors::*;
use crate::frame::Frame;
use crate::overlay::OverlayRenderer;
use crate::signals::{HeuristicState, Thresholds};

use super::status::Status;

// Upper bound of the simulated other-device count
const MAX_SIMULATED_DEVICES: u32 = 2;

/// Everything one tick does with a frame: detect, derive, draw.
pub struct Pipeline {
	detector: Box<dyn FaceDetector>,
	state: HeuristicState,
	thresholds: Thresholds,
	overlay: Option<OverlayRenderer>,
	display_size: (u32, u32),
	simulate_other_devices: bool,
}

impl Pipeline {
	pub fn new(detector: Box<dyn FaceDetector>, thresholds: Thresholds) -> Self {
		Self{
			detector: detector,
			state: HeuristicState::new(),
			thresholds: thresholds,
			overlay: None,
			display_size: (0, 0),
			simulate_other_devices: false,
		}
	}

	pub fn with_overlay(mut self, overlay: OverlayRenderer, display_size: (u32, u32)) -> Self {
		self.overlay = Some(overlay);
		self.display_size = display_size;
		self
	}

	pub fn simulate_other_devices(mut self, enabled: bool) -> Self {
		self.simulate_other_devices = enabled;
		self
	}

	pub fn state(&self) -> &HeuristicState {
		&self.state
	}

	pub fn process(&mut self, frame: &Frame) -> Result<Status> {
		let detections = self.detector.detect(frame)?;
		let signals = self.state.derive(&detections, &self.thresholds);
		let mut status = Status::new(frame.timestamp(), signals);

		// The overlay is cosmetic, a failed write never costs the tick
		if let Some(ref mut overlay) = self.overlay {
			status.labels = overlay.render(frame.size(), self.display_size, &detections)
				.into_iter()
				.map(|l| l.text)
				.collect();
			if let Err(e) = overlay.save() {
				warn!(error:% = e; "couldn't write overlay");
			}
		}

		if self.simulate_other_devices {
			status.other_devices = Some(
				rand::thread_rng().gen_range(0..=MAX_SIMULATED_DEVICES));
		}

		Ok(status)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::detector::Detection;
	use crate::signals::fixtures::face;
	use std::collections::VecDeque;

	struct Scripted(VecDeque<Result<Vec<Detection>>>);

	impl FaceDetector for Scripted {
		fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
			self.0.pop_front().unwrap_or_else(|| Ok(vec![]))
		}
	}

	fn frame(ts: u64) -> Frame {
		Frame::new(vec![0; 640 * 480], 640, 480, ts)
	}

	#[test]
	fn process_reports_count_and_flags() {
		let script = VecDeque::from(vec![
			Ok(vec![face((100.0, 100.0), 10.0, 10.0, 100.0)]),
			Ok(vec![
				face((200.0, 100.0), 2.0, 30.0, 100.0),
				face((400.0, 100.0), 0.0, 5.0, 100.0),
			]),
		]);
		let mut pipeline = Pipeline::new(Box::new(Scripted(script)),
			Thresholds::default());

		pipeline.process(&frame(1)).unwrap();
		let status = pipeline.process(&frame(2)).unwrap();

		assert_eq!(status.timestamp, 2);
		assert_eq!(status.face_count, 2);
		assert!(status.head_movement);
		assert!(status.talking);
		assert!(status.attentive);
		assert_eq!(status.other_devices, None);
	}

	#[test]
	fn detector_error_leaves_state_untouched() {
		let script = VecDeque::from(vec![
			Ok(vec![face((100.0, 100.0), 0.0, 10.0, 100.0)]),
			Err(Box::new(Error::ModelOutput("boom".to_string()))
				as Box<dyn std::error::Error>),
		]);
		let mut pipeline = Pipeline::new(Box::new(Scripted(script)),
			Thresholds::default());

		pipeline.process(&frame(1)).unwrap();
		assert!(pipeline.process(&frame(2)).is_err());
		assert_eq!(pipeline.state().previous_nose().x, 100.0);
	}

	#[test]
	fn simulated_devices_stay_in_range() {
		let mut pipeline = Pipeline::new(Box::new(Scripted(VecDeque::new())),
			Thresholds::default())
			.simulate_other_devices(true);

		for ts in 0..20 {
			let n = pipeline.process(&frame(ts)).unwrap().other_devices.unwrap();
			assert!(n <= MAX_SIMULATED_DEVICES);
		}
	}

	#[test]
	fn overlay_labels_reach_status() {
		let mut d = face((100.0, 100.0), 0.0, 10.0, 100.0);
		d.expressions = crate::detector::Expressions::new(
			[0.9, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0]);
		let script = VecDeque::from(vec![Ok(vec![d])]);
		let mut pipeline = Pipeline::new(Box::new(Scripted(script)),
			Thresholds::default())
			.with_overlay(OverlayRenderer::new(None), (720, 560));

		let status = pipeline.process(&frame(1)).unwrap();
		assert_eq!(status.labels, vec!["neutral (0.90)".to_string()]);
	}

	#[test]
	fn unwritable_overlay_still_reports_status() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("missing").join("overlay.png");
		let script = VecDeque::from(vec![
			Ok(vec![face((100.0, 100.0), 10.0, 10.0, 100.0)]),
			Ok(vec![face((200.0, 100.0), 10.0, 10.0, 100.0)]),
		]);
		let mut pipeline = Pipeline::new(Box::new(Scripted(script)),
			Thresholds::default())
			.with_overlay(OverlayRenderer::new(Some(path)), (720, 560));

		let first = pipeline.process(&frame(1)).unwrap();
		assert_eq!(first.face_count, 1);
		let second = pipeline.process(&frame(2)).unwrap();
		assert!(second.head_movement);
		assert_eq!(pipeline.state().previous_nose().x, 200.0);
	}
}

use std::path::Path;

use log::info;

use crate::errors::*;
use crate::frame::Frame;

pub mod crop;
pub mod detection;
pub mod expressions;
pub mod landmarks;
pub mod seeta;

pub use detection::{BoundingBox, Detection, Expressions, Landmarks, Point};

use expressions::OnnxExpressionClassifier;
use landmarks::OnnxLandmarker;
use seeta::SeetaDetector;

/// Face detection with landmarks and expressions.
///
/// Implementations may keep state between frames, hence `&mut self`.
pub trait FaceDetector {
	fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>>;
}

/// The three pretrained networks, loaded from fixed names in one directory.
pub struct ModelStack {
	faces: SeetaDetector,
	landmarker: OnnxLandmarker,
	expressions: OnnxExpressionClassifier,
}

impl ModelStack {
	pub fn load(model_dir: &Path) -> Result<Self> {
		info!(model_dir:? = model_dir; "loading models");

		let faces = SeetaDetector::load(&model_dir.join(seeta::MODEL_NAME))?;
		let landmarker = OnnxLandmarker::load(&model_dir.join(landmarks::MODEL_NAME))?;
		let expressions = OnnxExpressionClassifier::load(
			&model_dir.join(expressions::MODEL_NAME))?;

		info!("models loaded");
		Ok(Self{
			faces: faces,
			landmarker: landmarker,
			expressions: expressions,
		})
	}
}

impl FaceDetector for ModelStack {
	fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
		let mut detections = vec![];
		for (bbox, score) in self.faces.boxes(frame) {
			let landmarks = self.landmarker.landmarks(frame, &bbox)?;
			let expressions = self.expressions.classify(frame, &bbox)?;
			detections.push(Detection{
				score: score,
				bbox: bbox,
				landmarks: landmarks,
				expressions: expressions,
			});
		}
		Ok(detections)
	}
}

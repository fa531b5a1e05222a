use std::path::Path;

use rustface::{Detector, ImageData};

use crate::errors::*;
use crate::frame::Frame;

use super::detection::BoundingBox;

pub const MODEL_NAME: &str = "seeta_fd_frontal_v1.0.bin";

const MIN_FACE_SIZE: u32 = 40;
const SCORE_THRESH: f64 = 2.0;
const PYRAMID_SCALE: f32 = 0.8;
const WINDOW_STEP: u32 = 4;

/// SeetaFace frontal detector. Produces boxes only; landmarks and
/// expressions are layered on by the other networks.
pub struct SeetaDetector {
	detector: Box<dyn Detector>,
}

impl SeetaDetector {
	pub fn load(path: &Path) -> Result<Self> {
		let path = path.to_str()
			.ok_or_else(|| format!("{:?} is not utf-8", path))?;
		let mut detector = rustface::create_detector(path)
			.map_err(|e| format!("{}: {}", path, e))?;

		detector.set_min_face_size(MIN_FACE_SIZE);
		detector.set_score_thresh(SCORE_THRESH);
		detector.set_pyramid_scale_factor(PYRAMID_SCALE);
		detector.set_slide_window_step(WINDOW_STEP, WINDOW_STEP);

		Ok(Self{detector: detector})
	}

	/// Face boxes in frame pixels, highest score first.
	pub fn boxes(&mut self, frame: &Frame) -> Vec<(BoundingBox, f64)> {
		let mut image = ImageData::new(frame.luma(), frame.width(), frame.height());
		let mut faces: Vec<(BoundingBox, f64)> = self.detector.detect(&mut image)
			.iter()
			.map(|face| {
				let b = face.bbox();
				(BoundingBox::new(b.x() as f64, b.y() as f64,
					b.width() as f64, b.height() as f64), face.score())
			})
			.collect();

		faces.sort_by(|a, b| b.1.partial_cmp(&a.1)
			.unwrap_or(std::cmp::Ordering::Equal));
		faces
	}
}

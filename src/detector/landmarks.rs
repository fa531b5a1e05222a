/// 68-point landmark regressor using ONNX Runtime via `ort`.
///
/// Takes a face crop resized to 112x112 (3 channels, [0,1]) and returns 136
/// values: x/y pairs normalized to the crop.
use std::path::Path;

use crate::errors::*;
use crate::frame::Frame;

use super::crop::crop_tensor;
use super::detection::{BoundingBox, Landmarks, Point, LANDMARK_COUNT};

pub const MODEL_NAME: &str = "landmarks_68.onnx";

const INPUT_SIZE: usize = 112;

pub struct OnnxLandmarker {
	session: ort::session::Session,
}

impl OnnxLandmarker {
	pub fn load(path: &Path) -> Result<Self> {
		let session = ort::session::Session::builder()?.commit_from_file(path)?;
		Ok(Self{session: session})
	}

	pub fn landmarks(&mut self, frame: &Frame, bbox: &BoundingBox) -> Result<Landmarks> {
		let input = crop_tensor(frame, bbox, INPUT_SIZE, 3);
		let input_value = ort::value::Tensor::from_array(input)?;
		let outputs = self.session.run(ort::inputs![input_value])?;

		let coords = outputs[0].try_extract_array::<f32>()?;
		let coords = coords.as_slice()
			.ok_or_else(|| Error::ModelOutput("landmark output not contiguous".to_string()))?;
		decode(coords, bbox)
	}
}

/// Map crop-normalized x/y pairs back into frame pixels.
pub fn decode(coords: &[f32], bbox: &BoundingBox) -> Result<Landmarks> {
	if coords.len() < LANDMARK_COUNT * 2 {
		return Err(Box::new(Error::ModelOutput(format!(
			"landmark model returned {} values", coords.len()))));
	}

	let points = coords.chunks_exact(2)
		.take(LANDMARK_COUNT)
		.map(|xy| Point::new(
			bbox.x + xy[0] as f64 * bbox.width,
			bbox.y + xy[1] as f64 * bbox.height,
		))
		.collect();
	Landmarks::new(points)
}

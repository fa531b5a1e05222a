/// Facial expression classifier using ONNX Runtime via `ort`.
///
/// Input is a 64x64 single-channel crop in [0,1]; output is one logit per
/// entry of [`EXPRESSIONS`].
use std::path::Path;

use crate::errors::*;
use crate::frame::Frame;

use super::crop::crop_tensor;
use super::detection::{BoundingBox, Expressions, EXPRESSIONS};

pub const MODEL_NAME: &str = "expressions.onnx";

const INPUT_SIZE: usize = 64;

pub struct OnnxExpressionClassifier {
	session: ort::session::Session,
}

impl OnnxExpressionClassifier {
	pub fn load(path: &Path) -> Result<Self> {
		let session = ort::session::Session::builder()?.commit_from_file(path)?;
		Ok(Self{session: session})
	}

	pub fn classify(&mut self, frame: &Frame, bbox: &BoundingBox) -> Result<Expressions> {
		let input = crop_tensor(frame, bbox, INPUT_SIZE, 1);
		let input_value = ort::value::Tensor::from_array(input)?;
		let outputs = self.session.run(ort::inputs![input_value])?;

		let logits = outputs[0].try_extract_array::<f32>()?;
		let logits = logits.as_slice()
			.ok_or_else(|| Error::ModelOutput("expression output not contiguous".to_string()))?;
		decode(logits)
	}
}

pub fn decode(logits: &[f32]) -> Result<Expressions> {
	if logits.len() < EXPRESSIONS.len() {
		return Err(Box::new(Error::ModelOutput(format!(
			"expression model returned {} values", logits.len()))));
	}

	let mut scores = [0.0f32; 7];
	scores.copy_from_slice(&logits[..EXPRESSIONS.len()]);
	softmax(&mut scores);
	Ok(Expressions::new(scores))
}

fn softmax(values: &mut [f32]) {
	let max = values.iter().copied().fold(f32::MIN, f32::max);
	let mut sum = 0.0;
	for v in values.iter_mut() {
		*v = (*v - max).exp();
		sum += *v;
	}
	for v in values.iter_mut() {
		*v /= sum;
	}
}

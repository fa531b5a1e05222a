use ndarray::Array4;

use crate::frame::Frame;

use super::detection::BoundingBox;

/// Crop `bbox` out of the frame and resize it to `size × size` with
/// nearest-neighbour sampling, normalized to [0,1] NCHW float32.
/// The luma plane is repeated across `channels`.
pub fn crop_tensor(frame: &Frame, bbox: &BoundingBox, size: usize, channels: usize)
	-> Array4<f32> {

	let mut tensor = Array4::<f32>::zeros((1, channels, size, size));
	let sx = bbox.width / size as f64;
	let sy = bbox.height / size as f64;

	for y in 0..size {
		let src_y = (bbox.y + (y as f64 + 0.5) * sy).floor() as i64;
		for x in 0..size {
			let src_x = (bbox.x + (x as f64 + 0.5) * sx).floor() as i64;
			let v = frame.sample(src_x, src_y) as f32 / 255.0;
			for c in 0..channels {
				tensor[[0, c, y, x]] = v;
			}
		}
	}

	tensor
}

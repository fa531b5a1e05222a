//! Draws the current detections onto a transparent canvas the size of the
//! display, the way an overlay sits on top of the live video.

use std::path::PathBuf;

use image::{Rgba, RgbaImage};

use crate::detector::{BoundingBox, Detection, Point};
use crate::errors::*;

const BOX_COLOUR: Rgba<u8> = Rgba([0, 120, 255, 255]);
const LANDMARK_COLOUR: Rgba<u8> = Rgba([0, 255, 120, 255]);
const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);
const LINE_WIDTH: u32 = 2;
const LANDMARK_RADIUS: i64 = 1;

/// Expressions at or below this probability get no label.
pub const LABEL_MIN_SCORE: f32 = 0.1;

#[derive(Clone, Debug, PartialEq)]
pub struct Label {
	pub text: String,
	pub anchor: Point,
}

/// Rescale detections from frame pixels to display pixels.
pub fn resize_detections(detections: &[Detection],
						 frame_size: (u32, u32),
						 display_size: (u32, u32)) -> Vec<Detection> {
	if frame_size.0 == 0 || frame_size.1 == 0 {
		return detections.to_vec();
	}
	let sx = display_size.0 as f64 / frame_size.0 as f64;
	let sy = display_size.1 as f64 / frame_size.1 as f64;
	detections.iter().map(|d| d.scale(sx, sy)).collect()
}

/// One label per expression above [`LABEL_MIN_SCORE`], strongest first,
/// anchored under the face box.
pub fn expression_labels(detection: &Detection) -> Vec<Label> {
	let mut scored: Vec<(&str, f32)> = detection.expressions.iter()
		.filter(|(_, score)| *score > LABEL_MIN_SCORE)
		.collect();
	scored.sort_by(|a, b| b.1.partial_cmp(&a.1)
		.unwrap_or(std::cmp::Ordering::Equal));

	let anchor = Point::new(detection.bbox.x, detection.bbox.bottom());
	scored.into_iter()
		.map(|(name, score)| Label{
			text: format!("{} ({:.2})", name, score),
			anchor: anchor,
		})
		.collect()
}

pub struct OverlayRenderer {
	canvas: RgbaImage,
	path: Option<PathBuf>,
}

impl OverlayRenderer {
	/// The canvas is sized on the first render.
	pub fn new(path: Option<PathBuf>) -> Self {
		Self{
			canvas: RgbaImage::new(0, 0),
			path: path,
		}
	}

	pub fn canvas(&self) -> &RgbaImage {
		&self.canvas
	}

	/// Redraw the canvas for this tick and return the expression labels.
	pub fn render(&mut self,
				  frame_size: (u32, u32),
				  display_size: (u32, u32),
				  detections: &[Detection]) -> Vec<Label> {

		// Match the canvas to the display before drawing
		if self.canvas.dimensions() != display_size {
			self.canvas = RgbaImage::from_pixel(display_size.0, display_size.1, CLEAR);
		} else {
			for p in self.canvas.pixels_mut() {
				*p = CLEAR;
			}
		}

		let resized = resize_detections(detections, frame_size, display_size);
		let mut labels = vec![];
		for d in resized.iter() {
			draw_box(&mut self.canvas, &d.bbox);
			for p in d.landmarks.points() {
				draw_point(&mut self.canvas, p);
			}
			labels.extend(expression_labels(d));
		}
		labels
	}

	/// Write the canvas as PNG, if an output path was given.
	pub fn save(&self) -> Result<()> {
		if let Some(ref path) = self.path {
			self.canvas.save(path)?;
		}
		Ok(())
	}
}

fn put(canvas: &mut RgbaImage, x: i64, y: i64, colour: Rgba<u8>) {
	if x < 0 || y < 0 {
		return;
	}
	let (x, y) = (x as u32, y as u32);
	if x < canvas.width() && y < canvas.height() {
		canvas.put_pixel(x, y, colour);
	}
}

fn draw_box(canvas: &mut RgbaImage, bbox: &BoundingBox) {
	let x0 = bbox.x.round() as i64;
	let y0 = bbox.y.round() as i64;
	let x1 = bbox.right().round() as i64;
	let y1 = bbox.bottom().round() as i64;

	for t in 0..LINE_WIDTH as i64 {
		for x in x0..=x1 {
			put(canvas, x, y0 + t, BOX_COLOUR);
			put(canvas, x, y1 - t, BOX_COLOUR);
		}
		for y in y0..=y1 {
			put(canvas, x0 + t, y, BOX_COLOUR);
			put(canvas, x1 - t, y, BOX_COLOUR);
		}
	}
}

fn draw_point(canvas: &mut RgbaImage, p: &Point) {
	let cx = p.x.round() as i64;
	let cy = p.y.round() as i64;
	for dy in -LANDMARK_RADIUS..=LANDMARK_RADIUS {
		for dx in -LANDMARK_RADIUS..=LANDMARK_RADIUS {
			put(canvas, cx + dx, cy + dy, LANDMARK_COLOUR);
		}
	}
}

use serde::Serialize;

use crate::errors::*;

/// Points in the iBUG 68-point layout.
pub const LANDMARK_COUNT: usize = 68;

const NOSE: std::ops::Range<usize> = 27..36;
const LEFT_EYE: std::ops::Range<usize> = 36..42;
const RIGHT_EYE: std::ops::Range<usize> = 42..48;
const MOUTH: std::ops::Range<usize> = 48..68;

/// Expression labels in the order the classifier emits them.
pub const EXPRESSIONS: [&str; 7] = [
	"neutral",
	"happy",
	"sad",
	"angry",
	"fearful",
	"disgusted",
	"surprised",
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

impl Point {
	pub fn new(x: f64, y: f64) -> Self {
		Self{x: x, y: y}
	}

	pub fn distance(&self, other: &Point) -> f64 {
		((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
	}

	pub fn scale(&self, sx: f64, sy: f64) -> Self {
		Self::new(self.x * sx, self.y * sy)
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct BoundingBox {
	pub x: f64,
	pub y: f64,
	pub width: f64,
	pub height: f64,
}

impl BoundingBox {
	pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
		Self{x: x, y: y, width: width, height: height}
	}

	pub fn right(&self) -> f64 {
		self.x + self.width
	}

	pub fn bottom(&self) -> f64 {
		self.y + self.height
	}

	pub fn scale(&self, sx: f64, sy: f64) -> Self {
		Self::new(self.x * sx, self.y * sy, self.width * sx, self.height * sy)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Landmarks {
	points: Vec<Point>,
}

impl Landmarks {
	pub fn new(points: Vec<Point>) -> Result<Self> {
		if points.len() != LANDMARK_COUNT {
			return Err(Box::new(Error::ModelOutput(format!(
				"expected {} landmarks, got {}", LANDMARK_COUNT, points.len()))));
		}
		Ok(Self{points: points})
	}

	pub fn points(&self) -> &[Point] {
		&self.points
	}

	pub fn nose(&self) -> &[Point] {
		&self.points[NOSE]
	}

	pub fn left_eye(&self) -> &[Point] {
		&self.points[LEFT_EYE]
	}

	pub fn right_eye(&self) -> &[Point] {
		&self.points[RIGHT_EYE]
	}

	pub fn mouth(&self) -> &[Point] {
		&self.points[MOUTH]
	}

	pub fn scale(&self, sx: f64, sy: f64) -> Self {
		Self{
			points: self.points.iter().map(|p| p.scale(sx, sy)).collect(),
		}
	}
}

/// Per-expression probabilities, indexed like [`EXPRESSIONS`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Expressions {
	scores: [f32; 7],
}

impl Expressions {
	pub fn new(scores: [f32; 7]) -> Self {
		Self{scores: scores}
	}

	pub fn scores(&self) -> &[f32; 7] {
		&self.scores
	}

	pub fn iter(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
		EXPRESSIONS.iter().copied().zip(self.scores.iter().copied())
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Detection {
	pub score: f64,
	pub bbox: BoundingBox,
	pub landmarks: Landmarks,
	pub expressions: Expressions,
}

impl Detection {
	pub fn scale(&self, sx: f64, sy: f64) -> Self {
		Self{
			score: self.score,
			bbox: self.bbox.scale(sx, sy),
			landmarks: self.landmarks.scale(sx, sy),
			expressions: self.expressions,
		}
	}
}

/// A captured webcam picture reduced to 8-bit luma, row-major.
///
/// The detectors only consume grey-scale input, so the colour planes are
/// dropped at the capture boundary.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
	luma: Vec<u8>,
	width: u32,
	height: u32,
	timestamp: u64,
}

impl Frame {
	pub fn new(luma: Vec<u8>, width: u32, height: u32, timestamp: u64) -> Self {
		debug_assert_eq!(luma.len(), (width as usize) * (height as usize),
			"luma length must equal width * height");
		Self{
			luma: luma,
			width: width,
			height: height,
			timestamp: timestamp,
		}
	}

	/// YUYV packs two pixels into four bytes as Y0 U Y1 V, so every
	/// even byte is a luma sample.
	pub fn from_yuyv(raw: &[u8], width: u32, height: u32, timestamp: u64) -> Self {
		let luma = raw.iter()
			.step_by(2)
			.copied()
			.take((width as usize) * (height as usize))
			.collect();
		Self::new(luma, width, height, timestamp)
	}

	pub fn luma(&self) -> &[u8] {
		&self.luma
	}

	pub fn width(&self) -> u32 {
		self.width
	}

	pub fn height(&self) -> u32 {
		self.height
	}

	pub fn size(&self) -> (u32, u32) {
		(self.width, self.height)
	}

	pub fn timestamp(&self) -> u64 {
		self.timestamp
	}

	/// Luma at (x, y), clamped to the frame edges.
	pub fn sample(&self, x: i64, y: i64) -> u8 {
		let x = x.max(0).min(self.width as i64 - 1) as usize;
		let y = y.max(0).min(self.height as i64 - 1) as usize;
		self.luma[y * self.width as usize + x]
	}
}

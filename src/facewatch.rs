use std::fs;
use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::errors::*;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
	pub webcam_device: String,
	pub webcam_interval: (u32, u32),
	pub webcam_resolution: (u32, u32),
	pub model_dir: String,
	// Milliseconds between detection ticks
	pub detect_interval: u64,
	pub display_size: (u32, u32),
	pub head_movement_threshold: f64,
	pub talking_threshold: f64,
	pub attentive_ratio: f64,
	pub simulate_other_devices: bool,
	pub overlay_path: Option<String>,
	pub relay_address: String,
	// Seconds of client silence before the relay drops it
	pub client_idle_timeout: u64,
	pub log_level: String,
}

impl Default for Config {
	fn default() -> Self {
		Self{
			webcam_device: "/dev/video0".to_string(),
			webcam_interval: (1, 30),
			webcam_resolution: (640, 480),
			model_dir: "models".to_string(),
			detect_interval: 1000,
			display_size: (720, 560),
			head_movement_threshold: 40.0,
			talking_threshold: 5.0,
			attentive_ratio: 0.2,
			simulate_other_devices: false,
			overlay_path: None,
			relay_address: "127.0.0.1:3001".to_string(),
			client_idle_timeout: 15,
			log_level: "info".to_string(),
		}
	}
}

impl Config {
	pub fn from_json(raw: &str) -> Result<Self> {
		let config: Config = serde_json::from_str(raw)?;
		config.validate()?;
		Ok(config)
	}

	pub fn load(path: &Path) -> Result<Self> {
		let raw = fs::read_to_string(path)?;
		Self::from_json(&raw)
	}

	fn validate(&self) -> Result<()> {
		if self.detect_interval == 0 {
			return Err(Box::new(Error::Config(
				"detectInterval must be positive".to_string())));
		}
		if self.display_size.0 == 0 || self.display_size.1 == 0 {
			return Err(Box::new(Error::Config(
				"displaySize must be non-empty".to_string())));
		}
		if self.webcam_resolution.0 == 0 || self.webcam_resolution.1 == 0 {
			return Err(Box::new(Error::Config(
				"webcamResolution must be non-empty".to_string())));
		}
		if let Some(ref path) = self.overlay_path {
			validate_overlay_path(Path::new(path))?;
		}
		Ok(())
	}
}

// Only PNG is encoded, and the directory must already exist
fn validate_overlay_path(path: &Path) -> Result<()> {
	let is_png = path.extension()
		.and_then(|ext| ext.to_str())
		.map(|ext| ext.eq_ignore_ascii_case("png"))
		.unwrap_or(false);
	if !is_png {
		return Err(Box::new(Error::Config(
			format!("overlayPath {:?} must end in .png", path))));
	}

	match path.parent() {
		Some(dir) if !dir.as_os_str().is_empty() && !dir.is_dir() => {
			Err(Box::new(Error::Config(
				format!("overlayPath directory {:?} does not exist", dir))))
		},
		_ => Ok(()),
	}
}

// Facewatch is the shared config passed around
// all threads.
pub struct Facewatch {
	pub config: Config,
}

impl Facewatch {
	pub fn new(config: Config) -> Self {
		Self{
			config: config,
		}
	}
}

use std::sync::Arc;
use std::thread::Builder;

use log::{info, error};
use rscam::Camera;

use crate::confchannel::Sender;
use crate::errors::*;
use crate::facewatch::Facewatch;
use crate::frame::Frame;

fn camera_error<E: std::fmt::Display>(e: E) -> Box<dyn std::error::Error> {
	Box::new(Error::CameraAccess(e.to_string()))
}

pub fn webcam(fw: &Facewatch, sender: Sender<Arc<Frame>>) -> Result<()> {
	let config = &fw.config;

	// Open the camera
	info!(
		webcam_device = config.webcam_device.as_str(),
		webcam_interval:? = config.webcam_interval,
		webcam_resolution:? = config.webcam_resolution;
		"opening camera"
	);
	let mut camera = Camera::new(&config.webcam_device)
		.map_err(camera_error)?;
	let rscam_config = rscam::Config{
		interval: config.webcam_interval,
		resolution: config.webcam_resolution,
		format: b"YUYV",
		nbuffers: 2,
		field: rscam::FIELD_NONE,
	};

	camera.start(&rscam_config).map_err(camera_error)?;

	// Check it's working
	for _ in 0..3 {
		camera.capture().map_err(camera_error)?;
	}

	let (width, height) = config.webcam_resolution;

	// Spawn the thread
	Builder::new()
		.name("webcam".to_string())
		.spawn(move || {
			info!("capture started");
			webcam_run(camera, width, height, sender);
		})?;

	Ok(())
}

fn webcam_run(camera: Camera,
			  width: u32,
			  height: u32,
			  sender: Sender<Arc<Frame>>) {

	capture_loop(|| {
		let raw = camera.capture().map_err(camera_error)?;
		Ok(Frame::from_yuyv(&raw[..], width, height, raw.get_timestamp()))
	}, sender);
	info!("capture stopped");
}

// Runs until a capture fails or nobody is left to watch. Either
// way the sender is dropped, which readers see as the video ending.
fn capture_loop<F>(mut next_frame: F, mut sender: Sender<Arc<Frame>>)
	where F: FnMut() -> Result<Frame> {

	loop {
		match next_frame() {
			Err(e) => {
				// No retry - the device is gone or broken
				error!(error:% = e; "couldn't read frame");
				break;
			},
			Ok(frame) => {
				// Nobody left to watch - release the camera
				if sender.send(Arc::new(frame)) == 0 {
					break;
				}
			},
		}
	}
}

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::thread::{Builder, JoinHandle, sleep};
use std::time::{Duration, Instant};

use log::{debug, info, error};

use crate::confchannel::{self, Sender};
use crate::detector::FaceDetector;
use crate::errors::*;
use crate::facewatch::{Config, Facewatch};
use crate::frame::Frame;
use crate::overlay::OverlayRenderer;
use crate::signals::Thresholds;

pub mod pipeline;
pub mod status;
pub mod ticker;

use pipeline::Pipeline;
use status::Status;
use ticker::Ticker;

// Longest we sleep before checking for shutdown
const POLL: Duration = Duration::from_millis(50);

/// Builds the detector on the monitor thread. Model handles need not be
/// `Send`, so they never cross threads.
pub type DetectorLoader =
	Box<dyn FnOnce(&Config) -> Result<Box<dyn FaceDetector>> + Send>;

pub struct MonitorRAII{
	// Hold join handles and close channels
	handle: Option<JoinHandle<()>>,
	close_channel: std::sync::mpsc::Sender<()>,
	status_receiver: confchannel::Receiver<Status>,
}

impl MonitorRAII {
	/// Spawns the detection loop and blocks until the models are loaded.
	/// A loader failure is returned as [`Error::ModelLoad`] and no ticks run.
	pub fn new(fw: Arc<Facewatch>,
			   frames: confchannel::Receiver<Arc<Frame>>,
			   loader: DetectorLoader) -> Result<Self> {

		let (close_sender, close_receiver) = channel();
		let (ready_sender, ready_receiver) = channel::<std::result::Result<(), String>>();
		let (status_sender, status_receiver) = confchannel::confchannel();

		let handle = Builder::new()
			.name("monitor".to_string())
			.spawn(move || {
				let detector = match loader(&fw.config) {
					Ok(detector) => detector,
					Err(e) => {
						let _ = ready_sender.send(Err(e.to_string()));
						return;
					},
				};
				let _ = ready_sender.send(Ok(()));
				let pipeline = build_pipeline(&fw.config, detector);
				run_monitor(&fw.config, pipeline, frames, status_sender, close_receiver);
			})?;

		match ready_receiver.recv() {
			Ok(Ok(())) => {},
			Ok(Err(msg)) => {
				let _ = handle.join();
				return Err(Box::new(Error::ModelLoad(msg)));
			},
			Err(_) => {
				let _ = handle.join();
				return Err(Box::new(Error::ModelLoad(
					"monitor thread exited while loading".to_string())));
			},
		}

		Ok(Self{
			handle: Some(handle),
			close_channel: close_sender,
			status_receiver: status_receiver,
		})
	}

	/// Receiver of the most recent tick's status.
	pub fn subscribe_status(&self) -> confchannel::Receiver<Status> {
		self.status_receiver.clone()
	}
}

impl Drop for MonitorRAII {
	fn drop(&mut self) {
		// The loop may already have stopped with the video
		let _ = self.close_channel.send(());
		if let Some(handle) = self.handle.take() {
			if handle.join().is_err() {
				error!("monitor thread panicked");
			}
		}
	}
}

fn build_pipeline(config: &Config, detector: Box<dyn FaceDetector>) -> Pipeline {
	let mut pipeline = Pipeline::new(detector, Thresholds::from_config(config))
		.simulate_other_devices(config.simulate_other_devices);

	if let Some(ref path) = config.overlay_path {
		pipeline = pipeline.with_overlay(
			OverlayRenderer::new(Some(PathBuf::from(path))), config.display_size);
	}
	pipeline
}

fn run_monitor(config: &Config,
			   mut pipeline: Pipeline,
			   frames: confchannel::Receiver<Arc<Frame>>,
			   mut status_sender: Sender<Status>,
			   closer: Receiver<()>) {

	let mut ticker = Ticker::new(Duration::from_millis(config.detect_interval),
		Instant::now());
	let mut last_timestamp = None;
	let mut skipped = 0;

	info!(detect_interval = config.detect_interval; "detection loop started");

	loop {
		match closer.try_recv() {
			Ok(_) | Err(TryRecvError::Disconnected) => break,
			Err(TryRecvError::Empty) => {},
		}

		let now = Instant::now();
		if !ticker.due(now) {
			sleep(ticker.remaining(now).min(POLL));
			continue;
		}

		match frames.recv() {
			Ok(Some(frame)) => {
				// Only a frame we haven't seen means the video is playing
				if last_timestamp != Some(frame.timestamp()) {
					last_timestamp = Some(frame.timestamp());
					tick(&mut pipeline, &frame, skipped, &mut status_sender);
					skipped = 0;
				} else {
					debug!(timestamp = frame.timestamp(); "no new frame");
				}
			},
			Ok(None) => {
				debug!("video not playing yet");
			},
			Err(e) => {
				info!(reason:% = e; "video stopped");
				break;
			},
		}

		let missed = ticker.advance(Instant::now());
		if missed > 0 {
			info!(skipped = missed; "tick overran period");
			skipped += missed;
		}
	}

	info!("detection loop stopped");
}

fn tick(pipeline: &mut Pipeline,
		frame: &Frame,
		skipped: u32,
		status_sender: &mut Sender<Status>) {

	match pipeline.process(frame) {
		Ok(mut status) => {
			status.skipped_ticks = skipped;
			info!(
				face_count = status.face_count,
				panel:% = status,
				skipped_ticks = status.skipped_ticks,
				labels = status.labels.join(",").as_str();
				"status"
			);
			if let Ok(json) = serde_json::to_string(&status) {
				debug!(status = json.as_str(); "status detail");
			}
			status_sender.send(status);
		},
		Err(e) => {
			// The tick is lost, the loop carries on
			error!(error:% = e; "detection failed");
		},
	}
}

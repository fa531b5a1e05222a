//! Runs the detection loop against a scripted detector, feeding frames
//! through the same conflation channel the webcam thread uses.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use facewatch::confchannel::{confchannel, Receiver};
use facewatch::detector::detection::LANDMARK_COUNT;
use facewatch::detector::{
	BoundingBox, Detection, Expressions, FaceDetector, Landmarks, Point,
};
use facewatch::errors::Result;
use facewatch::facewatch::{Config, Facewatch};
use facewatch::frame::Frame;
use facewatch::monitor::status::Status;
use facewatch::monitor::{DetectorLoader, MonitorRAII};

fn face(nose: (f64, f64)) -> Detection {
	let mut points = vec![Point::default(); LANDMARK_COUNT];
	points[27] = Point::new(nose.0, nose.1);
	points[36] = Point::new(nose.0 - 20.0, nose.1 - 20.0);
	points[45] = Point::new(nose.0 + 20.0, nose.1 - 20.0);
	Detection{
		score: 5.0,
		bbox: BoundingBox::new(nose.0 - 50.0, nose.1 - 50.0, 100.0, 100.0),
		landmarks: Landmarks::new(points).unwrap(),
		expressions: Expressions::default(),
	}
}

/// Answers with the nose positions it is told about, one per call,
/// and records how many times it ran.
struct Scripted {
	noses: Vec<(f64, f64)>,
	calls: Arc<Mutex<usize>>,
}

impl FaceDetector for Scripted {
	fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
		let mut calls = self.calls.lock().unwrap();
		let nose = self.noses.get(*calls).copied();
		*calls += 1;
		Ok(nose.map(face).into_iter().collect())
	}
}

fn scripted(noses: Vec<(f64, f64)>, calls: Arc<Mutex<usize>>) -> DetectorLoader {
	Box::new(move |_: &Config| -> Result<Box<dyn FaceDetector>> {
		Ok(Box::new(Scripted{noses: noses, calls: calls}))
	})
}

fn config(interval: u64) -> Arc<Facewatch> {
	Arc::new(Facewatch::new(Config{
		detect_interval: interval,
		..Config::default()
	}))
}

fn frame(ts: u64) -> Arc<Frame> {
	Arc::new(Frame::new(vec![0; 16], 4, 4, ts))
}

fn wait_for_status(rx: &Receiver<Status>, done: impl Fn(&Status) -> bool) -> Option<Status> {
	let deadline = Instant::now() + Duration::from_secs(5);
	while Instant::now() < deadline {
		if let Ok(Some(status)) = rx.recv() {
			if done(&status) {
				return Some(status);
			}
		}
		std::thread::sleep(Duration::from_millis(10));
	}
	None
}

#[test]
fn reports_status_for_each_new_frame() {
	let calls = Arc::new(Mutex::new(0));
	let detector_calls = calls.clone();
	let (mut frames, frame_rx) = confchannel();

	let loader = scripted(vec![(100.0, 100.0), (200.0, 100.0)], detector_calls);
	let monitor = MonitorRAII::new(config(20), frame_rx, loader).unwrap();
	let statuses = monitor.subscribe_status();

	frames.send(frame(1));
	let first = wait_for_status(&statuses, |s| s.timestamp == 1).unwrap();
	assert_eq!(first.face_count, 1);
	assert!(first.attentive);

	frames.send(frame(2));
	let second = wait_for_status(&statuses, |s| s.timestamp == 2).unwrap();
	assert!(second.head_movement);
	assert_eq!(second.head_movement_text(), "Moved Head");

	// A repeated frame is not re-detected
	std::thread::sleep(Duration::from_millis(100));
	assert_eq!(*calls.lock().unwrap(), 2);

	drop(monitor);
}

/// Takes longer than the detect interval on every call.
struct Slow(Duration);

impl FaceDetector for Slow {
	fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
		std::thread::sleep(self.0);
		Ok(vec![face((100.0, 100.0))])
	}
}

#[test]
fn overrun_ticks_are_counted_in_next_status() {
	let (mut frames, frame_rx) = confchannel();
	let loader: DetectorLoader = Box::new(|_: &Config| -> Result<Box<dyn FaceDetector>> {
		Ok(Box::new(Slow(Duration::from_millis(120))))
	});
	let monitor = MonitorRAII::new(config(20), frame_rx, loader).unwrap();
	let statuses = monitor.subscribe_status();

	frames.send(frame(1));
	let first = wait_for_status(&statuses, |s| s.timestamp == 1).unwrap();
	assert_eq!(first.skipped_ticks, 0);

	// The first tick overran by several periods; those slots were dropped
	frames.send(frame(2));
	let second = wait_for_status(&statuses, |s| s.timestamp == 2).unwrap();
	assert!(second.skipped_ticks >= 1, "skipped {}", second.skipped_ticks);
	assert_eq!(second.face_count, 1);
}

#[test]
fn no_ticks_without_video() {
	let calls = Arc::new(Mutex::new(0));
	let detector_calls = calls.clone();
	let (_frames, frame_rx) = confchannel::<Arc<Frame>>();

	let loader = scripted(vec![], detector_calls);
	let monitor = MonitorRAII::new(config(10), frame_rx, loader).unwrap();

	std::thread::sleep(Duration::from_millis(100));
	assert_eq!(monitor.subscribe_status().recv().unwrap(), None);
	assert_eq!(*calls.lock().unwrap(), 0);
}

#[test]
fn model_load_failure_is_reported() {
	let (_frames, frame_rx) = confchannel::<Arc<Frame>>();

	let loader: DetectorLoader = Box::new(|_: &Config| -> Result<Box<dyn FaceDetector>> {
		Err("landmarks_68.onnx: file not found".into())
	});
	let result = MonitorRAII::new(config(1000), frame_rx, loader);

	let err = result.err().expect("loader failure must surface");
	assert_eq!(err.to_string(),
		"Failed to load face detection models: landmarks_68.onnx: file not found");
}

#[test]
fn drop_stops_the_loop_promptly() {
	let (_frames, frame_rx) = confchannel::<Arc<Frame>>();
	let loader = scripted(vec![], Arc::new(Mutex::new(0)));
	let monitor = MonitorRAII::new(config(60_000), frame_rx, loader).unwrap();

	let start = Instant::now();
	drop(monitor);
	assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn drop_after_video_ended_is_quiet() {
	let (frames, frame_rx) = confchannel::<Arc<Frame>>();
	let loader = scripted(vec![], Arc::new(Mutex::new(0)));
	let monitor = MonitorRAII::new(config(10), frame_rx, loader).unwrap();
	let statuses = monitor.subscribe_status();

	// The capture side goes away first; the loop stops on its own
	// and drops its status sender
	drop(frames);
	std::thread::sleep(Duration::from_millis(100));
	assert_eq!(statuses.recv().unwrap_err().to_string(), "sender_closed");

	let start = Instant::now();
	drop(monitor);
	assert!(start.elapsed() < Duration::from_secs(1));
}

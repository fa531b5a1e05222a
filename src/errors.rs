use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
	#[error("Failed to load face detection models: {0}")]
	ModelLoad(String),
	#[error("Error accessing the camera: {0}")]
	CameraAccess(String),
	#[error("invalid_request")]
	InvalidRequest,
	#[error("client_timeout")]
	ClientTimeout,
	#[error("sender_closed")]
	SenderClosed,
	#[error("invalid model output: {0}")]
	ModelOutput(String),
	#[error("bad config: {0}")]
	Config(String),
}

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

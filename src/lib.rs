pub mod confchannel;
pub mod detector;
pub mod errors;
pub mod facewatch;
pub mod frame;
pub mod ltsv;
pub mod monitor;
pub mod overlay;
pub mod relay;
pub mod signals;
pub mod webcam;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use std::thread;

use clap::{Parser, Subcommand};
use log::{info, error};

use facewatch::confchannel::confchannel;
use facewatch::detector::{FaceDetector, ModelStack};
use facewatch::errors::*;
use facewatch::facewatch::{Config, Facewatch};
use facewatch::monitor::MonitorRAII;
use facewatch::relay::RelayRAII;
use facewatch::relay::client::Client;
use facewatch::{ltsv, webcam};

/// Webcam face monitoring and face-data event relay.
#[derive(Parser)]
#[command(name = "facewatch")]
struct Cli {
	/// JSON config file (camelCase keys, all optional).
	#[arg(long, global = true)]
	config: Option<PathBuf>,

	/// Camera device, overrides the config.
	#[arg(long, global = true)]
	device: Option<String>,

	/// Relay address, overrides the config.
	#[arg(long, global = true)]
	listen: Option<String>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	/// Watch the camera and report face signals every tick.
	Monitor,
	/// Accept clients and log the face data they send.
	Relay,
	/// Send one faceData event to a relay, then disconnect.
	Send {
		/// JSON payload.
		payload: String,
	},
}

fn load_config(cli: &Cli) -> Result<Config> {
	let mut config = match cli.config {
		Some(ref path) => Config::load(path)?,
		None => Config::default(),
	};
	if let Some(ref device) = cli.device {
		config.webcam_device = device.clone();
	}
	if let Some(ref listen) = cli.listen {
		config.relay_address = listen.clone();
	}
	Ok(config)
}

// Set by the ctrl-c handler; polled by the subcommands
fn shutdown_flag() -> Result<Arc<AtomicBool>> {
	let running = Arc::new(AtomicBool::new(true));
	let r = running.clone();

	ctrlc::set_handler(move || {
		info!("received ctrlc - closing");
		r.store(false, Ordering::SeqCst);
	})?;
	Ok(running)
}

fn wait(running: &AtomicBool) {
	// poll for shutdown twenty times per second
	while running.load(Ordering::SeqCst) {
		thread::sleep(Duration::from_millis(50));
	}
}

fn load_models(config: &Config) -> Result<Box<dyn FaceDetector>> {
	let stack = ModelStack::load(Path::new(&config.model_dir))?;
	Ok(Box::new(stack))
}

fn run_monitor(fw: Arc<Facewatch>) -> Result<()> {
	let running = shutdown_flag()?;

	// Models first: without them there is nothing to show
	// and the camera stays closed.
	let (frame_sender, frame_receiver) = confchannel();
	let _monitor = MonitorRAII::new(fw.clone(), frame_receiver, Box::new(load_models))?;

	webcam::webcam(&fw, frame_sender)?;

	wait(&running);
	Ok(())
}

fn run_relay(fw: Arc<Facewatch>) -> Result<()> {
	let running = shutdown_flag()?;
	let _relay = RelayRAII::new(fw)?;
	wait(&running);
	Ok(())
}

fn run_send(fw: Arc<Facewatch>, payload: &str) -> Result<()> {
	let payload: serde_json::Value = serde_json::from_str(payload)?;
	let mut client = Client::connect(&fw.config.relay_address)?;
	client.emit_face_data(&payload)?;
	client.disconnect()?;
	info!(address = fw.config.relay_address.as_str(); "face data sent");
	Ok(())
}

fn run(cli: Cli) -> Result<()> {
	let config = load_config(&cli)?;
	ltsv::init(ltsv::parse_level(&config.log_level))?;
	info!("facewatch started");

	let fw = Arc::new(Facewatch::new(config));
	match cli.command {
		Command::Monitor => run_monitor(fw),
		Command::Relay => run_relay(fw),
		Command::Send{ref payload} => run_send(fw, payload),
	}
}

fn main() {
	let cli = Cli::parse();
	if let Err(e) = run(cli) {
		// The logger may not be up if the config was bad
		if log::max_level() == log::LevelFilter::Off {
			eprintln!("{}", e);
		}
		error!(error:% = e; "something went wrong");
		process::exit(1);
	}
}

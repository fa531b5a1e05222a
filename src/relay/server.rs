use std::io;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::mpsc::{channel, Sender, Receiver, TryRecvError};
use std::thread::{JoinHandle, Builder, sleep};
use std::time;

use log::{info, warn, error};

use crate::errors::*;
use crate::facewatch::Facewatch;

use super::RelayStats;
use super::session::Session;

// Linux errno values; io::ErrorKind has no stable kind for them
const ENFILE: i32 = 23;
const EMFILE: i32 = 24;

// Pause before accepting again when out of descriptors
const FD_BACKOFF: time::Duration = time::Duration::from_millis(200);

/// What a failed accept means for the listener.
#[derive(Debug, PartialEq)]
enum AcceptFailure {
	// Only the pending connection is lost
	Connection,
	// Out of file descriptors; wait for clients to go away
	Exhausted,
	// The listener itself is broken
	Listener,
}

fn classify_accept_error(e: &io::Error) -> AcceptFailure {
	use io::ErrorKind::*;

	match e.raw_os_error() {
		Some(ENFILE) | Some(EMFILE) => return AcceptFailure::Exhausted,
		_ => {},
	}
	match e.kind() {
		ConnectionAborted | ConnectionReset | Interrupted | TimedOut =>
			AcceptFailure::Connection,
		_ => AcceptFailure::Listener,
	}
}

pub struct Server{
	fw: Arc<Facewatch>,
	stats: Arc<RelayStats>,
	listener: TcpListener,
	client_num: u32,

	// A vector of (handle, channel) pairs
	// to wait for our client threads to close
	clients: Vec<(Option<JoinHandle<()>>, Sender<()>)>,
}

impl Server {
	pub fn new(fw: Arc<Facewatch>, stats: Arc<RelayStats>, listener: TcpListener)
		-> Result<Self> {

		listener.set_nonblocking(true)?;

		Ok(Self{
			fw: fw,
			stats: stats,
			listener: listener,
			client_num: 0,
			clients: vec![],
		})
	}

	pub fn tick(&mut self) -> Result<()> {
		// Threading server - check if we have
		// any new client connections
		use std::io::ErrorKind::WouldBlock;

		match self.listener.accept() {
			Ok((stream, _)) => {
				// Spawn a new thread
				let name = format!("client_{}", self.client_num);
				self.client_num += 1;
				let (sender, receiver) = channel();

				let fw = self.fw.clone();
				let stats = self.stats.clone();

				let handle = Builder::new()
					.name(name)
					.spawn(|| start_session(fw, stats, stream, receiver))?;

				// Add this thread to our Vector
				self.clients.push((Some(handle), sender));
				Ok(())
			},
			Err(ref e) if e.kind() == WouldBlock => Ok(()),
			Err(e) => match classify_accept_error(&e) {
				AcceptFailure::Connection => {
					warn!(error:% = e; "accept failed - dropping connection");
					Ok(())
				},
				AcceptFailure::Exhausted => {
					warn!(error:% = e; "out of file descriptors");
					sleep(FD_BACKOFF);
					Ok(())
				},
				AcceptFailure::Listener => Err(e),
			},
		}?;

		self.reap();
		Ok(())
	}

	// Join client threads whose sessions have ended
	fn reap(&mut self) {
		self.clients.retain_mut(|(handle, _)| {
			let finished = handle.as_ref()
				.map(|h| h.is_finished())
				.unwrap_or(true);
			if finished {
				if let Some(h) = handle.take() {
					if h.join().is_err() {
						error!("client thread panicked");
					}
				}
			}
			!finished
		});
	}

	pub fn active_clients(&self) -> usize {
		self.clients.len()
	}

	pub fn shutdown(&mut self) -> Result<()> {
		// Send shutdown to all the clients
		for (handle, sender) in self.clients.iter_mut() {
			// A client that already finished has dropped its receiver
			let _ = sender.send(());

			if let Some(handle) = handle.take() {
				if handle.join().is_err() {
					error!("client thread panicked");
				}
			}
		}
		self.clients.clear();

		Ok(())
	}
}

fn start_session(fw: Arc<Facewatch>,
				 stats: Arc<RelayStats>,
				 stream: TcpStream,
				 closer: Receiver<()>) {
	stats.record_connection();
	let mut session = match Session::new(fw, stats.clone(), stream) {
		Ok(session) => session,
		Err(e) => {
			error!(error:% = e; "couldn't start session");
			stats.record_disconnect();
			return;
		},
	};

	info!(
		session_id = session.session_id(),
		peer = session.peer();
		"client connected"
	);

	let reason = match run_session(&mut session, closer) {
		Ok(reason) => reason,
		Err(e) => {
			error!(
				session_id = session.session_id(),
				error:% = e;
				"session crashed"
			);
			"error"
		},
	};

	stats.record_disconnect();
	info!(
		session_id = session.session_id(),
		reason = reason;
		"client disconnected"
	);
}

fn run_session(session: &mut Session,
			   closer: Receiver<()>) -> Result<&'static str> {

	loop {
		// Poll the channel to check if we're shutting down
		match closer.try_recv() {
			Ok(_) | Err(TryRecvError::Disconnected) => {
				// The peer may already be gone
				let _ = session.shutdown();
				return Ok("shutdown");
			},
			Err(TryRecvError::Empty) => {},
		}

		if let Some(disconnect) = session.tick_read()? {
			return Ok(disconnect.as_str());
		}

		// We need to throttle slightly to prevent our CPU
		// being eaten.
		sleep(time::Duration::from_millis(20));
	}
}

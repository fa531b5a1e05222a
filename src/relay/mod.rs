use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Sender, Receiver, TryRecvError};
use std::thread::{Builder, JoinHandle, sleep};
use std::time;

use log::{info, error};

use crate::errors::*;
use crate::facewatch::Facewatch;

pub mod client;
pub mod protocol;
mod server;
use server::Server;
mod session;

/// Counters shared by every client thread.
#[derive(Default, Debug)]
pub struct RelayStats {
	connections: AtomicUsize,
	face_data: AtomicUsize,
	disconnects: AtomicUsize,
}

impl RelayStats {
	pub fn connections(&self) -> usize {
		self.connections.load(Ordering::SeqCst)
	}

	pub fn face_data(&self) -> usize {
		self.face_data.load(Ordering::SeqCst)
	}

	pub fn disconnects(&self) -> usize {
		self.disconnects.load(Ordering::SeqCst)
	}

	fn record_connection(&self) {
		self.connections.fetch_add(1, Ordering::SeqCst);
	}

	fn record_face_data(&self) {
		self.face_data.fetch_add(1, Ordering::SeqCst);
	}

	fn record_disconnect(&self) {
		self.disconnects.fetch_add(1, Ordering::SeqCst);
	}
}

pub struct RelayRAII{
	// Hold join handles and close channels
	handle: Option<JoinHandle<()>>,
	close_channel: Sender<()>,
	local_addr: SocketAddr,
	stats: Arc<RelayStats>,
}

impl RelayRAII {
	pub fn new(fw: Arc<Facewatch>) -> Result<Self> {
		let listener = TcpListener::bind(&fw.config.relay_address)?;
		let local_addr = listener.local_addr()?;
		info!(address:% = local_addr; "relay listening");

		let stats = Arc::new(RelayStats::default());
		let s = stats.clone();

		// Create thread for server
		let (sender, receiver) = channel();

		let handle = Builder::new()
			.name("relay".to_string())
			.spawn(move || start_relay(fw, s, listener, receiver))?;

		Ok(Self{
			handle: Some(handle),
			close_channel: sender,
			local_addr: local_addr,
			stats: stats,
		})
	}

	pub fn local_addr(&self) -> SocketAddr {
		self.local_addr
	}

	pub fn stats(&self) -> Arc<RelayStats> {
		self.stats.clone()
	}
}

impl Drop for RelayRAII {
	fn drop(&mut self) {
		if let Err(e) = self.close_channel.send(()) {
			error!(error:% = e; "couldn't close relay");
		}
		if let Some(handle) = self.handle.take() {
			if handle.join().is_err() {
				error!("relay thread panicked");
			}
		}
	}
}

fn start_relay(fw: Arc<Facewatch>,
			   stats: Arc<RelayStats>,
			   listener: TcpListener,
			   closer: Receiver<()>) {

	loop {
		// Each attempt gets its own handle on the bound socket
		let attempt = listener.try_clone()
			.map_err(|e| -> Box<dyn std::error::Error> { Box::new(e) })
			.and_then(|l| run_relay(fw.clone(), stats.clone(), l, &closer));

		if let Err(e) = attempt {
			error!(error:% = e; "relay crashed - restarting");
		} else {
			return;
		}

		// Edge case - make sure we don't have a close message
		match closer.try_recv() {
			Ok(_) | Err(TryRecvError::Disconnected) => break,
			Err(TryRecvError::Empty) => {},
		}

		// Don't spin if the OS keeps failing us
		sleep(time::Duration::from_millis(500));
	}
}

fn run_relay(fw: Arc<Facewatch>,
			 stats: Arc<RelayStats>,
			 listener: TcpListener,
			 closer: &Receiver<()>) -> Result<()> {

	let mut server = Server::new(fw, stats.clone(), listener)?;

	loop {
		match closer.try_recv() {
			Ok(_) | Err(TryRecvError::Disconnected) => {
				// We swallow + log errors from shutdown
				// so start_relay doesn't restart us.
				info!(active = server.active_clients(); "closing sessions");
				if let Err(e) = server.shutdown() {
					error!(error:% = e; "something went wrong");
				}
				break;
			},
			Err(TryRecvError::Empty) => {},
		}

		// Server::new and server.tick only report listener
		// errors so we return from this function and
		// attempt a restart. Individual client errors
		// stay on their own thread.
		if let Err(e) = server.tick() {
			// Join the sessions before the restart drops them
			info!(active = server.active_clients(); "closing sessions");
			if let Err(close) = server.shutdown() {
				error!(error:% = close; "something went wrong");
			}
			return Err(e);
		}

		// We need to throttle to prevent our CPU being eaten
		sleep(time::Duration::from_millis(50));
	}

	info!(
		connections = stats.connections(),
		face_data = stats.face_data(),
		disconnects = stats.disconnects();
		"shutdown complete"
	);
	Ok(())
}

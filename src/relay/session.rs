use std::io::Read;
use std::net::TcpStream;
use std::sync::Arc;
use std::time;

use log::{debug, info, warn};

use crate::errors::*;
use crate::facewatch::Facewatch;

use super::RelayStats;
use super::protocol::{Header, MsgType, HEADER_LEN};

#[derive(Copy, Clone, PartialEq)]
enum ReadState {
	Header,
	Body,
}

/// Why a session ended; logged with the disconnect notice.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Disconnect {
	// Client sent a disconnect message
	Client,
	// Client closed the socket
	Closed,
}

impl Disconnect {
	pub fn as_str(self) -> &'static str {
		match self {
			Disconnect::Client => "client",
			Disconnect::Closed => "closed",
		}
	}
}

pub struct Session{
	fw: Arc<Facewatch>,
	stats: Arc<RelayStats>,
	stream: TcpStream,
	last_read: time::Instant,

	// Session Data
	session_id: String,
	peer: String,

	// Read state / buffers
	read_state: ReadState,
	read_header_buf: [u8; HEADER_LEN],
	read_bytes_read: usize,
	read_body_buf: Vec<u8>,
	read_header: Option<Header>,
}

impl Session {
	pub fn new(fw: Arc<Facewatch>,
		stats: Arc<RelayStats>,
		stream: TcpStream) -> Result<Self>{

		stream.set_nonblocking(true)?;
		let peer = stream.peer_addr()
			.map(|addr| addr.to_string())
			.unwrap_or_else(|_| "unknown".to_string());

		Ok(Self{
			fw: fw,
			stats: stats,
			stream: stream,
			last_read: time::Instant::now(),
			session_id: format!("{:08x}", rand::random::<u32>()),
			peer: peer,
			read_state: ReadState::Header,
			read_header_buf: [0; HEADER_LEN],
			read_bytes_read: 0,
			read_body_buf: Vec::with_capacity(1024),
			read_header: None,
		})
	}

	pub fn session_id(&self) -> &str {
		&self.session_id
	}

	pub fn peer(&self) -> &str {
		&self.peer
	}

	// Ok(None) when nothing is waiting, Ok(Some(0)) on EOF
	fn read_some(&mut self, start: usize, end: usize, body: bool) -> Result<Option<usize>> {
		use std::io::ErrorKind::{WouldBlock, Interrupted};

		let buf = if body {
			&mut self.read_body_buf[start..end]
		} else {
			&mut self.read_header_buf[start..end]
		};

		match self.stream.read(buf) {
			Ok(n) => Ok(Some(n)),
			Err(ref e) if e.kind() == WouldBlock || e.kind() == Interrupted => Ok(None),
			Err(e) => Err(Box::new(e)),
		}
	}

	fn tick_read_header(&mut self) -> Result<Option<Disconnect>> {
		let bytes_read = match self.read_some(self.read_bytes_read, HEADER_LEN, false)? {
			None => return Ok(None),
			Some(0) => return Ok(Some(Disconnect::Closed)),
			Some(n) => n,
		};
		self.read_bytes_read += bytes_read;
		self.last_read = time::Instant::now();

		if self.read_bytes_read < HEADER_LEN {
			return Ok(None);
		}

		let header = Header::from_raw(&self.read_header_buf)?;
		self.read_bytes_read = 0;
		debug!(
			session_id = self.session_id.as_str(),
			event = header.msg_type.event_name(),
			msg_id = header.msg_id;
			"header received"
		);

		match header.msg_type {
			MsgType::Disconnect => return Ok(Some(Disconnect::Client)),
			MsgType::Heartbeat => {},
			MsgType::FaceData => {
				self.read_body_buf.resize(header.msg_len as usize, 0);
				self.read_header = Some(header);
				if header.msg_len == 0 {
					self.handle_face_data()?;
				} else {
					self.read_state = ReadState::Body;
				}
			},
		}

		Ok(None)
	}

	fn tick_read_body(&mut self) -> Result<Option<Disconnect>> {
		let len = self.read_body_buf.len();
		let bytes_read = match self.read_some(self.read_bytes_read, len, true)? {
			None => return Ok(None),
			Some(0) => return Ok(Some(Disconnect::Closed)),
			Some(n) => n,
		};
		self.read_bytes_read += bytes_read;
		self.last_read = time::Instant::now();

		// Have we got a complete message?
		if self.read_bytes_read == len {
			self.handle_face_data()?;
			self.read_state = ReadState::Header;
			self.read_bytes_read = 0;
		}
		Ok(None)
	}

	fn handle_face_data(&mut self) -> Result<()> {
		let msg_id = self.read_header.map(|h| h.msg_id).unwrap_or(0);
		let payload: serde_json::Value = if self.read_body_buf.is_empty() {
			serde_json::Value::Null
		} else {
			serde_json::from_slice(&self.read_body_buf)
				.map_err(|_| Error::InvalidRequest)?
		};

		self.stats.record_face_data();
		info!(
			session_id = self.session_id.as_str(),
			msg_id = msg_id,
			payload:% = payload;
			"received face data"
		);
		Ok(())
	}

	/// Read whatever the client has sent. Returns the reason once the
	/// session is over, `None` while it is still live.
	pub fn tick_read(&mut self) -> Result<Option<Disconnect>> {
		let disconnect = if self.read_state == ReadState::Header {
			self.tick_read_header()?
		} else {
			self.tick_read_body()?
		};

		if disconnect.is_none() {
			let timeout = time::Duration::from_secs(self.fw.config.client_idle_timeout);
			if self.last_read.elapsed() > timeout {
				// The client has gone away
				warn!(session_id = self.session_id.as_str(); "closing due to timeout");
				return Err(Box::new(Error::ClientTimeout));
			}
		}

		Ok(disconnect)
	}

	pub fn shutdown(&mut self) -> Result<()> {
		self.stream.shutdown(std::net::Shutdown::Both)?;
		Ok(())
	}
}

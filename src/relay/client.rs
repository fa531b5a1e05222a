use std::io::Write;
use std::net::TcpStream;

use serde::Serialize;

use crate::errors::*;

use super::protocol::{encode, MsgType};

/// Emits events to a relay. The relay never answers, so every call is
/// fire and forget.
pub struct Client {
	stream: TcpStream,
}

impl Client {
	pub fn connect(address: &str) -> Result<Self> {
		let stream = TcpStream::connect(address)?;
		stream.set_nodelay(true)?;
		Ok(Self{stream: stream})
	}

	pub fn emit_face_data<T: Serialize>(&mut self, payload: &T) -> Result<()> {
		let body = serde_json::to_vec(payload)?;
		self.write(MsgType::FaceData, &body)
	}

	pub fn heartbeat(&mut self) -> Result<()> {
		self.write(MsgType::Heartbeat, &[])
	}

	pub fn disconnect(mut self) -> Result<()> {
		self.write(MsgType::Disconnect, &[])
	}

	fn write(&mut self, msg_type: MsgType, body: &[u8]) -> Result<()> {
		let buf = encode(msg_type, rand::random(), body)?;
		self.stream.write_all(&buf)?;
		self.stream.flush()?;
		Ok(())
	}
}

// Relay wire format. Every message is a ten byte header
// followed by msg_len bytes of body:
//
//   [version u8][msg_type u8][msg_len u32 LE][msg_id u32 LE]

use crate::errors::*;

pub const VERSION: u8 = 0;
pub const HEADER_LEN: usize = 10;
pub const MAX_BODY_LEN: u32 = 1 << 20;

#[derive(Copy, Clone, PartialEq, Debug)]
pub enum MsgType {
	FaceData,
	Heartbeat,
	Disconnect,
}

impl MsgType {
	pub fn code(self) -> u8 {
		match self {
			MsgType::FaceData => b'D',
			MsgType::Heartbeat => b'H',
			MsgType::Disconnect => b'Z',
		}
	}

	pub fn from_code(code: u8) -> Result<Self> {
		match code {
			b'D' => Ok(MsgType::FaceData),
			b'H' => Ok(MsgType::Heartbeat),
			b'Z' => Ok(MsgType::Disconnect),
			_ => Err(Box::new(Error::InvalidRequest)),
		}
	}

	pub fn event_name(self) -> &'static str {
		match self {
			MsgType::FaceData => "faceData",
			MsgType::Heartbeat => "heartbeat",
			MsgType::Disconnect => "disconnect",
		}
	}

	// Only face data carries a body
	fn has_body(self) -> bool {
		self == MsgType::FaceData
	}
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Header {
	pub msg_type: MsgType,
	pub msg_len: u32,
	pub msg_id: u32,
}

impl Header {
	pub fn from_raw(raw: &[u8; HEADER_LEN]) -> Result<Self> {
		// The first byte is the version
		if raw[0] != VERSION {
			return Err(Box::new(Error::InvalidRequest));
		}

		let msg_type = MsgType::from_code(raw[1])?;

		// Parse the msg_len - u32 little endian
		let msg_len = u32::from_le_bytes([raw[2], raw[3], raw[4], raw[5]]);
		let msg_id = u32::from_le_bytes([raw[6], raw[7], raw[8], raw[9]]);

		if msg_len > MAX_BODY_LEN || (msg_len > 0 && !msg_type.has_body()) {
			return Err(Box::new(Error::InvalidRequest));
		}

		Ok(Self{
			msg_type: msg_type,
			msg_len: msg_len,
			msg_id: msg_id,
		})
	}

	pub fn to_raw(&self) -> [u8; HEADER_LEN] {
		let mut raw = [0u8; HEADER_LEN];
		raw[0] = VERSION;
		raw[1] = self.msg_type.code();
		raw[2..6].copy_from_slice(&self.msg_len.to_le_bytes());
		raw[6..10].copy_from_slice(&self.msg_id.to_le_bytes());
		raw
	}
}

pub fn encode(msg_type: MsgType, msg_id: u32, body: &[u8]) -> Result<Vec<u8>> {
	if body.len() > MAX_BODY_LEN as usize || (!body.is_empty() && !msg_type.has_body()) {
		return Err(Box::new(Error::InvalidRequest));
	}

	let header = Header{
		msg_type: msg_type,
		msg_len: body.len() as u32,
		msg_id: msg_id,
	};

	let mut buf = Vec::with_capacity(HEADER_LEN + body.len());
	buf.extend_from_slice(&header.to_raw());
	buf.extend_from_slice(body);
	Ok(buf)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[test]
	fn face_data_layout() {
		let buf = encode(MsgType::FaceData, 0x0102_0304, b"{}").unwrap();
		assert_eq!(buf, vec![0, b'D', 2, 0, 0, 0, 4, 3, 2, 1, b'{', b'}']);

		let mut raw = [0u8; HEADER_LEN];
		raw.copy_from_slice(&buf[..HEADER_LEN]);
		let header = Header::from_raw(&raw).unwrap();
		assert_eq!(header.msg_type, MsgType::FaceData);
		assert_eq!(header.msg_len, 2);
		assert_eq!(header.msg_id, 0x0102_0304);
	}

	#[rstest]
	#[case::bad_version([1, b'D', 0, 0, 0, 0, 0, 0, 0, 0])]
	#[case::unknown_type([0, b'Q', 0, 0, 0, 0, 0, 0, 0, 0])]
	#[case::oversized([0, b'D', 0, 0, 0x20, 0, 0, 0, 0, 0])]
	#[case::heartbeat_with_body([0, b'H', 1, 0, 0, 0, 0, 0, 0, 0])]
	fn invalid_headers_are_rejected(#[case] raw: [u8; HEADER_LEN]) {
		let err = Header::from_raw(&raw).unwrap_err();
		assert_eq!(err.to_string(), "invalid_request");
	}

	#[test]
	fn disconnect_cannot_carry_body() {
		assert!(encode(MsgType::Disconnect, 1, b"x").is_err());
		assert_eq!(encode(MsgType::Disconnect, 1, b"").unwrap().len(), HEADER_LEN);
	}

	#[test]
	fn event_names() {
		assert_eq!(MsgType::FaceData.event_name(), "faceData");
		assert_eq!(MsgType::Disconnect.event_name(), "disconnect");
	}
}

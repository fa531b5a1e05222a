//! Drives the relay over real TCP on an ephemeral port.

use std::io::Write;
use std::net::TcpStream;
use std::sync::Arc;
use std::time::{Duration, Instant};

use facewatch::facewatch::{Config, Facewatch};
use facewatch::relay::client::Client;
use facewatch::relay::protocol::{encode, MsgType};
use facewatch::relay::{RelayRAII, RelayStats};

fn start_relay(idle_timeout: u64) -> RelayRAII {
	let config = Config{
		relay_address: "127.0.0.1:0".to_string(),
		client_idle_timeout: idle_timeout,
		..Config::default()
	};
	RelayRAII::new(Arc::new(Facewatch::new(config))).expect("relay should bind")
}

/// Poll until `done` holds or five seconds pass.
fn wait_for(stats: &RelayStats, done: impl Fn(&RelayStats) -> bool) -> bool {
	let deadline = Instant::now() + Duration::from_secs(5);
	while Instant::now() < deadline {
		if done(stats) {
			return true;
		}
		std::thread::sleep(Duration::from_millis(20));
	}
	false
}

#[test]
fn logs_face_data_then_disconnect() {
	let relay = start_relay(15);
	let stats = relay.stats();

	let mut client = Client::connect(&relay.local_addr().to_string()).unwrap();
	client.emit_face_data(&serde_json::json!({"faceCount": 1})).unwrap();
	client.emit_face_data(&serde_json::json!({"faceCount": 2})).unwrap();
	client.disconnect().unwrap();

	assert!(wait_for(&stats, |s| s.disconnects() == 1));
	assert_eq!(stats.connections(), 1);
	assert_eq!(stats.face_data(), 2);
}

#[test]
fn closing_the_socket_counts_as_disconnect() {
	let relay = start_relay(15);
	let stats = relay.stats();

	let mut client = Client::connect(&relay.local_addr().to_string()).unwrap();
	client.heartbeat().unwrap();
	drop(client);

	assert!(wait_for(&stats, |s| s.disconnects() == 1));
	assert_eq!(stats.face_data(), 0);
}

#[test]
fn invalid_message_ends_session() {
	let relay = start_relay(15);
	let stats = relay.stats();

	let mut stream = TcpStream::connect(relay.local_addr()).unwrap();
	stream.write_all(&[0, b'Q', 0, 0, 0, 0, 0, 0, 0, 0]).unwrap();

	assert!(wait_for(&stats, |s| s.disconnects() == 1));
}

#[test]
fn malformed_json_is_not_counted() {
	let relay = start_relay(15);
	let stats = relay.stats();

	let mut stream = TcpStream::connect(relay.local_addr()).unwrap();
	stream.write_all(&encode(MsgType::FaceData, 7, b"{not json").unwrap()).unwrap();

	assert!(wait_for(&stats, |s| s.disconnects() == 1));
	assert_eq!(stats.face_data(), 0);
}

#[test]
fn silent_client_times_out() {
	let relay = start_relay(1);
	let stats = relay.stats();

	let _stream = TcpStream::connect(relay.local_addr()).unwrap();

	assert!(wait_for(&stats, |s| s.disconnects() == 1));
}

#[test]
fn clients_are_independent() {
	let relay = start_relay(15);
	let stats = relay.stats();
	let addr = relay.local_addr().to_string();

	let mut a = Client::connect(&addr).unwrap();
	let mut b = Client::connect(&addr).unwrap();
	a.emit_face_data(&serde_json::json!({"from": "a"})).unwrap();
	b.emit_face_data(&serde_json::json!({"from": "b"})).unwrap();
	a.disconnect().unwrap();

	assert!(wait_for(&stats, |s| s.disconnects() == 1 && s.face_data() == 2));
	b.disconnect().unwrap();
	assert!(wait_for(&stats, |s| s.disconnects() == 2));
	assert_eq!(stats.connections(), 2);
}

#[test]
fn dropping_relay_closes_open_sessions() {
	let relay = start_relay(15);
	let stats = relay.stats();

	let _client = Client::connect(&relay.local_addr().to_string()).unwrap();
	assert!(wait_for(&stats, |s| s.connections() == 1));

	drop(relay);
	assert_eq!(stats.disconnects(), 1);
}

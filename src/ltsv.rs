// LTSV backend for the log facade.
//
// Every line starts with thread, level and msg, then any
// key-values attached to the record:
//   info!(session_id = id.as_str(); "new session");

use std::io::Write;
use std::thread;

use log::kv::{self, Key, Value, VisitSource};
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

pub struct LtsvLogger {
	level: LevelFilter,
}

pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
	log::set_boxed_logger(Box::new(LtsvLogger{level: level}))?;
	log::set_max_level(level);
	Ok(())
}

impl Log for LtsvLogger {
	fn enabled(&self, metadata: &Metadata) -> bool {
		metadata.level() <= self.level
	}

	fn log(&self, record: &Record) {
		if !self.enabled(record.metadata()) {
			return;
		}

		let line = format_record(record);
		let stdout = std::io::stdout();
		let mut out = stdout.lock();
		// Nowhere to report a failed log write
		let _ = writeln!(out, "{}", line);
	}

	fn flush(&self) {
		let _ = std::io::stdout().flush();
	}
}

struct Tags<'a>(&'a mut String);

impl<'kvs, 'a> VisitSource<'kvs> for Tags<'a> {
	fn visit_pair(&mut self, key: Key<'kvs>, value: Value<'kvs>)
		-> Result<(), kv::Error> {

		self.0.push('\t');
		ltsv_encode(self.0, key.as_str(), &value.to_string());
		Ok(())
	}
}

pub fn format_record(record: &Record) -> String {
	let mut log_line = String::with_capacity(1024);

	// The first entry is the thread name
	let current = thread::current();
	ltsv_encode(&mut log_line, "thread",
		current.name().unwrap_or("unnamed"));

	log_line.push('\t');
	ltsv_encode(&mut log_line, "level",
		&record.level().as_str().to_lowercase());

	log_line.push('\t');
	ltsv_encode(&mut log_line, "msg", &record.args().to_string());

	// A failing visitor only truncates the tags
	let _ = record.key_values().visit(&mut Tags(&mut log_line));
	log_line
}

fn ltsv_encode(buf: &mut String, key: &str, value: &str) {
	escape_into(buf, key);
	buf.push('=');
	escape_into(buf, value);
}

fn escape_into(buf: &mut String, s: &str) {
	for c in s.chars() {
		match c {
			'\\' | '\t' | '=' => {
				buf.push('\\');
				buf.push(c);
			},
			'\n' => buf.push_str("\\n"),
			_ => buf.push(c),
		}
	}
}

pub fn parse_level(level: &str) -> LevelFilter {
	level.parse().unwrap_or(LevelFilter::Info)
}

#[cfg(test)]
mod tests {
	use super::*;
	use log::Level;

	#[test]
	fn encodes_separators() {
		let mut buf = String::new();
		ltsv_encode(&mut buf, "a=b", "x\ty\nz\\");
		assert_eq!(buf, "a\\=b=x\\\ty\\nz\\\\");
	}

	#[test]
	fn record_starts_with_thread_level_msg() {
		let handle = thread::Builder::new()
			.name("monitor".to_string())
			.spawn(|| {
				format_record(&Record::builder()
					.args(format_args!("tick"))
					.level(Level::Info)
					.build())
			})
			.unwrap();

		let line = handle.join().unwrap();
		assert_eq!(line, "thread=monitor\tlevel=info\tmsg=tick");
	}

	#[test]
	fn record_appends_key_values() {
		let kvs = ("face_count", 2i64);
		let line = format_record(&Record::builder()
			.args(format_args!("status"))
			.level(Level::Info)
			.key_values(&kvs)
			.build());
		assert!(line.ends_with("\tmsg=status\tface_count=2"), "{}", line);
	}

	#[test]
	fn unknown_level_falls_back_to_info() {
		assert_eq!(parse_level("debug"), LevelFilter::Debug);
		assert_eq!(parse_level("loud"), LevelFilter::Info);
	}
}

//! Utilities for capturing and verifying tracing output in integration tests.
//!
//! When tests spawn the tix binary with `TIX_TRACE_FILE` set, trace events are written in JSON
//! format to that file. These utilities parse and query those traces.

use std::{fs, path::Path};

use serde::Deserialize;

/// A single trace event from the JSON log
#[derive(Debug, Deserialize)]
pub struct TraceEvent {
	/// DEBUG, INFO, WARN, ERROR
	pub level: String,
	pub fields: TraceFields,
}

#[derive(Debug, Deserialize)]
pub struct TraceFields {
	pub message: Option<String>,
}

/// Parsed trace log that provides verification methods
pub struct TraceLog {
	events: Vec<TraceEvent>,
}

impl TraceLog {
	pub fn from_file(path: &Path) -> Self {
		let content = fs::read_to_string(path).unwrap_or_default();
		let events: Vec<TraceEvent> = content.lines().filter(|line| !line.is_empty()).filter_map(|line| serde_json::from_str(line).ok()).collect();
		Self { events }
	}

	pub fn messages_at(&self, level: &str) -> Vec<&str> {
		self.events
			.iter()
			.filter(|e| e.level.eq_ignore_ascii_case(level))
			.filter_map(|e| e.fields.message.as_deref())
			.collect()
	}

	pub fn has_message(&self, level: &str, needle: &str) -> bool {
		self.messages_at(level).iter().any(|m| m.contains(needle))
	}

	pub fn is_empty(&self) -> bool {
		self.events.is_empty()
	}
}

/// Assert that an event containing `needle` was traced at `level`
#[macro_export]
macro_rules! assert_traced {
	($log:expr, $level:expr, $needle:expr) => {
		assert!(
			$log.has_message($level, $needle),
			"Expected a {} event containing '{}'. {} events:\n{:#?}",
			$level,
			$needle,
			$level,
			$log.messages_at($level)
		);
	};
}

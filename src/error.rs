//! Error and warning types for ticket generation.
//!
//! Uses miette for rich diagnostics with source code spans.

#![allow(unused_assignments)] // Fields are read by miette's derive macro via attributes

use std::{ops::Range, path::PathBuf};

use miette::{Diagnostic, NamedSource, SourceSpan};

use crate::TicketSystem;

/// Fatal conditions. None of them abort processing of the rest of the document on their own;
/// callers collect them and decide whether to fail fast.
#[derive(Debug, Diagnostic, thiserror::Error)]
pub enum TixError {
	#[error("malformed special block in ticket '{ticket}' (line {line}): {detail}")]
	#[diagnostic(code(tix::special_block::malformed), help("special block content must be a `key: value` list, e.g. `labels: [bug, ui]`"))]
	MalformedSpecialBlock {
		ticket: String,
		line: usize,
		detail: String,
		#[source_code]
		src: NamedSource<String>,
		#[label("could not read fields from this block")]
		span: SourceSpan,
	},

	#[error("ticket '{ticket}' (line {line}) is at level {level}, but {system} supports only {max} level(s)")]
	#[diagnostic(code(tix::render::unsupported_depth), help("remove a heading level, or render with the flatten depth policy"))]
	UnsupportedHierarchyDepth {
		ticket: String,
		line: usize,
		level: usize,
		system: TicketSystem,
		max: usize,
	},

	#[error("failed to load settings")]
	#[diagnostic(code(tix::settings::load))]
	Settings(#[from] config::ConfigError),

	#[error("no ticket system configured")]
	#[diagnostic(code(tix::settings::no_system), help("add a `github` or `jira` section to tix.yml"))]
	NoTicketSystem,

	#[error("failed to read {}", path.display())]
	#[diagnostic(code(tix::io))]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

/// Non-fatal conditions, reported alongside the output.
#[derive(Clone, Debug, derive_more::Display, Eq, PartialEq)]
pub enum Warning {
	#[display("variable '{name}' has no value, substituting an empty string")]
	UnresolvedVariable { name: String },
	#[display("environment variable '{variable}' (for '{name}') is not set, substituting an empty string")]
	UnsetEnvironmentVariable { name: String, variable: String },
	#[display("ticket '{ticket}' at level {level} is deeper than {system} supports, rendering it as {kind}")]
	DepthFlattened {
		ticket: String,
		level: usize,
		system: TicketSystem,
		kind: crate::EntityKind,
	},
}

/// Push a warning unless an identical one was already recorded.
pub(crate) fn record(warnings: &mut Vec<Warning>, warning: Warning) {
	if !warnings.contains(&warning) {
		tracing::warn!("{warning}");
		warnings.push(warning);
	}
}

/// Holds source content and filename for error reporting.
#[derive(Clone, Debug, derive_new::new)]
pub struct SourceContext {
	#[new(into)]
	pub content: String,
	#[new(into)]
	pub filename: String,
}

impl SourceContext {
	/// Create a NamedSource for miette diagnostics.
	pub fn named_source(&self) -> NamedSource<String> {
		NamedSource::new(&self.filename, self.content.clone())
	}

	/// 1-indexed line number containing the byte `offset`.
	pub fn line_of(&self, offset: usize) -> usize {
		let offset = offset.min(self.content.len());
		self.content.as_bytes()[..offset].iter().filter(|&&b| b == b'\n').count() + 1
	}

	/// Span for a byte range, clamped to the content.
	pub fn span(&self, range: &Range<usize>) -> SourceSpan {
		let start = range.start.min(self.content.len());
		let end = range.end.clamp(start, self.content.len());
		(start, end - start).into()
	}
}

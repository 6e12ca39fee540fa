//! Variable substitution.
//!
//! Settings declare `name: value` pairs; every occurrence of `name` in ticket text is replaced by
//! its value. A value starting with `$` names an environment variable, read at resolution time.
//! Substitution is single pass: replaced text is never scanned again.

use std::collections::{BTreeMap, HashMap};

use regex::{Captures, Regex};

use crate::{
	error::{Warning, record},
	field::{FieldBlock, FieldMap, map_text},
	settings::Settings,
	ticket::{ListItem, ListSegment, Segment, TextRun, TextSegment, Ticket, TicketTree},
};

/// Source of environment variables.
pub trait EnvSource {
	fn var(&self, name: &str) -> Option<String>;
}

/// The process environment.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
	fn var(&self, name: &str) -> Option<String> {
		std::env::var(name).ok()
	}
}

impl EnvSource for HashMap<String, String> {
	fn var(&self, name: &str) -> Option<String> {
		self.get(name).cloned()
	}
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum VariableValue {
	Literal(String),
	Env(String),
	/// Declared without a value.
	Missing,
}

impl VariableValue {
	fn parse(value: Option<&str>) -> Self {
		match value {
			None => VariableValue::Missing,
			Some(value) => match value.strip_prefix('$') {
				Some(env) if !env.is_empty() => VariableValue::Env(env.to_string()),
				_ => VariableValue::Literal(value.to_string()),
			},
		}
	}
}

/// Name → value table, read-only once built.
#[derive(Clone, Debug, Default)]
pub struct VariableTable {
	entries: BTreeMap<String, VariableValue>,
	/// Alternation of every name, longest first, so overlapping names prefer the longer one.
	pattern: Option<Regex>,
}

impl VariableTable {
	pub fn new<K: Into<String>, V: AsRef<str>>(entries: impl IntoIterator<Item = (K, Option<V>)>) -> Self {
		let entries: BTreeMap<String, VariableValue> = entries
			.into_iter()
			.map(|(name, value)| (name.into(), VariableValue::parse(value.as_ref().map(AsRef::as_ref))))
			.filter(|(name, _)| !name.is_empty())
			.collect();

		let mut names: Vec<&String> = entries.keys().collect();
		names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
		let pattern = match names.is_empty() {
			true => None,
			false => {
				let alternation = names.iter().map(|name| word_pattern(name)).collect::<Vec<_>>().join("|");
				Regex::new(&alternation)
					.inspect_err(|e| tracing::error!("[variables] {} variable(s) left unsubstituted: {e}", names.len()))
					.ok()
			}
		};

		Self { entries, pattern }
	}

	/// Table from the top-level `variables` plus every system's own `variables`.
	pub fn from_settings(settings: &Settings) -> Self {
		let mut merged: BTreeMap<String, Option<String>> = settings.variables.clone();
		for (system, variables) in settings.system_variables() {
			for (name, value) in variables {
				if let Some(previous) = merged.insert(name.clone(), value.clone())
					&& previous != *value
				{
					tracing::debug!("[variables] {system} overrides '{name}'");
				}
			}
		}
		Self::new(merged)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Replace every variable in `text`. Unknown or unset values become empty strings and are
	/// recorded in `warnings`.
	pub fn resolve(&self, text: &str, env: &dyn EnvSource, warnings: &mut Vec<Warning>) -> String {
		let Some(pattern) = &self.pattern else {
			return text.to_string();
		};
		pattern.replace_all(text, |caps: &Captures| self.lookup(&caps[0], env, warnings)).into_owned()
	}

	fn lookup(&self, name: &str, env: &dyn EnvSource, warnings: &mut Vec<Warning>) -> String {
		match self.entries.get(name) {
			Some(VariableValue::Literal(value)) => value.clone(),
			Some(VariableValue::Env(variable)) => env.var(variable).unwrap_or_else(|| {
				record(
					warnings,
					Warning::UnsetEnvironmentVariable {
						name: name.to_string(),
						variable: variable.clone(),
					},
				);
				String::new()
			}),
			Some(VariableValue::Missing) | None => {
				record(warnings, Warning::UnresolvedVariable { name: name.to_string() });
				String::new()
			}
		}
	}

	pub fn resolve_fields(&self, fields: &FieldMap, env: &dyn EnvSource, warnings: &mut Vec<Warning>) -> FieldMap {
		map_text(fields, &mut |text| self.resolve(text, env, warnings))
	}

	fn resolve_runs(&self, runs: &[TextRun], env: &dyn EnvSource, warnings: &mut Vec<Warning>) -> Vec<TextRun> {
		runs.iter().map(|run| TextRun::styled(self.resolve(&run.text, env, warnings), run.style.clone())).collect()
	}

	/// Substitute inside one segment. Code blocks pass through verbatim.
	pub fn resolve_segment(&self, segment: &Segment, env: &dyn EnvSource, warnings: &mut Vec<Warning>) -> Segment {
		match segment {
			Segment::Text(text) => Segment::Text(TextSegment::new(self.resolve_runs(text.runs(), env, warnings))),
			Segment::List(list) => Segment::List(ListSegment::new(
				list.ordered(),
				list.items()
					.iter()
					.map(|item| ListItem {
						runs: self.resolve_runs(&item.runs, env, warnings),
						..item.clone()
					})
					.collect(),
			)),
			Segment::CodeBlock(_) => segment.clone(),
		}
	}

	/// Substitute across a whole tree: body text, list items and every text field value.
	pub fn resolve_tree(&self, tree: &TicketTree, env: &dyn EnvSource) -> (TicketTree, Vec<Warning>) {
		let mut warnings = Vec::new();
		let resolved = tree.map(|ticket| Ticket {
			body: ticket.body.iter().map(|segment| self.resolve_segment(segment, env, &mut warnings)).collect(),
			field_blocks: ticket
				.field_blocks
				.iter()
				.map(|block| FieldBlock::new(block.scope, self.resolve_fields(&block.fields, env, &mut warnings)))
				.collect(),
			..ticket.clone()
		});
		(resolved, warnings)
	}
}

/// Escaped `name`, anchored on word boundaries where the name itself starts/ends with a word char.
fn word_pattern(name: &str) -> String {
	let is_word = |c: char| c.is_alphanumeric() || c == '_';
	let mut pattern = String::new();
	if name.chars().next().is_some_and(is_word) {
		pattern.push_str(r"\b");
	}
	pattern.push_str(&regex::escape(name));
	if name.chars().last().is_some_and(is_word) {
		pattern.push_str(r"\b");
	}
	pattern
}

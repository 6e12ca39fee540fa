//! Per-system markup conventions.
//!
//! Templates use `$text`, `$url`, `$lang`, `$content` and `$fence` placeholders. `$fence` is a run
//! of backticks longer than any run inside the code block content (minimum three).

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::{
	TicketSystem,
	ticket::{CodeBlockSegment, ListSegment, TextRun},
};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$(text|url|lang|content|fence)").unwrap());

/// How nested list items are marked.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListNesting {
	/// Markers of every enclosing item are repeated in front of the item's own (`#-`, `--`).
	Repeat,
	/// The item is indented by the width of every enclosing marker.
	Indent,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct FormattingTable {
	pub strong: String,
	pub emphasis: String,
	pub strikethrough: String,
	pub code: String,
	pub link: String,
	pub unordered: String,
	pub ordered: String,
	pub nesting: ListNesting,
	pub code_block: String,
	/// Code block without a language tag.
	pub code_block_plain: String,
}

/// Partial [`FormattingTable`], read from `<system>.formatting` in settings.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct FormattingOverrides {
	pub strong: Option<String>,
	pub emphasis: Option<String>,
	pub strikethrough: Option<String>,
	pub code: Option<String>,
	pub link: Option<String>,
	pub unordered: Option<String>,
	pub ordered: Option<String>,
	pub nesting: Option<ListNesting>,
	pub code_block: Option<String>,
	pub code_block_plain: Option<String>,
}

impl FormattingTable {
	pub fn jira() -> Self {
		Self {
			strong: "*$text*".into(),
			emphasis: "_$text_".into(),
			strikethrough: "-$text-".into(),
			code: "{{$text}}".into(),
			link: "[$text|$url]".into(),
			unordered: "-".into(),
			ordered: "#".into(),
			nesting: ListNesting::Repeat,
			code_block: "{code:$lang}\n$content{code}".into(),
			code_block_plain: "{code}\n$content{code}".into(),
		}
	}

	pub fn github() -> Self {
		Self {
			strong: "**$text**".into(),
			emphasis: "*$text*".into(),
			strikethrough: "~~$text~~".into(),
			code: "`$text`".into(),
			link: "[$text]($url)".into(),
			unordered: "-".into(),
			ordered: "1.".into(),
			nesting: ListNesting::Indent,
			code_block: "$fence$lang\n$content$fence".into(),
			code_block_plain: "$fence\n$content$fence".into(),
		}
	}

	pub fn for_system(system: TicketSystem) -> Self {
		match system {
			TicketSystem::Github => Self::github(),
			TicketSystem::Jira => Self::jira(),
		}
	}

	pub fn with_overrides(mut self, overrides: &FormattingOverrides) -> Self {
		let FormattingOverrides {
			strong,
			emphasis,
			strikethrough,
			code,
			link,
			unordered,
			ordered,
			nesting,
			code_block,
			code_block_plain,
		} = overrides.clone();
		let set = |slot: &mut String, value: Option<String>| {
			if let Some(value) = value {
				*slot = value;
			}
		};
		set(&mut self.strong, strong);
		set(&mut self.emphasis, emphasis);
		set(&mut self.strikethrough, strikethrough);
		set(&mut self.code, code);
		set(&mut self.link, link);
		set(&mut self.unordered, unordered);
		set(&mut self.ordered, ordered);
		set(&mut self.code_block, code_block);
		set(&mut self.code_block_plain, code_block_plain);
		if let Some(nesting) = nesting {
			self.nesting = nesting;
		}
		self
	}

	/// Render styled runs. Code is innermost, links outermost.
	pub fn runs(&self, runs: &[TextRun]) -> String {
		let mut out = String::new();
		for run in runs {
			let style = &run.style;
			let mut text = run.text.clone();
			if style.code {
				text = fill(&self.code, &[("text", &text)]);
			}
			if style.strikethrough {
				text = fill(&self.strikethrough, &[("text", &text)]);
			}
			if style.emphasis {
				text = fill(&self.emphasis, &[("text", &text)]);
			}
			if style.strong {
				text = fill(&self.strong, &[("text", &text)]);
			}
			if let Some(url) = &style.link {
				text = fill(&self.link, &[("text", &text), ("url", url)]);
			}
			out.push_str(&text);
		}
		out
	}

	/// One line per item.
	pub fn list(&self, list: &ListSegment) -> String {
		// Markers of the enclosing items, outermost first
		let mut ancestors: Vec<&str> = Vec::new();
		let mut lines = Vec::new();
		for item in list.items() {
			ancestors.truncate(item.depth);
			let marker = if item.ordered { self.ordered.as_str() } else { self.unordered.as_str() };
			let prefix = match self.nesting {
				ListNesting::Repeat => format!("{}{marker} ", ancestors.concat()),
				ListNesting::Indent => {
					let indent: usize = ancestors.iter().map(|m| m.chars().count() + 1).sum();
					format!("{}{marker} ", " ".repeat(indent))
				}
			};
			let continuation = match self.nesting {
				ListNesting::Repeat => String::new(),
				ListNesting::Indent => " ".repeat(prefix.chars().count()),
			};
			let text = self.runs(&item.runs).replace('\n', &format!("\n{continuation}"));
			lines.push(format!("{prefix}{text}"));
			ancestors.push(marker);
		}
		lines.join("\n")
	}

	pub fn code_block(&self, block: &CodeBlockSegment) -> String {
		let fence = fence_for(block.content());
		let template = if block.language().is_empty() { &self.code_block_plain } else { &self.code_block };
		fill(template, &[("lang", block.language()), ("content", block.content()), ("fence", &fence)])
	}
}

/// Backtick fence that cannot be closed from inside `content`.
fn fence_for(content: &str) -> String {
	let longest = content.split(|c| c != '`').map(str::len).max().unwrap_or(0);
	"`".repeat((longest + 1).max(3))
}

/// Single pass over `template`; substituted values are never rescanned.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
	PLACEHOLDER
		.replace_all(template, |caps: &Captures| match values.iter().find(|(name, _)| *name == &caps[1]) {
			Some((_, value)) => value.to_string(),
			None => caps[0].to_string(),
		})
		.into_owned()
}

//! Special field blocks.
//!
//! A fenced block whose language tag is exactly `tix`, `github` or `jira` carries fields instead of
//! code:
//! ````text
//! ```jira
//! // Adds field to the ticket only if the ticketing system is jira.
//! labels: [backend, api]
//! ```
//! ````
//! Content is a YAML mapping; lines starting with `//` are comments.

use crate::{
	field::{FieldBlock, FieldMap, FieldScope},
	markdown::{Fence, Node},
};

/// Scope of `node` if it is a special block.
pub fn scope(node: &Node) -> Option<FieldScope> {
	match node {
		Node::CodeBlock {
			fence: Fence::Fenced { info }, ..
		} => FieldScope::from_tag(info),
		_ => None,
	}
}

/// Resolve `node` into a field block. `None` when the node is not a special block at all,
/// `Some(Err(detail))` when it is one but its content cannot be read.
pub fn resolve(node: &Node) -> Option<Result<FieldBlock, String>> {
	let scope = scope(node)?;
	let Node::CodeBlock { content, .. } = node else {
		return None;
	};
	Some(parse_fields(content).map(|fields| FieldBlock::new(scope, fields)))
}

/// Parse block content into a flat mapping (values may nest).
pub fn parse_fields(content: &str) -> Result<FieldMap, String> {
	let stripped: String = content
		.lines()
		.filter(|line| !line.trim_start().starts_with("//"))
		.map(|line| format!("{line}\n"))
		.collect();
	if stripped.trim().is_empty() {
		return Ok(FieldMap::new());
	}
	let fields: Option<FieldMap> = serde_yaml::from_str(&stripped).map_err(|e| e.to_string())?;
	Ok(fields.unwrap_or_default())
}

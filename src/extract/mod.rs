//! Segment extractors, one per markdown node kind.
//!
//! Every extractor is total over well-formed parser output: it either produces a segment or
//! nothing. Special field blocks are resolved by [`special`].

pub mod special;

use crate::{
	markdown::{Fence, Inline, ListNode, Node},
	ticket::{CodeBlockSegment, ListItem, ListSegment, Segment, TextRun, TextSegment, TextStyle},
};

/// Flatten nested inline formatting into runs, merging neighbours with the same attributes.
pub fn flatten_inlines(inlines: &[Inline]) -> Vec<TextRun> {
	let mut runs = Vec::new();
	flatten_into(inlines, &TextStyle::default(), &mut runs);
	runs
}

fn flatten_into(inlines: &[Inline], style: &TextStyle, runs: &mut Vec<TextRun>) {
	for inline in inlines {
		match inline {
			Inline::Text(text) => push_run(runs, text, style.clone()),
			Inline::Code(code) => push_run(runs, code, TextStyle { code: true, ..style.clone() }),
			Inline::Emphasis(inner) => flatten_into(inner, &TextStyle { emphasis: true, ..style.clone() }, runs),
			Inline::Strong(inner) => flatten_into(inner, &TextStyle { strong: true, ..style.clone() }, runs),
			Inline::Strikethrough(inner) => flatten_into(inner, &TextStyle { strikethrough: true, ..style.clone() }, runs),
			Inline::Link { url, content } => flatten_into(
				content,
				&TextStyle {
					link: Some(url.clone()),
					..style.clone()
				},
				runs,
			),
			// Line breaks never carry emphasis, or the markup would wrap a bare newline
			Inline::Break => push_run(
				runs,
				"\n",
				TextStyle {
					link: style.link.clone(),
					..TextStyle::default()
				},
			),
		}
	}
}

fn push_run(runs: &mut Vec<TextRun>, text: &str, style: TextStyle) {
	if text.is_empty() {
		return;
	}
	match runs.last_mut() {
		Some(last) if last.style == style => last.text.push_str(text),
		_ => runs.push(TextRun::styled(text, style)),
	}
}

/// Paragraph → text segment. Empty paragraphs produce nothing.
pub fn paragraph(text: &[Inline]) -> Option<Segment> {
	let runs = flatten_inlines(text);
	if runs.iter().all(|run| run.text.trim().is_empty()) {
		return None;
	}
	Some(Segment::Text(TextSegment::new(runs)))
}

/// List (arbitrarily nested) → one list segment with relative depths.
pub fn list(node: &ListNode) -> Segment {
	let mut items = Vec::new();
	collect_items(node, 0, &mut items);
	Segment::List(ListSegment::new(node.ordered, items))
}

fn collect_items(node: &ListNode, depth: usize, items: &mut Vec<ListItem>) {
	for item in &node.items {
		items.push(ListItem {
			runs: flatten_inlines(&item.text),
			depth,
			ordered: node.ordered,
		});
		for child in &item.children {
			collect_items(child, depth + 1, items);
		}
	}
}

/// Code block → code block segment.
///
/// One extractor recognizes either fenced or indented blocks, never both; the builder runs one of
/// each so every code block is picked up by exactly one.
#[derive(Clone, Copy, Debug, derive_new::new)]
pub struct CodeBlockExtractor {
	fenced: bool,
}

impl CodeBlockExtractor {
	pub fn extract(&self, node: &Node) -> Option<Segment> {
		let Node::CodeBlock { fence, content, .. } = node else {
			return None;
		};
		match (fence, self.fenced) {
			(Fence::Fenced { info }, true) => Some(Segment::CodeBlock(CodeBlockSegment::new(content.as_str(), info.as_str()))),
			(Fence::Indented, false) => Some(Segment::CodeBlock(CodeBlockSegment::new(content.as_str(), ""))),
			_ => None,
		}
	}
}

//! Markdown syntax tree.
//!
//! pulldown_cmark produces a flat event stream; this module folds it into a closed set of block
//! nodes the hierarchy builder can dispatch on. Inline structure is kept nested here and flattened
//! into styled runs by the extractors.

use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::field::FieldScope;

/// A block-level markdown element, in document order.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
	Heading { level: usize, text: Vec<Inline>, span: Range<usize> },
	Paragraph { text: Vec<Inline>, span: Range<usize> },
	List(ListNode),
	CodeBlock { fence: Fence, content: String, span: Range<usize> },
	/// Elements without an extractor (tables, html blocks, rules, ...).
	Unsupported { kind: &'static str, span: Range<usize> },
}

impl Node {
	pub fn span(&self) -> &Range<usize> {
		match self {
			Node::Heading { span, .. } | Node::Paragraph { span, .. } | Node::CodeBlock { span, .. } | Node::Unsupported { span, .. } => span,
			Node::List(list) => &list.span,
		}
	}
}

/// How a code block was written.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Fence {
	/// ```` ```lang ```` block. `info` is the first word of the info string, possibly empty.
	Fenced { info: String },
	/// Indentation-only block.
	Indented,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListNode {
	pub ordered: bool,
	pub items: Vec<ItemNode>,
	pub span: Range<usize>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ItemNode {
	pub text: Vec<Inline>,
	pub children: Vec<ListNode>,
}

/// Inline content with its formatting nesting preserved.
#[derive(Clone, Debug, PartialEq)]
pub enum Inline {
	Text(String),
	Code(String),
	Emphasis(Vec<Inline>),
	Strong(Vec<Inline>),
	Strikethrough(Vec<Inline>),
	Link { url: String, content: Vec<Inline> },
	Break,
}

impl Inline {
	/// Plain text with all formatting dropped.
	pub fn plain_text(inlines: &[Inline]) -> String {
		let mut out = String::new();
		for inline in inlines {
			match inline {
				Inline::Text(text) | Inline::Code(text) => out.push_str(text),
				Inline::Emphasis(inner) | Inline::Strong(inner) | Inline::Strikethrough(inner) | Inline::Link { content: inner, .. } => out.push_str(&Self::plain_text(inner)),
				Inline::Break => out.push(' '),
			}
		}
		out
	}
}

pub fn options() -> Options {
	Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS | Options::ENABLE_TABLES
}

/// Parse markdown source into block nodes.
pub fn parse(source: &str) -> Vec<Node> {
	let mut folder = Folder::default();
	for (event, range) in Parser::new_ext(source, options()).into_offset_iter() {
		folder.event(event, range);
	}
	folder.finish()
}

#[derive(Debug)]
enum Frame {
	Heading { level: usize, inlines: Vec<Inline>, span: Range<usize> },
	Paragraph { inlines: Vec<Inline>, span: Range<usize> },
	Inline { kind: InlineKind, inlines: Vec<Inline> },
	List(ListNode),
	Item(ItemNode),
	CodeBlock { fence: Fence, content: String, span: Range<usize> },
}

#[derive(Debug)]
enum InlineKind {
	Emphasis,
	Strong,
	Strikethrough,
	Link(String),
}

/// Skipped container: everything up to the matching end event is swallowed.
#[derive(Debug)]
struct Skip {
	kind: &'static str,
	depth: usize,
	span: Range<usize>,
}

#[derive(Debug, Default)]
struct Folder {
	nodes: Vec<Node>,
	stack: Vec<Frame>,
	skip: Option<Skip>,
}

impl Folder {
	fn event(&mut self, event: Event<'_>, range: Range<usize>) {
		if let Some(skip) = &mut self.skip {
			match event {
				Event::Start(_) => skip.depth += 1,
				Event::End(_) => skip.depth -= 1,
				_ => {}
			}
			if skip.depth == 0
				&& let Some(skip) = self.skip.take()
			{
				tracing::debug!("[markdown] skipped unsupported {} at {:?}", skip.kind, skip.span);
				self.nodes.push(Node::Unsupported { kind: skip.kind, span: skip.span });
			}
			return;
		}

		match event {
			Event::Start(tag) => self.start(tag, range),
			Event::End(tag_end) => self.end(tag_end),
			Event::Text(text) => {
				if let Some(Frame::CodeBlock { content, .. }) = self.stack.last_mut() {
					content.push_str(&text);
				} else {
					self.push_inline(Inline::Text(text.into_string()));
				}
			}
			Event::Code(code) => self.push_inline(Inline::Code(code.into_string())),
			Event::InlineHtml(html) => self.push_inline(Inline::Text(html.into_string())),
			Event::InlineMath(math) | Event::DisplayMath(math) => self.push_inline(Inline::Code(math.into_string())),
			Event::FootnoteReference(name) => self.push_inline(Inline::Text(format!("[^{name}]"))),
			Event::SoftBreak | Event::HardBreak => self.push_inline(Inline::Break),
			Event::TaskListMarker(checked) => self.push_inline(Inline::Text(if checked { "[x] ".into() } else { "[ ] ".into() })),
			Event::Rule => self.nodes.push(Node::Unsupported { kind: "rule", span: range }),
			// Stray html outside an html block
			Event::Html(html) => self.push_inline(Inline::Text(html.into_string())),
		}
	}

	fn start(&mut self, tag: Tag<'_>, range: Range<usize>) {
		match tag {
			Tag::Heading { level, .. } => self.stack.push(Frame::Heading {
				level: heading_level(level),
				inlines: Vec::new(),
				span: range,
			}),
			Tag::Paragraph => self.stack.push(Frame::Paragraph { inlines: Vec::new(), span: range }),
			Tag::Emphasis => self.stack.push(Frame::Inline {
				kind: InlineKind::Emphasis,
				inlines: Vec::new(),
			}),
			Tag::Strong => self.stack.push(Frame::Inline {
				kind: InlineKind::Strong,
				inlines: Vec::new(),
			}),
			Tag::Strikethrough => self.stack.push(Frame::Inline {
				kind: InlineKind::Strikethrough,
				inlines: Vec::new(),
			}),
			Tag::Link { dest_url, .. } | Tag::Image { dest_url, .. } => self.stack.push(Frame::Inline {
				kind: InlineKind::Link(dest_url.into_string()),
				inlines: Vec::new(),
			}),
			Tag::List(start) => self.stack.push(Frame::List(ListNode {
				ordered: start.is_some(),
				items: Vec::new(),
				span: range,
			})),
			Tag::Item => self.stack.push(Frame::Item(ItemNode::default())),
			Tag::CodeBlock(kind) => {
				let fence = match kind {
					CodeBlockKind::Fenced(info) => Fence::Fenced {
						info: info.split_whitespace().next().unwrap_or_default().to_string(),
					},
					CodeBlockKind::Indented => Fence::Indented,
				};
				self.stack.push(Frame::CodeBlock {
					fence,
					content: String::new(),
					span: range,
				});
			}
			// Quotes are transparent: their blocks become ordinary nodes
			Tag::BlockQuote(_) => {}
			Tag::Superscript | Tag::Subscript => {}
			Tag::Table(_) => self.start_skip("table", range),
			Tag::HtmlBlock => self.start_skip("html", range),
			Tag::FootnoteDefinition(_) => self.start_skip("footnote", range),
			Tag::MetadataBlock(_) => self.start_skip("metadata", range),
			Tag::TableHead | Tag::TableRow | Tag::TableCell => self.start_skip("table", range),
			Tag::DefinitionList | Tag::DefinitionListTitle | Tag::DefinitionListDefinition => self.start_skip("definition list", range),
		}
	}

	fn start_skip(&mut self, kind: &'static str, span: Range<usize>) {
		self.skip = Some(Skip { kind, depth: 1, span });
	}

	fn end(&mut self, tag_end: TagEnd) {
		match tag_end {
			TagEnd::BlockQuote(_) | TagEnd::Superscript | TagEnd::Subscript => {}
			TagEnd::Heading(_) => {
				if let Some(Frame::Heading { level, inlines, span }) = self.stack.pop() {
					self.push_block(Node::Heading { level, text: inlines, span });
				}
			}
			TagEnd::Paragraph => {
				if let Some(Frame::Paragraph { inlines, span }) = self.stack.pop() {
					self.push_block(Node::Paragraph { text: inlines, span });
				}
			}
			TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link | TagEnd::Image => {
				if let Some(Frame::Inline { kind, inlines }) = self.stack.pop() {
					let inline = match kind {
						InlineKind::Emphasis => Inline::Emphasis(inlines),
						InlineKind::Strong => Inline::Strong(inlines),
						InlineKind::Strikethrough => Inline::Strikethrough(inlines),
						InlineKind::Link(url) => Inline::Link { url, content: inlines },
					};
					self.push_inline(inline);
				}
			}
			TagEnd::Item => {
				if let Some(Frame::Item(item)) = self.stack.pop()
					&& let Some(Frame::List(list)) = self.stack.last_mut()
				{
					list.items.push(item);
				}
			}
			TagEnd::List(_) => {
				if let Some(Frame::List(list)) = self.stack.pop() {
					match self.stack.last_mut() {
						Some(Frame::Item(item)) => item.children.push(list),
						_ => self.nodes.push(Node::List(list)),
					}
				}
			}
			TagEnd::CodeBlock => {
				if let Some(Frame::CodeBlock { fence, content, span }) = self.stack.pop() {
					self.push_block(Node::CodeBlock { fence, content, span });
				}
			}
			// Handled by the skip counter
			TagEnd::Table
			| TagEnd::TableHead
			| TagEnd::TableRow
			| TagEnd::TableCell
			| TagEnd::HtmlBlock
			| TagEnd::FootnoteDefinition
			| TagEnd::MetadataBlock(_)
			| TagEnd::DefinitionList
			| TagEnd::DefinitionListTitle
			| TagEnd::DefinitionListDefinition => {}
		}
	}

	/// Emit a finished block. Inside a list item, its text is folded into the item instead, except
	/// for special blocks, which are hoisted out so their fields still reach the ticket.
	fn push_block(&mut self, node: Node) {
		let special = match &node {
			Node::CodeBlock {
				fence: Fence::Fenced { info }, ..
			} => FieldScope::from_tag(info).is_some(),
			_ => false,
		};
		let Some(Frame::Item(item)) = self.stack.last_mut() else {
			self.nodes.push(node);
			return;
		};
		if special {
			tracing::debug!("[markdown] hoisting special block out of a list item at {:?}", node.span());
			self.nodes.push(node);
			return;
		}
		let inlines = match node {
			Node::Heading { text, .. } | Node::Paragraph { text, .. } => text,
			Node::CodeBlock { content, .. } => vec![Inline::Code(content.trim_end().to_string())],
			Node::List(_) | Node::Unsupported { .. } => return,
		};
		if !item.text.is_empty() {
			item.text.push(Inline::Break);
		}
		item.text.extend(inlines);
	}

	fn push_inline(&mut self, inline: Inline) {
		match self.stack.last_mut() {
			Some(Frame::Heading { inlines, .. } | Frame::Paragraph { inlines, .. } | Frame::Inline { inlines, .. }) => inlines.push(inline),
			Some(Frame::Item(item)) => item.text.push(inline),
			Some(Frame::CodeBlock { content, .. }) => content.push_str(&Inline::plain_text(&[inline])),
			Some(Frame::List(_)) | None => tracing::trace!("[markdown] dropping inline outside a block: {inline:?}"),
		}
	}

	fn finish(self) -> Vec<Node> {
		debug_assert!(self.stack.is_empty(), "unbalanced event stream: {:?}", self.stack);
		self.nodes
	}
}

fn heading_level(level: HeadingLevel) -> usize {
	match level {
		HeadingLevel::H1 => 1,
		HeadingLevel::H2 => 2,
		HeadingLevel::H3 => 3,
		HeadingLevel::H4 => 4,
		HeadingLevel::H5 => 5,
		HeadingLevel::H6 => 6,
	}
}

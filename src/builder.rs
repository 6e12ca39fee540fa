//! Hierarchy builder.
//!
//! Walks block nodes in document order keeping a stack of open tickets. A heading at level L pops
//! every open ticket with level >= L and becomes a child of whatever is left on top (or a root).
//! Everything else is routed through the extractors into the current ticket.

use std::ops::Range;

use crate::{
	error::{SourceContext, TixError},
	extract::{self, CodeBlockExtractor, special},
	field::FieldBlock,
	markdown::{Inline, Node},
	ticket::{Segment, Ticket, TicketId, TicketTree},
};

/// Result of building: the tree plus per-ticket errors that did not stop the build.
#[derive(Debug, Default)]
pub struct Document {
	pub tree: TicketTree,
	pub errors: Vec<TixError>,
}

/// Mutable state of one build pass.
#[derive(Debug, Default)]
pub struct ParseState {
	tree: TicketTree,
	/// Open tickets, outermost first. Empty means only the virtual root is open.
	stack: Vec<TicketId>,
	errors: Vec<TixError>,
}

impl ParseState {
	/// Open a new ticket for a heading at `ticket.level`.
	pub fn start_ticket(&mut self, ticket: Ticket) -> TicketId {
		while self.stack.last().is_some_and(|&open| self.tree.get(open).level >= ticket.level) {
			self.stack.pop();
		}
		let parent = self.stack.last().copied();
		tracing::debug!("[build] ticket '{}' at level {} under {:?}", ticket.title, ticket.level, parent.map(|p| &self.tree.get(p).title));
		let id = self.tree.push(parent, ticket);
		self.stack.push(id);
		id
	}

	pub fn current_ticket(&self) -> Option<&Ticket> {
		self.stack.last().map(|&id| self.tree.get(id))
	}

	pub fn current_ticket_mut(&mut self) -> Option<&mut Ticket> {
		self.stack.last().map(|&id| self.tree.get_mut(id))
	}

	fn push_segment(&mut self, segment: Segment) {
		match self.current_ticket_mut() {
			Some(ticket) => ticket.body.push(segment),
			None => tracing::trace!("[build] dropping content before the first heading: {segment:?}"),
		}
	}

	pub fn finish(self) -> Document {
		Document {
			tree: self.tree,
			errors: self.errors,
		}
	}
}

/// Builds a [`TicketTree`] from parsed markdown.
#[derive(Debug)]
pub struct TicketBuilder<'a> {
	ctx: &'a SourceContext,
	code_extractors: [CodeBlockExtractor; 2],
}

impl<'a> TicketBuilder<'a> {
	pub fn new(ctx: &'a SourceContext) -> Self {
		Self {
			ctx,
			code_extractors: [CodeBlockExtractor::new(true), CodeBlockExtractor::new(false)],
		}
	}

	pub fn build(&self, nodes: &[Node]) -> Document {
		let mut state = ParseState::default();
		for node in nodes {
			self.visit(&mut state, node);
		}
		state.finish()
	}

	fn visit(&self, state: &mut ParseState, node: &Node) {
		match node {
			Node::Heading { level, text, span } => {
				let mut ticket = Ticket::new(Inline::plain_text(text).trim(), *level);
				ticket.line = self.ctx.line_of(span.start);
				ticket.span = span.clone();
				state.start_ticket(ticket);
			}
			Node::Paragraph { text, .. } => {
				if let Some(segment) = extract::paragraph(text) {
					state.push_segment(segment);
				}
			}
			Node::List(list) => state.push_segment(extract::list(list)),
			Node::CodeBlock { span, .. } => {
				if let Some(resolved) = special::resolve(node) {
					self.attach_fields(state, resolved, span);
					return;
				}
				for extractor in &self.code_extractors {
					if let Some(segment) = extractor.extract(node) {
						state.push_segment(segment);
					}
				}
			}
			Node::Unsupported { kind, span } => tracing::debug!("[build] no extractor for {kind} at line {}", self.ctx.line_of(span.start)),
		}
	}

	fn attach_fields(&self, state: &mut ParseState, resolved: Result<FieldBlock, String>, span: &Range<usize>) {
		let Some(ticket) = state.current_ticket_mut() else {
			tracing::trace!("[build] dropping special block before the first heading");
			return;
		};
		match resolved {
			Ok(block) => {
				tracing::debug!("[build] '{}': {} field(s) from `{}` block", ticket.title, block.fields.len(), block.scope);
				ticket.field_blocks.push(block);
			}
			Err(detail) => {
				let error = TixError::MalformedSpecialBlock {
					ticket: ticket.title.clone(),
					line: self.ctx.line_of(span.start),
					detail,
					src: self.ctx.named_source(),
					span: self.ctx.span(span),
				};
				tracing::debug!("[build] {error}");
				state.errors.push(error);
			}
		}
	}
}

/// Parse `ctx.content` and build its ticket tree.
pub fn build(ctx: &SourceContext) -> Document {
	let nodes = crate::markdown::parse(&ctx.content);
	TicketBuilder::new(ctx).build(&nodes)
}

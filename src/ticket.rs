//! Core ticket data structures.
//!
//! Tickets live in an arena ([`TicketTree`]) and link to each other by [`TicketId`], so the tree
//! can be walked by several render passes without shared ownership.

use std::ops::Range;

use serde::Serialize;

use crate::{
	TicketSystem,
	field::{FieldBlock, FieldMap, merge_into},
};

/// Index of a ticket within its [`TicketTree`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct TicketId(usize);

impl TicketId {
	pub fn index(self) -> usize {
		self.0
	}
}

/// Inline attributes carried by a [`TextRun`].
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Serialize)]
pub struct TextStyle {
	pub strong: bool,
	pub emphasis: bool,
	pub strikethrough: bool,
	pub code: bool,
	pub link: Option<String>,
}

impl TextStyle {
	pub fn is_plain(&self) -> bool {
		*self == Self::default()
	}
}

/// A run of text sharing one set of inline attributes.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TextRun {
	pub text: String,
	pub style: TextStyle,
}

impl TextRun {
	pub fn plain(text: impl Into<String>) -> Self {
		Self {
			text: text.into(),
			style: TextStyle::default(),
		}
	}

	pub fn styled(text: impl Into<String>, style: TextStyle) -> Self {
		Self { text: text.into(), style }
	}
}

/// Concatenated text of runs, formatting dropped.
pub fn plain_text(runs: &[TextRun]) -> String {
	runs.iter().map(|run| run.text.as_str()).collect()
}

/// Paragraph text.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TextSegment {
	runs: Vec<TextRun>,
}

impl TextSegment {
	pub fn new(runs: Vec<TextRun>) -> Self {
		Self { runs }
	}

	pub fn runs(&self) -> &[TextRun] {
		&self.runs
	}

	pub fn text(&self) -> String {
		plain_text(&self.runs)
	}
}

/// One list entry. `depth` is relative to the list the segment was built from (0 = top level).
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ListItem {
	pub runs: Vec<TextRun>,
	pub depth: usize,
	/// Whether the list this item belongs to is numbered. Nested lists may differ from the outer one.
	pub ordered: bool,
}

impl ListItem {
	pub fn text(&self) -> String {
		plain_text(&self.runs)
	}
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ListSegment {
	ordered: bool,
	items: Vec<ListItem>,
}

impl ListSegment {
	pub fn new(ordered: bool, items: Vec<ListItem>) -> Self {
		Self { ordered, items }
	}

	pub fn ordered(&self) -> bool {
		self.ordered
	}

	pub fn items(&self) -> &[ListItem] {
		&self.items
	}
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CodeBlockSegment {
	content: String,
	language: String,
}

impl CodeBlockSegment {
	/// Content is kept verbatim, except that it always ends in exactly one newline.
	pub fn new(content: impl Into<String>, language: impl Into<String>) -> Self {
		let mut content = content.into();
		while content.ends_with("\n\n") {
			content.pop();
		}
		if !content.ends_with('\n') {
			content.push('\n');
		}
		Self {
			content,
			language: language.into(),
		}
	}

	pub fn content(&self) -> &str {
		&self.content
	}

	pub fn language(&self) -> &str {
		&self.language
	}
}

/// One semantically typed unit of a ticket body.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
	Text(TextSegment),
	List(ListSegment),
	CodeBlock(CodeBlockSegment),
}

/// A heading-derived unit.
#[derive(Clone, Debug, PartialEq)]
pub struct Ticket {
	pub title: String,
	/// Heading depth, >= 1.
	pub level: usize,
	pub body: Vec<Segment>,
	/// Special blocks in document order. Merged per render target by [`Ticket::fields`].
	pub field_blocks: Vec<FieldBlock>,
	pub parent: Option<TicketId>,
	pub children: Vec<TicketId>,
	/// 1-indexed line of the heading.
	pub line: usize,
	/// Byte range of the heading in the source.
	pub span: Range<usize>,
}

impl Ticket {
	pub fn new(title: impl Into<String>, level: usize) -> Self {
		debug_assert!(level >= 1, "Ticket level must be >= 1");
		Self {
			title: title.into(),
			level: level.max(1),
			body: Vec::new(),
			field_blocks: Vec::new(),
			parent: None,
			children: Vec::new(),
			line: 0,
			span: 0..0,
		}
	}

	/// Fields from every block that applies to `system`, merged in document order; later keys win.
	/// `None` only merges generic blocks.
	pub fn fields(&self, system: Option<TicketSystem>) -> FieldMap {
		let mut fields = FieldMap::new();
		for block in self.field_blocks.iter().filter(|block| block.scope.applies_to(system)) {
			merge_into(&mut fields, &block.fields);
		}
		fields
	}
}

/// Arena of tickets. The virtual root (level 0) is implicit: its children are [`TicketTree::roots`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TicketTree {
	tickets: Vec<Ticket>,
	roots: Vec<TicketId>,
}

impl TicketTree {
	pub fn new() -> Self {
		Self::default()
	}

	/// Attach `ticket` under `parent` (or as a root) and return its id.
	pub fn push(&mut self, parent: Option<TicketId>, mut ticket: Ticket) -> TicketId {
		let id = TicketId(self.tickets.len());
		ticket.parent = parent;
		ticket.children.clear();
		self.tickets.push(ticket);
		match parent {
			Some(parent) => self.tickets[parent.0].children.push(id),
			None => self.roots.push(id),
		}
		id
	}

	pub fn get(&self, id: TicketId) -> &Ticket {
		&self.tickets[id.0]
	}

	pub fn get_mut(&mut self, id: TicketId) -> &mut Ticket {
		&mut self.tickets[id.0]
	}

	pub fn roots(&self) -> &[TicketId] {
		&self.roots
	}

	pub fn children(&self, id: TicketId) -> &[TicketId] {
		&self.tickets[id.0].children
	}

	pub fn len(&self) -> usize {
		self.tickets.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tickets.is_empty()
	}

	/// All tickets in document order (which is also depth-first pre-order).
	pub fn iter(&self) -> impl Iterator<Item = (TicketId, &Ticket)> {
		self.tickets.iter().enumerate().map(|(i, ticket)| (TicketId(i), ticket))
	}

	/// Rebuild every ticket with `f`, keeping ids and links.
	pub fn map(&self, mut f: impl FnMut(&Ticket) -> Ticket) -> Self {
		let tickets = self
			.tickets
			.iter()
			.map(|ticket| {
				let mut mapped = f(ticket);
				mapped.parent = ticket.parent;
				mapped.children = ticket.children.clone();
				mapped
			})
			.collect();
		Self { tickets, roots: self.roots.clone() }
	}

	/// Number of headings between `id` and the virtual root, 1 for roots.
	pub fn depth(&self, id: TicketId) -> usize {
		let mut depth = 1;
		let mut current = self.get(id).parent;
		while let Some(parent) = current {
			depth += 1;
			current = self.get(parent).parent;
		}
		depth
	}
}

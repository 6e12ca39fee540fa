//! Ticket-system rendering.
//!
//! Maps heading levels to a system's entity kinds, turns each ticket body into that system's
//! markup and merges settings overlays under the ticket's own fields.

mod formatting;

use std::fmt::Write as _;

use serde::Serialize;
use smart_default::SmartDefault;

pub use formatting::{FormattingOverrides, FormattingTable, ListNesting};

use crate::{
	TicketSystem,
	error::{TixError, Warning, record},
	field::{FieldMap, merge_into},
	settings::Settings,
	ticket::{Segment, Ticket, TicketTree},
};

/// A ticketing system's name for one hierarchy level.
#[derive(Clone, Copy, Debug, derive_more::Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
	Epic,
	Story,
	Task,
	Project,
	Issue,
}

impl EntityKind {
	/// Hierarchy of `system`, outermost first.
	pub fn hierarchy(system: TicketSystem, skip_root: bool) -> &'static [EntityKind] {
		let all: &'static [EntityKind] = match system {
			TicketSystem::Jira => &[EntityKind::Epic, EntityKind::Story, EntityKind::Task],
			TicketSystem::Github => &[EntityKind::Project, EntityKind::Issue],
		};
		if skip_root { &all[1..] } else { all }
	}

	/// Kind for heading `level` in `system`. Level 1 takes the next kind down when the root kind is
	/// skipped; deeper levels keep their place. `None` past the deepest kind.
	pub fn for_level(system: TicketSystem, skip_root: bool, level: usize) -> Option<EntityKind> {
		let all = Self::hierarchy(system, false);
		let index = match (skip_root, level) {
			(true, 1) => 1,
			_ => level.checked_sub(1)?,
		};
		all.get(index).copied()
	}

	/// Key of this kind's overlay under `<system>.tickets` in settings.
	pub fn settings_key(&self) -> &'static str {
		match self {
			EntityKind::Epic => "epic",
			EntityKind::Story | EntityKind::Issue => "issue",
			EntityKind::Task => "task",
			EntityKind::Project => "project",
		}
	}
}

/// Overlay applied to every entity kind.
pub const DEFAULT_OVERLAY: &str = "default";

/// What to do with a ticket nested deeper than the target system has entity kinds.
#[derive(Clone, Copy, Debug, Eq, PartialEq, SmartDefault)]
pub enum DepthPolicy {
	/// Render it as the deepest kind and warn.
	#[default]
	Flatten,
	/// Report [`TixError::UnsupportedHierarchyDepth`] and leave it out. Its children attach to the
	/// nearest rendered ancestor.
	Fail,
}

/// One ticket, ready for an external client to create.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RenderedTicket {
	/// Position in [`Rendered::tickets`].
	pub index: usize,
	/// Index of the parent within the same output.
	pub parent: Option<usize>,
	/// Heading level of the source ticket.
	pub level: usize,
	pub entity_kind: EntityKind,
	pub title: String,
	pub body_markup: String,
	pub fields: FieldMap,
}

/// Output for one system, in document pre-order.
#[derive(Debug)]
pub struct Rendered {
	pub system: TicketSystem,
	pub tickets: Vec<RenderedTicket>,
	pub errors: Vec<TixError>,
	pub warnings: Vec<Warning>,
}

impl Rendered {
	fn depth_of(&self, ticket: &RenderedTicket) -> usize {
		let mut depth = 0;
		let mut current = ticket.parent;
		while let Some(parent) = current {
			depth += 1;
			current = self.tickets[parent].parent;
		}
		depth
	}

	/// Human-readable listing, used for dry runs.
	pub fn report(&self) -> String {
		let mut out = String::new();
		let _ = writeln!(out, "== {} ({} tickets) ==", self.system, self.tickets.len());
		for ticket in &self.tickets {
			let indent = "  ".repeat(self.depth_of(ticket));
			let _ = writeln!(out, "{indent}[{}] {}", ticket.entity_kind, ticket.title);
			for (key, value) in &ticket.fields {
				let _ = writeln!(out, "{indent}    {key}: {value}");
			}
			if !ticket.body_markup.is_empty() {
				let _ = writeln!(out, "{indent}  |");
				for line in ticket.body_markup.lines() {
					let _ = writeln!(out, "{indent}  | {line}");
				}
			}
		}
		out
	}
}

/// Renders a [`TicketTree`] for one system.
#[derive(Debug)]
pub struct Renderer<'a> {
	system: TicketSystem,
	settings: &'a Settings,
	skip_root: bool,
	formatting: FormattingTable,
	policy: DepthPolicy,
}

impl<'a> Renderer<'a> {
	pub fn new(system: TicketSystem, settings: &'a Settings) -> Self {
		let mut formatting = FormattingTable::for_system(system);
		if let Some(overrides) = settings.formatting_for(system) {
			formatting = formatting.with_overrides(overrides);
		}
		Self {
			system,
			settings,
			skip_root: settings.skips_root(system),
			formatting,
			policy: DepthPolicy::default(),
		}
	}

	pub fn with_policy(mut self, policy: DepthPolicy) -> Self {
		self.policy = policy;
		self
	}

	pub fn formatting(&self) -> &FormattingTable {
		&self.formatting
	}

	/// Body markup: segments separated by one blank line.
	pub fn body(&self, segments: &[Segment]) -> String {
		segments
			.iter()
			.map(|segment| match segment {
				Segment::Text(text) => self.formatting.runs(text.runs()),
				Segment::List(list) => self.formatting.list(list),
				Segment::CodeBlock(block) => self.formatting.code_block(block),
			})
			.collect::<Vec<_>>()
			.join("\n\n")
	}

	/// Settings overlays (`default`, then the kind's own) with the ticket's fields on top.
	pub fn fields(&self, ticket: &Ticket, kind: EntityKind) -> FieldMap {
		let mut fields = FieldMap::new();
		if let Some(overlays) = self.settings.tickets_for(self.system) {
			for key in [DEFAULT_OVERLAY, kind.settings_key()] {
				if let Some(overlay) = overlays.get(key) {
					merge_into(&mut fields, overlay);
				}
			}
		}
		merge_into(&mut fields, &ticket.fields(Some(self.system)));
		fields
	}

	fn kind_for(&self, ticket: &Ticket, warnings: &mut Vec<Warning>) -> Result<EntityKind, TixError> {
		if let Some(kind) = EntityKind::for_level(self.system, self.skip_root, ticket.level) {
			return Ok(kind);
		}
		let levels = EntityKind::hierarchy(self.system, false);
		match (self.policy, levels.last()) {
			(DepthPolicy::Flatten, Some(&deepest)) => {
				record(
					warnings,
					Warning::DepthFlattened {
						ticket: ticket.title.clone(),
						level: ticket.level,
						system: self.system,
						kind: deepest,
					},
				);
				Ok(deepest)
			}
			_ => Err(TixError::UnsupportedHierarchyDepth {
				ticket: ticket.title.clone(),
				line: ticket.line,
				level: ticket.level,
				system: self.system,
				max: levels.len(),
			}),
		}
	}

	pub fn render(&self, tree: &TicketTree) -> Rendered {
		let mut rendered = Rendered {
			system: self.system,
			tickets: Vec::with_capacity(tree.len()),
			errors: Vec::new(),
			warnings: Vec::new(),
		};
		// Ticket id -> index in the output, `None` for left-out tickets
		let mut indices: Vec<Option<usize>> = vec![None; tree.len()];

		for (id, ticket) in tree.iter() {
			let kind = match self.kind_for(ticket, &mut rendered.warnings) {
				Ok(kind) => kind,
				Err(error) => {
					tracing::debug!("[render] {error}");
					rendered.errors.push(error);
					continue;
				}
			};
			let parent = std::iter::successors(ticket.parent, |&p| tree.get(p).parent).find_map(|p| indices[p.index()]);
			let index = rendered.tickets.len();
			indices[id.index()] = Some(index);
			tracing::debug!("[render] {}: '{}' as {kind}", self.system, ticket.title);
			rendered.tickets.push(RenderedTicket {
				index,
				parent,
				level: ticket.level,
				entity_kind: kind,
				title: ticket.title.clone(),
				body_markup: self.body(&ticket.body),
				fields: self.fields(ticket, kind),
			});
		}
		rendered
	}
}

/// Render `tree` for `system` with the default depth policy.
pub fn render(tree: &TicketTree, system: TicketSystem, settings: &Settings) -> Rendered {
	Renderer::new(system, settings).render(tree)
}

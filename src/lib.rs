//! Turn a structured markdown document into a hierarchy of tickets.
//!
//! Headings become tickets, heading depth becomes hierarchy depth, body content becomes an ordered
//! sequence of [`Segment`]s and fenced blocks tagged `tix`/`github`/`jira` inject fields. The
//! resulting [`TicketTree`] is rendered per [`TicketSystem`] into [`RenderedTicket`]s that an
//! external client can create.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub mod builder;
pub mod error;
pub mod extract;
pub mod field;
pub mod markdown;
pub mod pipeline;
pub mod render;
pub mod settings;
pub mod ticket;
pub mod variables;

// Re-export the public surface at crate root for convenience
pub use builder::{Document, build};
pub use error::{SourceContext, TixError, Warning};
pub use field::{FieldBlock, FieldMap, FieldScope, FieldValue};
pub use pipeline::{Output, Tix};
pub use render::{DepthPolicy, EntityKind, Rendered, RenderedTicket, Renderer, render};
pub use settings::Settings;
pub use ticket::{CodeBlockSegment, ListItem, ListSegment, Segment, TextRun, TextSegment, TextStyle, Ticket, TicketId, TicketTree};
pub use variables::{EnvSource, ProcessEnv, VariableTable};

/// Ticketing system a document can be rendered for.
#[derive(Clone, Copy, Debug, Deserialize, derive_more::Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TicketSystem {
	#[display("github")]
	Github,
	#[display("jira")]
	Jira,
}

impl TicketSystem {
	pub const ALL: [TicketSystem; 2] = [TicketSystem::Github, TicketSystem::Jira];

	/// Identifier used in settings sections and special block tags.
	pub fn as_str(&self) -> &'static str {
		match self {
			TicketSystem::Github => "github",
			TicketSystem::Jira => "jira",
		}
	}

	/// Look a system up by its identifier. Matching is exact.
	pub fn from_tag(tag: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|system| system.as_str() == tag)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_ticket_system_from_tag() {
		assert_eq!(TicketSystem::from_tag("github"), Some(TicketSystem::Github));
		assert_eq!(TicketSystem::from_tag("jira"), Some(TicketSystem::Jira));

		// Exact match only
		assert_eq!(TicketSystem::from_tag("Jira"), None);
		assert_eq!(TicketSystem::from_tag(" github"), None);
		assert_eq!(TicketSystem::from_tag("tix"), None);
	}

	#[test]
	fn test_ticket_system_display_matches_tag() {
		for system in TicketSystem::ALL {
			assert_eq!(system.to_string(), system.as_str());
			assert_eq!(TicketSystem::from_tag(&system.to_string()), Some(system));
		}
	}
}

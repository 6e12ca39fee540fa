//! Settings, read from `tix.yml` next to the markdown document.
//!
//! ```yaml
//! variables:
//!   key: value
//!   envKey: $ENVIRONMENT_VARIABLE
//! jira:
//!   no_epics: false
//!   url: https://jira.example.com
//!   tickets:
//!     default: { labels: [generated] }
//!     epic: { component: backend }
//! github:
//!   owner: owner
//!   repo: repo
//!   tickets:
//!     issue: { labels: [label1, label2] }
//! ```
//!
//! Any value can be overridden from the environment as `TIX__<SECTION>__<KEY>`.

use std::{
	collections::BTreeMap,
	path::{Path, PathBuf},
};

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::{TicketSystem, error::TixError, field::FieldMap, render::FormattingOverrides};

pub const FILE_NAME: &str = "tix.yml";

pub type Variables = BTreeMap<String, Option<String>>;

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
	pub variables: Variables,
	pub github: Option<GithubSettings>,
	pub jira: Option<JiraSettings>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct GithubSettings {
	/// Root tickets are issues instead of projects.
	pub no_projects: bool,
	pub owner: Option<String>,
	pub repo: Option<String>,
	/// Field overlays keyed by `default`, `project` or `issue`.
	pub tickets: BTreeMap<String, FieldMap>,
	pub variables: Variables,
	pub formatting: FormattingOverrides,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct JiraSettings {
	/// Root tickets are stories instead of epics.
	pub no_epics: bool,
	pub url: Option<String>,
	/// Field overlays keyed by `default`, `epic`, `issue` or `task`.
	pub tickets: BTreeMap<String, FieldMap>,
	pub variables: Variables,
	pub formatting: FormattingOverrides,
}

impl Settings {
	/// Load from `path`, with `TIX__`-prefixed environment overrides.
	pub fn load(path: &Path) -> Result<Self, TixError> {
		tracing::debug!("[settings] loading {}", path.display());
		let settings = Config::builder()
			.add_source(File::from(path).format(FileFormat::Yaml).required(true))
			.add_source(Environment::with_prefix("TIX").separator("__"))
			.build()?
			.try_deserialize::<Settings>()?;
		Ok(settings)
	}

	/// Parse settings from YAML text. No environment overrides are applied.
	pub fn from_yaml_str(yaml: &str) -> Result<Self, TixError> {
		let settings = Config::builder().add_source(File::from_str(yaml, FileFormat::Yaml)).build()?.try_deserialize::<Settings>()?;
		Ok(settings)
	}

	/// Default settings location for a markdown document: `tix.yml` in the same directory.
	pub fn default_path(markdown: &Path) -> PathBuf {
		match markdown.parent() {
			Some(dir) if !dir.as_os_str().is_empty() => dir.join(FILE_NAME),
			_ => PathBuf::from(FILE_NAME),
		}
	}

	/// Configured systems, in a fixed order.
	pub fn systems(&self) -> Vec<TicketSystem> {
		TicketSystem::ALL.into_iter().filter(|&system| self.is_configured(system)).collect()
	}

	pub fn is_configured(&self, system: TicketSystem) -> bool {
		match system {
			TicketSystem::Github => self.github.is_some(),
			TicketSystem::Jira => self.jira.is_some(),
		}
	}

	/// Per-system variable tables of every configured system, in the order of [`Settings::systems`].
	pub fn system_variables(&self) -> Vec<(TicketSystem, &Variables)> {
		let mut tables = Vec::new();
		if let Some(github) = &self.github {
			tables.push((TicketSystem::Github, &github.variables));
		}
		if let Some(jira) = &self.jira {
			tables.push((TicketSystem::Jira, &jira.variables));
		}
		tables
	}

	/// Field overlays for `system`, keyed by entity-kind name.
	pub fn tickets_for(&self, system: TicketSystem) -> Option<&BTreeMap<String, FieldMap>> {
		match system {
			TicketSystem::Github => self.github.as_ref().map(|github| &github.tickets),
			TicketSystem::Jira => self.jira.as_ref().map(|jira| &jira.tickets),
		}
	}

	/// Whether `system` drops its top entity kind (`no_projects` / `no_epics`).
	pub fn skips_root(&self, system: TicketSystem) -> bool {
		match system {
			TicketSystem::Github => self.github.as_ref().is_some_and(|github| github.no_projects),
			TicketSystem::Jira => self.jira.as_ref().is_some_and(|jira| jira.no_epics),
		}
	}

	pub fn formatting_for(&self, system: TicketSystem) -> Option<&FormattingOverrides> {
		match system {
			TicketSystem::Github => self.github.as_ref().map(|github| &github.formatting),
			TicketSystem::Jira => self.jira.as_ref().map(|jira| &jira.formatting),
		}
	}

	/// Copy of these settings with every ticket overlay rewritten by `f`.
	pub fn map_tickets(&self, mut f: impl FnMut(&FieldMap) -> FieldMap) -> Self {
		let mut mapped = self.clone();
		if let Some(github) = &mut mapped.github {
			github.tickets.values_mut().for_each(|fields| *fields = f(fields));
		}
		if let Some(jira) = &mut mapped.jira {
			jira.tickets.values_mut().for_each(|fields| *fields = f(fields));
		}
		mapped
	}
}

//! End to end: markdown source → ticket tree → substituted tree → per-system output.

use std::collections::BTreeMap;

use crate::{
	TicketSystem,
	builder::{self, Document},
	error::{SourceContext, TixError, Warning},
	render::{DepthPolicy, Rendered, RenderedTicket, Renderer},
	settings::Settings,
	ticket::TicketTree,
	variables::{EnvSource, ProcessEnv, VariableTable},
};

/// Pipeline configuration. Holds no per-document state, so one value can run many documents.
pub struct Tix<'a> {
	settings: &'a Settings,
	env: &'a dyn EnvSource,
	policy: DepthPolicy,
	fail_fast: bool,
}

impl<'a> Tix<'a> {
	pub fn new(settings: &'a Settings) -> Self {
		Self {
			settings,
			env: &ProcessEnv,
			policy: DepthPolicy::default(),
			fail_fast: false,
		}
	}

	pub fn with_env(mut self, env: &'a dyn EnvSource) -> Self {
		self.env = env;
		self
	}

	pub fn with_policy(mut self, policy: DepthPolicy) -> Self {
		self.policy = policy;
		self
	}

	/// Return the first ticket error instead of collecting it.
	pub fn fail_fast(mut self, fail_fast: bool) -> Self {
		self.fail_fast = fail_fast;
		self
	}

	/// Systems to render: `requested` restricted to configured ones, or every configured one.
	fn targets(&self, requested: &[TicketSystem]) -> Result<Vec<TicketSystem>, TixError> {
		let configured = self.settings.systems();
		let targets: Vec<TicketSystem> = match requested.is_empty() {
			true => configured,
			false => requested
				.iter()
				.copied()
				.filter(|system| {
					let ok = configured.contains(system);
					if !ok {
						tracing::warn!("{system} is not configured in settings, skipping it");
					}
					ok
				})
				.collect(),
		};
		match targets.is_empty() {
			true => Err(TixError::NoTicketSystem),
			false => Ok(targets),
		}
	}

	pub fn run(&self, ctx: &SourceContext, systems: &[TicketSystem]) -> Result<Output, TixError> {
		let targets = self.targets(systems)?;

		let Document { tree, mut errors } = builder::build(ctx);
		tracing::debug!("[pipeline] {} ticket(s) in {}", tree.len(), ctx.filename);
		if self.fail_fast && !errors.is_empty() {
			return Err(errors.remove(0));
		}

		let table = VariableTable::from_settings(self.settings);
		let (tree, mut warnings) = table.resolve_tree(&tree, self.env);
		let settings = self.settings.map_tickets(|fields| table.resolve_fields(fields, self.env, &mut warnings));

		let mut rendered = Vec::with_capacity(targets.len());
		for system in targets {
			let mut output = Renderer::new(system, &settings).with_policy(self.policy).render(&tree);
			if self.fail_fast && !output.errors.is_empty() {
				return Err(output.errors.remove(0));
			}
			rendered.push(output);
		}

		Ok(Output {
			tree,
			rendered,
			errors,
			warnings,
		})
	}
}

/// Everything one run produced.
#[derive(Debug)]
pub struct Output {
	/// The tree after variable substitution.
	pub tree: TicketTree,
	pub rendered: Vec<Rendered>,
	/// Errors found while building the tree.
	pub errors: Vec<TixError>,
	/// Warnings from variable substitution.
	pub warnings: Vec<Warning>,
}

impl Output {
	/// Build and render errors.
	pub fn errors(&self) -> impl Iterator<Item = &TixError> {
		self.errors.iter().chain(self.rendered.iter().flat_map(|r| r.errors.iter()))
	}

	pub fn warnings(&self) -> impl Iterator<Item = &Warning> {
		self.warnings.iter().chain(self.rendered.iter().flat_map(|r| r.warnings.iter()))
	}

	pub fn has_errors(&self) -> bool {
		self.errors().next().is_some()
	}

	pub fn for_system(&self, system: TicketSystem) -> Option<&Rendered> {
		self.rendered.iter().find(|r| r.system == system)
	}

	/// Machine payload: rendered tickets keyed by system.
	pub fn payload(&self) -> BTreeMap<&'static str, &[RenderedTicket]> {
		self.rendered.iter().map(|r| (r.system.as_str(), r.tickets.as_slice())).collect()
	}

	pub fn to_json(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string_pretty(&self.payload())
	}

	/// Dry-run listing of every system.
	pub fn report(&self) -> String {
		self.rendered.iter().map(Rendered::report).collect::<Vec<_>>().join("\n")
	}
}

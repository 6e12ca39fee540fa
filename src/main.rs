use std::{
	fs::File,
	path::PathBuf,
	process::ExitCode,
	sync::Mutex,
};

use clap::{ArgAction, Parser};
use color_eyre::eyre::{Result, WrapErr};
use tix::{DepthPolicy, Settings, SourceContext, TicketSystem, Tix, TixError};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

const SPECIAL_BLOCKS: &str = "\
Special blocks:
  Fenced code blocks tagged `tix`, `github` or `jira` add fields to the ticket of the
  heading above them instead of being rendered as code.

  ```tix
  // Adds fields to the ticket, regardless of ticket system
  field: value
  ```

  ```github
  // Adds fields to the ticket only if the ticketing system is github
  labels: [label1, label2]
  ```

  ```jira
  // Adds fields to the ticket only if the ticketing system is jira
  component: backend
  ```

Settings are read from tix.yml next to the markdown file.";

/// Generate jira / github tickets from a markdown document.
#[derive(Parser)]
#[command(author, version, about, long_about = None, after_help = SPECIAL_BLOCKS)]
struct Cli {
	/// Markdown document to read tickets from
	markdown_file: PathBuf,
	/// Print ticket information instead of the machine payload
	#[arg(long, short)]
	dryrun: bool,
	/// Only log errors
	#[arg(long, short, conflicts_with = "verbose")]
	quiet: bool,
	/// More logging, repeat for trace
	#[arg(long, short, action = ArgAction::Count)]
	verbose: u8,
	/// Settings file [default: tix.yml next to the markdown file]
	#[arg(long, short)]
	settings: Option<PathBuf>,
	/// Only render for this system
	#[arg(long = "system", value_enum)]
	systems: Vec<TicketSystem>,
	/// Stop on the first ticket error, including tickets nested deeper than a system supports
	#[arg(long)]
	fail_fast: bool,
}

impl Cli {
	fn log_filter(&self) -> EnvFilter {
		if let Ok(filter) = EnvFilter::try_from_default_env() {
			return filter;
		}
		let level = match (self.quiet, self.verbose) {
			(true, _) => "error",
			(false, 0) => "warn",
			(false, 1) => "debug",
			(false, _) => "trace",
		};
		EnvFilter::new(format!("tix={level}"))
	}
}

/// Stderr logging, plus JSON lines into `TIX_TRACE_FILE` when it is set.
fn init_tracing(cli: &Cli) -> Result<()> {
	let stderr = tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false).with_filter(cli.log_filter());
	let trace_file = match std::env::var_os("TIX_TRACE_FILE") {
		Some(path) => {
			let file = File::create(&path).wrap_err_with(|| format!("creating trace file {}", PathBuf::from(&path).display()))?;
			Some(
				tracing_subscriber::fmt::layer()
					.json()
					.with_writer(Mutex::new(file))
					.with_filter(EnvFilter::new("tix=trace")),
			)
		}
		None => None,
	};
	tracing_subscriber::registry().with(stderr).with(trace_file).init();
	Ok(())
}

fn report(error: TixError) {
	eprintln!("{:?}", miette::Report::new(error));
}

fn main() -> Result<ExitCode> {
	color_eyre::install()?;
	let cli = Cli::parse();
	init_tracing(&cli)?;

	let settings_path = cli.settings.clone().unwrap_or_else(|| Settings::default_path(&cli.markdown_file));
	let settings = match Settings::load(&settings_path) {
		Ok(settings) => settings,
		Err(e) => {
			tracing::error!("could not load settings from {}", settings_path.display());
			report(e);
			return Ok(ExitCode::FAILURE);
		}
	};

	let content = match std::fs::read_to_string(&cli.markdown_file) {
		Ok(content) => content,
		Err(source) => {
			report(TixError::Io {
				path: cli.markdown_file.clone(),
				source,
			});
			return Ok(ExitCode::FAILURE);
		}
	};
	let ctx = SourceContext::new(content, cli.markdown_file.display().to_string());

	let policy = if cli.fail_fast { DepthPolicy::Fail } else { DepthPolicy::Flatten };
	let output = match Tix::new(&settings).with_policy(policy).fail_fast(cli.fail_fast).run(&ctx, &cli.systems) {
		Ok(output) => output,
		Err(e) => {
			report(e);
			return Ok(ExitCode::FAILURE);
		}
	};

	match cli.dryrun {
		true => print!("{}", output.report()),
		false => println!("{}", output.to_json().wrap_err("serializing tickets")?),
	}

	let failed = output.has_errors();
	for error in output.rendered.into_iter().flat_map(|r| r.errors).chain(output.errors) {
		report(error);
	}
	Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

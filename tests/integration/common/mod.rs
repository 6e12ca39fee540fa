//! Shared test infrastructure for integration tests.
//!
//! `TestContext` writes a fixture into a temp directory and runs the compiled binary against it.
//!
//! ```ignore
//! let ctx = TestContext::new(r#"
//! //- /plan.md
//! # Epic
//! //- /tix.yml
//! jira:
//!   url: https://jira.example.com
//! "#);
//!
//! let (status, stdout, stderr) = ctx.run(&["plan.md"]);
//! assert!(status.success());
//! ```

use std::{
	path::{Path, PathBuf},
	process::{Command, ExitStatus},
};

use tempfile::TempDir;

/// Split a fixture into `(path, content)` pairs. Each file starts with a `//- /path` line.
pub fn parse_fixture(fixture: &str) -> Vec<(String, String)> {
	let mut files: Vec<(String, String)> = Vec::new();
	for line in fixture.lines() {
		match line.strip_prefix("//- ") {
			Some(path) => files.push((path.trim().trim_start_matches('/').to_string(), String::new())),
			None => {
				if let Some((_, content)) = files.last_mut() {
					content.push_str(line);
					content.push('\n');
				}
			}
		}
	}
	files
}

pub struct TestContext {
	pub dir: TempDir,
	pub trace_file: PathBuf,
}

impl TestContext {
	pub fn new(fixture: &str) -> Self {
		let dir = tempfile::tempdir().unwrap();
		for (path, content) in parse_fixture(fixture) {
			let path = dir.path().join(path);
			if let Some(parent) = path.parent() {
				std::fs::create_dir_all(parent).unwrap();
			}
			std::fs::write(path, content).unwrap();
		}
		let trace_file = dir.path().join("trace.jsonl");
		Self { dir, trace_file }
	}

	pub fn path(&self, relative: &str) -> PathBuf {
		self.dir.path().join(relative.trim_start_matches('/'))
	}

	/// Run the binary inside the fixture directory.
	///
	/// Returns (exit_status, stdout, stderr) for easy assertions.
	pub fn run(&self, args: &[&str]) -> (ExitStatus, String, String) {
		self.run_with_env(args, &[])
	}

	pub fn run_with_env(&self, args: &[&str], env: &[(&str, &str)]) -> (ExitStatus, String, String) {
		let mut cmd = Command::new(binary_path());
		cmd.args(args).current_dir(self.dir.path()).env_remove("RUST_LOG").env("TIX_TRACE_FILE", &self.trace_file);
		for (key, value) in env {
			cmd.env(key, value);
		}
		let output = cmd.output().unwrap();
		(
			output.status,
			String::from_utf8_lossy(&output.stdout).into_owned(),
			String::from_utf8_lossy(&output.stderr).into_owned(),
		)
	}
}

fn binary_path() -> &'static Path {
	Path::new(env!("CARGO_BIN_EXE_tix"))
}

#[test]
fn test_parse_fixture() {
	let files = parse_fixture("//- /a.md\n# A\n\ntext\n//- /dir/tix.yml\njira:\n");
	assert_eq!(
		files,
		vec![("a.md".to_string(), "# A\n\ntext\n".to_string()), ("dir/tix.yml".to_string(), "jira:\n".to_string())]
	);
}

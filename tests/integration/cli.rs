//! Runs the compiled binary against fixtures on disk.

use crate::{assert_traced, common::TestContext, tracing_utils::TraceLog};

const PLAN: &str = r#"//- /plan.md
Notes before the first heading are ignored.

# Checkout revamp

Rework the checkout flow for team.

```tix
component: payments
```

## Card payments

- validate cards
  - luhn check

```github
labels: [backend]
```

### Retry declined cards
//- /tix.yml
variables:
  team: Platform
jira:
  url: https://jira.example.com
  tickets:
    default:
      assignee: lead
github:
  owner: owner
  repo: repo
"#;

#[test]
fn test_json_output() {
	let ctx = TestContext::new(PLAN);
	let (status, stdout, stderr) = ctx.run(&["plan.md"]);
	assert!(status.success(), "stderr: {stderr}");

	let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
	let jira = json["jira"].as_array().unwrap();
	assert_eq!(jira.len(), 3);
	assert_eq!(jira[0]["entity_kind"], "epic");
	assert_eq!(jira[0]["body_markup"], "Rework the checkout flow for Platform.");
	assert_eq!(jira[0]["fields"]["component"], "payments");
	assert_eq!(jira[0]["fields"]["assignee"], "lead");
	assert_eq!(jira[1]["entity_kind"], "story");
	assert_eq!(jira[1]["body_markup"], "- validate cards\n-- luhn check");
	assert_eq!(jira[2]["entity_kind"], "task");
	assert_eq!(jira[2]["parent"], 1);

	let github = json["github"].as_array().unwrap();
	assert_eq!(github[1]["body_markup"], "- validate cards\n  - luhn check");
	assert_eq!(github[1]["fields"]["labels"][0], "backend");
	assert!(jira[1]["fields"].get("labels").is_none());
}

#[test]
fn test_dryrun_report() {
	let ctx = TestContext::new(PLAN);
	let (status, stdout, _) = ctx.run(&["--dryrun", "--system", "jira", "plan.md"]);
	assert!(status.success());
	assert!(stdout.starts_with("== jira (3 tickets) =="), "{stdout}");
	assert!(stdout.contains("[Epic] Checkout revamp"));
	assert!(stdout.contains("    [Task] Retry declined cards"));
	assert!(!stdout.contains("== github"));
}

#[test]
fn test_depth_warning_is_traced() {
	let ctx = TestContext::new(PLAN);
	let (status, _, _) = ctx.run(&["--system", "github", "plan.md"]);
	assert!(status.success());

	let trace = TraceLog::from_file(&ctx.trace_file);
	assert!(!trace.is_empty());
	assert_traced!(trace, "WARN", "Retry declined cards");
}

#[test]
fn test_fail_fast_exit_code() {
	let ctx = TestContext::new(PLAN);
	let (status, stdout, stderr) = ctx.run(&["--fail-fast", "--system", "github", "plan.md"]);
	assert!(!status.success());
	assert!(stdout.is_empty());
	assert!(stderr.contains("Retry declined cards"), "{stderr}");
}

#[test]
fn test_explicit_settings_path() {
	let ctx = TestContext::new(&format!("{PLAN}//- /other/settings.yml\njira:\n  no_epics: true\n"));
	let settings = ctx.path("other/settings.yml");
	let (status, stdout, _) = ctx.run(&["-s", settings.to_str().unwrap(), "plan.md"]);
	assert!(status.success());

	let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
	assert!(json.get("github").is_none());
	assert_eq!(json["jira"][0]["entity_kind"], "story");
}

#[test]
fn test_environment_override() {
	let ctx = TestContext::new(PLAN);
	let (status, stdout, _) = ctx.run_with_env(&["plan.md"], &[("TIX__GITHUB__NO_PROJECTS", "true")]);
	assert!(status.success());
	let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
	assert_eq!(json["github"][0]["entity_kind"], "issue");
}

#[test]
fn test_missing_settings() {
	let ctx = TestContext::new("//- /plan.md\n# Epic\n");
	let (status, stdout, _) = ctx.run(&["plan.md"]);
	assert!(!status.success());
	assert!(stdout.is_empty());
}

#[test]
fn test_malformed_block_exit_code() {
	let ctx = TestContext::new("//- /plan.md\n# Epic\n\n```jira\nlabels: [unclosed\n```\n\n# Other\n//- /tix.yml\njira:\n  url: https://jira.example.com\n");
	let (status, stdout, stderr) = ctx.run(&["plan.md"]);
	assert!(!status.success());
	let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
	assert_eq!(json["jira"].as_array().unwrap().len(), 2);
	assert!(stderr.contains("malformed special block"), "{stderr}");
}

#[test]
fn test_help_mentions_special_blocks() {
	let ctx = TestContext::new("");
	let (status, stdout, _) = ctx.run(&["--help"]);
	assert!(status.success());
	assert!(stdout.contains("```tix"));
	assert!(stdout.contains("--dryrun"));
}

//! Full pipeline runs through the library: markdown + settings in, rendered tickets out.

use std::collections::HashMap;

use rstest::rstest;
use tix::{CodeBlockSegment, EntityKind, FieldValue, Segment, Settings, SourceContext, TicketSystem, Tix, Warning, build};

const BOTH: &str = "jira:\n  url: https://jira.example.com\ngithub:\n  owner: owner\n  repo: repo\n";

fn run(markdown: &str, settings: &str) -> tix::Output {
	let settings = Settings::from_yaml_str(settings).unwrap();
	let env: HashMap<String, String> = HashMap::new();
	Tix::new(&settings).with_env(&env).run(&SourceContext::new(markdown, "plan.md"), &[]).unwrap()
}

fn body(markdown: &str) -> Vec<Segment> {
	let doc = build(&SourceContext::new(markdown, "plan.md"));
	doc.tree.get(doc.tree.roots()[0]).body.clone()
}

#[test]
fn test_indented_code_block() {
	assert_eq!(body("# Ticket\n\n\tcode1\n\tcode2\n"), vec![Segment::CodeBlock(CodeBlockSegment::new("code1\ncode2\n", ""))]);
}

#[rstest]
#[case("```go\ncode1\ncode2\n```\n", "go")]
#[case("```\ncode1\ncode2\n```\n", "")]
fn test_fenced_code_block(#[case] block: &str, #[case] language: &str) {
	assert_eq!(
		body(&format!("# Ticket\n\n{block}")),
		vec![Segment::CodeBlock(CodeBlockSegment::new("code1\ncode2\n", language))]
	);
}

#[test]
fn test_heading_chain_then_new_root() {
	let doc = build(&SourceContext::new("# One\n## Two\n### Three\n# Four\n", "plan.md"));
	let tree = &doc.tree;
	assert_eq!(tree.roots().len(), 2);

	let one = tree.roots()[0];
	let two = tree.children(one);
	assert_eq!(two.len(), 1);
	let three = tree.children(two[0]);
	assert_eq!(three.len(), 1);
	assert!(tree.children(three[0]).is_empty());
	assert!(tree.children(tree.roots()[1]).is_empty());
}

#[test]
fn test_roots_match_level_one_headings() {
	let source = "# A\n### a1\n## a2\n#### a3\n# B\n## b1\n# C\n";
	let doc = build(&SourceContext::new(source, "plan.md"));
	let level_one = doc.tree.iter().filter(|(_, t)| t.level == 1).count();
	assert_eq!(doc.tree.roots().len(), level_one);
	for (_, ticket) in doc.tree.iter() {
		if let Some(parent) = ticket.parent {
			assert!(doc.tree.get(parent).level < ticket.level);
		}
	}
}

#[test]
fn test_field_scope_across_systems() {
	let markdown = "# Epic\n\n```tix\nfield: value\n```\n\n```github\nlabels: [label1, label2]\n```\n";
	let output = run(markdown, BOTH);

	let jira = &output.for_system(TicketSystem::Jira).unwrap().tickets[0];
	let github = &output.for_system(TicketSystem::Github).unwrap().tickets[0];
	assert_eq!(jira.fields["field"], FieldValue::from("value"));
	assert_eq!(github.fields["field"], FieldValue::from("value"));
	assert_eq!(github.fields["labels"], FieldValue::from(vec!["label1", "label2"]));
	assert!(!jira.fields.contains_key("labels"));
}

#[test]
fn test_later_block_wins() {
	let markdown = "# Epic\n\n```jira\npriority: low\n```\n\nText\n\n```jira\npriority: high\n```\n";
	let output = run(markdown, BOTH);
	let jira = &output.for_system(TicketSystem::Jira).unwrap().tickets[0];
	assert_eq!(jira.fields["priority"], FieldValue::from("high"));
}

#[test]
fn test_malformed_block_keeps_siblings() {
	let markdown = "# Epic\n\n## Broken\n\n```tix\n[not, a, mapping]\n```\n\n## Fine\n\n```tix\nok: yes\n```\n";
	let output = run(markdown, BOTH);
	assert_eq!(output.errors.len(), 1);
	assert!(output.has_errors());

	let jira = output.for_system(TicketSystem::Jira).unwrap();
	assert_eq!(jira.tickets.iter().map(|t| t.title.as_str()).collect::<Vec<_>>(), vec!["Epic", "Broken", "Fine"]);
	assert!(jira.tickets[1].fields.is_empty());
	assert_eq!(jira.tickets[2].fields["ok"], FieldValue::from("yes"));
}

#[test]
fn test_variables_and_environment() {
	let settings = Settings::from_yaml_str(
		"variables:\n  team: Platform\n  sprint: $TIX_TEST_SPRINT\n  missing: $TIX_TEST_UNSET\njira:\n  tickets:\n    default:\n      labels: [team]\n",
	)
	.unwrap();
	let env: HashMap<String, String> = [("TIX_TEST_SPRINT".to_string(), "42".to_string())].into();
	let markdown = "# Epic\n\nteam ships in sprint missing.\n\n```sh\necho team\n```\n";
	let output = Tix::new(&settings).with_env(&env).run(&SourceContext::new(markdown, "plan.md"), &[]).unwrap();

	let jira = &output.rendered[0].tickets[0];
	assert_eq!(jira.body_markup, "Platform ships in 42 .\n\n{code:sh}\necho team\n{code}");
	assert_eq!(jira.fields["labels"], FieldValue::from(vec!["Platform"]));
	assert_eq!(
		output.warnings,
		vec![Warning::UnsetEnvironmentVariable {
			name: "missing".into(),
			variable: "TIX_TEST_UNSET".into()
		}]
	);
}

#[test]
fn test_github_hierarchy() {
	let output = run("# Project\n## Issue\n### Nested\n", "github:\n  owner: owner\n");
	let github = &output.rendered[0];
	assert_eq!(
		github.tickets.iter().map(|t| t.entity_kind).collect::<Vec<_>>(),
		vec![EntityKind::Project, EntityKind::Issue, EntityKind::Issue]
	);
	assert_eq!(github.warnings.len(), 1);
	assert_eq!(github.tickets[2].parent, Some(1));
}

#[rstest]
#[case("jira:\n  no_epics: true\n", "# Story\n## Story too\n### Task\n", &[EntityKind::Story, EntityKind::Story, EntityKind::Task])]
#[case("github:\n  no_projects: true\n", "# Issue\n## Sub-issue\n", &[EntityKind::Issue, EntityKind::Issue])]
#[case("jira: {}\n", "# Epic\n### Task\n", &[EntityKind::Epic, EntityKind::Task])]
fn test_kinds_follow_heading_level(#[case] settings: &str, #[case] markdown: &str, #[case] expected: &[EntityKind]) {
	let settings = Settings::from_yaml_str(settings).unwrap();
	let env: HashMap<String, String> = HashMap::new();
	let output = Tix::new(&settings)
		.with_env(&env)
		.with_policy(tix::DepthPolicy::Fail)
		.fail_fast(true)
		.run(&SourceContext::new(markdown, "plan.md"), &[])
		.unwrap();
	let rendered = &output.rendered[0];
	assert_eq!(rendered.tickets.iter().map(|t| t.entity_kind).collect::<Vec<_>>(), expected);
	assert!(rendered.warnings.is_empty());
}

#[test]
fn test_scope_never_leaks() {
	let markdown = "# A\n\n```jira\nonly_jira: x\n```\n\n## B\n\n```github\nonly_github: y\n```\n";
	let output = run(markdown, BOTH);
	for rendered in &output.rendered {
		for ticket in &rendered.tickets {
			match rendered.system {
				TicketSystem::Jira => assert!(!ticket.fields.contains_key("only_github")),
				TicketSystem::Github => assert!(!ticket.fields.contains_key("only_jira")),
			}
		}
	}
}

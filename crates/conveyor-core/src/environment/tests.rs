use std::collections::HashMap;

use super::*;

struct MapSecretProvider(HashMap<&'static str, &'static str>);

impl SecretProvider for MapSecretProvider {
    fn secret(&self, name: &str) -> Option<String> {
        self.0.get(name).filter(|v| !v.is_empty()).map(|v| v.to_string())
    }
}

fn full_provider() -> MapSecretProvider {
    MapSecretProvider(HashMap::from([
        ("CONFLUENCE_BASE", "https://wiki.example.com/"),
        ("CONFLUENCE_USER", "bot@example.com"),
        ("CONFLUENCE_TOKEN", "wiki-token"),
        ("CONFLUENCE_SPACE", "QA"),
        ("RTM_BASE", "https://rtm.example.com"),
        ("RTM_API_TOKEN", "rtm-token"),
        ("RTM_PROJECT", "RT"),
        ("JIRA_URL", "https://jira.example.com"),
        ("JIRA_USER", "bot@example.com"),
        ("JIRA_API_TOKEN", "jira-token"),
        ("JIRA_PROJECT", "RT"),
        ("SMTP_HOST", "smtp.example.com"),
        ("SMTP_USER", "mailer"),
        ("SMTP_PASS", "mail-pass"),
        ("REPORT_FROM", "ci@example.com"),
        ("REPORT_TO", "qa@example.com; dev@example.com, lead@example.com"),
    ]))
}

#[test]
fn build_resolves_all_sections() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = RunContext::build(
        &full_provider(),
        RunParams::new("RT-12", "", "jdoe"),
        dir.path().to_path_buf(),
    )
    .unwrap();

    // Trailing slash stripped from base URLs
    assert_eq!(ctx.wiki.credentials.base_url, "https://wiki.example.com");
    assert_eq!(ctx.smtp.port, 587, "default SMTP port applies");
    assert_eq!(ctx.smtp.to.len(), 3, "mixed separators are honored");
    assert_eq!(ctx.params.test_execution_key.as_deref(), Some("RT-12"));
    assert_eq!(ctx.params.test_plan_key, None, "empty parameter normalizes to None");
    assert!(ctx.paths.report_dir.is_dir(), "report dir is created");
}

#[test]
fn build_fails_on_missing_secret() {
    let dir = tempfile::tempdir().unwrap();
    let mut provider = full_provider();
    provider.0.remove("JIRA_API_TOKEN");

    let err = RunContext::build(&provider, RunParams::default(), dir.path().to_path_buf())
        .unwrap_err();
    match err {
        ConfigError::MissingSecret { name } => assert_eq!(name, "JIRA_API_TOKEN"),
        other => panic!("Expected MissingSecret, got: {:?}", other),
    }
}

#[test]
fn build_rejects_rest_api_in_wiki_base() {
    let dir = tempfile::tempdir().unwrap();
    let mut provider = full_provider();
    provider.0.insert("CONFLUENCE_BASE", "https://wiki.example.com/rest/api");

    let err = RunContext::build(&provider, RunParams::default(), dir.path().to_path_buf())
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { ref name, .. } if name == "CONFLUENCE_BASE"));
}

#[test]
fn secrets_are_redacted_in_debug_output() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = RunContext::build(&full_provider(), RunParams::default(), dir.path().to_path_buf())
        .unwrap();

    let rendered = format!("{:?}", ctx);
    assert!(!rendered.contains("wiki-token"));
    assert!(!rendered.contains("jira-token"));
    assert!(!rendered.contains("mail-pass"));
    assert!(rendered.contains("<redacted>"));
}

#[test]
fn parse_recipients_handles_empty_input() {
    assert!(parse_recipients("").is_empty());
    assert_eq!(parse_recipients(" a@b.c ,, ;d@e.f"), vec!["a@b.c", "d@e.f"]);
}


use std::path::PathBuf;
use std::sync::Arc;

use crate::environment::{
    IssueConfig, RunContext, RunParams, RunPaths, ScmConfig, Secret, ServiceCredentials,
    SmtpConfig, TrackerConfig, WikiConfig,
};

/// Build a fully-populated run context without touching process state.
pub(crate) fn test_run_context(workdir: PathBuf, params: RunParams) -> Arc<RunContext> {
    Arc::new(RunContext {
        params,
        paths: RunPaths::for_workdir(workdir),
        wiki: WikiConfig {
            credentials: ServiceCredentials {
                base_url: "https://wiki.example.com".to_string(),
                user: "bot@example.com".to_string(),
                token: Secret::new("wiki-token"),
            },
            space: "QA".to_string(),
            title: "Test Result Report".to_string(),
        },
        tracker: TrackerConfig {
            base_url: "https://rtm.example.com".to_string(),
            token: Secret::new("rtm-token"),
            project: "RT".to_string(),
        },
        issues: IssueConfig {
            credentials: ServiceCredentials {
                base_url: "https://jira.example.com".to_string(),
                user: "bot@example.com".to_string(),
                token: Secret::new("jira-token"),
            },
            project: "RT".to_string(),
        },
        smtp: SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            user: "mailer".to_string(),
            password: Secret::new("mail-pass"),
            from: "ci@example.com".to_string(),
            to: vec!["qa@example.com".to_string()],
            cc: Vec::new(),
            bcc: Vec::new(),
        },
        scm: ScmConfig::default(),
    })
}

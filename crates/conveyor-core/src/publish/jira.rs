//! Issue tracker (Jira-style) adapter implementing the two-step protocol:
//! create a "Test Execution" issue, then attach the report pair to it.
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::environment::RunContext;
use crate::publish::{ExecutionTracker, PublishError, PublishOutcome, RetryPolicy};
use crate::report::ReportArtifact;

/// Issue-creation request body.
#[derive(Debug, Serialize)]
pub(crate) struct CreateIssue<'a> {
    pub fields: IssueFields<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct IssueFields<'a> {
    pub project: KeyRef<'a>,
    pub summary: String,
    pub description: &'static str,
    pub issuetype: NameRef<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct KeyRef<'a> {
    pub key: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct NameRef<'a> {
    pub name: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedIssue {
    pub key: Option<String>,
}

pub struct JiraTracker {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl JiraTracker {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new(), retry: RetryPolicy::default() }
    }

    fn target(&self) -> &'static str {
        "jira"
    }

    /// Browse URL for an issue key, used for notification links.
    pub fn browse_url(run: &RunContext, key: &str) -> String {
        format!("{}/browse/{}", run.issues.credentials.base_url, key)
    }

    async fn attach_file(&self, run: &RunContext, execution_key: &str, path: &Path) -> Result<(), PublishError> {
        let issues = &run.issues;
        let bytes = tokio::fs::read(path).await.map_err(|source| PublishError::Attachment {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());

        let url = format!(
            "{}/rest/api/3/issue/{}/attachments",
            issues.credentials.base_url, execution_key
        );
        log::info!("Attaching {} to {}", file_name, execution_key);
        // 401/403/404/413 are 4xx and fail immediately inside the retry
        // policy; 429 and 5xx are retried with backoff.
        self.retry
            .send(self.target(), || {
                let part = reqwest::multipart::Part::bytes(bytes.clone()).file_name(file_name.clone());
                let form = reqwest::multipart::Form::new().part("file", part);
                self.client
                    .post(&url)
                    .basic_auth(&issues.credentials.user, Some(issues.credentials.token.reveal()))
                    .header("X-Atlassian-Token", "no-check")
                    .multipart(form)
            })
            .await?;
        Ok(())
    }
}

impl Default for JiraTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionTracker for JiraTracker {
    async fn create_execution(&self, run: &RunContext) -> Result<String, PublishError> {
        let issues = &run.issues;
        let trigger = run.params.triggered_by.as_deref().unwrap_or("scheduler");
        let summary = format!(
            "Automated Test Execution - {} ({})",
            Utc::now().format("%Y-%m-%d %H:%M"),
            trigger
        );
        let payload = CreateIssue {
            fields: IssueFields {
                project: KeyRef { key: &issues.project },
                summary,
                description: "Automated test execution run via the Conveyor pipeline",
                issuetype: NameRef { name: "Test Execution" },
            },
        };

        let url = format!("{}/rest/api/3/issue", issues.credentials.base_url);
        log::info!("Creating test execution issue in project {}", issues.project);
        let response = self
            .retry
            .send(self.target(), || {
                self.client
                    .post(&url)
                    .basic_auth(&issues.credentials.user, Some(issues.credentials.token.reveal()))
                    .json(&payload)
            })
            .await?;

        let created: CreatedIssue = response.json().await.map_err(|source| PublishError::Http {
            target: self.target().to_string(),
            source,
        })?;
        created.key.ok_or_else(|| PublishError::UnexpectedResponse {
            target: self.target().to_string(),
            reason: "issue created but no key in response".to_string(),
        })
    }

    async fn attach_reports(
        &self,
        run: &RunContext,
        execution_key: &str,
        report: &ReportArtifact,
    ) -> PublishOutcome {
        for path in [&report.html_path, &report.pdf_path] {
            if let Err(e) = self.attach_file(run, execution_key, path).await {
                return PublishOutcome::failed(self.target(), e.to_string());
            }
        }
        PublishOutcome::succeeded(
            self.target(),
            format!("report pair v{} attached to {}", report.version, execution_key),
        )
    }
}

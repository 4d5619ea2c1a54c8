//! Wiki (Confluence-style) publisher: creates a content page for the run
//! and attaches the HTML/PDF report pair to it. The resulting page URL is
//! returned in the outcome detail so the notification stage can link it.
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::environment::RunContext;
use crate::publish::{Artifact, PublishError, PublishOutcome, Publisher, RetryPolicy};
use crate::report::ReportArtifact;

/// Content-creation request body (storage representation).
#[derive(Debug, Serialize)]
pub(crate) struct CreatePage<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub title: &'a str,
    pub space: SpaceRef<'a>,
    pub body: PageBody,
}

#[derive(Debug, Serialize)]
pub(crate) struct SpaceRef<'a> {
    pub key: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct PageBody {
    pub storage: StorageValue,
}

#[derive(Debug, Serialize)]
pub(crate) struct StorageValue {
    pub value: String,
    pub representation: &'static str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedPage {
    pub id: Option<String>,
}

pub struct ConfluencePublisher {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl ConfluencePublisher {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new(), retry: RetryPolicy::default() }
    }

    pub fn with_retry(retry: RetryPolicy) -> Self {
        Self { client: reqwest::Client::new(), retry }
    }

    async fn create_page(&self, run: &RunContext, report: &ReportArtifact) -> Result<String, PublishError> {
        let wiki = &run.wiki;
        let title = format!(
            "{} - v{} ({})",
            wiki.title,
            report.version,
            Utc::now().format("%Y-%m-%d %H:%M UTC")
        );
        let body = format!(
            "<p>Automated test report, version {}.</p>\
             <p>The full HTML and PDF reports are attached to this page.</p>",
            report.version
        );
        let payload = CreatePage {
            kind: "page",
            title: &title,
            space: SpaceRef { key: &wiki.space },
            body: PageBody {
                storage: StorageValue { value: body, representation: "storage" },
            },
        };

        let url = format!("{}/rest/api/content", wiki.credentials.base_url);
        log::info!("Creating wiki page: {}", title);
        let response = self
            .retry
            .send(self.target(), || {
                self.client
                    .post(&url)
                    .basic_auth(&wiki.credentials.user, Some(wiki.credentials.token.reveal()))
                    .header("X-Atlassian-Token", "no-check")
                    .json(&payload)
            })
            .await?;

        let created: CreatedPage = response.json().await.map_err(|source| PublishError::Http {
            target: self.target().to_string(),
            source,
        })?;
        created.id.ok_or_else(|| PublishError::UnexpectedResponse {
            target: self.target().to_string(),
            reason: "page creation response carries no id".to_string(),
        })
    }

    async fn attach(&self, run: &RunContext, page_id: &str, path: &Path) -> Result<(), PublishError> {
        let wiki = &run.wiki;
        let bytes = tokio::fs::read(path).await.map_err(|source| PublishError::Attachment {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());

        let url = format!(
            "{}/rest/api/content/{}/child/attachment",
            wiki.credentials.base_url, page_id
        );
        self.retry
            .send(self.target(), || {
                let part = reqwest::multipart::Part::bytes(bytes.clone()).file_name(file_name.clone());
                let form = reqwest::multipart::Form::new().part("file", part);
                self.client
                    .post(&url)
                    .basic_auth(&wiki.credentials.user, Some(wiki.credentials.token.reveal()))
                    .header("X-Atlassian-Token", "no-check")
                    .multipart(form)
            })
            .await?;
        log::info!("Attached {} to wiki page {}", file_name, page_id);
        Ok(())
    }

    async fn publish_report(&self, run: &RunContext, report: &ReportArtifact) -> Result<String, PublishError> {
        let page_id = self.create_page(run, report).await?;
        self.attach(run, &page_id, &report.html_path).await?;
        self.attach(run, &page_id, &report.pdf_path).await?;
        Ok(format!(
            "{}/pages/viewpage.action?pageId={}",
            run.wiki.credentials.base_url, page_id
        ))
    }
}

impl Default for ConfluencePublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Publisher for ConfluencePublisher {
    fn target(&self) -> &str {
        "confluence"
    }

    async fn publish(&self, run: &RunContext, artifact: &Artifact) -> PublishOutcome {
        let Artifact::Report(report) = artifact else {
            return PublishOutcome::failed(
                self.target(),
                format!("expected a report artifact, got {}", artifact.kind()),
            );
        };
        match self.publish_report(run, report).await {
            Ok(page_url) => PublishOutcome::succeeded(self.target(), page_url),
            Err(e) => PublishOutcome::failed(self.target(), e.to_string()),
        }
    }
}

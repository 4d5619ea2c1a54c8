//! Test-management tracker (RTM-style) publisher: uploads the results
//! archive and polls the import task until it leaves the `IMPORTING`
//! state.
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::archive::ArchiveArtifact;
use crate::environment::RunContext;
use crate::publish::{Artifact, PublishError, PublishOutcome, Publisher, RetryPolicy};

/// Import-status polling response.
#[derive(Debug, Deserialize)]
pub(crate) struct ImportStatus {
    pub status: Option<String>,
    #[serde(rename = "testExecutionKey")]
    pub test_execution_key: Option<String>,
}

impl ImportStatus {
    pub fn state(&self) -> &str {
        self.status.as_deref().unwrap_or("UNKNOWN")
    }
}

pub struct RtmPublisher {
    client: reqwest::Client,
    retry: RetryPolicy,
    poll_interval: Duration,
    poll_attempts: u32,
}

impl RtmPublisher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            retry: RetryPolicy::default(),
            poll_interval: Duration::from_secs(2),
            poll_attempts: 30,
        }
    }

    async fn upload(&self, run: &RunContext, archive: &ArchiveArtifact) -> Result<String, PublishError> {
        let tracker = &run.tracker;
        let bytes = tokio::fs::read(&archive.path).await.map_err(|source| PublishError::Attachment {
            path: archive.path.clone(),
            source,
        })?;
        let file_name = archive
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "test_results.zip".to_string());

        let url = format!("{}/api/v2/automation/import-test-results", tracker.base_url);
        log::info!("Uploading results archive to {}", url);
        let response = self
            .retry
            .send(self.target(), || {
                let part = reqwest::multipart::Part::bytes(bytes.clone()).file_name(file_name.clone());
                let form = reqwest::multipart::Form::new()
                    .part("file", part)
                    .text("projectKey", tracker.project.clone())
                    .text("reportType", "JUNIT");
                self.client.post(&url).bearer_auth(tracker.token.reveal()).multipart(form)
            })
            .await?;

        let task_id = response.text().await.map_err(|source| PublishError::Http {
            target: self.target().to_string(),
            source,
        })?;
        let task_id = task_id.trim().to_string();
        if task_id.is_empty() {
            return Err(PublishError::UnexpectedResponse {
                target: self.target().to_string(),
                reason: "upload accepted but no task id returned".to_string(),
            });
        }
        Ok(task_id)
    }

    /// Poll the import task. Returns the final status payload.
    async fn await_import(&self, run: &RunContext, task_id: &str) -> Result<ImportStatus, PublishError> {
        let url = format!("{}/api/v2/automation/import-status/{}", run.tracker.base_url, task_id);
        for _ in 0..self.poll_attempts {
            let response = self
                .retry
                .send(self.target(), || {
                    self.client.get(&url).bearer_auth(run.tracker.token.reveal())
                })
                .await?;
            let body = response.text().await.map_err(|source| PublishError::Http {
                target: self.target().to_string(),
                source,
            })?;
            let status: ImportStatus = serde_json::from_str(&body).map_err(|e| {
                PublishError::UnexpectedResponse {
                    target: self.target().to_string(),
                    reason: format!("unparseable import status: {e}"),
                }
            })?;
            log::info!("Import task {}: {}", task_id, status.state());
            if status.state() != "IMPORTING" {
                return Ok(status);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
        Err(PublishError::UnexpectedResponse {
            target: self.target().to_string(),
            reason: format!("import task {} still running after {} polls", task_id, self.poll_attempts),
        })
    }
}

impl Default for RtmPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Publisher for RtmPublisher {
    fn target(&self) -> &str {
        "rtm"
    }

    async fn publish(&self, run: &RunContext, artifact: &Artifact) -> PublishOutcome {
        let Artifact::Archive(archive) = artifact else {
            return PublishOutcome::failed(
                self.target(),
                format!("expected an archive artifact, got {}", artifact.kind()),
            );
        };

        let result = async {
            let task_id = self.upload(run, archive).await?;
            self.await_import(run, &task_id).await
        }
        .await;

        match result {
            Ok(status) => {
                let state = status.state();
                if state == "FAILED" {
                    return PublishOutcome::failed(self.target(), format!("import failed: {}", state));
                }
                let detail = match &status.test_execution_key {
                    Some(key) => format!("import {}; execution {}", state, key),
                    None => format!("import {}", state),
                };
                PublishOutcome::succeeded(self.target(), detail)
            }
            Err(e) => PublishOutcome::failed(self.target(), e.to_string()),
        }
    }
}

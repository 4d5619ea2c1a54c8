//! Mail publisher: sends one notification message to the configured
//! To/Cc/Bcc recipients with the pass/fail summary, the downstream links
//! and the report pair attached.
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::environment::RunContext;
use crate::publish::{Artifact, PublishError, PublishOutcome, Publisher, RunNotice};

pub struct MailPublisher;

impl MailPublisher {
    pub fn new() -> Self {
        Self
    }

    fn mailbox(raw: &str) -> Result<Mailbox, PublishError> {
        raw.parse::<Mailbox>()
            .map_err(|e| PublishError::Smtp(format!("invalid address '{raw}': {e}")))
    }

    pub(crate) fn body_html(notice: &RunNotice) -> String {
        let summary = &notice.summary;
        let mut body = format!(
            "<h2>Test Report v{} - {}</h2>\
             <p>{} passed, {} failed, {} errors, {} skipped - pass rate {:.1}%</p>",
            notice.report.version,
            summary.status(),
            summary.passed,
            summary.failed,
            summary.errors,
            summary.skipped,
            summary.pass_rate(),
        );
        if let Some(url) = &notice.wiki_url {
            body.push_str(&format!("<p>Wiki report: <a href=\"{url}\">{url}</a></p>"));
        }
        if let Some(url) = &notice.execution_url {
            body.push_str(&format!("<p>Test execution: <a href=\"{url}\">{url}</a></p>"));
        }
        body.push_str("<p>The HTML and PDF reports are attached.</p>");
        body
    }

    async fn send(&self, run: &RunContext, notice: &RunNotice) -> Result<String, PublishError> {
        let smtp = &run.smtp;
        if smtp.to.is_empty() {
            return Err(PublishError::Smtp("no recipients configured".to_string()));
        }

        let mut builder = Message::builder()
            .from(Self::mailbox(&smtp.from)?)
            .subject(format!(
                "[{}] Test Report v{} - {}",
                notice.summary.status(),
                notice.report.version,
                notice.summary
            ));
        for to in &smtp.to {
            builder = builder.to(Self::mailbox(to)?);
        }
        for cc in &smtp.cc {
            builder = builder.cc(Self::mailbox(cc)?);
        }
        for bcc in &smtp.bcc {
            builder = builder.bcc(Self::mailbox(bcc)?);
        }

        let html = tokio::fs::read(&notice.report.html_path).await.map_err(|source| {
            PublishError::Attachment { path: notice.report.html_path.clone(), source }
        })?;
        let pdf = tokio::fs::read(&notice.report.pdf_path).await.map_err(|source| {
            PublishError::Attachment { path: notice.report.pdf_path.clone(), source }
        })?;
        let pdf_type = ContentType::parse("application/pdf")
            .map_err(|e| PublishError::Smtp(e.to_string()))?;

        let name = |p: &std::path::Path| {
            p.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
        };
        let multipart = MultiPart::mixed()
            .singlepart(SinglePart::html(Self::body_html(notice)))
            .singlepart(Attachment::new(name(&notice.report.html_path)).body(html, ContentType::TEXT_HTML))
            .singlepart(Attachment::new(name(&notice.report.pdf_path)).body(pdf, pdf_type));

        let message = builder
            .multipart(multipart)
            .map_err(|e| PublishError::Smtp(e.to_string()))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
            .map_err(|e| PublishError::Smtp(e.to_string()))?
            .port(smtp.port)
            .credentials(Credentials::new(smtp.user.clone(), smtp.password.reveal().to_string()))
            .build();

        transport
            .send(message)
            .await
            .map_err(|e| PublishError::Smtp(e.to_string()))?;

        let recipients = smtp.to.len() + smtp.cc.len() + smtp.bcc.len();
        Ok(format!("notification sent to {} recipients", recipients))
    }
}

impl Default for MailPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Publisher for MailPublisher {
    fn target(&self) -> &str {
        "email"
    }

    async fn publish(&self, run: &RunContext, artifact: &Artifact) -> PublishOutcome {
        let Artifact::Notice(notice) = artifact else {
            return PublishOutcome::failed(
                self.target(),
                format!("expected a notice artifact, got {}", artifact.kind()),
            );
        };
        match self.send(run, notice).await {
            Ok(detail) => PublishOutcome::succeeded(self.target(), detail),
            Err(e) => PublishOutcome::failed(self.target(), e.to_string()),
        }
    }
}

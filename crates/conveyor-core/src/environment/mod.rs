//! # Conveyor Environment Context
//!
//! Resolves secrets and run parameters into an immutable [`RunContext`]
//! constructed once at pipeline start. Stages receive the context by
//! reference and never read ambient process state directly.
//!
//! Secret material is wrapped in [`Secret`] so that credential values can
//! never leak into logs or debug output; only their presence is observable.
pub mod error;

use std::fmt;
use std::fs;
use std::path::PathBuf;

pub use error::ConfigError;

/// Resolves named secrets (tokens, SMTP credentials) at context
/// construction time. Values are never persisted to disk by the core.
pub trait SecretProvider: Send + Sync {
    /// Look up a secret by name. Empty values count as absent.
    fn secret(&self, name: &str) -> Option<String>;
}

/// Secret provider backed by process environment variables.
pub struct EnvSecretProvider;

impl SecretProvider for EnvSecretProvider {
    fn secret(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }
}

/// A secret value with redacted `Debug` output.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    /// Expose the underlying value. Callers must not log the result.
    pub fn reveal(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// Base URL + basic-auth credentials for an Atlassian-style HTTP service.
#[derive(Debug, Clone)]
pub struct ServiceCredentials {
    pub base_url: String,
    pub user: String,
    pub token: Secret,
}

/// Wiki (Confluence-style) publishing configuration.
#[derive(Debug, Clone)]
pub struct WikiConfig {
    pub credentials: ServiceCredentials,
    pub space: String,
    pub title: String,
}

/// Test-management tracker (RTM-style) configuration.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub base_url: String,
    pub token: Secret,
    pub project: String,
}

/// Issue tracker (Jira-style) configuration.
#[derive(Debug, Clone)]
pub struct IssueConfig {
    pub credentials: ServiceCredentials,
    pub project: String,
}

/// SMTP mailer configuration, including the recipient lists.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Secret,
    pub from: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
}

/// Source-control access configuration. All fields are optional: when the
/// CI system provides the working copy, the checkout stage only syncs it.
#[derive(Debug, Clone, Default)]
pub struct ScmConfig {
    pub remote: Option<String>,
    pub branch: Option<String>,
    pub token: Option<Secret>,
}

/// Named string inputs supplied at trigger time. Empty strings are
/// normalized to `None` so gates can test presence directly.
#[derive(Debug, Clone, Default)]
pub struct RunParams {
    pub test_execution_key: Option<String>,
    pub test_plan_key: Option<String>,
    pub triggered_by: Option<String>,
}

impl RunParams {
    pub fn new(test_execution_key: &str, test_plan_key: &str, triggered_by: &str) -> Self {
        let normalize = |s: &str| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        };
        Self {
            test_execution_key: normalize(test_execution_key),
            test_plan_key: normalize(test_plan_key),
            triggered_by: normalize(triggered_by),
        }
    }
}

/// Filesystem layout of a single run, derived from the working directory.
#[derive(Debug, Clone)]
pub struct RunPaths {
    /// Source checkout the pipeline operates on.
    pub workdir: PathBuf,
    /// Directory receiving test results and rendered reports.
    pub report_dir: PathBuf,
    /// Dependency manifest (plain-text package requirements).
    pub manifest: PathBuf,
    /// Snapshot sibling of the manifest; the cache gate's comparison baseline.
    pub snapshot: PathBuf,
    /// Destination of the results archive, rebuilt every run.
    pub archive: PathBuf,
}

impl RunPaths {
    pub fn for_workdir(workdir: PathBuf) -> Self {
        let report_dir = workdir.join("report");
        let manifest = workdir.join("requirements.txt");
        let snapshot = workdir.join("requirements.txt.lock");
        let archive = workdir.join("test_results.zip");
        Self { workdir, report_dir, manifest, snapshot, archive }
    }
}

/// Immutable per-execution record holding resolved secrets, paths and run
/// parameters. Created once at pipeline start and passed by reference to
/// every stage.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub params: RunParams,
    pub paths: RunPaths,
    pub wiki: WikiConfig,
    pub tracker: TrackerConfig,
    pub issues: IssueConfig,
    pub smtp: SmtpConfig,
    pub scm: ScmConfig,
}

impl RunContext {
    /// Build the context from a secret provider and run parameters.
    ///
    /// Fails with [`ConfigError`] if a required secret is absent or the
    /// report directory cannot be created. No other I/O is performed.
    pub fn build(
        secrets: &dyn SecretProvider,
        params: RunParams,
        workdir: PathBuf,
    ) -> Result<Self, ConfigError> {
        let paths = RunPaths::for_workdir(workdir);
        fs::create_dir_all(&paths.report_dir).map_err(|source| ConfigError::UnwritablePath {
            path: paths.report_dir.clone(),
            source,
        })?;

        let wiki_base = base_url(require(secrets, "CONFLUENCE_BASE")?);
        if wiki_base.contains("/rest/api") {
            return Err(ConfigError::InvalidValue {
                name: "CONFLUENCE_BASE".to_string(),
                reason: "must be the site root, without '/rest/api'".to_string(),
            });
        }
        let wiki = WikiConfig {
            credentials: ServiceCredentials {
                base_url: wiki_base,
                user: require(secrets, "CONFLUENCE_USER")?,
                token: Secret::new(require(secrets, "CONFLUENCE_TOKEN")?),
            },
            space: require(secrets, "CONFLUENCE_SPACE")?,
            title: secrets
                .secret("CONFLUENCE_TITLE")
                .unwrap_or_else(|| "Test Result Report".to_string()),
        };

        let tracker = TrackerConfig {
            base_url: base_url(require(secrets, "RTM_BASE")?),
            token: Secret::new(require(secrets, "RTM_API_TOKEN")?),
            project: require(secrets, "RTM_PROJECT")?,
        };

        let issues = IssueConfig {
            credentials: ServiceCredentials {
                base_url: base_url(require(secrets, "JIRA_URL")?),
                user: require(secrets, "JIRA_USER")?,
                token: Secret::new(require(secrets, "JIRA_API_TOKEN")?),
            },
            project: require(secrets, "JIRA_PROJECT")?,
        };

        let port_raw = secrets.secret("SMTP_PORT").unwrap_or_else(|| "587".to_string());
        let port = port_raw.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
            name: "SMTP_PORT".to_string(),
            reason: e.to_string(),
        })?;
        let smtp = SmtpConfig {
            host: require(secrets, "SMTP_HOST")?,
            port,
            user: require(secrets, "SMTP_USER")?,
            password: Secret::new(require(secrets, "SMTP_PASS")?),
            from: require(secrets, "REPORT_FROM")?,
            to: parse_recipients(&require(secrets, "REPORT_TO")?),
            cc: parse_recipients(&secrets.secret("REPORT_CC").unwrap_or_default()),
            bcc: parse_recipients(&secrets.secret("REPORT_BCC").unwrap_or_default()),
        };

        let scm = ScmConfig {
            remote: secrets.secret("SCM_REMOTE"),
            branch: secrets.secret("SCM_BRANCH"),
            token: secrets.secret("SCM_TOKEN").map(Secret::new),
        };

        Ok(Self { params, paths, wiki, tracker, issues, smtp, scm })
    }
}

fn require(secrets: &dyn SecretProvider, name: &str) -> Result<String, ConfigError> {
    secrets.secret(name).ok_or_else(|| ConfigError::MissingSecret { name: name.to_string() })
}

/// Strip trailing slashes so endpoint paths can be appended uniformly.
fn base_url(raw: String) -> String {
    raw.trim_end_matches('/').to_string()
}

/// Split a comma/semicolon separated recipient list.
pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// Test module declaration
#[cfg(test)]
mod tests;

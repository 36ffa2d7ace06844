//! Durable report generation.
//!
//! Reports are rows in the `reports` table, not in-process tasks. The worker
//! polls for `PENDING` rows, claims one at a time and drives it to
//! `COMPLETED` or `FAILED`. Rows left in `GENERATING` by a crashed process
//! are failed on the next poll once they are older than `stale_after`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use ebic_core::report::{download_url, ReportFormat, INTERRUPTED_MESSAGE};
use ebic_core::types::DbId;
use ebic_db::models::report::Report;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::error::MessagingError;
use crate::store::ReportStore;

const DEFAULT_REPORTS_DIR: &str = "./reports";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_STALE_AFTER_SECS: u64 = 900;

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Produces the export for a claimed report and returns its download URL.
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    async fn generate(&self, report: &Report) -> Result<String, MessagingError>;
}

/// Writes CSV exports to a directory on local disk.
#[derive(Debug, Clone)]
pub struct FileReportGenerator {
    dir: PathBuf,
}

impl FileReportGenerator {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// | Variable      | Default     |
    /// |---------------|-------------|
    /// | `REPORTS_DIR` | `./reports` |
    pub fn from_env() -> Self {
        Self::new(std::env::var("REPORTS_DIR").unwrap_or_else(|_| DEFAULT_REPORTS_DIR.to_string()))
    }

    /// Where the export of report `id` lives.
    pub fn path_for(&self, id: DbId, format: ReportFormat) -> PathBuf {
        self.dir.join(format!("report-{id}.{}", format.extension()))
    }
}

#[async_trait]
impl ReportGenerator for FileReportGenerator {
    async fn generate(&self, report: &Report) -> Result<String, MessagingError> {
        let format: ReportFormat = report.format.parse()?;
        if format == ReportFormat::Pdf {
            return Err(MessagingError::Generation(
                "PDF rendering is not available".to_string(),
            ));
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| MessagingError::Generation(format!("create {}: {e}", self.dir.display())))?;
        let path = self.path_for(report.id, format);
        tokio::fs::write(&path, render_csv(report))
            .await
            .map_err(|e| MessagingError::Generation(format!("write {}: {e}", path.display())))?;

        Ok(download_url(report.id))
    }
}

fn render_csv(report: &Report) -> String {
    let mut rows = vec![
        ("id".to_string(), report.id.to_string()),
        ("name".to_string(), report.name.clone()),
        ("type".to_string(), report.report_type.clone()),
        ("requestedBy".to_string(), report.created_by_id.to_string()),
        ("requestedAt".to_string(), report.created_at.to_rfc3339()),
        ("generatedAt".to_string(), Utc::now().to_rfc3339()),
    ];
    if let Some(serde_json::Value::Object(params)) = &report.parameters {
        for (key, value) in params {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            rows.push((format!("parameters.{key}"), value));
        }
    }

    let mut out = String::from("field,value\n");
    for (field, value) in rows {
        out.push_str(&csv_field(&field));
        out.push(',');
        out.push_str(&csv_field(&value));
        out.push('\n');
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ReportWorkerConfig {
    pub poll_interval: Duration,
    /// `GENERATING` rows older than this are treated as interrupted.
    pub stale_after: Duration,
}

impl Default for ReportWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            stale_after: Duration::from_secs(DEFAULT_STALE_AFTER_SECS),
        }
    }
}

impl ReportWorkerConfig {
    /// | Variable                    | Default |
    /// |-----------------------------|---------|
    /// | `REPORT_POLL_INTERVAL_SECS` | `5`     |
    /// | `REPORT_STALE_AFTER_SECS`   | `900`   |
    pub fn from_env() -> Self {
        let secs = |key: &str, default: u64| {
            std::env::var(key)
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(default)
        };
        Self {
            poll_interval: Duration::from_secs(secs(
                "REPORT_POLL_INTERVAL_SECS",
                DEFAULT_POLL_INTERVAL_SECS,
            )),
            stale_after: Duration::from_secs(secs(
                "REPORT_STALE_AFTER_SECS",
                DEFAULT_STALE_AFTER_SECS,
            )),
        }
    }
}

pub struct ReportWorker {
    store: Arc<dyn ReportStore>,
    generator: Arc<dyn ReportGenerator>,
    config: ReportWorkerConfig,
    wakeup: Arc<Notify>,
}

impl ReportWorker {
    pub fn new(
        store: Arc<dyn ReportStore>,
        generator: Arc<dyn ReportGenerator>,
        config: ReportWorkerConfig,
    ) -> Self {
        Self {
            store,
            generator,
            config,
            wakeup: Arc::new(Notify::new()),
        }
    }

    /// Share a wake-up handle so request handlers can cut the poll delay.
    pub fn with_wakeup(mut self, wakeup: Arc<Notify>) -> Self {
        self.wakeup = wakeup;
        self
    }

    /// Fail reports stuck in `GENERATING` past the stale threshold.
    pub async fn recover(&self) -> Result<u64, MessagingError> {
        let stale_after =
            TimeDelta::from_std(self.config.stale_after).unwrap_or(TimeDelta::seconds(
                DEFAULT_STALE_AFTER_SECS as i64,
            ));
        let failed = self
            .store
            .fail_stale(Utc::now() - stale_after, INTERRUPTED_MESSAGE)
            .await?;
        if failed > 0 {
            tracing::warn!(failed, "Marked interrupted reports as failed");
        }
        Ok(failed)
    }

    /// Claim and process one pending report. Returns `false` when the queue
    /// is empty.
    pub async fn run_once(&self) -> Result<bool, MessagingError> {
        let Some(report) = self.store.claim_next_pending().await? else {
            return Ok(false);
        };
        tracing::info!(report_id = report.id, report_type = %report.report_type, "Generating report");

        match self.generator.generate(&report).await {
            Ok(url) => {
                if self.store.complete(report.id, &url).await? {
                    tracing::info!(report_id = report.id, file_url = %url, "Report completed");
                } else {
                    tracing::debug!(report_id = report.id, "Report left GENERATING before completion");
                }
            }
            Err(e) => {
                tracing::warn!(report_id = report.id, error = %e, "Report generation failed");
                self.store.fail(report.id, &e.to_string()).await?;
            }
        }
        Ok(true)
    }

    /// Poll until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            stale_after_secs = self.config.stale_after.as_secs(),
            "Report worker started"
        );

        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Report worker stopping");
                    break;
                }
                _ = interval.tick() => {}
                _ = self.wakeup.notified() => {}
            }

            if let Err(e) = self.recover().await {
                tracing::error!(error = %e, "Report recovery failed");
            }
            loop {
                if cancel.is_cancelled() {
                    break;
                }
                match self.run_once().await {
                    Ok(true) => continue,
                    Ok(false) => break,
                    Err(e) => {
                        tracing::error!(error = %e, "Report worker poll failed");
                        break;
                    }
                }
            }
        }
    }
}

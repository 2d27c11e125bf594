//! Scheduler-facing entry points.
//!
//! An external scheduler (cron, systemd timer, a host application) calls
//! [`trigger`] or [`run_blocking`]; tests and async hosts call [`run`]. None
//! of them return an error or let a panic escape: every failure ends up in the
//! log and in [`JobOutcome::Aborted`].

use crate::api::client::{RpcClient, Session};
use crate::api::models::{RawRecord, PARTNER_FIELDS};
use crate::config::{ConfigFile, SyncConfig};
use crate::contact::SyncSummary;
use crate::error::{ConfigError, JobError, RpcError, StoreError};
use crate::reconcile::Reconciler;
use crate::storage::{ContactRepository, SqliteContactStore};
use crate::utils;
use log::{error, info};
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

#[derive(Debug)]
pub enum JobOutcome {
    Completed(SyncSummary),
    Aborted(JobError),
}

impl JobOutcome {
    pub fn summary(&self) -> Option<SyncSummary> {
        match self {
            Self::Completed(summary) => Some(*summary),
            Self::Aborted(_) => None,
        }
    }
}

/// Authenticates once, fetches every record of `config.model`, reconciles into `store`.
pub async fn run(config: &SyncConfig, store: &mut dyn ContactRepository) -> JobOutcome {
    let started_at = Instant::now();
    info!(
        "event=sync_run module=job status=start url={} db={} model={}",
        config.url, config.database, config.model
    );

    let records = match fetch(config).await {
        Ok(records) => records,
        Err(err) => {
            error!(
                "event=sync_run module=job status=error duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            );
            return JobOutcome::Aborted(err.into());
        }
    };

    let summary = Reconciler::new(store).sync(&records);
    info!(
        "event=sync_run module=job status=ok duration_ms={} fetched={} created={} updated={} failed={}",
        started_at.elapsed().as_millis(),
        records.len(),
        summary.created,
        summary.updated,
        summary.failed
    );
    JobOutcome::Completed(summary)
}

async fn fetch(config: &SyncConfig) -> Result<Vec<RawRecord>, RpcError> {
    let client = RpcClient::new(&config.url, config.timeout())?;
    let session = Session::connect(client, &config.database, &config.username, &config.password).await?;
    session.fetch_all(&config.model, &[], PARTNER_FIELDS).await
}

/// Opens the configured SQLite store and runs one sync on the shared runtime.
/// Must not be called from inside an async context.
pub fn run_blocking(config: &SyncConfig) -> JobOutcome {
    let guarded = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut store = match open_store(config) {
            Ok(store) => store,
            Err(err) => {
                error!("event=sync_run module=job status=error error={err}");
                return JobOutcome::Aborted(err.into());
            }
        };
        match utils::block_on(run(config, &mut store)) {
            Some(outcome) => outcome,
            None => abort_internal("async runtime unavailable".to_string()),
        }
    }));
    guarded.unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        abort_internal(format!("sync panicked: {message}"))
    })
}

/// Zero-argument entry point: loads configuration from the process, then [`run_blocking`].
pub fn trigger() -> JobOutcome {
    trigger_with(ConfigFile::load())
}

/// [`trigger`] for a host that already read the config file, e.g. to set up logging first.
pub fn trigger_with(file: Result<ConfigFile, ConfigError>) -> JobOutcome {
    match file.and_then(SyncConfig::from_file) {
        Ok(config) => run_blocking(&config),
        Err(err) => {
            error!("event=sync_run module=job status=error error={err}");
            JobOutcome::Aborted(err.into())
        }
    }
}

fn open_store(config: &SyncConfig) -> Result<SqliteContactStore, StoreError> {
    let path = config
        .resolved_db_path()
        .ok_or_else(|| StoreError::InvalidData("no db_path configured and no platform data dir".to_string()))?;
    SqliteContactStore::open(path)
}

fn abort_internal(message: String) -> JobOutcome {
    error!("event=sync_run module=job status=error error={message}");
    JobOutcome::Aborted(JobError::Internal(message))
}

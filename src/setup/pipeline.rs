/**
 * Fetch Pipeline
 *
 * The LRA data procedure, in order:
 *   1. resolve the data directory under the project root
 *   2. remove what an earlier run left at the resource paths
 *   3. download each archive
 *   4. extract it in place
 *   5. download the plain (auxiliary) files
 *
 * Resources are processed one after another. Progress goes out on an mpsc
 * channel; a successful run ends by writing `.lra-fetch.json`.
 */

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::progress::Progress;
use crate::config::FetchConfig;
use crate::downloads::{
    build_client, delete_resource, download_with_retry, extract_archive, is_resource_available,
    resource_size, verify_sha256, CancelFlag, DownloadOptions, DownloadProgress, ExtractProgress,
    Resource, ResourceKind, RetryPolicy,
};
use crate::error::{DataError, Result};
use crate::paths;

/// Fetch record written next to the data
pub const FETCH_RECORD_FILE: &str = ".lra-fetch.json";

/// Progress message for the download phase
pub const PHASE_DOWNLOAD: &str = "downloading";
/// Progress message for the extraction phase
pub const PHASE_EXTRACT: &str = "extracting";

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Keep resources that are already complete instead of re-fetching them
    pub keep_existing: bool,
    pub cancel: CancelFlag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Fetched,
    Skipped,
}

/// What happened to a single resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceReport {
    pub name: String,
    pub url: String,
    pub kind: ResourceKind,
    pub status: ResourceStatus,
    /// Downloaded bytes (on-disk size for skipped resources)
    pub bytes: u64,
    /// SHA-256 of the downloaded file
    pub sha256: Option<String>,
    /// Archive entries extracted
    pub entries: u64,
}

/// Result of a fetch run, also persisted as the fetch record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchReport {
    pub fetched_at: DateTime<Utc>,
    pub data_dir: PathBuf,
    pub resources: Vec<ResourceReport>,
}

impl FetchReport {
    pub fn resource(&self, name: &str) -> Option<&ResourceReport> {
        self.resources.iter().find(|r| r.name == name)
    }
}

fn send(tx: &Option<mpsc::Sender<Progress>>, progress: Progress) {
    if let Some(tx) = tx {
        // Intermediate updates are best effort; a full channel drops them
        tx.try_send(progress).ok();
    }
}

/// Terminal updates wait for room so every bar gets finished
async fn send_final(tx: &Option<mpsc::Sender<Progress>>, progress: Progress) {
    if let Some(tx) = tx {
        // A closed receiver only means nobody is listening
        tx.send(progress).await.ok();
    }
}

/// Read `.lra-fetch.json`, if a previous run wrote one
pub fn read_fetch_record(data_dir: &Path) -> Result<Option<FetchReport>> {
    let path = data_dir.join(FETCH_RECORD_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path).map_err(|e| DataError::io(&path, e))?;
    Ok(Some(serde_json::from_str(&text)?))
}

fn write_fetch_record(report: &FetchReport) -> Result<()> {
    let path = report.data_dir.join(FETCH_RECORD_FILE);
    let text = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, text).map_err(|e| DataError::io(&path, e))
}

/// Whether an existing copy of `resource` can be kept
fn is_reusable(data_dir: &Path, resource: &Resource, previous: Option<&FetchReport>) -> bool {
    if !is_resource_available(data_dir, resource) {
        return false;
    }
    let Some(expected) = &resource.sha256 else {
        return true;
    };

    match resource.kind {
        ResourceKind::File => verify_sha256(&resource.artifact_path(data_dir), expected).is_ok(),
        // The archive itself is gone after extraction; trust the record
        _ => previous
            .and_then(|r| r.resource(&resource.name))
            .and_then(|r| r.sha256.as_deref())
            .is_some_and(|sha| sha.eq_ignore_ascii_case(expected)),
    }
}

/// Download one resource and, for archives, extract it in place
async fn fetch_resource(
    client: &reqwest::Client,
    policy: &RetryPolicy,
    data_dir: &Path,
    resource: &Resource,
    options: &FetchOptions,
    progress_tx: &Option<mpsc::Sender<Progress>>,
) -> Result<ResourceReport> {
    let task_id = resource.name.as_str();
    let url = resource.download_url();
    let dest = resource.artifact_path(data_dir);

    tracing::info!("[Fetch] {}: {}", resource.name, url);
    send(
        progress_tx,
        Progress::in_progress(task_id, &resource.name, 0, 0).with_message(PHASE_DOWNLOAD),
    );

    let tx = progress_tx.clone();
    let on_download = move |p: DownloadProgress| {
        send(
            &tx,
            Progress::in_progress(task_id, task_id, p.downloaded, p.total)
                .with_speed((p.speed_mbps * 1_000_000.0) as u64)
                .with_message(PHASE_DOWNLOAD),
        );
    };

    let download_options = DownloadOptions {
        expected_sha256: resource.sha256.clone(),
        cancel: options.cancel.clone(),
    };
    let outcome = download_with_retry(
        client,
        &url,
        &dest,
        &download_options,
        policy,
        Some(&on_download),
    )
    .await?;

    let mut entries = 0;
    if resource.kind.is_archive() {
        options.cancel.check()?;

        let kind = resource.kind;
        let archive = dest.clone();
        let target = data_dir.to_path_buf();
        let tx = progress_tx.clone();
        let name = resource.name.clone();
        entries = tokio::task::spawn_blocking(move || {
            let on_extract = |p: ExtractProgress| {
                let progress = Progress::in_progress(&name, &name, p.entries, p.total);
                send(&tx, progress.with_message(PHASE_EXTRACT));
            };
            extract_archive(kind, &archive, &target, Some(on_extract))
        })
        .await
        .map_err(|e| DataError::Archive {
            path: dest.clone(),
            reason: e.to_string(),
        })??;

        // Remove the archive to save space
        if let Err(e) = std::fs::remove_file(&dest) {
            tracing::warn!("[Fetch] could not remove archive {:?}: {}", dest, e);
        }
    }

    // Verify download
    let check = resource.check_target(data_dir);
    if !check.exists() {
        return Err(DataError::MissingData(check));
    }

    send_final(progress_tx, Progress::completed(task_id, &resource.name)).await;
    Ok(ResourceReport {
        name: resource.name.clone(),
        url,
        kind: resource.kind,
        status: ResourceStatus::Fetched,
        bytes: outcome.bytes,
        sha256: Some(outcome.sha256),
        entries,
    })
}

/// Run the whole fetch procedure for `config` under `project_root`
pub async fn run_fetch(
    config: &FetchConfig,
    project_root: &Path,
    options: &FetchOptions,
    progress_tx: Option<mpsc::Sender<Progress>>,
) -> Result<FetchReport> {
    config.validate()?;

    // 1. data directory
    let data_dir = paths::data_dir(project_root, &config.data_dir);
    paths::ensure_dir_exists(&data_dir)?;
    tracing::info!("[Fetch] data directory: {:?}", data_dir);

    // 2. stale output from earlier runs
    let previous = read_fetch_record(&data_dir).unwrap_or_else(|e| {
        tracing::warn!("[Fetch] ignoring unreadable fetch record: {}", e);
        None
    });
    let mut keep = Vec::with_capacity(config.resources.len());
    for resource in &config.resources {
        let reuse = options.keep_existing && is_reusable(&data_dir, resource, previous.as_ref());
        if !reuse {
            delete_resource(&data_dir, resource)?;
        }
        keep.push(reuse);
        send(&progress_tx, Progress::pending(&resource.name, &resource.name));
    }
    paths::remove_path(&data_dir.join(FETCH_RECORD_FILE))?;

    // 3-5. download, extract, auxiliary files
    let client = build_client(config.timeout(), &config.user_agent)?;
    let policy = config.retry_policy();
    let mut reports = Vec::with_capacity(config.resources.len());

    for (resource, reuse) in config.resources.iter().zip(keep) {
        if reuse {
            tracing::info!("[Fetch] {} already present, keeping it", resource.name);
            let previous_entry = previous.as_ref().and_then(|r| r.resource(&resource.name));
            reports.push(ResourceReport {
                name: resource.name.clone(),
                url: resource.download_url(),
                kind: resource.kind,
                status: ResourceStatus::Skipped,
                bytes: resource_size(&data_dir, resource),
                sha256: previous_entry.and_then(|r| r.sha256.clone()),
                entries: previous_entry.map(|r| r.entries).unwrap_or(0),
            });
            send_final(
                &progress_tx,
                Progress::completed(&resource.name, &resource.name).with_message("kept existing"),
            )
            .await;
            continue;
        }

        let result = match options.cancel.check() {
            Ok(()) => {
                fetch_resource(&client, &policy, &data_dir, resource, options, &progress_tx).await
            }
            Err(e) => Err(e),
        };
        match result {
            Ok(report) => reports.push(report),
            Err(DataError::Cancelled) => {
                tracing::warn!("[Fetch] cancelled during {}", resource.name);
                let cancelled = Progress::cancelled(&resource.name, &resource.name);
                send_final(&progress_tx, cancelled).await;
                return Err(DataError::Cancelled);
            }
            Err(e) => {
                tracing::error!("[Fetch] {} failed: {}", resource.name, e);
                let failed = Progress::failed(&resource.name, &resource.name, &e.to_string());
                send_final(&progress_tx, failed).await;
                return Err(e);
            }
        }
    }

    let report = FetchReport {
        fetched_at: Utc::now(),
        data_dir,
        resources: reports,
    };
    write_fetch_record(&report)?;
    tracing::info!(
        "[Fetch] done: {} resources in {:?}",
        report.resources.len(),
        report.data_dir
    );
    Ok(report)
}

/// Remove every configured resource and the fetch record
pub fn clean(config: &FetchConfig, project_root: &Path) -> Result<PathBuf> {
    config.validate()?;
    let data_dir = paths::data_dir(project_root, &config.data_dir);
    for resource in &config.resources {
        delete_resource(&data_dir, resource)?;
    }
    paths::remove_path(&data_dir.join(FETCH_RECORD_FILE))?;
    Ok(data_dir)
}

//! End-to-end fetch runs against a local HTTP server.

use std::io::Write;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use flate2::write::GzEncoder;
use flate2::Compression;
use futures_util::stream;
use tempfile::TempDir;
use tokio::sync::mpsc;

use lra_data::config::FetchConfig;
use lra_data::downloads::{sha256_file, CancelFlag, Resource, ResourceKind};
use lra_data::setup::{
    self, FetchOptions, ProgressStatus, ResourceStatus, FETCH_RECORD_FILE, PHASE_DOWNLOAD,
};
use lra_data::DataError;

const LISTOPS_VAL: &str = "Source\tTarget\n( [MAX 2 9 ] )\t9\n( [MIN 4 1 ] )\t1\n";
const AUX_TSV: &str = "Source\tTarget\n( [SM 1 2 ] )\t3\n";

#[derive(Clone, Default)]
struct Hits {
    release: Arc<AtomicUsize>,
    flaky: Arc<AtomicUsize>,
    missing: Arc<AtomicUsize>,
}

/// A small stand-in for `lra_release.gz`
fn release_archive() -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, body) in [
        ("lra_release/listops-1000/basic_val.tsv", LISTOPS_VAL),
        ("lra_release/tsv_data/new_aan_pair.eval.tsv", "1\tA\tB\tleft\tright\n"),
    ] {
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, body.as_bytes()).unwrap();
    }
    let mut gz = builder.into_inner().unwrap();
    gz.flush().unwrap();
    gz.finish().unwrap()
}

async fn serve_release(State((hits, archive)): State<(Hits, Arc<Vec<u8>>)>) -> impl IntoResponse {
    hits.release.fetch_add(1, Ordering::SeqCst);
    archive.as_ref().clone()
}

async fn serve_flaky(State((hits, _)): State<(Hits, Arc<Vec<u8>>)>) -> impl IntoResponse {
    // Fails once, then serves the file
    if hits.flaky.fetch_add(1, Ordering::SeqCst) == 0 {
        (StatusCode::SERVICE_UNAVAILABLE, String::from("try again"))
    } else {
        (StatusCode::OK, AUX_TSV.to_string())
    }
}

async fn serve_missing(State((hits, _)): State<(Hits, Arc<Vec<u8>>)>) -> impl IntoResponse {
    hits.missing.fetch_add(1, Ordering::SeqCst);
    StatusCode::NOT_FOUND
}

/// Chunked body without Content-Length, one small chunk every 50ms
async fn serve_slow() -> Body {
    let chunks = stream::unfold(0u32, |sent| async move {
        if sent >= 200 {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        Some((Ok::<_, std::io::Error>(Bytes::from(vec![0u8; 1024])), sent + 1))
    });
    Body::from_stream(chunks)
}

async fn start_server() -> (SocketAddr, Hits) {
    let hits = Hits::default();
    let app = Router::new()
        .route("/lra_release.gz", get(serve_release))
        .route("/aux/basic_test.tsv", get(|| async { AUX_TSV }))
        .route("/flaky/basic_test.tsv", get(serve_flaky))
        .route("/missing/basic_test.tsv", get(serve_missing))
        .route("/slow/lra_release.gz", get(serve_slow))
        .with_state((hits.clone(), Arc::new(release_archive())));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, hits)
}

fn release_resource(addr: SocketAddr) -> Resource {
    Resource {
        url: format!("http://{}/lra_release.gz", addr),
        ..Resource::lra_release()
    }
}

fn test_config(addr: SocketAddr) -> FetchConfig {
    FetchConfig {
        retries: 2,
        retry_backoff_ms: 10,
        timeout_secs: 30,
        resources: vec![release_resource(addr)],
        ..FetchConfig::default()
    }
    .with_aux(&format!("http://{}/aux/basic_test.tsv", addr), Some("listops_test"))
}

fn options() -> FetchOptions {
    FetchOptions {
        keep_existing: false,
        cancel: CancelFlag::new(),
    }
}

#[tokio::test]
async fn test_fetch_extracts_release_and_aux_file() {
    let (addr, hits) = start_server().await;
    let root = TempDir::new().unwrap();
    let config = test_config(addr);

    let (tx, rx) = mpsc::channel(1024);
    let tasks = config
        .resources
        .iter()
        .map(|r| setup::Progress::pending(&r.name, &r.name))
        .collect();
    let reporter = setup::spawn_reporter(rx, tasks, false);

    let report = setup::run_fetch(&config, root.path(), &options(), Some(tx))
        .await
        .unwrap();
    let overall = reporter.await.unwrap();

    let data_dir = root.path().join("data/input/lra_data");
    assert_eq!(report.data_dir, data_dir);
    assert_eq!(
        std::fs::read_to_string(data_dir.join("lra_release/listops-1000/basic_val.tsv")).unwrap(),
        LISTOPS_VAL
    );
    assert!(data_dir.join("lra_release/tsv_data/new_aan_pair.eval.tsv").exists());
    assert_eq!(std::fs::read_to_string(data_dir.join("basic_test.tsv")).unwrap(), AUX_TSV);

    // Archive is removed after extraction, no partial files remain
    assert!(!data_dir.join("lra_release.gz").exists());
    assert!(!data_dir.join("lra_release.gz.part").exists());
    assert_eq!(hits.release.load(Ordering::SeqCst), 1);

    let release = report.resource("lra_release").unwrap();
    assert_eq!(release.status, ResourceStatus::Fetched);
    assert_eq!(release.kind, ResourceKind::TarGz);
    assert_eq!(release.entries, 2);
    let aux = report.resource("listops_test").unwrap();
    assert_eq!(aux.bytes, AUX_TSV.len() as u64);
    assert_eq!(
        aux.sha256.as_deref(),
        Some(sha256_file(&data_dir.join("basic_test.tsv")).unwrap().as_str())
    );

    let record = setup::read_fetch_record(&data_dir).unwrap().unwrap();
    assert_eq!(record, report);

    assert!(overall.tasks.iter().all(|t| t.status == ProgressStatus::Completed));
}

#[tokio::test]
async fn test_refetch_replaces_previous_output() {
    let (addr, hits) = start_server().await;
    let root = TempDir::new().unwrap();
    let config = test_config(addr);

    setup::run_fetch(&config, root.path(), &options(), None).await.unwrap();
    let data_dir = root.path().join("data/input/lra_data");
    let stray = data_dir.join("lra_release/stray.txt");
    std::fs::write(&stray, "left over").unwrap();
    std::fs::write(data_dir.join("lra_release.gz.part"), "half").unwrap();

    let report = setup::run_fetch(&config, root.path(), &options(), None).await.unwrap();

    assert!(!stray.exists());
    assert!(!data_dir.join("lra_release.gz.part").exists());
    assert!(data_dir.join("lra_release/listops-1000/basic_val.tsv").exists());
    assert_eq!(hits.release.load(Ordering::SeqCst), 2);
    assert!(report
        .resources
        .iter()
        .all(|r| r.status == ResourceStatus::Fetched));
}

#[tokio::test]
async fn test_keep_existing_skips_complete_resources() {
    let (addr, hits) = start_server().await;
    let root = TempDir::new().unwrap();
    let config = test_config(addr);

    let first = setup::run_fetch(&config, root.path(), &options(), None).await.unwrap();

    let keep = FetchOptions {
        keep_existing: true,
        cancel: CancelFlag::new(),
    };
    let second = setup::run_fetch(&config, root.path(), &keep, None).await.unwrap();

    assert_eq!(hits.release.load(Ordering::SeqCst), 1);
    for res in &second.resources {
        assert_eq!(res.status, ResourceStatus::Skipped, "{}", res.name);
    }
    assert_eq!(
        second.resource("lra_release").unwrap().sha256,
        first.resource("lra_release").unwrap().sha256
    );
}

#[tokio::test]
async fn test_missing_file_fails_without_retrying() {
    let (addr, hits) = start_server().await;
    let root = TempDir::new().unwrap();
    let config = FetchConfig {
        retry_backoff_ms: 10,
        resources: vec![Resource::auxiliary(
            "aux",
            &format!("http://{}/missing/basic_test.tsv", addr),
        )],
        ..FetchConfig::default()
    };

    let err = setup::run_fetch(&config, root.path(), &options(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, DataError::HttpStatus { status: 404, .. }), "{:?}", err);
    assert_eq!(hits.missing.load(Ordering::SeqCst), 1);
    let data_dir = root.path().join("data/input/lra_data");
    assert!(!data_dir.join("basic_test.tsv").exists());
    assert!(setup::read_fetch_record(&data_dir).unwrap().is_none());
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let (addr, hits) = start_server().await;
    let root = TempDir::new().unwrap();
    let config = FetchConfig {
        retries: 2,
        retry_backoff_ms: 10,
        resources: vec![Resource::auxiliary(
            "aux",
            &format!("http://{}/flaky/basic_test.tsv", addr),
        )],
        ..FetchConfig::default()
    };

    let report = setup::run_fetch(&config, root.path(), &options(), None).await.unwrap();

    assert_eq!(hits.flaky.load(Ordering::SeqCst), 2);
    assert_eq!(report.resource("aux").unwrap().bytes, AUX_TSV.len() as u64);
}

#[tokio::test]
async fn test_checksum_mismatch_leaves_nothing_behind() {
    let (addr, _) = start_server().await;
    let root = TempDir::new().unwrap();
    let mut aux = Resource::auxiliary("aux", &format!("http://{}/aux/basic_test.tsv", addr));
    aux.sha256 = Some("0".repeat(64));
    let config = FetchConfig {
        resources: vec![aux],
        ..FetchConfig::default()
    };

    let err = setup::run_fetch(&config, root.path(), &options(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, DataError::ChecksumMismatch { .. }), "{:?}", err);
    let data_dir = root.path().join("data/input/lra_data");
    assert!(!data_dir.join("basic_test.tsv").exists());
    assert!(!data_dir.join("basic_test.tsv.part").exists());
}

#[tokio::test]
async fn test_cancelled_run_fetches_nothing() {
    let (addr, hits) = start_server().await;
    let root = TempDir::new().unwrap();
    let config = test_config(addr);

    let cancelled = options();
    cancelled.cancel.cancel();
    let err = setup::run_fetch(&config, root.path(), &cancelled, None)
        .await
        .unwrap_err();

    assert!(matches!(err, DataError::Cancelled));
    assert_eq!(hits.release.load(Ordering::SeqCst), 0);
    let data_dir = root.path().join("data/input/lra_data");
    assert!(data_dir.is_dir());
    assert!(!data_dir.join(FETCH_RECORD_FILE).exists());
}

#[tokio::test]
async fn test_cancel_mid_download_removes_partial_file() {
    let (addr, _) = start_server().await;
    let root = TempDir::new().unwrap();
    let config = FetchConfig {
        resources: vec![Resource {
            url: format!("http://{}/slow/lra_release.gz", addr),
            ..Resource::lra_release()
        }],
        ..FetchConfig::default()
    };
    let options = options();

    // Cancel as soon as the first downloaded bytes are reported
    let (tx, mut rx) = mpsc::channel::<setup::Progress>(1024);
    let cancel = options.cancel.clone();
    let watcher = tokio::spawn(async move {
        let mut seen_total = None;
        while let Some(progress) = rx.recv().await {
            let downloading = progress.status == ProgressStatus::InProgress
                && progress.message.as_deref() == Some(PHASE_DOWNLOAD);
            if downloading && progress.current > 0 && seen_total.is_none() {
                seen_total = Some(progress.total);
                cancel.cancel();
            }
        }
        seen_total
    });

    let err = setup::run_fetch(&config, root.path(), &options, Some(tx))
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::Cancelled), "{:?}", err);

    // No Content-Length, so the total was unknown while streaming
    assert_eq!(watcher.await.unwrap(), Some(0));

    let data_dir = root.path().join("data/input/lra_data");
    assert!(!data_dir.join("lra_release.gz.part").exists());
    assert!(!data_dir.join("lra_release.gz").exists());
    assert!(!data_dir.join(FETCH_RECORD_FILE).exists());
}

#[tokio::test]
async fn test_clean_removes_resources() {
    let (addr, _) = start_server().await;
    let root = TempDir::new().unwrap();
    let config = test_config(addr);

    setup::run_fetch(&config, root.path(), &options(), None).await.unwrap();
    let data_dir = setup::clean(&config, root.path()).unwrap();

    assert!(!data_dir.join("lra_release").exists());
    assert!(!data_dir.join("basic_test.tsv").exists());
    assert!(setup::read_fetch_record(&data_dir).unwrap().is_none());
}

mod common;

use common::{body, serve, RangeResponder, MIB};
use futures::StreamExt;
use slicedl::{
    DigestEncoding, DownloadError, DownloadResult, DownloaderConfig, FileDownloader, FileValidator,
};
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn downloader(dir: &Path) -> FileDownloader {
    FileDownloader::new(DownloaderConfig::default().with_output_dir(dir)).unwrap()
}

async fn collect(downloader: &FileDownloader, url: String, name: &str) -> Vec<DownloadResult> {
    downloader.download_file(url, name).collect().await
}

fn assert_single_terminal_last(events: &[DownloadResult]) {
    let terminals = events.iter().filter(|e| e.is_terminal()).count();
    assert_eq!(terminals, 1);
    assert!(events.last().unwrap().is_terminal());
}

#[tokio::test]
async fn streams_file_without_range_support() {
    let data = body(100_000);
    let server = serve(data.clone(), false).await;
    let dir = tempfile::tempdir().unwrap();
    let url = format!("{}/file.bin", server.uri());

    let events = collect(&downloader(dir.path()), url.clone(), "file.bin").await;

    assert!(events
        .iter()
        .any(|e| matches!(e, DownloadResult::ProgressUpdate { .. })));
    assert_single_terminal_last(&events);
    match events.last().unwrap() {
        DownloadResult::Completed { file_path, url: done } => {
            assert_eq!(done, &url);
            assert_eq!(file_path, &dir.path().join("file.bin"));
            assert_eq!(std::fs::read(file_path).unwrap(), data);
        }
        other => panic!("unexpected terminal event {other:?}"),
    }

    let gets = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "GET")
        .count();
    assert_eq!(gets, 1);
}

#[tokio::test]
async fn slices_ranged_file_and_merges_it() {
    let data = body(10 * MIB);
    let server = serve(data.clone(), true).await;
    let dir = tempfile::tempdir().unwrap();

    let events = collect(&downloader(dir.path()), server.uri(), "big.bin").await;

    assert_single_terminal_last(&events);
    assert!(matches!(events.last(), Some(DownloadResult::Completed { .. })));
    let merged = std::fs::read(dir.path().join("big.bin")).unwrap();
    assert_eq!(merged.len(), 10 * MIB);
    assert!(merged == data);

    let mut ranges: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter_map(|r| {
            r.headers
                .get("range")
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        })
        .collect();
    ranges.sort();
    assert_eq!(ranges, vec!["bytes=0-5242879", "bytes=5242880-10485759"]);

    // temp directory is gone, only the merged file remains
    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn progress_never_exceeds_total() {
    let server = serve(body(6 * MIB), true).await;
    let dir = tempfile::tempdir().unwrap();
    let downloader = FileDownloader::new(
        DownloaderConfig::default()
            .with_output_dir(dir.path())
            .with_progress_interval(Duration::ZERO),
    )
    .unwrap();

    let events = collect(&downloader, server.uri(), "six.bin").await;

    assert_single_terminal_last(&events);
    for event in &events {
        if let DownloadResult::ProgressUpdate { progress, .. } = event {
            assert_eq!(progress.total, 6 * MIB as u64);
            assert!(progress.downloaded <= progress.total);
        }
    }
}

#[tokio::test]
async fn digest_mismatch_fails_and_keeps_file() {
    let server = serve(body(100_000), false).await;
    let dir = tempfile::tempdir().unwrap();
    let downloader = downloader(dir.path())
        .with_validator(FileValidator::md5("00000000000000000000000000000000"));

    let events = collect(&downloader, server.uri(), "checked.bin").await;

    assert_single_terminal_last(&events);
    assert!(matches!(
        events.last(),
        Some(DownloadResult::Failed {
            error: DownloadError::ValidationFailed { .. },
            ..
        })
    ));
    assert!(dir.path().join("checked.bin").exists());
}

#[tokio::test]
async fn matching_base64_digest_completes() {
    let server = serve(b"Hello, World!".to_vec(), false).await;
    let dir = tempfile::tempdir().unwrap();
    let validator =
        FileValidator::md5("ZajifYh5KDgxtmS9i38K1A==").with_encoding(DigestEncoding::Base64);
    let downloader = downloader(dir.path()).with_validator(validator);

    let events = collect(&downloader, server.uri(), "hello.txt").await;

    assert!(matches!(events.last(), Some(DownloadResult::Completed { .. })));
}

#[tokio::test]
async fn probe_failure_is_the_only_event() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();

    let events = collect(&downloader(dir.path()), server.uri(), "missing.bin").await;

    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0],
        DownloadResult::Failed {
            error: DownloadError::ProbeFailed(_),
            ..
        }
    ));
}

#[tokio::test]
async fn cancellation_closes_without_terminal_event() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body(100_000)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body(100_000))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();

    let mut download = downloader(dir.path()).download_file(server.uri(), "slow.bin");
    tokio::time::sleep(Duration::from_millis(200)).await;
    download.cancel();

    let mut events = Vec::new();
    tokio::time::timeout(Duration::from_secs(3), async {
        while let Some(event) = download.next_event().await {
            events.push(event);
        }
    })
    .await
    .expect("sequence should close after cancellation");

    assert!(events.iter().all(|e| !e.is_terminal()));
    assert!(!dir.path().join("slow.bin").exists());
}

#[tokio::test]
async fn cancelling_sliced_download_keeps_parts_for_resume() {
    let size = 6 * MIB;
    let data = body(size);
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(data.clone())
                .insert_header("accept-ranges", "bytes"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("range", "bytes=3145728-6291455"))
        .respond_with(
            ResponseTemplate::new(206)
                .set_body_bytes(data[3 * MIB..].to_vec())
                .set_delay(Duration::from_secs(5)),
        )
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(RangeResponder(data))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let downloader = FileDownloader::new(
        DownloaderConfig::default()
            .with_output_dir(dir.path())
            .with_progress_interval(Duration::ZERO),
    )
    .unwrap();

    let mut download = downloader.download_file(server.uri(), "sliced.bin");
    let mut events = Vec::new();
    tokio::time::timeout(Duration::from_secs(3), async {
        while let Some(event) = download.next_event().await {
            if matches!(event, DownloadResult::ProgressUpdate { .. }) {
                download.cancel();
            }
            events.push(event);
        }
    })
    .await
    .expect("sequence should close after cancellation");

    assert!(events
        .iter()
        .any(|e| matches!(e, DownloadResult::ProgressUpdate { .. })));
    assert!(events.iter().all(|e| !e.is_terminal()));
    assert!(!dir.path().join("sliced.bin").exists());

    let temp_dir = dir.path().join(slicedl::hashing::md5_hex("sliced.bin"));
    let first_part = temp_dir.join("0.part").metadata().unwrap();
    assert!(first_part.len() > 0);
    assert!(temp_dir.join("1.part").exists());
}

#[tokio::test]
async fn second_run_reuses_finished_temp_file() {
    let data = body(100_000);
    let server = serve(data.clone(), false).await;
    let dir = tempfile::tempdir().unwrap();
    let temp_dir = dir.path().join(slicedl::hashing::md5_hex("again.bin"));
    std::fs::create_dir_all(&temp_dir).unwrap();
    std::fs::write(temp_dir.join("0.part"), &data).unwrap();

    let events = collect(&downloader(dir.path()), server.uri(), "again.bin").await;

    assert!(matches!(events.last(), Some(DownloadResult::Completed { .. })));
    assert_eq!(std::fs::read(dir.path().join("again.bin")).unwrap(), data);
    let gets = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "GET")
        .count();
    assert_eq!(gets, 0);
}

//! Delivery transport integration tests.
//!
//! The direct-upload transport is exercised against a minimal in-process
//! HTTP server so status-code handling is tested without a real analyzer.

use std::path::PathBuf;

use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use tunegrab::config::DeliveryConfig;
use tunegrab::deliver::{AnalyzerSink, DeliveryMetadata, TransportKind};

fn metadata(id: &str) -> DeliveryMetadata {
    DeliveryMetadata {
        source: "youtube".to_string(),
        video_id: id.to_string(),
        title: format!("Video {}", id),
        channel: "Channel".to_string(),
        description: String::new(),
        published_at: None,
    }
}

fn artifact(temp: &TempDir, name: &str) -> PathBuf {
    let path = temp.path().join(name);
    std::fs::write(&path, b"fake audio bytes").unwrap();
    path
}

/// Spawn a one-shot HTTP server answering every request with `status`.
///
/// Reads the full request (headers plus Content-Length body) before
/// responding, so the client never sees a connection reset.
async fn spawn_status_server(status: u16, reason: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];

            // Read until end of headers
            let header_end = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break None;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break Some(pos + 4);
                }
            };

            if let Some(header_end) = header_end {
                // Drain the body per Content-Length
                let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
                let content_length: usize = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(0);

                while buf.len() - header_end < content_length {
                    let n = socket.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }
            }

            let response =
                format!("HTTP/1.1 {} {}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n", status, reason);
            let _ = socket.write_all(response.as_bytes()).await;
        }
    });

    format!("http://{}/ingest", addr)
}

fn upload_sink(url: String) -> AnalyzerSink {
    let delivery = DeliveryConfig {
        transport: TransportKind::DirectUpload,
        analyzer_url: Some(url),
        ..Default::default()
    };
    AnalyzerSink::from_config(&delivery, "mp3").unwrap()
}

#[tokio::test]
async fn test_direct_upload_200_succeeds() {
    let temp = TempDir::new().unwrap();
    let url = spawn_status_server(200, "OK").await;
    let sink = upload_sink(url);

    let audio = artifact(&temp, "song.mp3");
    assert!(sink.deliver(&audio, &metadata("a")).await);
}

#[tokio::test]
async fn test_direct_upload_500_reports_failure() {
    let temp = TempDir::new().unwrap();
    let url = spawn_status_server(500, "Internal Server Error").await;
    let sink = upload_sink(url);

    let audio = artifact(&temp, "song.mp3");
    assert!(!sink.deliver(&audio, &metadata("a")).await);
}

#[tokio::test]
async fn test_direct_upload_non_200_success_codes_fail() {
    // Success is strictly 200; a 202 is still a failure
    let temp = TempDir::new().unwrap();
    let url = spawn_status_server(202, "Accepted").await;
    let sink = upload_sink(url);

    let audio = artifact(&temp, "song.mp3");
    assert!(!sink.deliver(&audio, &metadata("a")).await);
}

#[tokio::test]
async fn test_direct_upload_unreachable_reports_failure() {
    let temp = TempDir::new().unwrap();
    // Nothing listens here
    let sink = upload_sink("http://127.0.0.1:1/ingest".to_string());

    let audio = artifact(&temp, "song.mp3");
    assert!(!sink.deliver(&audio, &metadata("a")).await);
}

#[tokio::test]
async fn test_missing_artifact_reports_failure_without_sending() {
    let url = spawn_status_server(200, "OK").await;
    let sink = upload_sink(url);

    assert!(
        !sink
            .deliver(&PathBuf::from("/nonexistent/song.mp3"), &metadata("a"))
            .await
    );
}

#[tokio::test]
async fn test_file_drop_writes_artifact_and_sidecar() {
    let temp = TempDir::new().unwrap();
    let inbox = temp.path().join("inbox");

    let delivery = DeliveryConfig {
        transport: TransportKind::FileDrop,
        watch_dir: Some(inbox.clone()),
        ..Default::default()
    };
    let sink = AnalyzerSink::from_config(&delivery, "mp3").unwrap();

    let audio = artifact(&temp, "My Song [abc123].mp3");
    assert!(sink.deliver(&audio, &metadata("abc123")).await);

    let dropped = inbox.join("My Song [abc123].mp3");
    assert_eq!(std::fs::read(&dropped).unwrap(), b"fake audio bytes");

    let sidecar = inbox.join("My Song [abc123].json");
    let content = std::fs::read_to_string(&sidecar).unwrap();
    let parsed: DeliveryMetadata = serde_json::from_str(&content).unwrap();
    assert_eq!(parsed.video_id, "abc123");
    assert_eq!(parsed.source, "youtube");
}

#[tokio::test]
async fn test_queue_transports_report_broker_outage_as_false() {
    let temp = TempDir::new().unwrap();
    let audio = artifact(&temp, "song.mp3");

    // No broker is listening on either port; deliver must return false
    // rather than erroring past the dispatcher boundary.
    let delivery = DeliveryConfig {
        transport: TransportKind::QueueDurable,
        amqp_url: Some("amqp://127.0.0.1:1/%2f".to_string()),
        ..Default::default()
    };
    let sink = AnalyzerSink::from_config(&delivery, "mp3").unwrap();
    assert!(!sink.deliver(&audio, &metadata("a")).await);

    let delivery = DeliveryConfig {
        transport: TransportKind::QueueList,
        redis_url: Some("redis://127.0.0.1:1/".to_string()),
        ..Default::default()
    };
    let sink = AnalyzerSink::from_config(&delivery, "mp3").unwrap();
    assert!(!sink.deliver(&audio, &metadata("a")).await);
}

//! Retrieval collaborator integration tests

mod common;

use std::time::Duration;

use common::{spawn_fixture_server, tone_wav};
use klang_ac::services::AudioFetcher;
use klang_common::Error;

#[tokio::test]
async fn test_download_writes_served_bytes() {
    let payload = tone_wav(440.0, 0.5, 22050, 1, 0.5);
    let server = spawn_fixture_server(payload.clone(), "audio/wav").await;
    let fetcher = AudioFetcher::new(Duration::from_secs(10)).unwrap();

    let fetched = fetcher.fetch(&server.clip_url()).await.unwrap();

    let written = std::fs::read(fetched.path()).unwrap();
    assert_eq!(written, payload);
    assert_eq!(
        fetched.path().extension().and_then(|e| e.to_str()),
        Some("wav"),
        "suffix comes from the URL path"
    );
    assert_eq!(fetched.content_type, "audio/wav");
}

#[tokio::test]
async fn test_temp_file_removed_on_drop() {
    let server = spawn_fixture_server(tone_wav(440.0, 0.5, 22050, 1, 0.2), "audio/wav").await;
    let fetcher = AudioFetcher::new(Duration::from_secs(10)).unwrap();

    let fetched = fetcher.fetch(&server.clip_url()).await.unwrap();
    let path = fetched.path().to_path_buf();
    assert!(path.exists());

    drop(fetched);
    assert!(!path.exists(), "temp file must be deleted on drop");
}

#[tokio::test]
async fn test_redirect_suffix_comes_from_final_url() {
    let server = spawn_fixture_server(tone_wav(440.0, 0.5, 22050, 1, 0.2), "audio/wav").await;
    let fetcher = AudioFetcher::new(Duration::from_secs(10)).unwrap();

    let fetched = fetcher
        .fetch(&format!("{}/redirect", server.base_url))
        .await
        .unwrap();

    assert_eq!(
        fetched.path().extension().and_then(|e| e.to_str()),
        Some("wav")
    );
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn test_http_error_is_input_fault() {
    let server = spawn_fixture_server(Vec::new(), "audio/wav").await;
    let fetcher = AudioFetcher::new(Duration::from_secs(10)).unwrap();

    let err = fetcher
        .fetch(&format!("{}/nope.wav", server.base_url))
        .await
        .unwrap_err();

    match err {
        Error::Input(msg) => assert!(msg.contains("404")),
        other => panic!("expected Input error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_host_is_input_fault() {
    // Reserved TEST-NET-1 address: nothing listens there
    let fetcher = AudioFetcher::new(Duration::from_secs(1)).unwrap();
    let err = fetcher
        .fetch("http://192.0.2.1:9/clip.wav")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Input(_)));
}

//! Shared helpers for klang-ac integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;

use klang_ac::services::{
    AnalysisPipeline, AudioFetcher, ClassificationStore, ClassifierStrategy, MemoryStore,
};
use klang_ac::workers::CpuPool;
use klang_ac::AppState;

/// A fixture HTTP server serving one audio payload at `/clip<suffix>`.
pub struct FixtureServer {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
}

impl FixtureServer {
    /// Number of times the clip was downloaded.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// URL of the served clip.
    pub fn clip_url(&self) -> String {
        format!("{}/clip.wav", self.base_url)
    }
}

/// Spawn a local server responding to `GET /clip.wav` with `body` and
/// `content_type`, and to `GET /redirect` with a redirect to `/clip.wav`.
/// Any other path returns 404.
pub async fn spawn_fixture_server(body: Vec<u8>, content_type: &'static str) -> FixtureServer {
    let hits = Arc::new(AtomicUsize::new(0));
    let payload = Arc::new(body);

    let clip_hits = hits.clone();
    let app = Router::new()
        .route(
            "/clip.wav",
            get(move || {
                let payload = payload.clone();
                let hits = clip_hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Response::builder()
                        .status(StatusCode::OK)
                        .header(header::CONTENT_TYPE, content_type)
                        .body(Body::from(payload.as_ref().clone()))
                        .unwrap()
                }
            }),
        )
        .route(
            "/redirect",
            get(|| async { Redirect::temporary("/clip.wav").into_response() }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fixture server");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FixtureServer {
        base_url: format!("http://{}", addr),
        hits,
    }
}

/// 16-bit PCM WAV bytes: silence.
pub fn silence_wav(sample_rate: u32, channels: u16, seconds: f32) -> Vec<u8> {
    tone_wav(0.0, 0.0, sample_rate, channels, seconds)
}

/// 16-bit PCM WAV bytes: a single sine tone on every channel.
pub fn tone_wav(freq: f32, amplitude: f32, sample_rate: u32, channels: u16, seconds: f32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        let frames = (sample_rate as f32 * seconds) as usize;
        for i in 0..frames {
            let t = i as f32 / sample_rate as f32;
            let value = (amplitude
                * (2.0 * std::f32::consts::PI * freq * t).sin()
                * i16::MAX as f32) as i16;
            for _ in 0..channels {
                writer.write_sample(value).unwrap();
            }
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Build a heuristic-strategy pipeline over the given store.
pub fn heuristic_pipeline(store: Arc<dyn ClassificationStore>, ttl: Duration) -> AnalysisPipeline {
    AnalysisPipeline::new(
        AudioFetcher::new(Duration::from_secs(10)).unwrap(),
        store,
        ClassifierStrategy::Heuristic,
        CpuPool::new(2),
        ttl,
    )
}

/// Test app state: heuristic classifier over an in-memory store.
pub fn heuristic_app_state() -> AppState {
    let store: Arc<dyn ClassificationStore> = Arc::new(MemoryStore::new());
    AppState::new(Arc::new(heuristic_pipeline(store, Duration::from_secs(3600))))
}

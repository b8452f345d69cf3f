//! The Google Translate speech client against a local stand-in server.
//!
//! A small axum app plays the part of `/translate_tts`: it records every
//! query string and answers with a fake MP3 body naming the chunk index, so
//! the tests can check chunking, ordering and error mapping without network
//! access.

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use image::{DynamicImage, ImageFormat, RgbImage};
use img2audio::{
    ConversionConfig, GoogleTranslateTts, Img2AudioError, ImageToAudioConverter, LanguageCode,
    SpeechSynthesizer, TextRecognizer,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const LONG_TEXT: &str = "The quick brown fox jumps over the lazy dog. \
The quick brown fox jumps over the lazy dog. \
The quick brown fox jumps over the lazy dog. \
The quick brown fox jumps over the lazy dog. \
The quick brown fox jumps over the lazy dog.";

// ── Stand-in server ──────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Reply {
    Audio,
    EmptyBody,
    Status(StatusCode),
}

#[derive(Clone)]
struct Recorder {
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    reply: Reply,
}

impl Recorder {
    fn new(reply: Reply) -> Self {
        Self {
            queries: Arc::new(Mutex::new(Vec::new())),
            reply,
        }
    }

    fn queries(&self) -> Vec<HashMap<String, String>> {
        self.queries.lock().unwrap().clone()
    }
}

async fn translate_tts(
    State(rec): State<Recorder>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let idx = query.get("idx").cloned().unwrap_or_default();
    rec.queries.lock().unwrap().push(query);

    match rec.reply {
        Reply::Audio => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "audio/mpeg")],
            format!("MP3[{idx}]").into_bytes(),
        )
            .into_response(),
        Reply::EmptyBody => (StatusCode::OK, Vec::<u8>::new()).into_response(),
        Reply::Status(status) => (status, "nope").into_response(),
    }
}

/// Start the stand-in server and return its base URL.
async fn serve(rec: Recorder) -> String {
    let app = Router::new()
        .route("/translate_tts", get(translate_tts))
        .with_state(rec);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base_url: &str, slow: bool) -> GoogleTranslateTts {
    GoogleTranslateTts::new(base_url, 5, slow, 100, true).unwrap()
}

// ── Chunking and request shape ───────────────────────────────────────────────

#[tokio::test]
async fn long_text_is_requested_in_order_and_concatenated() {
    let rec = Recorder::new(Reply::Audio);
    let base = serve(rec.clone()).await;

    let audio = client(&base, false).synthesize(LONG_TEXT, "en").await.unwrap();

    let queries = rec.queries();
    assert!(queries.len() >= 3, "expected several chunks, got {}", queries.len());

    let expected: String = (0..queries.len()).map(|i| format!("MP3[{i}]")).collect();
    assert_eq!(String::from_utf8(audio).unwrap(), expected);

    let total = queries.len().to_string();
    for (i, q) in queries.iter().enumerate() {
        let text = &q["q"];
        assert!(text.chars().count() <= 100, "chunk too long: {text:?}");
        assert_eq!(q["idx"], i.to_string());
        assert_eq!(q["total"], total);
        assert_eq!(q["textlen"], text.chars().count().to_string());
        assert_eq!(q["tl"], "en");
        assert_eq!(q["client"], "tw-ob");
        assert_eq!(q["ie"], "UTF-8");
        assert_eq!(q["ttsspeed"], "1");
    }

    // No words are lost or split between chunks.
    let rejoined: Vec<&str> = queries
        .iter()
        .flat_map(|q| q["q"].split_whitespace().collect::<Vec<_>>())
        .collect();
    let original: Vec<&str> = LONG_TEXT.split_whitespace().collect();
    assert_eq!(rejoined, original);
}

#[tokio::test]
async fn short_text_is_one_request() {
    let rec = Recorder::new(Reply::Audio);
    let base = serve(rec.clone()).await;

    let audio = client(&base, false).synthesize("Hello", "fr").await.unwrap();

    assert_eq!(audio, b"MP3[0]");
    let queries = rec.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0]["q"], "Hello");
    assert_eq!(queries[0]["tl"], "fr");
    assert_eq!(queries[0]["total"], "1");
}

#[tokio::test]
async fn slow_speech_sets_speed() {
    let rec = Recorder::new(Reply::Audio);
    let base = serve(rec.clone()).await;

    client(&base, true).synthesize("Hello", "en").await.unwrap();
    assert_eq!(rec.queries()[0]["ttsspeed"], "0.24");
}

#[tokio::test]
async fn ocr_line_breaks_become_spaces() {
    let rec = Recorder::new(Reply::Audio);
    let base = serve(rec.clone()).await;

    client(&base, false)
        .synthesize("Hello\nworld\n", "en")
        .await
        .unwrap();
    assert_eq!(rec.queries()[0]["q"], "Hello world");
}

// ── Error mapping ────────────────────────────────────────────────────────────

#[tokio::test]
async fn too_many_requests_is_rate_limited_and_stops() {
    let rec = Recorder::new(Reply::Status(StatusCode::TOO_MANY_REQUESTS));
    let base = serve(rec.clone()).await;

    let err = client(&base, false)
        .synthesize(LONG_TEXT, "en")
        .await
        .unwrap_err();
    assert!(matches!(err, Img2AudioError::RateLimited), "got: {err}");
    assert_eq!(rec.queries().len(), 1);
}

#[tokio::test]
async fn server_error_is_rejected_with_status() {
    let rec = Recorder::new(Reply::Status(StatusCode::INTERNAL_SERVER_ERROR));
    let base = serve(rec.clone()).await;

    let err = client(&base, false)
        .synthesize("Hello", "en")
        .await
        .unwrap_err();
    match err {
        Img2AudioError::SynthesisRejected {
            status,
            chunk,
            total,
            ..
        } => {
            assert_eq!(status, 500);
            assert_eq!(chunk, 1);
            assert_eq!(total, 1);
        }
        other => panic!("expected SynthesisRejected, got: {other}"),
    }
}

#[tokio::test]
async fn empty_body_is_empty_audio() {
    let rec = Recorder::new(Reply::EmptyBody);
    let base = serve(rec.clone()).await;

    let err = client(&base, false)
        .synthesize("Hello", "en")
        .await
        .unwrap_err();
    assert!(matches!(err, Img2AudioError::EmptyAudio { .. }), "got: {err}");
}

#[tokio::test]
async fn closed_port_is_unreachable() {
    // Bind then drop to get a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{addr}"), false)
        .synthesize("Hello", "en")
        .await
        .unwrap_err();
    match err {
        Img2AudioError::SynthesisUnreachable { host, .. } => assert_eq!(host, "127.0.0.1"),
        other => panic!("expected SynthesisUnreachable, got: {other}"),
    }
}

#[tokio::test]
async fn unknown_language_sends_nothing() {
    let rec = Recorder::new(Reply::Audio);
    let base = serve(rec.clone()).await;

    let err = client(&base, false)
        .synthesize("Hola", "sp")
        .await
        .unwrap_err();
    assert!(
        matches!(err, Img2AudioError::UnsupportedTtsLanguage { .. }),
        "got: {err}"
    );
    assert!(rec.queries().is_empty());
}

#[tokio::test]
async fn lang_check_can_be_disabled() {
    let rec = Recorder::new(Reply::Audio);
    let base = serve(rec.clone()).await;

    let tts = GoogleTranslateTts::new(base.as_str(), 5, false, 100, false).unwrap();
    tts.synthesize("Hola", "sp").await.unwrap();
    assert_eq!(rec.queries()[0]["tl"], "sp");
}

// ── Through the converter ────────────────────────────────────────────────────

struct FixedText(&'static str);

#[async_trait]
impl TextRecognizer for FixedText {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn check_available(&self) -> Result<String, Img2AudioError> {
        Ok("fixed 1".to_string())
    }

    async fn recognize(
        &self,
        _image: &DynamicImage,
        _language: &LanguageCode,
    ) -> Result<String, Img2AudioError> {
        Ok(self.0.to_string())
    }
}

#[tokio::test]
async fn converter_writes_concatenated_audio() {
    let rec = Recorder::new(Reply::Audio);
    let base = serve(rec.clone()).await;

    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("page.png");
    DynamicImage::ImageRgb8(RgbImage::new(8, 8))
        .save_with_format(&image, ImageFormat::Png)
        .unwrap();
    let out = dir.path().join("page.mp3");

    let config = ConversionConfig::builder()
        .recognizer(Arc::new(FixedText(LONG_TEXT)))
        .tts_base_url(base)
        .build()
        .unwrap();
    let conv = ImageToAudioConverter::new(config.clone()).await.unwrap();
    let output = conv.convert(&image, &out, &config.language).await.unwrap();

    let n = rec.queries().len();
    let expected: String = (0..n).map(|i| format!("MP3[{i}]")).collect();
    assert_eq!(std::fs::read_to_string(&out).unwrap(), expected);
    assert_eq!(output.stats.audio_bytes as usize, expected.len());
    assert!(rec.queries().iter().all(|q| q["tl"] == "en"));
}

//! Speech synthesis: text → MP3 bytes through a remote speech service.
//!
//! [`SpeechSynthesizer`] is the seam between the pipeline and the service.
//! [`GoogleTranslateTts`] talks to the Google Translate speech endpoint, the
//! same unauthenticated endpoint the translate web page uses:
//!
//! ```text
//! GET https://translate.google.com/translate_tts
//!     ?ie=UTF-8&q=<chunk>&tl=<lang>&total=<n>&idx=<i>&textlen=<len>
//!     &client=tw-ob&prev=input&ttsspeed=<1|0.24>
//! ```
//!
//! Each request carries at most ~100 characters, so the text is first cut
//! into chunks by [`crate::pipeline::chunk`]. Chunks are requested one after
//! another and the MP3 bodies are concatenated in order; MP3 frames are
//! self-delimiting so the result plays as a single file.
//!
//! There is no retry: the first failed chunk fails the whole synthesis.

use crate::error::Img2AudioError;
use crate::pipeline::chunk::prepare_chunks;
use crate::progress::ProgressCallback;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, info};

/// Language codes the speech endpoint accepts.
pub const SUPPORTED_TTS_LANGUAGES: &[&str] = &[
    "af", "am", "ar", "bg", "bn", "bs", "ca", "cs", "cy", "da", "de", "el", "en", "es", "et",
    "eu", "fi", "fr", "fr-CA", "gl", "gu", "ha", "hi", "hr", "hu", "id", "is", "it", "iw", "ja",
    "jw", "km", "kn", "ko", "la", "lt", "lv", "ml", "mr", "ms", "my", "ne", "nl", "no", "pa",
    "pl", "pt", "pt-PT", "ro", "ru", "si", "sk", "sq", "sr", "su", "sv", "sw", "ta", "te", "th",
    "tl", "tr", "uk", "ur", "vi", "yue", "zh", "zh-CN", "zh-TW",
];

/// Browser-like user agent; the endpoint refuses some non-browser agents.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Whether the endpoint is known to accept `lang` (case-insensitive).
pub fn is_supported_tts_language(lang: &str) -> bool {
    SUPPORTED_TTS_LANGUAGES
        .iter()
        .any(|l| l.eq_ignore_ascii_case(lang))
}

/// An engine that turns text into audio.
///
/// Implementations handle their own text-length limits and return a single
/// merged audio stream.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Short engine name for logs and errors.
    fn name(&self) -> &str;

    /// Synthesize `text` in `language` and return the encoded audio.
    async fn synthesize(&self, text: &str, language: &str) -> Result<Vec<u8>, Img2AudioError>;
}

/// Client for the Google Translate speech endpoint.
pub struct GoogleTranslateTts {
    client: reqwest::Client,
    base_url: String,
    slow: bool,
    max_chunk_chars: usize,
    lang_check: bool,
    progress: Option<ProgressCallback>,
}

impl GoogleTranslateTts {
    /// Create a client for `base_url` (e.g. `https://translate.google.com`).
    pub fn new(
        base_url: impl Into<String>,
        timeout_secs: u64,
        slow: bool,
        max_chunk_chars: usize,
        lang_check: bool,
    ) -> Result<Self, Img2AudioError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Img2AudioError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            slow,
            max_chunk_chars: max_chunk_chars.max(1),
            lang_check,
            progress: None,
        })
    }

    /// Report each finished chunk to `cb`.
    pub fn with_progress(mut self, cb: Option<ProgressCallback>) -> Self {
        self.progress = cb;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/translate_tts", self.base_url)
    }

    fn host(&self) -> String {
        reqwest::Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| self.base_url.clone())
    }

    /// Query parameters for chunk `idx` (0-indexed) of `total`.
    fn query(&self, chunk: &str, language: &str, idx: usize, total: usize) -> Vec<(&'static str, String)> {
        vec![
            ("ie", "UTF-8".to_string()),
            ("q", chunk.to_string()),
            ("tl", language.to_string()),
            ("total", total.to_string()),
            ("idx", idx.to_string()),
            ("textlen", chunk.chars().count().to_string()),
            ("client", "tw-ob".to_string()),
            ("prev", "input".to_string()),
            ("ttsspeed", if self.slow { "0.24" } else { "1" }.to_string()),
        ]
    }

    async fn fetch_chunk(
        &self,
        chunk: &str,
        language: &str,
        idx: usize,
        total: usize,
    ) -> Result<Vec<u8>, Img2AudioError> {
        let response = self
            .client
            .get(self.endpoint())
            .query(&self.query(chunk, language, idx, total))
            .header(reqwest::header::REFERER, format!("{}/", self.base_url))
            .send()
            .await
            .map_err(|e| Img2AudioError::SynthesisUnreachable {
                host: self.host(),
                reason: if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.to_string()
                },
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Img2AudioError::RateLimited);
        }
        if !status.is_success() {
            return Err(Img2AudioError::SynthesisRejected {
                status: status.as_u16(),
                chunk: idx + 1,
                total,
                hint: status_hint(status).to_string(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Img2AudioError::SynthesisUnreachable {
                host: self.host(),
                reason: format!("reading response body: {e}"),
            })?;

        if bytes.is_empty() {
            return Err(Img2AudioError::EmptyAudio {
                chunk: idx + 1,
                total,
            });
        }
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateTts {
    fn name(&self) -> &str {
        "google-translate"
    }

    async fn synthesize(&self, text: &str, language: &str) -> Result<Vec<u8>, Img2AudioError> {
        if self.lang_check && !is_supported_tts_language(language) {
            return Err(Img2AudioError::UnsupportedTtsLanguage {
                language: language.to_string(),
                hint: "\nPass a supported code with --tts-lang (e.g. en, es, de, zh-CN), \
                       or disable the check with --no-lang-check."
                    .to_string(),
            });
        }

        let chunks = prepare_chunks(text, self.max_chunk_chars);
        if chunks.is_empty() {
            return Err(Img2AudioError::EmptyText);
        }

        let total = chunks.len();
        info!(
            "Synthesizing {} chars in {} chunk(s), language '{}'",
            text.chars().count(),
            total,
            language
        );

        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let bytes = self.fetch_chunk(chunk, language, idx, total).await?;
            debug!("Chunk {}/{}: {} bytes audio", idx + 1, total, bytes.len());
            audio.extend_from_slice(&bytes);

            if let Some(ref cb) = self.progress {
                cb.on_chunk_complete(idx + 1, total);
            }
        }

        Ok(audio)
    }
}

fn status_hint(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 | 404 => "\nThe language may not be supported; try a different --tts-lang.",
        403 => "\nThe request was refused; try a different --tld.",
        500..=599 => "\nThe speech service is having problems; try again later.",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(slow: bool) -> GoogleTranslateTts {
        GoogleTranslateTts::new("https://translate.google.com/", 5, slow, 100, true).unwrap()
    }

    #[test]
    fn supported_languages() {
        assert!(is_supported_tts_language("en"));
        assert!(is_supported_tts_language("zh-cn"));
        assert!(!is_supported_tts_language("sp"));
        assert!(!is_supported_tts_language("ch"));
    }

    #[test]
    fn endpoint_and_host() {
        let tts = client(false);
        assert_eq!(tts.endpoint(), "https://translate.google.com/translate_tts");
        assert_eq!(tts.host(), "translate.google.com");
    }

    #[test]
    fn query_parameters() {
        let q = client(false).query("héllo", "fr", 1, 3);
        let get = |k: &str| q.iter().find(|(key, _)| *key == k).map(|(_, v)| v.as_str());
        assert_eq!(get("q"), Some("héllo"));
        assert_eq!(get("tl"), Some("fr"));
        assert_eq!(get("idx"), Some("1"));
        assert_eq!(get("total"), Some("3"));
        assert_eq!(get("textlen"), Some("5"));
        assert_eq!(get("client"), Some("tw-ob"));
        assert_eq!(get("ttsspeed"), Some("1"));
    }

    #[test]
    fn slow_speed() {
        let q = client(true).query("x", "en", 0, 1);
        assert!(q.contains(&("ttsspeed", "0.24".to_string())));
    }

    #[tokio::test]
    async fn unsupported_language_fails_before_any_request() {
        // Port 9 (discard) on localhost: a request would fail as unreachable,
        // so getting UnsupportedTtsLanguage proves none was made.
        let tts = GoogleTranslateTts::new("http://127.0.0.1:9", 1, false, 100, true).unwrap();
        let err = tts.synthesize("Hola", "sp").await.unwrap_err();
        assert!(
            matches!(err, Img2AudioError::UnsupportedTtsLanguage { .. }),
            "got: {err}"
        );
    }

    #[tokio::test]
    async fn punctuation_only_text_is_empty() {
        let tts = GoogleTranslateTts::new("http://127.0.0.1:9", 1, false, 100, true).unwrap();
        let err = tts.synthesize(" . , ;", "en").await.unwrap_err();
        assert!(matches!(err, Img2AudioError::EmptyText), "got: {err}");
    }
}

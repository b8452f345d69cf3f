//! Configuration types for image-to-audio conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The language default lives here; the
//! output-path default (`output.mp3`) lives in the CLI.

use crate::error::Img2AudioError;
use crate::language::LanguageCode;
use crate::pipeline::ocr::TextRecognizer;
use crate::pipeline::tts::SpeechSynthesizer;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default base URL of the speech endpoint, before the TLD is applied.
pub const DEFAULT_TTS_HOST: &str = "translate.google";

/// Configuration for an image-to-audio conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use img2audio::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .language("deu")
///     .slow(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.language.ocr_code(), "deu");
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// OCR language model. Default: `eng`.
    pub language: LanguageCode,

    /// Speech language sent to the synthesizer. If None, derived from the
    /// first two characters of `language`.
    pub tts_language: Option<String>,

    /// Path to the tesseract executable. If None, `TESSERACT_CMD` then `PATH`.
    pub tesseract_cmd: Option<PathBuf>,

    /// Tesseract page segmentation mode (`--psm`, 0–13). If None, tesseract's
    /// own default (3, fully automatic) applies.
    pub page_seg_mode: Option<u8>,

    /// Explicit base URL of the speech endpoint, e.g. `http://127.0.0.1:8080`.
    /// If None, `https://translate.google.<tts_tld>` is used.
    pub tts_base_url: Option<String>,

    /// Top-level domain of the speech host. Default: `com`.
    ///
    /// Some TLDs select a regional accent (`co.uk`, `com.au`, `ca`).
    pub tts_tld: String,

    /// Ask for slower speech. Default: false.
    pub slow: bool,

    /// Maximum characters per speech request. Default: 100 (the endpoint limit).
    pub max_chunk_chars: usize,

    /// Timeout for each speech request in seconds. Default: 60.
    pub request_timeout_secs: u64,

    /// Reject speech languages the endpoint is known not to support before
    /// making any request. Default: true.
    pub lang_check: bool,

    /// Unix permission bits applied to the written audio file. Default: 0o644.
    pub output_mode: u32,

    /// Pre-constructed OCR engine. Takes precedence over `tesseract_cmd`.
    pub recognizer: Option<Arc<dyn TextRecognizer>>,

    /// Pre-constructed speech engine. Takes precedence over the TTS fields.
    pub synthesizer: Option<Arc<dyn SpeechSynthesizer>>,

    /// Optional stage-progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            language: LanguageCode::default(),
            tts_language: None,
            tesseract_cmd: None,
            page_seg_mode: None,
            tts_base_url: None,
            tts_tld: "com".to_string(),
            slow: false,
            max_chunk_chars: 100,
            request_timeout_secs: 60,
            lang_check: true,
            output_mode: 0o644,
            recognizer: None,
            synthesizer: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("language", &self.language)
            .field("tts_language", &self.tts_language)
            .field("tesseract_cmd", &self.tesseract_cmd)
            .field("page_seg_mode", &self.page_seg_mode)
            .field("tts_base_url", &self.tts_base_url)
            .field("tts_tld", &self.tts_tld)
            .field("slow", &self.slow)
            .field("max_chunk_chars", &self.max_chunk_chars)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("lang_check", &self.lang_check)
            .field("output_mode", &format_args!("{:o}", self.output_mode))
            .field("recognizer", &self.recognizer.as_ref().map(|r| r.name().to_string()))
            .field("synthesizer", &self.synthesizer.as_ref().map(|s| s.name().to_string()))
            .field("progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
            language: None,
        }
    }

    /// Base URL of the speech endpoint after applying `tts_tld`.
    pub fn resolved_tts_base_url(&self) -> String {
        match &self.tts_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.{}", DEFAULT_TTS_HOST, self.tts_tld),
        }
    }
}

/// Builder for [`ConversionConfig`].
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
    /// Raw language string, validated in `build()` so setters stay infallible.
    language: Option<String>,
}

impl fmt::Debug for ConversionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfigBuilder")
            .field("config", &self.config)
            .field("language", &self.language)
            .finish()
    }
}

impl ConversionConfigBuilder {
    pub fn language(mut self, code: impl Into<String>) -> Self {
        self.language = Some(code.into());
        self
    }

    pub fn tts_language(mut self, code: impl Into<String>) -> Self {
        self.config.tts_language = Some(code.into());
        self
    }

    pub fn tesseract_cmd(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_cmd = Some(path.into());
        self
    }

    pub fn page_seg_mode(mut self, psm: u8) -> Self {
        self.config.page_seg_mode = Some(psm);
        self
    }

    pub fn tts_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.tts_base_url = Some(url.into());
        self
    }

    pub fn tts_tld(mut self, tld: impl Into<String>) -> Self {
        self.config.tts_tld = tld.into();
        self
    }

    pub fn slow(mut self, v: bool) -> Self {
        self.config.slow = v;
        self
    }

    pub fn max_chunk_chars(mut self, n: usize) -> Self {
        self.config.max_chunk_chars = n.clamp(10, 200);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn lang_check(mut self, v: bool) -> Self {
        self.config.lang_check = v;
        self
    }

    pub fn output_mode(mut self, mode: u32) -> Self {
        self.config.output_mode = mode;
        self
    }

    pub fn recognizer(mut self, recognizer: Arc<dyn TextRecognizer>) -> Self {
        self.config.recognizer = Some(recognizer);
        self
    }

    pub fn synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.config.synthesizer = Some(synthesizer);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<ConversionConfig, Img2AudioError> {
        if let Some(code) = self.language.take() {
            self.config.language = LanguageCode::new(code)?;
        }

        let c = &self.config;
        if let Some(psm) = c.page_seg_mode {
            if psm > 13 {
                return Err(Img2AudioError::InvalidConfig(format!(
                    "page segmentation mode must be 0–13, got {psm}"
                )));
            }
        }
        if c.tts_tld.trim().is_empty()
            || !c
                .tts_tld
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '.' || ch == '-')
        {
            return Err(Img2AudioError::InvalidConfig(format!(
                "invalid TLD '{}'",
                c.tts_tld
            )));
        }
        if let Some(ref url) = c.tts_base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Img2AudioError::InvalidConfig(format!(
                    "speech base URL must start with http:// or https://, got '{url}'"
                )));
            }
        }
        if c.request_timeout_secs == 0 {
            return Err(Img2AudioError::InvalidConfig(
                "request timeout must be ≥ 1 second".into(),
            ));
        }
        if c.output_mode > 0o777 {
            return Err(Img2AudioError::InvalidConfig(format!(
                "output mode {:o} has bits outside 0o777",
                c.output_mode
            )));
        }
        Ok(self.config)
    }
}

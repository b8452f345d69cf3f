//! The conversion pipeline and its entry points.
//!
//! [`ImageToAudioConverter`] checks once, at construction, that the OCR
//! engine is installed; a converter that exists can therefore always reach
//! its engine. Each call to [`ImageToAudioConverter::convert`] then runs the
//! stages strictly in order and stops at the first error, which is returned
//! unchanged to the caller. Nothing is retried, and an output file that was
//! already replaced is not rolled back.

use crate::config::ConversionConfig;
use crate::error::Img2AudioError;
use crate::language::LanguageCode;
use crate::output::{ConversionOutput, ConversionStats, ExtractedText};
use crate::pipeline::ocr::{TesseractEngine, TextRecognizer};
use crate::pipeline::tts::{GoogleTranslateTts, SpeechSynthesizer};
use crate::pipeline::{decode, input, persist};
use crate::progress::Stage;
use image::DynamicImage;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Reads the text in an image and speaks it into an audio file.
///
/// # Example
/// ```rust,no_run
/// use img2audio::{ConversionConfig, ImageToAudioConverter, LanguageCode};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let converter = ImageToAudioConverter::new(ConversionConfig::default()).await?;
/// let lang = LanguageCode::new("eng")?;
/// let out = converter.convert("scan.png", "scan.mp3", &lang).await?;
/// println!("{}", out.text);
/// # Ok(())
/// # }
/// ```
pub struct ImageToAudioConverter {
    config: ConversionConfig,
    recognizer: Arc<dyn TextRecognizer>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    engine_version: String,
}

impl ImageToAudioConverter {
    /// Build a converter, verifying the OCR engine is available.
    ///
    /// # Errors
    /// [`Img2AudioError::EngineUnavailable`] when the engine is missing; no
    /// converter is created and no conversion can run.
    pub async fn new(config: ConversionConfig) -> Result<Self, Img2AudioError> {
        let recognizer = resolve_recognizer(&config);
        let engine_version = recognizer.check_available().await?;
        debug!("OCR engine '{}' ready: {}", recognizer.name(), engine_version);

        let synthesizer = resolve_synthesizer(&config)?;

        Ok(Self {
            config,
            recognizer,
            synthesizer,
            engine_version,
        })
    }

    /// Version string reported by the OCR engine at construction.
    pub fn engine_version(&self) -> &str {
        &self.engine_version
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Convert the image at `image_path` into speech written to `output_path`.
    ///
    /// `output_path` is created or replaced and given `config.output_mode`
    /// permissions (0o644 by default).
    ///
    /// # Errors
    /// The first failing stage's error:
    /// - input: `FileNotFound`, `PermissionDenied`, `NotAFile`
    /// - decode: `ImageDecode`
    /// - OCR: `OcrFailed`, `LanguageNotInstalled`, `EmptyText`
    /// - speech: `UnsupportedTtsLanguage`, `SynthesisUnreachable`,
    ///   `SynthesisRejected`, `RateLimited`, `EmptyAudio`
    /// - output: `OutputWriteFailed`, `PermissionSetFailed`
    pub async fn convert(
        &self,
        image_path: impl AsRef<Path>,
        output_path: impl AsRef<Path>,
        language: &LanguageCode,
    ) -> Result<ConversionOutput, Img2AudioError> {
        let total_start = Instant::now();
        let image_path = image_path.as_ref();
        info!("Processing image: {}", image_path.display());

        let (path, _) = self
            .stage(Stage::Validate, async { input::validate_input(image_path) })
            .await?;
        let (image, decode_ms) = self.stage(Stage::Decode, decode::decode_file(&path)).await?;

        self.speak(image, decode_ms, output_path.as_ref(), language, total_start)
            .await
    }

    /// Like [`convert`](Self::convert) but for an image already in memory.
    pub async fn convert_from_bytes(
        &self,
        bytes: &[u8],
        output_path: impl AsRef<Path>,
        language: &LanguageCode,
    ) -> Result<ConversionOutput, Img2AudioError> {
        let total_start = Instant::now();
        info!("Processing in-memory image ({} bytes)", bytes.len());

        let (image, decode_ms) = self
            .stage(Stage::Decode, decode::decode_bytes(bytes.to_vec()))
            .await?;

        self.speak(image, decode_ms, output_path.as_ref(), language, total_start)
            .await
    }

    /// Run only the validation, decode and OCR stages.
    ///
    /// Does not contact the speech service and writes nothing.
    pub async fn extract_text(
        &self,
        image_path: impl AsRef<Path>,
        language: &LanguageCode,
    ) -> Result<ExtractedText, Img2AudioError> {
        let image_path = image_path.as_ref();
        let (path, _) = self
            .stage(Stage::Validate, async { input::validate_input(image_path) })
            .await?;
        let (image, _) = self.stage(Stage::Decode, decode::decode_file(&path)).await?;
        let (text, ocr_ms) = self.recognize(&image, language).await?;

        Ok(ExtractedText {
            text,
            language: language.to_string(),
            image_width: image.width(),
            image_height: image.height(),
            ocr_duration_ms: ocr_ms,
        })
    }

    /// Language models the OCR engine has installed.
    pub async fn languages(&self) -> Result<Vec<String>, Img2AudioError> {
        self.recognizer.languages().await
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    /// OCR, text check, speech and output for an already decoded image.
    async fn speak(
        &self,
        image: DynamicImage,
        decode_ms: u64,
        output_path: &Path,
        language: &LanguageCode,
        total_start: Instant,
    ) -> Result<ConversionOutput, Img2AudioError> {
        let (text, ocr_ms) = self.recognize(&image, language).await?;
        debug!("Extracted text:\n{}", text);

        let tts_language = language.resolve_tts_language(self.config.tts_language.as_deref());
        let (audio, tts_ms) = self
            .stage(
                Stage::Synthesize,
                self.synthesizer.synthesize(&text, &tts_language),
            )
            .await?;

        let (audio_bytes, _) = self
            .stage(
                Stage::Persist,
                persist::write_audio(output_path, audio, self.config.output_mode),
            )
            .await?;
        info!("Audio saved to: {}", output_path.display());

        let stats = ConversionStats {
            image_width: image.width(),
            image_height: image.height(),
            text_chars: text.trim().chars().count(),
            audio_bytes,
            decode_duration_ms: decode_ms,
            ocr_duration_ms: ocr_ms,
            tts_duration_ms: tts_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };

        Ok(ConversionOutput {
            text,
            audio_path: output_path.to_path_buf(),
            language: language.to_string(),
            tts_language,
            stats,
        })
    }

    /// OCR followed by the non-blank check.
    async fn recognize(
        &self,
        image: &DynamicImage,
        language: &LanguageCode,
    ) -> Result<(String, u64), Img2AudioError> {
        self.stage(Stage::Recognize, async {
            let text = self.recognizer.recognize(image, language).await?;
            if text.trim().is_empty() {
                return Err(Img2AudioError::EmptyText);
            }
            Ok(text)
        })
        .await
    }

    /// Run one stage, timing it and reporting it to the progress callback.
    async fn stage<T, F>(&self, stage: Stage, fut: F) -> Result<(T, u64), Img2AudioError>
    where
        F: Future<Output = Result<T, Img2AudioError>>,
    {
        let cb = self.config.progress_callback.as_ref();
        if let Some(cb) = cb {
            cb.on_stage_start(stage);
        }

        let start = Instant::now();
        match fut.await {
            Ok(value) => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                debug!("{} finished in {}ms", stage, elapsed_ms);
                if let Some(cb) = cb {
                    cb.on_stage_complete(stage, elapsed_ms);
                }
                Ok((value, elapsed_ms))
            }
            Err(e) => {
                if let Some(cb) = cb {
                    cb.on_stage_error(stage, &e.to_string());
                }
                Err(e)
            }
        }
    }
}

/// One-shot conversion using `config.language`.
///
/// Constructs a converter (including the engine check) for a single call.
pub async fn convert(
    image_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Img2AudioError> {
    let converter = ImageToAudioConverter::new(config.clone()).await?;
    converter
        .convert(image_path, output_path, &config.language)
        .await
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally, so it must not be called
/// from inside an async context.
pub fn convert_sync(
    image_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Img2AudioError> {
    let image_path: PathBuf = image_path.as_ref().to_path_buf();
    let output_path: PathBuf = output_path.as_ref().to_path_buf();
    tokio::runtime::Runtime::new()
        .map_err(|e| Img2AudioError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(image_path, output_path, config))
}

/// Pick the OCR engine: a pre-built one from the config, else Tesseract.
fn resolve_recognizer(config: &ConversionConfig) -> Arc<dyn TextRecognizer> {
    match config.recognizer {
        Some(ref r) => Arc::clone(r),
        None => Arc::new(TesseractEngine::new(
            config.tesseract_cmd.clone(),
            config.page_seg_mode,
        )),
    }
}

/// Pick the speech engine: a pre-built one from the config, else the
/// Google Translate endpoint built from the TTS settings.
fn resolve_synthesizer(config: &ConversionConfig) -> Result<Arc<dyn SpeechSynthesizer>, Img2AudioError> {
    if let Some(ref s) = config.synthesizer {
        return Ok(Arc::clone(s));
    }

    let tts = GoogleTranslateTts::new(
        config.resolved_tts_base_url(),
        config.request_timeout_secs,
        config.slow,
        config.max_chunk_chars,
        config.lang_check,
    )?
    .with_progress(config.progress_callback.clone());

    Ok(Arc::new(tts))
}

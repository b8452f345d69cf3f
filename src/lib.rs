//! # img2audio
//!
//! Read the text in an image with Tesseract OCR and speak it into an MP3
//! file through the Google Translate speech endpoint.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image
//!  │
//!  ├─ 1. Input    the path must name a readable regular file
//!  ├─ 2. Decode   PNG / JPEG / BMP / GIF / TIFF / WebP (spawn_blocking)
//!  ├─ 3. OCR      tesseract <png> stdout -l <lang>
//!  ├─ 4. Check    blank OCR result → EmptyText, nothing is sent
//!  ├─ 5. Speech   ≤100-char chunks → MP3 per chunk, concatenated
//!  └─ 6. Output   atomic write, chmod 0644
//! ```
//!
//! The OCR engine is checked once, when [`ImageToAudioConverter::new`] runs.
//! A missing engine fails construction, so a live converter never discovers
//! it halfway through a conversion.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use img2audio::{ConversionConfig, ImageToAudioConverter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder().language("eng").build()?;
//!     let converter = ImageToAudioConverter::new(config.clone()).await?;
//!     let output = converter
//!         .convert("receipt.jpg", "receipt.mp3", &config.language)
//!         .await?;
//!     println!("{}", output.text);
//!     eprintln!("{} bytes of audio", output.stats.audio_bytes);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `img2audio` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! img2audio = { version = "0.1", default-features = false }
//! ```
//!
//! ## Languages
//!
//! The OCR language is a Tesseract code (`eng`, `fra`, `deu`, `eng+fra`).
//! The speech language is derived from its first two letters, with `eng`
//! mapped to `en`. Where that prefix is wrong for a language (`spa`, `jpn`,
//! `chi_sim`) a warning names the right code; set
//! [`ConversionConfig::tts_language`] to override.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod language;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder};
pub use convert::{convert, convert_sync, ImageToAudioConverter};
pub use error::{ErrorKind, Img2AudioError};
pub use language::LanguageCode;
pub use output::{ConversionOutput, ConversionStats, ExtractedText};
pub use pipeline::ocr::{TesseractEngine, TextRecognizer};
pub use pipeline::tts::{GoogleTranslateTts, SpeechSynthesizer};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};

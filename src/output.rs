//! Result types returned by a successful conversion.

use serde::Serialize;
use std::path::PathBuf;

/// Everything a successful conversion produced.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutput {
    /// Text exactly as returned by the OCR engine.
    pub text: String,
    /// Where the audio was written.
    pub audio_path: PathBuf,
    /// OCR language used.
    pub language: String,
    /// Language sent to the speech service.
    pub tts_language: String,
    pub stats: ConversionStats,
}

/// Timing and size figures for one conversion.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionStats {
    pub image_width: u32,
    pub image_height: u32,
    /// Characters of OCR text (after trimming).
    pub text_chars: usize,
    pub audio_bytes: u64,
    pub decode_duration_ms: u64,
    pub ocr_duration_ms: u64,
    pub tts_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Result of OCR-only extraction ([`crate::ImageToAudioConverter::extract_text`]).
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedText {
    pub text: String,
    pub language: String,
    pub image_width: u32,
    pub image_height: u32,
    pub ocr_duration_ms: u64,
}

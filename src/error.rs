//! Error type for the img2audio library.
//!
//! Every stage of the pipeline returns `Result<_, Img2AudioError>` and the
//! top-level [`crate::ImageToAudioConverter::convert`] propagates the first
//! failure unchanged. Nothing is swallowed into a boolean: callers match on
//! the variant, or on its coarse [`ErrorKind`], to decide what to tell the
//! user.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the img2audio library.
#[derive(Debug, Error)]
pub enum Img2AudioError {
    // ── Environment errors ────────────────────────────────────────────────
    /// The OCR engine is not installed or could not be started.
    #[error(
        "OCR engine '{engine}' is not available: {detail}\n\n\
Install Tesseract and try again:\n\
  • Debian/Ubuntu: sudo apt-get install tesseract-ocr\n\
  • macOS:         brew install tesseract\n\
  • Or point TESSERACT_CMD (or --tesseract) at an existing executable.\n"
    )]
    EngineUnavailable { engine: String, detail: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input image was not found at the given path.
    #[error("Image not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The path exists but is a directory or other non-regular file.
    #[error("'{path}' is not a regular file")]
    NotAFile { path: PathBuf },

    /// The image decoder could not read the file.
    #[error("Failed to decode image '{source_name}': {detail}")]
    ImageDecode { source_name: String, detail: String },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The OCR engine ran but reported a failure.
    #[error("OCR failed: {detail}")]
    OcrFailed { detail: String },

    /// The requested OCR language model is not installed.
    #[error(
        "Tesseract language '{language}' is not installed.\n\
Installed: {installed}\n\
Try: sudo apt-get install tesseract-ocr-{language}"
    )]
    LanguageNotInstalled { language: String, installed: String },

    /// OCR produced nothing but whitespace.
    #[error("No text was extracted from the image")]
    EmptyText,

    /// The language code is malformed.
    #[error("Invalid language code '{code}': {reason}")]
    InvalidLanguage { code: String, reason: String },

    // ── Synthesis errors ──────────────────────────────────────────────────
    /// The speech service does not support the requested language.
    #[error("Speech synthesis does not support language '{language}'.{hint}")]
    UnsupportedTtsLanguage { language: String, hint: String },

    /// The speech service could not be reached (DNS, connect, timeout).
    #[error("Speech service at '{host}' is unreachable: {reason}\nCheck your internet connection.")]
    SynthesisUnreachable { host: String, reason: String },

    /// The speech service answered with a non-success status.
    #[error("Speech service rejected chunk {chunk}/{total} with HTTP {status}{hint}")]
    SynthesisRejected {
        status: u16,
        chunk: usize,
        total: usize,
        hint: String,
    },

    /// The speech service answered HTTP 429.
    #[error("Speech service rate limit exceeded (HTTP 429). Wait a while before trying again.")]
    RateLimited,

    /// The speech service returned an empty body.
    #[error("Speech service returned no audio for chunk {chunk}/{total}")]
    EmptyAudio { chunk: usize, total: usize },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output audio file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The audio was written but its permissions could not be set.
    #[error("Failed to set permissions {mode:o} on '{path}': {source}")]
    PermissionSetFailed {
        path: PathBuf,
        mode: u32,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of an [`Img2AudioError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// OCR engine missing; raised while constructing the converter.
    Environment,
    /// The input image is missing or unreadable.
    Input,
    /// OCR produced no usable text.
    Extraction,
    /// Anything that went wrong talking to the speech service.
    Synthesis,
    /// Decode, disk and permission failures, invalid configuration.
    Unclassified,
}

impl Img2AudioError {
    /// Map the error onto its [`ErrorKind`].
    pub fn kind(&self) -> ErrorKind {
        use Img2AudioError::*;
        match self {
            EngineUnavailable { .. } => ErrorKind::Environment,
            FileNotFound { .. } | PermissionDenied { .. } | NotAFile { .. } => ErrorKind::Input,
            OcrFailed { .. } | LanguageNotInstalled { .. } | EmptyText => ErrorKind::Extraction,
            UnsupportedTtsLanguage { .. }
            | SynthesisUnreachable { .. }
            | SynthesisRejected { .. }
            | RateLimited
            | EmptyAudio { .. } => ErrorKind::Synthesis,
            ImageDecode { .. }
            | InvalidLanguage { .. }
            | OutputWriteFailed { .. }
            | PermissionSetFailed { .. }
            | InvalidConfig(_)
            | Internal(_) => ErrorKind::Unclassified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_not_found_display() {
        let e = Img2AudioError::FileNotFound {
            path: PathBuf::from("/tmp/missing.png"),
        };
        assert!(e.to_string().contains("/tmp/missing.png"));
        assert_eq!(e.kind(), ErrorKind::Input);
    }

    #[test]
    fn empty_text_is_extraction() {
        assert_eq!(Img2AudioError::EmptyText.kind(), ErrorKind::Extraction);
        assert_eq!(
            Img2AudioError::EmptyText.to_string(),
            "No text was extracted from the image"
        );
    }

    #[test]
    fn engine_unavailable_has_install_hint() {
        let e = Img2AudioError::EngineUnavailable {
            engine: "tesseract".into(),
            detail: "not on PATH".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("apt-get install tesseract-ocr"), "got: {msg}");
        assert_eq!(e.kind(), ErrorKind::Environment);
    }

    #[test]
    fn rejected_display() {
        let e = Img2AudioError::SynthesisRejected {
            status: 503,
            chunk: 2,
            total: 4,
            hint: String::new(),
        };
        assert!(e.to_string().contains("2/4"));
        assert!(e.to_string().contains("503"));
        assert_eq!(e.kind(), ErrorKind::Synthesis);
    }

    #[test]
    fn permission_set_display_is_octal() {
        let e = Img2AudioError::PermissionSetFailed {
            path: PathBuf::from("out.mp3"),
            mode: 0o644,
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(e.to_string().contains("644"));
        assert_eq!(e.kind(), ErrorKind::Unclassified);
    }
}

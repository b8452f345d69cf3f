//! Pipeline stages for image-to-audio conversion.
//!
//! Each submodule implements exactly one transformation step, run strictly
//! in sequence by [`crate::convert::ImageToAudioConverter`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ decode ──▶ ocr ──▶ (validate) ──▶ chunk ──▶ tts ──▶ persist
//! (path)   (image)   (text)   (non-blank)   (≤100ch)  (MP3)   (file, 0644)
//! ```
//!
//! 1. [`input`]   — the image path must name a readable regular file
//! 2. [`decode`]  — decode into a `DynamicImage` in `spawn_blocking`
//! 3. [`ocr`]     — run Tesseract on a temporary PNG of the decoded image
//! 4. [`chunk`]   — undo OCR line wrapping and cut text into request-sized pieces
//! 5. [`tts`]     — fetch MP3 audio for every chunk; the only network stage
//! 6. [`persist`] — atomic write of the audio file, then chmod

pub mod chunk;
pub mod decode;
pub mod input;
pub mod ocr;
pub mod persist;
pub mod tts;

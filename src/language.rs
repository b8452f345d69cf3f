//! Language codes shared by the OCR and speech stages.
//!
//! Tesseract names its models with ISO 639-2 style codes (`eng`, `deu`,
//! `chi_sim`, `eng+fra`), while the speech endpoint expects ISO 639-1 style
//! codes (`en`, `de`, `zh-CN`). The converter derives the speech code by
//! taking the first two characters of the OCR code. That works for most
//! languages (`eng` → `en`, `fra` → `fr`) and silently picks the wrong voice
//! for others (`spa` → `sp`, `est` → `es`). [`LanguageCode::known_tts_code`]
//! knows the correct code for those cases so the mismatch can be reported,
//! and callers can always pass an explicit speech language instead.

use crate::error::Img2AudioError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Default OCR language.
pub const DEFAULT_LANGUAGE: &str = "eng";

/// Tesseract codes whose first two characters are not the speech code.
///
/// `(tesseract code, speech code)`
const DIVERGENT_CODES: &[(&str, &str)] = &[
    ("ben", "bn"),
    ("bos", "bs"),
    ("bul", "bg"),
    ("ces", "cs"),
    ("chi_sim", "zh-CN"),
    ("chi_tra", "zh-TW"),
    ("est", "et"),
    ("frk", "de"),
    ("heb", "iw"),
    ("ind", "id"),
    ("jav", "jw"),
    ("jpn", "ja"),
    ("kan", "kn"),
    ("khm", "km"),
    ("lav", "lv"),
    ("lit", "lt"),
    ("mal", "ml"),
    ("mar", "mr"),
    ("pol", "pl"),
    ("por", "pt"),
    ("slk", "sk"),
    ("spa", "es"),
    ("swe", "sv"),
    ("tgl", "tl"),
    ("tur", "tr"),
];

/// A validated OCR language code such as `eng`, `chi_sim` or `eng+fra`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageCode(String);

impl LanguageCode {
    /// Parse and validate a language code.
    ///
    /// Accepted characters are ASCII letters, digits, `_` and `+`; the first
    /// two characters must be letters so a speech prefix can be derived.
    /// Tesseract model names are lower case, so the code is lowercased.
    pub fn new(code: impl Into<String>) -> Result<Self, Img2AudioError> {
        let code = code.into().trim().to_ascii_lowercase();
        let invalid = |reason: &str| Img2AudioError::InvalidLanguage {
            code: code.clone(),
            reason: reason.to_string(),
        };

        if code.is_empty() {
            return Err(invalid("empty"));
        }
        if code.len() > 64 {
            return Err(invalid("longer than 64 characters"));
        }
        if !code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '+')
        {
            return Err(invalid("only letters, digits, '_' and '+' are allowed"));
        }
        if !code.chars().take(2).all(|c| c.is_ascii_alphabetic()) || code.len() < 2 {
            return Err(invalid("must start with two letters"));
        }

        Ok(Self(code))
    }

    /// The code exactly as passed to Tesseract's `-l` flag.
    pub fn ocr_code(&self) -> &str {
        &self.0
    }

    /// First two characters, lowercased: `eng` → `en`.
    pub fn tts_prefix(&self) -> String {
        self.0.chars().take(2).collect::<String>().to_ascii_lowercase()
    }

    /// The correct speech code when the two-character prefix is known to be
    /// wrong for this language, e.g. `spa` → `Some("es")`.
    ///
    /// For combined codes (`spa+eng`) only the first model is considered.
    pub fn known_tts_code(&self) -> Option<&'static str> {
        let primary = self.0.split('+').next().unwrap_or(&self.0);
        DIVERGENT_CODES
            .iter()
            .find(|(ocr, _)| ocr.eq_ignore_ascii_case(primary))
            .map(|(_, tts)| *tts)
    }

    /// Decide which language to send to the speech service.
    ///
    /// An explicit `override_code` always wins. Otherwise the two-character
    /// prefix is used as-is; if it is known to select the wrong voice a
    /// warning names the correct code, but the prefix is still returned.
    pub fn resolve_tts_language(&self, override_code: Option<&str>) -> String {
        if let Some(code) = override_code.map(str::trim).filter(|c| !c.is_empty()) {
            return code.to_string();
        }

        let prefix = self.tts_prefix();
        if let Some(correct) = self.known_tts_code() {
            warn!(
                "OCR language '{}' maps to speech language '{}' by prefix, \
                 but the matching speech language is '{}'; pass --tts-lang {} to use it",
                self.0, prefix, correct, correct
            );
        }
        prefix
    }
}

impl Default for LanguageCode {
    fn default() -> Self {
        Self(DEFAULT_LANGUAGE.to_string())
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LanguageCode {
    type Err = Img2AudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LanguageCode {
    type Error = Img2AudioError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<LanguageCode> for String {
    fn from(code: LanguageCode) -> Self {
        code.0
    }
}

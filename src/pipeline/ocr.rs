//! Text extraction: run the OCR engine on a decoded image.
//!
//! The [`TextRecognizer`] trait is the seam between the pipeline and the
//! engine. [`TesseractEngine`] drives the `tesseract` command line program:
//! the decoded image is written to a temporary PNG, tesseract prints the
//! recognised text on stdout, and the temp file is deleted when it goes out
//! of scope.
//!
//! ```text
//! tesseract /tmp/.tmpXXXX.png stdout -l eng [--psm N]
//! ```

use crate::error::Img2AudioError;
use crate::language::LanguageCode;
use crate::pipeline::decode::encode_png;
use async_trait::async_trait;
use image::DynamicImage;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, info};

/// An engine that turns an image into text.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Short engine name for logs and errors.
    fn name(&self) -> &str;

    /// Confirm the engine is installed and usable, returning a version string.
    ///
    /// Called once while the converter is constructed.
    async fn check_available(&self) -> Result<String, Img2AudioError>;

    /// Extract the text of `image` using the `language` model.
    async fn recognize(
        &self,
        image: &DynamicImage,
        language: &LanguageCode,
    ) -> Result<String, Img2AudioError>;

    /// Installed language models, if the engine can list them.
    async fn languages(&self) -> Result<Vec<String>, Img2AudioError> {
        Ok(Vec::new())
    }
}

/// Tesseract, driven through its command line interface.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    explicit_cmd: Option<PathBuf>,
    page_seg_mode: Option<u8>,
}

impl TesseractEngine {
    /// `explicit_cmd` overrides the `TESSERACT_CMD` / `PATH` lookup.
    pub fn new(explicit_cmd: Option<PathBuf>, page_seg_mode: Option<u8>) -> Self {
        Self {
            explicit_cmd,
            page_seg_mode,
        }
    }

    async fn executable(&self) -> Result<PathBuf, Img2AudioError> {
        let explicit = self.explicit_cmd.clone();
        tokio::task::spawn_blocking(move || tesseract_probe::locate_tesseract(explicit.as_deref()))
            .await
            .map_err(|e| Img2AudioError::Internal(format!("Probe task panicked: {}", e)))?
            .map_err(|e| Img2AudioError::EngineUnavailable {
                engine: "tesseract".into(),
                detail: e.to_string(),
            })
    }

    /// Build the argument list for one recognition run.
    fn args(&self, image_path: &Path, language: &LanguageCode) -> Vec<String> {
        let mut args = vec![
            image_path.display().to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            language.ocr_code().to_string(),
        ];
        if let Some(psm) = self.page_seg_mode {
            args.push("--psm".to_string());
            args.push(psm.to_string());
        }
        args
    }

    async fn ensure_language_installed(
        &self,
        exe: &Path,
        language: &LanguageCode,
    ) -> Result<(), Img2AudioError> {
        let installed = list_languages(exe).await?;
        // An empty listing means we could not tell; let tesseract decide.
        if installed.is_empty() {
            return Ok(());
        }
        match language
            .ocr_code()
            .split('+')
            .find(|code| !installed.iter().any(|l| l == code))
        {
            Some(missing) => Err(Img2AudioError::LanguageNotInstalled {
                language: missing.to_string(),
                installed: installed.join(", "),
            }),
            None => Ok(()),
        }
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[async_trait]
impl TextRecognizer for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn check_available(&self) -> Result<String, Img2AudioError> {
        let explicit = self.explicit_cmd.clone();
        let install =
            tokio::task::spawn_blocking(move || tesseract_probe::probe(explicit.as_deref()))
                .await
                .map_err(|e| Img2AudioError::Internal(format!("Probe task panicked: {}", e)))?
                .map_err(|e| Img2AudioError::EngineUnavailable {
                    engine: "tesseract".into(),
                    detail: e.to_string(),
                })?;

        info!(
            "Tesseract is properly installed: {} ({})",
            install.version,
            install.path.display()
        );
        Ok(install.version.to_string())
    }

    async fn recognize(
        &self,
        image: &DynamicImage,
        language: &LanguageCode,
    ) -> Result<String, Img2AudioError> {
        let exe = self.executable().await?;
        self.ensure_language_installed(&exe, language).await?;

        let image = image.clone();
        let tmp = tokio::task::spawn_blocking(move || write_temp_png(&image))
            .await
            .map_err(|e| Img2AudioError::Internal(format!("PNG task panicked: {}", e)))??;

        let args = self.args(tmp.path(), language);
        debug!("Running {} {}", exe.display(), args.join(" "));

        let output = Command::new(&exe)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Img2AudioError::EngineUnavailable {
                engine: "tesseract".into(),
                detail: format!("failed to run '{}': {e}", exe.display()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Img2AudioError::OcrFailed {
                detail: format!("tesseract exited with {}: {}", output.status, stderr.trim()),
            });
        }

        // `tmp` is dropped (and the file deleted) after tesseract has read it
        drop(tmp);

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("Tesseract returned {} chars", text.chars().count());
        Ok(text)
    }

    async fn languages(&self) -> Result<Vec<String>, Img2AudioError> {
        let exe = self.executable().await?;
        list_languages(&exe).await
    }
}

/// Encode `image` as PNG into a temp file that lives as long as the handle.
fn write_temp_png(image: &DynamicImage) -> Result<NamedTempFile, Img2AudioError> {
    let png = encode_png(image)
        .map_err(|e| Img2AudioError::Internal(format!("PNG encoding for OCR failed: {e}")))?;
    let mut tmp = tempfile::Builder::new()
        .prefix("img2audio-")
        .suffix(".png")
        .tempfile()
        .map_err(|e| Img2AudioError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(&png)
        .and_then(|_| tmp.flush())
        .map_err(|e| Img2AudioError::Internal(format!("tempfile write: {e}")))?;
    Ok(tmp)
}

async fn list_languages(exe: &Path) -> Result<Vec<String>, Img2AudioError> {
    let exe = exe.to_path_buf();
    tokio::task::spawn_blocking(move || tesseract_probe::installed_languages(&exe))
        .await
        .map_err(|e| Img2AudioError::Internal(format!("Probe task panicked: {}", e)))?
        .map_err(|e| Img2AudioError::OcrFailed {
            detail: format!("could not list installed languages: {e}"),
        })
}

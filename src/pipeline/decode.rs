//! Image decoding: file or byte buffer → `DynamicImage`.
//!
//! Decoding is CPU-bound, so it runs inside `spawn_blocking` to keep the
//! Tokio worker threads free. Decoding up front (instead of handing the raw
//! file straight to Tesseract) turns "this is not an image" into a clear
//! decode error, and lets the OCR stage always feed Tesseract a PNG.

use crate::error::Img2AudioError;
use image::{DynamicImage, ImageFormat};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Decode the image at `path`.
pub async fn decode_file(path: &Path) -> Result<DynamicImage, Img2AudioError> {
    let path: PathBuf = path.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<DynamicImage, Img2AudioError> {
        let img = image::ImageReader::open(&path)
            .and_then(|r| r.with_guessed_format())
            .map_err(|e| Img2AudioError::ImageDecode {
                source_name: path.display().to_string(),
                detail: e.to_string(),
            })?
            .decode()
            .map_err(|e| Img2AudioError::ImageDecode {
                source_name: path.display().to_string(),
                detail: e.to_string(),
            })?;
        log_decoded(&path.display().to_string(), &img);
        Ok(img)
    })
    .await
    .map_err(|e| Img2AudioError::Internal(format!("Decode task panicked: {}", e)))?
}

/// Decode an in-memory image. The format is guessed from the leading bytes.
pub async fn decode_bytes(bytes: Vec<u8>) -> Result<DynamicImage, Img2AudioError> {
    tokio::task::spawn_blocking(move || -> Result<DynamicImage, Img2AudioError> {
        let img = image::load_from_memory(&bytes).map_err(|e| Img2AudioError::ImageDecode {
            source_name: "<memory>".to_string(),
            detail: e.to_string(),
        })?;
        log_decoded("<memory>", &img);
        Ok(img)
    })
    .await
    .map_err(|e| Img2AudioError::Internal(format!("Decode task panicked: {}", e)))?
}

/// Encode `img` as PNG bytes (the format handed to the OCR engine).
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut buf), ImageFormat::Png)?;
    debug!("Encoded image → {} bytes PNG", buf.len());
    Ok(buf)
}

fn log_decoded(name: &str, img: &DynamicImage) {
    debug!(
        "Decoded {} → {}x{} px ({:?})",
        name,
        img.width(),
        img.height(),
        img.color()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn red_square() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])))
    }

    #[test]
    fn encode_small_image() {
        let png = encode_png(&red_square()).expect("encode should succeed");
        assert_eq!(&png[1..4], b"PNG");
    }

    #[tokio::test]
    async fn decode_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        std::fs::write(&path, encode_png(&red_square()).unwrap()).unwrap();

        let img = decode_file(&path).await.expect("decode");
        assert_eq!((img.width(), img.height()), (10, 10));
    }

    #[tokio::test]
    async fn garbage_bytes_fail_to_decode() {
        let err = decode_bytes(b"definitely not an image".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, Img2AudioError::ImageDecode { .. }), "got: {err}");
    }

    #[tokio::test]
    async fn non_image_file_fails_to_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.png");
        std::fs::write(&path, "plain text pretending to be a png").unwrap();

        let err = decode_file(&path).await.unwrap_err();
        assert!(matches!(err, Img2AudioError::ImageDecode { .. }), "got: {err}");
    }
}

//! Input validation: make sure the image path names a readable file.
//!
//! This is the only check made before decoding. Format, size and colour
//! depth are left to the decoder and the OCR engine. A missing file stops
//! the pipeline here, before any OCR or speech work is attempted.

use crate::error::Img2AudioError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate that `path` exists, is a regular file, and can be opened.
pub fn validate_input(path: &Path) -> Result<PathBuf, Img2AudioError> {
    let path = path.to_path_buf();

    let meta = match std::fs::metadata(&path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Img2AudioError::PermissionDenied { path });
        }
        Err(_) => return Err(Img2AudioError::FileNotFound { path }),
    };

    if !meta.is_file() {
        return Err(Img2AudioError::NotAFile { path });
    }

    // Check read permission by attempting to open
    match std::fs::File::open(&path) {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Img2AudioError::PermissionDenied { path });
        }
        Err(_) => return Err(Img2AudioError::FileNotFound { path }),
    }

    debug!("Resolved input image: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_not_found() {
        let err = validate_input(Path::new("/definitely/not/a/real/image.png")).unwrap_err();
        assert!(matches!(err, Img2AudioError::FileNotFound { .. }), "got: {err}");
    }

    #[test]
    fn directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_input(dir.path()).unwrap_err();
        assert!(matches!(err, Img2AudioError::NotAFile { .. }), "got: {err}");
    }

    #[test]
    fn existing_file_is_accepted() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let resolved = validate_input(file.path()).expect("readable file");
        assert_eq!(resolved, file.path());
    }
}

//! Output: write the audio file and make it world-readable.
//!
//! The bytes go to a temp file in the destination directory which is then
//! renamed over `output_path`, so an existing file is replaced in one step
//! and a reader never sees half an MP3. The permission bits are applied to
//! the final path after the rename.

use crate::error::Img2AudioError;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Write `audio` to `output_path` (replacing any existing file), then apply `mode`.
pub async fn write_audio(output_path: &Path, audio: Vec<u8>, mode: u32) -> Result<u64, Img2AudioError> {
    let path = output_path.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<u64, Img2AudioError> {
        let len = write_atomic(&path, &audio)?;
        set_mode(&path, mode)?;
        debug!("Wrote {} bytes to {} (mode {:o})", len, path.display(), mode);
        Ok(len)
    })
    .await
    .map_err(|e| Img2AudioError::Internal(format!("Write task panicked: {}", e)))?
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<u64, Img2AudioError> {
    let write_err = |e: std::io::Error| Img2AudioError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::env::current_dir().map_err(write_err)?,
    };
    std::fs::create_dir_all(&parent).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    Ok(bytes.len() as u64)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), Img2AudioError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).map_err(|e| {
        Img2AudioError::PermissionSetFailed {
            path: path.to_path_buf(),
            mode,
            source: e,
        }
    })
}

#[cfg(not(unix))]
fn set_mode(path: &Path, mode: u32) -> Result<(), Img2AudioError> {
    // Only the owner-write bit has a portable equivalent.
    let mut perms = std::fs::metadata(path)
        .map_err(|e| Img2AudioError::PermissionSetFailed {
            path: path.to_path_buf(),
            mode,
            source: e,
        })?
        .permissions();
    perms.set_readonly(mode & 0o200 == 0);
    std::fs::set_permissions(path, perms).map_err(|e| Img2AudioError::PermissionSetFailed {
        path: path.to_path_buf(),
        mode,
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_and_sets_mode() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out.mp3");

        let n = write_audio(&out, vec![1, 2, 3], 0o644).await.expect("write");
        assert_eq!(n, 3);
        assert_eq!(std::fs::read(&out).unwrap(), vec![1, 2, 3]);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&out).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o644);
        }
    }

    #[tokio::test]
    async fn overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.mp3");
        std::fs::write(&out, b"old contents that are longer").unwrap();

        write_audio(&out, b"new".to_vec(), 0o644).await.expect("write");
        assert_eq!(std::fs::read(&out).unwrap(), b"new");
    }

    #[tokio::test]
    async fn directory_target_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_audio(dir.path(), vec![1], 0o644).await.unwrap_err();
        assert!(
            matches!(err, Img2AudioError::OutputWriteFailed { .. }),
            "got: {err}"
        );
    }
}

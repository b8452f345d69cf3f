//! # tesseract-probe
//!
//! Find the [Tesseract](https://github.com/tesseract-ocr/tesseract) command
//! line executable and ask it what it can do, so that callers can fail fast
//! with a helpful message instead of discovering a missing engine halfway
//! through a conversion.
//!
//! ## How it works
//!
//! On the first call to [`locate_tesseract`]:
//!
//! 1. An explicit path passed by the caller wins.
//! 2. Otherwise `TESSERACT_CMD` is consulted.
//! 3. Otherwise every directory on `PATH` is searched for `tesseract`
//!    (`tesseract.exe` on Windows).
//!
//! The `PATH` lookup is cached for the lifetime of the process. Explicit and
//! environment paths are never cached so tests and callers can switch them.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tesseract_probe::{installed_languages, probe};
//!
//! let install = probe(None).expect("Tesseract is not installed");
//! println!("{} at {}", install.version, install.path.display());
//! let langs = installed_languages(&install.path).unwrap_or_default();
//! assert!(langs.iter().any(|l| l == "eng"));
//! ```
//!
//! ## Environment variable overrides
//!
//! - `TESSERACT_CMD` — path to the tesseract executable; skips the `PATH` search.

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// Executable name searched for on `PATH`.
#[cfg(not(windows))]
pub const TESSERACT_BINARY: &str = "tesseract";
#[cfg(windows)]
pub const TESSERACT_BINARY: &str = "tesseract.exe";

/// Environment variable holding an explicit executable path.
pub const TESSERACT_CMD_ENV: &str = "TESSERACT_CMD";

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by tesseract-probe operations.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// No executable was found at the explicit path, `TESSERACT_CMD`, or on `PATH`.
    #[error("Tesseract executable not found ({searched})")]
    NotFound { searched: String },

    /// The executable exists but could not be started.
    #[error("Failed to run '{path}': {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The executable ran but exited unsuccessfully.
    #[error("'{path}' exited with {status}: {stderr}")]
    CommandFailed {
        path: PathBuf,
        status: String,
        stderr: String,
    },

    /// `--version` output did not contain a recognisable version line.
    #[error("Could not parse Tesseract version from output: {output:?}")]
    UnparsableVersion { output: String },
}

// ── Version ──────────────────────────────────────────────────────────────────

/// A parsed `tesseract --version` banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TesseractVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: Option<u32>,
    /// The untouched version token, e.g. `5.3.0` or `v5.0.0-alpha.20201127`.
    pub raw: String,
}

impl fmt::Display for TesseractVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tesseract {}", self.raw)
    }
}

/// Parse the version banner printed by `tesseract --version`.
///
/// Tesseract 3.x prints it on stderr and 4.x+ on stdout, so callers pass
/// whichever stream was non-empty. Only the line starting with `tesseract `
/// is inspected; library lines (`leptonica-1.82.0`, …) are ignored.
pub fn parse_version(output: &str) -> Option<TesseractVersion> {
    let line = output
        .lines()
        .map(str::trim)
        .find(|l| l.to_ascii_lowercase().starts_with("tesseract "))?;

    let raw = line.split_whitespace().nth(1)?.to_string();
    let numeric = raw.trim_start_matches('v');
    let mut parts = numeric
        .split(|c: char| c == '.' || c == '-')
        .map(|p| p.parse::<u32>().ok());

    let major = parts.next()??;
    let minor = parts.next().flatten().unwrap_or(0);
    let patch = parts.next().flatten();

    Some(TesseractVersion {
        major,
        minor,
        patch,
        raw,
    })
}

// ── Location ─────────────────────────────────────────────────────────────────

static PATH_LOOKUP: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Search every directory in `path_var` (a `PATH`-style list) for `binary`.
pub fn find_in_path(binary: &str, path_var: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(path_var)
        .map(|dir| dir.join(binary))
        .find(|candidate| is_executable(candidate))
}

/// Resolve the tesseract executable.
///
/// Resolution order: `explicit` → `TESSERACT_CMD` → `PATH`.
pub fn locate_tesseract(explicit: Option<&Path>) -> Result<PathBuf, ProbeError> {
    if let Some(p) = explicit {
        return if is_executable(p) {
            Ok(p.to_path_buf())
        } else {
            Err(ProbeError::NotFound {
                searched: format!("explicit path '{}'", p.display()),
            })
        };
    }

    if let Ok(env_path) = std::env::var(TESSERACT_CMD_ENV) {
        if !env_path.is_empty() {
            let p = PathBuf::from(&env_path);
            return if is_executable(&p) {
                Ok(p)
            } else {
                Err(ProbeError::NotFound {
                    searched: format!("{TESSERACT_CMD_ENV}='{env_path}'"),
                })
            };
        }
    }

    PATH_LOOKUP
        .get_or_init(|| {
            std::env::var_os("PATH").and_then(|p| find_in_path(TESSERACT_BINARY, &p))
        })
        .clone()
        .ok_or_else(|| ProbeError::NotFound {
            searched: format!("'{TESSERACT_BINARY}' on PATH"),
        })
}

// ── Queries ──────────────────────────────────────────────────────────────────

/// A located and version-checked Tesseract installation.
#[derive(Debug, Clone)]
pub struct TesseractInstall {
    pub path: PathBuf,
    pub version: TesseractVersion,
}

/// Locate tesseract and confirm it runs by reading its version banner.
pub fn probe(explicit: Option<&Path>) -> Result<TesseractInstall, ProbeError> {
    let path = locate_tesseract(explicit)?;
    let version = tesseract_version(&path)?;
    Ok(TesseractInstall { path, version })
}

/// Run `tesseract --version` and parse the result.
pub fn tesseract_version(path: &Path) -> Result<TesseractVersion, ProbeError> {
    let (stdout, stderr) = run(path, &["--version"])?;
    parse_version(&stdout)
        .or_else(|| parse_version(&stderr))
        .ok_or_else(|| ProbeError::UnparsableVersion {
            output: if stdout.trim().is_empty() { stderr.clone() } else { stdout.clone() },
        })
}

/// Run `tesseract --list-langs` and return the installed language models.
pub fn installed_languages(path: &Path) -> Result<Vec<String>, ProbeError> {
    let (stdout, stderr) = run(path, &["--list-langs"])?;
    let listing = if stdout.trim().is_empty() { stderr } else { stdout };
    Ok(parse_language_list(&listing))
}

/// Parse `--list-langs` output: a header line followed by one code per line.
pub fn parse_language_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("List of available languages"))
        .map(str::to_string)
        .collect()
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn run(path: &Path, args: &[&str]) -> Result<(String, String), ProbeError> {
    let output = Command::new(path)
        .args(args)
        .output()
        .map_err(|e| ProbeError::Spawn {
            path: path.to_path_buf(),
            source: e,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        return Err(ProbeError::CommandFailed {
            path: path.to_path_buf(),
            status: output.status.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok((stdout, stderr))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modern_banner() {
        let out = "tesseract 5.3.0\n leptonica-1.82.0\n  libgif 5.2.1 : libjpeg 8d\n";
        let v = parse_version(out).expect("version");
        assert_eq!((v.major, v.minor, v.patch), (5, 3, Some(0)));
        assert_eq!(v.to_string(), "tesseract 5.3.0");
    }

    #[test]
    fn parses_prerelease_banner() {
        let v = parse_version("tesseract v5.0.0-alpha.20201127\n").expect("version");
        assert_eq!(v.major, 5);
        assert_eq!(v.minor, 0);
        assert_eq!(v.raw, "v5.0.0-alpha.20201127");
    }

    #[test]
    fn rejects_unrelated_output() {
        assert!(parse_version("leptonica-1.82.0\n").is_none());
        assert!(parse_version("").is_none());
    }

    #[test]
    fn language_list_skips_header() {
        let out = "List of available languages in \"/usr/share/tessdata/\" (3):\neng\nosd\nfra\n";
        assert_eq!(parse_language_list(out), vec!["eng", "osd", "fra"]);
    }

    #[test]
    fn explicit_missing_path_is_not_found() {
        let err = locate_tesseract(Some(Path::new("/definitely/not/tesseract"))).unwrap_err();
        assert!(matches!(err, ProbeError::NotFound { .. }), "got: {err}");
    }

    #[cfg(unix)]
    #[test]
    fn finds_executable_on_custom_path() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("tesseract");
        std::fs::write(&bin, "#!/bin/sh\necho 'tesseract 5.1.0'\n").unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();

        let path_var = std::env::join_paths([Path::new("/nonexistent"), dir.path()]).unwrap();
        assert_eq!(find_in_path("tesseract", &path_var), Some(bin.clone()));

        let install = probe(Some(&bin)).expect("probe fake tesseract");
        assert_eq!(install.version.major, 5);
        assert_eq!(install.version.minor, 1);
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tesseract"), "not a program").unwrap();
        assert_eq!(find_in_path("tesseract", dir.path().as_os_str()), None);
    }
}

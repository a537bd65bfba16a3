use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::{FxPipeError, FxPipeResult};

/// Where the support-data bytes come from.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportSource {
    /// Bytes shipped inside the application (e.g. via `include_bytes!`).
    Bytes(Vec<u8>),
    /// A file to copy verbatim.
    File(PathBuf),
}

/// A data file the interpreter needs at runtime, cached under the session's
/// cache directory on first use.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SupportBundle {
    /// Cache-relative destination path, e.g. `"gmic/update250.gmic"`.
    pub rel_path: String,
    /// The bundled payload.
    pub source: SupportSource,
}

/// Normalize and validate a cache-relative path.
///
/// The normalized result uses `/` separators, removes `.` segments, and
/// rejects absolute paths or parent traversals (`..`).
pub fn normalize_rel_path(source: &str) -> FxPipeResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(FxPipeError::validation("support paths must be relative"));
    }
    if s.is_empty() {
        return Err(FxPipeError::validation("support path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(FxPipeError::validation(
                "support paths must not contain '..'",
            ));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(FxPipeError::validation(
            "support path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

/// Make sure the bundle exists at its cache path, copying it on first use.
///
/// Idempotent: when the cached file is already present nothing is written,
/// not even a same-content overwrite. Returns the cache path.
pub fn ensure_support_file(cache_dir: &Path, bundle: &SupportBundle) -> FxPipeResult<PathBuf> {
    let rel = normalize_rel_path(&bundle.rel_path)?;
    let dest = cache_dir.join(&rel);

    if dest.exists() {
        tracing::debug!(path = %dest.display(), "support data already cached");
        return Ok(dest);
    }

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create support directory '{}'", parent.display()))?;
    }

    match &bundle.source {
        SupportSource::Bytes(bytes) => {
            std::fs::write(&dest, bytes)
                .with_context(|| format!("write support data '{}'", dest.display()))?;
        }
        SupportSource::File(src) => {
            std::fs::copy(src, &dest).with_context(|| {
                format!(
                    "copy support data '{}' to '{}'",
                    src.display(),
                    dest.display()
                )
            })?;
        }
    }

    tracing::debug!(path = %dest.display(), "support data copied to cache");
    Ok(dest)
}

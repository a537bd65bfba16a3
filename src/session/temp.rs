use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::foundation::error::{FxPipeError, FxPipeResult};

static UNIQUE_SEQ: AtomicU64 = AtomicU64::new(0);

/// How the per-run temp-file pair is named.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TempStrategy {
    /// Singleton names (`tmp_input.ppm` / `tmp_output.bmp`). Two overlapping
    /// runs would race on the same files; the session's in-flight guard is
    /// what makes this safe.
    Fixed,
    /// Per-invocation names derived from the process id and a counter.
    #[default]
    Unique,
}

/// Input/output temp paths scoped to a single pipeline run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TempPaths {
    /// Raw pixel file handed to the interpreter.
    pub input: PathBuf,
    /// Output file the interpreter is asked to write.
    pub output: PathBuf,
}

impl TempPaths {
    /// The reference singleton pair under `dir`.
    pub fn fixed(dir: &Path) -> Self {
        Self {
            input: dir.join("tmp_input.ppm"),
            output: dir.join("tmp_output.bmp"),
        }
    }

    /// A pair under `dir` that no other invocation of this process will use.
    pub fn unique(dir: &Path) -> Self {
        let seq = UNIQUE_SEQ.fetch_add(1, Ordering::Relaxed);
        let pid = std::process::id();
        Self {
            input: dir.join(format!("fx_input_{pid}_{seq}.ppm")),
            output: dir.join(format!("fx_output_{pid}_{seq}.bmp")),
        }
    }

    /// Pick a pair according to `strategy`.
    pub fn for_strategy(dir: &Path, strategy: TempStrategy) -> Self {
        match strategy {
            TempStrategy::Fixed => Self::fixed(dir),
            TempStrategy::Unique => Self::unique(dir),
        }
    }

    /// Delete both files. Missing files are fine; any other failure is an
    /// [`FxPipeError::Io`].
    pub fn cleanup(&self) -> FxPipeResult<()> {
        remove_if_present(&self.input)?;
        remove_if_present(&self.output)
    }
}

fn remove_if_present(path: &Path) -> FxPipeResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(FxPipeError::io(format!(
            "delete temp file '{}': {e}",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_names_match_reference() {
        let t = TempPaths::fixed(Path::new("/cache"));
        assert_eq!(t.input, Path::new("/cache/tmp_input.ppm"));
        assert_eq!(t.output, Path::new("/cache/tmp_output.bmp"));
    }

    #[test]
    fn unique_pairs_never_collide() {
        let a = TempPaths::unique(Path::new("/cache"));
        let b = TempPaths::unique(Path::new("/cache"));
        assert_ne!(a.input, b.input);
        assert_ne!(a.output, b.output);
    }

    #[test]
    fn cleanup_tolerates_missing_files() {
        let dir = std::env::temp_dir().join(format!(
            "fxpipe_temp_cleanup_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();

        let t = TempPaths::unique(&dir);
        t.cleanup().unwrap();

        std::fs::write(&t.input, b"stale").unwrap();
        t.cleanup().unwrap();
        assert!(!t.input.exists());

        std::fs::remove_dir_all(&dir).ok();
    }
}

//! Construction and execution of the external interpreter invocation.

use std::ffi::OsString;
use std::io::Read as _;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use crate::foundation::error::{FxPipeError, FxPipeResult};

/// Fixed chunk size used when draining the child's diagnostic stream.
pub const DIAG_READ_BUF_LEN: usize = 4096;

/// Default name of the single environment variable handed to the child,
/// pointing it at a writable scratch directory.
pub const DEFAULT_SCRATCH_ENV: &str = "FXPIPE_SCRATCH";

/// Opaque effect specification passed through to the interpreter.
///
/// The string is never parsed or validated here; it is split on whitespace
/// into argv tokens and appended untouched after the input path. Whether it
/// names a real effect with sane parameters is entirely the interpreter's
/// business.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct EffectSpec(String);

impl EffectSpec {
    /// Wrap a raw effect specification string.
    pub fn new(spec: impl Into<String>) -> Self {
        Self(spec.into())
    }

    /// The raw specification string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whitespace-split argv tokens, in order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.split_whitespace()
    }
}

/// Options for [`invoke`].
#[derive(Clone, Debug)]
pub struct InvokerOpts {
    /// Path to the external interpreter binary.
    pub binary: PathBuf,
    /// Writable scratch/cache directory exported to the child.
    pub scratch_dir: PathBuf,
    /// Name of the environment variable carrying `scratch_dir`.
    pub scratch_env: String,
}

impl InvokerOpts {
    /// Options for `binary` with `scratch_dir` exported under
    /// [`DEFAULT_SCRATCH_ENV`].
    pub fn new(binary: impl Into<PathBuf>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            scratch_dir: scratch_dir.into(),
            scratch_env: DEFAULT_SCRATCH_ENV.to_string(),
        }
    }

    /// Check the options before spawning anything.
    pub fn validate(&self) -> FxPipeResult<()> {
        if self.binary.as_os_str().is_empty() {
            return Err(FxPipeError::validation("interpreter binary path is empty"));
        }
        if self.scratch_env.is_empty() || self.scratch_env.contains('=') {
            return Err(FxPipeError::validation(
                "scratch environment variable name must be non-empty and contain no '='",
            ));
        }
        Ok(())
    }
}

/// Observable outcome of one interpreter run.
#[derive(Debug)]
pub struct Invocation {
    /// The child's exit status, reported but not interpreted here.
    pub status: ExitStatus,
    /// Everything the child wrote to its diagnostic (stderr) stream.
    pub diagnostics: String,
}

/// Argument sequence for one run: input path, the spec's tokens in order,
/// then the fixed `-output <outputFile>` pair. No reordering, no insertion.
pub fn build_args(input: &Path, spec: &EffectSpec, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::with_capacity(3 + spec.tokens().count());
    args.push(input.as_os_str().to_os_string());
    args.extend(spec.tokens().map(OsString::from));
    args.push(OsString::from("-output"));
    args.push(output.as_os_str().to_os_string());
    args
}

/// Run the interpreter over `input`, blocking until it exits.
///
/// The child gets exactly one extra environment variable
/// (`opts.scratch_env` = `opts.scratch_dir`), nothing on stdin, and its
/// stderr piped back to us. The diagnostic stream is drained on a dedicated
/// thread concurrently with `wait()`: draining only after exit deadlocks
/// both sides once the child fills the OS pipe buffer.
///
/// A non-zero exit is not an error at this layer; callers decide what the
/// status means. There is no timeout and no retry.
#[tracing::instrument(skip(opts, spec), fields(binary = %opts.binary.display()))]
pub fn invoke(
    opts: &InvokerOpts,
    input: &Path,
    spec: &EffectSpec,
    output: &Path,
) -> FxPipeResult<Invocation> {
    opts.validate()?;

    let mut cmd = Command::new(&opts.binary);
    cmd.args(build_args(input, spec, output))
        .env(&opts.scratch_env, &opts.scratch_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| {
        FxPipeError::launch(format!(
            "failed to spawn '{}': {e}",
            opts.binary.display()
        ))
    })?;

    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| FxPipeError::launch("failed to open interpreter stderr (unexpected)"))?;
    let drain = std::thread::spawn(move || -> std::io::Result<Vec<u8>> {
        let mut chunk = [0u8; DIAG_READ_BUF_LEN];
        let mut out = Vec::new();
        loop {
            let n = stderr.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            out.extend_from_slice(&chunk[..n]);
        }
        Ok(out)
    });

    let status = child.wait().map_err(|e| {
        FxPipeError::io(format!(
            "failed to wait for '{}': {e}",
            opts.binary.display()
        ))
    })?;
    let diag_bytes = drain
        .join()
        .map_err(|_| FxPipeError::io("diagnostic drain thread panicked"))?
        .map_err(|e| FxPipeError::io(format!("failed to read interpreter diagnostics: {e}")))?;

    Ok(Invocation {
        status,
        diagnostics: String::from_utf8_lossy(&diag_bytes).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_keep_spec_tokens_in_order() {
        let spec = EffectSpec::new("fx_bokeh 3,8,0");
        let args = build_args(
            Path::new("/cache/tmp_input.ppm"),
            &spec,
            Path::new("/cache/tmp_output.bmp"),
        );
        let args: Vec<&str> = args.iter().map(|a| a.to_str().unwrap()).collect();
        assert_eq!(
            args,
            vec![
                "/cache/tmp_input.ppm",
                "fx_bokeh",
                "3,8,0",
                "-output",
                "/cache/tmp_output.bmp",
            ]
        );
    }

    #[test]
    fn empty_spec_still_yields_output_pair() {
        let args = build_args(Path::new("/a.ppm"), &EffectSpec::new("  "), Path::new("/b.bmp"));
        let args: Vec<&str> = args.iter().map(|a| a.to_str().unwrap()).collect();
        assert_eq!(args, vec!["/a.ppm", "-output", "/b.bmp"]);
    }

    #[test]
    fn opts_validation_rejects_bad_values() {
        assert!(InvokerOpts::new("", "/cache").validate().is_err());

        let mut opts = InvokerOpts::new("/bin/fx", "/cache");
        opts.scratch_env = "A=B".to_string();
        assert!(opts.validate().is_err());

        assert!(InvokerOpts::new("/bin/fx", "/cache").validate().is_ok());
    }

    #[test]
    fn spawn_of_missing_binary_is_a_launch_error() {
        let opts = InvokerOpts::new("/nonexistent/fxpipe-test-binary", "/tmp");
        let err = invoke(
            &opts,
            Path::new("/tmp/in.ppm"),
            &EffectSpec::new("fx_noop"),
            Path::new("/tmp/out.bmp"),
        )
        .unwrap_err();
        assert!(matches!(err, FxPipeError::Launch(_)));
    }
}

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};

use anyhow::Context as _;

use crate::decode::decode_output;
use crate::encode::ppm::write_ppm;
use crate::foundation::core::PixelBuffer;
use crate::foundation::error::{FxPipeError, FxPipeResult};
use crate::invoke::{DEFAULT_SCRATCH_ENV, EffectSpec, InvokerOpts, invoke};
use crate::session::support::{SupportBundle, ensure_support_file};
use crate::session::temp::{TempPaths, TempStrategy};

/// Pipeline stage, in execution order. Used for log breadcrumbs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Cache directory and support bundle are made ready.
    Preparing,
    /// The input buffer is serialized to the raw pixel file.
    Encoding,
    /// The interpreter runs.
    Invoking,
    /// Its declared output file is read back.
    Decoding,
    /// The decoded buffer is handed to the caller.
    Presenting,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Preparing => "preparing",
            Stage::Encoding => "encoding",
            Stage::Invoking => "invoking",
            Stage::Decoding => "decoding",
            Stage::Presenting => "presenting",
        };
        f.write_str(s)
    }
}

/// Options for a [`FilterSession`].
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SessionOpts {
    /// Path to the external interpreter binary.
    pub binary: PathBuf,
    /// Cache directory: holds the support bundle, the temp-file pair, and is
    /// exported to the child as its scratch directory.
    pub cache_dir: PathBuf,
    /// Optional support-data bundle ensured before every run.
    pub support: Option<SupportBundle>,
    /// Name of the environment variable carrying the scratch directory.
    pub scratch_env: String,
    /// Temp-file naming strategy.
    pub temp_strategy: TempStrategy,
}

impl SessionOpts {
    /// Options for `binary` with everything else at its default.
    pub fn new(binary: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            cache_dir: cache_dir.into(),
            support: None,
            scratch_env: DEFAULT_SCRATCH_ENV.to_string(),
            temp_strategy: TempStrategy::default(),
        }
    }

    /// Check the options before any run.
    pub fn validate(&self) -> FxPipeResult<()> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err(FxPipeError::validation("cache directory path is empty"));
        }
        self.invoker_opts().validate()
    }

    fn invoker_opts(&self) -> InvokerOpts {
        InvokerOpts {
            binary: self.binary.clone(),
            scratch_dir: self.cache_dir.clone(),
            scratch_env: self.scratch_env.clone(),
        }
    }
}

/// Orchestrates single filter runs against one interpreter configuration.
///
/// At most one run is in flight per session: a second `apply` or
/// `apply_in_background` while one is live fails fast with a validation
/// error. The guard is released on every exit path, so a failed run leaves
/// the session reusable. There is no cancellation; once triggered, a run
/// goes to completion.
pub struct FilterSession {
    opts: SessionOpts,
    in_flight: Arc<AtomicBool>,
}

/// Handle to a run dispatched with [`FilterSession::apply_in_background`].
///
/// The worker is fire-and-forget; the result comes back over a
/// single-consumer channel.
#[derive(Debug)]
pub struct FilterJob {
    rx: mpsc::Receiver<FxPipeResult<PixelBuffer>>,
}

impl FilterJob {
    /// Block until the background run delivers its result.
    pub fn wait(self) -> FxPipeResult<PixelBuffer> {
        self.rx
            .recv()
            .map_err(|_| FxPipeError::io("background worker exited before delivering a result"))?
    }

    /// Take the result if the run has already finished.
    pub fn try_wait(&self) -> Option<FxPipeResult<PixelBuffer>> {
        self.rx.try_recv().ok()
    }
}

struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl FilterSession {
    /// Construct a session, validating `opts` up front.
    pub fn new(opts: SessionOpts) -> FxPipeResult<Self> {
        opts.validate()?;
        Ok(Self {
            opts,
            in_flight: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The session's options.
    pub fn opts(&self) -> &SessionOpts {
        &self.opts
    }

    /// Whether a run is currently live.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn acquire(&self) -> FxPipeResult<InFlightGuard> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(FxPipeError::validation(
                "a filter run is already in flight on this session",
            ));
        }
        Ok(InFlightGuard(Arc::clone(&self.in_flight)))
    }

    /// Run the full pipeline synchronously on the calling thread.
    pub fn apply(&self, input: &PixelBuffer, spec: &EffectSpec) -> FxPipeResult<PixelBuffer> {
        let _guard = self.acquire()?;
        run_pipeline(&self.opts, input, spec)
    }

    /// Dispatch the run to a background worker thread.
    ///
    /// The calling thread never blocks; collect the result through the
    /// returned [`FilterJob`]. The in-flight guard is held by the worker and
    /// released when it finishes, successfully or not.
    pub fn apply_in_background(
        &self,
        input: PixelBuffer,
        spec: EffectSpec,
    ) -> FxPipeResult<FilterJob> {
        let guard = self.acquire()?;
        let opts = self.opts.clone();
        let (tx, rx) = mpsc::channel();

        std::thread::Builder::new()
            .name("fxpipe-worker".to_string())
            .spawn(move || {
                let result = run_pipeline(&opts, &input, &spec);
                // Release the guard before delivery so a caller blocked in
                // `wait` can start its next run immediately.
                drop(guard);
                let _ = tx.send(result);
            })
            .map_err(|e| FxPipeError::io(format!("failed to spawn worker thread: {e}")))?;

        Ok(FilterJob { rx })
    }
}

#[tracing::instrument(skip_all, fields(binary = %opts.binary.display()))]
fn run_pipeline(
    opts: &SessionOpts,
    input: &PixelBuffer,
    spec: &EffectSpec,
) -> FxPipeResult<PixelBuffer> {
    tracing::debug!(stage = %Stage::Preparing);
    std::fs::create_dir_all(&opts.cache_dir)
        .with_context(|| format!("create cache directory '{}'", opts.cache_dir.display()))?;
    if let Some(bundle) = &opts.support {
        ensure_support_file(&opts.cache_dir, bundle)?;
    }

    let temp = TempPaths::for_strategy(&opts.cache_dir, opts.temp_strategy);
    // Stale files from a prior aborted run.
    temp.cleanup()?;

    let result = run_stages(opts, input, spec, &temp);

    // The pair is deleted on success and failure alike; a failed run must
    // not leave anything behind.
    match (result, temp.cleanup()) {
        (Ok(buf), Ok(())) => Ok(buf),
        (Ok(_), Err(cleanup_err)) => Err(cleanup_err),
        (Err(run_err), Ok(())) => Err(run_err),
        (Err(run_err), Err(cleanup_err)) => {
            tracing::warn!(error = %cleanup_err, "temp cleanup failed after a failed run");
            Err(run_err)
        }
    }
}

fn run_stages(
    opts: &SessionOpts,
    input: &PixelBuffer,
    spec: &EffectSpec,
    temp: &TempPaths,
) -> FxPipeResult<PixelBuffer> {
    tracing::debug!(stage = %Stage::Encoding, width = input.width, height = input.height);
    write_ppm(&temp.input, input)?;

    tracing::debug!(stage = %Stage::Invoking);
    let input_abs = std::path::absolute(&temp.input)
        .map_err(|e| FxPipeError::io(format!("absolutize '{}': {e}", temp.input.display())))?;
    let output_abs = std::path::absolute(&temp.output)
        .map_err(|e| FxPipeError::io(format!("absolutize '{}': {e}", temp.output.display())))?;
    let invocation = invoke(&opts.invoker_opts(), &input_abs, spec, &output_abs)?;

    let diagnostics = invocation.diagnostics.trim();
    if !diagnostics.is_empty() {
        tracing::debug!(%diagnostics, "interpreter diagnostics");
    }
    if !invocation.status.success() {
        return Err(FxPipeError::effect(format!(
            "interpreter exited with {}: {diagnostics}",
            invocation.status
        )));
    }

    tracing::debug!(stage = %Stage::Decoding);
    let output = decode_output(&temp.output)?;

    tracing::debug!(stage = %Stage::Presenting, width = output.width, height = output.height);
    Ok(output)
}

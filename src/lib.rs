//! fxpipe bridges in-memory pixel buffers to an external image-effect
//! interpreter binary.
//!
//! The interpreter is an opaque, pre-built executable: it reads a raw pixel
//! file, applies the effect named by an uninterpreted specification string,
//! and writes its result to a declared output file. Everything interesting
//! about the effect lives on the other side of that process boundary; this
//! crate owns the glue and gets its ordering right.
//!
//! # Pipeline overview
//!
//! 1. **Encode**: `PixelBuffer -> raw pixel file` (binary PPM, alpha dropped)
//! 2. **Invoke**: spawn the interpreter with the input path, the spec's
//!    tokens, and `-output <file>`; drain its diagnostic stream concurrently
//!    with waiting for exit
//! 3. **Decode**: read the declared output file back into a [`PixelBuffer`]
//! 4. **Orchestrate**: [`FilterSession`] owns the temp-file pair, the cached
//!    support bundle, the single-run-in-flight guard, and background
//!    dispatch with channel delivery
//!
//! Key constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **One run in flight** per session; temp paths are unique per run by
//!   default so that restriction stays a policy, not a correctness need.
//! - **No timeouts, no retries**: a run either completes or fails once, and
//!   every exit path deletes the temp pair.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Decoding of the interpreter's output file.
pub mod decode;
/// Raw pixel file serialization.
pub mod encode;
mod foundation;
/// Interpreter argv construction and subprocess execution.
pub mod invoke;
/// Session-oriented orchestration.
pub mod session;

pub use crate::decode::decode_output;
pub use crate::encode::ppm::{PPM_MAGIC, PPM_MAXVAL, encode_ppm, ppm_header, read_ppm, write_ppm};
pub use crate::foundation::core::PixelBuffer;
pub use crate::foundation::error::{FxPipeError, FxPipeResult};
pub use crate::invoke::{
    DEFAULT_SCRATCH_ENV, DIAG_READ_BUF_LEN, EffectSpec, Invocation, InvokerOpts, build_args,
    invoke,
};
pub use crate::session::filter_session::{FilterJob, FilterSession, SessionOpts, Stage};
pub use crate::session::support::{SupportBundle, SupportSource, ensure_support_file};
pub use crate::session::temp::{TempPaths, TempStrategy};

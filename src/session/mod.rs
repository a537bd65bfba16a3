//! Session-oriented orchestration of the encode -> invoke -> decode pipeline.

/// The orchestrating session and background job handle.
pub mod filter_session;
/// Support-data bundle cached on first use.
pub mod support;
/// Per-run temp-file pair lifecycle.
pub mod temp;

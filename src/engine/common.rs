// src/engine/common.rs
//
// Common utilities shared across engine modules.
// Provides the engine Result alias and the codec panic policy.

use crate::error::CanvasError;
use std::panic::{catch_unwind, AssertUnwindSafe};

pub type EngineResult<T> = std::result::Result<T, CanvasError>;

/// Run codec/resampler code, turning a panic inside third-party code into
/// `CanvasError::InternalPanic` instead of unwinding through the caller.
///
/// `label` names the stage ("encode:jpeg", "decode:png", ...) for the message.
pub fn run_with_panic_policy<T, F>(label: &'static str, f: F) -> EngineResult<T>
where
    F: FnOnce() -> EngineResult<T>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let detail = if let Some(s) = payload.downcast_ref::<&str>() {
                (*s).to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic payload".to_string()
            };
            tracing::warn!(stage = label, %detail, "codec panicked");
            Err(CanvasError::internal_panic(format!("{label}: {detail}")))
        }
    }
}

// src/engine/remote.rs
//
// Background removal collaborator. The engine only defines the seam; the
// network client lives with the host application.

use crate::error::CanvasError;
use crate::raster::RasterImage;
use std::future::Future;

/// Name used in `ExternalServiceFailed` errors.
pub const BACKGROUND_REMOVAL: &str = "background removal";

/// Removes the background of an image, usually via a remote model.
///
/// Called once per request with no retry. Output dimensions may differ from
/// the input.
pub trait BackgroundRemover {
    fn remove_background(
        &self,
        image: &RasterImage,
    ) -> impl Future<Output = Result<RasterImage, CanvasError>> + Send;
}

/// Normalize a collaborator failure into `ExternalServiceFailed`.
///
/// Errors that already came from the engine itself (bad output raster,
/// limit violations) keep their own category.
pub fn external_failure(err: CanvasError) -> CanvasError {
    match err {
        err @ CanvasError::ExternalServiceFailed { .. } => err,
        err @ (CanvasError::DimensionExceedsLimit { .. }
        | CanvasError::PixelCountExceedsLimit { .. }
        | CanvasError::InternalPanic { .. }) => err,
        other => CanvasError::external_service_failed(BACKGROUND_REMOVAL, other.to_string()),
    }
}

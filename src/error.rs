// src/error.rs
//
// Unified error handling for snapframe
// Uses thiserror for simple, type-safe error handling
//
// Error Taxonomy:
// - UserError: Degenerate geometry or invalid input, never retried
// - CodecError: Format/encoding/resampling issues
// - ResourceLimit: Dimension/pixel limits and file I/O
// - ExternalFailure: An external collaborator (background removal) failed
// - InternalBug: Library bugs (should not happen)
//
// An unsatisfiable byte budget is NOT an error. See `engine::BudgetWarning`.

use std::borrow::Cow;
use thiserror::Error;

/// Error taxonomy for callers that need to branch on failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCategory {
    /// Invalid input, recoverable by the caller
    UserError,
    /// Format/encoding issues
    CodecError,
    /// Dimension limits, file system failures
    ResourceLimit,
    /// A collaborator outside the engine failed
    ExternalFailure,
    /// Library bugs (should not happen)
    InternalBug,
}

impl ErrorCategory {
    /// Get string representation of error category
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::UserError => "UserError",
            ErrorCategory::CodecError => "CodecError",
            ErrorCategory::ResourceLimit => "ResourceLimit",
            ErrorCategory::ExternalFailure => "ExternalFailure",
            ErrorCategory::InternalBug => "InternalBug",
        }
    }

    /// Stable SNAPFRAME_* code string for this category
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCategory::UserError => "SNAPFRAME_USER_ERROR",
            ErrorCategory::CodecError => "SNAPFRAME_CODEC_ERROR",
            ErrorCategory::ResourceLimit => "SNAPFRAME_RESOURCE_LIMIT",
            ErrorCategory::ExternalFailure => "SNAPFRAME_EXTERNAL_FAILURE",
            ErrorCategory::InternalBug => "SNAPFRAME_INTERNAL_BUG",
        }
    }
}

/// snapframe error types
///
/// Every core operation either produces a complete result or fails with one
/// of these variants. No half-rendered raster is ever returned.
#[derive(Debug, Error)]
pub enum CanvasError {
    // File I/O Errors
    #[error("Failed to read file '{path}': {source}")]
    FileReadFailed {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to memory-map file '{path}': {source}")]
    MmapFailed {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWriteFailed {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    // Decode Errors
    #[error("Unsupported image format: {format}")]
    UnsupportedFormat { format: Cow<'static, str> },

    #[error("Failed to decode image: {message}")]
    DecodeFailed { message: Cow<'static, str> },

    // Size Limit Errors
    #[error("Image dimension {dimension} exceeds maximum {max}")]
    DimensionExceedsLimit { dimension: u32, max: u32 },

    #[error("Image pixel count {pixels} exceeds maximum {max}")]
    PixelCountExceedsLimit { pixels: u64, max: u64 },

    // Geometry Errors
    #[error("Invalid crop dimensions: width={width}, height={height}")]
    InvalidCropDimensions { width: f64, height: f64 },

    #[error("Source aspect ratio is undefined for a {width}x{height} image")]
    InvalidAspectRatio { width: u32, height: u32 },

    #[error("Invalid target size: width={width}, height={height}")]
    InvalidTargetSize { width: f64, height: f64 },

    #[error("Cell '{cell_id}' resolves to a non-positive rect ({width}x{height}); reduce the gap")]
    InvalidCellBounds {
        cell_id: Cow<'static, str>,
        width: f64,
        height: f64,
    },

    // Layout / binding Errors
    #[error("Unknown cell '{cell_id}' in layout '{layout_id}'")]
    UnknownCell {
        cell_id: Cow<'static, str>,
        layout_id: Cow<'static, str>,
    },

    #[error("Duplicate cell id '{cell_id}' in layout '{layout_id}'")]
    DuplicateCell {
        cell_id: Cow<'static, str>,
        layout_id: Cow<'static, str>,
    },

    #[error("Unknown layout template: '{name}'. Available: single, split-horizontal, split-vertical, three-left-right, four-grid")]
    InvalidTemplate { name: Cow<'static, str> },

    #[error("Unknown preset category: '{name}'. Available: universal, facebook, instagram, threads")]
    InvalidPreset { name: Cow<'static, str> },

    #[error("Invalid value for {name}: {value}. {reason}")]
    InvalidArgument {
        name: Cow<'static, str>,
        value: Cow<'static, str>,
        reason: Cow<'static, str>,
    },

    #[error("No image loaded in the editor")]
    NoImageLoaded,

    // Processing Errors
    #[error("Resize failed ({source_width}x{source_height} -> {target_width}x{target_height}): {message}")]
    ResizeFailed {
        source_width: u32,
        source_height: u32,
        target_width: u32,
        target_height: u32,
        message: Cow<'static, str>,
    },

    // Encode Errors
    #[error("Failed to encode as {format}: {message}")]
    EncodeFailed {
        format: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    // External collaborator Errors
    #[error("{service} failed: {message}")]
    ExternalServiceFailed {
        service: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    // Internal Errors
    #[error("Internal error: {message}")]
    InternalPanic { message: Cow<'static, str> },
}

fn clone_io(source: &std::io::Error) -> std::io::Error {
    std::io::Error::new(source.kind(), source.to_string())
}

impl Clone for CanvasError {
    fn clone(&self) -> Self {
        match self {
            Self::FileReadFailed { path, source } => Self::FileReadFailed {
                path: path.clone(),
                source: clone_io(source),
            },
            Self::MmapFailed { path, source } => Self::MmapFailed {
                path: path.clone(),
                source: clone_io(source),
            },
            Self::FileWriteFailed { path, source } => Self::FileWriteFailed {
                path: path.clone(),
                source: clone_io(source),
            },
            Self::UnsupportedFormat { format } => Self::UnsupportedFormat {
                format: format.clone(),
            },
            Self::DecodeFailed { message } => Self::DecodeFailed {
                message: message.clone(),
            },
            Self::DimensionExceedsLimit { dimension, max } => Self::DimensionExceedsLimit {
                dimension: *dimension,
                max: *max,
            },
            Self::PixelCountExceedsLimit { pixels, max } => Self::PixelCountExceedsLimit {
                pixels: *pixels,
                max: *max,
            },
            Self::InvalidCropDimensions { width, height } => Self::InvalidCropDimensions {
                width: *width,
                height: *height,
            },
            Self::InvalidAspectRatio { width, height } => Self::InvalidAspectRatio {
                width: *width,
                height: *height,
            },
            Self::InvalidTargetSize { width, height } => Self::InvalidTargetSize {
                width: *width,
                height: *height,
            },
            Self::InvalidCellBounds {
                cell_id,
                width,
                height,
            } => Self::InvalidCellBounds {
                cell_id: cell_id.clone(),
                width: *width,
                height: *height,
            },
            Self::UnknownCell { cell_id, layout_id } => Self::UnknownCell {
                cell_id: cell_id.clone(),
                layout_id: layout_id.clone(),
            },
            Self::DuplicateCell { cell_id, layout_id } => Self::DuplicateCell {
                cell_id: cell_id.clone(),
                layout_id: layout_id.clone(),
            },
            Self::InvalidTemplate { name } => Self::InvalidTemplate { name: name.clone() },
            Self::InvalidPreset { name } => Self::InvalidPreset { name: name.clone() },
            Self::InvalidArgument {
                name,
                value,
                reason,
            } => Self::InvalidArgument {
                name: name.clone(),
                value: value.clone(),
                reason: reason.clone(),
            },
            Self::NoImageLoaded => Self::NoImageLoaded,
            Self::ResizeFailed {
                source_width,
                source_height,
                target_width,
                target_height,
                message,
            } => Self::ResizeFailed {
                source_width: *source_width,
                source_height: *source_height,
                target_width: *target_width,
                target_height: *target_height,
                message: message.clone(),
            },
            Self::EncodeFailed { format, message } => Self::EncodeFailed {
                format: format.clone(),
                message: message.clone(),
            },
            Self::ExternalServiceFailed { service, message } => Self::ExternalServiceFailed {
                service: service.clone(),
                message: message.clone(),
            },
            Self::InternalPanic { message } => Self::InternalPanic {
                message: message.clone(),
            },
        }
    }
}

// Constructor Helpers
impl CanvasError {
    pub fn file_read_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::FileReadFailed {
            path: path.into(),
            source,
        }
    }

    pub fn mmap_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::MmapFailed {
            path: path.into(),
            source,
        }
    }

    pub fn file_write_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::FileWriteFailed {
            path: path.into(),
            source,
        }
    }

    pub fn unsupported_format(format: impl Into<Cow<'static, str>>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn decode_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn dimension_exceeds_limit(dimension: u32, max: u32) -> Self {
        Self::DimensionExceedsLimit { dimension, max }
    }

    pub fn pixel_count_exceeds_limit(pixels: u64, max: u64) -> Self {
        Self::PixelCountExceedsLimit { pixels, max }
    }

    pub fn invalid_crop_dimensions(width: f64, height: f64) -> Self {
        Self::InvalidCropDimensions { width, height }
    }

    pub fn invalid_aspect_ratio(width: u32, height: u32) -> Self {
        Self::InvalidAspectRatio { width, height }
    }

    pub fn invalid_target_size(width: f64, height: f64) -> Self {
        Self::InvalidTargetSize { width, height }
    }

    pub fn invalid_cell_bounds(
        cell_id: impl Into<Cow<'static, str>>,
        width: f64,
        height: f64,
    ) -> Self {
        Self::InvalidCellBounds {
            cell_id: cell_id.into(),
            width,
            height,
        }
    }

    pub fn unknown_cell(
        cell_id: impl Into<Cow<'static, str>>,
        layout_id: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::UnknownCell {
            cell_id: cell_id.into(),
            layout_id: layout_id.into(),
        }
    }

    pub fn duplicate_cell(
        cell_id: impl Into<Cow<'static, str>>,
        layout_id: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::DuplicateCell {
            cell_id: cell_id.into(),
            layout_id: layout_id.into(),
        }
    }

    pub fn invalid_template(name: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidTemplate { name: name.into() }
    }

    pub fn invalid_preset(name: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidPreset { name: name.into() }
    }

    pub fn invalid_argument(
        name: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn no_image_loaded() -> Self {
        Self::NoImageLoaded
    }

    pub fn resize_failed(
        source_dims: (u32, u32),
        target_dims: (u32, u32),
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::ResizeFailed {
            source_width: source_dims.0,
            source_height: source_dims.1,
            target_width: target_dims.0,
            target_height: target_dims.1,
            message: message.into(),
        }
    }

    pub fn encode_failed(
        format: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn external_service_failed(
        service: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::ExternalServiceFailed {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn internal_panic(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InternalPanic {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (caller can fix or retry it)
    ///
    /// Consistent with category():
    /// - UserError, ResourceLimit and ExternalFailure are recoverable
    /// - CodecError and InternalBug are not
    pub fn is_recoverable(&self) -> bool {
        match self.category() {
            ErrorCategory::UserError
            | ErrorCategory::ResourceLimit
            | ErrorCategory::ExternalFailure => true,
            ErrorCategory::CodecError | ErrorCategory::InternalBug => false,
        }
    }

    /// Get the error category for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidCropDimensions { .. }
            | Self::InvalidAspectRatio { .. }
            | Self::InvalidTargetSize { .. }
            | Self::InvalidCellBounds { .. }
            | Self::UnknownCell { .. }
            | Self::DuplicateCell { .. }
            | Self::InvalidTemplate { .. }
            | Self::InvalidPreset { .. }
            | Self::InvalidArgument { .. }
            | Self::NoImageLoaded => ErrorCategory::UserError,

            Self::UnsupportedFormat { .. }
            | Self::DecodeFailed { .. }
            | Self::EncodeFailed { .. }
            // ResizeFailed means the resampler could not produce pixels, which
            // is closer to a codec failure than to bad input.
            | Self::ResizeFailed { .. } => ErrorCategory::CodecError,

            Self::DimensionExceedsLimit { .. }
            | Self::PixelCountExceedsLimit { .. }
            | Self::FileReadFailed { .. }
            | Self::MmapFailed { .. }
            | Self::FileWriteFailed { .. } => ErrorCategory::ResourceLimit,

            Self::ExternalServiceFailed { .. } => ErrorCategory::ExternalFailure,

            Self::InternalPanic { .. } => ErrorCategory::InternalBug,
        }
    }
}

// Result type alias
pub type Result<T> = std::result::Result<T, CanvasError>;

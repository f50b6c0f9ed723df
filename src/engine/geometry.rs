// src/engine/geometry.rs
//
// Fit geometry: where a source lands inside a target rect.
// Pure functions, no pixels involved.

use crate::error::CanvasError;
use crate::ops::{FitMode, ObjectTransform, Point, Rect};

type GeometryResult<T> = std::result::Result<T, CanvasError>;

/// Drawable rect in target-local coordinates. May extend past the target
/// (cover, scale > 1, user offsets); clipping happens at raster time.
pub type DrawRect = Rect;

/// Which side the user edited while "maintain aspect" is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Width,
    Height,
}

/// Compute the drawable rect for a `src_width`x`src_height` source placed in
/// a `target_width`x`target_height` target.
///
/// ```
/// use snapframe::engine::fit_rect;
/// use snapframe::{FitMode, ObjectTransform};
///
/// let rect = fit_rect(1000, 1000, 800.0, 400.0, FitMode::Contain, &ObjectTransform::default()).unwrap();
/// assert_eq!((rect.x, rect.y, rect.width, rect.height), (200.0, 0.0, 400.0, 400.0));
/// ```
pub fn fit_rect(
    src_width: u32,
    src_height: u32,
    target_width: f64,
    target_height: f64,
    fit: FitMode,
    transform: &ObjectTransform,
) -> GeometryResult<DrawRect> {
    if src_width == 0 || src_height == 0 {
        return Err(CanvasError::invalid_aspect_ratio(src_width, src_height));
    }
    let aspect = f64::from(src_width) / f64::from(src_height);
    fit_rect_for_aspect(aspect, target_width, target_height, fit, transform)
}

/// Same as [`fit_rect`] but from a precomputed source aspect (width / height).
pub fn fit_rect_for_aspect(
    source_aspect: f64,
    target_width: f64,
    target_height: f64,
    fit: FitMode,
    transform: &ObjectTransform,
) -> GeometryResult<DrawRect> {
    if !(target_width.is_finite() && target_height.is_finite())
        || target_width <= 0.0
        || target_height <= 0.0
    {
        return Err(CanvasError::invalid_target_size(target_width, target_height));
    }
    if !source_aspect.is_finite() || source_aspect <= 0.0 {
        return Err(CanvasError::invalid_argument(
            "source_aspect",
            source_aspect.to_string(),
            "must be a positive finite ratio",
        ));
    }
    let scale = transform.scale;
    if !scale.is_finite() || scale < 0.0 {
        return Err(CanvasError::invalid_argument(
            "scale",
            scale.to_string(),
            "must be finite and >= 0",
        ));
    }

    let target_aspect = target_width / target_height;
    let wider = source_aspect > target_aspect;
    let (base_width, base_height) = match fit {
        FitMode::Contain if wider => (target_width, target_width / source_aspect),
        FitMode::Contain => (target_height * source_aspect, target_height),
        FitMode::Cover if wider => (target_height * source_aspect, target_height),
        FitMode::Cover => (target_width, target_width / source_aspect),
        FitMode::Stretch => (target_width, target_height),
    };

    let width = base_width * scale;
    let height = base_height * scale;
    let (x, y) = match transform.position {
        Some(Point { x, y }) => {
            require_finite("position", x, y)?;
            (x, y)
        }
        None => ((target_width - width) / 2.0, (target_height - height) / 2.0),
    };

    Ok(Rect::new(x, y, width, height))
}

/// Reject a pan offset or position that is not finite on both axes.
pub(crate) fn require_finite(name: &'static str, x: f64, y: f64) -> GeometryResult<()> {
    if x.is_finite() && y.is_finite() {
        Ok(())
    } else {
        Err(CanvasError::invalid_argument(name, format!("({x}, {y})"), "must be finite"))
    }
}

/// Explicit top-left for `transform`, materializing the centered default.
///
/// Dragging a centered object starts from here so the first move does not jump.
pub fn resolve_position(
    src_width: u32,
    src_height: u32,
    target_width: f64,
    target_height: f64,
    fit: FitMode,
    transform: &ObjectTransform,
) -> GeometryResult<Point> {
    let rect = fit_rect(src_width, src_height, target_width, target_height, fit, transform)?;
    Ok(Point::new(rect.x, rect.y))
}

/// Derive both dimensions when one side changes under a locked aspect
/// (`aspect` = width / height of the original image).
///
/// The derived side is `round(width / aspect)` or `round(height * aspect)`,
/// never less than 1.
pub fn lock_aspect(changed: Axis, value: u32, aspect: f64) -> GeometryResult<(u32, u32)> {
    if !aspect.is_finite() || aspect <= 0.0 {
        return Err(CanvasError::invalid_argument(
            "aspect",
            aspect.to_string(),
            "must be a positive finite ratio",
        ));
    }
    let derive = |v: f64| v.round().clamp(1.0, f64::from(u32::MAX)) as u32;
    Ok(match changed {
        Axis::Width => (value, derive(f64::from(value) / aspect)),
        Axis::Height => (derive(f64::from(value) * aspect), value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn centered() -> ObjectTransform {
        ObjectTransform::default()
    }

    #[test]
    fn test_contain_wide_target() {
        let r = fit_rect(1000, 1000, 800.0, 400.0, FitMode::Contain, &centered()).unwrap();
        assert_eq!(r, Rect::new(200.0, 0.0, 400.0, 400.0));
    }

    #[test]
    fn test_contain_tall_target() {
        let r = fit_rect(400, 200, 100.0, 300.0, FitMode::Contain, &centered()).unwrap();
        assert!((r.width - 100.0).abs() < EPS);
        assert!((r.height - 50.0).abs() < EPS);
        assert!((r.y - 125.0).abs() < EPS);
        assert!(r.x.abs() < EPS);
    }

    #[test]
    fn test_cover_overflows_one_axis() {
        let r = fit_rect(1000, 1000, 800.0, 400.0, FitMode::Cover, &centered()).unwrap();
        assert_eq!(r, Rect::new(0.0, -200.0, 800.0, 800.0));
    }

    #[test]
    fn test_stretch_ignores_aspect() {
        let r = fit_rect(10, 1000, 640.0, 480.0, FitMode::Stretch, &centered()).unwrap();
        assert_eq!(r, Rect::new(0.0, 0.0, 640.0, 480.0));
    }

    #[test]
    fn test_scale_and_explicit_position() {
        let t = ObjectTransform::at(-15.0, 30.0, 0.5);
        let r = fit_rect(100, 100, 200.0, 200.0, FitMode::Contain, &t).unwrap();
        assert_eq!(r, Rect::new(-15.0, 30.0, 100.0, 100.0));
    }

    #[test]
    fn test_scale_centers_around_target() {
        let t = ObjectTransform::centered(2.0);
        let r = fit_rect(100, 100, 200.0, 200.0, FitMode::Contain, &t).unwrap();
        assert_eq!(r, Rect::new(-100.0, -100.0, 400.0, 400.0));
    }

    #[test]
    fn test_zero_scale_is_empty_not_error() {
        let r = fit_rect(100, 50, 200.0, 200.0, FitMode::Contain, &ObjectTransform::centered(0.0))
            .unwrap();
        assert_eq!(r.width, 0.0);
        assert!(!r.is_drawable());
    }

    #[test]
    fn test_degenerate_inputs() {
        let t = centered();
        assert!(matches!(
            fit_rect(100, 0, 10.0, 10.0, FitMode::Contain, &t),
            Err(CanvasError::InvalidAspectRatio { .. })
        ));
        assert!(matches!(
            fit_rect(100, 100, 0.0, 10.0, FitMode::Cover, &t),
            Err(CanvasError::InvalidTargetSize { .. })
        ));
        assert!(matches!(
            fit_rect(100, 100, 10.0, -1.0, FitMode::Stretch, &t),
            Err(CanvasError::InvalidTargetSize { .. })
        ));
        assert!(fit_rect(100, 100, 10.0, 10.0, FitMode::Contain, &ObjectTransform::centered(-1.0))
            .is_err());
    }

    #[test]
    fn test_non_finite_position_rejected() {
        for (x, y) in [(f64::NAN, 0.0), (0.0, f64::INFINITY), (f64::NEG_INFINITY, f64::NAN)] {
            let err = fit_rect(10, 10, 20.0, 20.0, FitMode::Contain, &ObjectTransform::at(x, y, 1.0))
                .unwrap_err();
            assert!(matches!(err, CanvasError::InvalidArgument { .. }), "{err}");
        }
    }

    #[test]
    fn test_resolve_position_matches_centered_rect() {
        let p = resolve_position(1000, 1000, 800.0, 400.0, FitMode::Contain, &centered()).unwrap();
        assert_eq!(p, Point::new(200.0, 0.0));
        let explicit = ObjectTransform::at(3.0, 4.0, 1.0);
        let p = resolve_position(1000, 1000, 800.0, 400.0, FitMode::Contain, &explicit).unwrap();
        assert_eq!(p, Point::new(3.0, 4.0));
    }

    #[test]
    fn test_lock_aspect() {
        assert_eq!(lock_aspect(Axis::Width, 800, 4.0 / 3.0).unwrap(), (800, 600));
        assert_eq!(lock_aspect(Axis::Height, 600, 4.0 / 3.0).unwrap(), (800, 600));
        assert_eq!(lock_aspect(Axis::Width, 1, 10.0).unwrap(), (1, 1));
        assert!(lock_aspect(Axis::Width, 100, 0.0).is_err());
    }
}

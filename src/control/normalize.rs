//! # Angle Normalizer
//!
//! Maps wrapping angles onto the virtual controller's axis range.
//!
//! ## Axis Range
//!
//! | Value | Meaning |
//! |-------|---------|
//! | `0x0000` | Full negative deflection |
//! | `0x4000` | Center |
//! | `0x8000` | Full positive deflection |
//!
//! ## Wrap Handling
//!
//! Sensor angles live on a `(-180, 180]` scale, so a move from `179°` to
//! `-179°` is a 2° step, not a 358° one. [`wrap_degrees`] folds the raw
//! difference back into that window before anything is scaled.
//!
//! ## Usage
//!
//! ```
//! use tilt_bridge::control::normalize::{normalize, AXIS_CENTER};
//!
//! // Centered input
//! assert_eq!(normalize(12.0, 12.0, 90.0), AXIS_CENTER);
//!
//! // Crossing the 180° seam still reads as a small tilt
//! assert_eq!(normalize(179.0, -179.0, 90.0), normalize(-181.0, -179.0, 90.0));
//! ```

/// Minimum axis value.
pub const AXIS_MIN: u16 = 0;
/// Maximum axis value.
pub const AXIS_MAX: u16 = 0x8000;
/// Axis center value.
pub const AXIS_CENTER: u16 = 0x4000;

/// Half of a full turn in degrees.
const HALF_TURN_DEG: f64 = 180.0;
/// A full turn in degrees.
const FULL_TURN_DEG: f64 = 360.0;

/// Default half-width of the roll input range (degrees).
pub const ROLL_RANGE_SPAN_DEG: f64 = 90.0;

/// Folds an angular difference back into `[-180, 180]`.
///
/// A single correction is applied, which covers any difference of two angles
/// that are themselves on the `(-180, 180]` scale.
///
/// # Examples
///
/// ```
/// use tilt_bridge::control::normalize::wrap_degrees;
///
/// assert_eq!(wrap_degrees(358.0), -2.0);
/// assert_eq!(wrap_degrees(-358.0), 2.0);
/// assert_eq!(wrap_degrees(45.0), 45.0);
/// ```
#[inline]
#[must_use]
pub fn wrap_degrees(diff: f64) -> f64 {
    if diff > HALF_TURN_DEG {
        diff - FULL_TURN_DEG
    } else if diff < -HALF_TURN_DEG {
        diff + FULL_TURN_DEG
    } else {
        diff
    }
}

/// Maps an angle relative to `center` onto the axis range.
///
/// The wrapped difference is clamped to `[-range_span, range_span]`, so tilting
/// past the span pins the axis at its extreme instead of wrapping around.
///
/// # Arguments
///
/// * `value` - Current angle (degrees)
/// * `center` - Reference angle mapped to [`AXIS_CENTER`] (degrees)
/// * `range_span` - Half-width of the input range (degrees, > 0)
///
/// # Returns
///
/// Axis value in `[AXIS_MIN, AXIS_MAX]`.
///
/// # Examples
///
/// ```
/// use tilt_bridge::control::normalize::{normalize, AXIS_MAX, AXIS_MIN};
///
/// assert_eq!(normalize(90.0, 0.0, 90.0), AXIS_MAX);
/// assert_eq!(normalize(-120.0, 0.0, 90.0), AXIS_MIN); // sticky clamp
/// ```
#[must_use]
pub fn normalize(value: f64, center: f64, range_span: f64) -> u16 {
    let diff = wrap_degrees(value - center);
    let clamped = diff.clamp(-range_span, range_span);
    scale_to_axis(clamped, range_span)
}

/// Linearly maps `offset` in `[-range_span, range_span]` onto the axis range.
///
/// Out-of-range offsets are clamped to the axis limits.
#[must_use]
pub fn scale_to_axis(offset: f64, range_span: f64) -> u16 {
    let fraction = (offset + range_span) / (2.0 * range_span);
    let scaled = (fraction * f64::from(AXIS_MAX)).round();
    scaled.clamp(f64::from(AXIS_MIN), f64::from(AXIS_MAX)) as u16
}

/// Maps a percentage onto the axis range, clamping to `0..=100` first.
///
/// Used for the throttle and manual yaw-rotation axes.
///
/// # Examples
///
/// ```
/// use tilt_bridge::control::normalize::{percent_to_axis, AXIS_CENTER, AXIS_MAX};
///
/// assert_eq!(percent_to_axis(50), AXIS_CENTER);
/// assert_eq!(percent_to_axis(100), AXIS_MAX);
/// assert_eq!(percent_to_axis(250), AXIS_MAX);
/// ```
#[must_use]
pub fn percent_to_axis(percent: i32) -> u16 {
    let clamped = f64::from(percent.clamp(0, 100));
    (clamped / 100.0 * f64::from(AXIS_MAX)).round() as u16
}

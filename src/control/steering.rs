//! # Steering Integrator
//!
//! Turns pitch changes into a steering-wheel angle.
//!
//! Unlike roll, pitch is not read as an absolute angle. Each sample
//! contributes its change since the previous sample, and the running sum is
//! the wheel angle. This lets a phone act as a wheel with far more than 180°
//! of rotation:
//!
//! | Mode | Range span | Full lock-to-lock |
//! |------|------------|-------------------|
//! | [`Mode::F1`] | 180 | 360° |
//! | [`Mode::Acc`] | 400 | 800° |
//!
//! Changes smaller than the deadzone are discarded so that sensor jitter does
//! not slowly walk the wheel off center.
//!
//! ## Usage
//!
//! ```
//! use tilt_bridge::control::steering::{Mode, SteeringIntegrator};
//! use tilt_bridge::control::normalize::AXIS_CENTER;
//!
//! let mut wheel = SteeringIntegrator::new(Mode::F1);
//!
//! // First sample only anchors the integrator
//! assert_eq!(wheel.update(12.0), AXIS_CENTER);
//!
//! // Turning right moves the axis up
//! assert!(wheel.update(20.0) > AXIS_CENTER);
//! ```

use std::fmt;

use serde::Deserialize;

use super::normalize::{scale_to_axis, wrap_degrees, AXIS_CENTER};

/// Default minimum pitch change (degrees) that moves the wheel.
pub const DEFAULT_DEADZONE_DEG: f64 = 0.05;

/// Steering range preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Open-wheel cars: 180 units each way.
    #[default]
    F1,
    /// GT cars: 400 units each way.
    Acc,
}

impl Mode {
    /// Half-width of the steering range for this mode.
    #[must_use]
    pub const fn range_span(self) -> f64 {
        match self {
            Mode::F1 => 180.0,
            Mode::Acc => 400.0,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::F1 => write!(f, "F1"),
            Mode::Acc => write!(f, "ACC"),
        }
    }
}

/// Accumulates pitch deltas into a bounded wheel angle.
///
/// `total_steering` stays within `[-range_span, range_span]` after every
/// update.
#[derive(Debug, Clone)]
pub struct SteeringIntegrator {
    /// Previous raw pitch, `None` until the first sample after a reset.
    last_raw_pitch: Option<f64>,
    /// Running wheel angle.
    total_steering: f64,
    /// Active steering mode.
    mode: Mode,
    /// Minimum |delta| that is integrated.
    deadzone: f64,
}

impl Default for SteeringIntegrator {
    fn default() -> Self {
        Self::new(Mode::default())
    }
}

impl SteeringIntegrator {
    /// Creates an integrator with the default deadzone.
    #[must_use]
    pub fn new(mode: Mode) -> Self {
        Self::with_deadzone(mode, DEFAULT_DEADZONE_DEG)
    }

    /// Creates an integrator with a custom deadzone (degrees, negative treated as 0).
    #[must_use]
    pub fn with_deadzone(mode: Mode, deadzone: f64) -> Self {
        Self {
            last_raw_pitch: None,
            total_steering: 0.0,
            mode,
            deadzone: deadzone.max(0.0),
        }
    }

    /// Current steering mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Current wheel angle.
    #[must_use]
    pub fn total_steering(&self) -> f64 {
        self.total_steering
    }

    /// Whether the next sample will re-anchor the integrator.
    #[must_use]
    pub fn is_anchored(&self) -> bool {
        self.last_raw_pitch.is_some()
    }

    /// Clears the anchor and re-centers the wheel.
    pub fn reset(&mut self) {
        self.last_raw_pitch = None;
        self.total_steering = 0.0;
    }

    /// Switches mode and resets, since the old angle means nothing in the new range.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.reset();
    }

    /// Integrates one pitch sample and returns the steering axis value.
    ///
    /// # Arguments
    ///
    /// * `pitch` - Raw pitch angle (degrees)
    ///
    /// # Returns
    ///
    /// Axis value; exactly [`AXIS_CENTER`] for the first sample after a reset.
    pub fn update(&mut self, pitch: f64) -> u16 {
        let Some(last) = self.last_raw_pitch else {
            self.last_raw_pitch = Some(pitch);
            self.total_steering = 0.0;
            return AXIS_CENTER;
        };

        let mut delta = wrap_degrees(pitch - last);
        if delta.abs() < self.deadzone {
            delta = 0.0;
        }

        let span = self.mode.range_span();
        self.total_steering = (self.total_steering + delta).clamp(-span, span);
        self.last_raw_pitch = Some(pitch);

        scale_to_axis(self.total_steering, span)
    }

    /// Re-anchors on `pitch` without accumulating and returns the current
    /// steering axis value.
    ///
    /// Used while the reference is frozen, so the next [`update`](Self::update)
    /// only integrates motion made after the freeze ends.
    pub fn hold(&mut self, pitch: f64) -> u16 {
        self.last_raw_pitch = Some(pitch);
        scale_to_axis(self.total_steering, self.mode.range_span())
    }
}

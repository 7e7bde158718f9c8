//! # Control Module
//!
//! Signal conditioning between raw telemetry and controller axes.
//!
//! This module handles:
//! - Wrap-aware angle to axis mapping for roll
//! - Integrating pitch deltas into a steering-wheel angle
//! - Capturing and resetting the reference orientation
//! - Folding button edges into a persistent button mask

pub mod buttons;
pub mod normalize;
pub mod reference;
pub mod steering;

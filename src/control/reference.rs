//! # Reference Frame
//!
//! Holds the roll/pitch orientation treated as "zero".
//!
//! The frame is a two-state machine:
//!
//! ```text
//!   Unset --(first AxisSample)--> Locked { roll, pitch }
//!   Locked --(reset)-----------> Unset
//! ```
//!
//! While locked, later samples never move the reference. With keep-reference
//! enabled, the effective orientation is the reference itself, which holds
//! the axes still without losing the lock.

use tracing::info;

use crate::protocol::AxisSample;

/// A captured roll/pitch pair (degrees).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reference {
    /// Roll at lock time.
    pub roll: f64,
    /// Pitch at lock time.
    pub pitch: f64,
}

/// Lock state of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LockState {
    /// Waiting for the next sample.
    #[default]
    Unset,
    /// Reference captured.
    Locked(Reference),
}

/// Reference orientation plus the keep-reference flag.
#[derive(Debug, Clone, Default)]
pub struct ReferenceFrame {
    state: LockState,
    keep_reference: bool,
}

impl ReferenceFrame {
    /// Creates an unset frame with keep-reference off.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lock state.
    #[must_use]
    pub fn state(&self) -> LockState {
        self.state
    }

    /// The locked reference, if any.
    #[must_use]
    pub fn reference(&self) -> Option<Reference> {
        match self.state {
            LockState::Unset => None,
            LockState::Locked(reference) => Some(reference),
        }
    }

    /// Whether a reference is held.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        matches!(self.state, LockState::Locked(_))
    }

    /// Whether the axes are frozen at the reference.
    #[must_use]
    pub fn keep_reference(&self) -> bool {
        self.keep_reference
    }

    /// Whether keep-reference is on and a reference is locked.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.keep_reference && self.is_locked()
    }

    /// Locks onto `sample` if unset and returns the reference in force.
    ///
    /// Logs once per lock.
    pub fn observe(&mut self, sample: &AxisSample) -> Reference {
        match self.state {
            LockState::Locked(reference) => reference,
            LockState::Unset => {
                let reference = Reference {
                    roll: sample.roll,
                    pitch: sample.pitch,
                };
                self.state = LockState::Locked(reference);
                info!(
                    "Reference locked: R={:.2}, P={:.2}",
                    reference.roll, reference.pitch
                );
                reference
            }
        }
    }

    /// Drops the reference. The next sample locks a new one.
    pub fn reset(&mut self) {
        self.state = LockState::Unset;
    }

    /// Flips keep-reference and returns the new value.
    pub fn toggle_keep_reference(&mut self) -> bool {
        self.keep_reference = !self.keep_reference;
        self.keep_reference
    }

    /// Roll and pitch that should drive the axes for `sample`.
    ///
    /// Live values normally, the reference's own values while keep-reference
    /// is on and a reference is locked.
    #[must_use]
    pub fn effective(&self, sample: &AxisSample) -> (f64, f64) {
        match (self.keep_reference, self.state) {
            (true, LockState::Locked(reference)) => (reference.roll, reference.pitch),
            _ => (sample.roll, sample.pitch),
        }
    }
}

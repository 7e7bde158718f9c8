//! # Output Module
//!
//! Virtual controller the conditioned values are written to.
//!
//! This module handles:
//! - The [`OutputSink`] seam the dispatcher writes through
//! - A uinput virtual joystick for Linux hosts ([`uinput::VirtualController`])
//! - A logging sink for dry runs and hosts without uinput access ([`LogSink`])
//!
//! Sinks buffer field changes and publish them together on
//! [`OutputSink::commit`]. The dispatcher never reads values back.

pub mod uinput;

use tracing::debug;

use crate::control::buttons::ButtonMask;
use crate::control::normalize::{AXIS_CENTER, AXIS_MIN};
use crate::error::Result;

/// Controller axes driven by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Roll.
    X,
    /// Steering wheel.
    Y,
    /// Throttle.
    Throttle,
    /// Manual yaw rotation.
    YawRotation,
}

impl Axis {
    /// All driven axes.
    pub const ALL: [Axis; 4] = [Axis::X, Axis::Y, Axis::Throttle, Axis::YawRotation];
}

/// Write side of a virtual controller.
#[cfg_attr(test, mockall::automock)]
pub trait OutputSink {
    /// Stages an axis value (`0..=0x8000`).
    fn set_axis(&mut self, axis: Axis, value: u16);

    /// Stages the full button mask.
    fn set_buttons(&mut self, mask: ButtonMask);

    /// Publishes all staged changes at once.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying device rejects the update.
    fn commit(&mut self) -> Result<()>;
}

/// Snapshot of every value a sink exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerFrame {
    /// Roll axis.
    pub x: u16,
    /// Steering axis.
    pub y: u16,
    /// Throttle axis.
    pub throttle: u16,
    /// Yaw-rotation axis.
    pub yaw_rotation: u16,
    /// Held buttons.
    pub buttons: ButtonMask,
}

impl Default for ControllerFrame {
    /// Sticks centered, throttle closed, yaw rotation centered, no buttons.
    fn default() -> Self {
        Self {
            x: AXIS_CENTER,
            y: AXIS_CENTER,
            throttle: AXIS_MIN,
            yaw_rotation: AXIS_CENTER,
            buttons: ButtonMask::default(),
        }
    }
}

impl ControllerFrame {
    /// Value of one axis.
    #[must_use]
    pub fn axis(&self, axis: Axis) -> u16 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Throttle => self.throttle,
            Axis::YawRotation => self.yaw_rotation,
        }
    }

    /// Replaces one axis value.
    pub fn set_axis(&mut self, axis: Axis, value: u16) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Throttle => self.throttle = value,
            Axis::YawRotation => self.yaw_rotation = value,
        }
    }
}

/// Sink that only logs committed frames.
#[derive(Debug, Default)]
pub struct LogSink {
    pending: ControllerFrame,
    committed: ControllerFrame,
    commits: u64,
}

impl LogSink {
    /// Creates a sink with the default frame.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last committed frame.
    #[must_use]
    pub fn frame(&self) -> ControllerFrame {
        self.committed
    }

    /// Number of commits so far.
    #[must_use]
    pub fn commits(&self) -> u64 {
        self.commits
    }
}

impl OutputSink for LogSink {
    fn set_axis(&mut self, axis: Axis, value: u16) {
        self.pending.set_axis(axis, value);
    }

    fn set_buttons(&mut self, mask: ButtonMask) {
        self.pending.buttons = mask;
    }

    fn commit(&mut self) -> Result<()> {
        self.commits += 1;
        if self.pending != self.committed {
            let f = &self.pending;
            debug!(
                "Frame: X={:#06x} Y={:#06x} throttle={:#06x} yaw_rot={:#06x} buttons={}",
                f.x, f.y, f.throttle, f.yaw_rotation, f.buttons
            );
        }
        self.committed = self.pending;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_frame() {
        let frame = ControllerFrame::default();
        assert_eq!(frame.x, AXIS_CENTER);
        assert_eq!(frame.y, AXIS_CENTER);
        assert_eq!(frame.throttle, AXIS_MIN);
        assert_eq!(frame.yaw_rotation, AXIS_CENTER);
        assert_eq!(frame.buttons.bits(), 0);
    }

    #[test]
    fn test_frame_axis_accessors() {
        let mut frame = ControllerFrame::default();
        for (i, axis) in Axis::ALL.into_iter().enumerate() {
            frame.set_axis(axis, 100 + i as u16);
        }
        assert_eq!(frame.axis(Axis::X), 100);
        assert_eq!(frame.axis(Axis::Y), 101);
        assert_eq!(frame.axis(Axis::Throttle), 102);
        assert_eq!(frame.axis(Axis::YawRotation), 103);
    }

    #[test]
    fn test_log_sink_publishes_on_commit() {
        let mut sink = LogSink::new();
        sink.set_axis(Axis::Throttle, 0x8000);
        sink.set_buttons(ButtonMask::from_bits(0b101));
        assert_eq!(sink.frame(), ControllerFrame::default());

        sink.commit().unwrap();
        assert_eq!(sink.frame().throttle, 0x8000);
        assert_eq!(sink.frame().buttons.bits(), 0b101);
        assert_eq!(sink.commits(), 1);
    }

    #[test]
    fn test_recording_sink_failure() {
        let mut sink = mocks::RecordingSink::new();
        sink.fail_commits = true;
        assert!(sink.commit().is_err());
        assert!(sink.frames.is_empty());
    }
}

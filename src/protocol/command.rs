//! # Command Types and Wire Constants
//!
//! One datagram carries one command. The wire format is plain UTF-8 text:
//!
//! | Message | Command |
//! |---------|---------|
//! | `btn:<name>_down` / `btn:<name>_up` | [`Command::ButtonEvent`] |
//! | `throttle:<0..100>` | [`Command::Throttle`] |
//! | `manual_yaw:<0..100>` | [`Command::ManualYaw`] |
//! | `mode:f1` / `mode:acc` | [`Command::ModeSwitch`] |
//! | `lr` | [`Command::ReferenceReset`] |
//! | `kr` | [`Command::KeepReferenceToggle`] |
//! | `<roll>,<pitch>,<yaw>` | [`Command::AxisSample`] |

use thiserror::Error;

use crate::control::steering::Mode;

/// Prefix of a button edge event.
pub const BUTTON_PREFIX: &str = "btn:";
/// Suffix marking a button press.
pub const BUTTON_DOWN_SUFFIX: &str = "_down";
/// Suffix marking a button release.
pub const BUTTON_UP_SUFFIX: &str = "_up";
/// Prefix of an absolute throttle percentage.
pub const THROTTLE_PREFIX: &str = "throttle:";
/// Prefix of an absolute yaw-rotation percentage.
pub const MANUAL_YAW_PREFIX: &str = "manual_yaw:";
/// Prefix of a steering mode switch.
pub const MODE_PREFIX: &str = "mode:";
/// Reset the reference frame and steering accumulator.
pub const REFERENCE_RESET: &str = "lr";
/// Toggle the keep-reference freeze.
pub const KEEP_REFERENCE_TOGGLE: &str = "kr";
/// Field separator of an orientation sample.
pub const SAMPLE_SEPARATOR: char = ',';
/// Number of fields in an orientation sample (roll, pitch, yaw).
pub const SAMPLE_FIELD_COUNT: usize = 3;

/// One orientation sample in degrees.
///
/// Angles arrive on a wrapping `(-180, 180]` scale. `yaw` is carried for
/// protocol compatibility and does not drive any output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSample {
    /// Roll angle, drives the X axis.
    pub roll: f64,
    /// Pitch angle, drives the steering (Y) axis.
    pub pitch: f64,
    /// Yaw angle, unused.
    pub yaw: f64,
}

impl AxisSample {
    /// Creates a sample from its three angles.
    #[must_use]
    pub fn new(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self { roll, pitch, yaw }
    }
}

/// A decoded command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// A named button was pressed or released.
    ButtonEvent {
        /// Button name as sent by the client (e.g. `gear`, `b7`).
        name: String,
        /// `true` on `_down`, `false` on `_up`.
        pressed: bool,
    },
    /// Absolute throttle, nominally 0..=100 percent.
    Throttle {
        /// Throttle percentage.
        percent: i32,
    },
    /// Absolute yaw rotation, nominally 0..=100 percent.
    ManualYaw {
        /// Yaw-rotation percentage.
        percent: i32,
    },
    /// Switch the steering range.
    ModeSwitch {
        /// New steering mode.
        mode: Mode,
    },
    /// Forget the reference frame and re-center steering.
    ReferenceReset,
    /// Flip the keep-reference freeze.
    KeepReferenceToggle,
    /// Orientation sample.
    AxisSample(AxisSample),
}

/// Why a datagram did not decode to a command.
///
/// Every variant is recoverable: the datagram is dropped and the loop moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Datagram bytes are not valid UTF-8.
    #[error("datagram is not valid UTF-8")]
    InvalidUtf8,

    /// Nothing left after trimming.
    #[error("empty datagram")]
    Empty,

    /// Button event without a name or without a `_down`/`_up` suffix.
    #[error("malformed button event: {0:?}")]
    MalformedButton(String),

    /// A numeric field that does not parse.
    #[error("invalid {field} value: {value:?}")]
    InvalidNumber {
        /// Which field was being parsed.
        field: &'static str,
        /// The offending text.
        value: String,
    },

    /// `mode:` with a name other than `f1` or `acc`.
    #[error("unknown mode: {0:?}")]
    UnknownMode(String),

    /// Comma-bearing line that is not exactly three fields.
    #[error("expected 3 sample fields, got {0}")]
    SampleFieldCount(usize),

    /// Anything else.
    #[error("unrecognized command: {0:?}")]
    Unrecognized(String),
}

//! # Command Decoder
//!
//! Decodes one text datagram into a [`Command`].
//!
//! Decoding keeps no state and never panics. A datagram that does not
//! decode yields a [`ParseError`] which the dispatch loop treats as a
//! dropped datagram.

use super::command::*;
use crate::control::steering::Mode;

/// Decode raw datagram bytes.
///
/// # Errors
///
/// Returns [`ParseError::InvalidUtf8`] if the bytes are not UTF-8, otherwise
/// whatever [`parse_line`] reports.
///
/// # Examples
///
/// ```
/// use tilt_bridge::protocol::{parse_datagram, Command};
///
/// assert_eq!(parse_datagram(b"lr\n"), Ok(Command::ReferenceReset));
/// assert!(parse_datagram(&[0xFF, 0xFE]).is_err());
/// ```
pub fn parse_datagram(bytes: &[u8]) -> Result<Command, ParseError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ParseError::InvalidUtf8)?;
    parse_line(text)
}

/// Decode one text line. Surrounding whitespace is ignored.
///
/// # Errors
///
/// Returns a [`ParseError`] describing why the line is not a command.
///
/// # Examples
///
/// ```
/// use tilt_bridge::protocol::{parse_line, AxisSample, Command};
///
/// assert_eq!(
///     parse_line("btn:gear_down"),
///     Ok(Command::ButtonEvent { name: "gear".to_string(), pressed: true })
/// );
/// assert_eq!(
///     parse_line("10.0,5.0,0.0"),
///     Ok(Command::AxisSample(AxisSample::new(10.0, 5.0, 0.0)))
/// );
/// assert!(parse_line("throttle:abc").is_err());
/// ```
pub fn parse_line(line: &str) -> Result<Command, ParseError> {
    let msg = line.trim();
    if msg.is_empty() {
        return Err(ParseError::Empty);
    }

    if let Some(rest) = msg.strip_prefix(BUTTON_PREFIX) {
        return parse_button(rest);
    }

    if let Some(rest) = msg.strip_prefix(THROTTLE_PREFIX) {
        let percent = parse_percent(rest, "throttle")?;
        return Ok(Command::Throttle { percent });
    }

    if let Some(rest) = msg.strip_prefix(MANUAL_YAW_PREFIX) {
        let percent = parse_percent(rest, "manual_yaw")?;
        return Ok(Command::ManualYaw { percent });
    }

    if let Some(rest) = msg.strip_prefix(MODE_PREFIX) {
        let mode = match rest {
            "f1" => Mode::F1,
            "acc" => Mode::Acc,
            other => return Err(ParseError::UnknownMode(other.to_string())),
        };
        return Ok(Command::ModeSwitch { mode });
    }

    match msg {
        REFERENCE_RESET => return Ok(Command::ReferenceReset),
        KEEP_REFERENCE_TOGGLE => return Ok(Command::KeepReferenceToggle),
        _ => {}
    }

    if msg.contains(SAMPLE_SEPARATOR) {
        return parse_sample(msg).map(Command::AxisSample);
    }

    Err(ParseError::Unrecognized(msg.to_string()))
}

/// `<name>_down` or `<name>_up`.
fn parse_button(rest: &str) -> Result<Command, ParseError> {
    let (name, pressed) = if let Some(name) = rest.strip_suffix(BUTTON_DOWN_SUFFIX) {
        (name, true)
    } else if let Some(name) = rest.strip_suffix(BUTTON_UP_SUFFIX) {
        (name, false)
    } else {
        return Err(ParseError::MalformedButton(rest.to_string()));
    };

    if name.is_empty() {
        return Err(ParseError::MalformedButton(rest.to_string()));
    }

    Ok(Command::ButtonEvent {
        name: name.to_string(),
        pressed,
    })
}

fn parse_percent(value: &str, field: &'static str) -> Result<i32, ParseError> {
    value.trim().parse::<i32>().map_err(|_| ParseError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

/// `<roll>,<pitch>,<yaw>`, all finite.
fn parse_sample(msg: &str) -> Result<AxisSample, ParseError> {
    let fields: Vec<&str> = msg.split(SAMPLE_SEPARATOR).collect();
    if fields.len() != SAMPLE_FIELD_COUNT {
        return Err(ParseError::SampleFieldCount(fields.len()));
    }

    let roll = parse_angle(fields[0], "roll")?;
    let pitch = parse_angle(fields[1], "pitch")?;
    let yaw = parse_angle(fields[2], "yaw")?;

    Ok(AxisSample::new(roll, pitch, yaw))
}

fn parse_angle(value: &str, field: &'static str) -> Result<f64, ParseError> {
    match value.trim().parse::<f64>() {
        // NaN and infinity are rejected
        Ok(angle) if angle.is_finite() => Ok(angle),
        _ => Err(ParseError::InvalidNumber {
            field,
            value: value.to_string(),
        }),
    }
}

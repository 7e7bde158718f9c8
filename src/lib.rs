//! # Tilt Bridge Library
//!
//! Turn a phone's motion sensors into a virtual game controller.
//!
//! This library receives line-oriented UDP commands (orientation samples,
//! button edges, throttle and mode changes) and conditions them into the
//! axes and buttons of a virtual joystick.

pub mod config;
pub mod control;
pub mod dispatch;
pub mod error;
pub mod net;
pub mod output;
pub mod protocol;

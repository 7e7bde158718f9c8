//! # Command Protocol Module
//!
//! Text datagram protocol spoken by the phone-side sender.
//!
//! This module handles:
//! - Command types and wire constants
//! - Decoding one UTF-8 datagram into exactly one [`Command`]
//! - Reporting malformed input as a [`ParseError`] instead of failing

pub mod command;
pub mod parser;

pub use command::{AxisSample, Command, ParseError};
pub use parser::{parse_datagram, parse_line};

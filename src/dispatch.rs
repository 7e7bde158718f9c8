//! # Command Dispatcher
//!
//! Owns every piece of session state and routes decoded commands to the
//! control components, then pushes the results to the output sink.
//!
//! | Command | Effect | Sink |
//! |---------|--------|------|
//! | `ButtonEvent` | Update one bit of the button mask | mask, commit |
//! | `Throttle` | Percent to axis | throttle, commit |
//! | `ManualYaw` | Percent to axis | yaw rotation, commit |
//! | `ModeSwitch` | Set mode, re-center steering | - |
//! | `ReferenceReset` | Drop reference, re-center steering | - |
//! | `KeepReferenceToggle` | Flip the freeze flag | - |
//! | `AxisSample` | Lock reference, roll to X, pitch to Y | X + Y, one commit |
//!
//! ## Thread Safety
//!
//! `Dispatcher` is not thread-safe. It is driven by a single receive loop and
//! each command is fully applied before the next one is handled.

use tracing::{debug, info};

use crate::config::Config;
use crate::control::buttons::{ButtonAggregator, ButtonMap};
use crate::control::normalize::{normalize, percent_to_axis, ROLL_RANGE_SPAN_DEG};
use crate::control::reference::ReferenceFrame;
use crate::control::steering::{Mode, SteeringIntegrator, DEFAULT_DEADZONE_DEG};
use crate::error::Result;
use crate::output::{Axis, OutputSink};
use crate::protocol::{parse_datagram, AxisSample, Command};

/// What a datagram turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A command was decoded and applied.
    Applied,
    /// The datagram did not decode and was dropped.
    Dropped,
}

/// Running datagram counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Datagrams handed to the dispatcher.
    pub received: u64,
    /// Datagrams that decoded to a command.
    pub applied: u64,
    /// Datagrams that did not decode.
    pub dropped: u64,
    /// Sink commits that failed.
    pub sink_errors: u64,
}

/// Session state plus routing.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    reference: ReferenceFrame,
    steering: SteeringIntegrator,
    buttons: ButtonAggregator,
    roll_range_span: f64,
    stats: DispatchStats,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(
            Mode::default(),
            DEFAULT_DEADZONE_DEG,
            ROLL_RANGE_SPAN_DEG,
            ButtonMap::new(),
        )
    }
}

impl Dispatcher {
    /// Creates a dispatcher with an unset reference and no buttons held.
    ///
    /// # Arguments
    ///
    /// * `mode` - Initial steering mode
    /// * `deadzone` - Steering deadzone (degrees)
    /// * `roll_range_span` - Roll half-range (degrees)
    /// * `buttons` - Button name table
    #[must_use]
    pub fn new(mode: Mode, deadzone: f64, roll_range_span: f64, buttons: ButtonMap) -> Self {
        Self {
            reference: ReferenceFrame::new(),
            steering: SteeringIntegrator::with_deadzone(mode, deadzone),
            buttons: ButtonAggregator::new(buttons),
            roll_range_span,
            stats: DispatchStats::default(),
        }
    }

    /// Creates a dispatcher from loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.steering.default_mode,
            config.steering.deadzone_deg,
            config.roll.range_span_deg,
            ButtonMap::with_overrides(&config.buttons),
        )
    }

    /// Reference frame state.
    #[must_use]
    pub fn reference(&self) -> &ReferenceFrame {
        &self.reference
    }

    /// Steering integrator state.
    #[must_use]
    pub fn steering(&self) -> &SteeringIntegrator {
        &self.steering
    }

    /// Button state.
    #[must_use]
    pub fn buttons(&self) -> &ButtonAggregator {
        &self.buttons
    }

    /// Datagram counters so far.
    #[must_use]
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Decodes and applies one datagram.
    ///
    /// Undecodable datagrams are counted and dropped. They are not errors.
    ///
    /// # Errors
    ///
    /// Returns the sink's commit error. Session state has already been
    /// updated when this happens.
    pub fn handle_datagram(&mut self, bytes: &[u8], sink: &mut dyn OutputSink) -> Result<Outcome> {
        self.stats.received += 1;

        let command = match parse_datagram(bytes) {
            Ok(command) => command,
            Err(e) => {
                self.stats.dropped += 1;
                debug!("Dropped datagram: {}", e);
                return Ok(Outcome::Dropped);
            }
        };

        self.stats.applied += 1;
        if let Err(e) = self.dispatch(command, sink) {
            self.stats.sink_errors += 1;
            return Err(e);
        }
        Ok(Outcome::Applied)
    }

    /// Applies one command.
    ///
    /// # Errors
    ///
    /// Returns the sink's commit error.
    pub fn dispatch(&mut self, command: Command, sink: &mut dyn OutputSink) -> Result<()> {
        match command {
            Command::ButtonEvent { name, pressed } => {
                let Some(mask) = self.buttons.apply(&name, pressed) else {
                    debug!("Ignoring unknown button '{}'", name);
                    return Ok(());
                };
                info!(
                    "[INPUT] Button '{}' {}",
                    name,
                    if pressed { "pressed" } else { "released" }
                );
                sink.set_buttons(mask);
                sink.commit()
            }

            Command::Throttle { percent } => {
                sink.set_axis(Axis::Throttle, percent_to_axis(percent));
                sink.commit()
            }

            Command::ManualYaw { percent } => {
                sink.set_axis(Axis::YawRotation, percent_to_axis(percent));
                sink.commit()
            }

            Command::ModeSwitch { mode } => {
                self.steering.set_mode(mode);
                info!(
                    "Switched to {} mode (steering span ±{})",
                    mode,
                    mode.range_span()
                );
                Ok(())
            }

            Command::ReferenceReset => {
                self.reference.reset();
                self.steering.reset();
                info!("Reference reset requested");
                Ok(())
            }

            Command::KeepReferenceToggle => {
                let keep = self.reference.toggle_keep_reference();
                info!("Keep reference {}", if keep { "enabled" } else { "disabled" });
                Ok(())
            }

            Command::AxisSample(sample) => self.apply_sample(&sample, sink),
        }
    }

    /// Roll to X against the reference, pitch through the integrator to Y.
    ///
    /// While frozen the wheel holds its angle and follows the live pitch
    /// only as an anchor, so leaving the freeze does not move it.
    fn apply_sample(&mut self, sample: &AxisSample, sink: &mut dyn OutputSink) -> Result<()> {
        let reference = self.reference.observe(sample);
        let (roll, _) = self.reference.effective(sample);

        let x = normalize(roll, reference.roll, self.roll_range_span);
        let y = if self.reference.is_frozen() {
            self.steering.hold(sample.pitch)
        } else {
            self.steering.update(sample.pitch)
        };

        sink.set_axis(Axis::X, x);
        sink.set_axis(Axis::Y, y);
        sink.commit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::normalize::{AXIS_CENTER, AXIS_MAX, AXIS_MIN};
    use crate::control::reference::Reference;
    use crate::error::BridgeError;
    use crate::output::mocks::RecordingSink;
    use crate::output::MockOutputSink;
    use mockall::predicate::eq;

    /// Feeds text lines through the dispatcher.
    fn feed(dispatcher: &mut Dispatcher, sink: &mut RecordingSink, lines: &[&str]) {
        for line in lines {
            dispatcher.handle_datagram(line.as_bytes(), sink).unwrap();
        }
    }

    // ==================== Sample Routing Tests ====================

    #[test]
    fn test_first_sample_locks_and_centers() {
        let mut dispatcher = Dispatcher::default();
        let mut sink = RecordingSink::new();

        feed(&mut dispatcher, &mut sink, &["10.0,5.0,0.0"]);

        assert_eq!(
            dispatcher.reference().reference(),
            Some(Reference { roll: 10.0, pitch: 5.0 })
        );
        let frame = sink.last().unwrap();
        assert_eq!(frame.x, AXIS_CENTER);
        assert_eq!(frame.y, AXIS_CENTER);
    }

    #[test]
    fn test_acc_mode_identical_samples_stay_centered() {
        let mut dispatcher = Dispatcher::default();
        let mut sink = RecordingSink::new();

        feed(
            &mut dispatcher,
            &mut sink,
            &["mode:acc", "10.0,5.0,0.0", "10.0,5.0,0.0"],
        );

        assert_eq!(dispatcher.steering().mode(), Mode::Acc);
        assert_eq!(sink.frames.len(), 2);
        assert_eq!(sink.frames[0].y, AXIS_CENTER);
        assert_eq!(sink.frames[1].y, AXIS_CENTER);
        assert_eq!(dispatcher.steering().total_steering(), 0.0);
    }

    #[test]
    fn test_roll_relative_to_reference() {
        let mut dispatcher = Dispatcher::default();
        let mut sink = RecordingSink::new();

        feed(&mut dispatcher, &mut sink, &["20.0,0.0,0.0", "65.0,0.0,0.0"]);
        assert_eq!(sink.last().unwrap().x, 0x6000);

        feed(&mut dispatcher, &mut sink, &["-100.0,0.0,0.0"]);
        assert_eq!(sink.last().unwrap().x, AXIS_MIN);
    }

    #[test]
    fn test_pitch_integrates_into_y() {
        let mut dispatcher = Dispatcher::default();
        let mut sink = RecordingSink::new();

        feed(
            &mut dispatcher,
            &mut sink,
            &["0.0,0.0,0.0", "0.0,90.0,0.0", "0.0,170.0,0.0", "0.0,-110.0,0.0"],
        );

        // 90 + 80 + 80 saturates the ±180 F1 range
        assert_eq!(dispatcher.steering().total_steering(), 180.0);
        assert_eq!(sink.last().unwrap().y, AXIS_MAX);
    }

    #[test]
    fn test_yaw_is_ignored() {
        let mut dispatcher = Dispatcher::default();
        let mut sink = RecordingSink::new();

        feed(&mut dispatcher, &mut sink, &["1.0,2.0,0.0", "1.0,2.0,170.0"]);
        assert_eq!(sink.frames[0], sink.frames[1]);
    }

    // ==================== Reference Tests ====================

    #[test]
    fn test_reference_reset_mid_stream() {
        let mut dispatcher = Dispatcher::default();
        let mut sink = RecordingSink::new();

        feed(
            &mut dispatcher,
            &mut sink,
            &["0.0,0.0,0.0", "10.0,30.0,0.0", "10.0,60.0,0.0"],
        );
        assert!(dispatcher.steering().total_steering() > 0.0);

        feed(&mut dispatcher, &mut sink, &["lr"]);
        assert!(!dispatcher.reference().is_locked());
        assert_eq!(dispatcher.steering().total_steering(), 0.0);
        assert!(!dispatcher.steering().is_anchored());

        // Next sample becomes the new zero
        feed(&mut dispatcher, &mut sink, &["40.0,-20.0,0.0"]);
        assert_eq!(
            dispatcher.reference().reference(),
            Some(Reference { roll: 40.0, pitch: -20.0 })
        );
        let frame = sink.last().unwrap();
        assert_eq!(frame.x, AXIS_CENTER);
        assert_eq!(frame.y, AXIS_CENTER);
    }

    #[test]
    fn test_keep_reference_freezes_roll() {
        let mut dispatcher = Dispatcher::default();
        let mut sink = RecordingSink::new();

        feed(&mut dispatcher, &mut sink, &["10.0,5.0,0.0", "kr", "70.0,5.0,0.0"]);
        assert!(dispatcher.reference().keep_reference());
        assert_eq!(sink.last().unwrap().x, AXIS_CENTER);

        feed(&mut dispatcher, &mut sink, &["kr", "100.0,5.0,0.0"]);
        assert!(!dispatcher.reference().keep_reference());
        assert_eq!(sink.last().unwrap().x, AXIS_MAX);
    }

    #[test]
    fn test_keep_reference_holds_steering() {
        let mut dispatcher = Dispatcher::default();
        let mut sink = RecordingSink::new();

        feed(&mut dispatcher, &mut sink, &["0.0,5.0,0.0", "0.0,20.0,0.0", "kr", "0.0,50.0,0.0"]);
        assert_eq!(dispatcher.steering().total_steering(), 15.0);
        let held = sink.last().unwrap().y;

        // Release at the same pitch: no jump
        feed(&mut dispatcher, &mut sink, &["kr", "0.0,50.0,0.0"]);
        assert_eq!(dispatcher.steering().total_steering(), 15.0);
        assert_eq!(sink.last().unwrap().y, held);

        // Motion after release integrates from the live pitch
        feed(&mut dispatcher, &mut sink, &["0.0,60.0,0.0"]);
        assert_eq!(dispatcher.steering().total_steering(), 25.0);
    }

    #[test]
    fn test_keep_reference_round_trip_at_full_lock() {
        let mut dispatcher = Dispatcher::default();
        let mut sink = RecordingSink::new();

        feed(&mut dispatcher, &mut sink, &["0.0,0.0,0.0"]);
        let mut pitch = 0.0_f64;
        for _ in 0..130 {
            pitch += 2.0;
            let line = format!("0.0,{},0.0", pitch);
            feed(&mut dispatcher, &mut sink, &[line.as_str()]);
        }
        assert_eq!(dispatcher.steering().total_steering(), 180.0);
        assert_eq!(sink.last().unwrap().y, AXIS_MAX);

        let still = format!("0.0,{},0.0", pitch);
        feed(&mut dispatcher, &mut sink, &["kr", still.as_str()]);
        assert_eq!(sink.last().unwrap().y, AXIS_MAX);

        feed(&mut dispatcher, &mut sink, &["kr", still.as_str()]);
        assert_eq!(sink.last().unwrap().y, AXIS_MAX);
        assert_eq!(dispatcher.steering().total_steering(), 180.0);
    }

    // ==================== Mode Tests ====================

    #[test]
    fn test_mode_switch_resets_steering_only() {
        let mut dispatcher = Dispatcher::default();
        let mut sink = RecordingSink::new();

        feed(&mut dispatcher, &mut sink, &["0.0,0.0,0.0", "0.0,45.0,0.0", "mode:acc"]);
        assert_eq!(dispatcher.steering().total_steering(), 0.0);
        assert!(!dispatcher.steering().is_anchored());
        assert!(dispatcher.reference().is_locked());
    }

    #[test]
    fn test_mode_switch_does_not_commit() {
        let mut dispatcher = Dispatcher::default();
        let mut sink = RecordingSink::new();

        feed(&mut dispatcher, &mut sink, &["mode:f1", "mode:acc", "lr", "kr"]);
        assert!(sink.frames.is_empty());
    }

    // ==================== Button Tests ====================

    #[test]
    fn test_button_sequence_updates_mask() {
        let mut dispatcher = Dispatcher::default();
        let mut sink = RecordingSink::new();

        feed(
            &mut dispatcher,
            &mut sink,
            &["btn:gear_down", "btn:b2_down", "btn:gear_up"],
        );

        assert_eq!(sink.frames.len(), 3);
        let mask = sink.last().unwrap().buttons;
        assert!(mask.is_pressed(2));
        assert!(!mask.is_pressed(1));
    }

    #[test]
    fn test_unknown_button_no_change() {
        let mut dispatcher = Dispatcher::default();
        let mut sink = RecordingSink::new();

        feed(&mut dispatcher, &mut sink, &["btn:spoiler_down", "btn:unknownbtn_down"]);

        // Unknown button produced no commit and left the mask alone
        assert_eq!(sink.frames.len(), 1);
        assert_eq!(dispatcher.buttons().mask().bits(), 1 << 3);
        assert_eq!(dispatcher.stats().dropped, 0);
    }

    #[test]
    fn test_configured_button() {
        let mut config = Config::default();
        config.buttons.insert("horn".to_string(), 30);
        let mut dispatcher = Dispatcher::from_config(&config);
        let mut sink = RecordingSink::new();

        feed(&mut dispatcher, &mut sink, &["btn:horn_down"]);
        assert!(sink.last().unwrap().buttons.is_pressed(30));
    }

    // ==================== Percent Axis Tests ====================

    #[test]
    fn test_throttle_and_manual_yaw_with_mock() {
        let mut sink = MockOutputSink::new();
        sink.expect_set_axis()
            .with(eq(Axis::Throttle), eq(0x6000))
            .times(1)
            .return_const(());
        sink.expect_set_axis()
            .with(eq(Axis::YawRotation), eq(AXIS_MAX))
            .times(1)
            .return_const(());
        sink.expect_commit().times(2).returning(|| Ok(()));

        let mut dispatcher = Dispatcher::default();
        dispatcher.handle_datagram(b"throttle:75", &mut sink).unwrap();
        dispatcher.handle_datagram(b"manual_yaw:100", &mut sink).unwrap();
    }

    #[test]
    fn test_sample_sets_both_axes_then_single_commit() {
        let mut sink = MockOutputSink::new();
        let mut seq = mockall::Sequence::new();
        sink.expect_set_axis()
            .with(eq(Axis::X), eq(AXIS_CENTER))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        sink.expect_set_axis()
            .with(eq(Axis::Y), eq(AXIS_CENTER))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        sink.expect_commit()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));

        let mut dispatcher = Dispatcher::default();
        dispatcher.handle_datagram(b"3.0,4.0,5.0", &mut sink).unwrap();
    }

    // ==================== Error Handling Tests ====================

    #[test]
    fn test_garbage_is_dropped_without_touching_sink() {
        let mut sink = MockOutputSink::new();
        sink.expect_set_axis().never();
        sink.expect_set_buttons().never();
        sink.expect_commit().never();

        let mut dispatcher = Dispatcher::default();
        let datagrams: [&[u8]; 6] = [b"hello", b"throttle:x", b"1,2", b"a,b,c", b"", &[0xFF, 0x00]];
        for datagram in datagrams {
            let outcome = dispatcher.handle_datagram(datagram, &mut sink).unwrap();
            assert_eq!(outcome, Outcome::Dropped);
        }

        let stats = dispatcher.stats();
        assert_eq!(stats.received, 6);
        assert_eq!(stats.dropped, 6);
        assert_eq!(stats.applied, 0);
        assert!(!dispatcher.reference().is_locked());
    }

    #[test]
    fn test_sink_failure_is_reported_and_state_kept() {
        let mut dispatcher = Dispatcher::default();
        let mut sink = RecordingSink::new();
        sink.fail_commits = true;

        let result = dispatcher.handle_datagram(b"10.0,5.0,0.0", &mut sink);
        assert!(matches!(result, Err(BridgeError::Output(_))));
        assert!(dispatcher.reference().is_locked());
        assert_eq!(dispatcher.stats().sink_errors, 1);

        // Loop keeps going once the device recovers
        sink.fail_commits = false;
        let outcome = dispatcher.handle_datagram(b"10.0,5.0,0.0", &mut sink).unwrap();
        assert_eq!(outcome, Outcome::Applied);
        assert_eq!(sink.frames.len(), 1);
    }

    #[test]
    fn test_stats_count_applied() {
        let mut dispatcher = Dispatcher::default();
        let mut sink = RecordingSink::new();
        feed(&mut dispatcher, &mut sink, &["lr", "kr", "nope", "0,0,0"]);

        let stats = dispatcher.stats();
        assert_eq!(stats.received, 4);
        assert_eq!(stats.applied, 3);
        assert_eq!(stats.dropped, 1);
    }
}

//! # uinput Virtual Controller
//!
//! Creates a virtual joystick through `/dev/uinput` that games see as a
//! regular controller.
//!
//! ## Device Layout
//!
//! | Field | evdev Code | Range |
//! |-------|------------|-------|
//! | X (roll) | ABS_X | 0-32768 |
//! | Y (steering) | ABS_Y | 0-32768 |
//! | Throttle | ABS_RX | 0-32768 |
//! | Yaw rotation | ABS_RY | 0-32768 |
//! | Buttons 1-16 | BTN_TRIGGER .. BTN_DEAD | 0/1 |
//! | Buttons 17-32 | BTN_TRIGGER_HAPPY1 .. BTN_TRIGGER_HAPPY16 | 0/1 |
//!
//! The first sixteen buttons sit in the joystick button block so udev tags
//! the device as a joystick.

use evdev::{
    uinput::{VirtualDevice, VirtualDeviceBuilder},
    AbsInfo, AbsoluteAxisType, AttributeSet, EventType, InputEvent, Key, UinputAbsSetup,
};
use tracing::{debug, info};

use super::{Axis, ControllerFrame, OutputSink};
use crate::control::buttons::{ButtonMask, MAX_BUTTON_ID};
use crate::control::normalize::{AXIS_MAX, AXIS_MIN};
use crate::error::{BridgeError, Result};

/// Default device name shown by `evtest` and game controller settings.
pub const DEFAULT_DEVICE_NAME: &str = "Tilt Bridge Controller";

/// Buttons mapped into the BTN_JOYSTICK block.
const JOYSTICK_BLOCK_BUTTONS: u8 = 16;

/// evdev axis code for a controller axis.
#[must_use]
pub fn axis_code(axis: Axis) -> AbsoluteAxisType {
    match axis {
        Axis::X => AbsoluteAxisType::ABS_X,
        Axis::Y => AbsoluteAxisType::ABS_Y,
        Axis::Throttle => AbsoluteAxisType::ABS_RX,
        Axis::YawRotation => AbsoluteAxisType::ABS_RY,
    }
}

/// evdev key code for a 1-based button id, `None` outside `1..=32`.
#[must_use]
pub fn button_code(id: u8) -> Option<Key> {
    if !(1..=MAX_BUTTON_ID).contains(&id) {
        return None;
    }

    let code = if id <= JOYSTICK_BLOCK_BUTTONS {
        Key::BTN_TRIGGER.code() + u16::from(id - 1)
    } else {
        Key::BTN_TRIGGER_HAPPY1.code() + u16::from(id - JOYSTICK_BLOCK_BUTTONS - 1)
    };
    Some(Key::new(code))
}

/// Events needed to move the device from `from` to `to`.
///
/// Only changed axes and changed button bits produce events.
#[must_use]
pub fn diff_events(from: &ControllerFrame, to: &ControllerFrame) -> Vec<InputEvent> {
    let mut events = Vec::new();

    for axis in Axis::ALL {
        let value = to.axis(axis);
        if from.axis(axis) != value {
            events.push(InputEvent::new(
                EventType::ABSOLUTE,
                axis_code(axis).0,
                i32::from(value),
            ));
        }
    }

    let changed = from.buttons.bits() ^ to.buttons.bits();
    if changed != 0 {
        for id in 1..=MAX_BUTTON_ID {
            if changed & (1u32 << (id - 1)) == 0 {
                continue;
            }
            if let Some(key) = button_code(id) {
                let pressed = to.buttons.is_pressed(id);
                events.push(InputEvent::new(EventType::KEY, key.code(), i32::from(pressed)));
            }
        }
    }

    events
}

/// Virtual joystick backed by uinput.
pub struct VirtualController {
    device: VirtualDevice,
    pending: ControllerFrame,
    committed: ControllerFrame,
}

impl std::fmt::Debug for VirtualController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualController")
            .field("committed", &self.committed)
            .finish_non_exhaustive()
    }
}

impl VirtualController {
    /// Creates the virtual device.
    ///
    /// # Arguments
    ///
    /// * `name` - Device name
    ///
    /// # Errors
    ///
    /// Returns error if `/dev/uinput` cannot be opened or the device cannot be
    /// registered (usually a permissions problem).
    pub fn new(name: &str) -> Result<Self> {
        let initial = ControllerFrame::default();

        let mut keys = AttributeSet::<Key>::new();
        for id in 1..=MAX_BUTTON_ID {
            if let Some(key) = button_code(id) {
                keys.insert(key);
            }
        }

        let mut builder = VirtualDeviceBuilder::new()
            .map_err(|e| BridgeError::Output(format!("Failed to open /dev/uinput: {}", e)))?
            .name(name)
            .with_keys(&keys)
            .map_err(|e| BridgeError::Output(format!("Failed to register buttons: {}", e)))?;

        for axis in Axis::ALL {
            let info = AbsInfo::new(
                i32::from(initial.axis(axis)),
                i32::from(AXIS_MIN),
                i32::from(AXIS_MAX),
                0,
                0,
                0,
            );
            builder = builder
                .with_absolute_axis(&UinputAbsSetup::new(axis_code(axis), info))
                .map_err(|e| BridgeError::Output(format!("Failed to register {:?} axis: {}", axis, e)))?;
        }

        let device = builder
            .build()
            .map_err(|e| BridgeError::Output(format!("Failed to create virtual device: {}", e)))?;

        info!("Created virtual controller: {}", name);

        Ok(Self {
            device,
            pending: initial,
            committed: initial,
        })
    }

    /// Device node path (e.g. `/dev/input/event21`), if it can be found.
    pub fn device_path(&mut self) -> Option<std::path::PathBuf> {
        self.device
            .enumerate_dev_nodes_blocking()
            .ok()?
            .next()?
            .ok()
    }
}

impl OutputSink for VirtualController {
    fn set_axis(&mut self, axis: Axis, value: u16) {
        self.pending.set_axis(axis, value.min(AXIS_MAX));
    }

    fn set_buttons(&mut self, mask: ButtonMask) {
        self.pending.buttons = mask;
    }

    fn commit(&mut self) -> Result<()> {
        let events = diff_events(&self.committed, &self.pending);
        if events.is_empty() {
            return Ok(());
        }

        // emit() appends the SYN_REPORT that makes the batch atomic
        self.device
            .emit(&events)
            .map_err(|e| BridgeError::Output(format!("Failed to emit events: {}", e)))?;

        debug!("Emitted {} controller events", events.len());
        self.committed = self.pending;
        Ok(())
    }
}

//! # Button Aggregator
//!
//! Maps named button events onto a persistent 32-bit button mask.
//!
//! ## Default Button Table
//!
//! | Name | Id | | Name | Id |
//! |------|----|-|------|----|
//! | `gear` | 1 | | `b5` | 13 |
//! | `b2` | 2 | | `b8` | 14 |
//! | `brakes` | 3 | | `b9` | 15 |
//! | `spoiler` | 4 | | `b10` | 16 |
//! | `flapsup` | 5 | | `b11` | 17 |
//! | `flapsdown` | 6 | | `b12` | 18 |
//! | `b7` | 7 | | `b13` | 19 |
//! | `b6` | 8 | | `b14` | 20 |
//! | `b0` | 9 | | `b15` | 21 |
//! | `b1` | 10 | | `b16` | 22 |
//! | `b3` | 11 | | `b17`..`b22` | 23..28 |
//! | `b4` | 12 | | | |
//!
//! Ids are 1-based: id `n` is bit `n - 1` of the mask.

use std::collections::HashMap;
use std::fmt;

/// Highest supported button id.
pub const MAX_BUTTON_ID: u8 = 32;

/// Built-in name to id assignments.
pub const DEFAULT_BUTTONS: &[(&str, u8)] = &[
    ("gear", 1),
    ("b2", 2),
    ("brakes", 3),
    ("spoiler", 4),
    ("flapsup", 5),
    ("flapsdown", 6),
    ("b7", 7),
    ("b6", 8),
    ("b0", 9),
    ("b1", 10),
    ("b3", 11),
    ("b4", 12),
    ("b5", 13),
    ("b8", 14),
    ("b9", 15),
    ("b10", 16),
    ("b11", 17),
    ("b12", 18),
    ("b13", 19),
    ("b14", 20),
    ("b15", 21),
    ("b16", 22),
    ("b17", 23),
    ("b18", 24),
    ("b19", 25),
    ("b20", 26),
    ("b21", 27),
    ("b22", 28),
];

/// Held-button bitmask.
///
/// # Examples
///
/// ```
/// use tilt_bridge::control::buttons::ButtonMask;
///
/// let mut mask = ButtonMask::default();
/// mask.set(2, true);
/// assert!(mask.is_pressed(2));
/// assert_eq!(mask.bits(), 0b10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonMask(u32);

impl ButtonMask {
    /// Wraps raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits, bit `n - 1` for id `n`.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Sets or clears one button. Ids outside `1..=32` are ignored.
    pub fn set(&mut self, id: u8, pressed: bool) {
        if !(1..=MAX_BUTTON_ID).contains(&id) {
            return;
        }
        let bit = 1u32 << (id - 1);
        if pressed {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }

    /// Whether button `id` is held.
    #[must_use]
    pub fn is_pressed(self, id: u8) -> bool {
        (1..=MAX_BUTTON_ID).contains(&id) && self.0 & (1u32 << (id - 1)) != 0
    }
}

impl fmt::Display for ButtonMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Name to button id lookup.
#[derive(Debug, Clone)]
pub struct ButtonMap {
    ids: HashMap<String, u8>,
}

impl Default for ButtonMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ButtonMap {
    /// Creates the built-in table.
    #[must_use]
    pub fn new() -> Self {
        let ids = DEFAULT_BUTTONS
            .iter()
            .map(|&(name, id)| (name.to_string(), id))
            .collect();
        Self { ids }
    }

    /// Built-in table plus `overrides`, which win on name clashes.
    ///
    /// Entries with ids outside `1..=32` are skipped.
    #[must_use]
    pub fn with_overrides<'a, I>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a u8)>,
    {
        let mut map = Self::new();
        for (name, &id) in overrides {
            if (1..=MAX_BUTTON_ID).contains(&id) {
                map.ids.insert(name.clone(), id);
            }
        }
        map
    }

    /// Id for `name`, if known.
    #[must_use]
    pub fn id(&self, name: &str) -> Option<u8> {
        self.ids.get(name).copied()
    }

    /// Number of known names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Applies button edges to a persistent mask.
#[derive(Debug, Clone, Default)]
pub struct ButtonAggregator {
    map: ButtonMap,
    mask: ButtonMask,
}

impl ButtonAggregator {
    /// Creates an aggregator with all buttons released.
    #[must_use]
    pub fn new(map: ButtonMap) -> Self {
        Self {
            map,
            mask: ButtonMask::default(),
        }
    }

    /// Current mask.
    #[must_use]
    pub fn mask(&self) -> ButtonMask {
        self.mask
    }

    /// Applies one edge.
    ///
    /// # Returns
    ///
    /// The updated mask, or `None` for an unknown name (mask untouched).
    pub fn apply(&mut self, name: &str, pressed: bool) -> Option<ButtonMask> {
        let id = self.map.id(name)?;
        self.mask.set(id, pressed);
        Some(self.mask)
    }
}

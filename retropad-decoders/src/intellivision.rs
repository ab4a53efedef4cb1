//! Mattel Intellivision hand controller (Flashback wiring).
//!
//! The controller is a passive matrix: the 16-direction disc, three side buttons and
//! the 12-key keypad all short combinations of eight lines to a common ground. Each
//! input combination is looked up in fixed tables; overlapping presses that match no
//! entry fall back to the disc and side buttons alone.

use embedded_hal::digital::{InputPin, OutputPin};
use retropad_core::{Controller, ControllerError, ReportBuffer, ReportId, AXIS_CENTER};

use crate::pressed_mask;

pub const REPORT_LEN: usize = 5;

const ITEMS: &[u8] = &[
    0x05, 0x01, // USAGE_PAGE (Generic Desktop)
    0x09, 0x05, // USAGE (Game Pad)
    0xA1, 0x01, // COLLECTION (Application)
    0x09, 0x01, //   USAGE (Pointer)
    0xA1, 0x00, //   COLLECTION (Physical)
    0x09, 0x30, //     USAGE (X)
    0x09, 0x31, //     USAGE (Y)
    0x15, 0x00, //     LOGICAL_MINIMUM (0)
    0x26, 0xFF, 0x00, //     LOGICAL_MAXIMUM (255)
    0x75, 0x08, //     REPORT_SIZE (8)
    0x95, 0x02, //     REPORT_COUNT (2)
    0x81, 0x02, //     INPUT (Data,Var,Abs)
    0xC0, //   END_COLLECTION
    0x05, 0x09, //   USAGE_PAGE (Button)
    0x19, 0x01, //   USAGE_MINIMUM (Button 1)
    0x29, 0x18, //   USAGE_MAXIMUM (Button 24)
    0x15, 0x00, //   LOGICAL_MINIMUM (0)
    0x25, 0x01, //   LOGICAL_MAXIMUM (1)
    0x75, 0x01, //   REPORT_SIZE (1)
    0x95, 0x18, //   REPORT_COUNT (24)
    0x81, 0x02, //   INPUT (Data,Var,Abs)
];

const DESCRIPTOR: [u8; crate::descriptor_len(ITEMS, 1)] = crate::with_boot_feature(ITEMS);

/// Gamepad with X/Y and 24 buttons, plus the bootloader feature.
pub const REPORT_DESCRIPTOR: &[u8] = &DESCRIPTOR;

/// Disc lines: the four low bits plus bit 7.
const DISC_MASK: u8 = 0x8F;
/// Side button lines.
const ACTION_MASK: u8 = 0x70;

/// Disc position for the pressed lines under [`DISC_MASK`], N first, clockwise.
fn disc(lines: u8) -> Option<(u8, u8)> {
    let position = match lines {
        0b0000_0010 => (0x80, 0x00),
        0b1000_0010 => (0xC0, 0x00),
        0b1000_0110 => (0xFF, 0x00),
        0b0000_0110 => (0xFF, 0x40),
        0b0000_0100 => (0xFF, 0x80),
        0b1000_0100 => (0xFF, 0xC0),
        0b1000_1100 => (0xFF, 0xFF),
        0b0000_1100 => (0xC0, 0xFF),
        0b0000_1000 => (0x80, 0xFF),
        0b1000_1000 => (0x40, 0xFF),
        0b1000_1001 => (0x00, 0xFF),
        0b0000_1001 => (0x00, 0xC0),
        0b0000_0001 => (0x00, 0x80),
        0b1000_0001 => (0x00, 0x40),
        0b1000_0011 => (0x00, 0x00),
        0b0000_0011 => (0x40, 0x00),
        _ => return None,
    };
    Some(position)
}

/// Side buttons 1-3 as report buttons 1-3.
fn action(lines: u8) -> u8 {
    match lines {
        0b0101_0000 => 0x01,
        0b0110_0000 => 0x02,
        0b0011_0000 => 0x04,
        _ => 0,
    }
}

/// Keypad key as `[buttons 1-8, buttons 9-16]`. Keys 1-9 map to buttons 4-12, then
/// Clear, 0, Enter; 1+9 together is button 16.
fn keypad(lines: u8) -> Option<[u8; 2]> {
    let buttons = match lines {
        0b0001_1000 => [0x08, 0x00],
        0b0010_1000 => [0x10, 0x00],
        0b0100_1000 => [0x20, 0x00],
        0b0001_0100 => [0x40, 0x00],
        0b0010_0100 => [0x80, 0x00],
        0b0100_0100 => [0x00, 0x01],
        0b0001_0010 => [0x00, 0x02],
        0b0010_0010 => [0x00, 0x04],
        0b0100_0010 => [0x00, 0x08],
        0b0001_0001 => [0x00, 0x10],
        0b0010_0001 => [0x00, 0x20],
        0b0100_0001 => [0x00, 0x40],
        0b0101_1010 => [0x00, 0x80],
        _ => return None,
    };
    Some(buttons)
}

/// Decode a pressed-line mask into the report.
#[must_use]
pub fn report(pressed: u8) -> [u8; REPORT_LEN] {
    let (mut x, mut y) = disc(pressed & DISC_MASK).unwrap_or((AXIS_CENTER, AXIS_CENTER));
    let mut buttons = [action(pressed & ACTION_MASK), 0];
    match keypad(pressed) {
        Some(keys) => {
            x = AXIS_CENTER;
            y = AXIS_CENTER;
            buttons = keys;
        }
        None => buttons[0] &= 0x07,
    }
    [x, y, buttons[0], buttons[1], pressed]
}

/// Controller on eight inputs plus the common line driven low.
pub struct Intellivision<P, O> {
    pins: [P; 8],
    common: O,
    pressed: u8,
    reported: Option<u8>,
}

impl<P: InputPin, O: OutputPin> Intellivision<P, O> {
    /// `pins` are DB9 pins 9, 4, 8, 1, 2, 7, 6 and 5 in that order, inputs with
    /// pull-ups. `common` is DB9 pin 3.
    pub fn new(pins: [P; 8], common: O) -> Self {
        Self {
            pins,
            common,
            pressed: 0,
            reported: None,
        }
    }
}

impl<P: InputPin, O: OutputPin> Controller for Intellivision<P, O> {
    const REPORT_DESCRIPTOR: &'static [u8] = REPORT_DESCRIPTOR;

    fn init(&mut self) -> Result<(), ControllerError> {
        self.common.set_low().map_err(|_| ControllerError::Pin)?;
        self.pressed = 0;
        self.reported = None;
        Ok(())
    }

    fn update(&mut self) {
        self.pressed = pressed_mask(&mut self.pins);
    }

    fn changed(&self, _id: ReportId) -> bool {
        self.reported != Some(self.pressed)
    }

    fn build_report(&mut self, _id: ReportId, buf: &mut ReportBuffer) -> usize {
        buf[..REPORT_LEN].copy_from_slice(&report(self.pressed));
        self.reported = Some(self.pressed);
        REPORT_LEN
    }
}

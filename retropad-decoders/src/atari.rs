//! Atari-style 9-pin digital joystick (Atari 2600/7800, C64, Amiga, SMS).
//!
//! Four direction switches and up to three buttons, all closing to ground. Pins are
//! passed in report-bit order: up, down, left, right, fire, button 2, button 3.

use embedded_hal::digital::InputPin;
use retropad_core::{Controller, ControllerError, ReportBuffer, ReportId, AXIS_MAX, AXIS_MIN};

use crate::pressed_mask;

pub const UP: u8 = 1 << 0;
pub const DOWN: u8 = 1 << 1;
pub const LEFT: u8 = 1 << 2;
pub const RIGHT: u8 = 1 << 3;
pub const FIRE: u8 = 1 << 4;
pub const BUTTON_2: u8 = 1 << 5;
pub const BUTTON_3: u8 = 1 << 6;

/// Axis value with no direction held. Atari joysticks center on 0x7F.
pub const CENTER: u8 = 0x7F;

/// Report length: X, Y and 16 button bits.
pub const REPORT_LEN: usize = 4;

const ITEMS: &[u8] = &[
    0x05, 0x01, // USAGE_PAGE (Generic Desktop)
    0x09, 0x05, // USAGE (Game Pad)
    0xA1, 0x01, // COLLECTION (Application)
    0xA1, 0x00, //   COLLECTION (Physical)
    0x05, 0x01, //     USAGE_PAGE (Generic Desktop)
    0x09, 0x30, //     USAGE (X)
    0x09, 0x31, //     USAGE (Y)
    0x15, 0x00, //     LOGICAL_MINIMUM (0)
    0x26, 0xFF, 0x00, //     LOGICAL_MAXIMUM (255)
    0x75, 0x08, //     REPORT_SIZE (8)
    0x95, 0x02, //     REPORT_COUNT (2)
    0x81, 0x02, //     INPUT (Data,Var,Abs)
    0x05, 0x09, //     USAGE_PAGE (Button)
    0x19, 0x01, //     USAGE_MINIMUM (Button 1)
    0x29, 0x10, //     USAGE_MAXIMUM (Button 16)
    0x15, 0x00, //     LOGICAL_MINIMUM (0)
    0x25, 0x01, //     LOGICAL_MAXIMUM (1)
    0x95, 0x10, //     REPORT_COUNT (16)
    0x75, 0x01, //     REPORT_SIZE (1)
    0x81, 0x02, //     INPUT (Data,Var,Abs)
];

const DESCRIPTOR: [u8; crate::descriptor_len(ITEMS, 2)] = crate::with_boot_feature(ITEMS);

/// Gamepad with X/Y and 16 buttons, plus the bootloader feature.
pub const REPORT_DESCRIPTOR: &[u8] = &DESCRIPTOR;

/// Map a pressed mask to the report.
///
/// Opposite directions held together resolve by write order: LEFT beats RIGHT and UP
/// beats DOWN. The fire button lands on button 7 and the extra buttons on 10 and 9,
/// the layout existing adapters ship with.
#[must_use]
pub fn report(pressed: u8) -> [u8; REPORT_LEN] {
    let mut x = CENTER;
    let mut y = CENTER;
    if pressed & RIGHT != 0 {
        x = AXIS_MAX;
    }
    if pressed & LEFT != 0 {
        x = AXIS_MIN;
    }
    if pressed & DOWN != 0 {
        y = AXIS_MAX;
    }
    if pressed & UP != 0 {
        y = AXIS_MIN;
    }

    let mut buttons = [0u8; 2];
    if pressed & FIRE != 0 {
        buttons[0] |= 1 << 6;
    }
    if pressed & BUTTON_2 != 0 {
        buttons[1] |= 1 << 1;
    }
    if pressed & BUTTON_3 != 0 {
        buttons[1] |= 1 << 0;
    }
    [x, y, buttons[0], buttons[1]]
}

/// Digital joystick on seven GPIO inputs.
pub struct AtariJoystick<P> {
    pins: [P; 7],
    pressed: u8,
    reported: Option<u8>,
}

impl<P: InputPin> AtariJoystick<P> {
    /// `pins` in order up, down, left, right, fire, button 2, button 3, configured as
    /// inputs with pull-ups.
    pub fn new(pins: [P; 7]) -> Self {
        Self {
            pins,
            pressed: 0,
            reported: None,
        }
    }

    /// Pressed mask from the last [`update`](Controller::update).
    #[must_use]
    pub fn pressed(&self) -> u8 {
        self.pressed
    }
}

impl<P: InputPin> Controller for AtariJoystick<P> {
    const REPORT_DESCRIPTOR: &'static [u8] = REPORT_DESCRIPTOR;

    fn init(&mut self) -> Result<(), ControllerError> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{pins, MockPin};

    fn joystick() -> (AtariJoystick<MockPin>, [MockPin; 7]) {
        let (pins, handles) = pins::<7>();
        let mut joystick = AtariJoystick::new(pins);
        joystick.init().unwrap();
        (joystick, handles)
    }

    fn build(joystick: &mut AtariJoystick<MockPin>) -> [u8; REPORT_LEN] {
        let mut buf = [0u8; 8];
        let len = joystick.build_report(1, &mut buf);
        assert_eq!(len, REPORT_LEN);
        [buf[0], buf[1], buf[2], buf[3]]
    }

    #[test]
    fn test_centered_when_idle() {
        let (mut joystick, _) = joystick();
        joystick.update();
        assert_eq!(build(&mut joystick), [0x7F, 0x7F, 0, 0]);
    }

    #[test]
    fn test_right_only() {
        let (mut joystick, handles) = joystick();
        handles[3].press();
        joystick.update();
        assert_eq!(&build(&mut joystick)[..2], &[0xFF, 0x7F]);
    }

    #[test]
    fn test_left_only() {
        let (mut joystick, handles) = joystick();
        handles[2].press();
        joystick.update();
        assert_eq!(&build(&mut joystick)[..2], &[0x00, 0x7F]);
    }

    #[test]
    fn test_opposite_directions_resolve_by_order() {
        assert_eq!(&report(LEFT | RIGHT)[..2], &[0x00, 0x7F]);
        assert_eq!(&report(UP | DOWN)[..2], &[0x7F, 0x00]);
        assert_eq!(&report(UP | DOWN | LEFT | RIGHT)[..2], &[0x00, 0x00]);
    }

    #[test]
    fn test_button_layout() {
        assert_eq!(report(FIRE), [0x7F, 0x7F, 0x40, 0x00]);
        assert_eq!(report(BUTTON_2), [0x7F, 0x7F, 0x00, 0x02]);
        assert_eq!(report(BUTTON_3), [0x7F, 0x7F, 0x00, 0x01]);
    }

    #[test]
    fn test_changed_tracks_reported_state() {
        let (mut joystick, handles) = joystick();
        joystick.update();
        assert!(joystick.changed(1));
        let first = build(&mut joystick);
        assert!(!joystick.changed(1));
        assert_eq!(build(&mut joystick), first);

        handles[4].press();
        joystick.update();
        assert!(joystick.changed(1));
        build(&mut joystick);
        assert!(!joystick.changed(1));

        handles[4].release();
        joystick.update();
        assert!(joystick.changed(1));
    }

    #[test]
    fn test_descriptor_declares_boot_feature() {
        assert!(crate::has_boot_feature(REPORT_DESCRIPTOR));
    }
}

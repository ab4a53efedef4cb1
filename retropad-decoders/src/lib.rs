//! Decoders for vintage game controllers.
//!
//! Each module implements [`retropad_core::Controller`] for one controller family on
//! top of `embedded-hal` pins, plus the HID report descriptor it answers with:
//!
//! - [`atari`]: 9-pin digital joystick with up to three buttons
//! - [`paddles`]: Atari and Commodore 64 paddles, timed by RC charge
//! - [`nes`]: NES/SNES shift-register pads
//! - [`vectrex`]: analog stick and four buttons
//! - [`mac_mouse`]: Macintosh quadrature mouse
//! - [`intellivision`]: 16-direction disc, side buttons and 12-key keypad
//!
//! Inputs are active-low with pull-ups unless noted. A pin that fails to read counts
//! as released.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

use embedded_hal::digital::InputPin;

pub mod atari;
pub mod intellivision;
pub mod mac_mouse;
pub mod nes;
pub mod paddles;
pub mod vectrex;

#[cfg(test)]
mod mock;

pub use atari::AtariJoystick;
pub use intellivision::Intellivision;
pub use mac_mouse::{MacMouse, QuadratureCell, QuadratureDecoder};
pub use nes::ShiftRegisterPad;
pub use paddles::{CaptureTimer, Paddles, RcPin};
pub use vectrex::{AnalogSampler, Axis, Vectrex};

/// Vendor-defined 1-byte feature item every report descriptor carries. A host writing
/// `0x5A` to it requests the bootloader.
pub const BOOT_FEATURE: [u8; 14] = [
    0x09, 0x00, // USAGE (Undefined)
    0x15, 0x00, // LOGICAL_MINIMUM (0)
    0x26, 0xFF, 0x00, // LOGICAL_MAXIMUM (255)
    0x75, 0x08, // REPORT_SIZE (8)
    0x95, 0x01, // REPORT_COUNT (1)
    0xB2, 0x02, 0x01, // FEATURE (Data,Var,Abs,Buf)
];

const END_COLLECTION: u8 = 0xC0;

/// Length of a descriptor built by [`with_boot_feature`] from `items` and
/// `collections` still-open collections.
pub(crate) const fn descriptor_len(items: &[u8], collections: usize) -> usize {
    items.len() + BOOT_FEATURE.len() + collections
}

/// `items`, then [`BOOT_FEATURE`], then one END_COLLECTION for every byte left in `N`.
pub(crate) const fn with_boot_feature<const N: usize>(items: &[u8]) -> [u8; N] {
    assert!(N > items.len() + BOOT_FEATURE.len(), "descriptor leaves no collection to close");
    let mut out = [END_COLLECTION; N];
    let mut i = 0;
    while i < items.len() {
        out[i] = items[i];
        i += 1;
    }
    let mut j = 0;
    while j < BOOT_FEATURE.len() {
        out[i + j] = BOOT_FEATURE[j];
        j += 1;
    }
    out
}

/// Active-low read: low means pressed.
#[inline]
pub(crate) fn is_pressed<P: InputPin>(pin: &mut P) -> bool {
    pin.is_low().unwrap_or(false)
}

/// Pressed mask of `pins`, bit `i` for `pins[i]`.
pub(crate) fn pressed_mask<P: InputPin>(pins: &mut [P]) -> u8 {
    pins.iter_mut()
        .enumerate()
        .fold(0, |mask, (i, pin)| if is_pressed(pin) { mask | (1 << i) } else { mask })
}

#[cfg(test)]
pub(crate) fn has_boot_feature(descriptor: &[u8]) -> bool {
    descriptor
        .windows(BOOT_FEATURE.len())
        .any(|window| window == BOOT_FEATURE)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use retropad_core::{Controller, HidFunction};
    use softusb_proto::sim::{self, SimHost};
    use softusb_proto::{Config, UsbDevice};
    use std::vec;

    #[test]
    fn test_joystick_enumerates_and_reports() {
        let (pins, handles) = mock::pins::<7>();
        let mut function = HidFunction::new(AtariJoystick::new(pins));
        let len = atari::REPORT_DESCRIPTOR.len() as u16;
        let mut device = UsbDevice::new(Config::new(0x1209, 0x0001), len);
        let mut host = SimHost::new();
        device.attach(&mut host);

        sim::enumerate(&mut device, &mut host, &mut function, 5);
        assert!(device.is_configured());

        let [lo, hi] = len.to_le_bytes();
        let descriptor = sim::control_read(
            &mut device,
            &mut host,
            &mut function,
            5,
            [0x81, 0x06, 0x00, 0x22, 0x00, 0x00, lo, hi],
        );
        assert_eq!(descriptor, atari::REPORT_DESCRIPTOR);

        handles[3].press();
        let controller = function.controller_mut();
        controller.update();
        let mut buf = [0u8; 8];
        let n = controller.build_report(1, &mut buf);
        device.send_interrupt_report(&buf[..n]).unwrap();

        let (_, report) = sim::interrupt_in(&mut device, &mut host, &mut function, 5).unwrap();
        assert_eq!(report, vec![0xFF, 0x7F, 0x00, 0x00]);
    }

    #[test]
    fn test_descriptors_end_with_boot_feature() {
        let closing = [
            (atari::REPORT_DESCRIPTOR, 2),
            (intellivision::REPORT_DESCRIPTOR, 1),
            (mac_mouse::REPORT_DESCRIPTOR, 2),
            (nes::REPORT_DESCRIPTOR, 2),
            (paddles::REPORT_DESCRIPTOR, 2),
            (vectrex::REPORT_DESCRIPTOR, 2),
        ];
        for (descriptor, collections) in closing {
            let (body, tail) = descriptor.split_at(descriptor.len() - collections);
            assert!(body.ends_with(&BOOT_FEATURE));
            assert!(tail.iter().all(|&b| b == END_COLLECTION));
        }
    }

    #[test]
    fn test_pressed_mask_orders_bits_by_pin() {
        let (mut pins, handles) = mock::pins::<3>();
        handles[0].press();
        handles[2].press();
        assert_eq!(pressed_mask(&mut pins), 0b101);
    }
}

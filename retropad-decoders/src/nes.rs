//! NES and SNES pads, and clones with the same 4021-style shift register.
//!
//! A latch pulse loads the button states; sixteen clock pulses shift them out on the
//! data line, low meaning pressed. Bit order: B, Y, Select, Start, Up, Down, Left,
//! Right, A, X, L, R, then four bits that always read high.
//!
//! An NES pad only has the first eight; past them its register shifts in ground, so
//! the remaining bits all read pressed. That is how the two are told apart.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use retropad_core::{
    Controller, ControllerError, ReportBuffer, ReportId, AXIS_CENTER, AXIS_MAX, AXIS_MIN,
};

use crate::is_pressed;

pub const B: u16 = 1 << 0;
pub const Y: u16 = 1 << 1;
pub const SELECT: u16 = 1 << 2;
pub const START: u16 = 1 << 3;
pub const UP: u16 = 1 << 4;
pub const DOWN: u16 = 1 << 5;
pub const LEFT: u16 = 1 << 6;
pub const RIGHT: u16 = 1 << 7;
pub const A: u16 = 1 << 8;
pub const X: u16 = 1 << 9;
pub const L: u16 = 1 << 10;
pub const R: u16 = 1 << 11;

/// Bits an SNES pad always reports released and an NES pad reads as pressed.
const NES_TAIL: u16 = 0xF000;
/// Bits past the eight an NES pad has.
const SNES_ONLY: u16 = 0xFF00;

/// Latch pulse width.
pub const LATCH_US: u32 = 12;
/// Half period of the shift clock.
pub const HALF_CLOCK_US: u32 = 6;

pub const REPORT_LEN: usize = 3;

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
    0x29, 0x08, //     USAGE_MAXIMUM (Button 8)
    0x15, 0x00, //     LOGICAL_MINIMUM (0)
    0x25, 0x01, //     LOGICAL_MAXIMUM (1)
    0x95, 0x08, //     REPORT_COUNT (8)
    0x75, 0x01, //     REPORT_SIZE (1)
    0x81, 0x02, //     INPUT (Data,Var,Abs)
];

const DESCRIPTOR: [u8; crate::descriptor_len(ITEMS, 2)] = crate::with_boot_feature(ITEMS);

/// Gamepad with X/Y and eight buttons, plus the bootloader feature.
pub const REPORT_DESCRIPTOR: &[u8] = &DESCRIPTOR;

/// Map the 16-bit pressed state to the report. DOWN beats UP and RIGHT beats LEFT.
///
/// Buttons 1 to 4 are B, Y, Select and Start; buttons 5 to 8 are A, X, L and R.
#[must_use]
pub fn report(state: u16) -> [u8; REPORT_LEN] {
    let mut x = AXIS_CENTER;
    let mut y = AXIS_CENTER;
    if state & UP != 0 {
        y = AXIS_MIN;
    }
    if state & DOWN != 0 {
        y = AXIS_MAX;
    }
    if state & LEFT != 0 {
        x = AXIS_MIN;
    }
    if state & RIGHT != 0 {
        x = AXIS_MAX;
    }
    let buttons = (state & 0x0F) | ((state >> 4) & 0xF0);
    [x, y, buttons as u8]
}

/// Pad on three GPIOs: latch and clock outputs, data input with pull-up.
pub struct ShiftRegisterPad<LA, CK, DA, D> {
    latch: LA,
    clock: CK,
    data: DA,
    delay: D,
    state: u16,
    reported: Option<u16>,
}

impl<LA, CK, DA, D> ShiftRegisterPad<LA, CK, DA, D>
where
    LA: OutputPin,
    CK: OutputPin,
    DA: InputPin,
    D: DelayNs,
{
    pub fn new(latch: LA, clock: CK, data: DA, delay: D) -> Self {
        Self {
            latch,
            clock,
            data,
            delay,
            state: 0,
            reported: None,
        }
    }

    /// Pressed bits from the last shift-out, with bits an NES pad lacks cleared.
    #[must_use]
    pub fn state(&self) -> u16 {
        self.state
    }

    fn shift_in(&mut self) -> u16 {
        let _ = self.latch.set_high();
        self.delay.delay_us(LATCH_US);
        let _ = self.latch.set_low();

        let mut state = 0;
        for bit in 0..16 {
            self.delay.delay_us(HALF_CLOCK_US);
            let _ = self.clock.set_low();
            if is_pressed(&mut self.data) {
                state |= 1 << bit;
            }
            self.delay.delay_us(HALF_CLOCK_US);
            let _ = self.clock.set_high();
        }
        if state & NES_TAIL == NES_TAIL {
            state & !SNES_ONLY
        } else {
            state & !NES_TAIL
        }
    }
}

impl<LA, CK, DA, D> Controller for ShiftRegisterPad<LA, CK, DA, D>
where
    LA: OutputPin,
    CK: OutputPin,
    DA: InputPin,
    D: DelayNs,
{
    const REPORT_DESCRIPTOR: &'static [u8] = REPORT_DESCRIPTOR;

    fn init(&mut self) -> Result<(), ControllerError> {
        // clock idles high, latch is active high
        self.clock.set_high().map_err(|_| ControllerError::Pin)?;
        self.latch.set_low().map_err(|_| ControllerError::Pin)?;
        self.state = 0;
        self.reported = None;
        Ok(())
    }

    fn update(&mut self) {
        self.state = self.shift_in();
    }

    fn changed(&self, _id: ReportId) -> bool {
        self.reported != Some(self.state)
    }

    fn build_report(&mut self, _id: ReportId, buf: &mut ReportBuffer) -> usize {
        buf[..REPORT_LEN].copy_from_slice(&report(self.state));
        self.reported = Some(self.state);
        REPORT_LEN
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::mock::RecordingDelay;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Register {
        pressed: u16,
        latched: u16,
        index: u32,
        latch_high: bool,
        clock_high: bool,
        clocks: u32,
    }

    #[derive(Clone, Default)]
    struct Bus(Rc<RefCell<Register>>);

    struct Latch(Bus);
    struct Clock(Bus);
    struct Data(Bus);

    impl ErrorType for Latch {
        type Error = Infallible;
    }
    impl ErrorType for Clock {
        type Error = Infallible;
    }
    impl ErrorType for Data {
        type Error = Infallible;
    }

    impl OutputPin for Latch {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0 .0.borrow_mut().latch_high = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            let mut reg = self.0 .0.borrow_mut();
            reg.latch_high = true;
            reg.latched = reg.pressed;
            reg.index = 0;
            Ok(())
        }
    }

    impl OutputPin for Clock {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0 .0.borrow_mut().clock_high = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            let mut reg = self.0 .0.borrow_mut();
            if !reg.clock_high {
                reg.index += 1;
                reg.clocks += 1;
            }
            reg.clock_high = true;
            Ok(())
        }
    }

    impl InputPin for Data {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            let reg = self.0 .0.borrow();
            // bits past the sixteenth read high, like an empty register
            Ok(reg.index >= 16 || reg.latched & (1 << reg.index) == 0)
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            self.is_high().map(|high| !high)
        }
    }

    type TestPad = ShiftRegisterPad<Latch, Clock, Data, RecordingDelay>;

    fn pad() -> (TestPad, Bus, RecordingDelay) {
        let bus = Bus::default();
        let delay = RecordingDelay::default();
        let mut pad = ShiftRegisterPad::new(
            Latch(bus.clone()),
            Clock(bus.clone()),
            Data(bus.clone()),
            delay.clone(),
        );
        pad.init().unwrap();
        (pad, bus, delay)
    }

    fn build(pad: &mut TestPad) -> [u8; REPORT_LEN] {
        let mut buf = [0u8; 8];
        assert_eq!(pad.build_report(1, &mut buf), REPORT_LEN);
        [buf[0], buf[1], buf[2]]
    }

    #[test]
    fn test_init_idles_clock_high_latch_low() {
        let (_, bus, _) = pad();
        let reg = bus.0.borrow();
        assert!(reg.clock_high);
        assert!(!reg.latch_high);
    }

    #[test]
    fn test_shift_out_reads_all_sixteen_bits() {
        let (mut pad, bus, delay) = pad();
        bus.0.borrow_mut().pressed = B | START | A | R;
        let clocks = bus.0.borrow().clocks;
        pad.update();
        assert_eq!(pad.state(), B | START | A | R);
        assert_eq!(build(&mut pad), [0x80, 0x80, 0x99]);
        assert_eq!(bus.0.borrow().clocks - clocks, 16);
        assert!(!bus.0.borrow().latch_high);

        let waits = delay.waits_ns.borrow();
        assert_eq!(waits.len(), 1 + 32);
        assert_eq!(waits[0], 12_000);
        assert!(waits[1..].iter().all(|&ns| ns == 6_000));
    }

    #[test]
    fn test_idle_pad_centers() {
        let (mut pad, _, _) = pad();
        pad.update();
        assert_eq!(build(&mut pad), [0x80, 0x80, 0x00]);
    }

    #[test]
    fn test_directions_and_face_buttons() {
        let (mut pad, bus, _) = pad();
        bus.0.borrow_mut().pressed = UP | RIGHT | Y | SELECT;
        pad.update();
        assert_eq!(build(&mut pad), [0xFF, 0x00, 0x06]);
    }

    #[test]
    fn test_opposite_directions_resolve_by_order() {
        assert_eq!(report(UP | DOWN), [0x80, 0xFF, 0]);
        assert_eq!(report(LEFT | RIGHT), [0xFF, 0x80, 0]);
    }

    #[test]
    fn test_snes_buttons_are_reported() {
        let (mut pad, bus, _) = pad();
        pad.update();
        build(&mut pad);
        assert!(!pad.changed(1));

        bus.0.borrow_mut().pressed = X | L;
        pad.update();
        assert!(pad.changed(1));
        assert_eq!(build(&mut pad), [0x80, 0x80, 0x60]);
        assert!(!pad.changed(1));
    }

    #[test]
    fn test_nes_pad_tail_reads_released() {
        let (mut pad, bus, _) = pad();
        // NES register: trailing bits shift in as pressed
        bus.0.borrow_mut().pressed = 0xFF00 | B | LEFT;
        pad.update();
        assert_eq!(pad.state(), B | LEFT);
        assert_eq!(build(&mut pad), [0x00, 0x80, 0x01]);

        pad.update();
        assert!(!pad.changed(1));
    }

    #[test]
    fn test_descriptor_declares_boot_feature() {
        assert!(crate::has_boot_feature(REPORT_DESCRIPTOR));
    }
}

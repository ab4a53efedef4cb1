//! Atari and Commodore 64 paddles, read by timing the RC charge of each pot.
//!
//! Each channel's capacitor is shorted to ground, released, and timed until the pin
//! reads high again. The charge time is proportional to the pot resistance, so the
//! tick count divided by a per-family divider gives an 8-bit position.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use retropad_core::{clamp_axis, Controller, ControllerError, ReportBuffer, ReportId};

use crate::pressed_mask;

/// Tick divider for 1 MΩ Atari paddles at a 187.5 kHz capture clock.
pub const ATARI_DIVIDER: u16 = 25;
/// Tick divider for 470 kΩ Commodore 64 paddles.
pub const C64_DIVIDER: u16 = 12;
/// Time the capacitor is held at ground before a measurement.
pub const SETTLE_US: u32 = 50;

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
    0x29, 0x02, //     USAGE_MAXIMUM (Button 2)
    0x15, 0x00, //     LOGICAL_MINIMUM (0)
    0x25, 0x01, //     LOGICAL_MAXIMUM (1)
    0x95, 0x08, //     REPORT_COUNT (8)
    0x75, 0x01, //     REPORT_SIZE (1)
    0x81, 0x02, //     INPUT (Data,Var,Abs)
];

const DESCRIPTOR: [u8; crate::descriptor_len(ITEMS, 2)] = crate::with_boot_feature(ITEMS);

/// Gamepad with X/Y and two buttons padded to a byte, plus the bootloader feature.
pub const REPORT_DESCRIPTOR: &[u8] = &DESCRIPTOR;

/// Pot input that can be shorted to ground and released.
pub trait RcPin {
    /// Drive the pin low to empty the capacitor.
    fn discharge(&mut self);
    /// Return the pin to a floating input.
    fn release(&mut self);
    /// Whether the capacitor has charged past the input threshold.
    fn is_charged(&mut self) -> bool;
}

/// Free-running counter used to time the charge.
pub trait CaptureTimer {
    /// Zero the counter and clear the overflow flag.
    fn restart(&mut self);
    fn count(&self) -> u16;
    /// Set once the counter wrapped since the last restart.
    fn overflowed(&self) -> bool;
}

/// One reading of both channels and the two buttons.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    /// Charge time per channel, in timer ticks.
    pub channels: [u16; 2],
    /// Pressed mask, bit 0 for button 1.
    pub buttons: u8,
}

/// Pair of paddles sharing one DB9 port.
pub struct Paddles<R, T, B, D> {
    pots: [R; 2],
    timer: T,
    buttons: [B; 2],
    delay: D,
    divider: u16,
    sample: Sample,
    reported: Option<Sample>,
}

impl<R, T, B, D> Paddles<R, T, B, D>
where
    R: RcPin,
    T: CaptureTimer,
    B: InputPin,
    D: DelayNs,
{
    pub fn new(pots: [R; 2], timer: T, buttons: [B; 2], delay: D, divider: u16) -> Self {
        Self {
            pots,
            timer,
            buttons,
            delay,
            divider: divider.max(1),
            sample: Sample::default(),
            reported: None,
        }
    }

    /// Atari 2600 paddles.
    pub fn atari(pots: [R; 2], timer: T, buttons: [B; 2], delay: D) -> Self {
        Self::new(pots, timer, buttons, delay, ATARI_DIVIDER)
    }

    /// Commodore 64 paddles.
    pub fn c64(pots: [R; 2], timer: T, buttons: [B; 2], delay: D) -> Self {
        Self::new(pots, timer, buttons, delay, C64_DIVIDER)
    }

    #[must_use]
    pub fn sample(&self) -> Sample {
        self.sample
    }

    /// Charge time reported for a paddle that never charges.
    #[must_use]
    pub fn disconnected_ticks(&self) -> u16 {
        127 * self.divider
    }

    fn measure(&mut self, channel: usize) -> u16 {
        let pot = &mut self.pots[channel];
        pot.discharge();
        self.delay.delay_us(SETTLE_US);
        pot.release();
        self.timer.restart();
        while !pot.is_charged() && !self.timer.overflowed() {}
        if self.timer.overflowed() {
            self.disconnected_ticks()
        } else {
            self.timer.count()
        }
    }

    fn position(&self, ticks: u16) -> u8 {
        255 - clamp_axis(i32::from(ticks / self.divider))
    }
}

impl<R, T, B, D> Controller for Paddles<R, T, B, D>
where
    R: RcPin,
    T: CaptureTimer,
    B: InputPin,
    D: DelayNs,
{
    const REPORT_DESCRIPTOR: &'static [u8] = REPORT_DESCRIPTOR;

    fn init(&mut self) -> Result<(), ControllerError> {
        for pot in &mut self.pots {
            pot.release();
        }
        self.sample = Sample::default();
        self.reported = None;
        Ok(())
    }

    fn update(&mut self) {
        let buttons = pressed_mask(&mut self.buttons);
        let channels = [self.measure(0), self.measure(1)];
        self.sample = Sample { channels, buttons };
    }

    fn changed(&self, _id: ReportId) -> bool {
        self.reported != Some(self.sample)
    }

    fn build_report(&mut self, _id: ReportId, buf: &mut ReportBuffer) -> usize {
        let [x, y] = self.sample.channels;
        buf[0] = self.position(x);
        buf[1] = self.position(y);
        buf[2] = self.sample.buttons & 0x03;
        self.reported = Some(self.sample);
        REPORT_LEN
    }
}

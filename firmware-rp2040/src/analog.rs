//! Analog front ends: RC-timed paddle pots and the ADC for the Vectrex stick.

use embassy_rp::adc::{Adc, Blocking, Channel};
use embassy_rp::gpio::{Flex, Pull};
use embassy_time::Instant;
use retropad_decoders::{AnalogSampler, Axis, CaptureTimer, RcPin};

/// Capture clock the paddle dividers are calibrated for.
pub const CAPTURE_HZ: u64 = 187_500;

/// Pot input: shorted to ground to discharge, floating while it charges.
pub struct FlexPot {
    pin: Flex<'static>,
}

impl FlexPot {
    pub fn new(mut pin: Flex<'static>) -> Self {
        pin.set_pull(Pull::None);
        pin.set_as_input();
        Self { pin }
    }
}

impl RcPin for FlexPot {
    fn discharge(&mut self) {
        self.pin.set_low();
        self.pin.set_as_output();
    }

    fn release(&mut self) {
        self.pin.set_as_input();
    }

    fn is_charged(&mut self) -> bool {
        self.pin.is_high()
    }
}

/// Charge timer on the 1 MHz system timer, scaled to [`CAPTURE_HZ`] ticks.
pub struct TimerCapture {
    start: Instant,
    limit: u16,
}

impl TimerCapture {
    /// `limit` ticks count as an overflow, meaning no paddle is connected.
    pub fn new(limit: u16) -> Self {
        Self {
            start: Instant::now(),
            limit,
        }
    }

    fn ticks(&self) -> u64 {
        self.start.elapsed().as_micros() * CAPTURE_HZ / 1_000_000
    }
}

impl CaptureTimer for TimerCapture {
    fn restart(&mut self) {
        self.start = Instant::now();
    }

    fn count(&self) -> u16 {
        u16::try_from(self.ticks()).unwrap_or(u16::MAX)
    }

    fn overflowed(&self) -> bool {
        self.ticks() >= u64::from(self.limit)
    }
}

/// Stick wipers on two ADC inputs.
pub struct AdcStick {
    adc: Adc<'static, Blocking>,
    x: Channel<'static>,
    y: Channel<'static>,
}

impl AdcStick {
    pub fn new(adc: Adc<'static, Blocking>, x: Channel<'static>, y: Channel<'static>) -> Self {
        Self { adc, x, y }
    }
}

impl AnalogSampler for AdcStick {
    fn read(&mut self, axis: Axis) -> Option<u8> {
        let channel = match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
        };
        match self.adc.blocking_read(channel) {
            // 12-bit conversion, keep the top eight bits
            Ok(raw) => Some((raw >> 4) as u8),
            Err(e) => {
                defmt::debug!("adc read failed: {}", e);
                None
            }
        }
    }
}

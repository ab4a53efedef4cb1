//! USB lines on two GPIOs and a SysTick bit clock.
//!
//! D+ and D- are plain SIO-controlled pins. A 1.5 kΩ pull-up from D- to 3.3 V marks
//! the port as low speed, so J reads as D- high. Nothing else may run interrupts on
//! the core that bit-bangs the port.

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::SYST;
use embassy_rp::gpio::{Flex, Pull};
use fixed::types::U24F8;
use softusb_proto::{BitClock, LinePins, LineState};

/// Low-speed bit rate.
pub const BIT_RATE_HZ: u32 = 1_500_000;

const SYST_MASK: u32 = 0x00FF_FFFF;

/// D+/D- pair.
pub struct GpioLines {
    dp: Flex<'static>,
    dm: Flex<'static>,
    driving: bool,
}

impl GpioLines {
    pub fn new(mut dp: Flex<'static>, mut dm: Flex<'static>) -> Self {
        dp.set_pull(Pull::None);
        dm.set_pull(Pull::None);
        dp.set_as_input();
        dm.set_as_input();
        Self {
            dp,
            dm,
            driving: false,
        }
    }
}

impl LinePins for GpioLines {
    #[inline(always)]
    fn sample(&mut self) -> LineState {
        match (self.dp.is_high(), self.dm.is_high()) {
            (false, false) => LineState::Se0,
            (true, false) => LineState::K,
            // SE1 never happens on a healthy bus; treat it as idle
            _ => LineState::J,
        }
    }

    #[inline(always)]
    fn drive(&mut self, state: LineState) {
        let (dp, dm) = match state {
            LineState::J => (false, true),
            LineState::K => (true, false),
            LineState::Se0 => (false, false),
        };
        self.dp.set_level(dp.into());
        self.dm.set_level(dm.into());
        if !self.driving {
            self.dp.set_as_output();
            self.dm.set_as_output();
            self.driving = true;
        }
    }

    fn release(&mut self) {
        // the pull-up holds J from here
        self.dp.set_as_input();
        self.dm.set_as_input();
        self.driving = false;
    }
}

/// Quarter-bit timebase counting core cycles on SysTick.
pub struct SysTickClock {
    _syst: SYST,
    cycles_per_quarter: U24F8,
    start: u32,
}

impl SysTickClock {
    /// Take over SysTick as a free-running 24-bit down counter at `sys_hz`.
    pub fn new(mut syst: SYST, sys_hz: u32) -> Self {
        syst.set_clock_source(SystClkSource::Core);
        syst.set_reload(SYST_MASK);
        syst.clear_current();
        syst.enable_counter();
        // kHz keeps the numerator inside U24F8's integer range
        let cycles_per_quarter = U24F8::from_num(sys_hz / 1_000)
            / U24F8::from_num(BIT_RATE_HZ * softusb_proto::phy::QUARTERS_PER_BIT / 1_000);
        Self {
            _syst: syst,
            cycles_per_quarter,
            start: SYST::get_current(),
        }
    }

    #[must_use]
    pub fn cycles_per_quarter(&self) -> U24F8 {
        self.cycles_per_quarter
    }
}

impl BitClock for SysTickClock {
    #[inline(always)]
    fn restart(&mut self) {
        self.start = SYST::get_current();
    }

    #[inline(always)]
    fn wait_until(&mut self, quarters: u32) {
        let target = self
            .cycles_per_quarter
            .saturating_mul_int(quarters)
            .to_num::<u32>();
        while self.start.wrapping_sub(SYST::get_current()) & SYST_MASK < target {}
    }
}

//! Watchdog, sample ticks and the boot key cell.

use embassy_rp::watchdog::Watchdog;
use embassy_time::{block_for, Duration, Instant};
use retropad_core::Board;

/// Reset after this long without a feed.
pub const WATCHDOG_PERIOD: Duration = Duration::from_secs(2);
/// Controller sample period (60 Hz).
pub const SAMPLE_PERIOD: Duration = Duration::from_micros(16_667);
/// HID idle-rate unit.
pub const IDLE_TICK: Duration = Duration::from_millis(4);

/// Watchdog scratch register holding the boot key. Scratch registers keep their value
/// across a watchdog reset.
pub const BOOT_KEY_SCRATCH: usize = 0;

/// Periodic deadline that catches up without bursting after a long stall.
struct Ticker {
    period: Duration,
    next: Instant,
}

impl Ticker {
    fn new(period: Duration) -> Self {
        Self {
            period,
            next: Instant::now() + period,
        }
    }

    fn due(&mut self) -> bool {
        let now = Instant::now();
        if now < self.next {
            return false;
        }
        self.next += self.period;
        if self.next <= now {
            self.next = now + self.period;
        }
        true
    }
}

pub struct Rp2040Board {
    watchdog: Watchdog,
    sample: Ticker,
    idle: Ticker,
}

impl Rp2040Board {
    /// Start the watchdog and the tick timers.
    pub fn new(mut watchdog: Watchdog) -> Self {
        watchdog.start(WATCHDOG_PERIOD);
        defmt::info!("watchdog started ({} ms)", WATCHDOG_PERIOD.as_millis());
        Self {
            watchdog,
            sample: Ticker::new(SAMPLE_PERIOD),
            idle: Ticker::new(IDLE_TICK),
        }
    }
}

/// Read and clear the boot key left by the previous run.
pub fn take_boot_key(watchdog: &mut Watchdog) -> Option<u16> {
    let key = watchdog.get_scratch(BOOT_KEY_SCRATCH);
    watchdog.set_scratch(BOOT_KEY_SCRATCH, 0);
    u16::try_from(key).ok().filter(|&key| key != 0)
}

impl Board for Rp2040Board {
    fn feed_watchdog(&mut self) {
        self.watchdog.feed();
    }

    fn sample_due(&mut self) -> bool {
        self.sample.due()
    }

    fn idle_tick_due(&mut self) -> bool {
        self.idle.due()
    }

    fn store_boot_key(&mut self, key: u16) {
        self.watchdog.set_scratch(BOOT_KEY_SCRATCH, u32::from(key));
    }

    fn delay_ms(&mut self, ms: u32) {
        block_for(Duration::from_millis(u64::from(ms)));
    }

    fn halt_for_reset(&mut self) -> ! {
        defmt::info!("waiting for watchdog reset");
        loop {
            cortex_m::asm::nop();
        }
    }
}

//! Board services the scheduler needs besides the USB lines.

/// Watchdog, timers and the boot key cell of the target chip.
pub trait Board {
    /// Restart the watchdog countdown.
    fn feed_watchdog(&mut self);

    /// Whether the controller sample period (~16.7 ms) elapsed since the last call
    /// that returned `true`.
    fn sample_due(&mut self) -> bool;

    /// Whether a 4 ms idle tick elapsed since the last call that returned `true`.
    fn idle_tick_due(&mut self) -> bool;

    /// Write the boot key into the memory cell that survives a watchdog reset.
    fn store_boot_key(&mut self, key: u16);

    /// Busy-wait for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);

    /// Stop feeding the watchdog and wait for it to reset the chip.
    fn halt_for_reset(&mut self) -> !;
}

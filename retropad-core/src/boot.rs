//! Firmware-update request from the host.
//!
//! Writing [`BOOTLOADER_REQUEST`] to the vendor feature report arms the trigger. The
//! scheduler then stores [`BOOT_KEY`] in the reserved memory cell the bootloader
//! checks at power-on, drops off the bus, and lets the watchdog reset the chip.

use portable_atomic::{AtomicBool, Ordering};

/// Value stored in the boot key cell to stay in the bootloader after reset.
pub const BOOT_KEY: u16 = 0xBEEF;

/// First data byte of a SET_REPORT that requests the bootloader.
pub const BOOTLOADER_REQUEST: u8 = 0x5A;

/// One-way flag set from the USB request path and read by the main loop.
#[derive(Debug, Default)]
pub struct BootTrigger {
    armed: AtomicBool,
}

impl BootTrigger {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            armed: AtomicBool::new(false),
        }
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }
}

//! The contract every controller decoder fulfils.

use core::fmt;

use crate::report::{ReportBuffer, ReportId};

/// Error type for controller setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControllerError {
    /// A GPIO pin could not be configured or driven.
    Pin,
    /// The ADC or capture timer is not available.
    Peripheral,
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pin => write!(f, "pin configuration failed"),
            Self::Peripheral => write!(f, "peripheral unavailable"),
        }
    }
}

/// One vintage controller family: how to sample it and how its HID reports look.
///
/// Exactly one implementation is compiled into a firmware image. The scheduler calls
/// [`init`](Self::init) once before USB comes up, [`update`](Self::update) on every
/// sample tick, and [`changed`](Self::changed) / [`build_report`](Self::build_report)
/// per report id.
pub trait Controller {
    /// HID report descriptor. Must declare the 1-byte vendor feature used for
    /// bootloader requests.
    const REPORT_DESCRIPTOR: &'static [u8];

    /// Device descriptor replacing the one generated from the USB configuration.
    const DEVICE_DESCRIPTOR: Option<&'static [u8]> = None;

    /// Number of reports, with ids `1..=REPORT_COUNT`.
    const REPORT_COUNT: u8 = 1;

    /// Configure pins and peripherals. Idempotent.
    fn init(&mut self) -> Result<(), ControllerError>;

    /// Take one sample of the hardware into the current snapshot.
    fn update(&mut self);

    /// Whether the current snapshot differs from what report `id` last reported.
    fn changed(&self, id: ReportId) -> bool;

    /// Write report `id` into `buf`, remember it as reported, and return its length.
    fn build_report(&mut self, id: ReportId, buf: &mut ReportBuffer) -> usize;
}

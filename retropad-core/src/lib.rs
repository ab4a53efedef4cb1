//! Platform-agnostic core of a retro controller to USB adapter.
//!
//! This crate ties a [`Controller`] decoder to the software USB device from
//! `softusb_proto` without any chip-specific dependencies. It runs both in embedded
//! `no_std` environments and on host for testing.
//!
//! # Overview
//!
//! - [`controller`]: the decoder contract ([`Controller`])
//! - [`report`]: report ids and due masks ([`ReportMask`]), axis helpers
//! - [`idle`]: HID idle rates ([`IdleTable`])
//! - [`boot`]: the bootloader request flag ([`BootTrigger`])
//! - [`function`]: HID class requests answered from the controller ([`HidFunction`])
//! - [`board`]: watchdog, ticks and boot key cell ([`Board`])
//! - [`scheduler`]: the main loop ([`Scheduler`])
//!
//! # Main loop
//!
//! Every iteration feeds the watchdog, checks the bootloader flag, polls USB, samples
//! the controller on the sample tick, counts down idle rates on the 4 ms tick, and
//! sends every due report once the interrupt endpoint is free.
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting and logging (for embedded use)
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod board;
pub mod boot;
pub mod controller;
pub mod function;
pub mod idle;
pub mod report;
pub mod scheduler;

// Re-export main types at crate root
pub use board::Board;
pub use boot::{BootTrigger, BOOTLOADER_REQUEST, BOOT_KEY};
pub use controller::{Controller, ControllerError};
pub use function::HidFunction;
pub use idle::IdleTable;
pub use report::{
    clamp_axis, ReportBuffer, ReportId, ReportMask, AXIS_CENTER, AXIS_MAX, AXIS_MIN,
    MAX_REPORTS, REPORT_CAPACITY,
};
pub use scheduler::{Control, Scheduler, REENUMERATE_MS};

//! Retro controller to USB adapter for RP2040.
//!
//! One vintage controller on the GPIOs, one bit-banged low-speed USB port on two
//! more. The RP2040's own USB controller is not used.
//!
//! # Overview
//!
//! Core 0 runs the [`Scheduler`](retropad_core::Scheduler) loop with interrupts left
//! quiet, since every USB bit is timed by busy-waiting on SysTick. The Macintosh mouse
//! build also starts core 1, which decodes the quadrature lines and publishes motion
//! through a [`QuadratureCell`](retropad_decoders::QuadratureCell).
//!
//! # Hardware Configuration
//!
//! | Function | GPIO | Description |
//! |----------|------|-------------|
//! | USB D+   | 14   | 68 Ω series resistor |
//! | USB D-   | 15   | 68 Ω series resistor, 1.5 kΩ pull-up to 3.3 V |
//! | Controller | 2-11 | Per variant, see `src/bin/main.rs` |
//! | ADC0/ADC1 | 26, 27 | Vectrex stick X/Y |
//!
//! # Modules
//!
//! - [`phy`]: USB line pins ([`GpioLines`]) and bit clock ([`SysTickClock`])
//! - [`board`]: watchdog, ticks and boot key ([`Rp2040Board`])
//! - [`analog`]: paddle RC timing and ADC stick inputs
//! - [`variant`]: USB identity of the selected controller
//!
//! # Features
//!
//! - **`dev-panic`** (default): Use `panic-probe` for development (prints panic info via RTT)
//! - **`prod-panic`**: Use `panic-reset` for production (silent watchdog reset)
//! - **`controller-*`**: Controller variant, exactly one (`controller-atari` by default)

#![no_std]

#[cfg(not(any(
    feature = "controller-atari",
    feature = "controller-paddles",
    feature = "controller-c64-paddles",
    feature = "controller-snes",
    feature = "controller-vectrex",
    feature = "controller-mac-mouse",
    feature = "controller-intellivision",
)))]
compile_error!("Select a controller variant with one `controller-*` feature");

// Ensure the controller features are mutually exclusive
const SELECTED_VARIANTS: usize = cfg!(feature = "controller-atari") as usize
    + cfg!(feature = "controller-paddles") as usize
    + cfg!(feature = "controller-c64-paddles") as usize
    + cfg!(feature = "controller-snes") as usize
    + cfg!(feature = "controller-vectrex") as usize
    + cfg!(feature = "controller-mac-mouse") as usize
    + cfg!(feature = "controller-intellivision") as usize;
const _: () = assert!(
    SELECTED_VARIANTS <= 1,
    "Cannot enable more than one `controller-*` feature - build with --no-default-features"
);

#[cfg(all(feature = "dev-panic", feature = "prod-panic"))]
compile_error!("Cannot enable both `dev-panic` and `prod-panic` features");

pub mod analog;
pub mod board;
pub mod phy;
pub mod variant;

pub use analog::{AdcStick, FlexPot, TimerCapture};
pub use board::{take_boot_key, Rp2040Board};
pub use phy::{GpioLines, SysTickClock};

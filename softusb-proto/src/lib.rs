//! Bit-banged low-speed USB device stack for microcontrollers without a USB
//! peripheral.
//!
//! The crate is split by layer, bottom to top:
//!
//! - **Line**: NRZI coding with bit stuffing, SYNC and end-of-packet
//!   - [`line::encode()`] - bytes to line states
//!   - [`line::Decoder`] - line states to bytes, one symbol at a time
//!
//! - **Packets**: PIDs, tokens, data and handshakes with CRC5/CRC16 checks
//!   - [`Packet`] - a parsed packet
//!   - [`packet::encode_data()`], [`packet::encode_token()`], [`packet::handshake()`]
//!
//! - **PHY**: [`SoftPhy`] samples and drives two GPIO lines against a quarter-bit
//!   [`BitClock`]; anything else implementing [`Phy`] works too
//!
//! - **Device**: [`UsbDevice`] answers enumeration, HID class requests and the
//!   interrupt IN endpoint, calling into a [`HidClass`] for descriptors and reports
//!
//! # Example
//!
//! ```
//! use softusb_proto::{Config, DeviceState, Phy, Received, UsbDevice, Window};
//! use softusb_proto::line::{LineError, MAX_PACKET_LEN};
//!
//! struct Unplugged;
//!
//! impl Phy for Unplugged {
//!     fn receive(
//!         &mut self,
//!         _buf: &mut [u8; MAX_PACKET_LEN],
//!         _window: Window,
//!     ) -> Result<Received, LineError> {
//!         Ok(Received::Idle)
//!     }
//!     fn transmit(&mut self, _bytes: &[u8]) {}
//!     fn attach(&mut self) {}
//!     fn detach(&mut self) {}
//! }
//!
//! let config = Config::new(0x1209, 0x5250).product("Joystick");
//! let mut device = UsbDevice::new(config, 0);
//! device.attach(&mut Unplugged);
//! assert_eq!(device.state(), DeviceState::Default);
//! assert!(device.is_interrupt_ready());
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting and device logging
//! - **`sim`**: Enable [`sim::SimHost`], an in-memory host for tests
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod class;
pub mod config;
pub mod crc;
pub mod descriptor;
pub mod device;
pub mod line;
pub mod packet;
pub mod phy;
pub mod setup;
#[cfg(any(test, feature = "sim"))]
pub mod sim;

// Re-export types at crate root for convenience
pub use class::{HidClass, ReportType};
pub use config::Config;
pub use device::{DeviceState, Event, UsbDevice, UsbError};
pub use line::{LineError, LineState};
pub use packet::{DataToggle, Packet, PacketError, Pid};
pub use phy::{BitClock, LinePins, Phy, PhyConfig, Received, SoftPhy, Window};
pub use setup::{SetupError, SetupPacket};

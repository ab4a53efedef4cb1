//! Standard and HID descriptor encoding.
//!
//! The device exposes one configuration with one HID interface and one interrupt IN
//! endpoint. The HID descriptor lives inside the configuration descriptor and is also
//! served on its own.

use crate::config::Config;

/// Descriptor type codes.
pub mod kind {
    pub const DEVICE: u8 = 0x01;
    pub const CONFIGURATION: u8 = 0x02;
    pub const STRING: u8 = 0x03;
    pub const INTERFACE: u8 = 0x04;
    pub const ENDPOINT: u8 = 0x05;
    pub const HID: u8 = 0x21;
    pub const REPORT: u8 = 0x22;
}

/// Length of the device descriptor.
pub const DEVICE_LEN: usize = 18;

/// Total length of the configuration descriptor set.
pub const CONFIGURATION_LEN: usize = 9 + 9 + 9 + 7;

/// Offset of the HID descriptor within the configuration descriptor.
pub const HID_OFFSET: usize = 18;

/// Length of the HID descriptor.
pub const HID_LEN: usize = 9;

/// Interrupt IN endpoint address.
pub const INTERRUPT_ENDPOINT: u8 = 0x81;

/// Maximum packet size of both endpoints.
pub const MAX_PACKET_SIZE: u8 = 8;

/// String descriptor zero: US English only.
pub const LANGUAGE_IDS: [u8; 4] = [4, kind::STRING, 0x09, 0x04];

/// Encode the device descriptor.
#[must_use]
pub fn device_descriptor(config: &Config) -> [u8; DEVICE_LEN] {
    let [vid_lo, vid_hi] = config.vendor_id.to_le_bytes();
    let [pid_lo, pid_hi] = config.product_id.to_le_bytes();
    let [rel_lo, rel_hi] = config.device_release.to_le_bytes();
    let string_index = |index: u8| {
        if config.string(index).is_some() {
            index
        } else {
            0
        }
    };
    [
        DEVICE_LEN as u8,
        kind::DEVICE,
        0x10,
        0x01, // USB 1.1
        0x00, // class defined per interface
        0x00,
        0x00,
        MAX_PACKET_SIZE,
        vid_lo,
        vid_hi,
        pid_lo,
        pid_hi,
        rel_lo,
        rel_hi,
        string_index(1),
        string_index(2),
        string_index(3),
        0x01, // one configuration
    ]
}

/// Encode the configuration descriptor set, announcing a report descriptor of
/// `report_descriptor_len` bytes.
#[must_use]
pub fn configuration_descriptor(
    config: &Config,
    report_descriptor_len: u16,
) -> [u8; CONFIGURATION_LEN] {
    let [total_lo, total_hi] = (CONFIGURATION_LEN as u16).to_le_bytes();
    let [report_lo, report_hi] = report_descriptor_len.to_le_bytes();
    let attributes = if config.self_powered { 0xC0 } else { 0x80 };
    let max_power = (config.max_power_ma / 2).min(0xFF) as u8;
    [
        // Configuration
        9,
        kind::CONFIGURATION,
        total_lo,
        total_hi,
        1, // interfaces
        1, // configuration value
        0,
        attributes,
        max_power,
        // Interface
        9,
        kind::INTERFACE,
        0, // interface number
        0, // alternate setting
        1, // endpoints
        0x03, // HID
        0x00, // no boot subclass
        0x00,
        0,
        // HID
        HID_LEN as u8,
        kind::HID,
        0x01,
        0x01, // HID 1.01
        0x00, // country
        1,    // class descriptors
        kind::REPORT,
        report_lo,
        report_hi,
        // Endpoint
        7,
        kind::ENDPOINT,
        INTERRUPT_ENDPOINT,
        0x03, // interrupt
        MAX_PACKET_SIZE,
        0,
        config.poll_interval_ms,
    ]
}

/// Encode `text` as a UTF-16LE string descriptor into `buf`, truncating to fit.
///
/// Returns the descriptor length.
pub fn string_descriptor(text: &str, buf: &mut [u8]) -> usize {
    if buf.len() < 2 {
        return 0;
    }
    let mut len = 2;
    for unit in text.encode_utf16() {
        if len + 2 > buf.len().min(u8::MAX as usize) {
            break;
        }
        buf[len..len + 2].copy_from_slice(&unit.to_le_bytes());
        len += 2;
    }
    buf[0] = len as u8;
    buf[1] = kind::STRING;
    len
}

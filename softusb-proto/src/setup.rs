//! SETUP packet decoding and request codes.

use core::fmt;

/// Length of a SETUP data stage.
pub const SETUP_LEN: usize = 8;

/// Standard request codes (USB 2.0 table 9-4).
pub mod request {
    pub const GET_STATUS: u8 = 0x00;
    pub const CLEAR_FEATURE: u8 = 0x01;
    pub const SET_FEATURE: u8 = 0x03;
    pub const SET_ADDRESS: u8 = 0x05;
    pub const GET_DESCRIPTOR: u8 = 0x06;
    pub const SET_DESCRIPTOR: u8 = 0x07;
    pub const GET_CONFIGURATION: u8 = 0x08;
    pub const SET_CONFIGURATION: u8 = 0x09;
    pub const GET_INTERFACE: u8 = 0x0A;
    pub const SET_INTERFACE: u8 = 0x0B;
}

/// HID class request codes.
pub mod hid_request {
    pub const GET_REPORT: u8 = 0x01;
    pub const GET_IDLE: u8 = 0x02;
    pub const GET_PROTOCOL: u8 = 0x03;
    pub const SET_REPORT: u8 = 0x09;
    pub const SET_IDLE: u8 = 0x0A;
    pub const SET_PROTOCOL: u8 = 0x0B;
}

/// Data stage direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Host to device.
    Out,
    /// Device to host.
    In,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestKind {
    Standard,
    Class,
    Vendor,
    Reserved,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Recipient {
    Device,
    Interface,
    Endpoint,
    Other,
}

/// Decoded `bmRequestType`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RequestType {
    pub direction: Direction,
    pub kind: RequestKind,
    pub recipient: Recipient,
}

impl From<u8> for RequestType {
    fn from(raw: u8) -> Self {
        let direction = if raw & 0x80 != 0 {
            Direction::In
        } else {
            Direction::Out
        };
        let kind = match (raw >> 5) & 0x03 {
            0 => RequestKind::Standard,
            1 => RequestKind::Class,
            2 => RequestKind::Vendor,
            _ => RequestKind::Reserved,
        };
        let recipient = match raw & 0x1F {
            0 => Recipient::Device,
            1 => Recipient::Interface,
            2 => Recipient::Endpoint,
            _ => Recipient::Other,
        };
        Self {
            direction,
            kind,
            recipient,
        }
    }
}

/// The 8-byte request that opens every control transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetupPacket {
    pub request_type: RequestType,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl SetupPacket {
    /// Decode a SETUP data stage. Multi-byte fields are little-endian.
    pub fn parse(bytes: &[u8]) -> Result<Self, SetupError> {
        let &[bm, request, v0, v1, i0, i1, l0, l1] = bytes else {
            return Err(SetupError::Length);
        };
        Ok(Self {
            request_type: RequestType::from(bm),
            request,
            value: u16::from_le_bytes([v0, v1]),
            index: u16::from_le_bytes([i0, i1]),
            length: u16::from_le_bytes([l0, l1]),
        })
    }

    /// Low byte of `wValue` (descriptor index, report id, address...).
    #[inline]
    #[must_use]
    pub const fn value_low(&self) -> u8 {
        self.value as u8
    }

    /// High byte of `wValue` (descriptor type, report type, idle rate...).
    #[inline]
    #[must_use]
    pub const fn value_high(&self) -> u8 {
        (self.value >> 8) as u8
    }
}

/// Error type for SETUP decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SetupError {
    /// Data stage was not exactly eight bytes.
    Length,
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Length => write!(f, "SETUP data must be 8 bytes"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get_descriptor() {
        let setup = SetupPacket::parse(&[0x80, 0x06, 0x00, 0x01, 0x00, 0x00, 0x40, 0x00]).unwrap();
        assert_eq!(setup.request_type.direction, Direction::In);
        assert_eq!(setup.request_type.kind, RequestKind::Standard);
        assert_eq!(setup.request_type.recipient, Recipient::Device);
        assert_eq!(setup.request, request::GET_DESCRIPTOR);
        assert_eq!(setup.value_high(), 0x01);
        assert_eq!(setup.value_low(), 0x00);
        assert_eq!(setup.length, 64);
    }

    #[test]
    fn test_parse_hid_set_idle() {
        let setup = SetupPacket::parse(&[0x21, 0x0A, 0x00, 0x7D, 0x00, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(setup.request_type.direction, Direction::Out);
        assert_eq!(setup.request_type.kind, RequestKind::Class);
        assert_eq!(setup.request_type.recipient, Recipient::Interface);
        assert_eq!(setup.request, hid_request::SET_IDLE);
        assert_eq!(setup.value_high(), 125);
    }

    #[test]
    fn test_parse_wrong_length() {
        assert_eq!(SetupPacket::parse(&[0x80, 0x06]), Err(SetupError::Length));
    }
}

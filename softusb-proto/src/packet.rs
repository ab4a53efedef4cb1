//! Packet identifiers and token/data/handshake packet formats.

use core::fmt;

use crate::crc::{crc16, crc5};
use crate::line::MAX_PACKET_LEN;

/// Largest data payload on a low-speed endpoint.
pub const MAX_PAYLOAD: usize = 8;

/// Packet identifier. The low nibble is the type, the high nibble its complement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Pid {
    Out = 0b0001,
    In = 0b1001,
    Sof = 0b0101,
    Setup = 0b1101,
    Data0 = 0b0011,
    Data1 = 0b1011,
    Ack = 0b0010,
    Nak = 0b1010,
    Stall = 0b1110,
}

impl Pid {
    /// The PID byte as sent on the wire, check nibble included.
    #[inline]
    #[must_use]
    pub const fn byte(self) -> u8 {
        let pid = self as u8;
        pid | ((!pid & 0x0F) << 4)
    }

    /// Decode a PID byte, validating its check nibble.
    pub fn from_byte(byte: u8) -> Result<Self, PacketError> {
        if byte >> 4 != !byte & 0x0F {
            return Err(PacketError::PidCheck);
        }
        match byte & 0x0F {
            0b0001 => Ok(Self::Out),
            0b1001 => Ok(Self::In),
            0b0101 => Ok(Self::Sof),
            0b1101 => Ok(Self::Setup),
            0b0011 => Ok(Self::Data0),
            0b1011 => Ok(Self::Data1),
            0b0010 => Ok(Self::Ack),
            0b1010 => Ok(Self::Nak),
            0b1110 => Ok(Self::Stall),
            _ => Err(PacketError::UnsupportedPid),
        }
    }
}

/// Data toggle sequence bit of an endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataToggle {
    #[default]
    Data0,
    Data1,
}

impl DataToggle {
    /// The data PID carrying this toggle.
    #[inline]
    #[must_use]
    pub const fn pid(self) -> Pid {
        match self {
            Self::Data0 => Pid::Data0,
            Self::Data1 => Pid::Data1,
        }
    }

    /// The toggle carried by a data PID.
    #[must_use]
    pub const fn of(pid: Pid) -> Option<Self> {
        match pid {
            Pid::Data0 => Some(Self::Data0),
            Pid::Data1 => Some(Self::Data1),
            _ => None,
        }
    }

    /// The other toggle.
    #[inline]
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Data0 => Self::Data1,
            Self::Data1 => Self::Data0,
        }
    }
}

/// IN, OUT or SETUP token addressed to one endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Token {
    pub pid: Pid,
    pub address: u8,
    pub endpoint: u8,
}

impl Token {
    #[must_use]
    pub const fn new(pid: Pid, address: u8, endpoint: u8) -> Self {
        Self {
            pid,
            address: address & 0x7F,
            endpoint: endpoint & 0x0F,
        }
    }

    const fn field(&self) -> u16 {
        self.address as u16 | ((self.endpoint as u16) << 7)
    }
}

/// A received packet, borrowing its payload from the receive buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Packet<'a> {
    Token(Token),
    /// Start of frame with its 11-bit frame number.
    Sof(u16),
    Data { toggle: DataToggle, payload: &'a [u8] },
    Handshake(Pid),
}

impl<'a> Packet<'a> {
    /// Parse and CRC-check the bytes of one packet (PID first).
    pub fn parse(bytes: &'a [u8]) -> Result<Self, PacketError> {
        let (&pid_byte, rest) = bytes.split_first().ok_or(PacketError::Truncated)?;
        let pid = Pid::from_byte(pid_byte)?;
        match pid {
            Pid::Out | Pid::In | Pid::Setup | Pid::Sof => {
                let &[lo, hi] = rest else {
                    return Err(PacketError::Truncated);
                };
                let raw = u16::from_le_bytes([lo, hi]);
                let field = raw & 0x07FF;
                if crc5(field) != (raw >> 11) as u8 {
                    return Err(PacketError::Crc);
                }
                if pid == Pid::Sof {
                    Ok(Self::Sof(field))
                } else {
                    Ok(Self::Token(Token::new(
                        pid,
                        (field & 0x7F) as u8,
                        (field >> 7) as u8,
                    )))
                }
            }
            Pid::Data0 | Pid::Data1 => {
                if rest.len() < 2 {
                    return Err(PacketError::Truncated);
                }
                let (payload, crc) = rest.split_at(rest.len() - 2);
                if payload.len() > MAX_PAYLOAD {
                    return Err(PacketError::TooLong);
                }
                if crc16(payload) != u16::from_le_bytes([crc[0], crc[1]]) {
                    return Err(PacketError::Crc);
                }
                let toggle = if pid == Pid::Data0 {
                    DataToggle::Data0
                } else {
                    DataToggle::Data1
                };
                Ok(Self::Data { toggle, payload })
            }
            Pid::Ack | Pid::Nak | Pid::Stall => {
                if rest.is_empty() {
                    Ok(Self::Handshake(pid))
                } else {
                    Err(PacketError::TooLong)
                }
            }
        }
    }
}

/// Encode an IN/OUT/SETUP token.
#[must_use]
pub const fn encode_token(token: Token) -> [u8; 3] {
    let field = token.field();
    let raw = field | ((crc5(field) as u16) << 11);
    [token.pid.byte(), raw as u8, (raw >> 8) as u8]
}

/// Encode a data packet into `out`, returning the used length.
pub fn encode_data(
    toggle: DataToggle,
    payload: &[u8],
    out: &mut [u8; MAX_PACKET_LEN],
) -> Result<usize, PacketError> {
    if payload.len() > MAX_PAYLOAD {
        return Err(PacketError::TooLong);
    }
    let len = payload.len();
    out[0] = toggle.pid().byte();
    out[1..=len].copy_from_slice(payload);
    out[len + 1..len + 3].copy_from_slice(&crc16(payload).to_le_bytes());
    Ok(len + 3)
}

/// Encode a handshake packet.
#[inline]
#[must_use]
pub const fn handshake(pid: Pid) -> [u8; 1] {
    [pid.byte()]
}

/// Error type for packet parsing and encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketError {
    /// PID check nibble is not the complement of the type nibble.
    PidCheck,
    /// Valid PID that a low-speed function never handles (PRE, SPLIT...).
    UnsupportedPid,
    /// CRC mismatch.
    Crc,
    /// Fewer bytes than the packet type needs.
    Truncated,
    /// More bytes than the packet type allows.
    TooLong,
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PidCheck => write!(f, "PID check nibble mismatch"),
            Self::UnsupportedPid => write!(f, "unsupported PID"),
            Self::Crc => write!(f, "CRC mismatch"),
            Self::Truncated => write!(f, "truncated packet"),
            Self::TooLong => write!(f, "packet too long"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pid_bytes() {
        assert_eq!(Pid::Out.byte(), 0xE1);
        assert_eq!(Pid::In.byte(), 0x69);
        assert_eq!(Pid::Sof.byte(), 0xA5);
        assert_eq!(Pid::Setup.byte(), 0x2D);
        assert_eq!(Pid::Data0.byte(), 0xC3);
        assert_eq!(Pid::Data1.byte(), 0x4B);
        assert_eq!(Pid::Ack.byte(), 0xD2);
        assert_eq!(Pid::Nak.byte(), 0x5A);
        assert_eq!(Pid::Stall.byte(), 0x1E);
    }

    #[test]
    fn test_pid_check_nibble() {
        assert_eq!(Pid::from_byte(0x2D), Ok(Pid::Setup));
        assert_eq!(Pid::from_byte(0x2E), Err(PacketError::PidCheck));
        // PRE is valid on the wire but never addressed to us
        assert_eq!(Pid::from_byte(0x3C), Err(PacketError::UnsupportedPid));
    }

    #[test]
    fn test_setup_token_to_address_zero() {
        let bytes = encode_token(Token::new(Pid::Setup, 0, 0));
        assert_eq!(bytes, [0x2D, 0x00, 0x10]);
        assert_eq!(
            Packet::parse(&bytes),
            Ok(Packet::Token(Token::new(Pid::Setup, 0, 0)))
        );
    }

    #[test]
    fn test_token_fields_survive() {
        let token = Token::new(Pid::In, 0x15, 1);
        let bytes = encode_token(token);
        assert_eq!(Packet::parse(&bytes), Ok(Packet::Token(token)));
    }

    #[test]
    fn test_token_crc_mismatch() {
        let mut bytes = encode_token(Token::new(Pid::In, 3, 1));
        bytes[1] ^= 0x01;
        assert_eq!(Packet::parse(&bytes), Err(PacketError::Crc));
    }

    #[test]
    fn test_data_packet_layout() {
        let setup = [0x80, 0x06, 0x00, 0x01, 0x00, 0x00, 0x40, 0x00];
        let mut out = [0u8; MAX_PACKET_LEN];
        let len = encode_data(DataToggle::Data0, &setup, &mut out).unwrap();
        assert_eq!(len, 11);
        assert_eq!(out[0], 0xC3);
        assert_eq!(&out[9..11], &[0xDD, 0x94]);
    }

    #[test]
    fn test_data_packet_single_bit_error() {
        let mut out = [0u8; MAX_PACKET_LEN];
        let len = encode_data(DataToggle::Data1, &[1, 2, 3, 4], &mut out).unwrap();
        assert!(matches!(
            Packet::parse(&out[..len]),
            Ok(Packet::Data { toggle: DataToggle::Data1, payload: [1, 2, 3, 4] })
        ));

        out[2] ^= 0x10;
        assert_eq!(Packet::parse(&out[..len]), Err(PacketError::Crc));
    }

    #[test]
    fn test_zero_length_data() {
        let mut out = [0u8; MAX_PACKET_LEN];
        let len = encode_data(DataToggle::Data1, &[], &mut out).unwrap();
        assert_eq!(&out[..len], &[0x4B, 0x00, 0x00]);
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let mut out = [0u8; MAX_PACKET_LEN];
        assert_eq!(
            encode_data(DataToggle::Data0, &[0; 9], &mut out),
            Err(PacketError::TooLong)
        );
    }

    #[test]
    fn test_handshake() {
        assert_eq!(Packet::parse(&handshake(Pid::Ack)), Ok(Packet::Handshake(Pid::Ack)));
        assert_eq!(Packet::parse(&[]), Err(PacketError::Truncated));
    }

    #[test]
    fn test_toggle_flip() {
        assert_eq!(DataToggle::Data0.flipped(), DataToggle::Data1);
        assert_eq!(DataToggle::of(Pid::Data1), Some(DataToggle::Data1));
        assert_eq!(DataToggle::of(Pid::Ack), None);
    }
}

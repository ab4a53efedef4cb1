//! NRZI line coding with bit stuffing for low-speed signaling.
//!
//! A `0` bit toggles the line between J and K, a `1` bit holds it. After six
//! consecutive `1` bits the transmitter inserts a `0` so the receiver keeps its bit
//! clock locked; the receiver drops it again. Every packet starts with the SYNC
//! pattern (`KJKJKJKK`) and ends with two bit times of SE0 followed by J.
//!
//! # Example
//!
//! ```
//! use softusb_proto::line::{encode, Decoder, LineState, Step, SymbolBuffer};
//!
//! let mut symbols = SymbolBuffer::new();
//! encode(&[0xD2], &mut symbols).unwrap();
//!
//! let mut decoder = Decoder::new();
//! for &state in symbols.iter() {
//!     if decoder.feed(state).unwrap() == Step::Done {
//!         break;
//!     }
//! }
//! assert_eq!(decoder.bytes(), &[0xD2]);
//! ```

use core::fmt;
use heapless::Vec;

/// Differential line state as seen on D+/D- at low speed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineState {
    /// Idle state (D- high at low speed).
    J,
    /// Opposite of J.
    K,
    /// Single-ended zero: both lines low.
    Se0,
}

impl LineState {
    /// The line state between packets.
    pub const IDLE: Self = Self::J;

    /// The other differential state. SE0 stays SE0.
    #[inline]
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::J => Self::K,
            Self::K => Self::J,
            Self::Se0 => Self::Se0,
        }
    }
}

/// SYNC field, sent LSB first.
pub const SYNC: u8 = 0x80;

/// Consecutive `1` bits after which a `0` is stuffed.
pub const STUFF_RUN: u8 = 6;

/// Largest packet handled: PID, 8 data bytes, CRC-16.
pub const MAX_PACKET_LEN: usize = 11;

/// Symbol capacity for the largest packet: SYNC, worst-case stuffing and EOP.
pub const MAX_SYMBOLS: usize = 128;

/// Line symbols of one encoded packet.
pub type SymbolBuffer = Vec<LineState, MAX_SYMBOLS>;

/// Error type for line decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineError {
    /// The first eight bits were not the SYNC pattern.
    Sync,
    /// Seven consecutive `1` bits (missing stuffed zero).
    BitStuff,
    /// End of packet seen in the middle of a byte.
    Alignment,
    /// More bytes than the largest packet, or too many symbols to encode.
    Overflow,
    /// SE0 never arrived within the receive window.
    Timeout,
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync => write!(f, "missing SYNC pattern"),
            Self::BitStuff => write!(f, "bit stuffing violation"),
            Self::Alignment => write!(f, "end of packet inside a byte"),
            Self::Overflow => write!(f, "packet too long"),
            Self::Timeout => write!(f, "end of packet not seen"),
        }
    }
}

/// Encode `bytes` as a complete packet on the line: SYNC, data, EOP.
///
/// The CRC must already be part of `bytes`.
pub fn encode(bytes: &[u8], out: &mut SymbolBuffer) -> Result<(), LineError> {
    out.clear();
    let mut encoder = Encoder {
        level: LineState::IDLE,
        ones: 0,
    };
    encoder.push_byte(SYNC, out)?;
    for &byte in bytes {
        encoder.push_byte(byte, out)?;
    }
    for state in [LineState::Se0, LineState::Se0, LineState::J] {
        out.push(state).map_err(|_| LineError::Overflow)?;
    }
    Ok(())
}

struct Encoder {
    level: LineState,
    ones: u8,
}

impl Encoder {
    fn push_byte(&mut self, byte: u8, out: &mut SymbolBuffer) -> Result<(), LineError> {
        for i in 0..8 {
            self.push_bit(byte & (1 << i) != 0, out)?;
        }
        Ok(())
    }

    fn push_bit(&mut self, bit: bool, out: &mut SymbolBuffer) -> Result<(), LineError> {
        if bit {
            self.ones += 1;
        } else {
            self.ones = 0;
            self.level = self.level.toggled();
        }
        out.push(self.level).map_err(|_| LineError::Overflow)?;

        if self.ones == STUFF_RUN {
            self.ones = 0;
            self.level = self.level.toggled();
            out.push(self.level).map_err(|_| LineError::Overflow)?;
        }
        Ok(())
    }
}

/// Progress of a [`Decoder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
    /// Keep sampling.
    More,
    /// End of packet reached; bytes are available.
    Done,
}

/// Incremental receiver fed one sampled line state per bit time, starting with the
/// first K of SYNC.
#[derive(Debug)]
pub struct Decoder {
    prev: LineState,
    ones: u8,
    sync_bits: u8,
    sync: u8,
    byte: u8,
    nbits: u8,
    bytes: Vec<u8, MAX_PACKET_LEN>,
}

impl Decoder {
    /// Create a decoder expecting SYNC from an idle line.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            prev: LineState::IDLE,
            ones: 0,
            sync_bits: 0,
            sync: 0,
            byte: 0,
            nbits: 0,
            bytes: Vec::new(),
        }
    }

    /// Prepare for the next packet.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Bytes received so far (PID first).
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Feed the line state sampled in the middle of the next bit time.
    pub fn feed(&mut self, state: LineState) -> Result<Step, LineError> {
        if state == LineState::Se0 {
            if self.sync_bits < 8 {
                return Err(LineError::Sync);
            }
            if self.nbits != 0 {
                return Err(LineError::Alignment);
            }
            return Ok(Step::Done);
        }

        let bit = state == self.prev;
        self.prev = state;

        if self.ones == STUFF_RUN {
            self.ones = 0;
            return if bit {
                Err(LineError::BitStuff)
            } else {
                Ok(Step::More)
            };
        }
        if bit {
            self.ones += 1;
        } else {
            self.ones = 0;
        }

        if self.sync_bits < 8 {
            self.sync = (self.sync >> 1) | (u8::from(bit) << 7);
            self.sync_bits += 1;
            if self.sync_bits == 8 && self.sync != SYNC {
                return Err(LineError::Sync);
            }
            return Ok(Step::More);
        }

        self.byte |= u8::from(bit) << self.nbits;
        self.nbits += 1;
        if self.nbits == 8 {
            self.bytes
                .push(self.byte)
                .map_err(|_| LineError::Overflow)?;
            self.byte = 0;
            self.nbits = 0;
        }
        Ok(Step::More)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

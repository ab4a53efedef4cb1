//! Software physical layer: packets in and out over two GPIO lines.
//!
//! The hardware supplies two seams. [`LinePins`] reads and drives D+/D- and
//! [`BitClock`] paces everything in quarter-bit steps from a cycle counter. On top of
//! them [`SoftPhy`] implements the packet-level [`Phy`] trait the device engine
//! talks to.
//!
//! Receiving waits for the idle-to-K edge that starts SYNC, re-anchors the clock on
//! it, then samples in the middle of each bit until SE0. A long SE0 while idle is a
//! bus reset.

use crate::line::{self, Decoder, LineError, LineState, Step, SymbolBuffer, MAX_PACKET_LEN};

/// Quarter-bit steps per bit time.
pub const QUARTERS_PER_BIT: u32 = 4;

/// Direct access to the D+/D- pair.
pub trait LinePins {
    /// Sample both lines at once.
    fn sample(&mut self) -> LineState;

    /// Drive a line state, switching the pins to outputs if needed.
    fn drive(&mut self, state: LineState);

    /// Stop driving and let the pull-up return the bus to J.
    fn release(&mut self);
}

/// Bit-period timebase.
pub trait BitClock {
    /// Make "now" the reference point for [`wait_until`](Self::wait_until).
    fn restart(&mut self);

    /// Busy-wait until `quarters` quarter-bit times have elapsed since the last
    /// restart. Returns at once if that time has already passed.
    fn wait_until(&mut self, quarters: u32);
}

/// Timing windows, in bit times.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhyConfig {
    /// How long [`Window::Frame`] listens for a packet start.
    pub listen_bits: u32,
    /// How long [`Window::Turnaround`] waits for the reply of the other side.
    pub turnaround_bits: u32,
    /// Minimum SE0 length recognised as a bus reset.
    pub reset_bits: u32,
}

impl Default for PhyConfig {
    fn default() -> Self {
        Self {
            // one 1 ms frame at 1.5 Mbit/s
            listen_bits: 1500,
            // 16 bit times covers the 7.5 bit response limit plus cable delay
            turnaround_bits: 16,
            // 2.5 us
            reset_bits: 4,
        }
    }
}

/// How long a receive call may wait for the packet start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Window {
    /// Waiting for the host to start a transaction.
    Frame,
    /// Waiting for the second packet of a transaction that is already underway.
    Turnaround,
}

/// Outcome of a receive call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Received {
    /// Nothing arrived within the window.
    Idle,
    /// The host held SE0 long enough to reset the bus.
    BusReset,
    /// A packet of this many bytes is in the buffer.
    Packet(usize),
}

/// Packet-level link used by [`UsbDevice`](crate::UsbDevice).
pub trait Phy {
    /// Wait for the next packet within `window` and copy its bytes into `buf`.
    fn receive(
        &mut self,
        buf: &mut [u8; MAX_PACKET_LEN],
        window: Window,
    ) -> Result<Received, LineError>;

    /// Send one packet (PID, payload and CRC already in `bytes`).
    fn transmit(&mut self, bytes: &[u8]);

    /// Let the host see the device: release the lines so the pull-up shows J.
    fn attach(&mut self);

    /// Look unplugged: hold SE0 until [`attach`](Self::attach).
    fn detach(&mut self);
}

/// [`Phy`] implemented by bit-banging [`LinePins`] against a [`BitClock`].
pub struct SoftPhy<P, C> {
    pins: P,
    clock: C,
    config: PhyConfig,
    decoder: Decoder,
    symbols: SymbolBuffer,
}

impl<P: LinePins, C: BitClock> SoftPhy<P, C> {
    /// Create a PHY with default timing windows.
    pub fn new(pins: P, clock: C) -> Self {
        Self::with_config(pins, clock, PhyConfig::default())
    }

    pub fn with_config(pins: P, clock: C, config: PhyConfig) -> Self {
        Self {
            pins,
            clock,
            config,
            decoder: Decoder::new(),
            symbols: SymbolBuffer::new(),
        }
    }

    pub fn pins(&self) -> &P {
        &self.pins
    }

    pub fn pins_mut(&mut self) -> &mut P {
        &mut self.pins
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Spin until SYNC starts, the window closes or the bus is reset.
    fn wait_for_start(&mut self, window: Window) -> Received {
        let bits = match window {
            Window::Frame => self.config.listen_bits,
            Window::Turnaround => self.config.turnaround_bits,
        };
        let limit = bits * QUARTERS_PER_BIT;
        let reset_quarters = self.config.reset_bits * QUARTERS_PER_BIT;
        let mut se0_quarters = 0;

        self.clock.restart();
        let mut quarter = 0;
        loop {
            match self.pins.sample() {
                LineState::K => return Received::Packet(0),
                LineState::Se0 => {
                    se0_quarters += 1;
                    if se0_quarters >= reset_quarters {
                        self.wait_for_idle(true);
                        return Received::BusReset;
                    }
                }
                LineState::J => se0_quarters = 0,
            }
            if quarter >= limit && se0_quarters == 0 {
                return Received::Idle;
            }
            quarter += 1;
            self.clock.wait_until(quarter);
        }
    }

    /// Sample mid-bit from the SYNC edge until end of packet.
    fn read_packet(&mut self, buf: &mut [u8; MAX_PACKET_LEN]) -> Result<usize, LineError> {
        self.decoder.reset();
        self.clock.restart();
        let max_bits = line::MAX_SYMBOLS as u32;
        let mut bit = 0;
        loop {
            self.clock
                .wait_until(bit * QUARTERS_PER_BIT + QUARTERS_PER_BIT / 2);
            let state = self.pins.sample();
            match self.decoder.feed(state) {
                Ok(Step::More) => {}
                Ok(Step::Done) => break,
                Err(e) => {
                    self.wait_for_idle(false);
                    return Err(e);
                }
            }
            bit += 1;
            if bit >= max_bits {
                self.wait_for_idle(false);
                return Err(LineError::Timeout);
            }
        }
        self.wait_for_idle(true);

        let bytes = self.decoder.bytes();
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(bytes.len())
    }

    /// Let the rest of a packet pass: skip to the end-of-packet SE0 (unless it was
    /// already seen) and return once the line is back to J.
    fn wait_for_idle(&mut self, mut seen_se0: bool) {
        let limit = self.config.listen_bits * QUARTERS_PER_BIT;
        self.clock.restart();
        let mut quarter = 0;
        while quarter < limit {
            match self.pins.sample() {
                LineState::Se0 => seen_se0 = true,
                LineState::J if seen_se0 => return,
                _ => {}
            }
            quarter += 1;
            self.clock.wait_until(quarter);
        }
    }
}

impl<P: LinePins, C: BitClock> Phy for SoftPhy<P, C> {
    fn receive(
        &mut self,
        buf: &mut [u8; MAX_PACKET_LEN],
        window: Window,
    ) -> Result<Received, LineError> {
        match self.wait_for_start(window) {
            Received::Packet(_) => self.read_packet(buf).map(Received::Packet),
            other => Ok(other),
        }
    }

    fn transmit(&mut self, bytes: &[u8]) {
        if line::encode(bytes, &mut self.symbols).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("packet of {} bytes does not fit on the line", bytes.len());
            return;
        }
        self.clock.restart();
        for (i, &state) in self.symbols.iter().enumerate() {
            self.pins.drive(state);
            self.clock.wait_until((i as u32 + 1) * QUARTERS_PER_BIT);
        }
        self.pins.release();
    }

    fn attach(&mut self) {
        self.pins.release();
    }

    fn detach(&mut self) {
        self.pins.drive(LineState::Se0);
    }
}

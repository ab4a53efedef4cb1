//! In-memory host for exercising [`UsbDevice`] without hardware.
//!
//! [`SimHost`] implements [`Phy`] at the packet level: tests queue host packets,
//! poll the device, and inspect what it sent back. Data packets from the device are
//! acknowledged automatically unless [`SimHost::set_auto_ack`] turns that off.

extern crate std;

use std::collections::VecDeque;
use std::vec::Vec;

use crate::class::HidClass;
use crate::device::{Event, UsbDevice};
use crate::line::{LineError, MAX_PACKET_LEN};
use crate::packet::{encode_data, encode_token, handshake, DataToggle, Packet, Pid, Token};
use crate::phy::{Phy, Received, Window};

enum Inbound {
    Packet(Vec<u8>),
    Reset,
}

/// Packet-level USB host.
pub struct SimHost {
    inbox: VecDeque<Inbound>,
    sent: Vec<Vec<u8>>,
    attached: bool,
    auto_ack: bool,
}

impl Default for SimHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SimHost {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inbox: VecDeque::new(),
            sent: Vec::new(),
            attached: false,
            auto_ack: true,
        }
    }

    /// Whether the device currently shows itself on the bus.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn set_auto_ack(&mut self, on: bool) {
        self.auto_ack = on;
    }

    /// Queue raw packet bytes (PID first), valid or not.
    pub fn raw(&mut self, bytes: Vec<u8>) {
        self.inbox.push_back(Inbound::Packet(bytes));
    }

    pub fn bus_reset(&mut self) {
        self.inbox.push_back(Inbound::Reset);
    }

    pub fn token(&mut self, pid: Pid, address: u8, endpoint: u8) {
        self.raw(encode_token(Token::new(pid, address, endpoint)).to_vec());
    }

    pub fn in_token(&mut self, address: u8, endpoint: u8) {
        self.token(Pid::In, address, endpoint);
    }

    pub fn sof(&mut self, frame: u16) {
        let field = frame & 0x07FF;
        let raw = field | (u16::from(crate::crc::crc5(field)) << 11);
        let [lo, hi] = raw.to_le_bytes();
        self.raw(std::vec![Pid::Sof.byte(), lo, hi]);
    }

    /// Queue a data packet without a token in front of it.
    pub fn data(&mut self, toggle: DataToggle, payload: &[u8]) {
        let mut buf = [0u8; MAX_PACKET_LEN];
        if let Ok(n) = encode_data(toggle, payload, &mut buf) {
            self.raw(buf[..n].to_vec());
        }
    }

    /// Queue a SETUP transaction to endpoint 0.
    pub fn setup(&mut self, address: u8, request: [u8; 8]) {
        self.token(Pid::Setup, address, 0);
        self.data(DataToggle::Data0, &request);
    }

    /// Queue an OUT transaction to endpoint 0.
    pub fn out_data(&mut self, address: u8, toggle: DataToggle, payload: &[u8]) {
        self.token(Pid::Out, address, 0);
        self.data(toggle, payload);
    }

    /// Everything the device transmitted so far.
    #[must_use]
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    pub fn take_sent(&mut self) -> Vec<Vec<u8>> {
        core::mem::take(&mut self.sent)
    }

    /// Payload of the last data packet the device sent.
    #[must_use]
    pub fn last_data(&self) -> Option<(DataToggle, Vec<u8>)> {
        self.sent.iter().rev().find_map(|bytes| match Packet::parse(bytes) {
            Ok(Packet::Data { toggle, payload }) => Some((toggle, payload.to_vec())),
            _ => None,
        })
    }
}

impl Phy for SimHost {
    fn receive(
        &mut self,
        buf: &mut [u8; MAX_PACKET_LEN],
        _window: Window,
    ) -> Result<Received, LineError> {
        match self.inbox.pop_front() {
            None => Ok(Received::Idle),
            Some(Inbound::Reset) => Ok(Received::BusReset),
            Some(Inbound::Packet(bytes)) => {
                if bytes.len() > MAX_PACKET_LEN {
                    return Err(LineError::Overflow);
                }
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok(Received::Packet(bytes.len()))
            }
        }
    }

    fn transmit(&mut self, bytes: &[u8]) {
        let is_data = matches!(bytes.first(), Some(&b) if b == Pid::Data0.byte() || b == Pid::Data1.byte());
        if is_data && self.auto_ack {
            self.inbox.push_front(Inbound::Packet(handshake(Pid::Ack).to_vec()));
        }
        self.sent.push(bytes.to_vec());
    }

    fn attach(&mut self) {
        self.attached = true;
    }

    fn detach(&mut self) {
        self.attached = false;
    }
}

/// Run a control read and return the bytes of its data stage.
pub fn control_read<H: HidClass>(
    device: &mut UsbDevice,
    host: &mut SimHost,
    class: &mut H,
    address: u8,
    request: [u8; 8],
) -> Vec<u8> {
    let length = usize::from(u16::from_le_bytes([request[6], request[7]]));
    host.setup(address, request);
    let _ = device.poll(host, class);

    let mut data = Vec::new();
    loop {
        host.in_token(address, 0);
        if device.poll(host, class) != Ok(Event::ControlData) {
            break;
        }
        let Some((_, chunk)) = host.last_data() else {
            break;
        };
        data.extend_from_slice(&chunk);
        if chunk.len() < 8 || data.len() >= length {
            break;
        }
    }

    host.out_data(address, DataToggle::Data1, &[]);
    let _ = device.poll(host, class);
    data
}

/// Run a control write with an optional data stage.
pub fn control_write<H: HidClass>(
    device: &mut UsbDevice,
    host: &mut SimHost,
    class: &mut H,
    address: u8,
    request: [u8; 8],
    data: &[u8],
) {
    host.setup(address, request);
    let _ = device.poll(host, class);

    let mut toggle = DataToggle::Data1;
    for chunk in data.chunks(8) {
        host.out_data(address, toggle, chunk);
        let _ = device.poll(host, class);
        toggle = toggle.flipped();
    }

    host.in_token(address, 0);
    let _ = device.poll(host, class);
}

/// Assign `address` and select configuration 1.
pub fn enumerate<H: HidClass>(
    device: &mut UsbDevice,
    host: &mut SimHost,
    class: &mut H,
    address: u8,
) {
    let _ = control_read(
        device,
        host,
        class,
        0,
        [0x80, 0x06, 0x00, 0x01, 0x00, 0x00, 0x40, 0x00],
    );
    control_write(
        device,
        host,
        class,
        0,
        [0x00, 0x05, address, 0x00, 0x00, 0x00, 0x00, 0x00],
        &[],
    );
    control_write(
        device,
        host,
        class,
        address,
        [0x00, 0x09, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00],
        &[],
    );
}

/// Poll the interrupt endpoint once; returns the report if one was delivered.
pub fn interrupt_in<H: HidClass>(
    device: &mut UsbDevice,
    host: &mut SimHost,
    class: &mut H,
    address: u8,
) -> Option<(DataToggle, Vec<u8>)> {
    host.in_token(address, 1);
    match device.poll(host, class) {
        Ok(Event::Report) => host.last_data(),
        _ => None,
    }
}

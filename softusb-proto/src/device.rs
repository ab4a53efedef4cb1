//! USB device engine: enumeration, control transfers and the interrupt IN endpoint.
//!
//! [`UsbDevice`] owns all transaction state and is driven by [`poll`](UsbDevice::poll),
//! which handles at most one transaction per call. Requests outside the supported
//! subset are answered with a zero-length data or status stage; the engine never
//! stalls. Corrupt packets are dropped and the host's retry resynchronises the
//! transfer.

use core::fmt;

use crate::class::{HidClass, ReportType};
use crate::config::Config;
use crate::descriptor::{
    self, kind, CONFIGURATION_LEN, DEVICE_LEN, HID_LEN, HID_OFFSET, INTERRUPT_ENDPOINT,
    LANGUAGE_IDS,
};
use crate::line::{LineError, MAX_PACKET_LEN};
use crate::packet::{encode_data, handshake, DataToggle, Packet, PacketError, Pid, MAX_PAYLOAD};
use crate::phy::{Phy, Received, Window};
use crate::setup::{
    hid_request, request, Direction, RequestKind, SetupError, SetupPacket, SETUP_LEN,
};

/// Size of the buffer for replies assembled on the fly (strings, GET_REPORT...).
pub const SCRATCH_LEN: usize = 64;

/// Device state as seen by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    /// Lines held at SE0 (or never attached).
    Disconnected,
    /// Attached or reset, answering on address 0.
    Default,
    /// Address assigned, no configuration selected.
    Addressed,
    /// Configuration 1 selected; the interrupt endpoint is live.
    Configured,
}

/// What a call to [`UsbDevice::poll`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// No packet within the listening window (or a start-of-frame).
    Idle,
    /// Bus reset: address and configuration are back to zero.
    Reset,
    /// SETUP stage accepted; carries `bRequest`.
    Setup(u8),
    /// One data stage packet of a control transfer was exchanged.
    ControlData,
    /// Control transfer completed its status stage.
    Status,
    /// An interrupt report was delivered and acknowledged.
    Report,
    /// Host polled an endpoint with nothing to send.
    Nak,
    /// Packet for another device or endpoint, a duplicate, or no handshake from
    /// the host.
    Ignored,
}

/// Error type for device operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbError {
    /// Line-level receive failure.
    Line(LineError),
    /// Malformed packet or CRC mismatch.
    Packet(PacketError),
    /// Malformed SETUP data stage.
    Setup(SetupError),
    /// Packet type that cannot start or continue a transaction here.
    UnexpectedPacket,
    /// Token not followed by its data packet.
    Timeout,
    /// Bus reset in the middle of a transaction.
    BusReset,
    /// Interrupt endpoint still holds an unsent report.
    Busy,
}

impl fmt::Display for UsbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line(e) => write!(f, "line error: {e}"),
            Self::Packet(e) => write!(f, "packet error: {e}"),
            Self::Setup(e) => write!(f, "setup error: {e}"),
            Self::UnexpectedPacket => write!(f, "unexpected packet"),
            Self::Timeout => write!(f, "data packet missing"),
            Self::BusReset => write!(f, "bus reset during transaction"),
            Self::Busy => write!(f, "interrupt endpoint busy"),
        }
    }
}

impl From<LineError> for UsbError {
    fn from(err: LineError) -> Self {
        Self::Line(err)
    }
}

impl From<PacketError> for UsbError {
    fn from(err: PacketError) -> Self {
        Self::Packet(err)
    }
}

impl From<SetupError> for UsbError {
    fn from(err: SetupError) -> Self {
        Self::Setup(err)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Source {
    Device,
    Configuration,
    Hid,
    Report,
    Scratch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Control {
    Idle,
    DataIn {
        source: Source,
        offset: u16,
        len: u16,
        requested: u16,
        toggle: DataToggle,
    },
    DataOut {
        report_type: ReportType,
        report_id: u8,
        remaining: u16,
        toggle: DataToggle,
    },
    /// Device sends the zero-length status packet.
    StatusIn,
    /// Host sends the zero-length status packet.
    StatusOut,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pending {
    Address(u8),
    Configuration(u8),
}

enum Reply {
    Empty,
    Data(Source, usize),
    Receive { report_type: ReportType, report_id: u8 },
}

#[derive(Clone, Copy, Debug, Default)]
struct InterruptEndpoint {
    buf: [u8; MAX_PAYLOAD],
    len: usize,
    pending: bool,
    toggle: DataToggle,
}

/// Low-speed HID function with one configuration, control endpoint 0 and interrupt
/// IN endpoint 1.
pub struct UsbDevice {
    config: Config,
    state: DeviceState,
    address: u8,
    configuration: u8,
    pending: Option<Pending>,
    control: Control,
    device_descriptor: [u8; DEVICE_LEN],
    configuration_descriptor: [u8; CONFIGURATION_LEN],
    interrupt: InterruptEndpoint,
    rx: [u8; MAX_PACKET_LEN],
    tx: [u8; MAX_PACKET_LEN],
    data: [u8; MAX_PAYLOAD],
    scratch: [u8; SCRATCH_LEN],
}

impl UsbDevice {
    /// Create a detached device. `report_descriptor_len` goes into the HID descriptor.
    #[must_use]
    pub fn new(config: Config, report_descriptor_len: u16) -> Self {
        Self {
            device_descriptor: descriptor::device_descriptor(&config),
            configuration_descriptor: descriptor::configuration_descriptor(
                &config,
                report_descriptor_len,
            ),
            config,
            state: DeviceState::Disconnected,
            address: 0,
            configuration: 0,
            pending: None,
            control: Control::Idle,
            interrupt: InterruptEndpoint::default(),
            rx: [0; MAX_PACKET_LEN],
            tx: [0; MAX_PACKET_LEN],
            data: [0; MAX_PAYLOAD],
            scratch: [0; SCRATCH_LEN],
        }
    }

    /// Current device state.
    #[must_use]
    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Assigned bus address (0 until SET_ADDRESS completes).
    #[must_use]
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Selected configuration value.
    #[must_use]
    pub fn configuration(&self) -> u8 {
        self.configuration
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.state == DeviceState::Configured
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Show up on the bus in the default state.
    pub fn attach<P: Phy>(&mut self, phy: &mut P) {
        phy.attach();
        self.reset();
        #[cfg(feature = "defmt")]
        defmt::info!("usb: attached");
    }

    /// Disappear from the bus until the next [`attach`](Self::attach).
    pub fn detach<P: Phy>(&mut self, phy: &mut P) {
        phy.detach();
        self.reset();
        self.state = DeviceState::Disconnected;
        #[cfg(feature = "defmt")]
        defmt::info!("usb: detached");
    }

    /// Whether the interrupt IN buffer can take a new report.
    #[must_use]
    pub fn is_interrupt_ready(&self) -> bool {
        !self.interrupt.pending
    }

    /// Queue a report on the interrupt IN endpoint. At most 8 bytes are sent.
    pub fn send_interrupt_report(&mut self, report: &[u8]) -> Result<(), UsbError> {
        if self.interrupt.pending {
            return Err(UsbError::Busy);
        }
        let len = report.len().min(MAX_PAYLOAD);
        self.interrupt.buf[..len].copy_from_slice(&report[..len]);
        self.interrupt.len = len;
        self.interrupt.pending = true;
        Ok(())
    }

    /// Listen for one frame and handle at most one transaction.
    pub fn poll<P: Phy, H: HidClass>(
        &mut self,
        phy: &mut P,
        class: &mut H,
    ) -> Result<Event, UsbError> {
        if self.state == DeviceState::Disconnected {
            return Ok(Event::Idle);
        }
        let len = match phy.receive(&mut self.rx, Window::Frame)? {
            Received::Idle => return Ok(Event::Idle),
            Received::BusReset => {
                self.reset();
                #[cfg(feature = "defmt")]
                defmt::info!("usb: bus reset");
                return Ok(Event::Reset);
            }
            Received::Packet(len) => len,
        };
        let token = match Packet::parse(&self.rx[..len])? {
            Packet::Token(token) => token,
            Packet::Sof(_) => return Ok(Event::Idle),
            Packet::Data { .. } | Packet::Handshake(_) => return Err(UsbError::UnexpectedPacket),
        };

        if token.address != self.address {
            if token.pid != Pid::In {
                // swallow the data packet addressed to someone else
                self.skip_data(phy)?;
            }
            return Ok(Event::Ignored);
        }

        match (token.pid, token.endpoint) {
            (Pid::Setup, 0) => self.setup_stage(phy, class),
            (Pid::In, 0) => self.control_in(phy, class),
            (Pid::Out, 0) => self.control_out(phy, class),
            (Pid::In, ep) if ep == INTERRUPT_ENDPOINT & 0x0F => self.interrupt_in(phy),
            (Pid::Out | Pid::Setup, _) => {
                self.skip_data(phy)?;
                Ok(Event::Ignored)
            }
            _ => Ok(Event::Ignored),
        }
    }

    fn reset(&mut self) {
        self.state = DeviceState::Default;
        self.address = 0;
        self.configuration = 0;
        self.pending = None;
        self.control = Control::Idle;
        self.interrupt = InterruptEndpoint::default();
    }

    /// Receive the data packet following a SETUP or OUT token into `self.data`.
    fn receive_data<P: Phy>(&mut self, phy: &mut P) -> Result<(DataToggle, usize), UsbError> {
        let len = match phy.receive(&mut self.rx, Window::Turnaround)? {
            Received::Packet(len) => len,
            Received::Idle => return Err(UsbError::Timeout),
            Received::BusReset => {
                self.reset();
                return Err(UsbError::BusReset);
            }
        };
        match Packet::parse(&self.rx[..len])? {
            Packet::Data { toggle, payload } => {
                self.data[..payload.len()].copy_from_slice(payload);
                Ok((toggle, payload.len()))
            }
            _ => Err(UsbError::UnexpectedPacket),
        }
    }

    /// Wait for the host's handshake after we sent data. A bus reset in the
    /// meantime resets the device.
    fn host_acked<P: Phy>(&mut self, phy: &mut P) -> Result<bool, UsbError> {
        match phy.receive(&mut self.rx, Window::Turnaround) {
            Ok(Received::Packet(len)) => Ok(matches!(
                Packet::parse(&self.rx[..len]),
                Ok(Packet::Handshake(Pid::Ack))
            )),
            Ok(Received::BusReset) => {
                self.reset();
                Err(UsbError::BusReset)
            }
            Ok(Received::Idle) | Err(_) => Ok(false),
        }
    }

    /// Drop the data packet of a transaction that is not ours.
    fn skip_data<P: Phy>(&mut self, phy: &mut P) -> Result<(), UsbError> {
        if let Ok(Received::BusReset) = phy.receive(&mut self.rx, Window::Turnaround) {
            self.reset();
            return Err(UsbError::BusReset);
        }
        Ok(())
    }

    fn setup_stage<P: Phy, H: HidClass>(
        &mut self,
        phy: &mut P,
        class: &mut H,
    ) -> Result<Event, UsbError> {
        let (toggle, len) = self.receive_data(phy)?;
        if toggle != DataToggle::Data0 || len != SETUP_LEN {
            return Err(UsbError::UnexpectedPacket);
        }
        phy.transmit(&handshake(Pid::Ack));

        let setup = SetupPacket::parse(&self.data[..len])?;
        #[cfg(feature = "defmt")]
        defmt::debug!(
            "usb: setup type={:?} request={=u8:#x} value={=u16:#x} length={=u16}",
            setup.request_type,
            setup.request,
            setup.value,
            setup.length
        );
        self.handle_setup(&setup, class);
        Ok(Event::Setup(setup.request))
    }

    fn handle_setup<H: HidClass>(&mut self, setup: &SetupPacket, class: &mut H) {
        self.pending = None;
        let reply = match setup.request_type.kind {
            RequestKind::Standard => self.standard_request(setup, class),
            RequestKind::Class => self.class_request(setup, class),
            RequestKind::Vendor | RequestKind::Reserved => Reply::Empty,
        };

        let wants_data = setup.request_type.direction == Direction::In && setup.length > 0;
        self.control = match reply {
            Reply::Data(source, len) if wants_data => Self::data_in(source, len, setup.length),
            Reply::Receive {
                report_type,
                report_id,
            } if setup.request_type.direction == Direction::Out && setup.length > 0 => {
                Control::DataOut {
                    report_type,
                    report_id,
                    remaining: setup.length,
                    toggle: DataToggle::Data1,
                }
            }
            _ if wants_data => Self::data_in(Source::Scratch, 0, setup.length),
            _ => Control::StatusIn,
        };
    }

    fn data_in(source: Source, len: usize, requested: u16) -> Control {
        let len = u16::try_from(len).unwrap_or(u16::MAX).min(requested);
        Control::DataIn {
            source,
            offset: 0,
            len,
            requested,
            toggle: DataToggle::Data1,
        }
    }

    fn standard_request<H: HidClass>(&mut self, setup: &SetupPacket, class: &H) -> Reply {
        match setup.request {
            request::GET_STATUS => {
                let status = u8::from(self.config.self_powered);
                self.scratch_reply(&[status, 0])
            }
            request::SET_ADDRESS => {
                self.pending = Some(Pending::Address(setup.value_low() & 0x7F));
                Reply::Empty
            }
            request::GET_DESCRIPTOR => self.descriptor_reply(setup, class),
            request::GET_CONFIGURATION => self.scratch_reply(&[self.configuration]),
            request::SET_CONFIGURATION => {
                let value = setup.value_low();
                let addressed = matches!(
                    self.state,
                    DeviceState::Addressed | DeviceState::Configured
                );
                if addressed && value <= 1 {
                    self.pending = Some(Pending::Configuration(value));
                }
                Reply::Empty
            }
            request::GET_INTERFACE => self.scratch_reply(&[0]),
            _ => Reply::Empty,
        }
    }

    fn descriptor_reply<H: HidClass>(&mut self, setup: &SetupPacket, class: &H) -> Reply {
        match setup.value_high() {
            kind::DEVICE => {
                let len = class.device_descriptor().map_or(DEVICE_LEN, <[u8]>::len);
                Reply::Data(Source::Device, len)
            }
            kind::CONFIGURATION => Reply::Data(Source::Configuration, CONFIGURATION_LEN),
            kind::STRING => match setup.value_low() {
                0 => self.scratch_reply(&LANGUAGE_IDS),
                index => match self.config.string(index) {
                    Some(text) => {
                        let len = descriptor::string_descriptor(text, &mut self.scratch);
                        Reply::Data(Source::Scratch, len)
                    }
                    None => Reply::Empty,
                },
            },
            kind::HID => Reply::Data(Source::Hid, HID_LEN),
            kind::REPORT => Reply::Data(Source::Report, class.report_descriptor().len()),
            _ => Reply::Empty,
        }
    }

    fn class_request<H: HidClass>(&mut self, setup: &SetupPacket, class: &mut H) -> Reply {
        let report_type = ReportType::from(setup.value_high());
        let report_id = setup.value_low();
        match setup.request {
            hid_request::GET_REPORT => {
                let len = class
                    .get_report(report_type, report_id, &mut self.scratch)
                    .min(SCRATCH_LEN);
                Reply::Data(Source::Scratch, len)
            }
            hid_request::GET_IDLE => match class.get_idle(report_id) {
                Some(rate) => self.scratch_reply(&[rate]),
                None => Reply::Empty,
            },
            hid_request::SET_IDLE => {
                class.set_idle(report_id, setup.value_high());
                Reply::Empty
            }
            hid_request::SET_REPORT => Reply::Receive {
                report_type,
                report_id,
            },
            _ => Reply::Empty,
        }
    }

    fn scratch_reply(&mut self, bytes: &[u8]) -> Reply {
        self.scratch[..bytes.len()].copy_from_slice(bytes);
        Reply::Data(Source::Scratch, bytes.len())
    }

    fn source_bytes<'a, H: HidClass>(&'a self, source: Source, class: &'a H) -> &'a [u8] {
        match source {
            Source::Device => class
                .device_descriptor()
                .unwrap_or(&self.device_descriptor),
            Source::Configuration => &self.configuration_descriptor,
            Source::Hid => &self.configuration_descriptor[HID_OFFSET..HID_OFFSET + HID_LEN],
            Source::Report => class.report_descriptor(),
            Source::Scratch => &self.scratch,
        }
    }

    fn control_in<P: Phy, H: HidClass>(
        &mut self,
        phy: &mut P,
        class: &mut H,
    ) -> Result<Event, UsbError> {
        match self.control {
            Control::DataIn {
                source,
                offset,
                len,
                requested,
                toggle,
            } => {
                let mut chunk = [0u8; MAX_PAYLOAD];
                let start = usize::from(offset);
                let want = usize::from(len - offset).min(MAX_PAYLOAD);
                let bytes = self.source_bytes(source, &*class);
                let src = bytes.get(start..start + want).unwrap_or(&[]);
                let chunk_len = src.len();
                chunk[..chunk_len].copy_from_slice(src);

                let n = encode_data(toggle, &chunk[..chunk_len], &mut self.tx)?;
                phy.transmit(&self.tx[..n]);
                if !self.host_acked(phy)? {
                    return Ok(Event::Ignored);
                }

                let offset = offset + chunk_len as u16;
                let done = chunk_len < MAX_PAYLOAD || (offset == len && len == requested);
                self.control = if done {
                    Control::StatusOut
                } else {
                    Control::DataIn {
                        source,
                        offset,
                        len,
                        requested,
                        toggle: toggle.flipped(),
                    }
                };
                Ok(Event::ControlData)
            }
            Control::StatusIn => {
                let n = encode_data(DataToggle::Data1, &[], &mut self.tx)?;
                phy.transmit(&self.tx[..n]);
                if !self.host_acked(phy)? {
                    return Ok(Event::Ignored);
                }
                self.finish_status();
                Ok(Event::Status)
            }
            Control::Idle | Control::DataOut { .. } | Control::StatusOut => {
                phy.transmit(&handshake(Pid::Nak));
                Ok(Event::Nak)
            }
        }
    }

    fn control_out<P: Phy, H: HidClass>(
        &mut self,
        phy: &mut P,
        class: &mut H,
    ) -> Result<Event, UsbError> {
        let (toggle, len) = self.receive_data(phy)?;
        phy.transmit(&handshake(Pid::Ack));

        match self.control {
            Control::DataOut {
                report_type,
                report_id,
                remaining,
                toggle: expected,
            } => {
                if toggle != expected {
                    // retransmission after a lost ACK
                    return Ok(Event::Ignored);
                }
                let n = len.min(usize::from(remaining));
                class.set_report(report_type, report_id, &self.data[..n]);
                let remaining = remaining - n as u16;
                self.control = if remaining == 0 || len < MAX_PAYLOAD {
                    Control::StatusIn
                } else {
                    Control::DataOut {
                        report_type,
                        report_id,
                        remaining,
                        toggle: expected.flipped(),
                    }
                };
                Ok(Event::ControlData)
            }
            Control::StatusOut | Control::DataIn { .. } => {
                self.control = Control::Idle;
                Ok(Event::Status)
            }
            Control::Idle | Control::StatusIn => Ok(Event::Ignored),
        }
    }

    fn interrupt_in<P: Phy>(&mut self, phy: &mut P) -> Result<Event, UsbError> {
        if self.state != DeviceState::Configured || !self.interrupt.pending {
            phy.transmit(&handshake(Pid::Nak));
            return Ok(Event::Nak);
        }
        let ep = &self.interrupt;
        let n = encode_data(ep.toggle, &ep.buf[..ep.len], &mut self.tx)?;
        phy.transmit(&self.tx[..n]);
        if !self.host_acked(phy)? {
            return Ok(Event::Ignored);
        }
        self.interrupt.toggle = self.interrupt.toggle.flipped();
        self.interrupt.pending = false;
        Ok(Event::Report)
    }

    /// Apply what the finished control transfer asked for.
    fn finish_status(&mut self) {
        match self.pending.take() {
            Some(Pending::Address(address)) => {
                self.address = address;
                self.state = if address == 0 {
                    DeviceState::Default
                } else {
                    DeviceState::Addressed
                };
                #[cfg(feature = "defmt")]
                defmt::info!("usb: address {=u8}", address);
            }
            Some(Pending::Configuration(value)) => {
                self.configuration = value;
                self.state = if value == 0 {
                    DeviceState::Addressed
                } else {
                    DeviceState::Configured
                };
                self.interrupt = InterruptEndpoint::default();
                #[cfg(feature = "defmt")]
                defmt::info!("usb: configuration {=u8}", value);
            }
            None => {}
        }
        self.control = Control::Idle;
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::sim::{self, SimHost};
    use std::vec;
    use std::vec::Vec;

    const REPORT_DESCRIPTOR: &[u8] = &[
        0x05, 0x01, 0x09, 0x05, 0xA1, 0x01, 0x09, 0x30, 0x09, 0x31, 0x15, 0x00, 0x26, 0xFF,
        0x00, 0x75, 0x08, 0x95, 0x02, 0x81, 0x02, 0xC0,
    ];

    #[derive(Default)]
    struct MockClass {
        report: [u8; 3],
        idle: u8,
        writes: Vec<(ReportType, u8, Vec<u8>)>,
    }

    impl HidClass for MockClass {
        fn report_descriptor(&self) -> &[u8] {
            REPORT_DESCRIPTOR
        }

        fn get_report(&mut self, _: ReportType, _: u8, buf: &mut [u8]) -> usize {
            buf[..3].copy_from_slice(&self.report);
            3
        }

        fn set_report(&mut self, report_type: ReportType, report_id: u8, data: &[u8]) {
            self.writes.push((report_type, report_id, data.to_vec()));
        }

        fn get_idle(&self, _: u8) -> Option<u8> {
            Some(self.idle)
        }

        fn set_idle(&mut self, _: u8, rate: u8) {
            self.idle = rate;
        }
    }

    fn attached() -> (UsbDevice, SimHost, MockClass) {
        let config = Config::new(0x1209, 0x5250)
            .manufacturer("Retro")
            .product("Test Pad");
        let mut device = UsbDevice::new(config, REPORT_DESCRIPTOR.len() as u16);
        let mut host = SimHost::new();
        device.attach(&mut host);
        (device, host, MockClass::default())
    }

    #[test]
    fn test_starts_disconnected() {
        let mut device = UsbDevice::new(Config::new(1, 2), 0);
        let mut host = SimHost::new();
        assert_eq!(device.state(), DeviceState::Disconnected);
        host.in_token(0, 0);
        assert_eq!(device.poll(&mut host, &mut MockClass::default()), Ok(Event::Idle));
        assert!(host.sent().is_empty());
    }

    #[test]
    fn test_get_device_descriptor_in_chunks() {
        let (mut device, mut host, mut class) = attached();
        let desc = sim::control_read(
            &mut device,
            &mut host,
            &mut class,
            0,
            [0x80, 0x06, 0x00, 0x01, 0x00, 0x00, 0x40, 0x00],
        );
        assert_eq!(desc.len(), 18);
        assert_eq!(&desc[..2], &[18, 1]);
        assert_eq!(&desc[8..12], &[0x09, 0x12, 0x50, 0x52]);
    }

    #[test]
    fn test_short_read_of_device_descriptor() {
        let (mut device, mut host, mut class) = attached();
        // Windows asks for the first 8 bytes before assigning an address
        let desc = sim::control_read(
            &mut device,
            &mut host,
            &mut class,
            0,
            [0x80, 0x06, 0x00, 0x01, 0x00, 0x00, 0x08, 0x00],
        );
        assert_eq!(desc.len(), 8);
        assert_eq!(desc[7], 8);
    }

    #[test]
    fn test_set_address_applies_after_status() {
        let (mut device, mut host, mut class) = attached();
        host.setup(0, [0x00, 0x05, 0x07, 0x00, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(
            device.poll(&mut host, &mut class),
            Ok(Event::Setup(request::SET_ADDRESS))
        );
        assert_eq!(device.address(), 0);

        host.in_token(0, 0);
        assert_eq!(device.poll(&mut host, &mut class), Ok(Event::Status));
        assert_eq!(device.address(), 7);
        assert_eq!(device.state(), DeviceState::Addressed);
    }

    #[test]
    fn test_lost_status_handshake_keeps_old_address() {
        let (mut device, mut host, mut class) = attached();
        host.setup(0, [0x00, 0x05, 0x07, 0x00, 0x00, 0x00, 0x00, 0x00]);
        device.poll(&mut host, &mut class).unwrap();

        host.set_auto_ack(false);
        host.in_token(0, 0);
        assert_eq!(device.poll(&mut host, &mut class), Ok(Event::Ignored));
        assert_eq!(device.address(), 0);

        host.set_auto_ack(true);
        host.in_token(0, 0);
        assert_eq!(device.poll(&mut host, &mut class), Ok(Event::Status));
        assert_eq!(device.address(), 7);
    }

    #[test]
    fn test_enumeration_configures_device() {
        let (mut device, mut host, mut class) = attached();
        sim::enumerate(&mut device, &mut host, &mut class, 3);
        assert_eq!(device.state(), DeviceState::Configured);
        assert_eq!(device.address(), 3);
        assert_eq!(device.configuration(), 1);

        let config = sim::control_read(
            &mut device,
            &mut host,
            &mut class,
            3,
            [0x80, 0x06, 0x00, 0x02, 0x00, 0x00, 0xFF, 0x00],
        );
        assert_eq!(config.len(), CONFIGURATION_LEN);
        assert_eq!(config[25] as usize, REPORT_DESCRIPTOR.len());
    }

    #[test]
    fn test_set_configuration_ignored_before_address() {
        let (mut device, mut host, mut class) = attached();
        sim::control_write(
            &mut device,
            &mut host,
            &mut class,
            0,
            [0x00, 0x09, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00],
            &[],
        );
        assert_eq!(device.state(), DeviceState::Default);
    }

    #[test]
    fn test_report_descriptor_multi_packet() {
        let (mut device, mut host, mut class) = attached();
        let desc = sim::control_read(
            &mut device,
            &mut host,
            &mut class,
            0,
            [0x81, 0x06, 0x00, 0x22, 0x00, 0x00, 0x80, 0x00],
        );
        assert_eq!(desc, REPORT_DESCRIPTOR);
    }

    #[test]
    fn test_string_descriptors() {
        let (mut device, mut host, mut class) = attached();
        let langs = sim::control_read(
            &mut device,
            &mut host,
            &mut class,
            0,
            [0x80, 0x06, 0x00, 0x03, 0x00, 0x00, 0xFF, 0x00],
        );
        assert_eq!(langs, LANGUAGE_IDS);

        let product = sim::control_read(
            &mut device,
            &mut host,
            &mut class,
            0,
            [0x80, 0x06, 0x02, 0x03, 0x09, 0x04, 0xFF, 0x00],
        );
        assert_eq!(product[0] as usize, product.len());
        assert_eq!(product.len(), 2 + 2 * "Test Pad".len());
        assert_eq!(&product[2..4], &[b'T', 0]);
    }

    #[test]
    fn test_unsupported_request_gets_zero_length_answer() {
        let (mut device, mut host, mut class) = attached();
        // vendor request, IN direction
        let reply = sim::control_read(
            &mut device,
            &mut host,
            &mut class,
            0,
            [0xC0, 0x33, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00],
        );
        assert!(reply.is_empty());
        // no STALL ever went out
        assert!(host.sent().iter().all(|p| p[0] != Pid::Stall.byte()));
    }

    #[test]
    fn test_unknown_descriptor_type_is_empty() {
        let (mut device, mut host, mut class) = attached();
        let reply = sim::control_read(
            &mut device,
            &mut host,
            &mut class,
            0,
            [0x80, 0x06, 0x00, 0x06, 0x00, 0x00, 0x0A, 0x00],
        );
        assert!(reply.is_empty());
    }

    #[test]
    fn test_hid_idle_requests() {
        let (mut device, mut host, mut class) = attached();
        sim::control_write(
            &mut device,
            &mut host,
            &mut class,
            0,
            [0x21, 0x0A, 0x00, 0x19, 0x00, 0x00, 0x00, 0x00],
            &[],
        );
        assert_eq!(class.idle, 0x19);

        let idle = sim::control_read(
            &mut device,
            &mut host,
            &mut class,
            0,
            [0xA1, 0x02, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00],
        );
        assert_eq!(idle, vec![0x19]);
    }

    #[test]
    fn test_get_report() {
        let (mut device, mut host, mut class) = attached();
        class.report = [0xFF, 0x7F, 0x01];
        let report = sim::control_read(
            &mut device,
            &mut host,
            &mut class,
            0,
            [0xA1, 0x01, 0x00, 0x01, 0x00, 0x00, 0x08, 0x00],
        );
        assert_eq!(report, vec![0xFF, 0x7F, 0x01]);
    }

    #[test]
    fn test_set_report_delivers_data() {
        let (mut device, mut host, mut class) = attached();
        sim::control_write(
            &mut device,
            &mut host,
            &mut class,
            0,
            [0x21, 0x09, 0x00, 0x03, 0x00, 0x00, 0x01, 0x00],
            &[0x5A],
        );
        assert_eq!(class.writes, vec![(ReportType::Feature, 0, vec![0x5A])]);
    }

    #[test]
    fn test_duplicate_out_packet_ignored() {
        let (mut device, mut host, mut class) = attached();
        host.setup(0, [0x21, 0x09, 0x00, 0x03, 0x00, 0x00, 0x0A, 0x00]);
        device.poll(&mut host, &mut class).unwrap();

        host.out_data(0, DataToggle::Data1, &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(device.poll(&mut host, &mut class), Ok(Event::ControlData));
        // our ACK got lost, host repeats the same packet
        host.out_data(0, DataToggle::Data1, &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(device.poll(&mut host, &mut class), Ok(Event::Ignored));
        host.out_data(0, DataToggle::Data0, &[9, 10]);
        assert_eq!(device.poll(&mut host, &mut class), Ok(Event::ControlData));

        assert_eq!(class.writes.len(), 2);
        assert_eq!(class.writes[1].2, vec![9, 10]);
    }

    #[test]
    fn test_interrupt_endpoint_naks_when_empty() {
        let (mut device, mut host, mut class) = attached();
        sim::enumerate(&mut device, &mut host, &mut class, 1);
        host.take_sent();

        host.in_token(1, 1);
        assert_eq!(device.poll(&mut host, &mut class), Ok(Event::Nak));
        assert_eq!(host.sent(), &[vec![Pid::Nak.byte()]]);
    }

    #[test]
    fn test_interrupt_reports_alternate_toggle() {
        let (mut device, mut host, mut class) = attached();
        sim::enumerate(&mut device, &mut host, &mut class, 1);

        assert!(device.is_interrupt_ready());
        device.send_interrupt_report(&[0xFF, 0x7F, 0x00]).unwrap();
        assert!(!device.is_interrupt_ready());
        assert_eq!(device.send_interrupt_report(&[0]), Err(UsbError::Busy));

        assert_eq!(sim::interrupt_in(&mut device, &mut host, &mut class, 1), Some((DataToggle::Data0, vec![0xFF, 0x7F, 0x00])));
        assert!(device.is_interrupt_ready());

        device.send_interrupt_report(&[1, 2, 3]).unwrap();
        assert_eq!(sim::interrupt_in(&mut device, &mut host, &mut class, 1), Some((DataToggle::Data1, vec![1, 2, 3])));
    }

    #[test]
    fn test_interrupt_report_truncated_to_packet_size() {
        let (mut device, mut host, mut class) = attached();
        sim::enumerate(&mut device, &mut host, &mut class, 1);
        device.send_interrupt_report(&[0; 12]).unwrap();
        let (_, payload) = sim::interrupt_in(&mut device, &mut host, &mut class, 1).unwrap();
        assert_eq!(payload.len(), 8);
    }

    #[test]
    fn test_unacked_report_is_resent() {
        let (mut device, mut host, mut class) = attached();
        sim::enumerate(&mut device, &mut host, &mut class, 1);
        device.send_interrupt_report(&[4, 5, 6]).unwrap();

        host.set_auto_ack(false);
        host.in_token(1, 1);
        assert_eq!(device.poll(&mut host, &mut class), Ok(Event::Ignored));
        assert!(!device.is_interrupt_ready());

        host.set_auto_ack(true);
        assert_eq!(sim::interrupt_in(&mut device, &mut host, &mut class, 1), Some((DataToggle::Data0, vec![4, 5, 6])));
    }

    #[test]
    fn test_bus_reset_while_awaiting_handshake() {
        let (mut device, mut host, mut class) = attached();
        sim::enumerate(&mut device, &mut host, &mut class, 1);
        device.send_interrupt_report(&[7, 8, 9]).unwrap();

        host.set_auto_ack(false);
        host.in_token(1, 1);
        host.bus_reset();
        assert_eq!(device.poll(&mut host, &mut class), Err(UsbError::BusReset));
        assert_eq!(device.state(), DeviceState::Default);
        assert_eq!(device.address(), 0);
        assert_eq!(device.configuration(), 0);
        assert!(device.is_interrupt_ready());
    }

    #[test]
    fn test_bus_reset_in_place_of_foreign_data() {
        let (mut device, mut host, mut class) = attached();
        sim::enumerate(&mut device, &mut host, &mut class, 2);
        host.token(Pid::Setup, 9, 0);
        host.bus_reset();
        assert_eq!(device.poll(&mut host, &mut class), Err(UsbError::BusReset));
        assert_eq!(device.state(), DeviceState::Default);
        assert_eq!(device.address(), 0);
    }

    #[test]
    fn test_interrupt_endpoint_naks_before_configuration() {
        let (mut device, mut host, mut class) = attached();
        host.in_token(0, 1);
        assert_eq!(device.poll(&mut host, &mut class), Ok(Event::Nak));
        assert_eq!(host.sent(), &[vec![Pid::Nak.byte()]]);
    }

    #[test]
    fn test_bus_reset_returns_to_default() {
        let (mut device, mut host, mut class) = attached();
        sim::enumerate(&mut device, &mut host, &mut class, 5);
        host.bus_reset();
        assert_eq!(device.poll(&mut host, &mut class), Ok(Event::Reset));
        assert_eq!(device.state(), DeviceState::Default);
        assert_eq!(device.address(), 0);
    }

    #[test]
    fn test_tokens_for_other_addresses_ignored() {
        let (mut device, mut host, mut class) = attached();
        sim::enumerate(&mut device, &mut host, &mut class, 2);
        host.take_sent();
        host.setup(9, [0x80, 0x06, 0x00, 0x01, 0x00, 0x00, 0x40, 0x00]);
        assert_eq!(device.poll(&mut host, &mut class), Ok(Event::Ignored));
        assert!(host.sent().is_empty());
        // the data packet was consumed along with the token
        assert_eq!(device.poll(&mut host, &mut class), Ok(Event::Idle));
    }

    #[test]
    fn test_corrupt_token_dropped() {
        let (mut device, mut host, mut class) = attached();
        host.raw(vec![0x69, 0x00, 0x11]);
        assert_eq!(
            device.poll(&mut host, &mut class),
            Err(UsbError::Packet(PacketError::Crc))
        );
        assert!(host.sent().is_empty());
    }

    #[test]
    fn test_detach_holds_device_off_bus() {
        let (mut device, mut host, _) = attached();
        assert!(host.is_attached());
        device.detach(&mut host);
        assert!(!host.is_attached());
        assert_eq!(device.state(), DeviceState::Disconnected);
    }
}

//! Scheduler: the cooperative main loop tying USB, controller sampling and idle
//! reports together.

use softusb_proto::{Config, Phy, UsbDevice};

use crate::board::Board;
use crate::boot::BOOT_KEY;
use crate::controller::{Controller, ControllerError};
use crate::function::HidFunction;
use crate::report::{ReportBuffer, ReportMask, REPORT_CAPACITY};

/// How long the device stays detached at start so the host re-enumerates it.
pub const REENUMERATE_MS: u32 = 10;

/// Outcome of one scheduler iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Control {
    /// Keep looping.
    Continue,
    /// The boot key is stored and the device is off the bus; only a reset follows.
    Reboot,
}

/// Runs one controller behind a software USB device.
///
/// Owns every piece of mutable state: the USB engine and its PHY, the board
/// services, the controller, its idle table and the bootloader flag.
///
/// # Ordering
///
/// Each [`step`](Self::step) feeds the watchdog, checks the bootloader flag, polls
/// USB, then samples the controller and sends whatever reports are due. Waiting for
/// the interrupt endpoint keeps polling USB and feeding the watchdog.
pub struct Scheduler<C, P, B> {
    device: UsbDevice,
    phy: P,
    board: B,
    function: HidFunction<C>,
    due: ReportMask,
    first_run: bool,
    report: ReportBuffer,
}

impl<C: Controller, P: Phy, B: Board> Scheduler<C, P, B> {
    /// Create a scheduler. Nothing touches the hardware until [`start`](Self::start).
    pub fn new(controller: C, config: Config, phy: P, board: B) -> Self {
        let report_len = u16::try_from(C::REPORT_DESCRIPTOR.len()).unwrap_or(u16::MAX);
        Self {
            device: UsbDevice::new(config, report_len),
            phy,
            board,
            function: HidFunction::new(controller),
            due: ReportMask::NONE,
            first_run: true,
            report: [0; REPORT_CAPACITY],
        }
    }

    /// Initialise the controller, then force the host to enumerate us afresh.
    pub fn start(&mut self) -> Result<(), ControllerError> {
        self.function.controller_mut().init()?;
        self.device.detach(&mut self.phy);
        self.board.delay_ms(REENUMERATE_MS);
        self.device.attach(&mut self.phy);
        Ok(())
    }

    /// Run forever. Returns only through a watchdog reset into the bootloader.
    pub fn run(&mut self) -> ! {
        loop {
            if self.step() == Control::Reboot {
                self.board.halt_for_reset();
            }
        }
    }

    /// One iteration of the main loop.
    pub fn step(&mut self) -> Control {
        self.board.feed_watchdog();

        if self.function.boot_trigger().is_armed() {
            return self.enter_bootloader();
        }

        self.poll();

        if self.first_run {
            self.first_run = false;
            self.function.controller_mut().update();
        }

        if self.board.idle_tick_due() {
            self.due |= self.function.idle_mut().advance();
        }

        if self.board.sample_due() {
            let controller = self.function.controller_mut();
            controller.update();
            for id in ReportMask::first(C::REPORT_COUNT).iter() {
                if controller.changed(id) {
                    self.due.insert(id);
                }
            }
        }

        if !self.due.is_empty() {
            self.send_due();
        }
        Control::Continue
    }

    fn enter_bootloader(&mut self) -> Control {
        #[cfg(feature = "defmt")]
        defmt::info!("entering bootloader");
        self.board.store_boot_key(BOOT_KEY);
        self.device.detach(&mut self.phy);
        Control::Reboot
    }

    fn poll(&mut self) {
        if let Err(_e) = self.device.poll(&mut self.phy, &mut self.function) {
            #[cfg(feature = "defmt")]
            defmt::debug!("usb: {}", _e);
        }
    }

    fn send_due(&mut self) {
        let due = core::mem::take(&mut self.due);
        for id in due.iter() {
            while self.device.is_configured() && !self.device.is_interrupt_ready() {
                self.poll();
                self.board.feed_watchdog();
            }
            if !self.device.is_configured() {
                #[cfg(feature = "defmt")]
                defmt::debug!("report {=u8} dropped: not configured", id);
                continue;
            }
            let len = self
                .function
                .controller_mut()
                .build_report(id, &mut self.report)
                .min(REPORT_CAPACITY);
            if let Err(_e) = self.device.send_interrupt_report(&self.report[..len]) {
                #[cfg(feature = "defmt")]
                defmt::warn!("report {=u8} not queued: {}", id, _e);
            }
        }
    }

    pub fn device(&self) -> &UsbDevice {
        &self.device
    }

    pub fn phy(&self) -> &P {
        &self.phy
    }

    pub fn phy_mut(&mut self) -> &mut P {
        &mut self.phy
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    pub fn controller(&self) -> &C {
        self.function.controller()
    }

    pub fn controller_mut(&mut self) -> &mut C {
        self.function.controller_mut()
    }

    pub fn function(&self) -> &HidFunction<C> {
        &self.function
    }
}

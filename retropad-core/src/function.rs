//! HID class handler backed by a [`Controller`].

use softusb_proto::{HidClass, ReportType};

use crate::boot::{BootTrigger, BOOTLOADER_REQUEST};
use crate::controller::Controller;
use crate::idle::IdleTable;
use crate::report::{ReportBuffer, ReportId, REPORT_CAPACITY};

/// Answers descriptor and HID class requests for one controller.
pub struct HidFunction<C> {
    controller: C,
    idle: IdleTable,
    boot: BootTrigger,
}

impl<C: Controller> HidFunction<C> {
    pub fn new(controller: C) -> Self {
        Self {
            controller,
            idle: IdleTable::new(C::REPORT_COUNT),
            boot: BootTrigger::new(),
        }
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }

    pub fn idle(&self) -> &IdleTable {
        &self.idle
    }

    pub fn idle_mut(&mut self) -> &mut IdleTable {
        &mut self.idle
    }

    pub fn boot_trigger(&self) -> &BootTrigger {
        &self.boot
    }
}

impl<C: Controller> HidClass for HidFunction<C> {
    fn report_descriptor(&self) -> &[u8] {
        C::REPORT_DESCRIPTOR
    }

    fn device_descriptor(&self) -> Option<&[u8]> {
        C::DEVICE_DESCRIPTOR
    }

    fn get_report(&mut self, _report_type: ReportType, report_id: u8, buf: &mut [u8]) -> usize {
        let id: ReportId = report_id.max(1);
        let mut report: ReportBuffer = [0; REPORT_CAPACITY];
        let len = self
            .controller
            .build_report(id, &mut report)
            .min(REPORT_CAPACITY)
            .min(buf.len());
        buf[..len].copy_from_slice(&report[..len]);
        len
    }

    fn set_report(&mut self, _report_type: ReportType, _report_id: u8, data: &[u8]) {
        if data.first() == Some(&BOOTLOADER_REQUEST) {
            #[cfg(feature = "defmt")]
            defmt::warn!("bootloader requested by host");
            self.boot.arm();
        }
    }

    fn get_idle(&self, report_id: u8) -> Option<u8> {
        self.idle.get(report_id)
    }

    fn set_idle(&mut self, report_id: u8, rate: u8) {
        #[cfg(feature = "defmt")]
        defmt::debug!("set idle: report {=u8} rate {=u8}", report_id, rate);
        self.idle.set(report_id, rate);
    }
}

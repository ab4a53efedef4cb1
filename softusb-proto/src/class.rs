//! HID class callbacks.

/// Report type in the high byte of `wValue` for GET_REPORT/SET_REPORT.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportType {
    Input,
    Output,
    Feature,
    Reserved(u8),
}

impl From<u8> for ReportType {
    fn from(raw: u8) -> Self {
        match raw {
            1 => Self::Input,
            2 => Self::Output,
            3 => Self::Feature,
            other => Self::Reserved(other),
        }
    }
}

/// Per-firmware handler for descriptors and HID class requests.
///
/// [`UsbDevice`](crate::UsbDevice) borrows the handler for the duration of one
/// [`poll`](crate::UsbDevice::poll) call. Report ids are 1-based; 0 means "all
/// reports" where the HID specification allows it.
pub trait HidClass {
    /// HID report descriptor served on GET_DESCRIPTOR(REPORT).
    fn report_descriptor(&self) -> &[u8];

    /// Device descriptor override. `None` uses the one built from
    /// [`Config`](crate::Config).
    fn device_descriptor(&self) -> Option<&[u8]> {
        None
    }

    /// GET_REPORT: write the current report into `buf` and return its length.
    fn get_report(&mut self, report_type: ReportType, report_id: u8, buf: &mut [u8]) -> usize;

    /// One data packet of a SET_REPORT transfer (at most 8 bytes).
    fn set_report(&mut self, report_type: ReportType, report_id: u8, data: &[u8]);

    /// GET_IDLE: current rate in 4 ms units, or `None` to answer with no data.
    fn get_idle(&self, report_id: u8) -> Option<u8>;

    /// SET_IDLE: new rate in 4 ms units (0 means infinite).
    fn set_idle(&mut self, report_id: u8, rate: u8);
}

//! HID idle rates and their countdown counters.
//!
//! Rates are in 4 ms units, 0 meaning "only report on change". [`IdleTable::advance`]
//! is called once per 4 ms tick; a report whose counter runs out is due and its
//! counter reloads from the rate. Reports sent because the input changed do not
//! restart the countdown.

use crate::report::{ReportId, ReportMask, MAX_REPORTS};

/// Per-report idle rates and countdowns.
///
/// # Example
///
/// ```
/// use retropad_core::IdleTable;
///
/// let mut idle = IdleTable::new(1);
/// idle.set(1, 2);
/// let fired = (0..6).filter(|_| !idle.advance().is_empty()).count();
/// assert_eq!(fired, 3);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IdleTable {
    report_count: u8,
    rates: [u8; MAX_REPORTS],
    counters: [u8; MAX_REPORTS],
}

impl IdleTable {
    /// All rates start at 0 (infinite).
    #[must_use]
    pub const fn new(report_count: u8) -> Self {
        let report_count = if report_count as usize > MAX_REPORTS {
            MAX_REPORTS as u8
        } else {
            report_count
        };
        Self {
            report_count,
            rates: [0; MAX_REPORTS],
            counters: [0; MAX_REPORTS],
        }
    }

    /// SET_IDLE. Report id 0 sets every report; unknown ids are ignored.
    pub fn set(&mut self, id: ReportId, rate: u8) {
        match id {
            0 => self.rates = [rate; MAX_REPORTS],
            id if usize::from(id) <= MAX_REPORTS => self.rates[usize::from(id) - 1] = rate,
            _ => {}
        }
    }

    /// GET_IDLE for ids 1..=8.
    #[must_use]
    pub fn get(&self, id: ReportId) -> Option<u8> {
        match usize::from(id) {
            index @ 1..=MAX_REPORTS => Some(self.rates[index - 1]),
            _ => None,
        }
    }

    /// One 4 ms tick: returns the reports whose idle period elapsed.
    pub fn advance(&mut self) -> ReportMask {
        let mut due = ReportMask::NONE;
        for index in 0..usize::from(self.report_count) {
            let rate = self.rates[index];
            if rate == 0 {
                continue;
            }
            let counter = &mut self.counters[index];
            if *counter > 1 {
                *counter -= 1;
            } else {
                *counter = rate;
                due.insert(index as u8 + 1);
            }
        }
        due
    }
}

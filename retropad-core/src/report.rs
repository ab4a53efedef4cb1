//! Report ids, due-report masks and axis helpers shared by all controllers.

use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign};

/// HID report id. Ids are 1-based; 0 addresses every report in SET_IDLE.
pub type ReportId = u8;

/// Largest number of reports a controller may declare.
pub const MAX_REPORTS: usize = 8;

/// Size of the buffer a controller builds a report into (one low-speed packet).
pub const REPORT_CAPACITY: usize = 8;

/// Buffer passed to [`Controller::build_report`](crate::Controller::build_report).
pub type ReportBuffer = [u8; REPORT_CAPACITY];

/// Lowest axis value.
pub const AXIS_MIN: u8 = 0x00;
/// Highest axis value.
pub const AXIS_MAX: u8 = 0xFF;
/// Neutral value of an absolute 8-bit axis.
pub const AXIS_CENTER: u8 = 0x80;

/// Clamp a raw reading to the 0..=255 axis range.
#[inline]
#[must_use]
pub const fn clamp_axis(raw: i32) -> u8 {
    if raw < AXIS_MIN as i32 {
        AXIS_MIN
    } else if raw > AXIS_MAX as i32 {
        AXIS_MAX
    } else {
        raw as u8
    }
}

/// Set of report ids waiting to be sent, one bit per id.
///
/// # Example
///
/// ```
/// use retropad_core::ReportMask;
///
/// let due = ReportMask::of(1) | ReportMask::of(3);
/// assert!(due.contains(3));
/// assert!(!due.contains(2));
/// assert_eq!(due.iter().collect::<Vec<_>>(), vec![1, 3]);
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReportMask(pub u8);

impl ReportMask {
    /// No report due.
    pub const NONE: Self = Self(0);

    /// Mask holding only `id`. Ids outside 1..=8 give an empty mask.
    #[inline]
    #[must_use]
    pub const fn of(id: ReportId) -> Self {
        if id == 0 || id as usize > MAX_REPORTS {
            Self::NONE
        } else {
            Self(1 << (id - 1))
        }
    }

    /// Mask holding ids `1..=count`.
    #[inline]
    #[must_use]
    pub const fn first(count: u8) -> Self {
        if count as usize >= MAX_REPORTS {
            Self(0xFF)
        } else {
            Self((1 << count) - 1)
        }
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, id: ReportId) -> bool {
        let bit = Self::of(id).0;
        bit != 0 && (self.0 & bit) == bit
    }

    #[inline]
    pub fn insert(&mut self, id: ReportId) {
        self.0 |= Self::of(id).0;
    }

    #[inline]
    pub fn remove(&mut self, id: ReportId) {
        self.0 &= !Self::of(id).0;
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Ids in the mask, lowest first.
    pub fn iter(self) -> impl Iterator<Item = ReportId> {
        (1..=MAX_REPORTS as u8).filter(move |&id| self.contains(id))
    }
}

impl BitOr for ReportMask {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ReportMask {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ReportMask {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for ReportMask {
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

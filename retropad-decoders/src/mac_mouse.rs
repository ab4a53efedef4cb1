//! Macintosh (and Apple II) quadrature mouse.
//!
//! The ball drives two slotted wheels, each read by a pair of 90° out-of-phase
//! sensors. Decoding happens on every edge, in an interrupt handler, through
//! [`QuadratureDecoder`]; it accumulates motion into a [`QuadratureCell`] that the
//! [`MacMouse`] controller reads from the main loop.
//!
//! ```
//! use retropad_decoders::mac_mouse::QuadratureCell;
//!
//! static CELL: QuadratureCell = QuadratureCell::new();
//!
//! CELL.add(3, -2);
//! CELL.add(-1, 0);
//! assert_eq!(CELL.totals(), (2, -2));
//! ```

use embedded_hal::digital::InputPin;
use portable_atomic::{AtomicI16, AtomicU8, Ordering};
use retropad_core::{Controller, ControllerError, ReportBuffer, ReportId};

pub const REPORT_LEN: usize = 4;

/// Step table indexed by `old << 2 | new`, where each 2-bit value is
/// `quadrature << 1 | phase`. Entries of 2 are invalid transitions (both lines
/// changed at once) and count as two steps.
pub const STEPS: [i8; 16] = [0, 1, -1, 2, -1, 0, 2, 1, 1, 2, 0, -1, 2, -1, 1, 0];

const ITEMS: &[u8] = &[
    0x05, 0x01, // USAGE_PAGE (Generic Desktop)
    0x09, 0x02, // USAGE (Mouse)
    0xA1, 0x01, // COLLECTION (Application)
    0x09, 0x01, //   USAGE (Pointer)
    0xA1, 0x00, //   COLLECTION (Physical)
    0x05, 0x09, //     USAGE_PAGE (Button)
    0x19, 0x01, //     USAGE_MINIMUM (Button 1)
    0x29, 0x03, //     USAGE_MAXIMUM (Button 3)
    0x15, 0x00, //     LOGICAL_MINIMUM (0)
    0x25, 0x01, //     LOGICAL_MAXIMUM (1)
    0x95, 0x03, //     REPORT_COUNT (3)
    0x75, 0x01, //     REPORT_SIZE (1)
    0x81, 0x02, //     INPUT (Data,Var,Abs)
    0x95, 0x01, //     REPORT_COUNT (1)
    0x75, 0x05, //     REPORT_SIZE (5)
    0x81, 0x03, //     INPUT (Const,Var,Abs)
    0x05, 0x01, //     USAGE_PAGE (Generic Desktop)
    0x09, 0x30, //     USAGE (X)
    0x09, 0x31, //     USAGE (Y)
    0x09, 0x38, //     USAGE (Wheel)
    0x15, 0x81, //     LOGICAL_MINIMUM (-127)
    0x25, 0x7F, //     LOGICAL_MAXIMUM (127)
    0x75, 0x08, //     REPORT_SIZE (8)
    0x95, 0x03, //     REPORT_COUNT (3)
    0x81, 0x06, //     INPUT (Data,Var,Rel)
];

const DESCRIPTOR: [u8; crate::descriptor_len(ITEMS, 2)] = crate::with_boot_feature(ITEMS);

/// Three-button relative mouse with wheel, plus the bootloader feature.
pub const REPORT_DESCRIPTOR: &[u8] = &DESCRIPTOR;

/// Motion totals shared between the edge interrupt and the main loop.
///
/// Totals are running 16-bit counters that wrap; readers take differences. There must
/// be exactly one writer (the decoder), so plain loads and stores are enough.
pub struct QuadratureCell {
    x: AtomicI16,
    y: AtomicI16,
    buttons: AtomicU8,
}

impl Default for QuadratureCell {
    fn default() -> Self {
        Self::new()
    }
}

impl QuadratureCell {
    pub const fn new() -> Self {
        Self {
            x: AtomicI16::new(0),
            y: AtomicI16::new(0),
            buttons: AtomicU8::new(0),
        }
    }

    /// Accumulate motion. Single writer only.
    pub fn add(&self, dx: i8, dy: i8) {
        if dx != 0 {
            let x = self.x.load(Ordering::Relaxed);
            self.x.store(x.wrapping_add(i16::from(dx)), Ordering::Release);
        }
        if dy != 0 {
            let y = self.y.load(Ordering::Relaxed);
            self.y.store(y.wrapping_add(i16::from(dy)), Ordering::Release);
        }
    }

    pub fn set_buttons(&self, buttons: u8) {
        self.buttons.store(buttons, Ordering::Release);
    }

    /// Running `(x, y)` totals.
    #[must_use]
    pub fn totals(&self) -> (i16, i16) {
        (
            self.x.load(Ordering::Acquire),
            self.y.load(Ordering::Acquire),
        )
    }

    #[must_use]
    pub fn buttons(&self) -> u8 {
        self.buttons.load(Ordering::Acquire)
    }
}

const H: u8 = 1 << 0;
const HQ: u8 = 1 << 1;
const V: u8 = 1 << 2;
const VQ: u8 = 1 << 3;
const BUTTON: u8 = 1 << 4;

/// Step for one axis given the previous and current line levels.
#[inline]
fn step(old: u8, new: u8, phase: u8, quadrature: u8) -> i8 {
    let bits = |lines: u8| u8::from(lines & phase != 0) | (u8::from(lines & quadrature != 0) << 1);
    STEPS[usize::from(bits(old) << 2 | bits(new))]
}

/// Edge-side decoder. Call [`sample`](Self::sample) on every change of any mouse line.
pub struct QuadratureDecoder<P> {
    pins: [P; 5],
    old: u8,
}

impl<P: InputPin> QuadratureDecoder<P> {
    /// `pins` in order H, HQ, V, VQ, button, all active-low. Takes the reference
    /// reading so the first edge decodes against the real line state.
    pub fn new(mut pins: [P; 5]) -> Self {
        let old = Self::read(&mut pins);
        Self { pins, old }
    }

    fn read(pins: &mut [P; 5]) -> u8 {
        crate::pressed_mask(pins)
    }

    /// Read the lines once, accumulate motion and publish the button.
    pub fn sample(&mut self, cell: &QuadratureCell) {
        let new = Self::read(&mut self.pins);
        let dx = step(self.old, new, H, HQ);
        let dy = step(self.old, new, V, VQ);
        self.old = new;
        cell.add(dx, dy);
        cell.set_buttons(u8::from(new & BUTTON != 0));
    }
}

/// Main-loop side: turns the cell's running totals into relative reports.
pub struct MacMouse<'a> {
    cell: &'a QuadratureCell,
    snapshot: (i16, i16),
    taken: (i16, i16),
    buttons: u8,
    reported_buttons: Option<u8>,
}

impl<'a> MacMouse<'a> {
    pub fn new(cell: &'a QuadratureCell) -> Self {
        let totals = cell.totals();
        Self {
            cell,
            snapshot: totals,
            taken: totals,
            buttons: 0,
            reported_buttons: None,
        }
    }

    /// Motion not yet reported, as of the last update.
    #[must_use]
    pub fn delta(&self) -> (i16, i16) {
        (
            self.snapshot.0.wrapping_sub(self.taken.0),
            self.snapshot.1.wrapping_sub(self.taken.1),
        )
    }
}

/// Largest step one report carries; the descriptor's axis range is -127..=127.
const MAX_STEP: i16 = 127;

#[inline]
fn report_step(delta: i16) -> i8 {
    // clamped into i8 range, cannot truncate
    delta.clamp(-MAX_STEP, MAX_STEP) as i8
}

impl Controller for MacMouse<'_> {
    const REPORT_DESCRIPTOR: &'static [u8] = REPORT_DESCRIPTOR;

    fn init(&mut self) -> Result<(), ControllerError> {
        self.snapshot = self.cell.totals();
        self.taken = self.snapshot;
        self.reported_buttons = None;
        Ok(())
    }

    fn update(&mut self) {
        self.snapshot = self.cell.totals();
        self.buttons = self.cell.buttons();
    }

    fn changed(&self, _id: ReportId) -> bool {
        self.delta() != (0, 0) || self.reported_buttons != Some(self.buttons)
    }

    fn build_report(&mut self, _id: ReportId, buf: &mut ReportBuffer) -> usize {
        let (dx, dy) = self.delta();
        let (dx, dy) = (report_step(dx), report_step(dy));
        buf[..REPORT_LEN].copy_from_slice(&[self.buttons, dx as u8, dy as u8, 0]);
        // whatever did not fit goes out with the next report
        self.taken = (
            self.taken.0.wrapping_add(i16::from(dx)),
            self.taken.1.wrapping_add(i16::from(dy)),
        );
        self.reported_buttons = Some(self.buttons);
        REPORT_LEN
    }
}

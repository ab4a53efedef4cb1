//! Hand-rolled pin and delay doubles for decoder tests.

extern crate std;

use core::convert::Infallible;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

/// Pin whose level the test controls; output writes are visible to the test.
#[derive(Clone, Default)]
pub struct MockPin {
    high: Rc<Cell<bool>>,
}

impl MockPin {
    /// An input idling high, like a released button on a pull-up.
    pub fn released() -> Self {
        let pin = Self::default();
        pin.high.set(true);
        pin
    }

    pub fn press(&self) {
        self.high.set(false);
    }

    pub fn release(&self) {
        self.high.set(true);
    }

    pub fn is_set_high(&self) -> bool {
        self.high.get()
    }
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl InputPin for MockPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high.get())
    }
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high.set(true);
        Ok(())
    }
}

/// Bank of released input pins plus handles to press them.
pub fn pins<const N: usize>() -> ([MockPin; N], [MockPin; N]) {
    let pins: [MockPin; N] = core::array::from_fn(|_| MockPin::released());
    (pins.clone(), pins)
}

/// Delay that records the requested durations.
#[derive(Clone, Default)]
pub struct RecordingDelay {
    pub waits_ns: Rc<RefCell<Vec<u32>>>,
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.waits_ns.borrow_mut().push(ns);
    }
}

//! Vectrex controller: an analog stick read through the ADC and four buttons.

use embedded_hal::digital::InputPin;
use retropad_core::{Controller, ControllerError, ReportBuffer, ReportId, AXIS_CENTER};

use crate::pressed_mask;

pub const REPORT_LEN: usize = 3;

const ITEMS: &[u8] = &[
    0x05, 0x01, // USAGE_PAGE (Generic Desktop)
    0x09, 0x05, // USAGE (Game Pad)
    0xA1, 0x01, // COLLECTION (Application)
    0xA1, 0x00, //   COLLECTION (Physical)
    0x05, 0x09, //     USAGE_PAGE (Button)
    0x19, 0x01, //     USAGE_MINIMUM (Button 1)
    0x29, 0x04, //     USAGE_MAXIMUM (Button 4)
    0x15, 0x00, //     LOGICAL_MINIMUM (0)
    0x25, 0x01, //     LOGICAL_MAXIMUM (1)
    0x95, 0x08, //     REPORT_COUNT (8)
    0x75, 0x01, //     REPORT_SIZE (1)
    0x81, 0x02, //     INPUT (Data,Var,Abs)
    0x05, 0x01, //     USAGE_PAGE (Generic Desktop)
    0x09, 0x30, //     USAGE (X)
    0x09, 0x31, //     USAGE (Y)
    0x15, 0x00, //     LOGICAL_MINIMUM (0)
    0x26, 0xFF, 0x00, //     LOGICAL_MAXIMUM (255)
    0x75, 0x08, //     REPORT_SIZE (8)
    0x95, 0x02, //     REPORT_COUNT (2)
    0x81, 0x02, //     INPUT (Data,Var,Abs)
];

const DESCRIPTOR: [u8; crate::descriptor_len(ITEMS, 2)] = crate::with_boot_feature(ITEMS);

/// Gamepad with four buttons padded to a byte, then X/Y, plus the bootloader feature.
pub const REPORT_DESCRIPTOR: &[u8] = &DESCRIPTOR;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Axis {
    X,
    Y,
}

/// 8-bit ADC conversion of one pot wiper.
pub trait AnalogSampler {
    /// Power up the converter.
    fn enable(&mut self) -> Result<(), ControllerError> {
        Ok(())
    }

    /// Convert one axis. `None` if the conversion failed; the axis then reads centered.
    fn read(&mut self, axis: Axis) -> Option<u8>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
struct Sample {
    buttons: u8,
    x: u8,
    y: u8,
}

/// Vectrex stick: four button inputs and an ADC.
pub struct Vectrex<P, A> {
    buttons: [P; 4],
    adc: A,
    sample: Sample,
    reported: Option<Sample>,
}

impl<P: InputPin, A: AnalogSampler> Vectrex<P, A> {
    pub fn new(buttons: [P; 4], adc: A) -> Self {
        Self {
            buttons,
            adc,
            sample: Sample::default(),
            reported: None,
        }
    }

    fn read(&mut self, axis: Axis) -> u8 {
        self.adc.read(axis).unwrap_or(AXIS_CENTER)
    }
}

impl<P: InputPin, A: AnalogSampler> Controller for Vectrex<P, A> {
    const REPORT_DESCRIPTOR: &'static [u8] = REPORT_DESCRIPTOR;

    fn init(&mut self) -> Result<(), ControllerError> {
        self.adc.enable()?;
        self.sample = Sample::default();
        self.reported = None;
        Ok(())
    }

    fn update(&mut self) {
        let buttons = pressed_mask(&mut self.buttons) & 0x0F;
        let x = self.read(Axis::X);
        let y = self.read(Axis::Y);
        self.sample = Sample { buttons, x, y };
    }

    fn changed(&self, _id: ReportId) -> bool {
        self.reported != Some(self.sample)
    }

    fn build_report(&mut self, _id: ReportId, buf: &mut ReportBuffer) -> usize {
        let Sample { buttons, x, y } = self.sample;
        buf[0] = buttons;
        buf[1] = x;
        buf[2] = 255 - y;
        self.reported = Some(self.sample);
        REPORT_LEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{pins, MockPin};

    #[derive(Default)]
    struct MockAdc {
        x: Option<u8>,
        y: Option<u8>,
        fail_enable: bool,
    }

    impl AnalogSampler for MockAdc {
        fn enable(&mut self) -> Result<(), ControllerError> {
            if self.fail_enable {
                Err(ControllerError::Peripheral)
            } else {
                Ok(())
            }
        }

        fn read(&mut self, axis: Axis) -> Option<u8> {
            match axis {
                Axis::X => self.x,
                Axis::Y => self.y,
            }
        }
    }

    fn stick(x: Option<u8>, y: Option<u8>) -> (Vectrex<MockPin, MockAdc>, [MockPin; 4]) {
        let (buttons, handles) = pins::<4>();
        let mut stick = Vectrex::new(
            buttons,
            MockAdc {
                x,
                y,
                ..MockAdc::default()
            },
        );
        stick.init().unwrap();
        (stick, handles)
    }

    fn build(stick: &mut Vectrex<MockPin, MockAdc>) -> [u8; REPORT_LEN] {
        let mut buf = [0u8; 8];
        assert_eq!(stick.build_report(1, &mut buf), REPORT_LEN);
        [buf[0], buf[1], buf[2]]
    }

    #[test]
    fn test_report_layout_inverts_y() {
        let (mut stick, handles) = stick(Some(0x10), Some(0x20));
        handles[0].press();
        handles[3].press();
        stick.update();
        assert_eq!(build(&mut stick), [0x09, 0x10, 0xDF]);
    }

    #[test]
    fn test_failed_conversion_reads_center() {
        let (mut stick, _) = stick(None, None);
        stick.update();
        assert_eq!(build(&mut stick), [0x00, 0x80, 0x7F]);
    }

    #[test]
    fn test_changed_on_axis_movement() {
        let (mut stick, _) = stick(Some(100), Some(100));
        stick.update();
        build(&mut stick);
        stick.update();
        assert!(!stick.changed(1));

        stick.adc.x = Some(101);
        stick.update();
        assert!(stick.changed(1));
    }

    #[test]
    fn test_init_reports_adc_failure() {
        let (buttons, _) = pins::<4>();
        let mut stick = Vectrex::new(
            buttons,
            MockAdc {
                fail_enable: true,
                ..MockAdc::default()
            },
        );
        assert_eq!(stick.init(), Err(ControllerError::Peripheral));
    }

    #[test]
    fn test_descriptor_declares_boot_feature() {
        assert!(crate::has_boot_feature(REPORT_DESCRIPTOR));
    }
}

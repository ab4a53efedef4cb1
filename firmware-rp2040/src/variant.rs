//! Build-time controller selection: product strings and USB ids per variant.

use softusb_proto::Config;

/// pid.codes open-source vendor id.
pub const VENDOR_ID: u16 = 0x1209;

#[cfg(feature = "controller-atari")]
pub const NAME: &str = "Atari joystick";
#[cfg(feature = "controller-paddles")]
pub const NAME: &str = "Atari paddles";
#[cfg(feature = "controller-c64-paddles")]
pub const NAME: &str = "C64 paddles";
#[cfg(feature = "controller-snes")]
pub const NAME: &str = "NES/SNES pad";
#[cfg(feature = "controller-vectrex")]
pub const NAME: &str = "Vectrex controller";
#[cfg(feature = "controller-mac-mouse")]
pub const NAME: &str = "Macintosh mouse";
#[cfg(feature = "controller-intellivision")]
pub const NAME: &str = "Intellivision controller";

/// Product id; each variant gets its own so hosts keep separate mappings.
#[cfg(feature = "controller-atari")]
pub const PRODUCT_ID: u16 = 0x0001;
#[cfg(feature = "controller-paddles")]
pub const PRODUCT_ID: u16 = 0x0002;
#[cfg(feature = "controller-c64-paddles")]
pub const PRODUCT_ID: u16 = 0x0003;
#[cfg(feature = "controller-snes")]
pub const PRODUCT_ID: u16 = 0x0004;
#[cfg(feature = "controller-vectrex")]
pub const PRODUCT_ID: u16 = 0x0005;
#[cfg(feature = "controller-mac-mouse")]
pub const PRODUCT_ID: u16 = 0x0006;
#[cfg(feature = "controller-intellivision")]
pub const PRODUCT_ID: u16 = 0x0007;

/// USB identity of this build.
#[must_use]
pub const fn usb_config() -> Config {
    Config::new(VENDOR_ID, PRODUCT_ID)
        .device_release(0x0302)
        .manufacturer("Retropad")
        .product(NAME)
        .max_power_ma(100)
        .poll_interval_ms(10)
}

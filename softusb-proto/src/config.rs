//! Build-time device identity and power settings.

/// Device configuration used to generate the standard descriptors.
///
/// # Example
///
/// ```
/// use softusb_proto::Config;
///
/// let config = Config::new(0x1209, 0x5250)
///     .manufacturer("Retro Adapters")
///     .product("Atari Joystick")
///     .max_power_ma(100);
/// assert_eq!(config.vendor_id, 0x1209);
/// assert_eq!(config.poll_interval_ms, 10);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    pub vendor_id: u16,
    pub product_id: u16,
    /// BCD release number (`bcdDevice`).
    pub device_release: u16,
    pub manufacturer: Option<&'static str>,
    pub product: Option<&'static str>,
    pub serial_number: Option<&'static str>,
    /// Maximum bus current in mA (rounded down to 2 mA units).
    pub max_power_ma: u16,
    pub self_powered: bool,
    /// Interrupt IN polling interval requested from the host.
    pub poll_interval_ms: u8,
}

impl Config {
    #[must_use]
    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            device_release: 0x0100,
            manufacturer: None,
            product: None,
            serial_number: None,
            max_power_ma: 100,
            self_powered: false,
            poll_interval_ms: 10,
        }
    }

    #[must_use]
    pub const fn device_release(mut self, bcd: u16) -> Self {
        self.device_release = bcd;
        self
    }

    #[must_use]
    pub const fn manufacturer(mut self, name: &'static str) -> Self {
        self.manufacturer = Some(name);
        self
    }

    #[must_use]
    pub const fn product(mut self, name: &'static str) -> Self {
        self.product = Some(name);
        self
    }

    #[must_use]
    pub const fn serial_number(mut self, serial: &'static str) -> Self {
        self.serial_number = Some(serial);
        self
    }

    #[must_use]
    pub const fn max_power_ma(mut self, ma: u16) -> Self {
        self.max_power_ma = ma;
        self
    }

    #[must_use]
    pub const fn self_powered(mut self, self_powered: bool) -> Self {
        self.self_powered = self_powered;
        self
    }

    #[must_use]
    pub const fn poll_interval_ms(mut self, ms: u8) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// The string for a descriptor index (1 manufacturer, 2 product, 3 serial).
    #[must_use]
    pub const fn string(&self, index: u8) -> Option<&'static str> {
        match index {
            1 => self.manufacturer,
            2 => self.product,
            3 => self.serial_number,
            _ => None,
        }
    }
}

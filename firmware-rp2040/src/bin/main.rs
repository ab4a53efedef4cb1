#![no_std]
#![no_main]

use defmt::{error, info};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_rp::gpio::{Flex, Input, Pin, Pull};
use embassy_rp::watchdog::Watchdog;
use embassy_rp::Peri;
use retropad_core::{Scheduler, BOOT_KEY};
use retropad_rp2040::{take_boot_key, variant, GpioLines, Rp2040Board, SysTickClock};
use softusb_proto::SoftPhy;

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

#[cfg(any(feature = "controller-paddles", feature = "controller-c64-paddles"))]
use retropad_decoders::{paddles, Paddles};
#[cfg(any(feature = "controller-paddles", feature = "controller-c64-paddles"))]
use retropad_rp2040::{FlexPot, TimerCapture};

#[cfg(feature = "controller-paddles")]
const DIVIDER: u16 = paddles::ATARI_DIVIDER;
#[cfg(feature = "controller-c64-paddles")]
const DIVIDER: u16 = paddles::C64_DIVIDER;

/// Motion shared between the core 1 decoder and the main loop.
#[cfg(feature = "controller-mac-mouse")]
static MOUSE: retropad_decoders::QuadratureCell = retropad_decoders::QuadratureCell::new();
#[cfg(feature = "controller-mac-mouse")]
static CORE1_STACK: static_cell::StaticCell<embassy_rp::multicore::Stack<4096>> =
    static_cell::StaticCell::new();

/// Controller input with the pull-up the switches close against.
fn pulled_up(pin: Peri<'static, impl Pin>) -> Input<'static> {
    Input::new(pin, Pull::Up)
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("Retropad starting...");

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    // A boot key from the previous run means the host asked for a firmware update
    let mut watchdog = Watchdog::new(p.WATCHDOG);
    if take_boot_key(&mut watchdog) == Some(BOOT_KEY) {
        info!("boot key set, jumping to the USB bootloader");
        embassy_rp::rom_data::reset_to_usb_boot(0, 0);
        loop {
            cortex_m::asm::wfi();
        }
    }

    // --- Controller ---
    // DB9 pin numbers in the comments
    #[cfg(feature = "controller-atari")]
    let controller = retropad_decoders::AtariJoystick::new([
        pulled_up(p.PIN_2), // 1: up
        pulled_up(p.PIN_3), // 2: down
        pulled_up(p.PIN_4), // 3: left
        pulled_up(p.PIN_5), // 4: right
        pulled_up(p.PIN_6), // 6: fire
        pulled_up(p.PIN_7), // 9: button 2
        pulled_up(p.PIN_8), // 5: button 3
    ]);

    #[cfg(any(feature = "controller-paddles", feature = "controller-c64-paddles"))]
    let controller = Paddles::new(
        [
            FlexPot::new(Flex::new(p.PIN_9)),  // 9: pot 0
            FlexPot::new(Flex::new(p.PIN_10)), // 5: pot 1
        ],
        // twice the full-scale reading before a paddle counts as unplugged
        TimerCapture::new(2 * 256 * DIVIDER),
        [
            pulled_up(p.PIN_4), // 3: button 0
            pulled_up(p.PIN_5), // 4: button 1
        ],
        embassy_time::Delay,
        DIVIDER,
    );

    #[cfg(feature = "controller-snes")]
    let controller = retropad_decoders::ShiftRegisterPad::new(
        embassy_rp::gpio::Output::new(p.PIN_2, embassy_rp::gpio::Level::Low), // latch
        embassy_rp::gpio::Output::new(p.PIN_3, embassy_rp::gpio::Level::High), // clock
        pulled_up(p.PIN_4),                                                   // data
        embassy_time::Delay,
    );

    #[cfg(feature = "controller-vectrex")]
    let controller = {
        use embassy_rp::adc::{Adc, Channel, Config as AdcConfig};
        let adc = Adc::new_blocking(p.ADC, AdcConfig::default());
        let stick = retropad_rp2040::AdcStick::new(
            adc,
            Channel::new_pin(p.PIN_26, Pull::None), // 6: X wiper
            Channel::new_pin(p.PIN_27, Pull::None), // 5: Y wiper
        );
        retropad_decoders::Vectrex::new(
            [
                pulled_up(p.PIN_2), // 1: button 1
                pulled_up(p.PIN_3), // 2: button 2
                pulled_up(p.PIN_4), // 3: button 3
                pulled_up(p.PIN_5), // 4: button 4
            ],
            stick,
        )
    };

    #[cfg(feature = "controller-mac-mouse")]
    let controller = {
        let mut decoder = retropad_decoders::QuadratureDecoder::new([
            pulled_up(p.PIN_2), // 4: H
            pulled_up(p.PIN_3), // 5: HQ
            pulled_up(p.PIN_4), // 8: V
            pulled_up(p.PIN_5), // 9: VQ
            pulled_up(p.PIN_6), // 7: button
        ]);
        // Core 1 does nothing but follow the quadrature lines
        embassy_rp::multicore::spawn_core1(
            p.CORE1,
            CORE1_STACK.init(embassy_rp::multicore::Stack::new()),
            move || loop {
                decoder.sample(&MOUSE);
            },
        );
        retropad_decoders::MacMouse::new(&MOUSE)
    };

    #[cfg(feature = "controller-intellivision")]
    let controller = retropad_decoders::Intellivision::new(
        [
            pulled_up(p.PIN_2), // 9
            pulled_up(p.PIN_3), // 4
            pulled_up(p.PIN_4), // 8
            pulled_up(p.PIN_5), // 1
            pulled_up(p.PIN_6), // 2
            pulled_up(p.PIN_7), // 7
            pulled_up(p.PIN_8), // 6
            pulled_up(p.PIN_9), // 5
        ],
        embassy_rp::gpio::Output::new(p.PIN_10, embassy_rp::gpio::Level::Low), // 3: common
    );

    info!("Controller: {}", variant::NAME);

    // --- USB ---
    let core = defmt::unwrap!(cortex_m::Peripherals::take());
    let clock = SysTickClock::new(core.SYST, embassy_rp::clocks::clk_sys_freq());
    let lines = GpioLines::new(Flex::new(p.PIN_14), Flex::new(p.PIN_15));
    let phy = SoftPhy::new(lines, clock);

    let board = Rp2040Board::new(watchdog);
    let mut scheduler = Scheduler::new(controller, variant::usb_config(), phy, board);
    if let Err(e) = scheduler.start() {
        error!("Controller init failed: {}", e);
    }

    info!("Retropad initialized, waiting for the host...");
    scheduler.run()
}

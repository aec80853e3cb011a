//! padcore firmware - nRF52840 macro pad.
//!
//! Task layout:
//!
//! ```text
//!  button x13 ──┐
//!               ├─ INPUT_CHANNEL ─> router ─ REPORT_CHANNEL ─> hid_writer ─> USB
//!  encoders  ───┘                      │
//!                                      ├─> ST7789 panel
//!                                      └─> flash (profiles)
//! ```
//!
//! Only the router task touches device state; every other task talks to
//! it through a bounded channel.

#![no_std]
#![no_main]

mod storage;
mod ui;
mod usb;

use defmt::{info, unwrap};
use embassy_embedded_hal::adapter::BlockingAsync;
use embassy_executor::Spawner;
use embassy_nrf::gpio::{AnyPin, Level, Output, OutputDrive, Pin};
use embassy_nrf::nvmc::Nvmc;
use embassy_nrf::spim::{self, Spim};
use embassy_nrf::{bind_interrupts, peripherals};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::Delay;
use embedded_hal_bus::spi::ExclusiveDevice;
use padcore::config::{INPUT_QUEUE_DEPTH, NUM_AUX_BUTTONS, NUM_MACRO_KEYS, REPORT_QUEUE_DEPTH};
use padcore::{AuxButton, LogicalInputEvent, ProfileCache, ReportFrame, Router};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use crate::ui::buttons::ButtonEvents;
use crate::ui::display::{Panel, PanelRenderer};
use crate::ui::encoders::EncoderPins;
use crate::ui::{ChannelLink, FirmwareRouter, InputReceiver, InputSender};
use crate::usb::hid_device::{ReportReceiver, UsbDriver};

bind_interrupts!(struct SpiIrqs {
    SPIM3 => spim::InterruptHandler<peripherals::SPI3>;
});

type PanelSpi = ExclusiveDevice<Spim<'static, peripherals::SPI3>, Output<'static>, Delay>;
type PanelDisplay = Panel<PanelSpi, Output<'static>, Output<'static>>;
type Flash = BlockingAsync<Nvmc<'static>>;

const SWITCH_COUNT: usize = NUM_MACRO_KEYS + NUM_AUX_BUTTONS;

static INPUT_CHANNEL: Channel<CriticalSectionRawMutex, LogicalInputEvent, INPUT_QUEUE_DEPTH> =
    Channel::new();
static REPORT_CHANNEL: Channel<CriticalSectionRawMutex, ReportFrame, REPORT_QUEUE_DEPTH> =
    Channel::new();

static DISPLAY_BUF: StaticCell<[u8; 512]> = StaticCell::new();
static BACKLIGHT: StaticCell<Output<'static>> = StaticCell::new();

#[embassy_executor::task]
async fn usb_device(device: embassy_usb::UsbDevice<'static, UsbDriver>) -> ! {
    usb::hid_device::run_usb_device(device).await
}

#[embassy_executor::task]
async fn hid_writer(
    writer: embassy_usb::class::hid::HidWriter<'static, UsbDriver, { padcore::config::REPORT_SIZE }>,
    rx: ReportReceiver,
) -> ! {
    usb::hid_device::hid_writer_task(writer, rx).await
}

#[embassy_executor::task(pool_size = SWITCH_COUNT)]
async fn switch(pin: AnyPin, events: ButtonEvents, tx: InputSender) -> ! {
    ui::buttons::button_task(pin, events, tx).await
}

#[embassy_executor::task]
async fn encoders(pins: [EncoderPins; padcore::config::NUM_ENCODERS], tx: InputSender) -> ! {
    ui::encoders::encoder_task(pins, tx).await
}

#[embassy_executor::task]
async fn router(
    router: FirmwareRouter,
    rx: InputReceiver,
    renderer: PanelRenderer<PanelDisplay>,
    flash: Flash,
) -> ! {
    ui::router_task(router, rx, renderer, flash).await
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let mut config = embassy_nrf::config::Config::default();
    config.hfclk_source = embassy_nrf::config::HfclkSource::ExternalXtal;
    let p = embassy_nrf::init(config);

    info!("padcore firmware starting");

    // USB
    let usb = usb::hid_device::init(p.USBD);
    unwrap!(spawner.spawn(usb_device(usb.device)));
    unwrap!(spawner.spawn(hid_writer(usb.writer, REPORT_CHANNEL.receiver())));

    // Keys and aux buttons
    let tx = INPUT_CHANNEL.sender();
    let key_pins: [AnyPin; NUM_MACRO_KEYS] = [
        p.P0_02.degrade(),
        p.P0_03.degrade(),
        p.P0_04.degrade(),
        p.P0_05.degrade(),
        p.P0_28.degrade(),
        p.P0_29.degrade(),
        p.P0_30.degrade(),
        p.P0_31.degrade(),
        p.P1_01.degrade(),
        p.P1_02.degrade(),
    ];
    for (index, pin) in key_pins.into_iter().enumerate() {
        unwrap!(spawner.spawn(switch(pin, ButtonEvents::macro_key(index as u8), tx)));
    }

    let aux_pins = [
        (p.P0_11.degrade(), AuxButton::MicMute),
        (p.P0_12.degrade(), AuxButton::Prev),
        (p.P0_24.degrade(), AuxButton::Next),
    ];
    for (pin, button) in aux_pins {
        unwrap!(spawner.spawn(switch(pin, ButtonEvents::aux(button), tx)));
    }

    // Encoders
    let encoder_pins = [
        EncoderPins {
            a: p.P1_03.degrade(),
            b: p.P1_04.degrade(),
            switch: p.P1_05.degrade(),
        },
        EncoderPins {
            a: p.P1_06.degrade(),
            b: p.P1_07.degrade(),
            switch: p.P1_08.degrade(),
        },
    ];
    unwrap!(spawner.spawn(encoders(encoder_pins, tx)));

    // Display
    let mut spi_config = spim::Config::default();
    spi_config.frequency = spim::Frequency::M32;
    let spim = Spim::new_txonly(p.SPI3, SpiIrqs, p.P0_19, p.P0_20, spi_config);
    let cs = Output::new(p.P0_21, Level::High, OutputDrive::Standard);
    let dc = Output::new(p.P0_22, Level::Low, OutputDrive::Standard);
    let rst = Output::new(p.P0_23, Level::High, OutputDrive::Standard);
    BACKLIGHT.init(Output::new(p.P0_13, Level::High, OutputDrive::Standard));

    let spi = unwrap!(ExclusiveDevice::new(spim, cs, Delay));
    let panel = unwrap!(ui::display::init(spi, dc, rst, DISPLAY_BUF.init([0u8; 512])));
    let renderer = PanelRenderer::new(panel);

    // Router
    let flash = BlockingAsync::new(Nvmc::new(p.NVMC));
    let router_state = Router::with_defaults(
        ProfileCache::new(),
        ChannelLink::new(REPORT_CHANNEL.sender()),
    );
    unwrap!(spawner.spawn(router(
        router_state,
        INPUT_CHANNEL.receiver(),
        renderer,
        flash
    )));

    info!("All tasks spawned");
}

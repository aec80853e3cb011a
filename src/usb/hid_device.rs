//! USB HID vendor device - 64-byte report frames.
//!
//! Initialises the Embassy USB stack on the nRF52840 hardware USB
//! peripheral and exposes one HID endpoint.

use defmt::{info, warn};
use embassy_nrf::usb::vbus_detect::HardwareVbusDetect;
use embassy_nrf::usb::Driver;
use embassy_nrf::{self, bind_interrupts, peripherals};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Receiver;
use embassy_sync::signal::Signal;
use embassy_usb::class::hid::{Config as HidConfig, HidWriter, State};
use embassy_usb::{Builder, Config, UsbDevice};
use padcore::config::{self, REPORT_QUEUE_DEPTH, REPORT_SIZE};
use padcore::report::REPORT_DESCRIPTOR;
use padcore::ReportFrame;
use static_cell::StaticCell;

bind_interrupts!(struct Irqs {
    USBD => embassy_nrf::usb::InterruptHandler<peripherals::USBD>;
    CLOCK_POWER => embassy_nrf::usb::vbus_detect::InterruptHandler;
});

pub type UsbDriver = Driver<'static, peripherals::USBD, HardwareVbusDetect>;

/// Report frames waiting for the IN endpoint.
pub type ReportReceiver = Receiver<'static, CriticalSectionRawMutex, ReportFrame, REPORT_QUEUE_DEPTH>;

static HID_STATE: StaticCell<State> = StaticCell::new();
static USB_CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_MSOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_CTRL_BUF: StaticCell<[u8; 128]> = StaticCell::new();
static USB_STATE_HANDLER: StaticCell<UsbStateHandler> = StaticCell::new();
static USB_CONFIGURED_SIGNAL: Signal<CriticalSectionRawMutex, bool> = Signal::new();

struct UsbStateHandler;

impl embassy_usb::Handler for UsbStateHandler {
    fn configured(&mut self, configured: bool) {
        USB_CONFIGURED_SIGNAL.signal(configured);
    }

    fn suspended(&mut self, suspended: bool) {
        if suspended {
            USB_CONFIGURED_SIGNAL.signal(false);
        }
    }
}

/// Host link up/down signal.
///
/// Emits `true` once the host has configured the device and `false`
/// when it deconfigures or suspends the bus.
pub fn link_signal() -> &'static Signal<CriticalSectionRawMutex, bool> {
    &USB_CONFIGURED_SIGNAL
}

/// Build result containing the USB device runner and the report writer.
pub struct UsbHidDevice {
    pub device: UsbDevice<'static, UsbDriver>,
    pub writer: HidWriter<'static, UsbDriver, REPORT_SIZE>,
}

/// Initialise the USB stack and create the HID device.
///
/// Must be called exactly once.  All static buffers are consumed here.
pub fn init(usbd: peripherals::USBD) -> UsbHidDevice {
    let driver = Driver::new(usbd, Irqs, HardwareVbusDetect::new(Irqs));

    let mut usb_config = Config::new(config::USB_VID, config::USB_PID);
    usb_config.manufacturer = Some(config::USB_MANUFACTURER);
    usb_config.product = Some(config::USB_PRODUCT);
    usb_config.serial_number = Some(config::USB_SERIAL_NUMBER);
    usb_config.max_power = 100; // mA
    usb_config.max_packet_size_0 = 64;

    let config_desc = USB_CONFIG_DESC.init([0u8; 256]);
    let bos_desc = USB_BOS_DESC.init([0u8; 256]);
    let msos_desc = USB_MSOS_DESC.init([0u8; 256]);
    let ctrl_buf = USB_CTRL_BUF.init([0u8; 128]);

    let mut builder = Builder::new(
        driver,
        usb_config,
        config_desc,
        bos_desc,
        msos_desc,
        ctrl_buf,
    );

    let handler = USB_STATE_HANDLER.init(UsbStateHandler);
    builder.handler(handler);

    let state = HID_STATE.init(State::new());
    let hid_config = HidConfig {
        report_descriptor: REPORT_DESCRIPTOR,
        request_handler: None,
        poll_ms: config::USB_HID_POLL_MS,
        max_packet_size: REPORT_SIZE as u16,
    };
    let writer = HidWriter::new(&mut builder, state, hid_config);

    let device = builder.build();

    info!("USB HID device initialised ({}-byte reports)", REPORT_SIZE);

    UsbHidDevice { device, writer }
}

/// Run the USB device stack - must be spawned as a dedicated Embassy task.
pub async fn run_usb_device(mut device: UsbDevice<'static, UsbDriver>) -> ! {
    info!("USB device task started");
    device.run().await
}

/// Report forwarding task - writes every queued frame to the IN endpoint.
///
/// Frames are written whole; the report ID is already byte 0.
pub async fn hid_writer_task(
    mut writer: HidWriter<'static, UsbDriver, REPORT_SIZE>,
    report_rx: ReportReceiver,
) -> ! {
    info!("HID writer task started - waiting for reports");

    loop {
        let frame = report_rx.receive().await;
        if let Err(_e) = writer.write(&frame).await {
            warn!("USB report write failed (kind 0x{:02x})", frame[1]);
        }
    }
}

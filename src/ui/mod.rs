//! User interface subsystem - ST7789 panel, keys, buttons and encoders.
//!
//! Input tasks turn GPIO activity into `LogicalInputEvent`s and push
//! them into one channel. The router task is the only consumer: it owns
//! the `Router`, redraws the panel and syncs profiles to flash.
//!
//! ## Components
//!
//! - **Display**: ST7789 172×320 IPS panel via SPI (`mipidsi`)
//! - **Buttons**: 10 macro keys + 3 aux buttons, async edge debouncing
//! - **Encoders**: 2 quadrature encoders with push switches, polled

pub mod buttons;
pub mod display;
pub mod encoders;

use defmt::{info, warn};
use embassy_futures::select::{select3, Either3};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Receiver, Sender};
use embassy_time::{Duration, Instant, Ticker};
use embedded_storage_async::nor_flash::NorFlash;
use padcore::config::{
    INPUT_QUEUE_DEPTH, REPORT_QUEUE_DEPTH, STORAGE_SAVE_DEBOUNCE_MS, TICK_PERIOD_MS,
};
use padcore::{
    HostLink, LinkError, LogicalInputEvent, ProfileCache, Renderer, ReportFrame, Router,
};

use crate::storage;
use crate::usb::hid_device::link_signal;

pub type InputSender = Sender<'static, CriticalSectionRawMutex, LogicalInputEvent, INPUT_QUEUE_DEPTH>;
pub type InputReceiver =
    Receiver<'static, CriticalSectionRawMutex, LogicalInputEvent, INPUT_QUEUE_DEPTH>;
pub type ReportSender = Sender<'static, CriticalSectionRawMutex, ReportFrame, REPORT_QUEUE_DEPTH>;

/// Host link backed by the USB writer's channel.
///
/// A full channel refuses the new frame; the router never waits on USB.
pub struct ChannelLink {
    tx: ReportSender,
    connected: bool,
}

impl ChannelLink {
    pub const fn new(tx: ReportSender) -> Self {
        Self {
            tx,
            connected: false,
        }
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

impl HostLink for ChannelLink {
    fn enqueue(&mut self, frame: ReportFrame) -> Result<(), LinkError> {
        if !self.connected {
            return Err(LinkError::Disconnected);
        }
        self.tx.try_send(frame).map_err(|_| LinkError::QueueFull)
    }
}

pub type FirmwareRouter = Router<ProfileCache, ChannelLink>;

fn now_ms() -> u64 {
    Instant::now().as_millis()
}

/// Boot the router and run it forever.
///
/// Order of work per wakeup: one input event, or one housekeeping tick,
/// or a host link state change. Dirty profiles are flushed once no
/// profile change has happened for `STORAGE_SAVE_DEBOUNCE_MS`.
pub async fn router_task<R, F>(
    mut router: FirmwareRouter,
    input_rx: InputReceiver,
    mut renderer: R,
    mut flash: F,
) -> !
where
    R: Renderer,
    F: NorFlash,
{
    storage::load_profiles(router.profiles_mut(), &mut flash).await;
    let boot = now_ms();
    if let Some(fault) = router.restore_current_profile(boot) {
        warn!("Boot profile restore: {}", defmt::Display2Format(&fault));
    }
    router.note(boot, "Firmware Started");
    renderer.show_screen(router.current_screen(), router.view());
    info!(
        "Router task started - profile {}",
        router.state().current_profile()
    );

    let mut ticker = Ticker::every(Duration::from_millis(TICK_PERIOD_MS));
    let mut save_due: Option<u64> = None;

    loop {
        match select3(input_rx.receive(), ticker.next(), link_signal().wait()).await {
            Either3::First(event) => {
                // Rejections, link and store faults are logged by the router.
                let outcome = router.dispatch(event, now_ms());
                router.present(&outcome, &mut renderer);

                let changed = !outcome.changes.is_empty();
                if router.profiles().is_dirty() && (changed || save_due.is_none()) {
                    save_due = Some(now_ms().saturating_add(STORAGE_SAVE_DEBOUNCE_MS));
                }
            }
            Either3::Second(()) => {
                let now = now_ms();
                let tick = router.tick(now);
                router.present_tick(&tick, &mut renderer);

                if save_due.is_some_and(|due| now >= due) {
                    storage::flush_profiles(router.profiles_mut(), &mut flash).await;
                    save_due = None;
                }
            }
            Either3::Third(connected) => {
                info!("Host link {}", if connected { "up" } else { "down" });
                router.link_mut().set_connected(connected);
            }
        }
    }
}

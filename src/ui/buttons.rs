//! GPIO key and button input with async debouncing.
//!
//! Thirteen physical switches (active-low with internal pull-up):
//!   - 10 macro keys
//!   - MIC / PREV / NEXT aux buttons
//!
//! Each switch is handled by an async task that waits for a GPIO edge,
//! debounces it, and sends the matching press and release events to the
//! router channel. Encoder push switches are polled with the encoders.

use crate::ui::InputSender;
use defmt::debug;
use embassy_nrf::gpio::{AnyPin, Input, Pull};
use embassy_time::{Duration, Timer};
use padcore::config::BUTTON_DEBOUNCE_MS;
use padcore::LogicalInputEvent;

/// Press/release pair emitted by one switch.
#[derive(Clone, Copy)]
pub struct ButtonEvents {
    pub press: LogicalInputEvent,
    pub release: LogicalInputEvent,
}

impl ButtonEvents {
    pub const fn macro_key(index: u8) -> Self {
        Self {
            press: LogicalInputEvent::key_pressed(index),
            release: LogicalInputEvent::key_released(index),
        }
    }

    pub const fn aux(button: padcore::AuxButton) -> Self {
        Self {
            press: LogicalInputEvent::aux_pressed(button),
            release: LogicalInputEvent::aux_released(button),
        }
    }
}

/// Run a single switch loop.
///
/// Waits for the pin to go low (pressed), debounces, sends the press,
/// then waits for a debounced release and sends that too.
pub async fn button_task(pin: AnyPin, events: ButtonEvents, tx: InputSender) -> ! {
    let mut btn = Input::new(pin, Pull::Up);
    let debounce = Duration::from_millis(BUTTON_DEBOUNCE_MS);

    loop {
        // Wait for falling edge (press, active-low).
        btn.wait_for_falling_edge().await;
        Timer::after(debounce).await;

        if btn.is_low() {
            debug!("Switch: {}", events.press);
            tx.send(events.press).await;

            // Release is reported once the pin has settled high again.
            loop {
                btn.wait_for_rising_edge().await;
                Timer::after(debounce).await;
                if btn.is_high() {
                    break;
                }
            }
            tx.send(events.release).await;
        }
    }
}

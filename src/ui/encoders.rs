//! Rotary encoder sampling.
//!
//! Both encoders are polled from one task every `ENCODER_POLL_MS`. The
//! A/B levels go through `QuadratureDecoder`, the push switch through a
//! poll-count `Debouncer`. Detents and switch edges become logical events.

use crate::ui::InputSender;
use defmt::{info, warn};
use embassy_nrf::gpio::{AnyPin, Input, Pull};
use embassy_time::{Duration, Ticker};
use padcore::config::{BUTTON_DEBOUNCE_MS, ENCODER_POLL_MS, NUM_ENCODERS};
use padcore::quadrature::{Debouncer, QuadratureDecoder};
use padcore::{Edge, LogicalInputEvent};

/// Pins of one encoder.
pub struct EncoderPins {
    pub a: AnyPin,
    pub b: AnyPin,
    pub switch: AnyPin,
}

struct EncoderInput {
    a: Input<'static>,
    b: Input<'static>,
    switch: Input<'static>,
    decoder: QuadratureDecoder,
    button: Debouncer,
}

impl EncoderInput {
    fn new(pins: EncoderPins) -> Self {
        let a = Input::new(pins.a, Pull::Up);
        let b = Input::new(pins.b, Pull::Up);
        let switch = Input::new(pins.switch, Pull::Up);
        let decoder = QuadratureDecoder::new(a.is_high(), b.is_high());
        let button = Debouncer::new(switch.is_low(), DEBOUNCE_SAMPLES);
        Self {
            a,
            b,
            switch,
            decoder,
            button,
        }
    }
}

const DEBOUNCE_SAMPLES: u8 = {
    let samples = BUTTON_DEBOUNCE_MS / ENCODER_POLL_MS;
    if samples > u8::MAX as u64 {
        u8::MAX
    } else {
        samples as u8
    }
};

fn emit(tx: &InputSender, event: LogicalInputEvent) {
    if tx.try_send(event).is_err() {
        warn!("Input channel full - dropped {}", event);
    }
}

/// Poll both encoders forever.
///
/// Sends are non-blocking so a busy router never stalls sampling.
pub async fn encoder_task(pins: [EncoderPins; NUM_ENCODERS], tx: InputSender) -> ! {
    let mut encoders = pins.map(EncoderInput::new);
    let mut ticker = Ticker::every(Duration::from_millis(ENCODER_POLL_MS));

    info!("Encoder task started ({} ms poll)", ENCODER_POLL_MS);

    loop {
        ticker.next().await;

        for (id, enc) in encoders.iter_mut().enumerate() {
            let id = id as u8;

            if let Some(direction) = enc.decoder.update(enc.a.is_high(), enc.b.is_high()) {
                emit(&tx, LogicalInputEvent::rotate(id, direction));
            }

            match enc.button.update(enc.switch.is_low()) {
                Some(Edge::Pressed) => emit(&tx, LogicalInputEvent::encoder_pressed(id)),
                Some(Edge::Released) => emit(&tx, LogicalInputEvent::encoder_released(id)),
                None => {}
            }
        }
    }
}

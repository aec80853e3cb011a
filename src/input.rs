//! Logical input events.
//!
//! The hardware layer (GPIO debounce, quadrature decoding) turns electrical
//! transitions into these clean, edge-triggered events. Indices are carried
//! as raw `u8` so the router can reject values that break the driver
//! contract instead of trusting them.

/// Press/release edge of a key or button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    Pressed,
    Released,
}

impl Edge {
    pub const fn is_pressed(self) -> bool {
        matches!(self, Edge::Pressed)
    }
}

/// One encoder detent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Clockwise, +1.
    Cw,
    /// Counter-clockwise, -1.
    Ccw,
}

impl Direction {
    pub const fn delta(self) -> i8 {
        match self {
            Direction::Cw => 1,
            Direction::Ccw => -1,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Direction::Cw => "CW",
            Direction::Ccw => "CCW",
        }
    }
}

/// Auxiliary tact buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AuxButton {
    /// Button 1 - global mic mute toggle.
    MicMute,
    /// Button 2 - previous profile / back.
    Prev,
    /// Button 3 - next profile / forward.
    Next,
}

impl AuxButton {
    pub const fn label(self) -> &'static str {
        match self {
            AuxButton::MicMute => "Mic",
            AuxButton::Prev => "Prev",
            AuxButton::Next => "Next",
        }
    }
}

/// A debounced user action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LogicalInputEvent {
    MacroKey { index: u8, edge: Edge },
    EncoderRotate { encoder: u8, direction: Direction },
    EncoderPress { encoder: u8, edge: Edge },
    Aux { button: AuxButton, edge: Edge },
}

impl LogicalInputEvent {
    pub const fn key_pressed(index: u8) -> Self {
        LogicalInputEvent::MacroKey {
            index,
            edge: Edge::Pressed,
        }
    }

    pub const fn key_released(index: u8) -> Self {
        LogicalInputEvent::MacroKey {
            index,
            edge: Edge::Released,
        }
    }

    pub const fn rotate(encoder: u8, direction: Direction) -> Self {
        LogicalInputEvent::EncoderRotate { encoder, direction }
    }

    pub const fn encoder_pressed(encoder: u8) -> Self {
        LogicalInputEvent::EncoderPress {
            encoder,
            edge: Edge::Pressed,
        }
    }

    pub const fn encoder_released(encoder: u8) -> Self {
        LogicalInputEvent::EncoderPress {
            encoder,
            edge: Edge::Released,
        }
    }

    pub const fn aux_pressed(button: AuxButton) -> Self {
        LogicalInputEvent::Aux {
            button,
            edge: Edge::Pressed,
        }
    }

    pub const fn aux_released(button: AuxButton) -> Self {
        LogicalInputEvent::Aux {
            button,
            edge: Edge::Released,
        }
    }
}

/// Polled input source.
///
/// Implementations guarantee at most one logical event per physical
/// transition.
pub trait InputProvider {
    type Error;

    fn poll_event(&mut self) -> Result<Option<LogicalInputEvent>, Self::Error>;
}

/// Replays a fixed event list; used by tests and the simulator's
/// scripted mode.
pub struct ScriptedInput<'a> {
    events: &'a [LogicalInputEvent],
    cursor: usize,
}

impl<'a> ScriptedInput<'a> {
    pub const fn new(events: &'a [LogicalInputEvent]) -> Self {
        Self { events, cursor: 0 }
    }
}

impl InputProvider for ScriptedInput<'_> {
    type Error = core::convert::Infallible;

    fn poll_event(&mut self) -> Result<Option<LogicalInputEvent>, Self::Error> {
        let Some(event) = self.events.get(self.cursor).copied() else {
            return Ok(None);
        };
        self.cursor = self.cursor.saturating_add(1);
        Ok(Some(event))
    }
}

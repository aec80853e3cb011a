//! Keyboard mapping for the host simulator.
//!
//! ```text
//! 1-9, 0      macro keys 0..8, 9
//! Up / Down   encoder 1 CW / CCW
//! Left/Right  encoder 2 CW / CCW
//! Enter/Space encoder 1 press
//! , / .       encoder 2 press
//! m           mic mute
//! [ / ]       prev / next
//! F1 F2 F3    menu: Macros, Encoders, RGB
//! q / Esc     quit
//! ```
//!
//! Terminal-agnostic on purpose: the simulator binary converts its
//! backend's key codes into `SimKey` first.

use crate::input::{AuxButton, Direction, LogicalInputEvent};
use crate::navigation::MenuTarget;

/// A key as seen by the simulator, independent of the terminal backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimKey {
    Char(char),
    Up,
    Down,
    Left,
    Right,
    Enter,
    Esc,
    /// Function key `F(n)`.
    F(u8),
}

/// What a simulator key does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Input(LogicalInputEvent),
    Menu(MenuTarget),
    Quit,
}

/// Translate a key press. Keys with no binding return `None`.
pub fn map_key(key: SimKey) -> Option<KeyAction> {
    let action = match key {
        SimKey::Char(c @ '1'..='9') => {
            KeyAction::Input(LogicalInputEvent::key_pressed(c as u8 - b'1'))
        }
        SimKey::Char('0') => KeyAction::Input(LogicalInputEvent::key_pressed(9)),
        SimKey::Up => KeyAction::Input(LogicalInputEvent::rotate(0, Direction::Cw)),
        SimKey::Down => KeyAction::Input(LogicalInputEvent::rotate(0, Direction::Ccw)),
        SimKey::Left => KeyAction::Input(LogicalInputEvent::rotate(1, Direction::Cw)),
        SimKey::Right => KeyAction::Input(LogicalInputEvent::rotate(1, Direction::Ccw)),
        SimKey::Enter | SimKey::Char(' ') => {
            KeyAction::Input(LogicalInputEvent::encoder_pressed(0))
        }
        SimKey::Char(',') | SimKey::Char('.') => {
            KeyAction::Input(LogicalInputEvent::encoder_pressed(1))
        }
        SimKey::Char('m') | SimKey::Char('M') => {
            KeyAction::Input(LogicalInputEvent::aux_pressed(AuxButton::MicMute))
        }
        SimKey::Char('[') => KeyAction::Input(LogicalInputEvent::aux_pressed(AuxButton::Prev)),
        SimKey::Char(']') => KeyAction::Input(LogicalInputEvent::aux_pressed(AuxButton::Next)),
        SimKey::F(1) => KeyAction::Menu(MenuTarget::Macros),
        SimKey::F(2) => KeyAction::Menu(MenuTarget::Encoders),
        SimKey::F(3) => KeyAction::Menu(MenuTarget::Rgb),
        SimKey::Esc | SimKey::Char('q') => KeyAction::Quit,
        _ => return None,
    };
    Some(action)
}

/// The release that follows a mapped press, for inputs whose release the
/// host cares about (macro keys). Terminals only deliver presses.
pub fn release_for(event: LogicalInputEvent) -> Option<LogicalInputEvent> {
    match event {
        LogicalInputEvent::MacroKey { index, .. } => Some(LogicalInputEvent::key_released(index)),
        _ => None,
    }
}

//! Screen navigation state machine.
//!
//! The routed screen is a tagged union carrying its own staged data
//! (pending profile, highlighted modes, RGB staging), so every
//! (screen, event) pair is an exhaustive `match` in the router.
//!
//! The quick overlay is not a screen of its own: it is layered above the
//! routed screen and reverts on the periodic tick once its deadline passes.
//! While it is up, `current_screen()` reports `Overlay` and
//! `previous_screen()` reports the screen underneath.

use heapless::String;

use crate::config::{
    NUM_ENCODERS, NUM_MACRO_KEYS, OVERLAY_MESSAGE_LEN, PROFILE_MAX, PROFILE_MIN,
};
use crate::state::{AccentColor, DeviceState, EncoderMode, Theme};

/// Screen identities as seen by the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScreenId {
    Home,
    Profiles,
    Macros,
    Encoders,
    Rgb,
    Overlay,
}

impl ScreenId {
    pub const fn label(self) -> &'static str {
        match self {
            ScreenId::Home => "Home",
            ScreenId::Profiles => "Profiles",
            ScreenId::Macros => "Macros",
            ScreenId::Encoders => "Encoders",
            ScreenId::Rgb => "RGB",
            ScreenId::Overlay => "Overlay",
        }
    }
}

/// Entries of the Home menu. The menu itself is drawn and driven by the
/// UI layer; the core only accepts the chosen target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MenuTarget {
    Macros,
    Encoders,
    Rgb,
}

/// Rows of the RGB / theme screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RgbRow {
    Theme,
    Accent,
    Brightness,
}

impl RgbRow {
    const ALL: [RgbRow; 3] = [RgbRow::Theme, RgbRow::Accent, RgbRow::Brightness];

    /// Move the row cursor, stopping at the first and last rows.
    pub fn step(self, delta: i8) -> Self {
        let index = step_clamped(self as u8, delta, 0, (Self::ALL.len() - 1) as u8);
        Self::ALL[index as usize]
    }
}

/// Theme values edited on the RGB screen before they are applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RgbStaging {
    pub theme: Theme,
    pub accent: AccentColor,
    pub brightness: u8,
}

impl RgbStaging {
    pub fn from_state(state: &DeviceState) -> Self {
        Self {
            theme: state.theme(),
            accent: state.accent(),
            brightness: state.brightness(),
        }
    }
}

/// The routed screen and the data it stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScreenState {
    Home,
    /// Profile picker; `pending` is a preview until confirmed.
    Profiles { pending: u8 },
    /// Key grid; `cursor` is the list cursor moved by encoder 1.
    Macros { cursor: u8 },
    /// Mode picker; one highlighted mode per encoder slot.
    Encoders { highlighted: [EncoderMode; NUM_ENCODERS] },
    Rgb { row: RgbRow, staged: RgbStaging },
}

impl ScreenState {
    pub const fn id(&self) -> ScreenId {
        match self {
            ScreenState::Home => ScreenId::Home,
            ScreenState::Profiles { .. } => ScreenId::Profiles,
            ScreenState::Macros { .. } => ScreenId::Macros,
            ScreenState::Encoders { .. } => ScreenId::Encoders,
            ScreenState::Rgb { .. } => ScreenId::Rgb,
        }
    }

    /// Fresh state for entering `target`, seeded from the device record.
    pub fn enter(target: MenuTarget, state: &DeviceState) -> Self {
        match target {
            MenuTarget::Macros => ScreenState::Macros { cursor: 0 },
            MenuTarget::Encoders => ScreenState::Encoders {
                highlighted: state.encoder_modes(),
            },
            MenuTarget::Rgb => ScreenState::Rgb {
                row: RgbRow::Theme,
                staged: RgbStaging::from_state(state),
            },
        }
    }

    pub fn profiles(state: &DeviceState) -> Self {
        ScreenState::Profiles {
            pending: state.current_profile(),
        }
    }
}

/// A screen-to-screen move (overlays are reported separately).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transition {
    pub from: ScreenId,
    pub to: ScreenId,
}

/// Timed notification layered above the routed screen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Overlay {
    pub message: String<OVERLAY_MESSAGE_LEN>,
    pub deadline_ms: u64,
}

/// Navigation record: routed screen, back target and the live overlay.
#[derive(Clone, Debug)]
pub struct Navigation {
    screen: ScreenState,
    back: ScreenId,
    overlay: Option<Overlay>,
}

impl Default for Navigation {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigation {
    pub const fn new() -> Self {
        Self {
            screen: ScreenState::Home,
            back: ScreenId::Home,
            overlay: None,
        }
    }

    /// What the display shows right now.
    pub fn current_screen(&self) -> ScreenId {
        if self.overlay.is_some() {
            ScreenId::Overlay
        } else {
            self.screen.id()
        }
    }

    /// Overlay return target while an overlay is up; otherwise the screen
    /// navigated away from most recently.
    pub fn previous_screen(&self) -> ScreenId {
        if self.overlay.is_some() {
            self.screen.id()
        } else {
            self.back
        }
    }

    /// The screen input is interpreted against (ignores the overlay).
    pub fn screen(&self) -> &ScreenState {
        &self.screen
    }

    pub(crate) fn screen_mut(&mut self) -> &mut ScreenState {
        &mut self.screen
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    pub fn overlay_message(&self) -> Option<&str> {
        self.overlay.as_ref().map(|o| o.message.as_str())
    }

    pub fn overlay_deadline(&self) -> Option<u64> {
        self.overlay.as_ref().map(|o| o.deadline_ms)
    }

    /// Replace the routed screen. A live overlay stays up and will revert
    /// to the new screen.
    pub(crate) fn go(&mut self, next: ScreenState) -> Option<Transition> {
        let from = self.screen.id();
        let to = next.id();
        self.screen = next;
        if from == to {
            return None;
        }
        self.back = from;
        Some(Transition { from, to })
    }

    /// Show (or replace) the overlay. Never stacks: the newest message and
    /// deadline win.
    pub(crate) fn show_overlay(&mut self, message: &str, deadline_ms: u64) -> &Overlay {
        self.overlay.insert(Overlay {
            message: truncated(message),
            deadline_ms,
        })
    }

    /// Drop the overlay once its deadline is reached. Returns the screen
    /// that is visible again.
    pub(crate) fn expire_overlay(&mut self, now_ms: u64) -> Option<ScreenId> {
        let due = self
            .overlay
            .as_ref()
            .is_some_and(|o| now_ms >= o.deadline_ms);
        if !due {
            return None;
        }
        self.overlay = None;
        Some(self.screen.id())
    }
}

/// Move `value` by `delta`, saturating at `min..=max`.
pub fn step_clamped(value: u8, delta: i8, min: u8, max: u8) -> u8 {
    (value as i16 + delta as i16).clamp(min as i16, max as i16) as u8
}

/// Step the pending profile cursor.
pub fn step_profile_cursor(pending: u8, delta: i8) -> u8 {
    step_clamped(pending, delta, PROFILE_MIN, PROFILE_MAX)
}

/// Step the Macros key cursor.
pub fn step_key_cursor(cursor: u8, delta: i8) -> u8 {
    step_clamped(cursor, delta, 0, (NUM_MACRO_KEYS - 1) as u8)
}

fn truncated<const N: usize>(text: &str) -> String<N> {
    let mut out = String::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_on_home_without_overlay() {
        let nav = Navigation::new();
        assert_eq!(nav.current_screen(), ScreenId::Home);
        assert_eq!(nav.previous_screen(), ScreenId::Home);
        assert!(nav.overlay_message().is_none());
        assert!(nav.overlay_deadline().is_none());
    }

    #[test]
    fn go_records_back_target() {
        let mut nav = Navigation::new();
        let t = nav.go(ScreenState::Profiles { pending: 1 });
        assert_eq!(
            t,
            Some(Transition {
                from: ScreenId::Home,
                to: ScreenId::Profiles
            })
        );
        assert_eq!(nav.current_screen(), ScreenId::Profiles);
        assert_eq!(nav.previous_screen(), ScreenId::Home);
    }

    #[test]
    fn go_to_same_screen_is_not_a_transition() {
        let mut nav = Navigation::new();
        nav.go(ScreenState::Macros { cursor: 0 });
        assert_eq!(nav.go(ScreenState::Macros { cursor: 4 }), None);
        assert_eq!(nav.screen(), &ScreenState::Macros { cursor: 4 });
    }

    #[test]
    fn overlay_layers_above_routed_screen() {
        let mut nav = Navigation::new();
        nav.go(ScreenState::Macros { cursor: 0 });
        nav.show_overlay("Mic: MUTED", 1_500);

        assert_eq!(nav.current_screen(), ScreenId::Overlay);
        assert_eq!(nav.previous_screen(), ScreenId::Macros);
        assert_eq!(nav.screen().id(), ScreenId::Macros);
    }

    #[test]
    fn overlay_replaces_instead_of_stacking() {
        let mut nav = Navigation::new();
        nav.show_overlay("Mic: MUTED", 1_000);
        nav.show_overlay("Profile 2", 2_000);

        assert_eq!(nav.overlay_message(), Some("Profile 2"));
        assert_eq!(nav.overlay_deadline(), Some(2_000));
        assert_eq!(nav.expire_overlay(1_500), None);
        assert_eq!(nav.expire_overlay(2_000), Some(ScreenId::Home));
        assert_eq!(nav.current_screen(), ScreenId::Home);
    }

    #[test]
    fn navigation_under_overlay_retargets_revert() {
        let mut nav = Navigation::new();
        nav.show_overlay("Profile 3", 1_000);
        nav.go(ScreenState::Profiles { pending: 3 });

        assert_eq!(nav.current_screen(), ScreenId::Overlay);
        assert_eq!(nav.previous_screen(), ScreenId::Profiles);
        assert_eq!(nav.expire_overlay(1_000), Some(ScreenId::Profiles));
        assert_eq!(nav.previous_screen(), ScreenId::Home);
    }

    #[test]
    fn long_overlay_message_is_truncated() {
        let mut nav = Navigation::new();
        let overlay = nav.show_overlay("a message far longer than the overlay box", 10);
        assert_eq!(overlay.message.len(), OVERLAY_MESSAGE_LEN);
    }

    #[test]
    fn cursor_helpers_saturate() {
        assert_eq!(step_profile_cursor(1, -1), 1);
        assert_eq!(step_profile_cursor(8, 1), 8);
        assert_eq!(step_profile_cursor(4, 1), 5);
        assert_eq!(step_key_cursor(0, -1), 0);
        assert_eq!(step_key_cursor(9, 1), 9);
        assert_eq!(RgbRow::Theme.step(-1), RgbRow::Theme);
        assert_eq!(RgbRow::Theme.step(1), RgbRow::Accent);
        assert_eq!(RgbRow::Brightness.step(1), RgbRow::Brightness);
    }
}

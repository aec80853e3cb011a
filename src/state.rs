//! Device state store.
//!
//! `DeviceState` is the single authoritative record of profile, mic mute,
//! encoder bindings, per-key configuration and display values. The store
//! hands out read-only access to everyone and keeps every mutator
//! crate-private, so only the router can change it.
//!
//! Bounded fields saturate: percentages at `0..=100`, the profile at
//! `PROFILE_MIN..=PROFILE_MAX`. Writes outside a range are clamped, never
//! rejected and never wrapped.

use core::fmt::Write;

use heapless::String;

use crate::config::{
    KEY_LABEL_LEN, NUM_ENCODERS, NUM_MACRO_KEYS, PERCENT_MAX, PROFILE_MAX, PROFILE_MIN,
};

/// What an encoder controls on the Home screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncoderMode {
    Volume,
    Mic,
    Timeline,
    Zoom,
    Scroll,
}

impl EncoderMode {
    pub const ALL: [EncoderMode; 5] = [
        EncoderMode::Volume,
        EncoderMode::Mic,
        EncoderMode::Timeline,
        EncoderMode::Zoom,
        EncoderMode::Scroll,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Step through the five modes, wrapping at both ends.
    pub fn cycle(self, delta: i8) -> Self {
        let len = Self::ALL.len() as i16;
        let next = (self.index() as i16 + delta as i16).rem_euclid(len);
        Self::ALL[next as usize]
    }

    pub const fn label(self) -> &'static str {
        match self {
            EncoderMode::Volume => "Volume",
            EncoderMode::Mic => "Mic",
            EncoderMode::Timeline => "Timeline",
            EncoderMode::Zoom => "Zoom",
            EncoderMode::Scroll => "Scroll",
        }
    }

    pub fn from_u8(raw: u8) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub const fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Theme::Dark => "Dark",
            Theme::Light => "Light",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AccentColor {
    Blue,
    Cyan,
    Green,
    Orange,
    Red,
}

impl AccentColor {
    pub const ALL: [AccentColor; 5] = [
        AccentColor::Blue,
        AccentColor::Cyan,
        AccentColor::Green,
        AccentColor::Orange,
        AccentColor::Red,
    ];

    pub fn cycle(self, delta: i8) -> Self {
        let len = Self::ALL.len() as i16;
        let next = (self as i16 + delta as i16).rem_euclid(len);
        Self::ALL[next as usize]
    }

    pub const fn label(self) -> &'static str {
        match self {
            AccentColor::Blue => "Blue",
            AccentColor::Cyan => "Cyan",
            AccentColor::Green => "Green",
            AccentColor::Orange => "Orange",
            AccentColor::Red => "Red",
        }
    }

    pub const fn rgb(self) -> LedColor {
        match self {
            AccentColor::Blue => LedColor::new(0x21, 0x96, 0xF3),
            AccentColor::Cyan => LedColor::new(0x00, 0xBC, 0xD4),
            AccentColor::Green => LedColor::new(0x4C, 0xAF, 0x50),
            AccentColor::Orange => LedColor::new(0xFF, 0x98, 0x00),
            AccentColor::Red => LedColor::new(0xF4, 0x43, 0x36),
        }
    }
}

/// 24-bit key LED colour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LedColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl LedColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn to_u32(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }
}

/// Per-key assignment for the active profile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeySlot {
    pub macro_id: u8,
    pub label: String<KEY_LABEL_LEN>,
    pub color: LedColor,
}

impl KeySlot {
    fn default_for(index: usize) -> Self {
        let mut label = String::new();
        let _ = write!(label, "M{}", index + 1);
        Self {
            macro_id: index as u8,
            label,
            color: AccentColor::Blue.rgb(),
        }
    }
}

/// Profile-scoped part of the device state, as stored per profile slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileSnapshot {
    pub keys: [KeySlot; NUM_MACRO_KEYS],
    pub encoder_mode: [EncoderMode; NUM_ENCODERS],
}

/// The authoritative device record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceState {
    current_profile: u8,
    mic_muted: bool,
    encoder_mode: [EncoderMode; NUM_ENCODERS],
    keys: [KeySlot; NUM_MACRO_KEYS],
    volume: u8,
    mic_level: u8,
    brightness: u8,
    theme: Theme,
    accent: AccentColor,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            current_profile: PROFILE_MIN,
            mic_muted: false,
            encoder_mode: [EncoderMode::Volume, EncoderMode::Mic],
            keys: core::array::from_fn(KeySlot::default_for),
            volume: 70,
            mic_level: 45,
            brightness: 100,
            theme: Theme::Dark,
            accent: AccentColor::Blue,
        }
    }
}

impl DeviceState {
    pub fn current_profile(&self) -> u8 {
        self.current_profile
    }

    pub fn mic_muted(&self) -> bool {
        self.mic_muted
    }

    pub fn encoder_mode(&self, slot: usize) -> EncoderMode {
        self.encoder_mode[slot]
    }

    pub fn encoder_modes(&self) -> [EncoderMode; NUM_ENCODERS] {
        self.encoder_mode
    }

    pub fn key(&self, index: usize) -> &KeySlot {
        &self.keys[index]
    }

    pub fn keys(&self) -> &[KeySlot; NUM_MACRO_KEYS] {
        &self.keys
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn mic_level(&self) -> u8 {
        self.mic_level
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn accent(&self) -> AccentColor {
        self.accent
    }

    /// Profile-scoped fields, for persistence.
    pub fn profile_snapshot(&self) -> ProfileSnapshot {
        ProfileSnapshot {
            keys: self.keys.clone(),
            encoder_mode: self.encoder_mode,
        }
    }

    /// Check every documented range. Holds at every observation point.
    pub fn in_bounds(&self) -> bool {
        (PROFILE_MIN..=PROFILE_MAX).contains(&self.current_profile)
            && self.volume <= PERCENT_MAX
            && self.mic_level <= PERCENT_MAX
            && self.brightness <= PERCENT_MAX
    }
}

/// A single field-level change, reported back in the router outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StateChange {
    Profile(u8),
    MicMuted(bool),
    EncoderMode { slot: u8, mode: EncoderMode },
    Volume(u8),
    MicLevel(u8),
    Brightness(u8),
    Theme(Theme),
    Accent(AccentColor),
    ProfileLoaded(u8),
}

/// Owner of the device record.
///
/// Reads are public; writes are `pub(crate)` so only the router mutates.
pub struct DeviceStore {
    state: DeviceState,
}

impl Default for DeviceStore {
    fn default() -> Self {
        Self::new(DeviceState::default())
    }
}

impl DeviceStore {
    pub fn new(initial: DeviceState) -> Self {
        let mut store = Self { state: initial };
        // Seeded values go through the same clamps as live writes.
        store.state.current_profile = clamp_profile(store.state.current_profile as i16);
        store.state.volume = clamp_percent(store.state.volume as i16);
        store.state.mic_level = clamp_percent(store.state.mic_level as i16);
        store.state.brightness = clamp_percent(store.state.brightness as i16);
        store
    }

    /// Read-only view of the current record.
    pub fn get(&self) -> &DeviceState {
        &self.state
    }

    /// Owned copy of the current record.
    pub fn snapshot(&self) -> DeviceState {
        self.state.clone()
    }

    /// Move the profile by `delta`, saturating at the bounds.
    /// Returns the new value when it changed.
    pub(crate) fn step_profile(&mut self, delta: i8) -> Option<u8> {
        let next = clamp_profile(self.state.current_profile as i16 + delta as i16);
        self.set_profile(next)
    }

    pub(crate) fn set_profile(&mut self, profile: u8) -> Option<u8> {
        let next = clamp_profile(profile as i16);
        if next == self.state.current_profile {
            return None;
        }
        self.state.current_profile = next;
        self.check();
        Some(next)
    }

    pub(crate) fn toggle_mic(&mut self) -> bool {
        self.state.mic_muted = !self.state.mic_muted;
        self.state.mic_muted
    }

    pub(crate) fn set_encoder_mode(&mut self, slot: usize, mode: EncoderMode) -> bool {
        let changed = self.state.encoder_mode[slot] != mode;
        self.state.encoder_mode[slot] = mode;
        changed
    }

    /// Apply a detent to whatever `mode` is bound to.
    ///
    /// Only Volume and Mic own a device value; the other modes are pure
    /// host actions and leave the state untouched.
    pub(crate) fn adjust_bound_value(&mut self, mode: EncoderMode, delta: i16) -> Option<StateChange> {
        let change = match mode {
            EncoderMode::Volume => {
                let next = clamp_percent(self.state.volume as i16 + delta);
                if next == self.state.volume {
                    return None;
                }
                self.state.volume = next;
                StateChange::Volume(next)
            }
            EncoderMode::Mic => {
                let next = clamp_percent(self.state.mic_level as i16 + delta);
                if next == self.state.mic_level {
                    return None;
                }
                self.state.mic_level = next;
                StateChange::MicLevel(next)
            }
            EncoderMode::Timeline | EncoderMode::Zoom | EncoderMode::Scroll => return None,
        };
        self.check();
        Some(change)
    }

    pub(crate) fn set_brightness(&mut self, value: i16) -> u8 {
        self.state.brightness = clamp_percent(value);
        self.check();
        self.state.brightness
    }

    pub(crate) fn set_theme(&mut self, theme: Theme) {
        self.state.theme = theme;
    }

    pub(crate) fn set_accent(&mut self, accent: AccentColor) {
        self.state.accent = accent;
    }

    /// Replace the profile-scoped fields with a stored snapshot.
    pub(crate) fn load_profile(&mut self, snapshot: ProfileSnapshot) {
        self.state.keys = snapshot.keys;
        self.state.encoder_mode = snapshot.encoder_mode;
    }

    fn check(&self) {
        debug_assert!(self.state.in_bounds(), "device state out of bounds");
    }
}

pub(crate) fn clamp_percent(value: i16) -> u8 {
    value.clamp(0, PERCENT_MAX as i16) as u8
}

pub(crate) fn clamp_profile(value: i16) -> u8 {
    value.clamp(PROFILE_MIN as i16, PROFILE_MAX as i16) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_factory_values() {
        let state = DeviceState::default();
        assert_eq!(state.current_profile(), 1);
        assert!(!state.mic_muted());
        assert_eq!(state.encoder_modes(), [EncoderMode::Volume, EncoderMode::Mic]);
        assert_eq!(state.volume(), 70);
        assert_eq!(state.mic_level(), 45);
        assert_eq!(state.brightness(), 100);
        assert_eq!(state.key(0).label.as_str(), "M1");
        assert_eq!(state.key(9).label.as_str(), "M10");
        assert_eq!(state.key(9).macro_id, 9);
    }

    #[test]
    fn profile_saturates_at_both_ends() {
        let mut store = DeviceStore::default();
        assert_eq!(store.step_profile(-1), None);
        assert_eq!(store.get().current_profile(), 1);

        for _ in 0..20 {
            store.step_profile(1);
        }
        assert_eq!(store.get().current_profile(), 8);
        assert_eq!(store.step_profile(1), None);
    }

    #[test]
    fn set_profile_clamps_out_of_range_writes() {
        let mut store = DeviceStore::default();
        assert_eq!(store.set_profile(42), Some(8));
        assert_eq!(store.set_profile(0), Some(1));
    }

    #[test]
    fn percentages_clamp_silently() {
        let mut store = DeviceStore::default();
        assert_eq!(
            store.adjust_bound_value(EncoderMode::Volume, 500),
            Some(StateChange::Volume(100))
        );
        assert_eq!(store.adjust_bound_value(EncoderMode::Volume, 1), None);
        assert_eq!(
            store.adjust_bound_value(EncoderMode::Mic, -500),
            Some(StateChange::MicLevel(0))
        );
        assert_eq!(store.set_brightness(-3), 0);
        assert_eq!(store.set_brightness(250), 100);
        assert!(store.get().in_bounds());
    }

    #[test]
    fn non_value_modes_do_not_touch_state() {
        let mut store = DeviceStore::default();
        let before = store.snapshot();
        assert_eq!(store.adjust_bound_value(EncoderMode::Zoom, 1), None);
        assert_eq!(store.adjust_bound_value(EncoderMode::Timeline, -1), None);
        assert_eq!(store.adjust_bound_value(EncoderMode::Scroll, 1), None);
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn seeded_state_is_clamped() {
        let mut seed = DeviceState::default();
        seed.current_profile = 12;
        seed.volume = 180;
        let store = DeviceStore::new(seed);
        assert_eq!(store.get().current_profile(), 8);
        assert_eq!(store.get().volume(), 100);
    }

    #[test]
    fn encoder_mode_cycle_wraps() {
        assert_eq!(EncoderMode::Scroll.cycle(1), EncoderMode::Volume);
        assert_eq!(EncoderMode::Volume.cycle(-1), EncoderMode::Scroll);
        let mut mode = EncoderMode::Mic;
        for _ in 0..5 {
            mode = mode.cycle(1);
        }
        assert_eq!(mode, EncoderMode::Mic);
    }

    #[test]
    fn accent_cycle_wraps() {
        assert_eq!(AccentColor::Red.cycle(1), AccentColor::Blue);
        assert_eq!(AccentColor::Blue.cycle(-1), AccentColor::Red);
    }

    #[test]
    fn load_profile_replaces_only_profile_fields() {
        let mut store = DeviceStore::default();
        store.toggle_mic();
        let mut snapshot = store.get().profile_snapshot();
        snapshot.encoder_mode = [EncoderMode::Zoom, EncoderMode::Scroll];
        snapshot.keys[2].macro_id = 77;

        store.load_profile(snapshot);
        assert_eq!(store.get().encoder_mode(0), EncoderMode::Zoom);
        assert_eq!(store.get().key(2).macro_id, 77);
        assert!(store.get().mic_muted());
    }

    #[test]
    fn led_color_packs_rgb() {
        assert_eq!(LedColor::new(0x12, 0x34, 0x56).to_u32(), 0x0012_3456);
    }
}

//! Event router.
//!
//! `Router` owns the device record, the navigation record, the debug ring
//! and the two collaborators it talks to (profile store, host link). It is
//! the only writer of any of them. Every entry point runs to completion
//! synchronously and follows the same order:
//!
//! 1. validate the event (out-of-range input is rejected untouched)
//! 2. mutate device / navigation state
//! 3. build the outbound report from the post-mutation state
//! 4. hand the frame to the host link, whatever the outcome
//! 5. append exactly one debug entry describing what happened
//!
//! While an overlay is up, input is interpreted against the routed screen
//! underneath it.

use core::fmt::{self, Write};

use heapless::{String, Vec};

use crate::config::{
    BRIGHTNESS_STEP, KEY_HIGHLIGHT_MS, NUM_ENCODERS, NUM_MACRO_KEYS, OVERLAY_DURATION_MS,
    OVERLAY_MESSAGE_LEN, VALUE_STEP,
};
use crate::debug_log::DebugLog;
use crate::error::{InputError, LinkError};
use crate::input::{AuxButton, Edge, InputProvider, LogicalInputEvent};
use crate::link::{HostLink, ReportQueue};
use crate::navigation::{
    step_key_cursor, step_profile_cursor, MenuTarget, Navigation, Overlay, RgbRow, RgbStaging,
    ScreenId, ScreenState, Transition,
};
use crate::persistence::{ProfileCache, ProfileStore};
use crate::report::OutboundReport;
use crate::state::{clamp_percent, DeviceState, DeviceStore, EncoderMode, StateChange};

/// Upper bound of field changes a single dispatch can produce.
pub const MAX_CHANGES: usize = 4;

/// Runtime tunables. `Default` matches `config.rs`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RouterConfig {
    pub overlay_ms: u64,
    pub highlight_ms: u64,
    /// Volume / mic level change per detent on Home.
    pub value_step: u8,
    /// Brightness change per detent on the RGB screen.
    pub brightness_step: u8,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            overlay_ms: OVERLAY_DURATION_MS,
            highlight_ms: KEY_HIGHLIGHT_MS,
            value_step: VALUE_STEP,
            brightness_step: BRIGHTNESS_STEP,
        }
    }
}

/// A macro key lit on the Macros screen until `until_ms`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyHighlight {
    pub index: u8,
    pub until_ms: u64,
}

/// Non-fatal persistence problem met during a profile switch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PersistenceFault {
    /// Saving the profile being left failed.
    Save(u8),
    /// Loading the profile being entered failed; in-memory fields kept.
    Load(u8),
}

impl fmt::Display for PersistenceFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceFault::Save(p) => write!(f, "save P{} failed", p),
            PersistenceFault::Load(p) => write!(f, "load P{} failed", p),
        }
    }
}

/// Everything one dispatch did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouterOutcome {
    pub transition: Option<Transition>,
    pub changes: Vec<StateChange, MAX_CHANGES>,
    pub report: Option<OutboundReport>,
    /// Result of handing `report` to the link; `None` when nothing was sent.
    pub link_result: Option<Result<(), LinkError>>,
    /// Overlay raised (or replaced) by this dispatch.
    pub overlay: Option<Overlay>,
    pub highlight: Option<KeyHighlight>,
    pub persistence: Option<PersistenceFault>,
    /// Set when the event was refused before dispatch.
    pub rejected: Option<InputError>,
    /// Sequence number of the debug entry appended for this dispatch.
    pub log_seq: u32,
}

impl RouterOutcome {
    pub fn is_rejected(&self) -> bool {
        self.rejected.is_some()
    }

    fn change(&mut self, change: StateChange) {
        // MAX_CHANGES covers the largest case (RGB apply).
        let _ = self.changes.push(change);
    }
}

/// Result of a housekeeping tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Keys whose highlight ran out on this tick.
    pub expired_keys: Vec<u8, NUM_MACRO_KEYS>,
    /// Screen visible again after the overlay expired.
    pub overlay_expired: Option<ScreenId>,
}

impl TickOutcome {
    pub fn is_idle(&self) -> bool {
        self.expired_keys.is_empty() && self.overlay_expired.is_none()
    }
}

/// Read-only view handed to the renderer.
#[derive(Clone, Copy)]
pub struct RouterView<'a> {
    pub state: &'a DeviceState,
    pub screen: &'a ScreenState,
    pub highlights: &'a [Option<u64>; NUM_MACRO_KEYS],
    pub last_key: Option<u8>,
    pub log: &'a DebugLog,
}

/// Display collaborator. Never mutates device or navigation state.
pub trait Renderer {
    fn show_screen(&mut self, screen: ScreenId, view: RouterView<'_>);

    fn show_overlay(&mut self, message: &str, duration_ms: u64);

    fn notify_key_highlight(&mut self, index: u8, until_ms: u64);
}

/// Router wired to the in-memory collaborators (tests, simulator).
pub type HostRouter = Router<ProfileCache, ReportQueue>;

/// What the debug entry describes.
#[derive(Clone, Copy)]
enum Subject {
    Input(LogicalInputEvent),
    Menu(MenuTarget),
}

pub struct Router<P: ProfileStore, H: HostLink> {
    store: DeviceStore,
    nav: Navigation,
    log: DebugLog,
    highlights: [Option<u64>; NUM_MACRO_KEYS],
    last_key: Option<u8>,
    config: RouterConfig,
    profiles: P,
    link: H,
}

impl<P: ProfileStore, H: HostLink> Router<P, H> {
    pub fn new(initial: DeviceState, config: RouterConfig, profiles: P, link: H) -> Self {
        Self {
            store: DeviceStore::new(initial),
            nav: Navigation::new(),
            log: DebugLog::new(),
            highlights: [None; NUM_MACRO_KEYS],
            last_key: None,
            config,
            profiles,
            link,
        }
    }

    /// Factory state, default timings.
    pub fn with_defaults(profiles: P, link: H) -> Self {
        Self::new(DeviceState::default(), RouterConfig::default(), profiles, link)
    }

    // Read access

    pub fn state(&self) -> &DeviceState {
        self.store.get()
    }

    pub fn navigation(&self) -> &Navigation {
        &self.nav
    }

    pub fn current_screen(&self) -> ScreenId {
        self.nav.current_screen()
    }

    pub fn previous_screen(&self) -> ScreenId {
        self.nav.previous_screen()
    }

    pub fn debug_log(&self) -> &DebugLog {
        &self.log
    }

    /// Highlight deadline of key `index`, if it is lit.
    pub fn highlight(&self, index: usize) -> Option<u64> {
        self.highlights.get(index).copied().flatten()
    }

    /// Last macro key pressed since boot.
    pub fn last_key(&self) -> Option<u8> {
        self.last_key
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn link(&self) -> &H {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut H {
        &mut self.link
    }

    pub fn profiles(&self) -> &P {
        &self.profiles
    }

    pub fn profiles_mut(&mut self) -> &mut P {
        &mut self.profiles
    }

    pub fn view(&self) -> RouterView<'_> {
        RouterView {
            state: self.store.get(),
            screen: self.nav.screen(),
            highlights: &self.highlights,
            last_key: self.last_key,
            log: &self.log,
        }
    }

    /// Append a free-form line (boot banner, host notices). Not tied to a
    /// dispatch.
    pub fn note(&mut self, now_ms: u64, message: &str) -> u32 {
        self.log.append(now_ms, message)
    }

    /// Load the stored profile fields for the current profile, if any.
    /// Called once at boot after the store has been populated.
    pub fn restore_current_profile(&mut self, now_ms: u64) -> Option<PersistenceFault> {
        let profile = self.store.get().current_profile();
        match self.profiles.load(profile) {
            Ok(Some(snapshot)) => {
                self.store.load_profile(snapshot);
                self.log.append_fmt(now_ms, format_args!("Profile: {}", profile));
                None
            }
            Ok(None) => None,
            Err(_) => {
                warn!("profile {} could not be loaded at boot", profile);
                let fault = PersistenceFault::Load(profile);
                self.log.append_fmt(now_ms, format_args!("Profile: {}", fault));
                Some(fault)
            }
        }
    }

    // Dispatch

    /// Route one logical input event.
    pub fn dispatch(&mut self, event: LogicalInputEvent, now_ms: u64) -> RouterOutcome {
        let mut out = RouterOutcome::default();

        if let Err(e) = validate(&event) {
            warn!("rejected input: {}", e);
            out.rejected = Some(e);
            return self.finish(Subject::Input(event), now_ms, out);
        }

        trace!("dispatch {} on {}", event, self.nav.screen().id());

        match event {
            LogicalInputEvent::MacroKey { index, edge } => {
                self.on_macro_key(index, edge, now_ms, &mut out)
            }
            LogicalInputEvent::EncoderRotate { encoder, direction } => {
                self.on_rotate(encoder as usize, direction.delta(), &mut out);
                out.report = Some(OutboundReport::EncoderRotate { encoder, direction });
            }
            LogicalInputEvent::EncoderPress {
                encoder,
                edge: Edge::Pressed,
            } => self.on_encoder_press(encoder as usize, now_ms, &mut out),
            LogicalInputEvent::Aux {
                button,
                edge: Edge::Pressed,
            } => self.on_aux(button, now_ms, &mut out),
            // Released edges of encoder and aux buttons only get logged.
            LogicalInputEvent::EncoderPress { .. } | LogicalInputEvent::Aux { .. } => {}
        }

        self.finish(Subject::Input(event), now_ms, out)
    }

    /// Enter a menu screen chosen by the UI layer. Only valid on Home.
    pub fn open_menu(&mut self, target: MenuTarget, now_ms: u64) -> RouterOutcome {
        let mut out = RouterOutcome::default();
        if self.nav.screen().id() == ScreenId::Home {
            let next = ScreenState::enter(target, self.store.get());
            out.transition = self.nav.go(next);
        } else {
            out.rejected = Some(InputError::MenuUnavailable);
        }
        self.finish(Subject::Menu(target), now_ms, out)
    }

    /// Expire key highlights and the overlay. Deadlines are inclusive.
    pub fn tick(&mut self, now_ms: u64) -> TickOutcome {
        let mut out = TickOutcome::default();
        for (index, slot) in self.highlights.iter_mut().enumerate() {
            if slot.is_some_and(|deadline| now_ms >= deadline) {
                *slot = None;
                let _ = out.expired_keys.push(index as u8);
            }
        }
        out.overlay_expired = self.nav.expire_overlay(now_ms);
        if let Some(screen) = out.overlay_expired {
            debug!("overlay expired, back to {}", screen);
        }
        out
    }

    /// Poll at most one event from `input` and dispatch it.
    pub fn pump<I: InputProvider>(
        &mut self,
        input: &mut I,
        now_ms: u64,
    ) -> Result<Option<RouterOutcome>, I::Error> {
        Ok(input
            .poll_event()?
            .map(|event| self.dispatch(event, now_ms)))
    }

    // Presentation

    /// Forward a dispatch outcome to the renderer.
    pub fn present<R: Renderer>(&self, outcome: &RouterOutcome, renderer: &mut R) {
        if let Some(h) = outcome.highlight {
            renderer.notify_key_highlight(h.index, h.until_ms);
        }
        if let Some(overlay) = &outcome.overlay {
            renderer.show_overlay(overlay.message.as_str(), self.config.overlay_ms);
        } else if self.nav.overlay().is_none() {
            renderer.show_screen(self.nav.screen().id(), self.view());
        }
    }

    /// Forward a tick outcome to the renderer.
    pub fn present_tick<R: Renderer>(&self, tick: &TickOutcome, renderer: &mut R) {
        if tick.is_idle() || self.nav.overlay().is_some() {
            return;
        }
        renderer.show_screen(self.nav.screen().id(), self.view());
    }

    // Handlers

    fn on_macro_key(&mut self, index: u8, edge: Edge, now_ms: u64, out: &mut RouterOutcome) {
        let pressed = edge.is_pressed();
        if pressed {
            self.last_key = Some(index);
            if matches!(self.nav.screen(), ScreenState::Macros { .. }) {
                let until_ms = now_ms.saturating_add(self.config.highlight_ms);
                self.highlights[index as usize] = Some(until_ms);
                out.highlight = Some(KeyHighlight { index, until_ms });
            }
        }
        out.report = Some(OutboundReport::MacroKey { index, pressed });
    }

    fn on_rotate(&mut self, encoder: usize, delta: i8, out: &mut RouterOutcome) {
        let screen = *self.nav.screen();
        let next = match screen {
            ScreenState::Home => {
                let mode = self.store.get().encoder_mode(encoder);
                let step = delta as i16 * self.config.value_step as i16;
                if let Some(change) = self.store.adjust_bound_value(mode, step) {
                    out.change(change);
                }
                return;
            }
            ScreenState::Profiles { pending } => ScreenState::Profiles {
                pending: step_profile_cursor(pending, delta),
            },
            ScreenState::Macros { cursor } if encoder == 1 => ScreenState::Macros {
                cursor: step_key_cursor(cursor, delta),
            },
            ScreenState::Encoders { mut highlighted } => {
                highlighted[encoder] = highlighted[encoder].cycle(delta);
                ScreenState::Encoders { highlighted }
            }
            ScreenState::Rgb { row, staged } if encoder == 1 => ScreenState::Rgb {
                row: row.step(delta),
                staged,
            },
            ScreenState::Rgb { row, staged } => ScreenState::Rgb {
                row,
                staged: self.edit_staged(row, staged, delta),
            },
            ScreenState::Macros { .. } => return,
        };
        *self.nav.screen_mut() = next;
    }

    fn edit_staged(&self, row: RgbRow, mut staged: RgbStaging, delta: i8) -> RgbStaging {
        match row {
            RgbRow::Theme => staged.theme = staged.theme.toggled(),
            RgbRow::Accent => staged.accent = staged.accent.cycle(delta),
            RgbRow::Brightness => {
                let step = delta as i16 * self.config.brightness_step as i16;
                staged.brightness = clamp_percent(staged.brightness as i16 + step);
            }
        }
        staged
    }

    fn on_encoder_press(&mut self, encoder: usize, now_ms: u64, out: &mut RouterOutcome) {
        match *self.nav.screen() {
            ScreenState::Home if encoder == 0 => {
                out.transition = self.nav.go(ScreenState::profiles(self.store.get()));
            }
            ScreenState::Profiles { pending } => {
                self.switch_profile(pending, now_ms, out);
                if encoder == 0 {
                    out.transition = self.nav.go(ScreenState::Home);
                }
            }
            ScreenState::Encoders { highlighted } => {
                self.apply_encoder_mode(encoder, highlighted[encoder], now_ms, out);
            }
            ScreenState::Home | ScreenState::Macros { .. } | ScreenState::Rgb { .. } => {}
        }
    }

    fn on_aux(&mut self, button: AuxButton, now_ms: u64, out: &mut RouterOutcome) {
        let screen = *self.nav.screen();
        match (button, screen) {
            (AuxButton::MicMute, _) => {
                let muted = self.store.toggle_mic();
                out.change(StateChange::MicMuted(muted));
                let text = if muted { "Mic: MUTED" } else { "Mic: ON" };
                self.raise_overlay(now_ms, format_args!("{}", text), out);
                out.report = Some(OutboundReport::status(self.store.get()));
            }
            (AuxButton::Prev, ScreenState::Home) => {
                let target = self.store.get().current_profile().saturating_sub(1);
                self.switch_profile(target, now_ms, out);
            }
            (AuxButton::Next, ScreenState::Home) => {
                let target = self.store.get().current_profile().saturating_add(1);
                self.switch_profile(target, now_ms, out);
            }
            // Back discards whatever the screen staged.
            (AuxButton::Prev, _) => {
                out.transition = self.nav.go(ScreenState::Home);
            }
            (AuxButton::Next, ScreenState::Profiles { pending }) => {
                self.switch_profile(pending, now_ms, out);
                out.transition = self.nav.go(ScreenState::Home);
            }
            (AuxButton::Next, ScreenState::Encoders { highlighted }) => {
                for (slot, mode) in highlighted.into_iter().enumerate() {
                    self.apply_encoder_mode(slot, mode, now_ms, out);
                }
                out.transition = self.nav.go(ScreenState::Home);
            }
            (AuxButton::Next, ScreenState::Rgb { staged, .. }) => {
                self.apply_rgb(staged, out);
                out.transition = self.nav.go(ScreenState::Home);
            }
            (AuxButton::Next, ScreenState::Macros { .. }) => {}
        }
    }

    // Effects

    /// Commit a profile change: save the profile being left, load the one
    /// being entered, raise the overlay and report status.
    fn switch_profile(&mut self, target: u8, now_ms: u64, out: &mut RouterOutcome) {
        let leaving = self.store.get().current_profile();
        let Some(entered) = self.store.set_profile(target) else {
            return;
        };
        out.change(StateChange::Profile(entered));

        if self
            .profiles
            .save(leaving, &self.store.get().profile_snapshot())
            .is_err()
        {
            warn!("saving profile {} failed", leaving);
            out.persistence = Some(PersistenceFault::Save(leaving));
        }

        match self.profiles.load(entered) {
            Ok(Some(snapshot)) => {
                self.store.load_profile(snapshot);
                out.change(StateChange::ProfileLoaded(entered));
            }
            Ok(None) => debug!("profile {} has no stored fields", entered),
            Err(_) => {
                warn!("loading profile {} failed, keeping current fields", entered);
                out.persistence = Some(PersistenceFault::Load(entered));
            }
        }

        info!("profile {} -> {}", leaving, entered);
        self.raise_overlay(now_ms, format_args!("Profile {}", entered), out);
        out.report = Some(OutboundReport::status(self.store.get()));
    }

    fn apply_encoder_mode(
        &mut self,
        slot: usize,
        mode: EncoderMode,
        now_ms: u64,
        out: &mut RouterOutcome,
    ) {
        if !self.store.set_encoder_mode(slot, mode) {
            return;
        }
        out.change(StateChange::EncoderMode {
            slot: slot as u8,
            mode,
        });
        self.raise_overlay(
            now_ms,
            format_args!("Enc{}: {}", slot + 1, mode.label()),
            out,
        );
    }

    fn apply_rgb(&mut self, staged: RgbStaging, out: &mut RouterOutcome) {
        let current = RgbStaging::from_state(self.store.get());
        if staged.theme != current.theme {
            self.store.set_theme(staged.theme);
            out.change(StateChange::Theme(staged.theme));
        }
        if staged.accent != current.accent {
            self.store.set_accent(staged.accent);
            out.change(StateChange::Accent(staged.accent));
        }
        if staged.brightness != current.brightness {
            let value = self.store.set_brightness(staged.brightness as i16);
            out.change(StateChange::Brightness(value));
        }
    }

    fn raise_overlay(&mut self, now_ms: u64, args: fmt::Arguments<'_>, out: &mut RouterOutcome) {
        let mut message: String<OVERLAY_MESSAGE_LEN> = String::new();
        let _ = message.write_fmt(args);
        let deadline = now_ms.saturating_add(self.config.overlay_ms);
        out.overlay = Some(self.nav.show_overlay(&message, deadline).clone());
    }

    /// Send the report (if any), then log. Always the last step.
    fn finish(&mut self, subject: Subject, now_ms: u64, mut out: RouterOutcome) -> RouterOutcome {
        if let Some(report) = out.report {
            let result = self.link.enqueue(report.encode());
            if let Err(e) = result {
                warn!("report not queued: {}", e);
            }
            out.link_result = Some(result);
        }

        let line = LogLine {
            subject,
            outcome: &out,
            state: self.store.get(),
        };
        out.log_seq = self.log.append_fmt(now_ms, format_args!("{}", line));
        out
    }
}

fn validate(event: &LogicalInputEvent) -> Result<(), InputError> {
    match *event {
        LogicalInputEvent::MacroKey { index, .. } if index as usize >= NUM_MACRO_KEYS => {
            Err(InputError::KeyOutOfRange(index))
        }
        LogicalInputEvent::EncoderRotate { encoder, .. }
        | LogicalInputEvent::EncoderPress { encoder, .. }
            if encoder as usize >= NUM_ENCODERS =>
        {
            Err(InputError::EncoderOutOfRange(encoder))
        }
        _ => Ok(()),
    }
}

/// Debug entry text for one dispatch.
struct LogLine<'a> {
    subject: Subject,
    outcome: &'a RouterOutcome,
    state: &'a DeviceState,
}

impl fmt::Display for LogLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(e) = self.outcome.rejected {
            return write!(f, "Rejected: {}", e);
        }

        let profile_changed = self
            .outcome
            .changes
            .iter()
            .any(|c| matches!(c, StateChange::Profile(_)));

        match self.subject {
            Subject::Menu(_) => f.write_str("Menu")?,
            Subject::Input(LogicalInputEvent::MacroKey { index, edge }) => {
                let what = if edge.is_pressed() { "pressed" } else { "released" };
                write!(f, "Macro Key {} {}", index, what)?
            }
            Subject::Input(LogicalInputEvent::EncoderRotate { encoder, direction }) => {
                write!(f, "ENC{} {}", encoder + 1, direction.label())?
            }
            Subject::Input(LogicalInputEvent::EncoderPress { encoder, edge }) => {
                let what = if edge.is_pressed() { "Press" } else { "Release" };
                write!(f, "ENC{} {}", encoder + 1, what)?
            }
            Subject::Input(LogicalInputEvent::Aux {
                button: AuxButton::MicMute,
                edge: Edge::Pressed,
            }) => {
                let what = if self.state.mic_muted() { "MUTED" } else { "ON" };
                write!(f, "Mic: {}", what)?
            }
            Subject::Input(LogicalInputEvent::Aux { button, edge }) => {
                let what = if edge.is_pressed() { "Press" } else { "Release" };
                write!(f, "{} {}", button.label(), what)?
            }
        }

        if profile_changed {
            write!(f, " Prof: {}", self.state.current_profile())?;
        }
        if let Some(t) = self.outcome.transition {
            write!(f, " -> {}", t.to.label())?;
        }
        if let Some(fault) = self.outcome.persistence {
            write!(f, " ({})", fault)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::REPORT_SIZE;
    use crate::input::Direction;
    use crate::state::{AccentColor, ProfileSnapshot, Theme};

    use std::string::String as StdString;
    use std::vec::Vec as StdVec;

    const MIC: LogicalInputEvent = LogicalInputEvent::aux_pressed(AuxButton::MicMute);
    const PREV: LogicalInputEvent = LogicalInputEvent::aux_pressed(AuxButton::Prev);
    const NEXT: LogicalInputEvent = LogicalInputEvent::aux_pressed(AuxButton::Next);
    const ENC0: LogicalInputEvent = LogicalInputEvent::encoder_pressed(0);
    const ENC1: LogicalInputEvent = LogicalInputEvent::encoder_pressed(1);

    fn cw(encoder: u8) -> LogicalInputEvent {
        LogicalInputEvent::rotate(encoder, Direction::Cw)
    }

    fn ccw(encoder: u8) -> LogicalInputEvent {
        LogicalInputEvent::rotate(encoder, Direction::Ccw)
    }

    fn router() -> HostRouter {
        Router::with_defaults(ProfileCache::new(), ReportQueue::new(Default::default()))
    }

    fn messages(r: &HostRouter, n: usize) -> StdVec<StdString> {
        r.debug_log()
            .last(n)
            .map(|e| e.message().to_string())
            .collect()
    }

    /// Store whose every access fails.
    struct BrokenStore;

    impl ProfileStore for BrokenStore {
        type Error = ();

        fn load(&mut self, _: u8) -> Result<Option<ProfileSnapshot>, ()> {
            Err(())
        }

        fn save(&mut self, _: u8, _: &ProfileSnapshot) -> Result<(), ()> {
            Err(())
        }
    }

    #[derive(Default)]
    struct Recorder {
        screens: StdVec<ScreenId>,
        overlays: StdVec<(StdString, u64)>,
        highlights: StdVec<(u8, u64)>,
    }

    impl Renderer for Recorder {
        fn show_screen(&mut self, screen: ScreenId, _view: RouterView<'_>) {
            self.screens.push(screen);
        }

        fn show_overlay(&mut self, message: &str, duration_ms: u64) {
            self.overlays.push((message.to_string(), duration_ms));
        }

        fn notify_key_highlight(&mut self, index: u8, until_ms: u64) {
            self.highlights.push((index, until_ms));
        }
    }

    // ── Profile bounds ──────────────────────────────────────────

    #[test]
    fn profile_saturates_under_repeated_prev_and_next() {
        let mut r = router();
        for i in 0..20 {
            r.dispatch(NEXT, i);
            assert!((1..=8).contains(&r.state().current_profile()));
        }
        assert_eq!(r.state().current_profile(), 8);

        for i in 0..20 {
            r.dispatch(PREV, 100 + i);
            assert!((1..=8).contains(&r.state().current_profile()));
        }
        assert_eq!(r.state().current_profile(), 1);
    }

    #[test]
    fn next_on_home_reports_status_and_raises_overlay() {
        let mut r = router();
        let out = r.dispatch(NEXT, 1_000);
        assert_eq!(out.changes.as_slice(), &[StateChange::Profile(2)]);
        assert_eq!(
            out.overlay.as_ref().map(|o| o.message.as_str()),
            Some("Profile 2")
        );
        assert_eq!(out.overlay.as_ref().map(|o| o.deadline_ms), Some(2_500));
        assert_eq!(
            out.report,
            Some(OutboundReport::Status {
                profile: 2,
                mic_muted: false,
                volume: 70,
                mic_level: 45,
            })
        );
        assert_eq!(out.link_result, Some(Ok(())));
        assert_eq!(r.current_screen(), ScreenId::Overlay);
        assert_eq!(r.previous_screen(), ScreenId::Home);
    }

    #[test]
    fn prev_at_floor_changes_nothing() {
        let mut r = router();
        let out = r.dispatch(PREV, 0);
        assert!(out.changes.is_empty());
        assert!(out.overlay.is_none());
        assert!(out.report.is_none());
        assert_eq!(r.current_screen(), ScreenId::Home);
        assert_eq!(messages(&r, 1), vec!["Prev Press"]);
    }

    // ── Encoders screen ─────────────────────────────────────────

    #[test]
    fn mode_cursor_wraps_after_five_steps() {
        let mut r = router();
        r.open_menu(MenuTarget::Encoders, 0);
        let start = match r.navigation().screen() {
            ScreenState::Encoders { highlighted } => highlighted[0],
            other => panic!("unexpected screen {:?}", other),
        };

        let mut seen = StdVec::new();
        for _ in 0..5 {
            r.dispatch(cw(0), 0);
            if let ScreenState::Encoders { highlighted } = r.navigation().screen() {
                seen.push(highlighted[0]);
            }
        }
        assert_eq!(seen.last(), Some(&start));
        seen.sort_by_key(|m| m.index());
        seen.dedup();
        assert_eq!(seen.len(), 5);
        // Rotation alone never touches the binding.
        assert_eq!(r.state().encoder_mode(0), EncoderMode::Volume);
    }

    #[test]
    fn encoder_press_applies_highlighted_mode_in_place() {
        let mut r = router();
        r.open_menu(MenuTarget::Encoders, 0);
        r.dispatch(cw(1), 0); // Mic -> Timeline for slot 1
        let out = r.dispatch(ENC1, 10);

        assert_eq!(
            out.changes.as_slice(),
            &[StateChange::EncoderMode {
                slot: 1,
                mode: EncoderMode::Timeline
            }]
        );
        assert_eq!(
            out.overlay.as_ref().map(|o| o.message.as_str()),
            Some("Enc2: Timeline")
        );
        assert!(out.transition.is_none());
        assert_eq!(r.navigation().screen().id(), ScreenId::Encoders);
        assert_eq!(r.state().encoder_mode(1), EncoderMode::Timeline);
    }

    #[test]
    fn back_from_encoders_discards_highlight() {
        let mut r = router();
        r.open_menu(MenuTarget::Encoders, 0);
        r.dispatch(cw(0), 0);
        let out = r.dispatch(PREV, 0);
        assert_eq!(
            out.transition,
            Some(Transition {
                from: ScreenId::Encoders,
                to: ScreenId::Home
            })
        );
        assert_eq!(r.state().encoder_mode(0), EncoderMode::Volume);
    }

    // ── Macro keys ──────────────────────────────────────────────

    #[test]
    fn key_highlight_expires_on_tick_after_500ms() {
        let mut r = router();
        r.open_menu(MenuTarget::Macros, 0);
        let now = 10_000;
        let out = r.dispatch(LogicalInputEvent::key_pressed(3), now);

        assert_eq!(
            out.highlight,
            Some(KeyHighlight {
                index: 3,
                until_ms: now + 500
            })
        );
        assert_eq!(r.highlight(3), Some(now + 500));

        assert!(r.tick(now + 499).expired_keys.is_empty());
        assert_eq!(r.highlight(3), Some(now + 500));

        let tick = r.tick(now + 501);
        assert_eq!(tick.expired_keys.as_slice(), &[3]);
        assert_eq!(r.highlight(3), None);
    }

    #[test]
    fn key_press_outside_macros_reports_without_highlight() {
        let mut r = router();
        let out = r.dispatch(LogicalInputEvent::key_pressed(9), 0);
        assert!(out.highlight.is_none());
        assert_eq!(r.highlight(9), None);
        assert_eq!(r.last_key(), Some(9));

        let frame = r.link_mut().pop().unwrap();
        let mut expected = [0u8; REPORT_SIZE];
        expected[..4].copy_from_slice(&[0x01, 0x00, 0x09, 0x01]);
        assert_eq!(frame, expected);
    }

    #[test]
    fn key_release_reports_press_flag_zero() {
        let mut r = router();
        let out = r.dispatch(LogicalInputEvent::key_released(4), 0);
        assert_eq!(
            out.report,
            Some(OutboundReport::MacroKey {
                index: 4,
                pressed: false
            })
        );
        assert_eq!(messages(&r, 1), vec!["Macro Key 4 released"]);
    }

    // ── Mic toggle ──────────────────────────────────────────────

    #[test]
    fn mic_toggle_twice_restores_and_orders_overlays() {
        let mut r = router();
        let first = r.dispatch(MIC, 0);
        let second = r.dispatch(MIC, 100);

        assert!(!r.state().mic_muted());
        assert_eq!(first.overlay.unwrap().message.as_str(), "Mic: MUTED");
        assert_eq!(second.overlay.unwrap().message.as_str(), "Mic: ON");
        assert_eq!(r.navigation().overlay_deadline(), Some(1_600));
        assert_eq!(messages(&r, 2), vec!["Mic: MUTED", "Mic: ON"]);
        assert_eq!(
            second.report,
            Some(OutboundReport::Status {
                profile: 1,
                mic_muted: false,
                volume: 70,
                mic_level: 45,
            })
        );
    }

    #[test]
    fn mic_works_from_any_screen_and_overlay_reverts_there() {
        let mut r = router();
        r.open_menu(MenuTarget::Rgb, 0);
        r.dispatch(MIC, 0);
        assert_eq!(r.current_screen(), ScreenId::Overlay);
        assert_eq!(r.previous_screen(), ScreenId::Rgb);
        assert_eq!(r.tick(1_499).overlay_expired, None);
        assert_eq!(r.tick(1_500).overlay_expired, Some(ScreenId::Rgb));
        assert_eq!(r.current_screen(), ScreenId::Rgb);
    }

    // ── Debug log ───────────────────────────────────────────────

    #[test]
    fn every_dispatch_logs_exactly_once() {
        let mut r = router();
        for i in 0..40u64 {
            let before = r.debug_log().len();
            let out = r.dispatch(LogicalInputEvent::key_pressed((i % 10) as u8), i);
            assert_eq!(out.log_seq, i as u32 + 1);
            assert_eq!(r.debug_log().len(), (before + 1).min(32));
        }
        let seqs: StdVec<u32> = r.debug_log().last(32).map(|e| e.seq).collect();
        assert_eq!(seqs, (9..=40).collect::<StdVec<u32>>());
    }

    #[test]
    fn debug_messages_describe_events() {
        let mut r = router();
        r.dispatch(cw(0), 0);
        r.dispatch(ccw(1), 0);
        r.dispatch(NEXT, 0);
        assert_eq!(messages(&r, 3), vec!["ENC1 CW", "ENC2 CCW", "Next Press Prof: 2"]);
    }

    // ── Profiles screen ─────────────────────────────────────────

    #[test]
    fn encoder_press_enters_and_confirms_profiles() {
        let mut r = router();
        let out = r.dispatch(ENC0, 0);
        assert_eq!(
            out.transition,
            Some(Transition {
                from: ScreenId::Home,
                to: ScreenId::Profiles
            })
        );

        r.dispatch(cw(0), 0);
        r.dispatch(cw(0), 0);
        // Preview only.
        assert_eq!(r.state().current_profile(), 1);

        let out = r.dispatch(ENC0, 0);
        assert_eq!(out.transition.map(|t| t.to), Some(ScreenId::Home));
        assert_eq!(r.state().current_profile(), 3);
        assert_eq!(r.navigation().screen().id(), ScreenId::Home);
    }

    #[test]
    fn back_on_profiles_discards_preview() {
        let mut r = router();
        r.dispatch(ENC0, 0);
        r.dispatch(cw(0), 0);
        let out = r.dispatch(PREV, 0);
        assert_eq!(out.transition.map(|t| t.to), Some(ScreenId::Home));
        assert_eq!(r.state().current_profile(), 1);
        assert!(out.report.is_none());
    }

    #[test]
    fn profile_cursor_clamps() {
        let mut r = router();
        r.dispatch(ENC0, 0);
        for _ in 0..12 {
            r.dispatch(cw(1), 0);
        }
        assert_eq!(r.navigation().screen(), &ScreenState::Profiles { pending: 8 });
        for _ in 0..12 {
            r.dispatch(ccw(0), 0);
        }
        assert_eq!(r.navigation().screen(), &ScreenState::Profiles { pending: 1 });
    }

    #[test]
    fn encoder_one_press_commits_without_leaving() {
        let mut r = router();
        r.dispatch(ENC0, 0);
        r.dispatch(cw(0), 0);
        let out = r.dispatch(ENC1, 0);
        assert!(out.transition.is_none());
        assert_eq!(r.state().current_profile(), 2);
        assert_eq!(r.navigation().screen().id(), ScreenId::Profiles);
    }

    #[test]
    fn profile_switch_saves_and_restores_profile_fields() {
        let mut r = router();
        // Bind encoder 0 to Zoom on profile 1.
        r.open_menu(MenuTarget::Encoders, 0);
        r.dispatch(cw(0), 0);
        r.dispatch(cw(0), 0);
        r.dispatch(cw(0), 0);
        r.dispatch(NEXT, 0);
        assert_eq!(r.state().encoder_mode(0), EncoderMode::Zoom);

        // Profile 2 has nothing stored yet: fields carry over.
        r.dispatch(NEXT, 0);
        assert_eq!(r.state().encoder_mode(0), EncoderMode::Zoom);

        // Change it on profile 2, then go back to 1 and forward again.
        r.open_menu(MenuTarget::Encoders, 0);
        r.dispatch(cw(0), 0);
        r.dispatch(NEXT, 0);
        assert_eq!(r.state().encoder_mode(0), EncoderMode::Scroll);

        let out = r.dispatch(PREV, 0);
        assert_eq!(
            out.changes.as_slice(),
            &[StateChange::Profile(1), StateChange::ProfileLoaded(1)]
        );
        assert_eq!(r.state().encoder_mode(0), EncoderMode::Zoom);

        r.dispatch(NEXT, 0);
        assert_eq!(r.state().encoder_mode(0), EncoderMode::Scroll);
        assert!(r.profiles().is_dirty());
    }

    #[test]
    fn persistence_failure_is_logged_not_fatal() {
        let mut r = Router::with_defaults(BrokenStore, ReportQueue::<4>::default());
        let out = r.dispatch(NEXT, 0);

        assert_eq!(r.state().current_profile(), 2);
        assert_eq!(out.persistence, Some(PersistenceFault::Load(2)));
        assert_eq!(r.debug_log().len(), 1);
        assert_eq!(
            r.debug_log().latest().unwrap().message(),
            "Next Press Prof: 2 (load P2 failed)"
        );
    }

    // ── Home screen encoders ────────────────────────────────────

    #[test]
    fn home_rotation_adjusts_bound_values() {
        let mut r = router();
        let out = r.dispatch(cw(0), 0);
        assert_eq!(out.changes.as_slice(), &[StateChange::Volume(71)]);
        assert_eq!(
            out.report,
            Some(OutboundReport::EncoderRotate {
                encoder: 0,
                direction: Direction::Cw
            })
        );

        let out = r.dispatch(ccw(1), 0);
        assert_eq!(out.changes.as_slice(), &[StateChange::MicLevel(44)]);
    }

    #[test]
    fn volume_saturates_at_100() {
        let mut r = router();
        for _ in 0..50 {
            r.dispatch(cw(0), 0);
        }
        assert_eq!(r.state().volume(), 100);
        let out = r.dispatch(cw(0), 0);
        assert!(out.changes.is_empty());
        // Still reported to the host.
        assert!(out.report.is_some());
    }

    // ── RGB screen ──────────────────────────────────────────────

    #[test]
    fn rgb_changes_stay_staged_until_next() {
        let mut r = router();
        r.open_menu(MenuTarget::Rgb, 0);
        r.dispatch(cw(0), 0); // theme row: toggle
        r.dispatch(cw(1), 0); // accent row
        r.dispatch(cw(0), 0);
        r.dispatch(cw(1), 0); // brightness row
        r.dispatch(ccw(0), 0);
        r.dispatch(ccw(0), 0);

        assert_eq!(r.state().theme(), Theme::Dark);
        assert_eq!(r.state().brightness(), 100);

        let out = r.dispatch(NEXT, 0);
        assert_eq!(
            out.changes.as_slice(),
            &[
                StateChange::Theme(Theme::Light),
                StateChange::Accent(AccentColor::Cyan),
                StateChange::Brightness(80),
            ]
        );
        assert_eq!(out.transition.map(|t| t.to), Some(ScreenId::Home));
        assert_eq!(r.state().theme(), Theme::Light);
        assert_eq!(r.state().accent(), AccentColor::Cyan);
        assert_eq!(r.state().brightness(), 80);
    }

    #[test]
    fn rgb_back_discards_staging() {
        let mut r = router();
        r.open_menu(MenuTarget::Rgb, 0);
        r.dispatch(cw(0), 0);
        r.dispatch(PREV, 0);
        assert_eq!(r.state().theme(), Theme::Dark);
        assert_eq!(r.current_screen(), ScreenId::Home);
    }

    // ── Validation ──────────────────────────────────────────────

    #[test]
    fn out_of_range_input_is_rejected_untouched() {
        let mut r = router();
        let before = r.state().clone();

        let out = r.dispatch(LogicalInputEvent::key_pressed(10), 0);
        assert_eq!(out.rejected, Some(InputError::KeyOutOfRange(10)));
        assert!(out.report.is_none());
        assert!(r.link().is_empty());

        let out = r.dispatch(LogicalInputEvent::rotate(2, Direction::Cw), 0);
        assert_eq!(out.rejected, Some(InputError::EncoderOutOfRange(2)));

        assert_eq!(r.state(), &before);
        assert_eq!(r.debug_log().len(), 2);
        assert_eq!(
            messages(&r, 2),
            vec!["Rejected: key 10 out of range", "Rejected: encoder 2 out of range"]
        );
    }

    #[test]
    fn menu_only_opens_from_home() {
        let mut r = router();
        r.open_menu(MenuTarget::Macros, 0);
        let out = r.open_menu(MenuTarget::Rgb, 0);
        assert_eq!(out.rejected, Some(InputError::MenuUnavailable));
        assert_eq!(r.current_screen(), ScreenId::Macros);
        assert_eq!(
            messages(&r, 2),
            vec!["Menu -> Macros", "Rejected: menu only from Home"]
        );
    }

    #[test]
    fn releases_of_buttons_are_logged_only() {
        let mut r = router();
        let before = r.state().clone();
        let out = r.dispatch(LogicalInputEvent::aux_released(AuxButton::MicMute), 0);
        assert!(out.report.is_none());
        let out2 = r.dispatch(LogicalInputEvent::encoder_released(0), 0);
        assert!(out2.transition.is_none());
        assert_eq!(r.state(), &before);
        assert_eq!(messages(&r, 2), vec!["Mic Release", "ENC1 Release"]);
    }

    // ── Link ────────────────────────────────────────────────────

    #[test]
    fn full_link_is_recorded_and_dispatch_still_logs() {
        let mut r = Router::with_defaults(
            ProfileCache::new(),
            ReportQueue::<1>::new(crate::link::OverflowPolicy::DropNewest),
        );
        r.dispatch(LogicalInputEvent::key_pressed(0), 0);
        let out = r.dispatch(LogicalInputEvent::key_pressed(1), 0);
        assert_eq!(out.link_result, Some(Err(LinkError::QueueFull)));
        assert_eq!(r.debug_log().len(), 2);
    }

    // ── Presentation ────────────────────────────────────────────

    #[test]
    fn present_forwards_overlay_and_screen() {
        let mut r = router();
        let mut ui = Recorder::default();

        let out = r.open_menu(MenuTarget::Macros, 0);
        r.present(&out, &mut ui);
        let out = r.dispatch(LogicalInputEvent::key_pressed(2), 100);
        r.present(&out, &mut ui);
        let out = r.dispatch(MIC, 200);
        r.present(&out, &mut ui);

        assert_eq!(ui.screens, vec![ScreenId::Macros, ScreenId::Macros]);
        assert_eq!(ui.highlights, vec![(2, 600)]);
        assert_eq!(ui.overlays, vec![("Mic: MUTED".to_string(), 1_500)]);

        let tick = r.tick(1_700);
        r.present_tick(&tick, &mut ui);
        assert_eq!(ui.screens.last(), Some(&ScreenId::Macros));
        assert_eq!(ui.screens.len(), 3);
    }

    #[test]
    fn pump_drains_scripted_input() {
        let script = [MIC, LogicalInputEvent::key_pressed(1)];
        let mut input = crate::input::ScriptedInput::new(&script);
        let mut r = router();

        assert!(r.pump(&mut input, 0).unwrap().is_some());
        assert!(r.pump(&mut input, 1).unwrap().is_some());
        assert!(r.pump(&mut input, 2).unwrap().is_none());
        assert_eq!(r.link().len(), 2);
    }
}

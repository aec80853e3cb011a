//! Terminal simulator for the macro pad.
//!
//! Drives the same `Router` as the firmware from the keyboard and shows
//! the routed screen, the reports sent to the host and the debug panel.
//!
//! Usage: `cargo run --features simulator --bin simulator`

use std::collections::VecDeque;
use std::io::{self, Write};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::{cursor, terminal, ExecutableCommand, QueueableCommand};

use padcore::config::{DEBUG_PANEL_LINES, NUM_ENCODERS, NUM_MACRO_KEYS, TICK_PERIOD_MS};
use padcore::keymap::{map_key, release_for, KeyAction, SimKey};
use padcore::navigation::{RgbRow, ScreenState};
use padcore::router::RouterView;
use padcore::state::EncoderMode;
use padcore::{
    HostRouter, OutboundReport, OverflowPolicy, ProfileCache, Renderer, ReportQueue, Router,
    RouterOutcome, ScreenId,
};

const HELP: &str = "1-0 keys | Up/Down enc1 | Left/Right enc2 | Enter enc1 push | , enc2 push | m mic | [ ] prev/next | F1-F3 menus | q quit";
const REPORT_LINES: usize = 4;

struct Tui {
    stdout: io::Stdout,
    body: Vec<String>,
    overlay: Option<String>,
    highlight: Option<String>,
    reports: VecDeque<String>,
    debug: Vec<String>,
}

impl Tui {
    fn setup() -> Result<Self> {
        let mut stdout = io::stdout();
        terminal::enable_raw_mode().context("Failed to enable raw mode")?;
        stdout
            .execute(terminal::EnterAlternateScreen)
            .context("Failed to enter alternate screen")?;
        stdout.execute(cursor::Hide)?;
        Ok(Self {
            stdout,
            body: Vec::new(),
            overlay: None,
            highlight: None,
            reports: VecDeque::new(),
            debug: Vec::new(),
        })
    }

    fn teardown(&mut self) {
        let _ = self.stdout.execute(cursor::Show);
        let _ = self.stdout.execute(terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
        let _ = self.stdout.flush();
    }

    fn push_report(&mut self, report: &OutboundReport) {
        let frame = report.encode();
        let line = format!("{:?} {:02x?}", report.kind(), &frame[..8]);
        if self.reports.len() == REPORT_LINES {
            self.reports.pop_front();
        }
        self.reports.push_back(line);
    }

    fn sync_debug(&mut self, router: &HostRouter) {
        self.debug = router
            .debug_log()
            .last(DEBUG_PANEL_LINES)
            .map(|e| format!("#{:<4} {:>7}ms  {}", e.seq, e.timestamp_ms, e.message()))
            .collect();
    }

    fn draw(&mut self) -> io::Result<()> {
        let out = &mut self.stdout;
        out.queue(terminal::Clear(terminal::ClearType::All))?;
        out.queue(cursor::MoveTo(0, 0))?;

        let mut lines: Vec<String> = Vec::new();
        lines.push("padcore simulator".into());
        lines.push(HELP.into());
        lines.push(String::new());
        lines.extend(self.body.iter().cloned());
        if let Some(message) = &self.overlay {
            lines.push(String::new());
            lines.push(format!("  ** {} **", message));
        }
        if let Some(h) = &self.highlight {
            lines.push(h.clone());
        }
        lines.push(String::new());
        lines.push("-- host reports --".into());
        lines.extend(self.reports.iter().cloned());
        lines.push(String::new());
        lines.push("-- debug --".into());
        lines.extend(self.debug.iter().cloned());

        for line in lines {
            // Raw mode: no implicit carriage return.
            write!(out, "{}\r\n", line)?;
        }
        out.flush()
    }
}

fn screen_lines(screen: ScreenId, view: &RouterView<'_>) -> Vec<String> {
    let state = view.state;
    let mut lines = vec![format!(
        "[{}]  profile {}  mic {}",
        screen.label(),
        state.current_profile(),
        if state.mic_muted() { "MUTED" } else { "ON" }
    )];

    match view.screen {
        ScreenState::Home => {
            lines.push(format!(
                "volume {:>3}%   mic level {:>3}%",
                state.volume(),
                state.mic_level()
            ));
            for slot in 0..NUM_ENCODERS {
                lines.push(format!("enc{}: {}", slot + 1, state.encoder_mode(slot).label()));
            }
        }
        ScreenState::Profiles { pending } => {
            for profile in padcore::config::PROFILE_MIN..=padcore::config::PROFILE_MAX {
                let cursor = if profile == *pending { '>' } else { ' ' };
                let active = if profile == state.current_profile() { "*" } else { "" };
                lines.push(format!("{} profile {}{}", cursor, profile, active));
            }
        }
        ScreenState::Macros { cursor } => {
            for row in 0..2 {
                let cells: Vec<String> = (row * 5..row * 5 + 5)
                    .map(|i| {
                        let label = state.key(i).label.as_str();
                        if view.highlights[i].is_some() {
                            format!("[{:^6}]", label)
                        } else {
                            format!(" {:^6} ", label)
                        }
                    })
                    .collect();
                lines.push(cells.join(""));
            }
            let slot = state.key(*cursor as usize);
            lines.push(format!("> key {} = {} (macro {})", cursor + 1, slot.label, slot.macro_id));
            if let Some(last) = view.last_key {
                lines.push(format!("last pressed: key {}", last + 1));
            }
        }
        ScreenState::Encoders { highlighted } => {
            for slot in 0..NUM_ENCODERS {
                let modes: Vec<String> = EncoderMode::ALL
                    .iter()
                    .map(|m| {
                        if *m == highlighted[slot] {
                            format!("[{}]", m.label())
                        } else {
                            m.label().to_string()
                        }
                    })
                    .collect();
                lines.push(format!("enc{}: {}", slot + 1, modes.join(" ")));
            }
        }
        ScreenState::Rgb { row, staged } => {
            let mark = |r: RgbRow| if r == *row { '>' } else { ' ' };
            lines.push(format!("{} theme      {}", mark(RgbRow::Theme), staged.theme.label()));
            lines.push(format!("{} accent     {}", mark(RgbRow::Accent), staged.accent.label()));
            lines.push(format!("{} brightness {}%", mark(RgbRow::Brightness), staged.brightness));
        }
    }
    lines
}

impl Renderer for Tui {
    fn show_screen(&mut self, screen: ScreenId, view: RouterView<'_>) {
        self.body = screen_lines(screen, &view);
        self.overlay = None;
    }

    fn show_overlay(&mut self, message: &str, duration_ms: u64) {
        self.overlay = Some(format!("{} ({} ms)", message, duration_ms));
    }

    fn notify_key_highlight(&mut self, index: u8, until_ms: u64) {
        if (index as usize) < NUM_MACRO_KEYS {
            self.highlight = Some(format!("key {} lit until {} ms", index + 1, until_ms));
        }
    }
}

fn to_sim_key(key: KeyEvent) -> Option<SimKey> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(SimKey::Esc);
    }
    match key.code {
        KeyCode::Char(c) => Some(SimKey::Char(c)),
        KeyCode::Up => Some(SimKey::Up),
        KeyCode::Down => Some(SimKey::Down),
        KeyCode::Left => Some(SimKey::Left),
        KeyCode::Right => Some(SimKey::Right),
        KeyCode::Enter => Some(SimKey::Enter),
        KeyCode::Esc => Some(SimKey::Esc),
        KeyCode::F(n) => Some(SimKey::F(n)),
        _ => None,
    }
}

fn drain_reports(router: &mut HostRouter, tui: &mut Tui) {
    while let Some(frame) = router.link_mut().pop() {
        if let Some(report) = OutboundReport::decode(&frame) {
            tui.push_report(&report);
        }
    }
}

fn after_dispatch(router: &mut HostRouter, tui: &mut Tui, outcome: &RouterOutcome) {
    router.present(outcome, tui);
    drain_reports(router, tui);
}

fn run(tui: &mut Tui) -> Result<()> {
    let start = Instant::now();
    let now_ms = || start.elapsed().as_millis() as u64;

    let mut router: HostRouter = Router::with_defaults(
        ProfileCache::new(),
        ReportQueue::new(OverflowPolicy::DropOldest),
    );
    router.note(now_ms(), "Simulator Started");
    let profile = format!("Profile: {}", router.state().current_profile());
    router.note(now_ms(), &profile);
    router.note(now_ms(), "Ready");

    tui.show_screen(router.current_screen(), router.view());
    tui.sync_debug(&router);
    tui.draw()?;

    loop {
        if !event::poll(Duration::from_millis(TICK_PERIOD_MS))? {
            let tick = router.tick(now_ms());
            if !tick.is_idle() {
                router.present_tick(&tick, tui);
                tui.highlight = None;
                tui.draw()?;
            }
            continue;
        }

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        let Some(action) = to_sim_key(key).and_then(map_key) else {
            continue;
        };

        match action {
            KeyAction::Quit => return Ok(()),
            KeyAction::Menu(target) => {
                let outcome = router.open_menu(target, now_ms());
                after_dispatch(&mut router, tui, &outcome);
            }
            KeyAction::Input(event) => {
                let outcome = router.dispatch(event, now_ms());
                after_dispatch(&mut router, tui, &outcome);
                if let Some(release) = release_for(event) {
                    let outcome = router.dispatch(release, now_ms());
                    after_dispatch(&mut router, tui, &outcome);
                }
            }
        }

        tui.sync_debug(&router);
        tui.draw()?;
    }
}

fn main() -> Result<()> {
    let mut tui = Tui::setup()?;
    let result = run(&mut tui);
    tui.teardown();
    result
}

//! ST7789 panel driver setup and screen drawing.
//!
//! The panel is 172×320 in portrait. Every screen shares the same frame:
//!
//! ```text
//! +----------------------+  0
//! | Title            P3  |
//! +----------------------+  24
//! |                      |
//! |  screen body         |
//! |                      |
//! +----------------------+  280
//! | last 3 debug lines   |
//! +----------------------+  320
//! ```

use core::fmt::Write;

use embedded_graphics::mono_font::ascii::{FONT_10X20, FONT_6X10};
use embedded_graphics::mono_font::{MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Alignment, Text};
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;
use heapless::String;
use mipidsi::interface::SpiInterface;
use mipidsi::models::ST7789;
use mipidsi::options::ColorInversion;
use mipidsi::Builder;
use padcore::config::{
    DEBUG_PANEL_LINES, DISPLAY_HEIGHT, DISPLAY_WIDTH, DISPLAY_X_OFFSET, NUM_ENCODERS,
    NUM_MACRO_KEYS, PROFILE_MAX, PROFILE_MIN,
};
use padcore::navigation::{RgbRow, RgbStaging, ScreenState};
use padcore::router::RouterView;
use padcore::state::{DeviceState, EncoderMode, LedColor, Theme};
use padcore::{Error, Renderer, ScreenId};

/// Concrete panel type produced by [`init`].
pub type Panel<SPI, DC, RST> = mipidsi::Display<SpiInterface<'static, SPI, DC>, ST7789, RST>;

const WIDTH: i32 = DISPLAY_WIDTH as i32;
const HEADER_HEIGHT: i32 = 24;
const BODY_TOP: i32 = HEADER_HEIGHT + 12;
const FOOTER_TOP: i32 = 280;
const LINE_HEIGHT: i32 = 12;

// Key grid: 5 columns × 2 rows, matching the physical layout.
const GRID_COLS: i32 = 5;
const CELL_W: i32 = 34;
const CELL_H: i32 = 40;
const GRID_LEFT: i32 = (WIDTH - GRID_COLS * CELL_W) / 2;
const GRID_TOP: i32 = BODY_TOP - 6;

/// Reset and configure the ST7789.
pub fn init<SPI, DC, RST>(
    spi: SPI,
    dc: DC,
    rst: RST,
    buffer: &'static mut [u8],
) -> Result<Panel<SPI, DC, RST>, Error>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
{
    let interface = SpiInterface::new(spi, dc, buffer);
    let mut delay = embassy_time::Delay;
    Builder::new(ST7789, interface)
        .display_size(DISPLAY_WIDTH, DISPLAY_HEIGHT)
        .display_offset(DISPLAY_X_OFFSET, 0)
        .invert_colors(ColorInversion::Inverted)
        .reset_pin(rst)
        .init(&mut delay)
        .map_err(|_| Error::Display)
}

fn rgb565(color: LedColor) -> Rgb565 {
    Rgb565::new(color.r >> 3, color.g >> 2, color.b >> 3)
}

#[derive(Clone, Copy)]
struct Palette {
    background: Rgb565,
    foreground: Rgb565,
    muted: Rgb565,
    accent: Rgb565,
}

impl Palette {
    fn for_state(state: &DeviceState) -> Self {
        let accent = rgb565(state.accent().rgb());
        match state.theme() {
            Theme::Dark => Self {
                background: Rgb565::BLACK,
                foreground: Rgb565::WHITE,
                muted: Rgb565::CSS_GRAY,
                accent,
            },
            Theme::Light => Self {
                background: Rgb565::WHITE,
                foreground: Rgb565::BLACK,
                muted: Rgb565::CSS_DIM_GRAY,
                accent,
            },
        }
    }

    fn small(&self, color: Rgb565) -> MonoTextStyle<'static, Rgb565> {
        MonoTextStyleBuilder::new()
            .font(&FONT_6X10)
            .text_color(color)
            .build()
    }

    fn large(&self, color: Rgb565) -> MonoTextStyle<'static, Rgb565> {
        MonoTextStyleBuilder::new()
            .font(&FONT_10X20)
            .text_color(color)
            .build()
    }
}

fn key_cell(index: usize) -> Rectangle {
    let col = index as i32 % GRID_COLS;
    let row = index as i32 / GRID_COLS;
    Rectangle::new(
        Point::new(GRID_LEFT + col * CELL_W + 1, GRID_TOP + row * CELL_H + 1),
        Size::new(CELL_W as u32 - 2, CELL_H as u32 - 2),
    )
}

/// `Renderer` over any Rgb565 draw target.
///
/// Draw errors are ignored: a dropped frame is repainted on the next
/// change, and the router must never stall on the panel.
pub struct PanelRenderer<D> {
    display: D,
    palette: Palette,
}

impl<D> PanelRenderer<D>
where
    D: DrawTarget<Color = Rgb565>,
{
    pub fn new(display: D) -> Self {
        Self {
            display,
            palette: Palette::for_state(&DeviceState::default()),
        }
    }

    fn text(&mut self, s: &str, x: i32, y: i32, style: MonoTextStyle<'static, Rgb565>) {
        let _ = Text::new(s, Point::new(x, y), style).draw(&mut self.display);
    }

    fn draw_header(&mut self, screen: ScreenId, state: &DeviceState) {
        let p = self.palette;
        let _ = Rectangle::new(Point::zero(), Size::new(WIDTH as u32, HEADER_HEIGHT as u32))
            .into_styled(PrimitiveStyle::with_fill(p.accent))
            .draw(&mut self.display);
        self.text(screen.label(), 6, 17, p.large(p.background));

        let mut profile: String<4> = String::new();
        let _ = write!(profile, "P{}", state.current_profile());
        let _ = Text::with_alignment(
            profile.as_str(),
            Point::new(WIDTH - 6, 17),
            p.large(p.background),
            Alignment::Right,
        )
        .draw(&mut self.display);
    }

    fn draw_footer(&mut self, view: &RouterView<'_>) {
        let p = self.palette;
        let _ = Rectangle::new(Point::new(0, FOOTER_TOP - 4), Size::new(WIDTH as u32, 1))
            .into_styled(PrimitiveStyle::with_fill(p.muted))
            .draw(&mut self.display);

        let mut y = FOOTER_TOP + 8;
        for entry in view.log.last(DEBUG_PANEL_LINES) {
            let _ = Text::new(entry.message(), Point::new(4, y), p.small(p.muted))
                .draw(&mut self.display);
            y += LINE_HEIGHT;
        }
    }

    fn draw_home(&mut self, state: &DeviceState) {
        let p = self.palette;
        let mut line: String<28> = String::new();

        let mic = if state.mic_muted() { "Mic: MUTED" } else { "Mic: ON" };
        let mic_color = if state.mic_muted() { p.accent } else { p.foreground };
        self.text(mic, 6, BODY_TOP + 10, p.large(mic_color));

        let _ = write!(line, "Volume  {:>3}%", state.volume());
        self.text(&line, 6, BODY_TOP + 44, p.small(p.foreground));
        line.clear();
        let _ = write!(line, "Mic lvl {:>3}%", state.mic_level());
        self.text(&line, 6, BODY_TOP + 44 + LINE_HEIGHT, p.small(p.foreground));

        for slot in 0..NUM_ENCODERS {
            line.clear();
            let _ = write!(line, "Enc{}: {}", slot + 1, state.encoder_mode(slot).label());
            let y = BODY_TOP + 88 + slot as i32 * LINE_HEIGHT;
            self.text(&line, 6, y, p.small(p.foreground));
        }

        self.text("Enc1 push: profiles", 6, FOOTER_TOP - 30, p.small(p.muted));
        self.text("[ ] profile  M mic", 6, FOOTER_TOP - 18, p.small(p.muted));
    }

    fn draw_profiles(&mut self, state: &DeviceState, pending: u8) {
        let p = self.palette;
        let mut line: String<16> = String::new();

        for (row, profile) in (PROFILE_MIN..=PROFILE_MAX).enumerate() {
            line.clear();
            let cursor = if profile == pending { '>' } else { ' ' };
            let active = if profile == state.current_profile() { '*' } else { ' ' };
            let _ = write!(line, "{} Profile {} {}", cursor, profile, active);
            let color = if profile == pending { p.accent } else { p.foreground };
            let y = BODY_TOP + 6 + row as i32 * 24;
            self.text(&line, 6, y, p.large(color));
        }
    }

    fn draw_macros(&mut self, view: &RouterView<'_>, cursor: u8) {
        let p = self.palette;
        let state = view.state;

        for index in 0..NUM_MACRO_KEYS {
            let cell = key_cell(index);
            let lit = view.highlights[index].is_some();
            let style = if lit {
                PrimitiveStyle::with_fill(p.accent)
            } else {
                PrimitiveStyle::with_stroke(rgb565(state.key(index).color), 1)
            };
            let _ = cell.into_styled(style).draw(&mut self.display);

            let label: &str = state.key(index).label.as_str();
            let short = label.get(..label.len().min(5)).unwrap_or(label);
            let color = if lit { p.background } else { p.foreground };
            let _ = Text::with_alignment(
                short,
                cell.center() + Point::new(0, 3),
                p.small(color),
                Alignment::Center,
            )
            .draw(&mut self.display);
        }

        let mut line: String<32> = String::new();
        let mut y = GRID_TOP + 2 * CELL_H + 20;
        let slot = state.key(cursor as usize);
        let _ = write!(line, "> K{} {} #{}", cursor + 1, slot.label, slot.macro_id);
        self.text(&line, 6, y, p.small(p.accent));

        y += LINE_HEIGHT * 2;
        line.clear();
        match view.last_key {
            Some(key) => {
                let _ = write!(line, "Last: K{}", key + 1);
            }
            None => {
                let _ = line.push_str("Last: -");
            }
        }
        self.text(&line, 6, y, p.small(p.foreground));
    }

    fn draw_encoders(&mut self, state: &DeviceState, highlighted: &[EncoderMode; NUM_ENCODERS]) {
        let p = self.palette;
        let mut line: String<28> = String::new();

        for slot in 0..NUM_ENCODERS {
            let top = BODY_TOP + slot as i32 * 110;
            line.clear();
            let _ = write!(line, "Encoder {}", slot + 1);
            self.text(&line, 6, top, p.large(p.foreground));

            for (row, mode) in EncoderMode::ALL.iter().enumerate() {
                line.clear();
                let cursor = if *mode == highlighted[slot] { '>' } else { ' ' };
                let active = if *mode == state.encoder_mode(slot) { '*' } else { ' ' };
                let _ = write!(line, "{} {} {}", cursor, mode.label(), active);
                let color = if *mode == highlighted[slot] { p.accent } else { p.foreground };
                let y = top + 18 + row as i32 * LINE_HEIGHT;
                self.text(&line, 12, y, p.small(color));
            }
        }
    }

    fn draw_rgb(&mut self, row: RgbRow, staged: &RgbStaging) {
        let p = self.palette;
        let mut line: String<28> = String::new();
        let rows = [
            (RgbRow::Theme, "Theme"),
            (RgbRow::Accent, "Accent"),
            (RgbRow::Brightness, "Bright"),
        ];

        for (i, (r, name)) in rows.iter().enumerate() {
            line.clear();
            let cursor = if *r == row { '>' } else { ' ' };
            let _ = match r {
                RgbRow::Theme => write!(line, "{} {:<7}{}", cursor, name, staged.theme.label()),
                RgbRow::Accent => write!(line, "{} {:<7}{}", cursor, name, staged.accent.label()),
                RgbRow::Brightness => {
                    write!(line, "{} {:<7}{}%", cursor, name, staged.brightness)
                }
            };
            let color = if *r == row { p.accent } else { p.foreground };
            self.text(&line, 6, BODY_TOP + 6 + i as i32 * 28, p.large(color));
        }

        let swatch = Rectangle::new(Point::new(6, BODY_TOP + 100), Size::new(WIDTH as u32 - 12, 24));
        let _ = swatch
            .into_styled(PrimitiveStyle::with_fill(rgb565(staged.accent.rgb())))
            .draw(&mut self.display);
        self.text("NEXT applies, PREV drops", 6, FOOTER_TOP - 18, p.small(p.muted));
    }
}

impl<D> Renderer for PanelRenderer<D>
where
    D: DrawTarget<Color = Rgb565>,
{
    fn show_screen(&mut self, screen: ScreenId, view: RouterView<'_>) {
        self.palette = Palette::for_state(view.state);
        let _ = self.display.clear(self.palette.background);

        self.draw_header(screen, view.state);
        match view.screen {
            ScreenState::Home => self.draw_home(view.state),
            ScreenState::Profiles { pending } => self.draw_profiles(view.state, *pending),
            ScreenState::Macros { cursor } => self.draw_macros(&view, *cursor),
            ScreenState::Encoders { highlighted } => self.draw_encoders(view.state, highlighted),
            ScreenState::Rgb { row, staged } => self.draw_rgb(*row, staged),
        }
        self.draw_footer(&view);
    }

    fn show_overlay(&mut self, message: &str, _duration_ms: u64) {
        let p = self.palette;
        let frame = Rectangle::new(Point::new(8, 120), Size::new(WIDTH as u32 - 16, 56));
        let _ = frame
            .into_styled(PrimitiveStyle::with_fill(p.accent))
            .draw(&mut self.display);
        let _ = Text::with_alignment(
            message,
            frame.center() + Point::new(0, 6),
            p.large(p.background),
            Alignment::Center,
        )
        .draw(&mut self.display);
    }

    fn notify_key_highlight(&mut self, index: u8, _until_ms: u64) {
        if index as usize >= NUM_MACRO_KEYS {
            return;
        }
        let p = self.palette;
        let _ = key_cell(index as usize)
            .into_styled(PrimitiveStyle::with_stroke(p.accent, 2))
            .draw(&mut self.display);
    }
}

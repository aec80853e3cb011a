//! Application-wide constants and compile-time configuration.
//!
//! Device geometry, timing parameters, protocol constants and hardware
//! pin notes live here so they can be tuned in one place.

// Device geometry

/// Macro keys, laid out as a 2x5 grid:
///
/// ```text
/// [0] [1] [2] [3] [4]
/// [5] [6] [7] [8] [9]
/// ```
pub const NUM_MACRO_KEYS: usize = 10;

/// Rotary encoders, each with a push button.
pub const NUM_ENCODERS: usize = 2;

/// Auxiliary tact buttons (mic mute, prev, next).
pub const NUM_AUX_BUTTONS: usize = 3;

// Profiles

pub const PROFILE_MIN: u8 = 1;
pub const PROFILE_MAX: u8 = 8;

/// Number of profile slots kept by the persistence cache.
pub const PROFILE_COUNT: usize = PROFILE_MAX as usize;

// Percentage-like device values

pub const PERCENT_MAX: u8 = 100;

/// Brightness change per encoder detent on the RGB screen.
pub const BRIGHTNESS_STEP: u8 = 10;

/// Change per encoder detent for volume / mic level on Home.
pub const VALUE_STEP: u8 = 1;

// Timing (milliseconds)

/// How long a pressed key stays highlighted on the Macros screen.
pub const KEY_HIGHLIGHT_MS: u64 = 500;

/// How long a quick overlay stays up before reverting.
pub const OVERLAY_DURATION_MS: u64 = 1_500;

/// Period of the housekeeping tick (highlight/overlay expiry, redraw).
pub const TICK_PERIOD_MS: u64 = 20;

/// Button and key debounce time.
pub const BUTTON_DEBOUNCE_MS: u64 = 20;

/// Encoder pin sampling period.
pub const ENCODER_POLL_MS: u64 = 1;

/// Quadrature transitions per mechanical detent.
pub const ENCODER_TRANSITIONS_PER_STEP: i8 = 4;

// Host report protocol

/// Fixed size of every frame sent to the host.
pub const REPORT_SIZE: usize = 64;

/// Report ID carried in byte 0 of every frame.
pub const REPORT_ID: u8 = 0x01;

/// Depth of the outbound report queue between the router and the USB task.
pub const REPORT_QUEUE_DEPTH: usize = 16;

/// Depth of the logical input channel feeding the router task.
pub const INPUT_QUEUE_DEPTH: usize = 16;

// Diagnostics

/// Debug ring capacity.
pub const DEBUG_LOG_CAPACITY: usize = 32;

/// Maximum bytes stored per debug message (longer messages are truncated).
pub const DEBUG_MESSAGE_LEN: usize = 64;

/// Lines shown on the debug panel.
pub const DEBUG_PANEL_LINES: usize = 3;

// Text capacities

pub const KEY_LABEL_LEN: usize = 16;
pub const OVERLAY_MESSAGE_LEN: usize = 24;

// Display (ST7789, 1.47", portrait)

pub const DISPLAY_WIDTH: u16 = 172;
pub const DISPLAY_HEIGHT: u16 = 320;

/// Column offset of the 172-pixel panel inside the controller's 240-pixel RAM.
pub const DISPLAY_X_OFFSET: u16 = 34;

// USB

/// USB VID/PID - use the "pid.codes" open-source test VID.
/// Replace with your own allocated VID/PID for production.
pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0x0002;

/// USB device strings.
pub const USB_MANUFACTURER: &str = "padcore";
pub const USB_PRODUCT: &str = "Macro Pad";
pub const USB_SERIAL_NUMBER: &str = "000001";

/// USB HID polling interval (ms).
pub const USB_HID_POLL_MS: u8 = 1;

// GPIO pin assignments (nRF52840-DK header)
//
// These are logical names; actual `embassy_nrf::peripherals::*` types are
// selected in `main.rs`.  Adjust for your custom PCB.
//
//   Macro keys 0-9   → P0.02 P0.03 P0.04 P0.05 P0.28 P0.29 P0.30 P0.31 P1.01 P1.02
//   Encoder 0 A/B/SW → P1.03 P1.04 P1.05
//   Encoder 1 A/B/SW → P1.06 P1.07 P1.08
//   Mic / Prev / Next → P0.11 P0.12 P0.24
//   Display SPI      → SCK P0.19, MOSI P0.20, CS P0.21, DC P0.22, RST P0.23, BL P0.13

// Profile storage

/// Flash page index where profile storage starts (4 KB per page on nRF52840).
pub const STORAGE_FLASH_PAGE_START: u32 = 240;

/// Number of flash pages reserved for profile storage.
pub const STORAGE_FLASH_PAGE_COUNT: u32 = 4;

/// Quiet time after the last profile change before dirty profiles are
/// written to flash.
pub const STORAGE_SAVE_DEBOUNCE_MS: u64 = 2_000;

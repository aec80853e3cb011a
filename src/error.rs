//! Unified error types for padcore.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` for efficient on-target logging.

use core::fmt;

/// Top-level error type used across the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A logical input event violated the driver contract.
    Input(InputError),

    /// The host link refused a report.
    Link(LinkError),

    // Storage
    /// Flash read/write/erase failed.
    Storage,

    // Display
    /// SPI transaction to the panel failed.
    Display,

    // USB
    /// USB stack returned an error.
    Usb,
}

/// Contract violations detected before dispatch.
///
/// These never mutate state; the router logs them and moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputError {
    /// Macro key index outside `0..NUM_MACRO_KEYS`.
    KeyOutOfRange(u8),
    /// Encoder id outside `0..NUM_ENCODERS`.
    EncoderOutOfRange(u8),
    /// A menu target was requested away from the Home screen.
    MenuUnavailable,
}

/// Outcome of handing a frame to the host link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// The bounded queue was full and the policy dropped the new frame.
    QueueFull,
    /// The host is not attached / not configured.
    Disconnected,
}

// Convenience conversions

impl From<InputError> for Error {
    fn from(e: InputError) -> Self {
        Error::Input(e)
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Error::Link(e)
    }
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::KeyOutOfRange(index) => write!(f, "key {} out of range", index),
            InputError::EncoderOutOfRange(id) => write!(f, "encoder {} out of range", id),
            InputError::MenuUnavailable => f.write_str("menu only from Home"),
        }
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::QueueFull => f.write_str("report queue full"),
            LinkError::Disconnected => f.write_str("host disconnected"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Input(e) => write!(f, "input: {}", e),
            Error::Link(e) => write!(f, "link: {}", e),
            Error::Storage => f.write_str("storage failure"),
            Error::Display => f.write_str("display failure"),
            Error::Usb => f.write_str("usb failure"),
        }
    }
}

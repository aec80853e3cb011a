//! Control core for a 10-key / 2-encoder macro pad.
//!
//! This library holds everything that can run without hardware: the
//! input event router, the screen navigation state machine, the device
//! state store, the 64-byte host report protocol and the debug ring.
//! The firmware binary (`main.rs`) and the terminal simulator
//! (`bin/simulator.rs`) are thin shells around it.
//!
//! Usage: `cargo test` on the host, no features needed.
//!
//! Note: The embedded binary uses main.rs with #![no_std] and #![no_main].
//! With the `defmt` feature the library logs through `defmt`; without it
//! the logging macros compile to nothing.

#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible to every module.
#[macro_use]
mod fmt;

// ═══════════════════════════════════════════════════════════════════════════
// Foundations
// ═══════════════════════════════════════════════════════════════════════════

pub mod config;
pub mod error;
pub mod input;
pub mod quadrature;

// ═══════════════════════════════════════════════════════════════════════════
// State & Navigation
// ═══════════════════════════════════════════════════════════════════════════

pub mod navigation;
pub mod persistence;
pub mod state;

// ═══════════════════════════════════════════════════════════════════════════
// Host Protocol & Diagnostics
// ═══════════════════════════════════════════════════════════════════════════

pub mod debug_log;
pub mod link;
pub mod report;

// ═══════════════════════════════════════════════════════════════════════════
// Router
// ═══════════════════════════════════════════════════════════════════════════

pub mod keymap;
pub mod router;

pub use error::{Error, InputError, LinkError};
pub use input::{AuxButton, Direction, Edge, InputProvider, LogicalInputEvent, ScriptedInput};
pub use link::{HostLink, OverflowPolicy, ReportQueue};
pub use navigation::{MenuTarget, ScreenId};
pub use persistence::{ProfileCache, ProfileStore};
pub use report::{OutboundReport, ReportFrame};
pub use router::{HostRouter, Renderer, Router, RouterConfig, RouterOutcome, TickOutcome};
pub use state::DeviceState;

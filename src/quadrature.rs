//! Quadrature decoding and poll-based debouncing.
//!
//! Pure state machines fed with pin levels by the firmware's encoder
//! task, so they can be exercised on the host.

use crate::config::ENCODER_TRANSITIONS_PER_STEP;
use crate::input::{Direction, Edge};

// Quadrature transition table for previous/current AB state.
// Index: (prev << 2) | curr, values are +1/-1 for valid transitions.
const QUADRATURE_TRANSITIONS: [i8; 16] = [0, -1, 1, 0, 1, 0, 0, -1, -1, 0, 0, 1, 0, 1, -1, 0];

const fn ab_from_levels(a_high: bool, b_high: bool) -> u8 {
    ((a_high as u8) << 1) | b_high as u8
}

/// Turns A/B pin samples into detents.
#[derive(Clone, Copy, Debug)]
pub struct QuadratureDecoder {
    prev_ab: u8,
    accum: i8,
    transitions_per_step: i8,
    inverted: bool,
}

impl QuadratureDecoder {
    /// Start from the current pin levels.
    pub const fn new(a_high: bool, b_high: bool) -> Self {
        Self {
            prev_ab: ab_from_levels(a_high, b_high),
            accum: 0,
            transitions_per_step: ENCODER_TRANSITIONS_PER_STEP,
            inverted: false,
        }
    }

    pub const fn with_transitions_per_step(mut self, transitions: i8) -> Self {
        self.transitions_per_step = if transitions < 1 { 1 } else { transitions };
        self
    }

    /// Swap CW and CCW, for encoders wired the other way round.
    pub const fn inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    /// Feed one sample. Returns a direction once a full detent has been
    /// accumulated; invalid (skipped) transitions count as zero.
    pub fn update(&mut self, a_high: bool, b_high: bool) -> Option<Direction> {
        let curr_ab = ab_from_levels(a_high, b_high);
        if curr_ab == self.prev_ab {
            return None;
        }

        let index = ((self.prev_ab << 2) | curr_ab) as usize;
        self.prev_ab = curr_ab;
        self.accum = self.accum.saturating_add(QUADRATURE_TRANSITIONS[index]);

        let positive = if self.accum >= self.transitions_per_step {
            true
        } else if self.accum <= -self.transitions_per_step {
            false
        } else {
            return None;
        };
        self.accum = 0;

        Some(if positive != self.inverted {
            Direction::Cw
        } else {
            Direction::Ccw
        })
    }
}

/// Poll-count debouncer for a push button.
#[derive(Clone, Copy, Debug)]
pub struct Debouncer {
    raw: bool,
    stable: bool,
    stable_count: u8,
    threshold: u8,
}

impl Debouncer {
    /// `threshold` consecutive identical samples make a level stable.
    pub const fn new(pressed: bool, threshold: u8) -> Self {
        Self {
            raw: pressed,
            stable: pressed,
            stable_count: 0,
            threshold: if threshold == 0 { 1 } else { threshold },
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.stable
    }

    /// Feed one sample; yields an edge when the stable level flips.
    pub fn update(&mut self, pressed: bool) -> Option<Edge> {
        if pressed == self.raw {
            self.stable_count = self.stable_count.saturating_add(1);
        } else {
            self.raw = pressed;
            self.stable_count = 0;
        }

        if self.stable_count < self.threshold || self.stable == self.raw {
            return None;
        }
        self.stable = self.raw;
        Some(if self.stable {
            Edge::Pressed
        } else {
            Edge::Released
        })
    }
}

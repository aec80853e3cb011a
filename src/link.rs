//! Host link seam.
//!
//! The router hands every encoded frame to a `HostLink` and moves on; the
//! link owns flow control. On target the link is a `try_send` into the
//! Embassy channel drained by the USB writer task. On the host it is a
//! `ReportQueue`, a bounded deque with an explicit overflow policy.

use heapless::Deque;

use crate::config::REPORT_QUEUE_DEPTH;
use crate::error::LinkError;
use crate::report::ReportFrame;

/// Non-blocking sink for outbound frames.
pub trait HostLink {
    /// Hand a frame over. Must never block.
    fn enqueue(&mut self, frame: ReportFrame) -> Result<(), LinkError>;
}

impl<T: HostLink + ?Sized> HostLink for &mut T {
    fn enqueue(&mut self, frame: ReportFrame) -> Result<(), LinkError> {
        (**self).enqueue(frame)
    }
}

/// What to do when the queue is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OverflowPolicy {
    /// Evict the oldest queued frame and accept the new one.
    #[default]
    DropOldest,
    /// Keep the queue as is and refuse the new frame.
    DropNewest,
}

/// Bounded FIFO of outbound frames.
pub struct ReportQueue<const N: usize = REPORT_QUEUE_DEPTH> {
    frames: Deque<ReportFrame, N>,
    policy: OverflowPolicy,
    dropped: u32,
    connected: bool,
}

impl<const N: usize> Default for ReportQueue<N> {
    fn default() -> Self {
        Self::new(OverflowPolicy::default())
    }
}

impl<const N: usize> ReportQueue<N> {
    pub const fn new(policy: OverflowPolicy) -> Self {
        Self {
            frames: Deque::new(),
            policy,
            dropped: 0,
            connected: true,
        }
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Next frame for the transport, oldest first.
    pub fn pop(&mut self) -> Option<ReportFrame> {
        self.frames.pop_front()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames lost to overflow since creation.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Mark the host as attached or detached. A detached queue refuses
    /// frames without touching its contents.
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReportFrame> {
        self.frames.iter()
    }
}

impl<const N: usize> HostLink for ReportQueue<N> {
    fn enqueue(&mut self, frame: ReportFrame) -> Result<(), LinkError> {
        if !self.connected {
            return Err(LinkError::Disconnected);
        }
        if self.frames.is_full() {
            self.dropped = self.dropped.saturating_add(1);
            match self.policy {
                OverflowPolicy::DropNewest => {
                    warn!("report queue full, dropping newest frame");
                    return Err(LinkError::QueueFull);
                }
                OverflowPolicy::DropOldest => {
                    warn!("report queue full, dropping oldest frame");
                    self.frames.pop_front();
                }
            }
        }
        // Cannot fail: a slot was either free or just evicted.
        let _ = self.frames.push_back(frame);
        Ok(())
    }
}

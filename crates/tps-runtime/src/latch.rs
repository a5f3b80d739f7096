//! Interrupt decision latch.
//!
//! The INT falling-edge handler decides on the spot whether the edge should
//! kill, using only values published by the poll loop, and parks the verdict
//! in a single-slot mailbox. The poll loop drains the mailbox under a
//! critical section and does all pin work itself.
//!
//! # Shared state
//!
//! ```text
//! ┌───────────────────────────────┐   ┌───────────────────────────────┐
//! │ EventSlot (handler → loop)    │   │ DecisionInputs (loop → handler)│
//! │  pending  : AtomicBool        │   │  reset_high_since : Option<ms> │
//! │  kill     : AtomicBool        │   │  inhibit_active   : AtomicBool │
//! │  fired_at : AtomicU32         │   │                               │
//! └───────────────────────────────┘   └───────────────────────────────┘
//! ```
//!
//! A second edge before the drain overwrites the slot; only the latest
//! verdict matters.

use crate::critical::CriticalSection;
use crate::debounce::Debounce;
use crate::platform::{EdgeHandler, Platform};
use crate::reset_history::held_for_at_least;
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tps_common::time::{AtomicTimestamp, Millis};

/// Pure kill decision for an accepted INT edge.
///
/// Kill only if RESET has been high for at least `reset_high_min_ms` right
/// before `now` and no inhibit window is open.
#[inline]
#[must_use]
pub fn decide(
    now: Millis,
    reset_high_since: Option<Millis>,
    inhibit_active: bool,
    reset_high_min_ms: u32,
) -> bool {
    !inhibit_active && held_for_at_least(reset_high_since, now, reset_high_min_ms)
}

/// A verdict drained from the latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptEvent {
    /// Whether the edge qualified for a kill.
    pub kill: bool,
    /// Clock value when the edge was handled.
    pub fired_at: Millis,
}

#[derive(Debug, Default)]
struct EventSlot {
    pending: AtomicBool,
    kill: AtomicBool,
    fired_at: AtomicU32,
}

#[derive(Debug, Default)]
struct DecisionInputs {
    reset_high_since: AtomicTimestamp,
    inhibit_active: AtomicBool,
}

/// State shared between the interrupt handler and the poll loop.
#[derive(Debug, Default)]
pub struct LatchShared {
    event: CachePadded<EventSlot>,
    inputs: CachePadded<DecisionInputs>,
}

static_assertions::assert_impl_all!(LatchShared: Send, Sync);

impl LatchShared {
    /// Create an empty latch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the RESET history for the handler.
    pub fn publish_reset_high_since(&self, since: Option<Millis>) {
        self.inputs.reset_high_since.store(since, Ordering::Release);
    }

    /// Publish whether the inhibit window is open.
    pub fn publish_inhibit(&self, active: bool) {
        self.inputs.inhibit_active.store(active, Ordering::Release);
    }

    /// Whether a verdict is waiting. Does not consume it.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.event.pending.load(Ordering::Acquire)
    }

    /// Record a verdict. Called from interrupt context only.
    fn record(&self, kill: bool, now: Millis) {
        self.event.kill.store(kill, Ordering::Relaxed);
        self.event.fired_at.store(now.as_u32(), Ordering::Relaxed);
        // Publishes the two stores above
        self.event.pending.store(true, Ordering::Release);
    }

    /// Drain the pending verdict, if any, with interrupts masked.
    ///
    /// The mask prevents a new edge from landing between reading the
    /// decision and clearing the pending flag.
    pub fn take<P: Platform + ?Sized>(&self, platform: &P) -> Option<InterruptEvent> {
        if !self.is_pending() {
            return None;
        }
        let _cs = CriticalSection::enter(platform);
        if !self.event.pending.swap(false, Ordering::AcqRel) {
            return None;
        }
        Some(InterruptEvent {
            kill: self.event.kill.load(Ordering::Relaxed),
            fired_at: Millis(self.event.fired_at.load(Ordering::Relaxed)),
        })
    }
}

/// The INT falling-edge handler.
///
/// Owns the debounce filter; it is the only writer of that state.
#[derive(Debug)]
pub struct InterruptLatch {
    shared: Arc<LatchShared>,
    debounce: Debounce,
    reset_high_min_ms: u32,
}

impl InterruptLatch {
    /// Create a handler bound to `shared`.
    #[must_use]
    pub fn new(shared: Arc<LatchShared>, int_debounce_ms: u32, reset_high_min_ms: u32) -> Self {
        Self {
            shared,
            debounce: Debounce::new(int_debounce_ms),
            reset_high_min_ms,
        }
    }

    /// Handle one falling edge at `now`.
    ///
    /// Returns the recorded decision, or `None` if the edge was debounced.
    pub fn on_falling_edge(&mut self, now: Millis) -> Option<bool> {
        if !self.debounce.accept(now) {
            return None;
        }
        let since = self.shared.inputs.reset_high_since.load(Ordering::Acquire);
        let inhibit = self.shared.inputs.inhibit_active.load(Ordering::Acquire);
        let kill = decide(now, since, inhibit, self.reset_high_min_ms);
        self.shared.record(kill, now);
        Some(kill)
    }

    /// Box the handler for [`Platform::on_falling_edge`].
    #[must_use]
    pub fn into_handler(mut self) -> EdgeHandler {
        Box::new(move |now| {
            let _ = self.on_falling_edge(now);
        })
    }
}

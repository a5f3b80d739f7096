//! Simulated platform for testing and host runs.
//!
//! Provides a virtual millisecond clock that only advances inside
//! [`Platform::sleep`], scheduled input stimuli, and a per-pin record of
//! effective line levels. Falling edges that arrive while interrupts are
//! masked are latched per pin and delivered when interrupts are unmasked,
//! like a GPIO pending bit.

use crate::platform::{EdgeHandler, Pin, Platform, PinMode};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;
use tps_common::error::{SupervisorError, SupervisorResult};
use tps_common::time::Millis;
use tracing::trace;

/// An external event applied to the simulated pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stimulus {
    /// Drive an input pin to a level.
    Level {
        /// Target pin.
        pin: Pin,
        /// New level.
        high: bool,
    },
    /// Produce a falling edge on a pin.
    FallingEdge {
        /// Target pin.
        pin: Pin,
    },
}

#[derive(Debug, Default)]
struct SimPin {
    mode: PinMode,
    /// Output latch, used in [`PinMode::Output`].
    latch: bool,
    /// Level applied from outside the MCU.
    external: bool,
    history: Vec<(Millis, bool)>,
}

impl SimPin {
    fn line_level(&self) -> bool {
        match self.mode {
            PinMode::Output => self.latch,
            PinMode::InputPullUp => true,
            PinMode::Input => self.external,
        }
    }
}

/// In-memory [`Platform`] with a virtual clock.
pub struct SimulatedPlatform {
    origin: Millis,
    /// Virtual milliseconds since the simulation started.
    elapsed: u64,
    pace: bool,
    pins: BTreeMap<Pin, SimPin>,
    schedule: BTreeMap<(u64, u64), Stimulus>,
    next_seq: u64,
    handlers: RefCell<BTreeMap<Pin, EdgeHandler>>,
    interrupts_enabled: Cell<bool>,
    deferred: RefCell<BTreeSet<Pin>>,
    edges_delivered: Cell<u64>,
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SimulatedPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedPlatform")
            .field("now", &self.now())
            .field("elapsed", &self.elapsed)
            .field("pending_stimuli", &self.schedule.len())
            .field("interrupts_enabled", &self.interrupts_enabled.get())
            .finish_non_exhaustive()
    }
}

impl SimulatedPlatform {
    /// Create a platform whose clock starts at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(Millis::ZERO)
    }

    /// Create a platform whose clock starts at `origin`.
    ///
    /// Useful for exercising counter wraparound.
    #[must_use]
    pub fn starting_at(origin: Millis) -> Self {
        Self {
            origin,
            elapsed: 0,
            pace: false,
            pins: BTreeMap::new(),
            schedule: BTreeMap::new(),
            next_seq: 0,
            handlers: RefCell::new(BTreeMap::new()),
            interrupts_enabled: Cell::new(true),
            deferred: RefCell::new(BTreeSet::new()),
            edges_delivered: Cell::new(0),
        }
    }

    /// Make every `sleep` also block the calling thread for the same time.
    #[must_use]
    pub fn paced(mut self, pace: bool) -> Self {
        self.pace = pace;
        self
    }

    /// Virtual milliseconds since the simulation started (never wraps).
    #[must_use]
    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    /// Set an input level immediately.
    pub fn set_input(&mut self, pin: Pin, high: bool) {
        self.pins.entry(pin).or_default().external = high;
        self.refresh(pin);
    }

    /// Schedule `stimulus` at `at` milliseconds after the simulation start.
    ///
    /// Stimuli scheduled in the past are applied on the next sleep.
    /// Stimuli sharing a timestamp are applied in scheduling order.
    pub fn schedule(&mut self, at: u64, stimulus: Stimulus) {
        self.schedule.insert((at, self.next_seq), stimulus);
        self.next_seq += 1;
    }

    /// Number of stimuli not yet applied.
    #[must_use]
    pub fn pending_stimuli(&self) -> usize {
        self.schedule.len()
    }

    /// Current mode of `pin`.
    #[must_use]
    pub fn pin_mode(&self, pin: Pin) -> PinMode {
        self.pins.get(&pin).map_or(PinMode::Input, |p| p.mode)
    }

    /// Effective level on the wire.
    #[must_use]
    pub fn line_level(&self, pin: Pin) -> bool {
        self.pins.get(&pin).is_some_and(SimPin::line_level)
    }

    /// Every change of the effective level of `pin`, with its timestamp.
    #[must_use]
    pub fn line_history(&self, pin: Pin) -> &[(Millis, bool)] {
        match self.pins.get(&pin) {
            Some(sim_pin) => &sim_pin.history,
            None => &[],
        }
    }

    /// Whether interrupts are currently unmasked.
    #[must_use]
    pub fn interrupts_enabled(&self) -> bool {
        self.interrupts_enabled.get()
    }

    /// Whether a handler is attached to `pin`.
    #[must_use]
    pub fn has_handler(&self, pin: Pin) -> bool {
        self.handlers.borrow().contains_key(&pin)
    }

    /// Number of edges handed to interrupt handlers.
    #[must_use]
    pub fn edges_delivered(&self) -> u64 {
        self.edges_delivered.get()
    }

    fn refresh(&mut self, pin: Pin) {
        let now = self.now();
        let sim_pin = self.pins.entry(pin).or_default();
        let level = sim_pin.line_level();
        if sim_pin.history.last().map(|&(_, l)| l) != Some(level) {
            sim_pin.history.push((now, level));
        }
    }

    fn deliver(&self, pin: Pin) {
        let now = self.now();
        if let Some(handler) = self.handlers.borrow_mut().get_mut(&pin) {
            self.edges_delivered.set(self.edges_delivered.get() + 1);
            handler(now);
        }
    }

    fn apply(&mut self, stimulus: Stimulus) {
        trace!(?stimulus, now = %self.now(), "Applying stimulus");
        match stimulus {
            Stimulus::Level { pin, high } => self.set_input(pin, high),
            Stimulus::FallingEdge { pin } => {
                if self.interrupts_enabled.get() {
                    self.deliver(pin);
                } else {
                    self.deferred.borrow_mut().insert(pin);
                }
            }
        }
    }

    fn advance_to(&mut self, target: u64) {
        while let Some(entry) = self.schedule.first_entry() {
            let (at, _) = *entry.key();
            if at > target {
                break;
            }
            let stimulus = entry.remove();
            self.elapsed = self.elapsed.max(at);
            self.apply(stimulus);
        }
        self.elapsed = self.elapsed.max(target);
    }
}

impl Platform for SimulatedPlatform {
    fn read_level(&mut self, pin: Pin) -> bool {
        self.line_level(pin)
    }

    fn set_pin_mode(&mut self, pin: Pin, mode: PinMode) {
        self.pins.entry(pin).or_default().mode = mode;
        self.refresh(pin);
    }

    fn write_level(&mut self, pin: Pin, high: bool) {
        self.pins.entry(pin).or_default().latch = high;
        self.refresh(pin);
    }

    #[allow(clippy::cast_possible_truncation)]
    fn now(&self) -> Millis {
        // Truncation is the counter wrap
        self.origin.wrapping_add(self.elapsed as u32)
    }

    fn sleep(&mut self, ms: u32) {
        if self.pace {
            std::thread::sleep(Duration::from_millis(u64::from(ms)));
        }
        self.advance_to(self.elapsed + u64::from(ms));
    }

    fn on_falling_edge(&mut self, pin: Pin, handler: EdgeHandler) -> SupervisorResult<()> {
        if self.pin_mode(pin) == PinMode::Output {
            return Err(SupervisorError::InterruptUnavailable { pin: pin.0 });
        }
        let mut handlers = self.handlers.borrow_mut();
        if handlers.contains_key(&pin) {
            return Err(SupervisorError::Platform(format!(
                "{pin} already has a falling-edge handler"
            )));
        }
        handlers.insert(pin, handler);
        Ok(())
    }

    fn disable_interrupts(&self) {
        self.interrupts_enabled.set(false);
    }

    fn enable_interrupts(&self) {
        self.interrupts_enabled.set(true);
        let pending = std::mem::take(&mut *self.deferred.borrow_mut());
        for pin in pending {
            self.deliver(pin);
        }
    }
}

//! Platform services consumed by the supervisor.
//!
//! Everything hardware-specific sits behind [`Platform`]: pin I/O, the
//! millisecond clock, the bounded sleep, interrupt registration, and the
//! global interrupt mask. The supervisor core never touches registers.

use serde::{Deserialize, Serialize};
use std::fmt;
use tps_common::error::SupervisorResult;
use tps_common::time::Millis;

/// A GPIO pin number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pin(pub u8);

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPIO{}", self.0)
    }
}

/// Electrical configuration of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PinMode {
    /// High-impedance input, no pull.
    #[default]
    Input,
    /// Input with the internal pull-up enabled.
    InputPullUp,
    /// Push-pull output.
    Output,
}

/// Falling-edge interrupt callback.
///
/// The platform invokes it from interrupt context with the clock value at
/// the edge. Implementations must not block or allocate.
pub type EdgeHandler = Box<dyn FnMut(Millis) + Send + 'static>;

/// Hardware services provided by the board support layer.
pub trait Platform {
    /// Read the logic level of `pin` (`true` = high).
    fn read_level(&mut self, pin: Pin) -> bool;

    /// Configure the electrical mode of `pin`.
    fn set_pin_mode(&mut self, pin: Pin, mode: PinMode);

    /// Drive `pin` high or low. Only meaningful in [`PinMode::Output`].
    fn write_level(&mut self, pin: Pin, high: bool);

    /// Current value of the free-running millisecond clock.
    fn now(&self) -> Millis;

    /// Bounded sleep. Interrupts keep firing while sleeping.
    fn sleep(&mut self, ms: u32);

    /// Register `handler` for falling edges on `pin`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pin cannot deliver edge interrupts or a
    /// handler is already attached.
    fn on_falling_edge(&mut self, pin: Pin, handler: EdgeHandler) -> SupervisorResult<()>;

    /// Mask interrupts globally.
    fn disable_interrupts(&self);

    /// Unmask interrupts globally. Edges latched while masked are delivered.
    fn enable_interrupts(&self);
}

#![doc = "Core of the TPS3424 KILL supervisor: interrupt latch, kill driver, and poll loop."]

pub mod critical;
pub mod debounce;
pub mod indication;
pub mod inhibit;
pub mod kill_driver;
pub mod latch;
pub mod platform;
pub mod reset_history;
pub mod simulated;
pub mod supervisor;

pub use critical::*;
pub use debounce::*;
pub use indication::*;
pub use inhibit::*;
pub use kill_driver::*;
pub use latch::*;
pub use platform::*;
pub use reset_history::*;
pub use simulated::*;
pub use supervisor::*;

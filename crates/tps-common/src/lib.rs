#![doc = "Common types shared across the TPS3424 supervisor workspace."]

pub mod config;
pub mod error;
pub mod metrics;
pub mod state;
pub mod time;

pub use config::*;
pub use error::*;
pub use metrics::*;
pub use state::*;
pub use time::*;

//! End-to-end supervisor scenarios on the simulated board.

mod common;
mod debounce_test;
mod inhibit_test;
mod kill_scenarios;
mod wraparound_test;

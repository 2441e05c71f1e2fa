//! JS-facing bridge over `rhythm_core`.
//!
//! `simulate` and `sweep` take a configuration object and return plain JS
//! objects; `WasmSweepRunner` drives a sweep in batches so a UI can report
//! progress and stop early.

mod payload;
mod simulation;
mod sweep_runner;

pub use simulation::{simulate, sweep};
pub use sweep_runner::WasmSweepRunner;

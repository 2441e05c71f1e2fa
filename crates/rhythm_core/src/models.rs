//! Oscillator right-hand sides.
//!
//! Every model implements [`crate::traits::Model`] with its own typed
//! parameter bundle; [`crate::config::ModelSpec`] selects one at runtime.

pub mod duffing;
pub mod goodwin;
pub mod phase_amplitude;

pub use duffing::{Duffing, DuffingParams};
pub use goodwin::{Goodwin, GoodwinFeedback, GoodwinFeedbackParams, GoodwinParams};
pub use phase_amplitude::{CoupledPopulation, PhaseAmplitude, PhaseAmplitudeParams, PopulationParams};

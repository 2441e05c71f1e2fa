pub mod config;
pub mod error;
pub mod integrator;
pub mod meanfield;
pub mod models;
pub mod poincare;
pub mod postprocess;
pub mod solvers;
pub mod spectrum;
pub mod sweep;
pub mod trajectory;
/// The `rhythm_core` crate simulates biological and mechanical oscillators and
/// maps how their rhythms change as one parameter is varied.
///
/// Key components:
/// - **Traits**: `Scalar`, `DynamicalSystem` and `Steppable` for the solver kernels; `Model` and `ParameterSet` for the oscillators.
/// - **Models**: Goodwin (with and without positive feedback), phase-amplitude oscillators, mean-field coupled populations, forced Duffing.
/// - **Solvers**: RK4 and Tsit5, the latter with step-size control.
/// - **Post-processing**: transient trimming, mean normalization, maxima-based and FFT-based periods, stroboscopic sections.
/// - **Sweeps**: parallel one-parameter bifurcation sweeps driven by `config::SweepConfig`.
pub mod traits;

pub use error::{Result, RhythmError};

use crate::error::Result;
use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars by the solver kernels.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// A vector field with its parameters already bound.
pub trait DynamicalSystem<T: Scalar> {
    /// Returns the dimension of the state space.
    fn dimension(&self) -> usize;

    /// Evaluates dx/dt.
    /// x: current state
    /// t: current time
    /// out: buffer to write the result
    fn apply(&self, t: T, x: &[T], out: &mut [T]);
}

/// A trait for solvers that can step a system forward with a fixed step.
pub trait Steppable<T: Scalar> {
    /// Performs one step of size dt.
    /// t: current time (updated after step)
    /// state: current state (updated after step)
    /// dt: step size
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T);
}

/// A named bundle of real-valued model constants.
///
/// Sweeps address exactly one scalar by name; bundles are cloned per sweep
/// point so `set` never touches a caller's copy.
pub trait ParameterSet: Clone + Debug + Send + Sync {
    /// Names of the scalars that can be read and overwritten.
    fn names(&self) -> &'static [&'static str];

    fn get(&self, name: &str) -> Option<f64>;

    /// Overwrites a named scalar. Unknown names are an `InvalidConfiguration`.
    fn set(&mut self, name: &str, value: f64) -> Result<()>;

    /// Rejects bundles the model cannot be evaluated with.
    fn validate(&self) -> Result<()>;
}

/// Right-hand side of an oscillator model, `f(t, state, params) -> dstate/dt`.
///
/// Implementations are pure and may be called at any `t` the solver picks.
pub trait Model: Sync {
    type Params: ParameterSet;

    fn name(&self) -> &'static str;

    /// State dimension; depends on the parameters for population models.
    fn dimension(&self, params: &Self::Params) -> usize;

    fn evaluate(&self, t: f64, state: &[f64], params: &Self::Params, out: &mut [f64]);
}

/// Pairs a model with one parameter bundle so the solvers can drive it.
pub struct BoundModel<'a, M: Model> {
    model: &'a M,
    params: &'a M::Params,
    dimension: usize,
}

impl<'a, M: Model> BoundModel<'a, M> {
    pub fn new(model: &'a M, params: &'a M::Params) -> Self {
        Self {
            model,
            params,
            dimension: model.dimension(params),
        }
    }
}

impl<M: Model> DynamicalSystem<f64> for BoundModel<'_, M> {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn apply(&self, t: f64, x: &[f64], out: &mut [f64]) {
        self.model.evaluate(t, x, self.params, out);
    }
}

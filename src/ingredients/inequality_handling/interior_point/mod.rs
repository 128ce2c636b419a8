//! Primal-dual interior-point inequality handling: barrier subproblem
//! assembly, inertia-corrected augmented-system solves, fraction-to-boundary
//! stepping and the Fiacco–McCormick barrier update.

mod barrier_problem;
mod barrier_update;
mod method;

pub use barrier_problem::{BarrierParameters, BarrierProblem};
pub use barrier_update::BarrierParameterUpdateStrategy;
pub use method::InteriorPointMethod;

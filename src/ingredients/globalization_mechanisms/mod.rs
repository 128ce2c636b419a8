//! Globalization mechanisms: orchestrate step acceptance around the
//! constraint-relaxation strategy, either by managing a trust-region radius
//! or a backtracking step length.

mod line_search;
mod trust_region;

pub use line_search::BacktrackingLineSearch;
pub use trust_region::TrustRegion;

use crate::algebra::FloatT;
use crate::callbacks::UserCallbacks;
use crate::ingredients::constraint_relaxation::ConstraintRelaxationStrategy;
use crate::optimization::{Direction, Iterate, OptimizationError};
use crate::settings::Settings;
use crate::statistics::Statistics;

pub trait GlobalizationMechanism<T: FloatT> {
    fn initialize_statistics(&self, statistics: &mut Statistics);

    /// Produce the next accepted iterate, re-solving or shortening the step
    /// as needed.  Reports failure upward instead of looping forever.
    fn compute_acceptable_iterate(
        &mut self,
        statistics: &mut Statistics,
        constraint_relaxation_strategy: &mut dyn ConstraintRelaxationStrategy<T>,
        current_iterate: &mut Iterate<T>,
        user_callbacks: &mut dyn UserCallbacks<T>,
    ) -> Result<Iterate<T>, OptimizationError>;
}

/// Trial iterate from a direction: primals move by `primal_step_length`,
/// constraint duals by `dual_step_length`, bound duals by
/// `bound_dual_step_length`, on the dual stream the relaxation is working
/// with.
pub(crate) fn assemble_trial_iterate<T: FloatT>(
    current_iterate: &Iterate<T>,
    direction: &Direction<T>,
    primal_step_length: T,
    dual_step_length: T,
    bound_dual_step_length: T,
    update_feasibility_multipliers: bool,
) -> Iterate<T> {
    let mut trial_iterate = current_iterate.clone();
    let number_variables = direction.number_variables;

    for i in 0..number_variables {
        trial_iterate.primals[i] =
            current_iterate.primals[i] + primal_step_length * direction.primals[i];
    }
    trial_iterate.invalidate_evaluations();

    let multipliers = if update_feasibility_multipliers {
        &mut trial_iterate.feasibility_multipliers
    } else {
        &mut trial_iterate.multipliers
    };
    for (j, delta) in direction.multipliers.constraints.iter().enumerate() {
        multipliers.constraints[j] += dual_step_length * *delta;
    }
    for i in 0..number_variables {
        multipliers.lower_bounds[i] +=
            bound_dual_step_length * direction.multipliers.lower_bounds[i];
        multipliers.upper_bounds[i] +=
            bound_dual_step_length * direction.multipliers.upper_bounds[i];
    }
    trial_iterate
}

/// Instantiate a globalization mechanism from the settings.
pub fn create_globalization_mechanism<T: FloatT>(
    settings: &Settings<T>,
) -> Result<Box<dyn GlobalizationMechanism<T>>, OptimizationError> {
    match settings.globalization_mechanism.as_str() {
        "TR" => Ok(Box::new(TrustRegion::new(settings))),
        "LS" => Ok(Box::new(BacktrackingLineSearch::new(settings))),
        name => Err(OptimizationError::InvalidConfiguration(format!(
            "unknown globalization mechanism: {name}"
        ))),
    }
}

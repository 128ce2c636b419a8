use super::Multipliers;
use crate::algebra::FloatT;

/// Outcome of one subproblem solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubproblemStatus {
    #[default]
    Optimal,
    Infeasible,
    UnboundedProblem,
    Error,
}

/// Primal-dual search direction.
///
/// All multiplier blocks hold *displacements*: the trial duals are
/// `current + step·direction.multipliers`.  For interior-point directions
/// the fraction-to-boundary step lengths are recorded alongside; the
/// primals themselves are unscaled.
#[derive(Debug, Clone)]
pub struct Direction<T = f64> {
    pub number_variables: usize,
    pub primals: Vec<T>,
    pub multipliers: Multipliers<T>,
    /// ∞-norm of the primal displacement
    pub norm: T,
    /// value of the local model at the step (gᵀd + ½dᵀHd)
    pub subproblem_objective: T,
    pub status: SubproblemStatus,
    /// fraction-to-boundary step length for primals and constraint duals
    pub primal_dual_step_length: T,
    /// fraction-to-boundary step length for bound duals
    pub bound_dual_step_length: T,
    /// Ipopt §3.9 small-step classification
    pub is_small_step: bool,
}

impl<T: FloatT> Direction<T> {
    pub fn new(number_variables: usize, number_constraints: usize) -> Self {
        Self {
            number_variables,
            primals: vec![T::zero(); number_variables],
            multipliers: Multipliers::new(number_variables, number_constraints),
            norm: T::zero(),
            subproblem_objective: T::zero(),
            status: SubproblemStatus::Optimal,
            primal_dual_step_length: T::one(),
            bound_dual_step_length: T::one(),
            is_small_step: false,
        }
    }

    /// Reset for reuse across inner iterations.
    pub fn reset(&mut self) {
        self.primals.iter_mut().for_each(|d| *d = T::zero());
        self.multipliers.reset();
        self.norm = T::zero();
        self.subproblem_objective = T::zero();
        self.status = SubproblemStatus::Optimal;
        self.primal_dual_step_length = T::one();
        self.bound_dual_step_length = T::one();
        self.is_small_step = false;
    }

    pub fn set_number_variables(&mut self, number_variables: usize) {
        self.number_variables = number_variables;
    }
}

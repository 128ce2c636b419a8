use crate::algebra::{FloatT, ScalarMath, SparseVector, SymmetricMatrix};
use crate::model::is_finite_bound;
use crate::optimization::{Iterate, Multipliers};
use crate::reformulation::OptimizationProblem;

/// Constants of the barrier subproblem, read from the settings once.
#[derive(Debug, Clone, Copy)]
pub struct BarrierParameters<T> {
    pub tau_min: T,
    pub k_sigma: T,
    pub regularization_exponent: T,
    pub small_direction_factor: T,
    pub push_variable_to_interior_k1: T,
    pub push_variable_to_interior_k2: T,
    pub damping_factor: T,
}

/// Barrier view of an equality-constrained problem:
///
/// ```text
///   minimize σ·f(x) − μ·Σ ln(xᵢ − x_Lᵢ) − μ·Σ ln(x_Uᵢ − xᵢ)
///   subject to c(x) = 0,  x strictly between its bounds
/// ```
///
/// with damping `±κ_d·μ` applied to single-bounded variables (elastic
/// variables included: they are single-bounded by construction).
pub struct BarrierProblem<'p, T: FloatT> {
    pub problem: &'p dyn OptimizationProblem<T>,
    pub barrier_parameter: T,
    pub parameters: &'p BarrierParameters<T>,
}

impl<'p, T: FloatT> BarrierProblem<'p, T> {
    pub fn new(
        problem: &'p dyn OptimizationProblem<T>,
        barrier_parameter: T,
        parameters: &'p BarrierParameters<T>,
    ) -> Self {
        Self {
            problem,
            barrier_parameter,
            parameters,
        }
    }

    /// Strictly project a value into its bound interval, by at least
    /// `min(κ₁·max(1,|bound|), κ₂·(ub−lb))` from each side.
    pub fn push_variable_to_interior(&self, value: T, lower_bound: T, upper_bound: T) -> T {
        let k1 = self.parameters.push_variable_to_interior_k1;
        let k2 = self.parameters.push_variable_to_interior_k2;
        let range = upper_bound - lower_bound;
        let mut result = value;
        if is_finite_bound(lower_bound) {
            let perturbation = if is_finite_bound(upper_bound) {
                T::min(k1 * T::max(T::one(), lower_bound.abs()), k2 * range)
            } else {
                k1 * T::max(T::one(), lower_bound.abs())
            };
            result = T::max(result, lower_bound + perturbation);
        }
        if is_finite_bound(upper_bound) {
            let perturbation = if is_finite_bound(lower_bound) {
                T::min(k1 * T::max(T::one(), upper_bound.abs()), k2 * range)
            } else {
                k1 * T::max(T::one(), upper_bound.abs())
            };
            result = T::min(result, upper_bound - perturbation);
        }
        result
    }

    /// σ∇f plus the barrier gradient `−μ(X−X_L)⁻¹e − μ(X_U−X)⁻¹e` and the
    /// damping terms of single-bounded variables.
    pub fn evaluate_objective_gradient(
        &self,
        iterate: &mut Iterate<T>,
        gradient: &mut SparseVector<T>,
    ) {
        let mu = self.barrier_parameter;
        self.problem.evaluate_objective_gradient(iterate, gradient);
        for &i in self.problem.get_lower_bounded_variables() {
            gradient.insert(
                i,
                -mu / (iterate.primals[i] - self.problem.variable_lower_bound(i)),
            );
        }
        for &i in self.problem.get_upper_bounded_variables() {
            gradient.insert(
                i,
                -mu / (iterate.primals[i] - self.problem.variable_upper_bound(i)),
            );
        }
        let damping = self.parameters.damping_factor * mu;
        if damping != T::zero() {
            for &i in self.problem.get_single_lower_bounded_variables() {
                gradient.insert(i, damping);
            }
            for &i in self.problem.get_single_upper_bounded_variables() {
                gradient.insert(i, -damping);
            }
        }
    }

    /// Primal-dual Hessian contribution of the bounds:
    /// `Σ_L z_L/(x−x_L) + Σ_U z_U/(x−x_U)` on the diagonal.
    pub fn add_barrier_diagonal(
        &self,
        iterate: &Iterate<T>,
        multipliers: &Multipliers<T>,
        matrix: &mut SymmetricMatrix<T>,
    ) {
        for &i in self.problem.get_lower_bounded_variables() {
            matrix.insert(
                i,
                i,
                multipliers.lower_bounds[i]
                    / (iterate.primals[i] - self.problem.variable_lower_bound(i)),
            );
        }
        for &i in self.problem.get_upper_bounded_variables() {
            matrix.insert(
                i,
                i,
                multipliers.upper_bounds[i]
                    / (iterate.primals[i] - self.problem.variable_upper_bound(i)),
            );
        }
    }

    /// The auxiliary progress measure: barrier terms plus damping.
    pub fn auxiliary_measure(&self, iterate: &Iterate<T>) -> T {
        let mu = self.barrier_parameter;
        let mut barrier_terms = T::zero();
        for &i in self.problem.get_lower_bounded_variables() {
            barrier_terms -=
                (iterate.primals[i] - self.problem.variable_lower_bound(i)).logsafe();
        }
        for &i in self.problem.get_upper_bounded_variables() {
            barrier_terms -=
                (self.problem.variable_upper_bound(i) - iterate.primals[i]).logsafe();
        }
        barrier_terms *= mu;
        let damping = self.parameters.damping_factor * mu;
        for &i in self.problem.get_single_lower_bounded_variables() {
            barrier_terms +=
                damping * (iterate.primals[i] - self.problem.variable_lower_bound(i));
        }
        for &i in self.problem.get_single_upper_bounded_variables() {
            barrier_terms +=
                damping * (self.problem.variable_upper_bound(i) - iterate.primals[i]);
        }
        barrier_terms
    }

    /// Directional derivative of the barrier terms along `primal_direction`.
    pub fn barrier_term_directional_derivative(
        &self,
        iterate: &Iterate<T>,
        primal_direction: &[T],
    ) -> T {
        let mu = self.barrier_parameter;
        let mut derivative = T::zero();
        for &i in self.problem.get_lower_bounded_variables() {
            derivative -= mu * primal_direction[i]
                / (iterate.primals[i] - self.problem.variable_lower_bound(i));
        }
        for &i in self.problem.get_upper_bounded_variables() {
            derivative -= mu * primal_direction[i]
                / (iterate.primals[i] - self.problem.variable_upper_bound(i));
        }
        let damping = self.parameters.damping_factor * mu;
        for &i in self.problem.get_single_lower_bounded_variables() {
            derivative += damping * primal_direction[i];
        }
        for &i in self.problem.get_single_upper_bounded_variables() {
            derivative -= damping * primal_direction[i];
        }
        derivative
    }

    /// Rescale the bound multipliers of an accepted iterate into
    /// `[coef/κ_σ, coef·κ_σ]` with `coef = μ/(x−bound)` (Ipopt Eq. 16).
    pub fn postprocess_iterate(&self, primals: &[T], multipliers: &mut Multipliers<T>) {
        let mu = self.barrier_parameter;
        let k_sigma = self.parameters.k_sigma;
        for &i in self.problem.get_lower_bounded_variables() {
            let coefficient = mu / (primals[i] - self.problem.variable_lower_bound(i));
            let lower = coefficient / k_sigma;
            let upper = coefficient * k_sigma;
            multipliers.lower_bounds[i] = multipliers.lower_bounds[i].clip(lower, upper);
        }
        for &i in self.problem.get_upper_bounded_variables() {
            let coefficient = mu / (primals[i] - self.problem.variable_upper_bound(i));
            let lower = coefficient * k_sigma;
            let upper = coefficient / k_sigma;
            multipliers.upper_bounds[i] = multipliers.upper_bounds[i].clip(lower, upper);
        }
    }
}

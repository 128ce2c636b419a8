//! Fiacco–McCormick barrier parameter update: μ decreases superlinearly as
//! soon as the scaled optimality error of the current barrier subproblem
//! drops below κ_ε·μ.

use crate::algebra::{AsFloatT, FloatT, Norm};
use crate::optimization::{DualResiduals, Iterate, Multipliers};
use crate::reformulation::OptimizationProblem;
use crate::settings::Settings;

pub struct BarrierParameterUpdateStrategy<T: FloatT> {
    barrier_parameter: T,
    tolerance_fraction: T,
    k_mu: T,
    theta_mu: T,
    k_epsilon: T,
    s_max: T,
    residual_norm: Norm,
}

impl<T: FloatT> BarrierParameterUpdateStrategy<T> {
    pub fn new(settings: &Settings<T>) -> Self {
        Self {
            barrier_parameter: settings.barrier_initial_parameter,
            tolerance_fraction: settings.tolerance / (10.0).as_T(),
            k_mu: settings.barrier_k_mu,
            theta_mu: settings.barrier_theta_mu,
            k_epsilon: settings.barrier_k_epsilon,
            s_max: (100.0).as_T(),
            residual_norm: settings.residual_norm(),
        }
    }

    pub fn get_barrier_parameter(&self) -> T {
        self.barrier_parameter
    }

    pub fn set_barrier_parameter(&mut self, barrier_parameter: T) {
        self.barrier_parameter = barrier_parameter;
    }

    /// Returns true if μ was decreased (the subproblem was redefined).
    pub fn update_barrier_parameter(
        &mut self,
        problem: &dyn OptimizationProblem<T>,
        current_iterate: &Iterate<T>,
        current_multipliers: &Multipliers<T>,
        residuals: &DualResiduals<T>,
    ) -> bool {
        let number_variables = problem.number_variables();
        let number_constraints = problem.number_constraints();
        let two: T = (2.0).as_T();

        // scaled stationarity error
        let multiplier_norm = current_multipliers.norm_one();
        let total_size: T = (number_constraints + 2 * number_variables).as_T();
        let s_d = T::max(self.s_max, multiplier_norm / T::max(T::one(), total_size)) / self.s_max;
        let kkt_error = residuals.stationarity / s_d;

        // scaled central complementarity error |z·(x−bound) − μ|
        let bound_multiplier_norm = current_multipliers.lower_bounds.iter().fold(T::zero(), |acc, z| acc + z.abs())
            + current_multipliers.upper_bounds.iter().fold(T::zero(), |acc, z| acc + z.abs());
        let s_c = T::max(
            self.s_max,
            bound_multiplier_norm / T::max(T::one(), two * (number_variables).as_T()),
        ) / self.s_max;
        let central_complementarity_error =
            self.central_complementarity_error(problem, current_iterate, current_multipliers) / s_c;

        let error = T::max(
            kkt_error,
            T::max(current_iterate.primal_feasibility, central_complementarity_error),
        );

        // possibly decrease μ several times in one go
        let mut updated = false;
        while error <= self.k_epsilon * self.barrier_parameter
            && self.tolerance_fraction < self.barrier_parameter
        {
            self.barrier_parameter = T::max(
                self.tolerance_fraction,
                T::min(
                    self.k_mu * self.barrier_parameter,
                    self.barrier_parameter.powf(self.theta_mu),
                ),
            );
            updated = true;
        }
        updated
    }

    fn central_complementarity_error(
        &self,
        problem: &dyn OptimizationProblem<T>,
        iterate: &Iterate<T>,
        multipliers: &Multipliers<T>,
    ) -> T {
        let mu = self.barrier_parameter;
        // per-variable sum of the shifted products over both bound sides
        self.residual_norm
            .of((0..problem.number_variables()).map(|i| {
                let mut result = T::zero();
                let lower_bound = problem.variable_lower_bound(i);
                let upper_bound = problem.variable_upper_bound(i);
                if crate::model::is_finite_bound(lower_bound) {
                    result += multipliers.lower_bounds[i] * (iterate.primals[i] - lower_bound) - mu;
                }
                if crate::model::is_finite_bound(upper_bound) {
                    result += multipliers.upper_bounds[i] * (iterate.primals[i] - upper_bound) - mu;
                }
                result
            }))
    }
}

#![allow(non_snake_case)]

//! Default QP/LP backend: a self-contained primal-dual interior-point
//! iteration on the slack form
//!
//! ```text
//!   minimize gᵀd + ½dᵀHd   subject to   Jd − s = 0,
//!                                       lb ≤ d ≤ ub,  cl ≤ s ≤ cu.
//! ```
//!
//! Infeasible subproblems are recognized either up front (empty bound box)
//! or by a stagnating equality residual at a vanishing barrier parameter.

use super::QpSolver;
use crate::algebra::{AsFloatT, FloatT, SparseVector, SymmetricMatrix, VectorMath};
use crate::ingredients::regularization::{factorize_with_retry, PrimalDualRegularization};
use crate::linear_solvers::{create_linear_solver, LinearSolver};
use crate::model::is_finite_bound;
use crate::optimization::{
    Direction, OptimizationError, SubproblemStatus, WarmstartInformation,
};
use crate::settings::Settings;

const MAX_BARRIER_ITERATIONS: usize = 200;

pub struct PrimalDualQpSolver<T: FloatT> {
    linear_solver: Box<dyn LinearSolver<T>>,
    regularization: PrimalDualRegularization<T>,
    augmented_matrix: SymmetricMatrix<T>,
    tolerance: T,
    symbolic_analysis_done: bool,
    last_dimension: usize,
}

impl<T: FloatT> PrimalDualQpSolver<T> {
    pub fn new(linear_solver_name: &str, tolerance: T) -> Result<Self, OptimizationError> {
        Ok(Self {
            linear_solver: create_linear_solver(linear_solver_name)?,
            regularization: PrimalDualRegularization::new(&Settings::default()),
            augmented_matrix: SymmetricMatrix::new(0, 0),
            tolerance,
            symbolic_analysis_done: false,
            last_dimension: 0,
        })
    }

    fn push_to_interior(value: T, lower_bound: T, upper_bound: T) -> T {
        let k1: T = (1e-2).as_T();
        let k2: T = (1e-2).as_T();
        let mut result = value;
        if is_finite_bound(lower_bound) {
            let perturbation = if is_finite_bound(upper_bound) {
                T::min(
                    k1 * T::max(T::one(), lower_bound.abs()),
                    k2 * (upper_bound - lower_bound),
                )
            } else {
                k1 * T::max(T::one(), lower_bound.abs())
            };
            result = T::max(result, lower_bound + perturbation);
        }
        if is_finite_bound(upper_bound) {
            let perturbation = if is_finite_bound(lower_bound) {
                T::min(
                    k1 * T::max(T::one(), upper_bound.abs()),
                    k2 * (upper_bound - lower_bound),
                )
            } else {
                k1 * T::max(T::one(), upper_bound.abs())
            };
            result = T::min(result, upper_bound - perturbation);
        }
        result
    }
}

impl<T: FloatT> QpSolver<T> for PrimalDualQpSolver<T> {
    fn solve_qp(
        &mut self,
        number_variables: usize,
        number_constraints: usize,
        variables_lower_bounds: &[T],
        variables_upper_bounds: &[T],
        constraints_lower_bounds: &[T],
        constraints_upper_bounds: &[T],
        linear_objective: &SparseVector<T>,
        constraint_jacobian: &[SparseVector<T>],
        hessian: &SymmetricMatrix<T>,
        initial_point: &[T],
        direction: &mut Direction<T>,
        warmstart_information: &WarmstartInformation,
    ) -> Result<(), OptimizationError> {
        let n = number_variables;
        let m = number_constraints;
        let nv = n + m; // primal variables + slacks
        let dimension = nv + m;
        let two: T = (2.0).as_T();

        // bounds of the slack-form variables v = (d, s)
        let mut lower_bounds = vec![T::zero(); nv];
        let mut upper_bounds = vec![T::zero(); nv];
        lower_bounds[..n].copy_from_slice(&variables_lower_bounds[..n]);
        upper_bounds[..n].copy_from_slice(&variables_upper_bounds[..n]);
        lower_bounds[n..].copy_from_slice(&constraints_lower_bounds[..m]);
        upper_bounds[n..].copy_from_slice(&constraints_upper_bounds[..m]);

        // empty box: the subproblem is infeasible outright
        for k in 0..nv {
            if lower_bounds[k] > upper_bounds[k] {
                direction.status = SubproblemStatus::Infeasible;
                return Ok(());
            }
        }
        // open up degenerate (fixed) intervals so the barrier stays defined
        for k in 0..nv {
            if lower_bounds[k] == upper_bounds[k] {
                let gap = T::max(<f64 as AsFloatT<T>>::as_T(&1e-10), <f64 as AsFloatT<T>>::as_T(&1e-8) * lower_bounds[k].abs());
                lower_bounds[k] -= gap;
                upper_bounds[k] += gap;
            }
        }

        let lower_bounded: Vec<usize> = (0..nv)
            .filter(|&k| is_finite_bound(lower_bounds[k]))
            .collect();
        let upper_bounded: Vec<usize> = (0..nv)
            .filter(|&k| is_finite_bound(upper_bounds[k]))
            .collect();

        // strictly interior starting point
        let mut v = vec![T::zero(); nv];
        for k in 0..n {
            v[k] = Self::push_to_interior(initial_point[k], lower_bounds[k], upper_bounds[k]);
        }
        for j in 0..m {
            let row_value = constraint_jacobian[j].dot_dense(&v[..n]);
            v[n + j] = Self::push_to_interior(row_value, lower_bounds[n + j], upper_bounds[n + j]);
        }

        let mut y = vec![T::zero(); m];
        let mut z_lower = vec![T::zero(); nv];
        let mut z_upper = vec![T::zero(); nv];
        for &k in &lower_bounded {
            z_lower[k] = T::one();
        }
        for &k in &upper_bounded {
            z_upper[k] = -T::one();
        }

        let mut mu: T = (0.1).as_T();
        let mut rhs = vec![T::zero(); dimension];
        let mut solution = vec![T::zero(); dimension];
        let mut delta_z_lower = vec![T::zero(); nv];
        let mut delta_z_upper = vec![T::zero(); nv];

        let pattern_changed = warmstart_information.hessian_sparsity_changed
            || warmstart_information.jacobian_sparsity_changed
            || dimension != self.last_dimension;
        if pattern_changed {
            self.symbolic_analysis_done = false;
            self.last_dimension = dimension;
        }

        let mut converged = false;
        for _iteration in 0..MAX_BARRIER_ITERATIONS {
            // gradient of the quadratic model and equality residual
            let mut hessian_times_d = vec![T::zero(); n];
            hessian.symmetric_product(&v[..n], &mut hessian_times_d);
            let mut objective_gradient = hessian_times_d.clone();
            linear_objective.add_to_dense(T::one(), &mut objective_gradient);

            let mut stationarity = vec![T::zero(); nv];
            stationarity[..n].copy_from_slice(&objective_gradient);
            for j in 0..m {
                constraint_jacobian[j].add_to_dense(-y[j], &mut stationarity[..n]);
                stationarity[n + j] = y[j];
            }
            for k in 0..nv {
                stationarity[k] -= z_lower[k] + z_upper[k];
            }

            let mut equality_residual = vec![T::zero(); m];
            for j in 0..m {
                equality_residual[j] = constraint_jacobian[j].dot_dense(&v[..n]) - v[n + j];
            }

            let complementarity = |shift: T| -> T {
                let mut error = T::zero();
                for &k in &lower_bounded {
                    error = T::max(
                        error,
                        (z_lower[k] * (v[k] - lower_bounds[k]) - shift).abs(),
                    );
                }
                for &k in &upper_bounded {
                    error = T::max(
                        error,
                        (z_upper[k] * (v[k] - upper_bounds[k]) - shift).abs(),
                    );
                }
                error
            };

            let optimality_error = T::max(
                stationarity.norm_inf(),
                T::max(equality_residual.norm_inf(), complementarity(T::zero())),
            );
            if optimality_error <= self.tolerance {
                converged = true;
                break;
            }

            // Fiacco-McCormick update of the barrier parameter
            let barrier_error = T::max(
                stationarity.norm_inf(),
                T::max(equality_residual.norm_inf(), complementarity(mu)),
            );
            let tolerance_fraction = self.tolerance / (10.0).as_T();
            if barrier_error <= <f64 as AsFloatT<T>>::as_T(&10.0) * mu && tolerance_fraction < mu {
                mu = T::max(
                    tolerance_fraction,
                    T::min(<f64 as AsFloatT<T>>::as_T(&0.2) * mu, mu.powf((1.5).as_T())),
                );
            }

            // assemble the augmented system
            self.augmented_matrix = SymmetricMatrix::new(dimension, hessian.number_nonzeros() + 3 * nv + m);
            for (i, j, value) in hessian.iter() {
                if i < n && j < n {
                    self.augmented_matrix.insert(i, j, value);
                }
            }
            // convexification tail of the Hessian carries over
            for (k, &delta) in hessian.regularization_tail().iter().take(n).enumerate() {
                if delta != T::zero() {
                    self.augmented_matrix.insert(k, k, delta);
                }
            }
            for &k in &lower_bounded {
                self.augmented_matrix
                    .insert(k, k, z_lower[k] / (v[k] - lower_bounds[k]));
            }
            for &k in &upper_bounded {
                self.augmented_matrix
                    .insert(k, k, z_upper[k] / (v[k] - upper_bounds[k]));
            }
            for j in 0..m {
                for (i, value) in constraint_jacobian[j].iter() {
                    self.augmented_matrix.insert(i, nv + j, value);
                }
                self.augmented_matrix.insert(n + j, nv + j, -T::one());
            }

            if !self.symbolic_analysis_done {
                self.linear_solver.do_symbolic_analysis(&self.augmented_matrix)?;
                self.symbolic_analysis_done = true;
            }
            factorize_with_retry(self.linear_solver.as_mut(), &self.augmented_matrix)?;
            self.regularization.regularize(
                &mut self.augmented_matrix,
                self.linear_solver.as_mut(),
                nv,
                m,
                mu.powf((0.25).as_T()),
            )?;

            // right-hand side: −∇φ_μ + Ĵᵀy on top, −(Jd − s) below
            for k in 0..nv {
                rhs[k] = -stationarity[k] - z_lower[k] - z_upper[k];
            }
            for &k in &lower_bounded {
                rhs[k] += mu / (v[k] - lower_bounds[k]);
            }
            for &k in &upper_bounded {
                rhs[k] += mu / (v[k] - upper_bounds[k]);
            }
            for j in 0..m {
                rhs[nv + j] = -equality_residual[j];
            }

            self.linear_solver
                .solve_indefinite_system(&self.augmented_matrix, &rhs, &mut solution)?;
            // the dual block solves for −Δy
            for j in 0..m {
                solution[nv + j] = -solution[nv + j];
            }

            // bound-dual displacements
            delta_z_lower.iter_mut().for_each(|dz| *dz = T::zero());
            delta_z_upper.iter_mut().for_each(|dz| *dz = T::zero());
            for &k in &lower_bounded {
                let distance = v[k] - lower_bounds[k];
                delta_z_lower[k] = (mu - solution[k] * z_lower[k]) / distance - z_lower[k];
            }
            for &k in &upper_bounded {
                let distance = v[k] - upper_bounds[k];
                delta_z_upper[k] = (mu - solution[k] * z_upper[k]) / distance - z_upper[k];
            }

            // fraction to boundary
            let tau = T::max((0.99).as_T(), T::one() - mu);
            let mut primal_length = T::one();
            for &k in &lower_bounded {
                if solution[k] < T::zero() {
                    primal_length = T::min(
                        primal_length,
                        -tau * (v[k] - lower_bounds[k]) / solution[k],
                    );
                }
            }
            for &k in &upper_bounded {
                if solution[k] > T::zero() {
                    primal_length = T::min(
                        primal_length,
                        -tau * (v[k] - upper_bounds[k]) / solution[k],
                    );
                }
            }
            let mut dual_length = T::one();
            for k in 0..nv {
                if delta_z_lower[k] < T::zero() && z_lower[k] > T::zero() {
                    dual_length = T::min(dual_length, -tau * z_lower[k] / delta_z_lower[k]);
                }
                if delta_z_upper[k] > T::zero() && z_upper[k] < T::zero() {
                    dual_length = T::min(dual_length, -tau * z_upper[k] / delta_z_upper[k]);
                }
            }

            for k in 0..nv {
                v[k] += primal_length * solution[k];
            }
            for j in 0..m {
                y[j] += primal_length * solution[nv + j];
            }
            for k in 0..nv {
                z_lower[k] += dual_length * delta_z_lower[k];
                z_upper[k] += dual_length * delta_z_upper[k];
            }

            // divergence means the subproblem is unbounded below
            if v[..n].norm_inf() > (1e14).as_T() {
                direction.status = SubproblemStatus::UnboundedProblem;
                return Ok(());
            }
        }

        if !converged {
            let mut equality_residual = vec![T::zero(); m];
            for j in 0..m {
                equality_residual[j] = constraint_jacobian[j].dot_dense(&v[..n]) - v[n + j];
            }
            direction.status = if equality_residual.norm_inf() > self.tolerance.sqrt() {
                SubproblemStatus::Infeasible
            } else {
                SubproblemStatus::Error
            };
            return Ok(());
        }

        // export the solution: primals and *new* multiplier values
        direction.primals.iter_mut().for_each(|d| *d = T::zero());
        direction.primals[..n].copy_from_slice(&v[..n]);
        direction.multipliers.constraints[..m].copy_from_slice(&y);
        direction
            .multipliers
            .lower_bounds
            .iter_mut()
            .for_each(|z| *z = T::zero());
        direction
            .multipliers
            .upper_bounds
            .iter_mut()
            .for_each(|z| *z = T::zero());
        direction.multipliers.lower_bounds[..n].copy_from_slice(&z_lower[..n]);
        direction.multipliers.upper_bounds[..n].copy_from_slice(&z_upper[..n]);
        direction.norm = v[..n].norm_inf();
        let mut hessian_times_d = vec![T::zero(); n];
        hessian.symmetric_product(&v[..n], &mut hessian_times_d);
        direction.subproblem_objective =
            linear_objective.dot_dense(&v[..n]) + v[..n].dot(&hessian_times_d) / two;
        direction.status = SubproblemStatus::Optimal;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::INFINITY_DEFAULT;
    use crate::optimization::Direction;

    fn solve(
        n: usize,
        m: usize,
        lb: &[f64],
        ub: &[f64],
        cl: &[f64],
        cu: &[f64],
        g: &[(usize, f64)],
        rows: Vec<Vec<(usize, f64)>>,
        h: &[(usize, usize, f64)],
    ) -> Direction<f64> {
        let mut solver = PrimalDualQpSolver::<f64>::new("ldl", 1e-10).unwrap();
        let mut gradient = SparseVector::new();
        for &(i, v) in g {
            gradient.insert(i, v);
        }
        let mut jacobian = vec![SparseVector::new(); m];
        for (j, row) in rows.iter().enumerate() {
            for &(i, v) in row {
                jacobian[j].insert(i, v);
            }
        }
        let mut hessian = SymmetricMatrix::new(n, h.len().max(1));
        for &(i, j, v) in h {
            hessian.insert(i, j, v);
        }
        let mut direction = Direction::new(n, m);
        solver
            .solve_qp(
                n,
                m,
                lb,
                ub,
                cl,
                cu,
                &gradient,
                &jacobian,
                &hessian,
                &vec![0.0; n],
                &mut direction,
                &WarmstartInformation::whole_problem_changed(),
            )
            .unwrap();
        direction
    }

    #[test]
    fn test_box_qp() {
        // min ½(d₁² + d₂²) − d₁ − d₂ s.t. 0 ≤ d ≤ 0.4: solution at the bound
        let direction = solve(
            2,
            0,
            &[0.0, 0.0],
            &[0.4, 0.4],
            &[],
            &[],
            &[(0, -1.0), (1, -1.0)],
            vec![],
            &[(0, 0, 1.0), (1, 1, 1.0)],
        );
        assert_eq!(direction.status, SubproblemStatus::Optimal);
        assert!((direction.primals[0] - 0.4).abs() < 1e-6);
        assert!((direction.primals[1] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_equality_constrained_qp() {
        // min ½(d₁² + d₂²) s.t. d₁ + d₂ = 1
        let inf = INFINITY_DEFAULT;
        let direction = solve(
            2,
            1,
            &[-inf, -inf],
            &[inf, inf],
            &[1.0],
            &[1.0],
            &[],
            vec![vec![(0, 1.0), (1, 1.0)]],
            &[(0, 0, 1.0), (1, 1, 1.0)],
        );
        assert_eq!(direction.status, SubproblemStatus::Optimal);
        assert!((direction.primals[0] - 0.5).abs() < 1e-6);
        assert!((direction.primals[1] - 0.5).abs() < 1e-6);
        // new multiplier value, textbook sign: ∇q = Jᵀy at the solution
        assert!((direction.multipliers.constraints[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_inconsistent_bounds_reported_infeasible() {
        let direction = solve(
            1,
            0,
            &[1.0],
            &[0.0],
            &[],
            &[],
            &[(0, 1.0)],
            vec![],
            &[],
        );
        assert_eq!(direction.status, SubproblemStatus::Infeasible);
    }

    #[test]
    fn test_unbounded_lp() {
        // min −d with no bounds and no constraints
        let inf = INFINITY_DEFAULT;
        let direction = solve(1, 0, &[-inf], &[inf], &[], &[], &[(0, -1.0)], vec![], &[]);
        assert_eq!(direction.status, SubproblemStatus::UnboundedProblem);
    }
}

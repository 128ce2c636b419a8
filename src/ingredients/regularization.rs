//! Inertia-driven regularization of the subproblem matrices.
//!
//! Adds δ_p·I to the Hessian block and −δ_d·I to the dual block of a
//! symmetric matrix until the linear solver certifies the target inertia
//! (n⁺, n⁻, 0).  The δ values are written into the matrix's regularization
//! tail, so retries never touch the structural sparsity.

use crate::algebra::{AsFloatT, FloatT, SymmetricMatrix};
use crate::linear_solvers::{Inertia, LinearSolver, LinearSolverError};
use crate::optimization::OptimizationError;
use crate::settings::Settings;

/// Numeric factorization with the workspace-growth retry demanded by
/// MA27-style backends: on `InsufficientWorkspace`, grow and repeat the same
/// call once.
pub fn factorize_with_retry<T: FloatT>(
    linear_solver: &mut dyn LinearSolver<T>,
    matrix: &SymmetricMatrix<T>,
) -> Result<(), OptimizationError> {
    match linear_solver.do_numerical_factorization(matrix) {
        Ok(()) => Ok(()),
        Err(LinearSolverError::InsufficientWorkspace { required }) => {
            linear_solver.initialize_memory(matrix.dimension(), 0, required, matrix.dimension());
            linear_solver.do_numerical_factorization(matrix)?;
            Ok(())
        }
        Err(error) => Err(error.into()),
    }
}

fn inertia_is_good<T: FloatT>(linear_solver: &dyn LinearSolver<T>, target: Inertia) -> bool {
    !linear_solver.matrix_is_singular() && linear_solver.get_inertia() == target
}

/// Primal-dual inertia correction for augmented (KKT) systems.
pub struct PrimalDualRegularization<T> {
    previous_primal_regularization: T,
    initial_value: T,
    increase_factor: T,
    fast_increase_factor: T,
    failure_threshold: T,
    dual_regularization_base: T,
    /// δ_p applied in the last call (0 when the inertia was already good)
    pub last_primal_regularization: T,
    /// δ_d applied in the last call
    pub last_dual_regularization: T,
}

impl<T: FloatT> PrimalDualRegularization<T> {
    pub fn new(settings: &Settings<T>) -> Self {
        Self {
            previous_primal_regularization: T::zero(),
            initial_value: settings.regularization_initial_value,
            increase_factor: settings.regularization_increase_factor,
            fast_increase_factor: settings.regularization_fast_increase_factor,
            failure_threshold: settings.regularization_failure_threshold,
            dual_regularization_base: (1e-8).as_T(),
            last_primal_regularization: T::zero(),
            last_dual_regularization: T::zero(),
        }
    }

    /// Regularize `matrix` until its inertia is
    /// (`primal_block_size`, `dual_block_size`, 0).  `dual_scale` weights the
    /// dual shift applied when the matrix is singular (μ^κ for the barrier
    /// methods, 1 otherwise).  The matrix must have been factorized by the
    /// caller already; control returns only with the target inertia
    /// certified.
    pub fn regularize(
        &mut self,
        matrix: &mut SymmetricMatrix<T>,
        linear_solver: &mut dyn LinearSolver<T>,
        primal_block_size: usize,
        dual_block_size: usize,
        dual_scale: T,
    ) -> Result<(), OptimizationError> {
        let target = Inertia::new(primal_block_size, dual_block_size, 0);
        if inertia_is_good(&*linear_solver, target) {
            self.last_primal_regularization = T::zero();
            self.last_dual_regularization = T::zero();
            return Ok(());
        }

        let dual_regularization = if linear_solver.matrix_is_singular() {
            self.dual_regularization_base * dual_scale
        } else {
            T::zero()
        };
        let mut primal_regularization = if self.previous_primal_regularization == T::zero() {
            self.initial_value
        } else {
            T::max(
                (1e-20).as_T(),
                self.previous_primal_regularization / (3.0).as_T(),
            )
        };

        loop {
            matrix.set_regularization(
                primal_block_size,
                dual_block_size,
                primal_regularization,
                dual_regularization,
            );
            factorize_with_retry(linear_solver, matrix)?;

            if inertia_is_good(&*linear_solver, target) {
                self.previous_primal_regularization = primal_regularization;
                self.last_primal_regularization = primal_regularization;
                self.last_dual_regularization = dual_regularization;
                return Ok(());
            }

            primal_regularization *= if self.previous_primal_regularization == T::zero() {
                self.fast_increase_factor
            } else {
                self.increase_factor
            };
            if primal_regularization > self.failure_threshold {
                return Err(OptimizationError::UnstableRegularization);
            }
        }
    }
}

/// Hessian-only convexification (Nocedal & Wright, Algorithm 3.3): shift the
/// diagonal until the matrix is positive definite.
pub struct PrimalRegularization<T> {
    previous_regularization: T,
    initial_value: T,
    increase_factor: T,
    fast_increase_factor: T,
    failure_threshold: T,
    pub last_regularization: T,
}

impl<T: FloatT> PrimalRegularization<T> {
    pub fn new(settings: &Settings<T>) -> Self {
        Self {
            previous_regularization: T::zero(),
            initial_value: settings.regularization_initial_value,
            increase_factor: settings.regularization_increase_factor,
            fast_increase_factor: settings.regularization_fast_increase_factor,
            failure_threshold: settings.regularization_failure_threshold,
            last_regularization: T::zero(),
        }
    }

    /// Regularize the n×n `hessian` until it is positive definite, i.e. its
    /// inertia is (n, 0, 0).
    pub fn regularize(
        &mut self,
        hessian: &mut SymmetricMatrix<T>,
        linear_solver: &mut dyn LinearSolver<T>,
        number_variables: usize,
    ) -> Result<(), OptimizationError> {
        let target = Inertia::new(number_variables, 0, 0);

        // start from the smallest diagonal entry: a positive diagonal gets a
        // chance at δ = 0
        let mut minimum_diagonal = T::infinity();
        for (i, j, value) in hessian.iter() {
            if i == j {
                minimum_diagonal = T::min(minimum_diagonal, value);
            }
        }
        if minimum_diagonal == T::infinity() {
            minimum_diagonal = T::zero();
        }
        let mut regularization = if minimum_diagonal > T::zero() {
            T::zero()
        } else {
            self.initial_value - minimum_diagonal
        };

        loop {
            hessian.set_regularization(number_variables, 0, regularization, T::zero());
            factorize_with_retry(linear_solver, hessian)?;

            if inertia_is_good(&*linear_solver, target) {
                self.previous_regularization = regularization;
                self.last_regularization = regularization;
                return Ok(());
            }

            regularization = if regularization == T::zero() {
                self.initial_value
            } else {
                regularization
                    * if self.previous_regularization == T::zero() {
                        self.fast_increase_factor
                    } else {
                        self.increase_factor
                    }
            };
            if regularization > self.failure_threshold {
                return Err(OptimizationError::UnstableRegularization);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linear_solvers::InertiaLdl;
    use crate::settings::Settings;

    #[test]
    fn test_augmented_system_regularized_to_target_inertia() {
        // KKT matrix of an indefinite Hessian with one constraint row:
        // H = diag(1, -2), J = [1 1]
        let mut matrix = SymmetricMatrix::<f64>::new(3, 8);
        matrix.insert(0, 0, 1.0);
        matrix.insert(1, 1, -2.0);
        matrix.insert(0, 2, 1.0);
        matrix.insert(1, 2, 1.0);

        let mut linear_solver = InertiaLdl::<f64>::default();
        linear_solver.do_symbolic_analysis(&matrix).unwrap();
        factorize_with_retry(&mut linear_solver, &matrix).unwrap();

        let settings = Settings::<f64>::default();
        let mut regularization = PrimalDualRegularization::new(&settings);
        regularization
            .regularize(&mut matrix, &mut linear_solver, 2, 1, 1.0)
            .unwrap();

        assert_eq!(linear_solver.get_inertia(), Inertia::new(2, 1, 0));
        assert!(regularization.last_primal_regularization > 0.0);
    }

    #[test]
    fn test_indefinite_hessian_convexified() {
        let mut hessian = SymmetricMatrix::<f64>::new(2, 4);
        hessian.insert(0, 0, 1.0);
        hessian.insert(1, 1, -4.0);

        let mut linear_solver = InertiaLdl::<f64>::default();
        linear_solver.do_symbolic_analysis(&hessian).unwrap();

        let settings = Settings::<f64>::default();
        let mut regularization = PrimalRegularization::new(&settings);
        regularization
            .regularize(&mut hessian, &mut linear_solver, 2)
            .unwrap();

        assert_eq!(linear_solver.get_inertia(), Inertia::new(2, 0, 0));
        // the shift must clear the most negative eigenvalue
        assert!(regularization.last_regularization >= 4.0 - 1.0e-12);
    }
}

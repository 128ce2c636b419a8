#![allow(non_snake_case)]

use super::{BarrierParameters, BarrierParameterUpdateStrategy, BarrierProblem};
use crate::algebra::{AsFloatT, FloatT, SparseVector, SymmetricMatrix, VectorMath};
use crate::ingredients::hessian_models::{HessianEvaluator, HessianModel};
use crate::ingredients::inequality_handling::InequalityHandlingMethod;
use crate::ingredients::regularization::{factorize_with_retry, PrimalDualRegularization};
use crate::linear_solvers::{create_linear_solver, LinearSolver};
use crate::optimization::{
    Direction, Iterate, Multipliers, OptimizationError, SubproblemStatus, WarmstartInformation,
};
use crate::preprocessing;
use crate::reformulation::{L1RelaxedProblem, OptimizationProblem};
use crate::settings::Settings;
use crate::statistics::Statistics;

pub struct InteriorPointMethod<T: FloatT> {
    linear_solver: Box<dyn LinearSolver<T>>,
    barrier_parameter_update_strategy: BarrierParameterUpdateStrategy<T>,
    regularization: PrimalDualRegularization<T>,
    parameters: BarrierParameters<T>,
    default_multiplier: T,
    least_square_multiplier_max_norm: T,
    l1_constraint_violation_coefficient: T,

    previous_barrier_parameter: T,
    solving_feasibility_problem: bool,
    first_feasibility_iteration: bool,
    subproblem_definition_changed: bool,
    number_subproblems_solved: usize,

    // per-solve workspace
    barrier_gradient: SparseVector<T>,
    constraints: Vec<T>,
    constraint_jacobian: Vec<SparseVector<T>>,
    hessian: SymmetricMatrix<T>,
    augmented_matrix: SymmetricMatrix<T>,
    rhs: Vec<T>,
    solution: Vec<T>,
    lower_delta_z: Vec<T>,
    upper_delta_z: Vec<T>,
    symbolic_analysis_done: bool,
}

impl<T: FloatT> InteriorPointMethod<T> {
    pub fn new(settings: &Settings<T>) -> Result<Self, OptimizationError> {
        Ok(Self {
            linear_solver: create_linear_solver(&settings.linear_solver)?,
            barrier_parameter_update_strategy: BarrierParameterUpdateStrategy::new(settings),
            regularization: PrimalDualRegularization::new(settings),
            parameters: BarrierParameters {
                tau_min: settings.barrier_tau_min,
                k_sigma: settings.barrier_k_sigma,
                regularization_exponent: settings.barrier_regularization_exponent,
                small_direction_factor: settings.barrier_small_direction_factor,
                push_variable_to_interior_k1: settings.barrier_push_variable_to_interior_k1,
                push_variable_to_interior_k2: settings.barrier_push_variable_to_interior_k2,
                damping_factor: settings.barrier_damping_factor,
            },
            default_multiplier: settings.barrier_default_multiplier,
            least_square_multiplier_max_norm: settings.least_square_multiplier_max_norm,
            l1_constraint_violation_coefficient: settings.l1_constraint_violation_coefficient,
            previous_barrier_parameter: settings.barrier_initial_parameter,
            solving_feasibility_problem: false,
            first_feasibility_iteration: false,
            subproblem_definition_changed: false,
            number_subproblems_solved: 0,
            barrier_gradient: SparseVector::new(),
            constraints: Vec::new(),
            constraint_jacobian: Vec::new(),
            hessian: SymmetricMatrix::new(0, 0),
            augmented_matrix: SymmetricMatrix::new(0, 0),
            rhs: Vec::new(),
            solution: Vec::new(),
            lower_delta_z: Vec::new(),
            upper_delta_z: Vec::new(),
            symbolic_analysis_done: false,
        })
    }

    fn barrier_parameter(&self) -> T {
        self.barrier_parameter_update_strategy.get_barrier_parameter()
    }

    pub fn number_subproblems_solved(&self) -> usize {
        self.number_subproblems_solved
    }

    /// Equality residual of constraint j at the current evaluation.
    fn equality_residual(&self, problem: &dyn OptimizationProblem<T>, constraint_index: usize) -> T {
        self.constraints[constraint_index] - problem.constraint_lower_bound(constraint_index)
    }

    fn assemble_augmented_matrix(
        &mut self,
        barrier_problem: &BarrierProblem<T>,
        iterate: &Iterate<T>,
        current_multipliers: &Multipliers<T>,
    ) {
        let problem = barrier_problem.problem;
        let n = problem.number_variables();
        let m = problem.number_constraints();
        let capacity = self.hessian.number_nonzeros() + 2 * n + problem.number_jacobian_nonzeros();

        self.augmented_matrix = SymmetricMatrix::new(n + m, capacity);
        for (i, j, value) in self.hessian.iter() {
            self.augmented_matrix.insert(i, j, value);
        }
        barrier_problem.add_barrier_diagonal(iterate, current_multipliers, &mut self.augmented_matrix);
        for (j, row) in self.constraint_jacobian.iter().enumerate().take(m) {
            for (i, value) in row.iter() {
                self.augmented_matrix.insert(i, n + j, value);
            }
        }
    }

    fn generate_augmented_rhs(
        &mut self,
        problem: &dyn OptimizationProblem<T>,
        current_multipliers: &Multipliers<T>,
    ) {
        let n = problem.number_variables();
        let m = problem.number_constraints();
        self.rhs.iter_mut().for_each(|value| *value = T::zero());

        // barrier objective gradient
        for (i, derivative) in self.barrier_gradient.iter() {
            self.rhs[i] -= derivative;
        }
        // Lagrangian terms and equality residuals
        for j in 0..m {
            let multiplier = current_multipliers.constraints[j];
            if multiplier != T::zero() {
                self.constraint_jacobian[j].add_to_dense(multiplier, &mut self.rhs[..n]);
            }
            self.rhs[n + j] = -self.equality_residual(problem, j);
        }
    }

    fn compute_bound_dual_direction(
        &mut self,
        problem: &dyn OptimizationProblem<T>,
        iterate: &Iterate<T>,
        current_multipliers: &Multipliers<T>,
    ) {
        let mu = self.barrier_parameter();
        self.lower_delta_z.iter_mut().for_each(|dz| *dz = T::zero());
        self.upper_delta_z.iter_mut().for_each(|dz| *dz = T::zero());
        for &i in problem.get_lower_bounded_variables() {
            let distance_to_bound = iterate.primals[i] - problem.variable_lower_bound(i);
            let multiplier = current_multipliers.lower_bounds[i];
            self.lower_delta_z[i] =
                (mu - self.solution[i] * multiplier) / distance_to_bound - multiplier;
        }
        for &i in problem.get_upper_bounded_variables() {
            let distance_to_bound = iterate.primals[i] - problem.variable_upper_bound(i);
            let multiplier = current_multipliers.upper_bounds[i];
            self.upper_delta_z[i] =
                (mu - self.solution[i] * multiplier) / distance_to_bound - multiplier;
        }
    }

    fn primal_fraction_to_boundary(
        &self,
        problem: &dyn OptimizationProblem<T>,
        iterate: &Iterate<T>,
        tau: T,
    ) -> T {
        let mut primal_length = T::one();
        for &i in problem.get_lower_bounded_variables() {
            if self.solution[i] < T::zero() {
                let trial = -tau * (iterate.primals[i] - problem.variable_lower_bound(i))
                    / self.solution[i];
                primal_length = T::min(primal_length, trial);
            }
        }
        for &i in problem.get_upper_bounded_variables() {
            if self.solution[i] > T::zero() {
                let trial = -tau * (iterate.primals[i] - problem.variable_upper_bound(i))
                    / self.solution[i];
                primal_length = T::min(primal_length, trial);
            }
        }
        primal_length
    }

    fn dual_fraction_to_boundary(
        &self,
        problem: &dyn OptimizationProblem<T>,
        current_multipliers: &Multipliers<T>,
        tau: T,
    ) -> T {
        let mut dual_length = T::one();
        for i in 0..problem.number_variables() {
            if self.lower_delta_z[i] < T::zero() && current_multipliers.lower_bounds[i] > T::zero()
            {
                let trial = -tau * current_multipliers.lower_bounds[i] / self.lower_delta_z[i];
                dual_length = T::min(dual_length, trial);
            }
            if self.upper_delta_z[i] > T::zero() && current_multipliers.upper_bounds[i] < T::zero()
            {
                let trial = -tau * current_multipliers.upper_bounds[i] / self.upper_delta_z[i];
                dual_length = T::min(dual_length, trial);
            }
        }
        dual_length
    }

    /// Ipopt §3.9: the step is negligible relative to the iterate.
    fn is_small_step(&self, problem: &dyn OptimizationProblem<T>, iterate: &Iterate<T>) -> bool {
        let machine_epsilon = T::epsilon();
        let relative_size = (0..problem.number_variables())
            .map(|i| (self.solution[i] / (T::one() + iterate.primals[i].abs())).abs())
            .fold(T::zero(), T::max);
        relative_size <= self.parameters.small_direction_factor * machine_epsilon
    }
}

impl<T: FloatT> InequalityHandlingMethod<T> for InteriorPointMethod<T> {
    fn initialize(
        &mut self,
        problem: &dyn OptimizationProblem<T>,
        hessian_model: &HessianModel<T>,
    ) -> Result<(), OptimizationError> {
        if !problem.get_inequality_constraints().is_empty() {
            return Err(OptimizationError::InvalidProblem(
                "the interior-point method requires an equality-constrained reformulation \
                 with slack variables"
                    .to_string(),
            ));
        }
        let n = problem.number_variables();
        let m = problem.number_constraints();
        let number_augmented_system_nonzeros =
            hessian_model.number_nonzeros(problem.model()) + problem.number_jacobian_nonzeros();
        self.linear_solver
            .initialize_memory(n, m, number_augmented_system_nonzeros, n + m);
        self.constraints = vec![T::zero(); m];
        self.constraint_jacobian = vec![SparseVector::new(); m];
        self.rhs = vec![T::zero(); n + m];
        self.solution = vec![T::zero(); n + m];
        self.lower_delta_z = vec![T::zero(); n];
        self.upper_delta_z = vec![T::zero(); n];
        Ok(())
    }

    fn initialize_statistics(&self, statistics: &mut Statistics) {
        statistics.add_column("barrier", Statistics::DOUBLE_WIDTH, 50);
        statistics.add_column("regularization", Statistics::DOUBLE_WIDTH, 60);
    }

    fn generate_initial_iterate(
        &mut self,
        statistics: &mut Statistics,
        problem: &dyn OptimizationProblem<T>,
        iterate: &mut Iterate<T>,
    ) -> Result<(), OptimizationError> {
        let barrier_problem =
            BarrierProblem::new(problem, self.barrier_parameter(), &self.parameters);

        iterate.set_number_variables(problem.number_variables());

        // make the initial point strictly feasible wrt the bounds
        for i in 0..problem.number_variables() {
            iterate.primals[i] = barrier_problem.push_variable_to_interior(
                iterate.primals[i],
                problem.variable_lower_bound(i),
                problem.variable_upper_bound(i),
            );
        }

        // seed the slacks from the constraint values
        let slacks = problem.model().get_slacks();
        if !slacks.is_empty() {
            iterate.invalidate_evaluations();
            iterate.evaluate_constraints(problem.model());
            for &(constraint_index, slack_index) in &slacks {
                iterate.primals[slack_index] = barrier_problem.push_variable_to_interior(
                    iterate.evaluations.constraints[constraint_index],
                    problem.variable_lower_bound(slack_index),
                    problem.variable_upper_bound(slack_index),
                );
            }
            iterate.invalidate_evaluations();
        }

        // default bound multipliers
        for &i in problem.get_lower_bounded_variables() {
            iterate.multipliers.lower_bounds[i] = self.default_multiplier;
        }
        for &i in problem.get_upper_bounded_variables() {
            iterate.multipliers.upper_bounds[i] = -self.default_multiplier;
        }

        // least-squares constraint multipliers
        if problem.number_constraints() > 0 {
            preprocessing::compute_least_square_multipliers(
                problem.model(),
                self.linear_solver.as_mut(),
                iterate,
                self.least_square_multiplier_max_norm,
                statistics,
            )?;
            // the augmented pattern differs from the least-squares pattern
            self.symbolic_analysis_done = false;
        }
        Ok(())
    }

    fn solve(
        &mut self,
        statistics: &mut Statistics,
        problem: &dyn OptimizationProblem<T>,
        current_iterate: &mut Iterate<T>,
        current_multipliers: &Multipliers<T>,
        direction: &mut Direction<T>,
        hessian_model: &mut HessianModel<T>,
        trust_region_radius: T,
        _warmstart_information: &mut WarmstartInformation,
    ) -> Result<(), OptimizationError> {
        if trust_region_radius.is_finite() {
            return Err(OptimizationError::InvalidConfiguration(
                "the interior-point subproblem does not support a trust region".to_string(),
            ));
        }
        let n = problem.number_variables();
        let m = problem.number_constraints();

        // possibly update the barrier parameter
        if !self.first_feasibility_iteration {
            let residuals = if self.solving_feasibility_problem {
                &current_iterate.feasibility_residuals
            } else {
                &current_iterate.residuals
            };
            let updated = self.barrier_parameter_update_strategy.update_barrier_parameter(
                problem,
                current_iterate,
                current_multipliers,
                residuals,
            );
            self.subproblem_definition_changed = self.subproblem_definition_changed || updated;
        } else {
            self.first_feasibility_iteration = false;
        }
        statistics.set_float("barrier", self.barrier_parameter());

        let mu = self.barrier_parameter();
        let parameters = self.parameters;
        let barrier_problem = BarrierProblem::new(problem, mu, &parameters);

        // evaluate the barrier subproblem at the current iterate
        barrier_problem.evaluate_objective_gradient(current_iterate, &mut self.barrier_gradient);
        problem.evaluate_constraints(current_iterate, &mut self.constraints);
        problem.evaluate_constraint_jacobian(current_iterate, &mut self.constraint_jacobian);
        self.hessian = SymmetricMatrix::new(n, problem.number_hessian_nonzeros());
        hessian_model.evaluate(
            problem,
            &current_iterate.primals,
            &current_multipliers.constraints,
            &mut self.hessian,
        );

        // assemble, factorize and regularize the augmented matrix
        self.assemble_augmented_matrix(&barrier_problem, current_iterate, current_multipliers);
        if !self.symbolic_analysis_done {
            self.linear_solver.do_symbolic_analysis(&self.augmented_matrix)?;
            self.symbolic_analysis_done = true;
        }
        factorize_with_retry(self.linear_solver.as_mut(), &self.augmented_matrix)?;
        self.regularization.regularize(
            &mut self.augmented_matrix,
            self.linear_solver.as_mut(),
            n,
            m,
            mu.powf(self.parameters.regularization_exponent),
        )?;
        statistics.set_float("regularization", self.regularization.last_primal_regularization);

        // right-hand side and solve
        self.rhs.resize(n + m, T::zero());
        self.solution.resize(n + m, T::zero());
        self.generate_augmented_rhs(problem, current_multipliers);
        if self.linear_solver.matrix_is_singular() {
            direction.status = SubproblemStatus::Infeasible;
            return Ok(());
        }
        let rhs = std::mem::take(&mut self.rhs);
        let mut solution = std::mem::take(&mut self.solution);
        self.linear_solver
            .solve_indefinite_system(&self.augmented_matrix, &rhs, &mut solution)?;
        self.rhs = rhs;
        self.solution = solution;
        self.number_subproblems_solved += 1;

        // the dual block solves for −Δy: flip to the textbook sign
        for j in 0..m {
            self.solution[n + j] = -self.solution[n + j];
        }

        // bound-multiplier displacements and fraction-to-boundary
        self.lower_delta_z.resize(n, T::zero());
        self.upper_delta_z.resize(n, T::zero());
        self.compute_bound_dual_direction(problem, current_iterate, current_multipliers);
        let tau = T::max(self.parameters.tau_min, T::one() - mu);
        let primal_step_length = self.primal_fraction_to_boundary(problem, current_iterate, tau);
        let dual_step_length = self.dual_fraction_to_boundary(problem, current_multipliers, tau);

        // export the direction (raw displacements + step lengths)
        direction.reset();
        direction.set_number_variables(n);
        direction.primals[..n].copy_from_slice(&self.solution[..n]);
        direction.multipliers.constraints[..m].copy_from_slice(&self.solution[n..n + m]);
        direction.multipliers.lower_bounds[..n].copy_from_slice(&self.lower_delta_z);
        direction.multipliers.upper_bounds[..n].copy_from_slice(&self.upper_delta_z);
        direction.primal_dual_step_length = primal_step_length;
        direction.bound_dual_step_length = dual_step_length;
        direction.norm = self.solution[..n].norm_inf();
        direction.subproblem_objective = self
            .barrier_gradient
            .dot_dense(&self.solution[..n]);
        direction.is_small_step = self.is_small_step(problem, current_iterate);
        direction.status = SubproblemStatus::Optimal;
        Ok(())
    }

    fn hessian_quadratic_product(&self, primal_direction: &[T]) -> T {
        self.hessian.quadratic_product(primal_direction)
    }

    fn set_auxiliary_measure(&self, problem: &dyn OptimizationProblem<T>, iterate: &mut Iterate<T>) {
        let barrier_problem =
            BarrierProblem::new(problem, self.barrier_parameter(), &self.parameters);
        iterate.progress.auxiliary = barrier_problem.auxiliary_measure(iterate);
    }

    fn compute_predicted_auxiliary_reduction(
        &self,
        problem: &dyn OptimizationProblem<T>,
        iterate: &Iterate<T>,
        primal_direction: &[T],
        step_length: T,
    ) -> T {
        let barrier_problem =
            BarrierProblem::new(problem, self.barrier_parameter(), &self.parameters);
        let directional_derivative =
            barrier_problem.barrier_term_directional_derivative(iterate, primal_direction);
        step_length * (-directional_derivative)
    }

    fn initialize_feasibility_problem(
        &mut self,
        problem: &L1RelaxedProblem<T>,
        iterate: &mut Iterate<T>,
    ) {
        self.solving_feasibility_problem = true;
        self.first_feasibility_iteration = true;
        self.subproblem_definition_changed = true;

        // raise μ to the current infeasibility and remember the old value
        self.previous_barrier_parameter = self.barrier_parameter();
        let new_barrier_parameter =
            T::max(self.barrier_parameter(), iterate.primal_feasibility);
        self.barrier_parameter_update_strategy
            .set_barrier_parameter(new_barrier_parameter);

        self.set_elastic_variable_values(problem, iterate);
    }

    fn set_elastic_variable_values(
        &self,
        problem: &L1RelaxedProblem<T>,
        iterate: &mut Iterate<T>,
    ) {
        let mu = self.barrier_parameter();
        let rho = self.l1_constraint_violation_coefficient;
        let two: T = (2.0).as_T();

        iterate.evaluate_constraints(problem.model());
        let constraints = iterate.evaluations.constraints.clone();

        // c(x) − p + n = 0 has the closed-form strictly positive solution
        // (μ/ρ − a·c_j + sqrt(c_j² + (μ/ρ)²))/2 with a = ∓1
        problem.set_elastic_variable_values(
            iterate,
            |iterate, constraint_index, elastic_index, jacobian_coefficient| {
                let constraint_value = constraints[constraint_index];
                let mu_over_rho = mu / rho;
                let radical = constraint_value * constraint_value + mu_over_rho * mu_over_rho;
                let value =
                    (mu_over_rho - jacobian_coefficient * constraint_value + radical.sqrt()) / two;
                iterate.primals[elastic_index] = value;
                iterate.feasibility_multipliers.lower_bounds[elastic_index] = mu / value;
                iterate.feasibility_multipliers.upper_bounds[elastic_index] = T::zero();
            },
        );

        // default duals for the model variables of the feasibility stream
        for &i in problem.get_lower_bounded_variables() {
            if i < problem.model().number_variables() {
                iterate.feasibility_multipliers.lower_bounds[i] = self.default_multiplier;
            }
        }
        for &i in problem.get_upper_bounded_variables() {
            if i < problem.model().number_variables() {
                iterate.feasibility_multipliers.upper_bounds[i] = -self.default_multiplier;
            }
        }
        iterate.invalidate_evaluations();
    }

    fn exit_feasibility_problem(
        &mut self,
        _problem: &dyn OptimizationProblem<T>,
        _iterate: &mut Iterate<T>,
    ) {
        self.barrier_parameter_update_strategy
            .set_barrier_parameter(self.previous_barrier_parameter);
        self.solving_feasibility_problem = false;
        self.first_feasibility_iteration = false;
        self.subproblem_definition_changed = true;
    }

    fn postprocess_iterate(
        &self,
        problem: &dyn OptimizationProblem<T>,
        primals: &mut [T],
        multipliers: &mut Multipliers<T>,
    ) {
        let barrier_problem =
            BarrierProblem::new(problem, self.barrier_parameter(), &self.parameters);
        barrier_problem.postprocess_iterate(primals, multipliers);
    }

    fn subproblem_definition_changed(&self) -> bool {
        self.subproblem_definition_changed
    }

    fn clear_subproblem_definition_changed(&mut self) {
        self.subproblem_definition_changed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Model, INFINITY_DEFAULT};
    use crate::settings::SettingsBuilder;

    struct OneConstraint;

    impl Model<f64> for OneConstraint {
        fn number_variables(&self) -> usize {
            1
        }
        fn number_constraints(&self) -> usize {
            1
        }
        fn evaluate_objective(&self, x: &[f64]) -> f64 {
            x[0]
        }
        fn evaluate_objective_gradient(&self, _x: &[f64], gradient: &mut SparseVector<f64>) {
            gradient.insert(0, 1.0);
        }
        fn evaluate_constraints(&self, x: &[f64], constraints: &mut [f64]) {
            constraints[0] = x[0];
        }
        fn evaluate_constraint_jacobian(&self, _x: &[f64], jacobian: &mut [SparseVector<f64>]) {
            jacobian[0].insert(0, 1.0);
        }
        fn evaluate_lagrangian_hessian(
            &self,
            _x: &[f64],
            _objective_multiplier: f64,
            _multipliers: &[f64],
            _hessian: &mut SymmetricMatrix<f64>,
        ) {
        }
        fn variable_lower_bound(&self, _i: usize) -> f64 {
            -INFINITY_DEFAULT
        }
        fn variable_upper_bound(&self, _i: usize) -> f64 {
            INFINITY_DEFAULT
        }
        fn constraint_lower_bound(&self, _j: usize) -> f64 {
            2.0
        }
        fn constraint_upper_bound(&self, _j: usize) -> f64 {
            2.0
        }
        fn initial_primal_point(&self, x: &mut [f64]) {
            x[0] = 0.0;
        }
        fn number_objective_gradient_nonzeros(&self) -> usize {
            1
        }
        fn number_jacobian_nonzeros(&self) -> usize {
            1
        }
        fn number_hessian_nonzeros(&self) -> usize {
            0
        }
    }

    #[test]
    fn test_restoration_round_trip_restores_barrier_parameter() {
        let settings = SettingsBuilder::<f64>::default().build().unwrap();
        let model = OneConstraint;
        let problem = L1RelaxedProblem::new(&model, 0.0, 1.0);
        let mut method = InteriorPointMethod::<f64>::new(&settings).unwrap();
        let mut iterate = Iterate::new(1, 1);
        iterate.primals[0] = 0.0;
        iterate.primal_feasibility = 2.0;

        let initial_mu = method.barrier_parameter();
        method.initialize_feasibility_problem(&problem, &mut iterate);
        // μ was raised to the primal infeasibility
        assert_eq!(method.barrier_parameter(), 2.0);
        assert!(method.subproblem_definition_changed());
        // elastics are strictly positive with strictly positive duals
        for &(_, elastic_index) in &problem.elastic_variables().positive {
            assert!(iterate.primals[elastic_index] > 0.0);
            assert!(iterate.feasibility_multipliers.lower_bounds[elastic_index] > 0.0);
        }

        method.exit_feasibility_problem(&problem, &mut iterate);
        assert_eq!(method.barrier_parameter(), initial_mu);
    }
}

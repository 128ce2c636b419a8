//! SQP direction computation: linearize the constraints, translate bounds to
//! displacement bounds intersected with the trust region, hand the local QP
//! to the external solver, and convert its multipliers to displacements.

use super::InequalityHandlingMethod;
use crate::algebra::{AsFloatT, FloatT, SparseVector, SymmetricMatrix};
use crate::ingredients::hessian_models::{HessianEvaluator, HessianModel};
use crate::ingredients::regularization::PrimalRegularization;
use crate::linear_solvers::{create_linear_solver, LinearSolver};
use crate::model::constraint_residual;
use crate::optimization::{
    Direction, Iterate, Multipliers, OptimizationError, SubproblemStatus, WarmstartInformation,
};
use crate::qp_solvers::{create_qp_solver, QpSolver};
use crate::reformulation::{L1RelaxedProblem, OptimizationProblem};
use crate::settings::Settings;
use crate::statistics::Statistics;

pub struct QpMethod<T: FloatT> {
    qp_solver: Box<dyn QpSolver<T>>,
    linear_solver: Box<dyn LinearSolver<T>>,
    regularization: PrimalRegularization<T>,
    // the problem is convexified when no trust region bounds the subproblem
    use_regularization: bool,

    hessian: SymmetricMatrix<T>,
    objective_gradient: SparseVector<T>,
    constraints: Vec<T>,
    constraint_jacobian: Vec<SparseVector<T>>,
    direction_lower_bounds: Vec<T>,
    direction_upper_bounds: Vec<T>,
    linearized_constraints_lower_bounds: Vec<T>,
    linearized_constraints_upper_bounds: Vec<T>,
    initial_point: Vec<T>,

    hessian_analyzed: bool,
    subproblem_definition_changed: bool,
    number_subproblems_solved: usize,
}

impl<T: FloatT> QpMethod<T> {
    pub fn new(settings: &Settings<T>) -> Result<Self, OptimizationError> {
        let solver_name = if settings.hessian_model == "zero" {
            &settings.lp_solver
        } else {
            &settings.qp_solver
        };
        Ok(Self {
            qp_solver: create_qp_solver(
                solver_name,
                &settings.linear_solver,
                settings.tolerance / (100.0).as_T(),
            )?,
            linear_solver: create_linear_solver(&settings.linear_solver)?,
            regularization: PrimalRegularization::new(settings),
            use_regularization: settings.globalization_mechanism != "TR",
            hessian: SymmetricMatrix::new(0, 0),
            objective_gradient: SparseVector::new(),
            constraints: Vec::new(),
            constraint_jacobian: Vec::new(),
            direction_lower_bounds: Vec::new(),
            direction_upper_bounds: Vec::new(),
            linearized_constraints_lower_bounds: Vec::new(),
            linearized_constraints_upper_bounds: Vec::new(),
            initial_point: Vec::new(),
            hessian_analyzed: false,
            subproblem_definition_changed: false,
            number_subproblems_solved: 0,
        })
    }

    pub fn number_subproblems_solved(&self) -> usize {
        self.number_subproblems_solved
    }

    fn evaluate_functions(
        &mut self,
        problem: &dyn OptimizationProblem<T>,
        current_iterate: &mut Iterate<T>,
        current_multipliers: &Multipliers<T>,
        hessian_model: &mut HessianModel<T>,
        warmstart_information: &WarmstartInformation,
    ) {
        if warmstart_information.objective_changed || warmstart_information.constraints_changed {
            hessian_model.evaluate(
                problem,
                &current_iterate.primals,
                &current_multipliers.constraints,
                &mut self.hessian,
            );
        }
        if warmstart_information.objective_changed {
            problem.evaluate_objective_gradient(current_iterate, &mut self.objective_gradient);
        }
        if warmstart_information.constraints_changed {
            problem.evaluate_constraints(current_iterate, &mut self.constraints);
            problem.evaluate_constraint_jacobian(current_iterate, &mut self.constraint_jacobian);
        }
    }

    fn set_direction_bounds(
        &mut self,
        problem: &dyn OptimizationProblem<T>,
        current_iterate: &Iterate<T>,
        trust_region_radius: T,
    ) {
        for i in 0..problem.number_variables() {
            let primal = current_iterate.primals[i];
            self.direction_lower_bounds[i] = T::max(
                problem.variable_lower_bound(i) - primal,
                -trust_region_radius,
            );
            self.direction_upper_bounds[i] =
                T::min(problem.variable_upper_bound(i) - primal, trust_region_radius);
        }
    }

    fn set_linearized_constraint_bounds(&mut self, problem: &dyn OptimizationProblem<T>) {
        for j in 0..problem.number_constraints() {
            self.linearized_constraints_lower_bounds[j] =
                problem.constraint_lower_bound(j) - self.constraints[j];
            self.linearized_constraints_upper_bounds[j] =
                problem.constraint_upper_bound(j) - self.constraints[j];
        }
    }
}

impl<T: FloatT> InequalityHandlingMethod<T> for QpMethod<T> {
    fn initialize(
        &mut self,
        problem: &dyn OptimizationProblem<T>,
        hessian_model: &HessianModel<T>,
    ) -> Result<(), OptimizationError> {
        let number_variables = problem.number_variables();
        let number_constraints = problem.number_constraints();
        let hessian_nonzeros =
            hessian_model.number_nonzeros(problem.model()) + number_variables;
        self.hessian = SymmetricMatrix::new(number_variables, hessian_nonzeros);
        self.constraints = vec![T::zero(); number_constraints];
        self.constraint_jacobian = vec![SparseVector::new(); number_constraints];
        self.direction_lower_bounds = vec![T::zero(); number_variables];
        self.direction_upper_bounds = vec![T::zero(); number_variables];
        self.linearized_constraints_lower_bounds = vec![T::zero(); number_constraints];
        self.linearized_constraints_upper_bounds = vec![T::zero(); number_constraints];
        self.initial_point = vec![T::zero(); number_variables];
        self.linear_solver.initialize_memory(
            number_variables,
            0,
            hessian_nonzeros,
            number_variables,
        );
        Ok(())
    }

    fn initialize_statistics(&self, statistics: &mut Statistics) {
        if self.use_regularization {
            statistics.add_column("regularization", Statistics::DOUBLE_WIDTH, 60);
        }
    }

    fn generate_initial_iterate(
        &mut self,
        _statistics: &mut Statistics,
        _problem: &dyn OptimizationProblem<T>,
        _iterate: &mut Iterate<T>,
    ) -> Result<(), OptimizationError> {
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
        warmstart_information: &mut WarmstartInformation,
    ) -> Result<(), OptimizationError> {
        let number_variables = problem.number_variables();
        let number_constraints = problem.number_constraints();

        self.evaluate_functions(
            problem,
            current_iterate,
            current_multipliers,
            hessian_model,
            warmstart_information,
        );

        // convexify an indefinite model when nothing else bounds the QP below
        if self.use_regularization && !hessian_model.is_positive_definite() {
            if !self.hessian_analyzed {
                self.linear_solver.do_symbolic_analysis(&self.hessian)?;
                self.hessian_analyzed = true;
            }
            self.regularization.regularize(
                &mut self.hessian,
                self.linear_solver.as_mut(),
                number_variables,
            )?;
            statistics.set_float("regularization", self.regularization.last_regularization);
        }

        if warmstart_information.variable_bounds_changed {
            self.set_direction_bounds(problem, current_iterate, trust_region_radius);
        }
        if warmstart_information.constraint_bounds_changed {
            self.set_linearized_constraint_bounds(problem);
        }

        direction.reset();
        direction.set_number_variables(number_variables);
        self.qp_solver.solve_qp(
            number_variables,
            number_constraints,
            &self.direction_lower_bounds,
            &self.direction_upper_bounds,
            &self.linearized_constraints_lower_bounds,
            &self.linearized_constraints_upper_bounds,
            &self.objective_gradient,
            &self.constraint_jacobian,
            &self.hessian,
            &self.initial_point,
            direction,
            warmstart_information,
        )?;
        self.number_subproblems_solved += 1;

        if direction.status == SubproblemStatus::Optimal {
            // the QP solver returns new multiplier values: convert to
            // displacements
            for j in 0..number_constraints {
                direction.multipliers.constraints[j] -= current_multipliers.constraints[j];
            }
            for i in 0..number_variables {
                direction.multipliers.lower_bounds[i] -= current_multipliers.lower_bounds[i];
                direction.multipliers.upper_bounds[i] -= current_multipliers.upper_bounds[i];
            }
            direction.primal_dual_step_length = T::one();
            direction.bound_dual_step_length = T::one();
        }
        Ok(())
    }

    fn hessian_quadratic_product(&self, primal_direction: &[T]) -> T {
        self.hessian.quadratic_product(primal_direction)
    }

    fn set_auxiliary_measure(
        &self,
        _problem: &dyn OptimizationProblem<T>,
        iterate: &mut Iterate<T>,
    ) {
        iterate.progress.auxiliary = T::zero();
    }

    fn compute_predicted_auxiliary_reduction(
        &self,
        _problem: &dyn OptimizationProblem<T>,
        _iterate: &Iterate<T>,
        _primal_direction: &[T],
        _step_length: T,
    ) -> T {
        T::zero()
    }

    fn initialize_feasibility_problem(
        &mut self,
        problem: &L1RelaxedProblem<T>,
        iterate: &mut Iterate<T>,
    ) {
        self.subproblem_definition_changed = true;
        self.set_elastic_variable_values(problem, iterate);
    }

    fn set_elastic_variable_values(
        &self,
        problem: &L1RelaxedProblem<T>,
        iterate: &mut Iterate<T>,
    ) {
        // the elastics absorb the current constraint violation exactly
        iterate.evaluate_constraints(problem.model());
        let constraints = iterate.evaluations.constraints.clone();
        problem.set_elastic_variable_values(iterate, |iterate, constraint_index, elastic_index, jacobian_coefficient| {
            let violation = if jacobian_coefficient < T::zero() {
                // p relaxes the upper side
                constraint_residual(
                    constraints[constraint_index],
                    -T::infinity(),
                    problem.constraint_upper_bound(constraint_index),
                )
            } else {
                constraint_residual(
                    constraints[constraint_index],
                    problem.constraint_lower_bound(constraint_index),
                    T::infinity(),
                )
            };
            iterate.primals[elastic_index] = violation;
            iterate.feasibility_multipliers.lower_bounds[elastic_index] = T::zero();
            iterate.feasibility_multipliers.upper_bounds[elastic_index] = T::zero();
        });
        iterate.invalidate_evaluations();
    }

    fn exit_feasibility_problem(
        &mut self,
        _problem: &dyn OptimizationProblem<T>,
        _iterate: &mut Iterate<T>,
    ) {
        self.subproblem_definition_changed = true;
    }

    fn postprocess_iterate(
        &self,
        _problem: &dyn OptimizationProblem<T>,
        _primals: &mut [T],
        _multipliers: &mut Multipliers<T>,
    ) {
    }

    fn subproblem_definition_changed(&self) -> bool {
        self.subproblem_definition_changed
    }

    fn clear_subproblem_definition_changed(&mut self) {
        self.subproblem_definition_changed = false;
    }
}

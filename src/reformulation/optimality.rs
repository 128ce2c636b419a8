use super::{variable_complementarity, OptimizationProblem};
use crate::algebra::{FloatT, Norm, SparseVector, SymmetricMatrix};
use crate::model::Model;
use crate::optimization::{Iterate, LagrangianGradient, Multipliers, ObjectiveMeasure};

/// The original NLP, viewed through the uniform problem API with σ = 1.
pub struct OptimalityProblem<'a, T> {
    model: &'a dyn Model<T>,
    lower_bounded_variables: Vec<usize>,
    upper_bounded_variables: Vec<usize>,
    single_lower_bounded_variables: Vec<usize>,
    single_upper_bounded_variables: Vec<usize>,
    equality_constraints: Vec<usize>,
    inequality_constraints: Vec<usize>,
}

impl<'a, T: FloatT> OptimalityProblem<'a, T> {
    pub fn new(model: &'a dyn Model<T>) -> Self {
        Self {
            lower_bounded_variables: model.get_lower_bounded_variables(),
            upper_bounded_variables: model.get_upper_bounded_variables(),
            single_lower_bounded_variables: model.get_single_lower_bounded_variables(),
            single_upper_bounded_variables: model.get_single_upper_bounded_variables(),
            equality_constraints: model.get_equality_constraints(),
            inequality_constraints: model.get_inequality_constraints(),
            model,
        }
    }
}

impl<T: FloatT> OptimizationProblem<T> for OptimalityProblem<'_, T> {
    fn model(&self) -> &dyn Model<T> {
        self.model
    }

    fn number_variables(&self) -> usize {
        self.model.number_variables()
    }

    fn number_constraints(&self) -> usize {
        self.model.number_constraints()
    }

    fn get_objective_multiplier(&self) -> T {
        T::one()
    }

    fn evaluate_objective_gradient(&self, iterate: &mut Iterate<T>, gradient: &mut SparseVector<T>) {
        iterate.evaluate_objective_gradient(self.model);
        gradient.copy_from(&iterate.evaluations.objective_gradient);
    }

    fn evaluate_constraints(&self, iterate: &mut Iterate<T>, constraints: &mut [T]) {
        iterate.evaluate_constraints(self.model);
        constraints.copy_from_slice(&iterate.evaluations.constraints);
    }

    fn evaluate_constraint_jacobian(
        &self,
        iterate: &mut Iterate<T>,
        jacobian: &mut [SparseVector<T>],
    ) {
        iterate.evaluate_constraint_jacobian(self.model);
        for (out, row) in jacobian
            .iter_mut()
            .zip(iterate.evaluations.constraint_jacobian.iter())
        {
            out.copy_from(row);
        }
    }

    fn evaluate_model_lagrangian_hessian(
        &self,
        x: &[T],
        multipliers: &[T],
        hessian: &mut SymmetricMatrix<T>,
    ) {
        self.model
            .evaluate_lagrangian_hessian(x, T::one(), multipliers, hessian);
    }

    fn evaluate_lagrangian_gradient(
        &self,
        gradient: &mut LagrangianGradient<T>,
        iterate: &mut Iterate<T>,
        multipliers: &Multipliers<T>,
    ) {
        let n = self.number_variables();
        gradient.resize(n);
        gradient.clear();

        iterate.evaluate_objective_gradient(self.model);
        iterate.evaluate_constraint_jacobian(self.model);

        for (i, derivative) in iterate.evaluations.objective_gradient.iter() {
            gradient.objective_contribution[i] += derivative;
        }
        for (j, row) in iterate.evaluations.constraint_jacobian.iter().enumerate() {
            let multiplier = multipliers.constraints[j];
            if multiplier != T::zero() {
                row.add_to_dense(-multiplier, &mut gradient.constraints_contribution);
            }
        }
        for i in 0..n {
            gradient.constraints_contribution[i] -=
                multipliers.lower_bounds[i] + multipliers.upper_bounds[i];
        }
    }

    fn variable_lower_bound(&self, variable_index: usize) -> T {
        self.model.variable_lower_bound(variable_index)
    }

    fn variable_upper_bound(&self, variable_index: usize) -> T {
        self.model.variable_upper_bound(variable_index)
    }

    fn constraint_lower_bound(&self, constraint_index: usize) -> T {
        self.model.constraint_lower_bound(constraint_index)
    }

    fn constraint_upper_bound(&self, constraint_index: usize) -> T {
        self.model.constraint_upper_bound(constraint_index)
    }

    fn get_lower_bounded_variables(&self) -> &[usize] {
        &self.lower_bounded_variables
    }

    fn get_upper_bounded_variables(&self) -> &[usize] {
        &self.upper_bounded_variables
    }

    fn get_single_lower_bounded_variables(&self) -> &[usize] {
        &self.single_lower_bounded_variables
    }

    fn get_single_upper_bounded_variables(&self) -> &[usize] {
        &self.single_upper_bounded_variables
    }

    fn get_equality_constraints(&self) -> &[usize] {
        &self.equality_constraints
    }

    fn get_inequality_constraints(&self) -> &[usize] {
        &self.inequality_constraints
    }

    fn complementarity_error(
        &self,
        primals: &[T],
        constraints: &[T],
        multipliers: &Multipliers<T>,
        shift: T,
        norm: Norm,
    ) -> T {
        let variables = (0..self.number_variables()).map(|i| {
            variable_complementarity(
                primals[i],
                self.variable_lower_bound(i),
                self.variable_upper_bound(i),
                multipliers.lower_bounds[i],
                multipliers.upper_bounds[i],
                shift,
            )
        });
        let constraint_terms = (0..self.number_constraints()).map(|j| {
            let multiplier = multipliers.constraints[j];
            if multiplier > T::zero() {
                multiplier * (constraints[j] - self.constraint_lower_bound(j)) - shift
            } else if multiplier < T::zero() {
                multiplier * (constraints[j] - self.constraint_upper_bound(j)) - shift
            } else {
                T::zero()
            }
        });
        norm.of(variables.chain(constraint_terms))
    }

    fn set_infeasibility_measure(&self, iterate: &mut Iterate<T>, norm: Norm) {
        iterate.evaluate_constraints(self.model);
        iterate.progress.infeasibility = self
            .model
            .constraint_violation(&iterate.evaluations.constraints, norm);
    }

    fn set_objective_measure(&self, iterate: &mut Iterate<T>) {
        iterate.evaluate_objective(self.model);
        iterate.progress.objective = ObjectiveMeasure::scaled(iterate.evaluations.objective);
    }

    fn compute_predicted_infeasibility_reduction(
        &self,
        iterate: &Iterate<T>,
        primal_direction: &[T],
        step_length: T,
        norm: Norm,
    ) -> T {
        let current = self
            .model
            .constraint_violation(&iterate.evaluations.constraints, norm);
        let linearized = self.model.linearized_constraint_violation(
            primal_direction,
            &iterate.evaluations.constraints,
            &iterate.evaluations.constraint_jacobian,
            step_length,
            norm,
        );
        current - linearized
    }

    fn compute_predicted_objective_reduction(
        &self,
        iterate: &Iterate<T>,
        primal_direction: &[T],
        step_length: T,
        quadratic_term: T,
    ) -> ObjectiveMeasure<T> {
        let two = T::one() + T::one();
        let directional_derivative = iterate
            .evaluations
            .objective_gradient
            .dot_dense(primal_direction);
        ObjectiveMeasure {
            scaled: -step_length * directional_derivative,
            fixed: -step_length * step_length / two * quadratic_term,
        }
    }

    fn number_objective_gradient_nonzeros(&self) -> usize {
        self.model.number_objective_gradient_nonzeros()
    }

    fn number_jacobian_nonzeros(&self) -> usize {
        self.model.number_jacobian_nonzeros()
    }

    fn number_hessian_nonzeros(&self) -> usize {
        self.model.number_hessian_nonzeros()
    }
}

use super::{variable_complementarity, OptimizationProblem};
use crate::algebra::{FloatT, Norm, SparseVector, SymmetricMatrix};
use crate::model::{is_finite_bound, Model};
use crate::optimization::{Iterate, LagrangianGradient, Multipliers, ObjectiveMeasure};

/// Elastic variables of the ℓ₁ relaxation, as constraint → variable
/// mappings.  `positive` holds the variables p relaxing finite upper
/// constraint bounds (Jacobian coefficient −1), `negative` the variables n
/// relaxing finite lower bounds (+1), so that c(x) − p + n stays within its
/// bounds.
#[derive(Debug, Clone, Default)]
pub struct ElasticVariables {
    pub positive: Vec<(usize, usize)>,
    pub negative: Vec<(usize, usize)>,
}

impl ElasticVariables {
    pub fn size(&self) -> usize {
        self.positive.len() + self.negative.len()
    }
}

/// ℓ₁-relaxed view of a model:
///
/// ```text
///   minimize σ·f(x) + ρ·Σ(p + n)   subject to   c_L ≤ c(x) − p + n ≤ c_U,
///                                               x_L ≤ x ≤ x_U,  p, n ≥ 0
/// ```
///
/// σ = 0 yields the pure restoration problem; σ > 0 the ℓ₁ penalty
/// reformulation.  The Hessian is unchanged in the elastic columns.
pub struct L1RelaxedProblem<'a, T> {
    model: &'a dyn Model<T>,
    objective_multiplier: T,
    constraint_violation_coefficient: T,
    elastic_variables: ElasticVariables,
    // model variables + elastics
    lower_bounded_variables: Vec<usize>,
    single_lower_bounded_variables: Vec<usize>,
    upper_bounded_variables: Vec<usize>,
    single_upper_bounded_variables: Vec<usize>,
    equality_constraints: Vec<usize>,
    inequality_constraints: Vec<usize>,
}

impl<'a, T: FloatT> L1RelaxedProblem<'a, T> {
    pub fn new(
        model: &'a dyn Model<T>,
        objective_multiplier: T,
        constraint_violation_coefficient: T,
    ) -> Self {
        let mut elastic_variables = ElasticVariables::default();
        let mut elastic_index = model.number_variables();
        for constraint_index in 0..model.number_constraints() {
            if is_finite_bound(model.constraint_upper_bound(constraint_index)) {
                elastic_variables.positive.push((constraint_index, elastic_index));
                elastic_index += 1;
            }
            if is_finite_bound(model.constraint_lower_bound(constraint_index)) {
                elastic_variables.negative.push((constraint_index, elastic_index));
                elastic_index += 1;
            }
        }

        let elastic_range: Vec<usize> = (model.number_variables()..elastic_index).collect();
        let mut lower_bounded_variables = model.get_lower_bounded_variables();
        lower_bounded_variables.extend_from_slice(&elastic_range);
        let mut single_lower_bounded_variables = model.get_single_lower_bounded_variables();
        single_lower_bounded_variables.extend_from_slice(&elastic_range);

        Self {
            objective_multiplier,
            constraint_violation_coefficient,
            elastic_variables,
            lower_bounded_variables,
            single_lower_bounded_variables,
            upper_bounded_variables: model.get_upper_bounded_variables(),
            single_upper_bounded_variables: model.get_single_upper_bounded_variables(),
            equality_constraints: model.get_equality_constraints(),
            inequality_constraints: model.get_inequality_constraints(),
            model,
        }
    }

    pub fn elastic_variables(&self) -> &ElasticVariables {
        &self.elastic_variables
    }

    pub fn constraint_violation_coefficient(&self) -> T {
        self.constraint_violation_coefficient
    }

    pub fn set_objective_multiplier(&mut self, objective_multiplier: T) {
        debug_assert!(objective_multiplier >= T::zero());
        self.objective_multiplier = objective_multiplier;
    }

    pub fn set_constraint_violation_coefficient(&mut self, coefficient: T) {
        self.constraint_violation_coefficient = coefficient;
    }

    /// Visit the elastic variables as (constraint, elastic, Jacobian
    /// coefficient), growing the iterate to the relaxed variable space first.
    pub fn set_elastic_variable_values(
        &self,
        iterate: &mut Iterate<T>,
        mut setter: impl FnMut(&mut Iterate<T>, usize, usize, T),
    ) {
        iterate.set_number_variables(self.number_variables());
        for &(constraint_index, elastic_index) in &self.elastic_variables.positive {
            setter(iterate, constraint_index, elastic_index, -T::one());
        }
        for &(constraint_index, elastic_index) in &self.elastic_variables.negative {
            setter(iterate, constraint_index, elastic_index, T::one());
        }
    }
}

impl<T: FloatT> OptimizationProblem<T> for L1RelaxedProblem<'_, T> {
    fn model(&self) -> &dyn Model<T> {
        self.model
    }

    fn number_variables(&self) -> usize {
        self.model.number_variables() + self.elastic_variables.size()
    }

    fn number_constraints(&self) -> usize {
        self.model.number_constraints()
    }

    fn get_objective_multiplier(&self) -> T {
        self.objective_multiplier
    }

    fn evaluate_objective_gradient(&self, iterate: &mut Iterate<T>, gradient: &mut SparseVector<T>) {
        gradient.clear();
        // scale ∇f(x) by σ
        if self.objective_multiplier != T::zero() {
            iterate.evaluate_objective_gradient(self.model);
            for (i, derivative) in iterate.evaluations.objective_gradient.iter() {
                gradient.insert(i, self.objective_multiplier * derivative);
            }
        }
        // elastic contribution
        for &(_, elastic_index) in &self.elastic_variables.positive {
            gradient.insert(elastic_index, self.constraint_violation_coefficient);
        }
        for &(_, elastic_index) in &self.elastic_variables.negative {
            gradient.insert(elastic_index, self.constraint_violation_coefficient);
        }
    }

    fn evaluate_constraints(&self, iterate: &mut Iterate<T>, constraints: &mut [T]) {
        iterate.evaluate_constraints(self.model);
        constraints.copy_from_slice(&iterate.evaluations.constraints);
        for &(constraint_index, elastic_index) in &self.elastic_variables.positive {
            constraints[constraint_index] -= iterate.primals[elastic_index];
        }
        for &(constraint_index, elastic_index) in &self.elastic_variables.negative {
            constraints[constraint_index] += iterate.primals[elastic_index];
        }
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
        for &(constraint_index, elastic_index) in &self.elastic_variables.positive {
            jacobian[constraint_index].insert(elastic_index, -T::one());
        }
        for &(constraint_index, elastic_index) in &self.elastic_variables.negative {
            jacobian[constraint_index].insert(elastic_index, T::one());
        }
    }

    fn evaluate_model_lagrangian_hessian(
        &self,
        x: &[T],
        multipliers: &[T],
        hessian: &mut SymmetricMatrix<T>,
    ) {
        // the elastics do not enter the Hessian
        self.model
            .evaluate_lagrangian_hessian(x, self.objective_multiplier, multipliers, hessian);
    }

    fn evaluate_lagrangian_gradient(
        &self,
        gradient: &mut LagrangianGradient<T>,
        iterate: &mut Iterate<T>,
        multipliers: &Multipliers<T>,
    ) {
        // measured on the model variables; the elastic optimality conditions
        // are enforced by construction of the relaxed subproblem
        let n = self.model.number_variables();
        gradient.resize(n);
        gradient.clear();

        iterate.evaluate_objective_gradient(self.model);
        iterate.evaluate_constraint_jacobian(self.model);

        for (i, derivative) in iterate.evaluations.objective_gradient.iter() {
            if i < n {
                gradient.objective_contribution[i] += derivative;
            }
        }
        for (j, row) in iterate.evaluations.constraint_jacobian.iter().enumerate() {
            let multiplier = multipliers.constraints[j];
            if multiplier != T::zero() {
                for (i, derivative) in row.iter() {
                    if i < n {
                        gradient.constraints_contribution[i] -= multiplier * derivative;
                    }
                }
            }
        }
        for i in 0..n {
            gradient.constraints_contribution[i] -=
                multipliers.lower_bounds[i] + multipliers.upper_bounds[i];
        }
    }

    fn variable_lower_bound(&self, variable_index: usize) -> T {
        if variable_index < self.model.number_variables() {
            self.model.variable_lower_bound(variable_index)
        } else {
            // elastic variable in [0, +inf)
            T::zero()
        }
    }

    fn variable_upper_bound(&self, variable_index: usize) -> T {
        if variable_index < self.model.number_variables() {
            self.model.variable_upper_bound(variable_index)
        } else {
            T::infinity()
        }
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

    fn stationarity_error(
        &self,
        gradient: &LagrangianGradient<T>,
        _objective_multiplier: T,
        norm: Norm,
    ) -> T {
        // norm of the constraints' contribution of the Lagrangian gradient
        norm.of(gradient.constraints_contribution.iter().copied())
    }

    fn complementarity_error(
        &self,
        primals: &[T],
        constraints: &[T],
        multipliers: &Multipliers<T>,
        shift: T,
        norm: Norm,
    ) -> T {
        let rho = self.constraint_violation_coefficient;
        let variables = (0..self.model.number_variables()).map(|i| {
            variable_complementarity(
                primals[i],
                self.variable_lower_bound(i),
                self.variable_upper_bound(i),
                multipliers.lower_bounds[i],
                multipliers.upper_bounds[i],
                shift,
            )
        });
        // the expression for violated constraints reflects the relaxation
        let constraint_terms = (0..self.number_constraints()).map(|j| {
            let value = constraints[j];
            let lower_bound = self.constraint_lower_bound(j);
            let upper_bound = self.constraint_upper_bound(j);
            let multiplier = multipliers.constraints[j];
            if value < lower_bound {
                (rho - multiplier) * (value - lower_bound) - shift
            } else if upper_bound < value {
                (rho + multiplier) * (value - upper_bound) - shift
            } else if multiplier > T::zero() {
                multiplier * (value - lower_bound) - shift
            } else if multiplier < T::zero() {
                multiplier * (value - upper_bound) - shift
            } else {
                T::zero()
            }
        });
        norm.of(variables.chain(constraint_terms))
    }

    fn set_infeasibility_measure(&self, iterate: &mut Iterate<T>, _norm: Norm) {
        if self.objective_multiplier == T::zero() {
            // all violation lives in the objective measure
            iterate.progress.infeasibility = T::zero();
        } else {
            iterate.evaluate_constraints(self.model);
            iterate.progress.infeasibility = self
                .model
                .constraint_violation(&iterate.evaluations.constraints, Norm::L1);
        }
    }

    fn set_objective_measure(&self, iterate: &mut Iterate<T>) {
        if self.objective_multiplier == T::zero() {
            iterate.evaluate_constraints(self.model);
            let constraint_violation = self
                .model
                .constraint_violation(&iterate.evaluations.constraints, Norm::L1);
            iterate.progress.objective = ObjectiveMeasure::fixed(constraint_violation);
        } else {
            iterate.evaluate_objective(self.model);
            iterate.progress.objective = ObjectiveMeasure::scaled(iterate.evaluations.objective);
        }
    }

    fn compute_predicted_infeasibility_reduction(
        &self,
        iterate: &Iterate<T>,
        primal_direction: &[T],
        step_length: T,
        _norm: Norm,
    ) -> T {
        if self.objective_multiplier == T::zero() {
            T::zero()
        } else {
            let current = self
                .model
                .constraint_violation(&iterate.evaluations.constraints, Norm::L1);
            let linearized = self.model.linearized_constraint_violation(
                primal_direction,
                &iterate.evaluations.constraints,
                &iterate.evaluations.constraint_jacobian,
                step_length,
                Norm::L1,
            );
            current - linearized
        }
    }

    fn compute_predicted_objective_reduction(
        &self,
        iterate: &Iterate<T>,
        primal_direction: &[T],
        step_length: T,
        quadratic_term: T,
    ) -> ObjectiveMeasure<T> {
        let two = T::one() + T::one();
        let quadratic_part = -step_length * step_length / two * quadratic_term;
        if self.objective_multiplier == T::zero() {
            let current = self
                .model
                .constraint_violation(&iterate.evaluations.constraints, Norm::L1);
            let linearized = self.model.linearized_constraint_violation(
                primal_direction,
                &iterate.evaluations.constraints,
                &iterate.evaluations.constraint_jacobian,
                step_length,
                Norm::L1,
            );
            ObjectiveMeasure::fixed(
                self.constraint_violation_coefficient * (current - linearized) + quadratic_part,
            )
        } else {
            let directional_derivative = iterate
                .evaluations
                .objective_gradient
                .dot_dense(primal_direction);
            ObjectiveMeasure {
                scaled: -step_length * directional_derivative,
                fixed: quadratic_part,
            }
        }
    }

    fn number_objective_gradient_nonzeros(&self) -> usize {
        let mut number_nonzeros = self.elastic_variables.size();
        if self.objective_multiplier != T::zero() {
            number_nonzeros += self.model.number_objective_gradient_nonzeros();
        }
        number_nonzeros
    }

    fn number_jacobian_nonzeros(&self) -> usize {
        self.model.number_jacobian_nonzeros() + self.elastic_variables.size()
    }

    fn number_hessian_nonzeros(&self) -> usize {
        self.model.number_hessian_nonzeros()
    }
}

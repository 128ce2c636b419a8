use super::Model;
use crate::algebra::{FloatT, SparseVector, SymmetricMatrix};

/// View of a model in which every general inequality `c_L ≤ c_j(x) ≤ c_U`
/// has been rewritten as `c_j(x) − s_j = 0` with a new slack variable
/// `c_L ≤ s_j ≤ c_U`.  Equality constraints pass through unchanged, so all
/// constraints of the view satisfy `lb = ub`.
///
/// The Hessian is untouched (slacks enter no nonlinearity) and the Jacobian
/// rows gain a single `−1` entry in the slack column.
pub struct EqualityConstrainedModel<'a, T> {
    model: &'a dyn Model<T>,
    // constraint index → slack variable index
    slacks: Vec<(usize, usize)>,
    // per constraint: the slack column, if any
    slack_of_constraint: Vec<Option<usize>>,
}

impl<'a, T: FloatT> EqualityConstrainedModel<'a, T> {
    pub fn new(model: &'a dyn Model<T>) -> Self {
        let mut slacks = Vec::new();
        let mut slack_of_constraint = vec![None; model.number_constraints()];
        let mut next_variable = model.number_variables();
        for constraint_index in model.get_inequality_constraints() {
            slacks.push((constraint_index, next_variable));
            slack_of_constraint[constraint_index] = Some(next_variable);
            next_variable += 1;
        }
        Self {
            model,
            slacks,
            slack_of_constraint,
        }
    }
}

impl<T: FloatT> Model<T> for EqualityConstrainedModel<'_, T> {
    fn number_variables(&self) -> usize {
        self.model.number_variables() + self.slacks.len()
    }

    fn number_constraints(&self) -> usize {
        self.model.number_constraints()
    }

    fn evaluate_objective(&self, x: &[T]) -> T {
        self.model.evaluate_objective(&x[..self.model.number_variables()])
    }

    fn evaluate_objective_gradient(&self, x: &[T], gradient: &mut SparseVector<T>) {
        self.model
            .evaluate_objective_gradient(&x[..self.model.number_variables()], gradient);
    }

    fn evaluate_constraints(&self, x: &[T], constraints: &mut [T]) {
        self.model
            .evaluate_constraints(&x[..self.model.number_variables()], constraints);
        for &(constraint_index, slack_index) in &self.slacks {
            constraints[constraint_index] -= x[slack_index];
        }
    }

    fn evaluate_constraint_jacobian(&self, x: &[T], jacobian: &mut [SparseVector<T>]) {
        self.model
            .evaluate_constraint_jacobian(&x[..self.model.number_variables()], jacobian);
        for &(constraint_index, slack_index) in &self.slacks {
            jacobian[constraint_index].insert(slack_index, -T::one());
        }
    }

    fn evaluate_lagrangian_hessian(
        &self,
        x: &[T],
        objective_multiplier: T,
        multipliers: &[T],
        hessian: &mut SymmetricMatrix<T>,
    ) {
        self.model.evaluate_lagrangian_hessian(
            &x[..self.model.number_variables()],
            objective_multiplier,
            multipliers,
            hessian,
        );
    }

    fn variable_lower_bound(&self, variable_index: usize) -> T {
        if variable_index < self.model.number_variables() {
            self.model.variable_lower_bound(variable_index)
        } else {
            let (constraint_index, _) = self.slacks[variable_index - self.model.number_variables()];
            self.model.constraint_lower_bound(constraint_index)
        }
    }

    fn variable_upper_bound(&self, variable_index: usize) -> T {
        if variable_index < self.model.number_variables() {
            self.model.variable_upper_bound(variable_index)
        } else {
            let (constraint_index, _) = self.slacks[variable_index - self.model.number_variables()];
            self.model.constraint_upper_bound(constraint_index)
        }
    }

    fn constraint_lower_bound(&self, constraint_index: usize) -> T {
        if self.slack_of_constraint[constraint_index].is_some() {
            T::zero()
        } else {
            self.model.constraint_lower_bound(constraint_index)
        }
    }

    fn constraint_upper_bound(&self, constraint_index: usize) -> T {
        if self.slack_of_constraint[constraint_index].is_some() {
            T::zero()
        } else {
            self.model.constraint_upper_bound(constraint_index)
        }
    }

    fn initial_primal_point(&self, x: &mut [T]) {
        self.model
            .initial_primal_point(&mut x[..self.model.number_variables()]);
        // slacks are seeded from the constraint values by the subproblem
        // method; zero is a safe placeholder
        for &(_, slack_index) in &self.slacks {
            x[slack_index] = T::zero();
        }
    }

    fn initial_dual_point(&self, multipliers: &mut [T]) {
        self.model.initial_dual_point(multipliers);
    }

    fn number_objective_gradient_nonzeros(&self) -> usize {
        self.model.number_objective_gradient_nonzeros()
    }

    fn number_jacobian_nonzeros(&self) -> usize {
        self.model.number_jacobian_nonzeros() + self.slacks.len()
    }

    fn number_hessian_nonzeros(&self) -> usize {
        self.model.number_hessian_nonzeros()
    }

    fn get_slacks(&self) -> Vec<(usize, usize)> {
        self.slacks.clone()
    }

    fn get_linear_constraints(&self) -> Vec<usize> {
        self.model.get_linear_constraints()
    }

    fn get_equality_constraints(&self) -> Vec<usize> {
        (0..self.number_constraints()).collect()
    }

    fn get_inequality_constraints(&self) -> Vec<usize> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{is_finite_bound, INFINITY_DEFAULT};

    struct OneInequality;

    impl Model<f64> for OneInequality {
        fn number_variables(&self) -> usize {
            2
        }
        fn number_constraints(&self) -> usize {
            1
        }
        fn evaluate_objective(&self, x: &[f64]) -> f64 {
            x[0] + x[1]
        }
        fn evaluate_objective_gradient(&self, _x: &[f64], gradient: &mut SparseVector<f64>) {
            gradient.clear();
            gradient.insert(0, 1.0);
            gradient.insert(1, 1.0);
        }
        fn evaluate_constraints(&self, x: &[f64], constraints: &mut [f64]) {
            constraints[0] = x[0] * x[1];
        }
        fn evaluate_constraint_jacobian(&self, x: &[f64], jacobian: &mut [SparseVector<f64>]) {
            jacobian[0].clear();
            jacobian[0].insert(0, x[1]);
            jacobian[0].insert(1, x[0]);
        }
        fn evaluate_lagrangian_hessian(
            &self,
            _x: &[f64],
            _objective_multiplier: f64,
            multipliers: &[f64],
            hessian: &mut SymmetricMatrix<f64>,
        ) {
            hessian.reset();
            hessian.insert(0, 1, -multipliers[0]);
        }
        fn variable_lower_bound(&self, _i: usize) -> f64 {
            -INFINITY_DEFAULT
        }
        fn variable_upper_bound(&self, _i: usize) -> f64 {
            INFINITY_DEFAULT
        }
        fn constraint_lower_bound(&self, _j: usize) -> f64 {
            1.0
        }
        fn constraint_upper_bound(&self, _j: usize) -> f64 {
            INFINITY_DEFAULT
        }
        fn initial_primal_point(&self, x: &mut [f64]) {
            x.fill(2.0);
        }
        fn number_objective_gradient_nonzeros(&self) -> usize {
            2
        }
        fn number_jacobian_nonzeros(&self) -> usize {
            2
        }
        fn number_hessian_nonzeros(&self) -> usize {
            1
        }
    }

    #[test]
    fn test_slack_reformulation() {
        let model = OneInequality;
        let reformulated = EqualityConstrainedModel::new(&model);

        assert_eq!(reformulated.number_variables(), 3);
        assert_eq!(reformulated.get_slacks(), vec![(0, 2)]);
        assert_eq!(reformulated.constraint_lower_bound(0), 0.0);
        assert_eq!(reformulated.constraint_upper_bound(0), 0.0);
        // the slack carries the original constraint bounds
        assert_eq!(reformulated.variable_lower_bound(2), 1.0);
        assert!(!is_finite_bound(reformulated.variable_upper_bound(2)));

        let x = [2.0, 3.0, 5.0];
        let mut c = [0.0];
        reformulated.evaluate_constraints(&x, &mut c);
        assert_eq!(c[0], 1.0);

        let mut jacobian = vec![SparseVector::new()];
        reformulated.evaluate_constraint_jacobian(&x, &mut jacobian);
        let entries: Vec<_> = jacobian[0].iter().collect();
        assert_eq!(entries, vec![(0, 3.0), (1, 2.0), (2, -1.0)]);
    }
}

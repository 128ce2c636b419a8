use super::{DualResiduals, IterateStatus, Multipliers, ProgressMeasures};
use crate::algebra::{FloatT, SparseVector};
use crate::model::Model;

/// Cached model evaluations at the current primals.
#[derive(Debug, Clone, Default)]
pub struct Evaluations<T = f64> {
    pub objective: T,
    pub objective_gradient: SparseVector<T>,
    pub constraints: Vec<T>,
    pub constraint_jacobian: Vec<SparseVector<T>>,
}

/// The unit of state carried between outer iterations: primal-dual point,
/// evaluation caches with dirty flags, progress measures and the two dual
/// residual streams.
///
/// Invariant: whenever a dirty flag is clear, the corresponding cache
/// coincides with a fresh evaluation at `primals`.  Mutating `primals` goes
/// through [`Iterate::set_primals`], which clears all flags.
#[derive(Debug, Clone)]
pub struct Iterate<T: FloatT = f64> {
    pub number_variables: usize,
    pub primals: Vec<T>,
    pub multipliers: Multipliers<T>,
    /// second dual stream, used only while solving the feasibility problem
    pub feasibility_multipliers: Multipliers<T>,
    pub objective_multiplier: T,

    pub evaluations: Evaluations<T>,
    pub is_objective_computed: bool,
    pub is_objective_gradient_computed: bool,
    pub are_constraints_computed: bool,
    pub is_constraint_jacobian_computed: bool,

    pub progress: ProgressMeasures<T>,
    pub primal_feasibility: T,
    pub residuals: DualResiduals<T>,
    pub feasibility_residuals: DualResiduals<T>,
    pub status: IterateStatus,
}

impl<T: FloatT> Iterate<T> {
    pub fn new(number_variables: usize, number_constraints: usize) -> Self {
        Self {
            number_variables,
            primals: vec![T::zero(); number_variables],
            multipliers: Multipliers::new(number_variables, number_constraints),
            feasibility_multipliers: Multipliers::new(number_variables, number_constraints),
            objective_multiplier: T::one(),
            evaluations: Evaluations {
                objective: T::zero(),
                objective_gradient: SparseVector::new(),
                constraints: vec![T::zero(); number_constraints],
                constraint_jacobian: vec![SparseVector::new(); number_constraints],
            },
            is_objective_computed: false,
            is_objective_gradient_computed: false,
            are_constraints_computed: false,
            is_constraint_jacobian_computed: false,
            progress: ProgressMeasures::default(),
            primal_feasibility: T::infinity(),
            residuals: DualResiduals::new(number_variables),
            feasibility_residuals: DualResiduals::new(number_variables),
            status: IterateStatus::NotOptimal,
        }
    }

    /// Replace the primal point, invalidating every evaluation cache.
    pub fn set_primals(&mut self, primals: Vec<T>) {
        self.primals = primals;
        self.invalidate_evaluations();
    }

    pub fn invalidate_evaluations(&mut self) {
        self.is_objective_computed = false;
        self.is_objective_gradient_computed = false;
        self.are_constraints_computed = false;
        self.is_constraint_jacobian_computed = false;
    }

    /// Grow or shrink the variable space (slacks, elastic variables).  New
    /// entries are zero-initialized; the model evaluation caches survive
    /// only if the model variables are untouched, so they are invalidated.
    pub fn set_number_variables(&mut self, number_variables: usize) {
        if number_variables == self.number_variables {
            return;
        }
        self.number_variables = number_variables;
        self.primals.resize(number_variables, T::zero());
        self.multipliers.lower_bounds.resize(number_variables, T::zero());
        self.multipliers.upper_bounds.resize(number_variables, T::zero());
        self.feasibility_multipliers
            .lower_bounds
            .resize(number_variables, T::zero());
        self.feasibility_multipliers
            .upper_bounds
            .resize(number_variables, T::zero());
        self.invalidate_evaluations();
    }

    pub fn evaluate_objective(&mut self, model: &dyn Model<T>) {
        if !self.is_objective_computed {
            self.evaluations.objective = model.evaluate_objective(&self.primals);
            self.is_objective_computed = true;
        }
    }

    pub fn evaluate_objective_gradient(&mut self, model: &dyn Model<T>) {
        if !self.is_objective_gradient_computed {
            self.evaluations.objective_gradient.clear();
            model.evaluate_objective_gradient(&self.primals, &mut self.evaluations.objective_gradient);
            self.is_objective_gradient_computed = true;
        }
    }

    pub fn evaluate_constraints(&mut self, model: &dyn Model<T>) {
        if !self.are_constraints_computed {
            model.evaluate_constraints(&self.primals, &mut self.evaluations.constraints);
            self.are_constraints_computed = true;
        }
    }

    pub fn evaluate_constraint_jacobian(&mut self, model: &dyn Model<T>) {
        if !self.is_constraint_jacobian_computed {
            for row in &mut self.evaluations.constraint_jacobian {
                row.clear();
            }
            model.evaluate_constraint_jacobian(&self.primals, &mut self.evaluations.constraint_jacobian);
            self.is_constraint_jacobian_computed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::SymmetricMatrix;
    use crate::model::INFINITY_DEFAULT;

    struct Paraboloid;

    impl Model<f64> for Paraboloid {
        fn number_variables(&self) -> usize {
            2
        }
        fn number_constraints(&self) -> usize {
            0
        }
        fn evaluate_objective(&self, x: &[f64]) -> f64 {
            x[0] * x[0] + x[1] * x[1]
        }
        fn evaluate_objective_gradient(&self, x: &[f64], gradient: &mut SparseVector<f64>) {
            gradient.insert(0, 2.0 * x[0]);
            gradient.insert(1, 2.0 * x[1]);
        }
        fn evaluate_constraints(&self, _x: &[f64], _constraints: &mut [f64]) {}
        fn evaluate_constraint_jacobian(&self, _x: &[f64], _jacobian: &mut [SparseVector<f64>]) {}
        fn evaluate_lagrangian_hessian(
            &self,
            _x: &[f64],
            objective_multiplier: f64,
            _multipliers: &[f64],
            hessian: &mut SymmetricMatrix<f64>,
        ) {
            hessian.reset();
            hessian.insert(0, 0, 2.0 * objective_multiplier);
            hessian.insert(1, 1, 2.0 * objective_multiplier);
        }
        fn variable_lower_bound(&self, _i: usize) -> f64 {
            -INFINITY_DEFAULT
        }
        fn variable_upper_bound(&self, _i: usize) -> f64 {
            INFINITY_DEFAULT
        }
        fn constraint_lower_bound(&self, _j: usize) -> f64 {
            0.0
        }
        fn constraint_upper_bound(&self, _j: usize) -> f64 {
            0.0
        }
        fn initial_primal_point(&self, x: &mut [f64]) {
            x.fill(1.0);
        }
        fn number_objective_gradient_nonzeros(&self) -> usize {
            2
        }
        fn number_jacobian_nonzeros(&self) -> usize {
            0
        }
        fn number_hessian_nonzeros(&self) -> usize {
            2
        }
    }

    #[test]
    fn test_cache_invalidation_on_primal_update() {
        let model = Paraboloid;
        let mut iterate = Iterate::<f64>::new(2, 0);
        iterate.set_primals(vec![1.0, 2.0]);
        iterate.evaluate_objective(&model);
        assert_eq!(iterate.evaluations.objective, 5.0);
        assert!(iterate.is_objective_computed);

        iterate.set_primals(vec![0.0, 0.0]);
        assert!(!iterate.is_objective_computed);
        iterate.evaluate_objective(&model);
        assert_eq!(iterate.evaluations.objective, 0.0);
    }

    #[test]
    fn test_gradient_cache_consistency() {
        let model = Paraboloid;
        let mut iterate = Iterate::<f64>::new(2, 0);
        iterate.set_primals(vec![3.0, -1.0]);
        iterate.evaluate_objective_gradient(&model);
        let entries: Vec<_> = iterate.evaluations.objective_gradient.iter().collect();
        assert_eq!(entries, vec![(0, 6.0), (1, -2.0)]);

        // repeated evaluation does not duplicate entries
        iterate.evaluate_objective_gradient(&model);
        assert_eq!(iterate.evaluations.objective_gradient.len(), 2);
    }
}

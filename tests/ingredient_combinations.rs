#![allow(non_snake_case)]

// Cross-ingredient configurations: the LP reduction (zero Hessian through
// the QP method) and the ℓ₁ relaxation driver.

use karush::algebra::{SparseVector, SymmetricMatrix};
use karush::{Model, OptimizationStatus, SettingsBuilder, Solver, INFINITY_DEFAULT};

// min x1 + 2·x2  s.t.  x1 + x2 ≥ 1,  0 ≤ x ≤ 1: optimum at the vertex (1, 0)
struct BoxedLp;

impl Model<f64> for BoxedLp {
    fn number_variables(&self) -> usize {
        2
    }
    fn number_constraints(&self) -> usize {
        1
    }
    fn evaluate_objective(&self, x: &[f64]) -> f64 {
        x[0] + 2.0 * x[1]
    }
    fn evaluate_objective_gradient(&self, _x: &[f64], gradient: &mut SparseVector<f64>) {
        gradient.insert(0, 1.0);
        gradient.insert(1, 2.0);
    }
    fn evaluate_constraints(&self, x: &[f64], constraints: &mut [f64]) {
        constraints[0] = x[0] + x[1];
    }
    fn evaluate_constraint_jacobian(&self, _x: &[f64], jacobian: &mut [SparseVector<f64>]) {
        jacobian[0].insert(0, 1.0);
        jacobian[0].insert(1, 1.0);
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
        0.0
    }
    fn variable_upper_bound(&self, _i: usize) -> f64 {
        1.0
    }
    fn constraint_lower_bound(&self, _j: usize) -> f64 {
        1.0
    }
    fn constraint_upper_bound(&self, _j: usize) -> f64 {
        INFINITY_DEFAULT
    }
    fn initial_primal_point(&self, x: &mut [f64]) {
        x.fill(0.5);
    }
    fn get_linear_constraints(&self) -> Vec<usize> {
        vec![0]
    }
    fn number_objective_gradient_nonzeros(&self) -> usize {
        2
    }
    fn number_jacobian_nonzeros(&self) -> usize {
        2
    }
    fn number_hessian_nonzeros(&self) -> usize {
        0
    }
}

#[test]
fn test_lp_reduction_with_zero_hessian() {
    let settings = SettingsBuilder::<f64>::default()
        .inequality_handling_method("QP".to_string())
        .globalization_mechanism("TR".to_string())
        .hessian_model("zero".to_string())
        .build()
        .unwrap();
    let solver = Solver::new(settings).unwrap();
    let result = solver.solve(&BoxedLp).unwrap();

    assert_eq!(result.status, OptimizationStatus::FeasibleKktPoint);
    assert!((result.primals[0] - 1.0).abs() <= 1e-6);
    assert!(result.primals[1].abs() <= 1e-6);
    assert!((result.objective - 1.0).abs() <= 1e-6);
}

#[test]
fn test_lp_interior_point() {
    let settings = SettingsBuilder::<f64>::default().build().unwrap();
    let solver = Solver::new(settings).unwrap();
    let result = solver.solve(&BoxedLp).unwrap();

    assert_eq!(result.status, OptimizationStatus::FeasibleKktPoint);
    assert!((result.objective - 1.0).abs() <= 1e-6);
}

// min ½(x1²+x2²) s.t. x1 + x2 = 1 through the ℓ₁ relaxation driver: the
// exact penalty ρ = 1 > |y*| = 0.5 leaves the solution unchanged
struct EqualityQuadratic;

impl Model<f64> for EqualityQuadratic {
    fn number_variables(&self) -> usize {
        2
    }
    fn number_constraints(&self) -> usize {
        1
    }
    fn evaluate_objective(&self, x: &[f64]) -> f64 {
        0.5 * (x[0] * x[0] + x[1] * x[1])
    }
    fn evaluate_objective_gradient(&self, x: &[f64], gradient: &mut SparseVector<f64>) {
        gradient.insert(0, x[0]);
        gradient.insert(1, x[1]);
    }
    fn evaluate_constraints(&self, x: &[f64], constraints: &mut [f64]) {
        constraints[0] = x[0] + x[1];
    }
    fn evaluate_constraint_jacobian(&self, _x: &[f64], jacobian: &mut [SparseVector<f64>]) {
        jacobian[0].insert(0, 1.0);
        jacobian[0].insert(1, 1.0);
    }
    fn evaluate_lagrangian_hessian(
        &self,
        _x: &[f64],
        objective_multiplier: f64,
        _multipliers: &[f64],
        hessian: &mut SymmetricMatrix<f64>,
    ) {
        hessian.insert(0, 0, objective_multiplier);
        hessian.insert(1, 1, objective_multiplier);
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
        1.0
    }
    fn initial_primal_point(&self, x: &mut [f64]) {
        x.fill(0.0);
    }
    fn number_objective_gradient_nonzeros(&self) -> usize {
        2
    }
    fn number_jacobian_nonzeros(&self) -> usize {
        2
    }
    fn number_hessian_nonzeros(&self) -> usize {
        2
    }
}

#[test]
fn test_l1_relaxation_driver() {
    let settings = SettingsBuilder::<f64>::default()
        .constraint_relaxation_strategy("l1_relaxation".to_string())
        .globalization_strategy("l1_merit".to_string())
        .build()
        .unwrap();
    let solver = Solver::new(settings).unwrap();
    let result = solver.solve(&EqualityQuadratic).unwrap();

    assert_eq!(result.status, OptimizationStatus::FeasibleKktPoint);
    assert!((result.primals[0] - 0.5).abs() <= 1e-6);
    assert!((result.primals[1] - 0.5).abs() <= 1e-6);
    assert!(result.primal_feasibility <= 1e-8);
}

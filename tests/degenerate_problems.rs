#![allow(non_snake_case)]

// Degenerate end-to-end scenarios: an infeasible linear program, an
// unbounded problem, and an equality-constrained quadratic solved in
// essentially one Newton step.

use karush::algebra::{SparseVector, SymmetricMatrix};
use karush::{Model, OptimizationStatus, SettingsBuilder, Solver, INFINITY_DEFAULT};

// min x  s.t.  x ≤ 0  and  x ≥ 1: no feasible point exists
struct InfeasibleLp;

impl Model<f64> for InfeasibleLp {
    fn number_variables(&self) -> usize {
        1
    }
    fn number_constraints(&self) -> usize {
        2
    }
    fn evaluate_objective(&self, x: &[f64]) -> f64 {
        x[0]
    }
    fn evaluate_objective_gradient(&self, _x: &[f64], gradient: &mut SparseVector<f64>) {
        gradient.insert(0, 1.0);
    }
    fn evaluate_constraints(&self, x: &[f64], constraints: &mut [f64]) {
        constraints[0] = x[0];
        constraints[1] = x[0];
    }
    fn evaluate_constraint_jacobian(&self, _x: &[f64], jacobian: &mut [SparseVector<f64>]) {
        jacobian[0].insert(0, 1.0);
        jacobian[1].insert(0, 1.0);
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
    fn constraint_lower_bound(&self, j: usize) -> f64 {
        if j == 0 {
            -INFINITY_DEFAULT
        } else {
            1.0
        }
    }
    fn constraint_upper_bound(&self, j: usize) -> f64 {
        if j == 0 {
            0.0
        } else {
            INFINITY_DEFAULT
        }
    }
    fn initial_primal_point(&self, x: &mut [f64]) {
        x[0] = 0.0;
    }
    fn get_linear_constraints(&self) -> Vec<usize> {
        vec![0, 1]
    }
    fn number_objective_gradient_nonzeros(&self) -> usize {
        1
    }
    fn number_jacobian_nonzeros(&self) -> usize {
        2
    }
    fn number_hessian_nonzeros(&self) -> usize {
        0
    }
}

#[test]
fn test_infeasible_lp_converges_to_infeasible_stationary_point() {
    let settings = SettingsBuilder::<f64>::default().build().unwrap();
    let solver = Solver::new(settings).unwrap();
    let result = solver.solve(&InfeasibleLp).unwrap();

    assert_eq!(result.status, OptimizationStatus::InfeasibleStationaryPoint);
    // the gap between x ≤ 0 and x ≥ 1 cannot close
    assert!(result.primal_feasibility >= 0.4);
}

// min −x, unconstrained: the objective descends below any threshold
struct UnboundedProblem;

impl Model<f64> for UnboundedProblem {
    fn number_variables(&self) -> usize {
        1
    }
    fn number_constraints(&self) -> usize {
        0
    }
    fn evaluate_objective(&self, x: &[f64]) -> f64 {
        -x[0]
    }
    fn evaluate_objective_gradient(&self, _x: &[f64], gradient: &mut SparseVector<f64>) {
        gradient.insert(0, -1.0);
    }
    fn evaluate_constraints(&self, _x: &[f64], _constraints: &mut [f64]) {}
    fn evaluate_constraint_jacobian(&self, _x: &[f64], _jacobian: &mut [SparseVector<f64>]) {}
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
        0.0
    }
    fn constraint_upper_bound(&self, _j: usize) -> f64 {
        0.0
    }
    fn initial_primal_point(&self, x: &mut [f64]) {
        x[0] = 0.0;
    }
    fn number_objective_gradient_nonzeros(&self) -> usize {
        1
    }
    fn number_jacobian_nonzeros(&self) -> usize {
        0
    }
    fn number_hessian_nonzeros(&self) -> usize {
        0
    }
}

#[test]
fn test_unbounded_objective_is_detected() {
    let settings = SettingsBuilder::<f64>::default().build().unwrap();
    let solver = Solver::new(settings).unwrap();
    let result = solver.solve(&UnboundedProblem).unwrap();

    assert_eq!(result.status, OptimizationStatus::Unbounded);
    assert!(result.objective < -1e20);
}

// min ½(x1²+x2²) s.t. x1+x2 = 1: solved by a single Newton system
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
        2
    }
}

#[test]
fn test_equality_quadratic_newton_step() {
    let settings = SettingsBuilder::<f64>::default().build().unwrap();
    let solver = Solver::new(settings).unwrap();
    let result = solver.solve(&EqualityQuadratic).unwrap();

    assert_eq!(result.status, OptimizationStatus::FeasibleKktPoint);
    assert!((result.primals[0] - 0.5).abs() <= 1e-8);
    assert!((result.primals[1] - 0.5).abs() <= 1e-8);
    // multiplier sign follows ∇ₓL = σ∇f − Jᵀy: y* = +0.5
    assert!((result.multipliers.constraints[0] - 0.5).abs() <= 1e-6);
    // the problem is a quadratic with a linear constraint: a handful of
    // Newton systems at most
    assert!(result.iteration_count <= 5);
}

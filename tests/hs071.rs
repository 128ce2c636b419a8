#![allow(non_snake_case)]

// Hock-Schittkowski problem 71:
//   min x1*x4*(x1+x2+x3) + x3
//   s.t. x1*x2*x3*x4 ≥ 25,  x1²+x2²+x3²+x4² = 40,  1 ≤ x ≤ 5.

use karush::algebra::{SparseVector, SymmetricMatrix};
use karush::{Model, OptimizationStatus, SettingsBuilder, Solver, INFINITY_DEFAULT};

struct HS071;

impl Model<f64> for HS071 {
    fn number_variables(&self) -> usize {
        4
    }
    fn number_constraints(&self) -> usize {
        2
    }
    fn evaluate_objective(&self, x: &[f64]) -> f64 {
        x[0] * x[3] * (x[0] + x[1] + x[2]) + x[2]
    }
    fn evaluate_objective_gradient(&self, x: &[f64], gradient: &mut SparseVector<f64>) {
        gradient.insert(0, x[3] * (2.0 * x[0] + x[1] + x[2]));
        gradient.insert(1, x[0] * x[3]);
        gradient.insert(2, x[0] * x[3] + 1.0);
        gradient.insert(3, x[0] * (x[0] + x[1] + x[2]));
    }
    fn evaluate_constraints(&self, x: &[f64], constraints: &mut [f64]) {
        constraints[0] = x[0] * x[1] * x[2] * x[3];
        constraints[1] = x[0] * x[0] + x[1] * x[1] + x[2] * x[2] + x[3] * x[3];
    }
    fn evaluate_constraint_jacobian(&self, x: &[f64], jacobian: &mut [SparseVector<f64>]) {
        jacobian[0].insert(0, x[1] * x[2] * x[3]);
        jacobian[0].insert(1, x[0] * x[2] * x[3]);
        jacobian[0].insert(2, x[0] * x[1] * x[3]);
        jacobian[0].insert(3, x[0] * x[1] * x[2]);
        jacobian[1].insert(0, 2.0 * x[0]);
        jacobian[1].insert(1, 2.0 * x[1]);
        jacobian[1].insert(2, 2.0 * x[2]);
        jacobian[1].insert(3, 2.0 * x[3]);
    }
    fn evaluate_lagrangian_hessian(
        &self,
        x: &[f64],
        objective_multiplier: f64,
        multipliers: &[f64],
        hessian: &mut SymmetricMatrix<f64>,
    ) {
        let σ = objective_multiplier;
        let (y1, y2) = (multipliers[0], multipliers[1]);
        // σ·∇²f − y1·∇²c1 − y2·∇²c2, upper triangle
        hessian.insert(0, 0, σ * 2.0 * x[3] - y2 * 2.0);
        hessian.insert(0, 1, σ * x[3] - y1 * x[2] * x[3]);
        hessian.insert(0, 2, σ * x[3] - y1 * x[1] * x[3]);
        hessian.insert(0, 3, σ * (2.0 * x[0] + x[1] + x[2]) - y1 * x[1] * x[2]);
        hessian.insert(1, 1, -y2 * 2.0);
        hessian.insert(1, 2, -y1 * x[0] * x[3]);
        hessian.insert(1, 3, σ * x[0] - y1 * x[0] * x[2]);
        hessian.insert(2, 2, -y2 * 2.0);
        hessian.insert(2, 3, σ * x[0] - y1 * x[0] * x[1]);
        hessian.insert(3, 3, -y2 * 2.0);
    }
    fn variable_lower_bound(&self, _i: usize) -> f64 {
        1.0
    }
    fn variable_upper_bound(&self, _i: usize) -> f64 {
        5.0
    }
    fn constraint_lower_bound(&self, j: usize) -> f64 {
        if j == 0 {
            25.0
        } else {
            40.0
        }
    }
    fn constraint_upper_bound(&self, j: usize) -> f64 {
        if j == 0 {
            INFINITY_DEFAULT
        } else {
            40.0
        }
    }
    fn initial_primal_point(&self, x: &mut [f64]) {
        x.copy_from_slice(&[1.0, 5.0, 5.0, 1.0]);
    }
    fn number_objective_gradient_nonzeros(&self) -> usize {
        4
    }
    fn number_jacobian_nonzeros(&self) -> usize {
        8
    }
    fn number_hessian_nonzeros(&self) -> usize {
        10
    }
}

const REFERENCE_SOLUTION: [f64; 4] = [1.0, 4.742_999_6, 3.821_149_9, 1.379_408_3];
const REFERENCE_OBJECTIVE: f64 = 17.014_017_1;

#[test]
fn test_hs071_interior_point() {
    let settings = SettingsBuilder::<f64>::default().build().unwrap();
    let solver = Solver::new(settings).unwrap();
    let result = solver.solve(&HS071).unwrap();

    assert_eq!(result.status, OptimizationStatus::FeasibleKktPoint);
    for (computed, reference) in result.primals.iter().zip(REFERENCE_SOLUTION.iter()) {
        assert!(
            (computed - reference).abs() <= 1e-4,
            "solution {:?} differs from the reference",
            result.primals
        );
    }
    assert!((result.objective - REFERENCE_OBJECTIVE).abs() <= 1e-5);
    assert!(result.primal_feasibility <= 1e-8);
}

#[test]
fn test_hs071_interior_point_waechter_filter() {
    let settings = SettingsBuilder::<f64>::default()
        .globalization_strategy("waechter_filter".to_string())
        .build()
        .unwrap();
    let solver = Solver::new(settings).unwrap();
    let result = solver.solve(&HS071).unwrap();

    assert_eq!(result.status, OptimizationStatus::FeasibleKktPoint);
    assert!((result.objective - REFERENCE_OBJECTIVE).abs() <= 1e-4);
}

#[test]
fn test_hs071_multiplier_signs() {
    // lower-bound multipliers are nonnegative, upper-bound multipliers
    // nonpositive, and the inequality c1 ≥ 25 is active with y1 ≥ 0
    let settings = SettingsBuilder::<f64>::default().build().unwrap();
    let solver = Solver::new(settings).unwrap();
    let result = solver.solve(&HS071).unwrap();

    for i in 0..4 {
        assert!(result.multipliers.lower_bounds[i] >= 0.0);
        assert!(result.multipliers.upper_bounds[i] <= 0.0);
    }
    assert!(result.multipliers.constraints[0] >= -1e-10);
}

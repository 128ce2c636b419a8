#![allow(non_snake_case)]

use karush::algebra::{SparseVector, SymmetricMatrix};
use karush::{Model, OptimizationStatus, SettingsBuilder, Solver, INFINITY_DEFAULT};

struct Rosenbrock;

impl Model<f64> for Rosenbrock {
    fn number_variables(&self) -> usize {
        2
    }
    fn number_constraints(&self) -> usize {
        0
    }
    fn evaluate_objective(&self, x: &[f64]) -> f64 {
        (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2)
    }
    fn evaluate_objective_gradient(&self, x: &[f64], gradient: &mut SparseVector<f64>) {
        gradient.insert(0, -2.0 * (1.0 - x[0]) - 400.0 * x[0] * (x[1] - x[0] * x[0]));
        gradient.insert(1, 200.0 * (x[1] - x[0] * x[0]));
    }
    fn evaluate_constraints(&self, _x: &[f64], _constraints: &mut [f64]) {}
    fn evaluate_constraint_jacobian(&self, _x: &[f64], _jacobian: &mut [SparseVector<f64>]) {}
    fn evaluate_lagrangian_hessian(
        &self,
        x: &[f64],
        objective_multiplier: f64,
        _multipliers: &[f64],
        hessian: &mut SymmetricMatrix<f64>,
    ) {
        hessian.insert(
            0,
            0,
            objective_multiplier * (2.0 + 1200.0 * x[0] * x[0] - 400.0 * x[1]),
        );
        hessian.insert(0, 1, objective_multiplier * (-400.0 * x[0]));
        hessian.insert(1, 1, objective_multiplier * 200.0);
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
        x[0] = -1.2;
        x[1] = 1.0;
    }
    fn number_objective_gradient_nonzeros(&self) -> usize {
        2
    }
    fn number_jacobian_nonzeros(&self) -> usize {
        0
    }
    fn number_hessian_nonzeros(&self) -> usize {
        3
    }
}

fn assert_solved_at_minimum(result: &karush::OptimizationResult<f64>) {
    assert_eq!(result.status, OptimizationStatus::FeasibleKktPoint);
    assert!((result.primals[0] - 1.0).abs() <= 1e-5, "x1 = {}", result.primals[0]);
    assert!((result.primals[1] - 1.0).abs() <= 1e-5, "x2 = {}", result.primals[1]);
    assert!(result.objective.abs() <= 1e-9);
    assert!(result.stationarity <= 1e-8);
}

#[test]
fn test_rosenbrock_interior_point_line_search() {
    let settings = SettingsBuilder::<f64>::default().build().unwrap();
    let solver = Solver::new(settings).unwrap();
    let result = solver.solve(&Rosenbrock).unwrap();
    assert_solved_at_minimum(&result);
}

#[test]
fn test_rosenbrock_interior_point_l1_merit() {
    let settings = SettingsBuilder::<f64>::default()
        .globalization_strategy("l1_merit".to_string())
        .build()
        .unwrap();
    let solver = Solver::new(settings).unwrap();
    let result = solver.solve(&Rosenbrock).unwrap();
    assert_solved_at_minimum(&result);
}

#[test]
fn test_rosenbrock_interior_point_funnel() {
    let settings = SettingsBuilder::<f64>::default()
        .globalization_strategy("funnel".to_string())
        .build()
        .unwrap();
    let solver = Solver::new(settings).unwrap();
    let result = solver.solve(&Rosenbrock).unwrap();
    assert_solved_at_minimum(&result);
}

#[test]
fn test_rosenbrock_sqp_trust_region() {
    let settings = SettingsBuilder::<f64>::default()
        .inequality_handling_method("QP".to_string())
        .globalization_mechanism("TR".to_string())
        .build()
        .unwrap();
    let solver = Solver::new(settings).unwrap();
    let result = solver.solve(&Rosenbrock).unwrap();
    assert_solved_at_minimum(&result);
}

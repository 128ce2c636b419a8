#![allow(non_snake_case)]

// Structural laws of the core: the σ-affine and α-polynomial shape of
// predicted reductions, the sign convention of the Lagrangian gradient, and
// the boundary behavior of the barrier terms.

use karush::algebra::{Norm, SparseVector, SymmetricMatrix};
use karush::ingredients::inequality_handling::interior_point::{
    BarrierParameters, BarrierProblem,
};
use karush::optimization::{Iterate, LagrangianGradient, Multipliers};
use karush::reformulation::{OptimalityProblem, OptimizationProblem};
use karush::{Model, INFINITY_DEFAULT};

// min x1 + 2·x2 s.t. x1 − x2 = 1, x1 ≥ 0
struct SmallLp;

impl Model<f64> for SmallLp {
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
        constraints[0] = x[0] - x[1];
    }
    fn evaluate_constraint_jacobian(&self, _x: &[f64], jacobian: &mut [SparseVector<f64>]) {
        jacobian[0].insert(0, 1.0);
        jacobian[0].insert(1, -1.0);
    }
    fn evaluate_lagrangian_hessian(
        &self,
        _x: &[f64],
        _objective_multiplier: f64,
        _multipliers: &[f64],
        _hessian: &mut SymmetricMatrix<f64>,
    ) {
    }
    fn variable_lower_bound(&self, i: usize) -> f64 {
        if i == 0 {
            0.0
        } else {
            -INFINITY_DEFAULT
        }
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
        x.copy_from_slice(&[2.0, 0.5]);
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

fn evaluated_iterate(model: &SmallLp) -> Iterate<f64> {
    let mut iterate = Iterate::new(2, 1);
    model.initial_primal_point(&mut iterate.primals);
    iterate.evaluate_objective(model);
    iterate.evaluate_objective_gradient(model);
    iterate.evaluate_constraints(model);
    iterate.evaluate_constraint_jacobian(model);
    iterate
}

#[test]
fn test_predicted_objective_reduction_is_alpha_polynomial() {
    // for a fixed direction, the predicted reduction at step length α is
    // α·L + α²·Q with L, Q independent of α
    let model = SmallLp;
    let problem = OptimalityProblem::new(&model);
    let iterate = evaluated_iterate(&model);
    let direction = [0.5, -1.0];
    let quadratic_term = 3.0;

    let at = |alpha: f64| {
        problem.compute_predicted_objective_reduction(&iterate, &direction, alpha, quadratic_term)
    };
    let r1 = at(1.0);
    let r2 = at(2.0);
    let r_half = at(0.5);

    // the σ-scaled part is linear in α, the fixed part quadratic
    assert!((r2.scaled - 2.0 * r1.scaled).abs() < 1e-14);
    assert!((r2.fixed - 4.0 * r1.fixed).abs() < 1e-14);
    assert!((r_half.scaled - 0.5 * r1.scaled).abs() < 1e-14);
    assert!((r_half.fixed - 0.25 * r1.fixed).abs() < 1e-14);

    // and the measure itself is affine in σ
    assert!((r1.value(0.5) - (0.5 * r1.scaled + r1.fixed)).abs() < 1e-14);
}

#[test]
fn test_lagrangian_gradient_sign_convention() {
    // ∇ₓL = σ·∇f − Jᵀy − z_L − z_U
    let model = SmallLp;
    let problem = OptimalityProblem::new(&model);
    let mut iterate = evaluated_iterate(&model);

    let mut multipliers = Multipliers::new(2, 1);
    multipliers.constraints[0] = 3.0;
    multipliers.lower_bounds[0] = 0.25;

    let mut gradient = LagrangianGradient::new(2);
    problem.evaluate_lagrangian_gradient(&mut gradient, &mut iterate, &multipliers);

    // objective part is the σ-free ∇f
    assert_eq!(gradient.objective_contribution, vec![1.0, 2.0]);
    // constraints part: −Jᵀy − z = (−3 − 0.25, +3)
    assert_eq!(gradient.constraints_contribution, vec![-3.25, 3.0]);

    // σ = 1 stationarity assembles both parts
    let stationarity = problem.stationarity_error(&gradient, 1.0, Norm::Inf);
    assert!((stationarity - 5.0).abs() < 1e-14);
}

#[test]
fn test_unbounded_variables_contribute_no_barrier_terms() {
    let model = SmallLp;
    let problem = OptimalityProblem::new(&model);
    let mut iterate = evaluated_iterate(&model);
    let parameters = BarrierParameters {
        tau_min: 0.99,
        k_sigma: 1e10,
        regularization_exponent: 0.25,
        small_direction_factor: 10.0,
        push_variable_to_interior_k1: 1e-2,
        push_variable_to_interior_k2: 1e-2,
        damping_factor: 0.0,
    };
    let barrier_problem = BarrierProblem::new(&problem, 0.1, &parameters);

    // only x1 is bounded: one barrier gradient entry beyond ∇f
    let mut gradient = SparseVector::new();
    barrier_problem.evaluate_objective_gradient(&mut iterate, &mut gradient);
    assert_eq!(gradient.len(), 3);

    // the auxiliary measure involves only ln(x1 − 0)
    let auxiliary = barrier_problem.auxiliary_measure(&iterate);
    assert!((auxiliary - (-0.1 * (2.0f64).ln())).abs() < 1e-14);

    // a direction moving only the unbounded variable has no barrier
    // directional derivative
    let derivative = barrier_problem.barrier_term_directional_derivative(&iterate, &[0.0, 7.0]);
    assert_eq!(derivative, 0.0);
}

#[test]
fn test_interior_point_direction_respects_bounds() {
    // along an accepted interior-point solve, x + α_primal·Δx stays strictly
    // inside the bounds by construction of the fraction-to-boundary rule;
    // verify on the solved LP
    use karush::{SettingsBuilder, Solver};
    let settings = SettingsBuilder::<f64>::default().build().unwrap();
    let solver = Solver::new(settings).unwrap();
    let result = solver.solve(&SmallLp).unwrap();

    assert_eq!(result.status, karush::OptimizationStatus::FeasibleKktPoint);
    // minimize x1 + 2x2 with x1 − x2 = 1, x1 ≥ 0: optimum at x1 = 0 from
    // above, x2 = −1
    assert!(result.primals[0] >= 0.0);
    assert!((result.primals[0] - 0.0).abs() <= 1e-6);
    assert!((result.primals[1] + 1.0).abs() <= 1e-6);
    // lower bound active: nonnegative multiplier z with 1 − y − z = 0
    assert!(result.multipliers.lower_bounds[0] >= -1e-12);
}

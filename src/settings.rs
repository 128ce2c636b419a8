use crate::algebra::{AsFloatT, FloatT, Norm};
use crate::optimization::OptimizationError;
use derive_builder::Builder;

#[cfg(feature = "serde")]
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Solver configuration.
///
/// The four algorithmic ingredients are selected by name
/// (`globalization_mechanism`, `globalization_strategy`,
/// `constraint_relaxation_strategy`, `inequality_handling_method`) and every
/// numerical constant of the core is a field here.  Build with
/// [`SettingsBuilder`]; names are validated at build time.

#[derive(Builder, Debug, Clone)]
#[builder(build_fn(validate = "Self::validate"))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(bound = "T: Serialize + DeserializeOwned"))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Settings<T: FloatT> {
    // ---------------------------------
    // ingredient selection
    // ---------------------------------
    ///globalization mechanism: "TR" (trust region) or "LS" (line search)
    #[builder(default = r#""LS".to_string()"#)]
    pub globalization_mechanism: String,

    ///globalization strategy: "fletcher_filter", "waechter_filter", "funnel" or "l1_merit"
    #[builder(default = r#""fletcher_filter".to_string()"#)]
    pub globalization_strategy: String,

    ///constraint relaxation strategy: "feasibility_restoration" or "l1_relaxation"
    #[builder(default = r#""feasibility_restoration".to_string()"#)]
    pub constraint_relaxation_strategy: String,

    ///inequality handling method: "IPM" (primal-dual interior point) or "QP" (active-set SQP)
    #[builder(default = r#""IPM".to_string()"#)]
    pub inequality_handling_method: String,

    ///hessian model: "exact", "zero" or "identity"
    #[builder(default = r#""exact".to_string()"#)]
    pub hessian_model: String,

    ///direct symmetric indefinite linear solver
    #[builder(default = r#""ldl".to_string()"#)]
    pub linear_solver: String,

    ///LP solver used for zero-Hessian subproblems
    #[builder(default = r#""primal_dual".to_string()"#)]
    pub lp_solver: String,

    ///QP solver used by the SQP method
    #[builder(default = r#""primal_dual".to_string()"#)]
    pub qp_solver: String,

    // ---------------------------------
    // norms, tolerances, termination
    // ---------------------------------
    ///norm of the progress measures: "L1", "L2" or "INF"
    #[builder(default = r#""L1".to_string()"#)]
    pub progress_norm: String,

    ///norm of the termination residuals: "L1", "L2" or "INF"
    #[builder(default = r#""INF".to_string()"#)]
    pub residual_norm: String,

    ///tight termination tolerance
    #[builder(default = "(1e-8).as_T()")]
    pub tolerance: T,

    ///loose termination tolerance, must hold for several consecutive iterations
    #[builder(default = "(1e-6).as_T()")]
    pub loose_tolerance: T,

    ///consecutive iterations required at the loose tolerance
    #[builder(default = "15")]
    pub loose_tolerance_consecutive_iteration_threshold: u32,

    ///objective value below which the problem is declared unbounded
    #[builder(default = "(-1e20).as_T()")]
    pub unbounded_objective_threshold: T,

    ///threshold of the dual residual scalings s_d and s_c
    #[builder(default = "(0.01).as_T()")]
    pub residual_scaling_threshold: T,

    ///maximum number of outer iterations
    #[builder(default = "1000")]
    pub max_iterations: u32,

    ///print the iteration table
    #[builder(default = "false")]
    pub verbose: bool,

    // ---------------------------------
    // interior point
    // ---------------------------------
    ///initial barrier parameter μ₀
    #[builder(default = "(0.1).as_T()")]
    pub barrier_initial_parameter: T,

    ///initial value of the bound multipliers
    #[builder(default = "(1.0).as_T()")]
    pub barrier_default_multiplier: T,

    ///lower bound on the fraction-to-boundary coefficient τ = max(τ_min, 1−μ)
    #[builder(default = "(0.99).as_T()")]
    pub barrier_tau_min: T,

    ///κ_σ of the accepted-iterate bound-multiplier reset (Ipopt Eq. 16)
    #[builder(default = "(1e10).as_T()")]
    pub barrier_k_sigma: T,

    ///exponent κ of the dual regularization δ_d ∼ μ^κ
    #[builder(default = "(0.25).as_T()")]
    pub barrier_regularization_exponent: T,

    ///κ_small of the small-step classification (Ipopt §3.9)
    #[builder(default = "(10.0).as_T()")]
    pub barrier_small_direction_factor: T,

    ///κ₁ of the initial push of the variables into the interior
    #[builder(default = "(1e-2).as_T()")]
    pub barrier_push_variable_to_interior_k1: T,

    ///κ₂ of the initial push of the variables into the interior
    #[builder(default = "(1e-2).as_T()")]
    pub barrier_push_variable_to_interior_k2: T,

    ///κ_d damping of the barrier terms of single-bounded variables
    #[builder(default = "(1e-5).as_T()")]
    pub barrier_damping_factor: T,

    ///κ_μ of the superlinear barrier decrease μ ← min(κ_μ·μ, μ^θ_μ)
    #[builder(default = "(0.2).as_T()")]
    pub barrier_k_mu: T,

    ///θ_μ of the superlinear barrier decrease
    #[builder(default = "(1.5).as_T()")]
    pub barrier_theta_mu: T,

    ///κ_ε: the barrier problem is solved when E(μ) ≤ κ_ε·μ
    #[builder(default = "(10.0).as_T()")]
    pub barrier_k_epsilon: T,

    ///discard least-squares multipliers beyond this ∞-norm
    #[builder(default = "(1e3).as_T()")]
    pub least_square_multiplier_max_norm: T,

    ///ρ: coefficient of the constraint violation in the ℓ₁ relaxation
    #[builder(default = "(1.0).as_T()")]
    pub l1_constraint_violation_coefficient: T,

    // ---------------------------------
    // regularization
    // ---------------------------------
    ///first primal shift δ_p tried by the inertia correction
    #[builder(default = "(1e-4).as_T()")]
    pub regularization_initial_value: T,

    ///growth factor of δ_p between factorization attempts
    #[builder(default = "(8.0).as_T()")]
    pub regularization_increase_factor: T,

    ///growth factor of δ_p while no successful shift is known
    #[builder(default = "(100.0).as_T()")]
    pub regularization_fast_increase_factor: T,

    ///δ_p beyond this value raises UnstableRegularization
    #[builder(default = "(1e40).as_T()")]
    pub regularization_failure_threshold: T,

    // ---------------------------------
    // trust region
    // ---------------------------------
    ///initial trust-region radius Δ₀
    #[builder(default = "(10.0).as_T()")]
    pub tr_radius: T,

    ///radius growth factor on strongly successful steps
    #[builder(default = "(2.0).as_T()")]
    pub tr_increase_factor: T,

    ///radius shrink factor on rejected steps
    #[builder(default = "(2.0).as_T()")]
    pub tr_decrease_factor: T,

    ///radius below which the mechanism reports failure
    #[builder(default = "(1e-16).as_T()")]
    pub tr_min_radius: T,

    ///radius cap Δ_max
    #[builder(default = "(1e12).as_T()")]
    pub tr_max_radius: T,

    ///actual/predicted ratio above which the radius grows
    #[builder(default = "(0.5).as_T()")]
    pub tr_expansion_ratio_threshold: T,

    // ---------------------------------
    // line search
    // ---------------------------------
    ///backtracking ratio applied to α on rejection
    #[builder(default = "(0.5).as_T()")]
    pub ls_backtracking_ratio: T,

    ///step length below which the mechanism reports failure
    #[builder(default = "(1e-9).as_T()")]
    pub ls_min_step_length: T,

    // ---------------------------------
    // globalization strategies
    // ---------------------------------
    ///filter envelope coefficient β
    #[builder(default = "(0.999).as_T()")]
    pub filter_beta: T,

    ///filter margin coefficient γ
    #[builder(default = "(0.001).as_T()")]
    pub filter_gamma: T,

    ///δ of the switching condition Δφ_pred ≥ δ·h^{s_φ}
    #[builder(default = "(0.999).as_T()")]
    pub filter_delta: T,

    ///exponent s_φ of the switching condition
    #[builder(default = "(2.0).as_T()")]
    pub filter_switching_exponent: T,

    ///initial upper bound of the filter envelope
    #[builder(default = "(1e2).as_T()")]
    pub filter_ubd: T,

    ///factor applied to the initial infeasibility in the envelope bound
    #[builder(default = "(1.25).as_T()")]
    pub filter_fact: T,

    ///maximum number of stored filter entries
    #[builder(default = "50")]
    pub filter_max_size: usize,

    ///consecutive rejections before the Waechter filter requests restoration
    #[builder(default = "5")]
    pub filter_restoration_rejection_threshold: u32,

    ///funnel acceptance fraction κ: trials must satisfy h ≤ κ·τ
    #[builder(default = "(0.9).as_T()")]
    pub funnel_kappa: T,

    ///funnel contraction coefficient γ_h
    #[builder(default = "(0.1).as_T()")]
    pub funnel_gamma: T,

    ///η of the Armijo sufficient decrease condition
    #[builder(default = "(1e-4).as_T()")]
    pub armijo_decrease_fraction: T,

    ///compensate actual reductions for cancellation at roundoff level
    #[builder(default = "true")]
    pub protect_actual_reduction_against_roundoff: bool,

    // ---------------------------------
    // ℓ₁ relaxation driver
    // ---------------------------------
    ///initial objective multiplier σ₀ of the ℓ₁ relaxation
    #[builder(default = "(1.0).as_T()")]
    pub l1_relaxation_initial_parameter: T,

    ///decrease factor of σ when the relaxed direction stalls on infeasibility
    #[builder(default = "(10.0).as_T()")]
    pub l1_relaxation_decrease_factor: T,

    ///ε₁: required fraction of the ideal linearized infeasibility reduction
    #[builder(default = "(0.1).as_T()")]
    pub l1_relaxation_epsilon1: T,

    ///ε₂: required fraction of the ideal reduction in the steering test
    #[builder(default = "(0.1).as_T()")]
    pub l1_relaxation_epsilon2: T,
}

impl<T: FloatT> Default for Settings<T> {
    fn default() -> Settings<T> {
        SettingsBuilder::<T>::default().build().unwrap()
    }
}

impl<T: FloatT> Settings<T> {
    pub fn progress_norm(&self) -> Norm {
        // validated at build time
        Norm::from_option_string(&self.progress_norm).unwrap_or(Norm::L1)
    }

    pub fn residual_norm(&self) -> Norm {
        Norm::from_option_string(&self.residual_norm).unwrap_or(Norm::Inf)
    }

    /// Cross-field validation, called once when the solver is constructed.
    pub fn validate(&self) -> Result<(), OptimizationError> {
        let invalid = |message: String| Err(OptimizationError::InvalidConfiguration(message));

        validate_names(
            Some(&self.globalization_mechanism),
            Some(&self.globalization_strategy),
            Some(&self.constraint_relaxation_strategy),
            Some(&self.inequality_handling_method),
            Some(&self.hessian_model),
            Some(&self.progress_norm),
            Some(&self.residual_norm),
        )
        .map_err(OptimizationError::InvalidConfiguration)?;

        if self.inequality_handling_method == "IPM" && self.globalization_mechanism == "TR" {
            return invalid(
                "the interior-point method does not support a trust region; use LS".to_string(),
            );
        }
        if !(self.tolerance > T::zero()) {
            return invalid("tolerance must be positive".to_string());
        }
        if !(self.barrier_tau_min > T::zero() && self.barrier_tau_min < T::one()) {
            return invalid("barrier_tau_min must lie in (0, 1)".to_string());
        }
        if !(self.ls_backtracking_ratio > T::zero() && self.ls_backtracking_ratio < T::one()) {
            return invalid("ls_backtracking_ratio must lie in (0, 1)".to_string());
        }
        if !(self.filter_beta > T::zero() && self.filter_beta < T::one()) {
            return invalid("filter_beta must lie in (0, 1)".to_string());
        }
        if !(self.filter_gamma > T::zero() && self.filter_gamma < T::one()) {
            return invalid("filter_gamma must lie in (0, 1)".to_string());
        }
        Ok(())
    }
}

// pre-build checker (for auto-validation when using the builder)
impl<T: FloatT> SettingsBuilder<T> {
    fn validate(&self) -> Result<(), String> {
        validate_names(
            self.globalization_mechanism.as_deref(),
            self.globalization_strategy.as_deref(),
            self.constraint_relaxation_strategy.as_deref(),
            self.inequality_handling_method.as_deref(),
            self.hessian_model.as_deref(),
            self.progress_norm.as_deref(),
            self.residual_norm.as_deref(),
        )
    }
}

#[allow(clippy::too_many_arguments)]
fn validate_names(
    globalization_mechanism: Option<&str>,
    globalization_strategy: Option<&str>,
    constraint_relaxation_strategy: Option<&str>,
    inequality_handling_method: Option<&str>,
    hessian_model: Option<&str>,
    progress_norm: Option<&str>,
    residual_norm: Option<&str>,
) -> Result<(), String> {
    if let Some(name) = globalization_mechanism {
        if !matches!(name, "TR" | "LS") {
            return Err(format!("invalid globalization_mechanism: {name:?}"));
        }
    }
    if let Some(name) = globalization_strategy {
        if !matches!(name, "fletcher_filter" | "waechter_filter" | "funnel" | "l1_merit") {
            return Err(format!("invalid globalization_strategy: {name:?}"));
        }
    }
    if let Some(name) = constraint_relaxation_strategy {
        if !matches!(name, "feasibility_restoration" | "l1_relaxation") {
            return Err(format!("invalid constraint_relaxation_strategy: {name:?}"));
        }
    }
    if let Some(name) = inequality_handling_method {
        if !matches!(name, "IPM" | "QP") {
            return Err(format!("invalid inequality_handling_method: {name:?}"));
        }
    }
    if let Some(name) = hessian_model {
        if !matches!(name, "exact" | "zero" | "identity") {
            return Err(format!("invalid hessian_model: {name:?}"));
        }
    }
    for (key, value) in [("progress_norm", progress_norm), ("residual_norm", residual_norm)] {
        if let Some(name) = value {
            if Norm::from_option_string(name).is_none() {
                return Err(format!("invalid {key}: {name:?}"));
            }
        }
    }
    Ok(())
}

#[test]
fn test_settings_validate() {
    // all standard settings
    SettingsBuilder::<f64>::default().build().unwrap();

    // fail on unknown strategy names
    assert!(SettingsBuilder::<f64>::default()
        .globalization_strategy("foo".to_string())
        .build()
        .is_err());
    assert!(SettingsBuilder::<f64>::default()
        .progress_norm("L7".to_string())
        .build()
        .is_err());

    // the IPM/TR combination is rejected by the cross-field check
    let settings = SettingsBuilder::<f64>::default()
        .globalization_mechanism("TR".to_string())
        .build()
        .unwrap();
    assert!(settings.validate().is_err());

    cfg_if::cfg_if! {
        if #[cfg(feature = "serde")] {
            fn _assert_serde<S: serde::Serialize + serde::de::DeserializeOwned>() {}
            _assert_serde::<Settings<f64>>();
        }
    }
}

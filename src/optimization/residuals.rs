use crate::algebra::{FloatT, Norm};

/// Lagrangian gradient split into its objective and constraints parts, so
/// the same evaluation serves the KKT residuals (σ as-is), the FJ residuals
/// (σ = 0) and the feasibility residuals (feasibility multipliers, σ = 0).
#[derive(Debug, Clone, Default)]
pub struct LagrangianGradient<T = f64> {
    pub objective_contribution: Vec<T>,
    pub constraints_contribution: Vec<T>,
}

impl<T: FloatT> LagrangianGradient<T> {
    pub fn new(number_variables: usize) -> Self {
        Self {
            objective_contribution: vec![T::zero(); number_variables],
            constraints_contribution: vec![T::zero(); number_variables],
        }
    }

    pub fn resize(&mut self, number_variables: usize) {
        self.objective_contribution.resize(number_variables, T::zero());
        self.constraints_contribution.resize(number_variables, T::zero());
    }

    pub fn clear(&mut self) {
        self.objective_contribution.iter_mut().for_each(|g| *g = T::zero());
        self.constraints_contribution.iter_mut().for_each(|g| *g = T::zero());
    }

    /// ‖σ·(objective part) + (constraints part)‖ in the given norm.
    pub fn norm(&self, objective_multiplier: T, norm: Norm) -> T {
        norm.of(
            self.objective_contribution
                .iter()
                .zip(self.constraints_contribution.iter())
                .map(|(&g, &c)| objective_multiplier * g + c),
        )
    }
}

/// One stream of dual residuals.  Each iterate carries two: one under the
/// current objective multiplier and multipliers, one under the feasibility
/// interpretation (σ = 0, feasibility multipliers).
#[derive(Debug, Clone)]
pub struct DualResiduals<T = f64> {
    pub lagrangian_gradient: LagrangianGradient<T>,
    pub stationarity: T,
    pub complementarity: T,
    pub stationarity_scaling: T,
    pub complementarity_scaling: T,
}

impl<T: FloatT> DualResiduals<T> {
    pub fn new(number_variables: usize) -> Self {
        Self {
            lagrangian_gradient: LagrangianGradient::new(number_variables),
            stationarity: T::infinity(),
            complementarity: T::infinity(),
            stationarity_scaling: T::one(),
            complementarity_scaling: T::one(),
        }
    }
}

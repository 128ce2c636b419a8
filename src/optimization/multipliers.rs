use crate::algebra::{FloatT, VectorMath};

/// Dual state: one multiplier per general constraint and one per variable
/// bound side.
///
/// Sign convention: lower-bound multipliers are nonnegative, upper-bound
/// multipliers are nonpositive, and the Lagrangian gradient reads
/// `∇ₓL = σ∇f − Jᵀy − z_L − z_U`.
#[derive(Debug, Clone, Default)]
pub struct Multipliers<T = f64> {
    pub constraints: Vec<T>,
    pub lower_bounds: Vec<T>,
    pub upper_bounds: Vec<T>,
}

impl<T: FloatT> Multipliers<T> {
    pub fn new(number_variables: usize, number_constraints: usize) -> Self {
        Self {
            constraints: vec![T::zero(); number_constraints],
            lower_bounds: vec![T::zero(); number_variables],
            upper_bounds: vec![T::zero(); number_variables],
        }
    }

    pub fn reset(&mut self) {
        self.constraints.iter_mut().for_each(|y| *y = T::zero());
        self.lower_bounds.iter_mut().for_each(|z| *z = T::zero());
        self.upper_bounds.iter_mut().for_each(|z| *z = T::zero());
    }

    /// 1-norm over all three blocks.
    pub fn norm_one(&self) -> T {
        self.constraints.norm_one() + self.lower_bounds.norm_one() + self.upper_bounds.norm_one()
    }

    /// True if any multiplier of the first `number_variables` bound entries
    /// or any constraint multiplier exceeds `tolerance` in magnitude.
    pub fn not_all_zero(&self, number_variables: usize, tolerance: T) -> bool {
        self.constraints.iter().any(|y| y.abs() > tolerance)
            || self.lower_bounds[..number_variables]
                .iter()
                .any(|z| z.abs() > tolerance)
            || self.upper_bounds[..number_variables]
                .iter()
                .any(|z| z.abs() > tolerance)
    }
}

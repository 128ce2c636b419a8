use lazy_static::lazy_static;
use std::sync::atomic::{AtomicU64, Ordering};

/// Default threshold above which a bound is treated as infinite.
///
/// Modeling front-ends commonly encode "no bound" as ±1e20-style sentinels;
/// any bound at least this large in magnitude contributes no barrier term,
/// no bound multiplier and no bounded-variable membership.  A custom
/// threshold can be installed with [`set_infinity`] and applies at module
/// level.
pub const INFINITY_DEFAULT: f64 = 1e20;

// no AtomicF64 in std; store the bits
lazy_static! {
    static ref INFINITY: AtomicU64 = AtomicU64::new(INFINITY_DEFAULT.to_bits());
}

/// Revert the internal infinity threshold to [`INFINITY_DEFAULT`].
pub fn default_infinity() {
    INFINITY.store(INFINITY_DEFAULT.to_bits(), Ordering::Relaxed);
}

/// Set the internal infinity threshold to a new value.
pub fn set_infinity(v: f64) {
    INFINITY.store(v.to_bits(), Ordering::Relaxed);
}

/// Get the current value of the internal infinity threshold.
pub fn get_infinity() -> f64 {
    f64::from_bits(INFINITY.load(Ordering::Relaxed))
}

/// True if the value represents a finite bound under the current threshold.
pub fn is_finite_bound<T: crate::algebra::FloatT>(bound: T) -> bool {
    let threshold = T::from_f64(get_infinity()).unwrap();
    bound.abs() < threshold
}

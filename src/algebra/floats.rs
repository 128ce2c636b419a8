use num_traits::{Float, FloatConst, FromPrimitive, NumAssign};

/// Trait for floating point types used throughout the solver.
///
/// All numerical quantities (iterates, multipliers, matrix entries,
/// tolerances) are represented on values implementing `FloatT`, with
/// implementations provided for the `f32` and `f64` native types.
///
/// `FloatT` relies on [num_traits](num_traits) for most of its constituent
/// trait bounds.

pub trait FloatT:
    'static
    + Send
    + Float
    + FloatConst
    + NumAssign
    + Default
    + FromPrimitive
    + std::fmt::Display
    + std::fmt::LowerExp
    + std::fmt::Debug
{
}
impl FloatT for f32 {}
impl FloatT for f64 {}

/// Trait for converting Rust primitives to [`FloatT`](crate::algebra::FloatT)
///
/// Used internally to write algorithm constants as plain literals, e.g.
/// `(0.999).as_T()`, rather than the awkward `T::from_f64(0.999).unwrap()`.

#[allow(non_snake_case)]
pub trait AsFloatT<T>: 'static {
    fn as_T(&self) -> T;
}

macro_rules! impl_as_T {
    ($ty:ty, $ident:ident) => {
        impl<T> AsFloatT<T> for $ty
        where
            T: std::ops::Mul<T, Output = T> + FromPrimitive + 'static,
        {
            #[inline]
            fn as_T(&self) -> T {
                T::$ident(*self).unwrap()
            }
        }
    };
}
impl_as_T!(u32, from_u32);
impl_as_T!(u64, from_u64);
impl_as_T!(usize, from_usize);
impl_as_T!(f32, from_f32);
impl_as_T!(f64, from_f64);

//! The four interchangeable algorithmic ingredient families, plus the
//! Hessian and regularization strategies they share.

pub mod constraint_relaxation;
pub mod globalization_mechanisms;
pub mod globalization_strategies;
pub mod hessian_models;
pub mod inequality_handling;
pub mod regularization;

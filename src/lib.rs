//! # karush
//!
//! A modular solver for smooth constrained nonlinear optimization
//!
//! ```text
//!   minimize f(x)   subject to   c_L ≤ c(x) ≤ c_U,   x_L ≤ x ≤ x_U
//! ```
//!
//! built from four interchangeable ingredients:
//!
//! * a **constraint-relaxation strategy** (feasibility restoration or ℓ₁
//!   relaxation) driving the iteration,
//! * an **inequality-handling method** (primal-dual interior point or SQP)
//!   producing search directions,
//! * a **globalization strategy** (filter, funnel or ℓ₁ merit) accepting or
//!   rejecting trial iterates,
//! * a **globalization mechanism** (trust region or backtracking line
//!   search) orchestrating step acceptance.
//!
//! Problems are described by implementing the [`Model`] trait; the solver is
//! configured through [`Settings`] and run with [`Solver::solve`].
//!
//! Local convergence only: the solver stops at KKT or Fritz-John points, at
//! stationary points of the constraint violation, or on unboundedness.

// the math is written in math notation
#![allow(confusable_idents)]

pub mod algebra;
pub mod callbacks;
pub mod ingredients;
pub mod linear_solvers;
pub mod model;
pub mod optimization;
pub mod preprocessing;
pub mod qp_solvers;
pub mod reformulation;
pub mod settings;
pub mod solver;
pub mod statistics;

pub use callbacks::{NoUserCallbacks, UserCallbacks};
pub use model::{set_infinity, EqualityConstrainedModel, Model, INFINITY_DEFAULT};
pub use optimization::{IterateStatus, OptimizationError, OptimizationStatus};
pub use settings::{Settings, SettingsBuilder};
pub use solver::{OptimizationResult, Solver};

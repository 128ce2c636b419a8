//! Optimization state types: iterates, multipliers, directions, progress
//! measures, dual residual streams and statuses.

mod direction;
mod iterate;
mod multipliers;
mod progress;
mod residuals;
mod status;
mod warmstart;

pub use direction::*;
pub use iterate::*;
pub use multipliers::*;
pub use progress::*;
pub use residuals::*;
pub use status::*;
pub use warmstart::*;

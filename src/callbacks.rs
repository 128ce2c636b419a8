use crate::algebra::FloatT;
use crate::optimization::Multipliers;

/// User hooks invoked by the solver loop.
///
/// Cancellation is cooperative: `user_requested_stop` is polled between
/// outer iterations, and on `true` the last accepted iterate is returned
/// with status `UserRequestedStop`.
pub trait UserCallbacks<T: FloatT> {
    fn notify_acceptable_iterate(
        &mut self,
        _primals: &[T],
        _multipliers: &Multipliers<T>,
        _objective_multiplier: T,
    ) {
    }

    fn user_requested_stop(&self) -> bool {
        false
    }
}

/// Default no-op callbacks.
pub struct NoUserCallbacks;

impl<T: FloatT> UserCallbacks<T> for NoUserCallbacks {}

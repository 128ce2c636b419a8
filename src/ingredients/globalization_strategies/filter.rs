use super::{
    switching_condition, unconstrained_merit, ArmijoCondition, GlobalizationStrategy,
};
use crate::algebra::{AsFloatT, FloatT};
use crate::optimization::{Iterate, ProgressMeasures};
use crate::settings::Settings;
use crate::statistics::Statistics;

/// One stored (infeasibility, objective measure) pair.
#[derive(Debug, Clone, Copy)]
pub struct FilterEntry<T> {
    pub infeasibility: T,
    pub objective: T,
}

/// Store of non-dominated (h, φ) pairs with a β/γ envelope.
///
/// The entries form an antichain under componentwise ≤; `add` prunes
/// dominated entries and evicts the largest-infeasibility entry when the
/// store would exceed `max_size`.
pub struct Filter<T: FloatT> {
    entries: Vec<FilterEntry<T>>,
    upper_bound: T,
    max_size: usize,
    beta: T,
    gamma: T,
}

impl<T: FloatT> Filter<T> {
    pub fn new(settings: &Settings<T>) -> Self {
        Self {
            entries: Vec::new(),
            upper_bound: settings.filter_ubd,
            max_size: settings.filter_max_size,
            beta: settings.filter_beta,
            gamma: settings.filter_gamma,
        }
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.upper_bound = T::infinity();
    }

    pub fn set_upper_bound(&mut self, upper_bound: T) {
        self.upper_bound = upper_bound;
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[FilterEntry<T>] {
        &self.entries
    }

    /// Acceptability of (h, φ) against the envelope of every stored entry:
    /// `h ≤ β·h_k` or `φ ≤ φ_k − γ·h`.
    pub fn acceptable(&self, infeasibility: T, objective: T) -> bool {
        if infeasibility > self.beta * self.upper_bound {
            return false;
        }
        self.entries.iter().all(|entry| {
            infeasibility <= self.beta * entry.infeasibility
                || objective <= entry.objective - self.gamma * infeasibility
        })
    }

    /// The same envelope test against the current iterate.
    pub fn acceptable_wrt_current_iterate(
        &self,
        current_infeasibility: T,
        current_objective: T,
        trial_infeasibility: T,
        trial_objective: T,
    ) -> bool {
        trial_infeasibility <= self.beta * current_infeasibility
            || trial_objective <= current_objective - self.gamma * trial_infeasibility
    }

    /// Add (h, φ), pruning dominated entries and enforcing the size cap.
    pub fn add(&mut self, infeasibility: T, objective: T) {
        self.entries.retain(|entry| {
            !(infeasibility <= entry.infeasibility && objective <= entry.objective)
        });
        self.entries.push(FilterEntry {
            infeasibility,
            objective,
        });
        if self.entries.len() > self.max_size {
            // evict the entry with the largest infeasibility
            let (worst_index, _) = self
                .entries
                .iter()
                .enumerate()
                .fold((0, -T::infinity()), |(best, max), (index, entry)| {
                    if entry.infeasibility > max {
                        (index, entry.infeasibility)
                    } else {
                        (best, max)
                    }
                });
            self.entries.swap_remove(worst_index);
        }
    }

    pub fn smallest_infeasibility(&self) -> T {
        self.entries
            .iter()
            .map(|entry| entry.infeasibility)
            .fold(self.upper_bound, T::min)
    }

    pub fn infeasibility_sufficient_reduction(&self, reference: T, trial: T) -> bool {
        trial < self.beta * reference
    }
}

// ---------------------------------
// Fletcher filter method
// ---------------------------------

/// Filter strategy with an unconstrained sufficient-decrease condition
/// (Fletcher & Leyffer).
pub struct FletcherFilterStrategy<T: FloatT> {
    filter: Filter<T>,
    armijo: ArmijoCondition<T>,
    delta: T,
    switching_exponent: T,
    upper_bound_factor: T,
    initial_upper_bound: T,
}

impl<T: FloatT> FletcherFilterStrategy<T> {
    pub fn new(settings: &Settings<T>) -> Self {
        Self {
            filter: Filter::new(settings),
            armijo: ArmijoCondition::new(settings),
            delta: settings.filter_delta,
            switching_exponent: settings.filter_switching_exponent,
            upper_bound_factor: settings.filter_fact,
            initial_upper_bound: settings.filter_ubd,
        }
    }

    fn envelope_upper_bound(&self, initial_infeasibility: T) -> T {
        T::max(
            self.initial_upper_bound,
            self.upper_bound_factor * initial_infeasibility,
        )
    }
}

impl<T: FloatT> GlobalizationStrategy<T> for FletcherFilterStrategy<T> {
    fn initialize(&mut self, _statistics: &mut Statistics, initial_iterate: &Iterate<T>) {
        self.filter.reset();
        self.filter
            .set_upper_bound(self.envelope_upper_bound(initial_iterate.progress.infeasibility));
    }

    fn reset(&mut self) {
        self.filter.reset();
    }

    fn register_current_progress(&mut self, current_progress: &ProgressMeasures<T>) {
        self.filter
            .set_upper_bound(self.envelope_upper_bound(current_progress.infeasibility));
    }

    fn is_iterate_acceptable(
        &mut self,
        statistics: &mut Statistics,
        current_progress: &ProgressMeasures<T>,
        trial_progress: &ProgressMeasures<T>,
        predicted_reduction: &ProgressMeasures<T>,
        objective_multiplier: T,
    ) -> bool {
        // solving the feasibility problem: work on infeasibility only
        if objective_multiplier == T::zero() {
            let actual_reduction =
                current_progress.objective.value(T::zero()) - trial_progress.objective.value(T::zero());
            let accept = self.armijo.sufficient_decrease(
                predicted_reduction.objective.value(T::zero()),
                actual_reduction,
                current_progress.objective.value(T::zero()),
            );
            statistics.set_string(
                "status",
                if accept {
                    "accepted (h-type Armijo)"
                } else {
                    "rejected (h-type Armijo)"
                },
            );
            return accept;
        }

        let current_merit = unconstrained_merit(current_progress);
        let trial_merit = unconstrained_merit(trial_progress);
        let merit_predicted_reduction =
            predicted_reduction.objective.value(T::one()) + predicted_reduction.auxiliary;

        let (accept, scenario) = if !self
            .filter
            .acceptable(trial_progress.infeasibility, trial_merit)
        {
            (false, "filter")
        } else if !self.filter.acceptable_wrt_current_iterate(
            current_progress.infeasibility,
            current_merit,
            trial_progress.infeasibility,
            trial_merit,
        ) {
            (false, "current point")
        } else if switching_condition(
            merit_predicted_reduction,
            current_progress.infeasibility,
            self.delta,
            self.switching_exponent,
        ) {
            // f-type: require Armijo on the unconstrained merit
            let actual_reduction = current_merit - trial_merit;
            if self.armijo.sufficient_decrease(
                merit_predicted_reduction,
                actual_reduction,
                current_merit,
            ) {
                (true, "f-type Armijo")
            } else {
                (false, "f-type Armijo")
            }
        } else {
            // h-type: accept and block the current pair
            self.filter
                .add(current_progress.infeasibility, current_merit);
            (true, "h-type")
        };

        statistics.set_string(
            "status",
            &format!("{} ({scenario})", if accept { "accepted" } else { "rejected" }),
        );
        accept
    }

    fn is_infeasibility_sufficiently_reduced(
        &self,
        _current_progress: &ProgressMeasures<T>,
        trial_progress: &ProgressMeasures<T>,
    ) -> bool {
        self.filter.infeasibility_sufficient_reduction(
            self.filter.smallest_infeasibility(),
            trial_progress.infeasibility,
        )
    }
}

// ---------------------------------
// Waechter filter method
// ---------------------------------

/// Filter strategy in the Waechter-Biegler line-search style: near
/// feasibility the switching condition makes the Armijo test mandatory, and
/// repeated rejections with dominating infeasibility trigger restoration.
pub struct WaechterFilterStrategy<T: FloatT> {
    filter: Filter<T>,
    armijo: ArmijoCondition<T>,
    delta: T,
    switching_exponent: T,
    upper_bound_factor: T,
    initial_upper_bound: T,
    theta_min: T,
    consecutive_rejections: u32,
    rejection_threshold: u32,
    restoration_recommended: bool,
}

impl<T: FloatT> WaechterFilterStrategy<T> {
    pub fn new(settings: &Settings<T>) -> Self {
        Self {
            filter: Filter::new(settings),
            armijo: ArmijoCondition::new(settings),
            delta: settings.filter_delta,
            switching_exponent: settings.filter_switching_exponent,
            upper_bound_factor: settings.filter_fact,
            initial_upper_bound: settings.filter_ubd,
            theta_min: T::zero(),
            consecutive_rejections: 0,
            rejection_threshold: settings.filter_restoration_rejection_threshold,
            restoration_recommended: false,
        }
    }
}

impl<T: FloatT> GlobalizationStrategy<T> for WaechterFilterStrategy<T> {
    fn initialize(&mut self, _statistics: &mut Statistics, initial_iterate: &Iterate<T>) {
        let initial_infeasibility = initial_iterate.progress.infeasibility;
        self.filter.reset();
        self.filter.set_upper_bound(T::max(
            self.initial_upper_bound,
            self.upper_bound_factor * initial_infeasibility,
        ));
        self.theta_min = <f64 as AsFloatT<T>>::as_T(&1e-4) * T::max(T::one(), initial_infeasibility);
        self.consecutive_rejections = 0;
        self.restoration_recommended = false;
    }

    fn reset(&mut self) {
        self.filter.reset();
        self.consecutive_rejections = 0;
        self.restoration_recommended = false;
    }

    fn register_current_progress(&mut self, current_progress: &ProgressMeasures<T>) {
        self.filter.set_upper_bound(T::max(
            self.initial_upper_bound,
            self.upper_bound_factor * current_progress.infeasibility,
        ));
    }

    fn is_iterate_acceptable(
        &mut self,
        statistics: &mut Statistics,
        current_progress: &ProgressMeasures<T>,
        trial_progress: &ProgressMeasures<T>,
        predicted_reduction: &ProgressMeasures<T>,
        objective_multiplier: T,
    ) -> bool {
        if objective_multiplier == T::zero() {
            let actual_reduction = current_progress.objective.value(T::zero())
                - trial_progress.objective.value(T::zero());
            let accept = self.armijo.sufficient_decrease(
                predicted_reduction.objective.value(T::zero()),
                actual_reduction,
                current_progress.objective.value(T::zero()),
            );
            statistics.set_string(
                "status",
                if accept {
                    "accepted (h-type Armijo)"
                } else {
                    "rejected (h-type Armijo)"
                },
            );
            return accept;
        }

        let current_merit = unconstrained_merit(current_progress);
        let trial_merit = unconstrained_merit(trial_progress);
        let merit_predicted_reduction =
            predicted_reduction.objective.value(T::one()) + predicted_reduction.auxiliary;
        let switching = switching_condition(
            merit_predicted_reduction,
            current_progress.infeasibility,
            self.delta,
            self.switching_exponent,
        );

        let (accept, scenario) = if !self
            .filter
            .acceptable(trial_progress.infeasibility, trial_merit)
        {
            (false, "filter")
        } else if !self.filter.acceptable_wrt_current_iterate(
            current_progress.infeasibility,
            current_merit,
            trial_progress.infeasibility,
            trial_merit,
        ) {
            (false, "current point")
        } else if switching {
            let actual_reduction = current_merit - trial_merit;
            if self.armijo.sufficient_decrease(
                merit_predicted_reduction,
                actual_reduction,
                current_merit,
            ) {
                (true, "f-type Armijo")
            } else {
                (false, "f-type Armijo")
            }
        } else if current_progress.infeasibility > self.theta_min {
            self.filter
                .add(current_progress.infeasibility, current_merit);
            (true, "h-type")
        } else {
            // nearly feasible points must make objective progress
            (false, "h-type blocked near feasibility")
        };

        if accept {
            self.consecutive_rejections = 0;
            self.restoration_recommended = false;
        } else {
            self.consecutive_rejections += 1;
            // infeasibility dominates: the filter cannot make progress here
            if self.consecutive_rejections >= self.rejection_threshold
                && trial_progress.infeasibility > current_progress.infeasibility
            {
                self.restoration_recommended = true;
            }
        }

        statistics.set_string(
            "status",
            &format!("{} ({scenario})", if accept { "accepted" } else { "rejected" }),
        );
        accept
    }

    fn is_infeasibility_sufficiently_reduced(
        &self,
        _current_progress: &ProgressMeasures<T>,
        trial_progress: &ProgressMeasures<T>,
    ) -> bool {
        self.filter.infeasibility_sufficient_reduction(
            self.filter.smallest_infeasibility(),
            trial_progress.infeasibility,
        )
    }

    fn restoration_recommended(&self) -> bool {
        self.restoration_recommended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingsBuilder;

    fn test_filter() -> Filter<f64> {
        let settings = SettingsBuilder::<f64>::default()
            .filter_beta(1.0)
            .filter_gamma(0.1)
            .build()
            .unwrap();
        let mut filter = Filter::new(&settings);
        filter.set_upper_bound(f64::INFINITY);
        filter
    }

    #[test]
    fn test_filter_envelope() {
        let mut filter = test_filter();
        filter.add(1.0, 5.0);
        // dominated in h with no objective gain
        assert!(!filter.acceptable(0.9, 5.0 - 0.09 + 1.0));
        // enough objective decrease
        assert!(filter.acceptable(0.9, 4.0));
        // small enough infeasibility
        assert!(filter.acceptable(0.5, 10.0));
    }

    #[test]
    fn test_filter_is_antichain() {
        let mut filter = test_filter();
        filter.add(1.0, 5.0);
        filter.add(0.5, 6.0);
        filter.add(0.4, 4.0); // dominates both in h/φ mix? (0.4 ≤ 0.5, 4 ≤ 6): prunes (0.5, 6)
        let entries = filter.entries();
        for a in entries {
            for b in entries {
                let dominated = a.infeasibility <= b.infeasibility
                    && a.objective <= b.objective
                    && !std::ptr::eq(a, b);
                assert!(!dominated, "filter contains a dominated pair");
            }
        }
    }

    #[test]
    fn test_filter_max_size_eviction() {
        let settings = SettingsBuilder::<f64>::default()
            .filter_max_size(3usize)
            .build()
            .unwrap();
        let mut filter = Filter::new(&settings);
        filter.set_upper_bound(f64::INFINITY);
        // anti-dominated sequence: h decreasing, φ increasing
        filter.add(4.0, 1.0);
        filter.add(3.0, 2.0);
        filter.add(2.0, 3.0);
        filter.add(1.0, 4.0);
        assert_eq!(filter.size(), 3);
        // the largest-h entry was evicted
        assert!(filter
            .entries()
            .iter()
            .all(|entry| entry.infeasibility < 4.0));
    }

    #[test]
    fn test_acceptance_is_idempotent_and_pure() {
        let filter = test_filter();
        let first = filter.acceptable(0.3, 2.0);
        let second = filter.acceptable(0.3, 2.0);
        assert_eq!(first, second);
        assert_eq!(filter.size(), 0);
    }
}

// Filter acceptability against a stored entry and against the current
// iterate, with the envelope tests h ≤ β·h_k or φ ≤ φ_k − γ·h.

use karush::ingredients::globalization_strategies::Filter;
use karush::SettingsBuilder;

fn filter_with(beta: f64, gamma: f64) -> Filter<f64> {
    let settings = SettingsBuilder::<f64>::default()
        .filter_beta(beta)
        .filter_gamma(gamma)
        .build()
        .unwrap();
    let mut filter = Filter::new(&settings);
    filter.set_upper_bound(f64::INFINITY);
    filter
}

#[test]
fn test_acceptability_against_filter_and_current_iterate() {
    let mut filter = filter_with(1.0, 0.1);
    filter.add(1.0, 5.0);
    let (current_h, current_phi) = (0.5, 3.0);

    // improves both measures: acceptable everywhere
    assert!(filter.acceptable(0.4, 2.9));
    assert!(filter.acceptable_wrt_current_iterate(current_h, current_phi, 0.4, 2.9));

    // trades infeasibility for a real objective gain: the φ-envelope admits it
    assert!(filter.acceptable(0.6, 2.0));
    assert!(filter.acceptable_wrt_current_iterate(current_h, current_phi, 0.6, 2.0));

    // worse in h with no sufficient objective gain: rejected by the current
    // iterate's envelope
    assert!(!filter.acceptable_wrt_current_iterate(current_h, current_phi, 0.6, 2.95));

    // small h-progress but the objective regresses: the h-margin admits it
    assert!(filter.acceptable_wrt_current_iterate(current_h, current_phi, 0.49, 3.1));

    // dominated by the stored entry on both accounts: rejected by the filter
    assert!(!filter.acceptable(1.1, 5.5));
    assert!(!filter.acceptable(1.01, 4.95));
}

#[test]
fn test_envelope_margins() {
    let filter = filter_with(0.9, 0.1);
    let (current_h, current_phi) = (0.5, 3.0);

    // h = 0.46 > β·0.5 = 0.45, so the γ·h objective margin decides:
    // the envelope is φ ≤ 3.0 − 0.1·0.46 = 2.954
    assert!(filter.acceptable_wrt_current_iterate(current_h, current_phi, 0.46, 2.9));
    assert!(!filter.acceptable_wrt_current_iterate(current_h, current_phi, 0.46, 2.96));

    // within the β envelope, any objective value passes
    assert!(filter.acceptable_wrt_current_iterate(current_h, current_phi, 0.44, 100.0));
}

#[test]
fn test_upper_bound_blocks_large_infeasibility() {
    let mut filter = filter_with(0.999, 0.001);
    filter.set_upper_bound(10.0);
    assert!(filter.acceptable(5.0, 0.0));
    assert!(!filter.acceptable(10.1, -100.0));
}

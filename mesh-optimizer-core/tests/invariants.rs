//! Property-based checks for the invariants listed in the design
//! document: score bounds, classification monotonicity, and
//! destination-index consistency under arbitrary register/unregister
//! sequences.

use mesh_optimizer_core::{OptimizationConfig, RouteMetrics, RouteQuality, RouteScores};
use proptest::prelude::*;

proptest! {
    #[test]
    fn derived_scores_stay_in_unit_interval(
        latency in 0.0f64..5000.0,
        jitter in 0.0f64..5000.0,
        loss in 0.0f64..100.0,
        bandwidth in 0.0f64..10000.0,
        hops in 1u32..32,
    ) {
        let scores = RouteScores::compute(latency, jitter, loss, bandwidth, hops);
        prop_assert!((0.0..=1.0).contains(&scores.quality_score));
        prop_assert!((0.0..=1.0).contains(&scores.reliability_score));
        prop_assert!((0.0..=1.0).contains(&scores.efficiency_score));
    }

    #[test]
    fn classification_never_worsens_with_componentwise_better_metrics(
        latency in 0.0f64..500.0,
        loss in 0.0f64..20.0,
        latency_delta in 0.0f64..50.0,
        loss_delta in 0.0f64..5.0,
    ) {
        let cfg = OptimizationConfig::default();
        let worse_latency = latency + latency_delta;
        let worse_loss = loss + loss_delta;

        let better = RouteQuality::classify(latency, loss, &cfg);
        let worse = RouteQuality::classify(worse_latency, worse_loss, &cfg);

        prop_assert!(band_rank(better) <= band_rank(worse));
    }
}

fn band_rank(q: RouteQuality) -> u8 {
    match q {
        RouteQuality::Excellent => 0,
        RouteQuality::Good => 1,
        RouteQuality::Acceptable => 2,
        RouteQuality::Poor => 3,
        RouteQuality::Critical => 4,
    }
}

#[test]
fn destination_index_consistent_through_register_update_unregister_cycles() {
    use mesh_optimizer_core::Optimizer;
    use std::collections::HashSet;

    let opt = Optimizer::new(OptimizationConfig::default());

    opt.register_route(RouteMetrics::new("a", "D1", "peerA"));
    opt.register_route(RouteMetrics::new("b", "D1", "peerB"));
    opt.register_route(RouteMetrics::new("c", "D2", "peerC"));

    opt.update_route_metrics("a", Some(10.0), Some(0.0), Some(50.0), Some(1.0));
    opt.unregister_route("b");
    opt.register_route(RouteMetrics::new("d", "D2", "peerD"));

    let report = opt.get_route_report(None);
    let ids: HashSet<String> = report.routes.iter().map(|r| r.route_id.clone()).collect();
    assert!(ids.contains("a"));
    assert!(!ids.contains("b"));
    assert!(ids.contains("c"));
    assert!(ids.contains("d"));

    let d2 = opt.get_alternative_routes("D2", &HashSet::new(), 10);
    assert_eq!(d2.len(), 2);
}

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tsad_rust::{
    AggregationPolicy, AnomalyDetector, Context, ContextStage, PipelineConfig, RawConfig,
    ScoringError, DEFAULT_SCORE,
};

fn raw(entries: &[(&str, &str, &str)]) -> RawConfig {
    let mut config = RawConfig::new();
    for (section, key, value) in entries {
        config
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }
    config
}

fn window4_step2() -> AnomalyDetector {
    AnomalyDetector::from_sections(&raw(&[("context", "window", "4"), ("context", "step", "2")]))
        .unwrap()
}

fn argmax(scores: &[f64]) -> usize {
    scores
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &s)| if s > best.1 { (i, s) } else { best })
        .0
}

#[test]
fn flat_series_scores_zero_everywhere() {
    let scores = window4_step2().evaluate(&[0.0; 10], None).unwrap();
    assert_eq!(scores, vec![0.0; 10]);
}

#[test]
fn injected_point_has_maximum_score() {
    let series = [0.0, 0.0, 0.0, 0.0, 10.0, 0.0, 0.0, 0.0, 0.0, 0.0];
    let scores = window4_step2().evaluate(&series, None).unwrap();
    assert_eq!(scores.len(), 10);
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    assert_eq!(scores[4], max);
    assert!(scores[4] > 0.0);
    assert!(scores[4] > scores[0]);
    assert!(scores[4] > scores[9]);
}

#[test]
fn series_shorter_than_window_is_invalid_input() {
    let err = window4_step2().evaluate(&[1.0, 2.0], None).unwrap_err();
    assert!(matches!(err, ScoringError::InvalidInput(_)));
}

#[test]
fn zero_bins_fails_before_any_context() {
    let err = AnomalyDetector::from_sections(&raw(&[
        ("context", "window", "4"),
        ("discretization", "bins", "0"),
    ]))
    .unwrap_err();
    assert!(matches!(err, ScoringError::Configuration { .. }));
}

#[test]
fn non_finite_and_empty_input_are_rejected() {
    let detector = window4_step2();
    let mut calls = 0;
    let mut sink = |_: f64| calls += 1;
    let err = detector
        .evaluate(&[0.0, 1.0, f64::NAN, 0.0, 0.0], Some(&mut sink))
        .unwrap_err();
    assert!(matches!(err, ScoringError::InvalidInput(_)));
    assert!(matches!(
        detector.evaluate(&[], None),
        Err(ScoringError::InvalidInput(_))
    ));
    assert_eq!(calls, 0);
}

#[test]
fn progress_reaches_one_once_per_context() {
    let detector = window4_step2();
    let mut seen = Vec::new();
    let mut sink = |f: f64| seen.push(f);
    detector.evaluate(&[1.0; 11], Some(&mut sink)).unwrap();

    assert_eq!(seen.len(), detector.context_count(11));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert!(seen.iter().all(|&f| (0.0..=1.0).contains(&f)));
    assert_eq!(*seen.last().unwrap(), 1.0);
}

#[test]
fn spike_on_periodic_baseline_stands_out() {
    let n = 300;
    let k = 150;
    let mut series: Vec<f64> = (0..n)
        .map(|i| (2.0 * PI * i as f64 / 10.0 + 0.3).sin())
        .collect();
    series[k] += 8.0;

    let detector = AnomalyDetector::from_sections(&raw(&[
        ("context", "window", "20"),
        ("context", "step", "1"),
    ]))
    .unwrap();
    let scores = detector.evaluate(&series, None).unwrap();

    let far_max = scores
        .iter()
        .enumerate()
        .filter(|(i, _)| i.abs_diff(k) > 40)
        .map(|(_, &s)| s)
        .fold(f64::NEG_INFINITY, f64::max);
    assert!(scores[k] > far_max, "spike {} vs far {}", scores[k], far_max);
    assert_eq!(argmax(&scores), k);
}

#[test]
fn uncovered_indices_keep_default_score() {
    let detector = AnomalyDetector::from_sections(&raw(&[
        ("context", "window", "4"),
        ("context", "step", "6"),
        ("context", "coverage", "partial"),
    ]))
    .unwrap();
    let ramp: Vec<f64> = (0..13).map(|i| i as f64).collect();
    let scores = detector.evaluate(&ramp, None).unwrap();
    assert_eq!(scores.len(), 13);
    // contexts [0, 4) and [6, 10), each evaluating its last three indices
    for i in [0, 4, 5, 6, 10, 11, 12] {
        assert_eq!(scores[i], DEFAULT_SCORE, "index {i}");
    }
    for i in [1, 2, 3, 7, 8, 9] {
        assert!(scores[i] > 0.0, "index {i}");
    }
}

#[test]
fn repeated_runs_are_bit_identical() {
    let mut rng = StdRng::seed_from_u64(7);
    let series: Vec<f64> = (0..500).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let config = raw(&[
        ("context", "window", "32"),
        ("context", "step", "8"),
        ("discretization", "method", "equal_frequency"),
        ("discretization", "bins", "5"),
        ("aggregator", "method", "distance_weighted"),
    ]);
    let first = AnomalyDetector::from_sections(&config)
        .unwrap()
        .evaluate(&series, None)
        .unwrap();
    let second = AnomalyDetector::from_sections(&config)
        .unwrap()
        .evaluate(&series, None)
        .unwrap();
    let bits = |v: &[f64]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&first), bits(&second));
}

#[test]
fn every_stage_variant_produces_finite_scores() {
    let mut rng = StdRng::seed_from_u64(11);
    let series: Vec<f64> = (0..240)
        .map(|i| (i as f64 * 0.2).sin() + rng.gen_range(-0.1..0.1))
        .collect();

    for representation in ["identity", "differences", "summary", "paa"] {
        for discretization in ["equal_width", "equal_frequency"] {
            for evaluator in ["kl", "js", "hellinger", "total_variation"] {
                for aggregator in ["max", "mean", "distance_weighted"] {
                    let detector = AnomalyDetector::from_sections(&raw(&[
                        ("context", "window", "24"),
                        ("context", "step", "6"),
                        ("representation", "method", representation),
                        ("discretization", "method", discretization),
                        ("evaluator", "method", evaluator),
                        ("aggregator", "method", aggregator),
                    ]))
                    .unwrap();
                    let scores = detector.evaluate(&series, None).unwrap();
                    assert_eq!(scores.len(), series.len());
                    assert!(
                        scores.iter().all(|s| s.is_finite() && *s >= 0.0),
                        "{representation}/{discretization}/{evaluator}/{aggregator}"
                    );
                }
            }
        }
    }
}

#[test]
fn bounded_evaluators_stay_within_unit_interval() {
    let mut series = vec![0.0; 64];
    series[30] = 100.0;
    for method in ["hellinger", "total_variation"] {
        let detector = AnomalyDetector::from_sections(&raw(&[
            ("context", "window", "8"),
            ("context", "step", "2"),
            ("evaluator", "method", method),
        ]))
        .unwrap();
        let scores = detector.evaluate(&series, None).unwrap();
        assert!(scores.iter().all(|&s| (0.0..=1.0).contains(&s)), "{method}");
        assert!(scores[30] > 0.0);
    }
}

#[test]
fn degenerate_reference_fails_or_skips_by_policy() {
    let mut series = vec![1.0; 12];
    series[8] = 2.0;
    series[9] = 3.0;
    let strict = raw(&[
        ("context", "window", "6"),
        ("context", "step", "3"),
        ("discretization", "min_distinct", "2"),
    ]);

    let err = AnomalyDetector::from_sections(&strict)
        .unwrap()
        .evaluate(&series, None)
        .unwrap_err();
    match err {
        ScoringError::InsufficientData { context, stage, .. } => {
            assert_eq!(context, Some(Context::new(0, 6)));
            assert_eq!(stage, Some(ContextStage::FitDiscretizer));
        }
        other => panic!("expected insufficient data, got {other:?}"),
    }

    let mut skipping = strict.clone();
    skipping
        .entry("detector".to_string())
        .or_default()
        .insert("on_insufficient_data".to_string(), "skip".to_string());
    let report = AnomalyDetector::from_sections(&skipping)
        .unwrap()
        .evaluate_report(&series, None)
        .unwrap();
    assert_eq!(report.scores.len(), 12);
    assert_eq!(report.contexts_skipped, 2);
    assert_eq!(report.contexts_processed, 3);
    assert!(report.scores[9..].iter().any(|&s| s > 0.0));
}

#[test]
fn programmatic_config_matches_sections() {
    let mut config = PipelineConfig::with_window(4, 2).unwrap();
    config.aggregation = AggregationPolicy::Mean;
    let detector = AnomalyDetector::new(config).unwrap();
    let from_sections = AnomalyDetector::from_sections(&raw(&[
        ("context", "window", "4"),
        ("context", "step", "2"),
        ("aggregator", "method", "mean"),
    ]))
    .unwrap();
    let series = [0.0, 1.0, 0.0, 5.0, 0.0, 1.0, 0.0, 1.0];
    assert_eq!(
        detector.evaluate(&series, None).unwrap(),
        from_sections.evaluate(&series, None).unwrap()
    );
}

#[test]
fn oversized_bin_count_fails_at_construction() {
    for (method, bins) in [
        ("equal_width", usize::MAX / 4),
        ("equal_frequency", usize::MAX / 2),
    ] {
        let bins = bins.to_string();
        let err = AnomalyDetector::from_sections(&raw(&[
            ("context", "window", "4"),
            ("discretization", "method", method),
            ("discretization", "bins", bins.as_str()),
        ]))
        .unwrap_err();
        assert!(matches!(err, ScoringError::Configuration { .. }), "{method}");
    }
}

#[test]
fn single_value_evaluation_sample_fails_in_representation() {
    let config = raw(&[
        ("context", "window", "4"),
        ("context", "step", "2"),
        ("representation", "method", "differences"),
        ("evaluation_filter", "policy", "value_range"),
        ("evaluation_filter", "min", "5"),
        ("evaluation_filter", "max", "6"),
    ]);
    let series = [0.0, 1.0, 0.0, 5.5, 0.0, 0.0, 0.0, 0.0];
    let err = AnomalyDetector::from_sections(&config)
        .unwrap()
        .evaluate(&series, None)
        .unwrap_err();
    match err {
        ScoringError::InsufficientData { context, stage, .. } => {
            assert_eq!(context, Some(Context::new(0, 4)));
            assert_eq!(stage, Some(ContextStage::RepresentBoth));
        }
        other => panic!("expected insufficient data, got {other:?}"),
    }
}

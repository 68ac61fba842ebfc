//! End-to-end behavior of the ISODATA engine through its public API:
//! cluster recovery on separable data, determinism, invariants, and
//! configuration validation.

use approx::assert_relative_eq;
use gridclass_algorithms::classification::{Isodata, StorageWidth};

fn engine_with(values: &[f64], max_clusters: usize, ini: usize, min_samples: usize) -> Isodata {
    let mut engine = Isodata::new(1, StorageWidth::F64).unwrap();
    for &v in values {
        engine.add_sample(&[v]).unwrap();
    }
    engine.set_max_clusters(max_clusters).unwrap();
    engine.set_ini_clusters(ini);
    engine.set_min_samples(min_samples).unwrap();
    engine
}

#[test]
fn two_well_separated_groups() {
    let mut engine = engine_with(&[0.0, 0.0, 0.0, 10.0, 10.0, 10.0], 4, 0, 1);
    engine.run().unwrap();

    assert_eq!(engine.cluster_count(), 2);

    let mut stats: Vec<(f64, usize)> = (0..2)
        .map(|c| (engine.mean(c, 0), engine.member_count(c)))
        .collect();
    stats.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
    assert_relative_eq!(stats[0].0, 0.0);
    assert_relative_eq!(stats[1].0, 10.0);
    assert_eq!(stats[0].1, 3);
    assert_eq!(stats[1].1, 3);

    // all low samples share one label, all high samples the other
    let low = engine.cluster_of(0);
    let high = engine.cluster_of(3);
    assert_ne!(low, high);
    for i in 0..3 {
        assert_eq!(engine.cluster_of(i), low);
        assert_eq!(engine.cluster_of(i + 3), high);
    }
}

#[test]
fn three_groups_are_recovered() {
    let mut values = Vec::new();
    for _ in 0..5 {
        values.push(0.0);
    }
    for _ in 0..5 {
        values.push(50.0);
    }
    for _ in 0..5 {
        values.push(100.0);
    }

    let mut engine = engine_with(&values, 4, 0, 2);
    engine.run().unwrap();

    assert_eq!(engine.cluster_count(), 3);
    let total: usize = (0..3).map(|c| engine.member_count(c)).sum();
    assert_eq!(total, values.len());
    for i in 0..values.len() {
        assert!(engine.cluster_of(i) < engine.cluster_count());
    }
}

#[test]
fn deterministic_across_runs() {
    let values = [1.0, 4.0, 2.0, 9.0, 8.0, 3.0, 7.5, 1.5, 8.5, 2.5];

    let mut first = engine_with(&values, 4, 0, 1);
    first.run().unwrap();
    let mut second = engine_with(&values, 4, 0, 1);
    second.run().unwrap();

    assert_eq!(first.cluster_count(), second.cluster_count());
    for i in 0..values.len() {
        assert_eq!(first.cluster_of(i), second.cluster_of(i));
    }
    for c in 0..first.cluster_count() {
        assert_eq!(first.member_count(c), second.member_count(c));
        assert_relative_eq!(first.mean(c, 0), second.mean(c, 0));
        assert_relative_eq!(first.std_dev(c, 0), second.std_dev(c, 0));
    }
}

#[test]
fn cluster_count_stays_within_storage_bounds() {
    let values: Vec<f64> = (0..40).map(|i| (i % 8) as f64 * 12.5).collect();
    let mut engine = engine_with(&values, 5, 0, 1);
    engine.run().unwrap();

    assert!(engine.cluster_count() >= 1);
    assert!(engine.cluster_count() <= 2 * 5);
    for i in 0..values.len() {
        assert!(engine.cluster_of(i) < engine.cluster_count());
    }
}

#[test]
fn tight_seeds_respect_max_clusters() {
    let values = [1.0, 1.05, 0.95, 1.02, 0.98, 1.01];
    let mut engine = engine_with(&values, 3, 2, 1);
    engine.run().unwrap();

    assert!(engine.cluster_count() <= 3);
    let total: usize = (0..engine.cluster_count())
        .map(|c| engine.member_count(c))
        .sum();
    assert_eq!(total, values.len());
}

#[test]
fn read_accessors_are_idempotent() {
    let mut engine = engine_with(&[0.0, 0.0, 0.0, 10.0, 10.0, 10.0], 4, 0, 1);
    engine.run().unwrap();

    for c in 0..engine.cluster_count() {
        assert_eq!(engine.mean(c, 0), engine.mean(c, 0));
        assert_eq!(engine.std_dev(c, 0), engine.std_dev(c, 0));
        assert_eq!(engine.std_dev_max(c), engine.std_dev_max(c));
        assert_eq!(engine.avg_distance(c), engine.avg_distance(c));
        assert_eq!(engine.member_count(c), engine.member_count(c));
    }
}

#[test]
fn invalid_configurations_fail() {
    // a cluster maximum of 1 is rejected at the setter
    let mut engine = Isodata::new(1, StorageWidth::F64).unwrap();
    assert!(engine.set_max_clusters(1).is_err());

    // max_clusters must stay below the sample count
    let mut engine = engine_with(&[1.0, 2.0, 3.0], 2, 0, 1);
    engine.set_max_clusters(3).unwrap();
    assert!(engine.run().is_err());

    // a single sample cannot be clustered
    let mut engine = Isodata::new(1, StorageWidth::F64).unwrap();
    engine.add_sample(&[1.0]).unwrap();
    assert!(engine.run().is_err());
}

#[test]
fn reduced_width_narrows_on_write() {
    let mut engine = Isodata::new(1, StorageWidth::I8).unwrap();
    for _ in 0..5 {
        engine.add_sample(&[7.6]).unwrap();
    }
    engine.set_max_clusters(2).unwrap();
    engine.set_min_samples(1).unwrap();
    engine.run().unwrap();

    assert_eq!(engine.cluster_count(), 1);
    assert_relative_eq!(engine.mean(0, 0), 8.0);
}

use ndarray::{Array2, array};
use rand::{Rng, SeedableRng, rngs::StdRng};

use replay::{
    ArgumentErr, BatchSource, Collected, Dataset, DatasetKind, Partition, PrioritizedDataset,
    ReplayConfig, ReplayErr, SamplingDistribution, WeightNormalization, build_source,
    collect_into,
};

fn dataset(n: usize) -> Dataset {
    Dataset::new(
        Array2::from_shape_fn((n, 3), |(i, j)| (i + j) as f64),
        Array2::from_shape_fn((n, 2), |(i, j)| ((i + j) % 2) as f64),
        Array2::from_shape_fn((4, 3), |(i, _)| i as f64),
        Array2::zeros((4, 2)),
    )
    .unwrap()
}

fn random_priorities(rng: &mut StdRng, n: usize) -> Vec<f64> {
    (0..n)
        .map(|_| {
            // mix in exact zeros and a wide dynamic range
            if rng.random_bool(0.2) {
                0.0
            } else {
                10f64.powf(rng.random_range(-6.0..6.0))
            }
        })
        .collect()
}

#[test]
fn distributions_are_valid_for_random_priorities() {
    let mut rng = StdRng::seed_from_u64(2024);

    for _ in 0..500 {
        let n = rng.random_range(1..64);
        let mut priorities = random_priorities(&mut rng, n);
        priorities[rng.random_range(0..n)] = rng.random_range(0.1..10.0);
        let alpha = rng.random_range(0.0..=1.0);

        let dist = SamplingDistribution::build(&priorities, alpha).unwrap();
        let probs = dist.probabilities();

        assert!(probs.iter().all(|p| !p.is_nan() && *p >= 0.0));
        let sum: f64 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9, "sum {sum} for {priorities:?}");
    }
}

#[test]
fn alpha_zero_is_uniform_for_any_priorities() {
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..200 {
        let n = rng.random_range(1..40);
        let priorities = random_priorities(&mut rng, n);

        let dist = SamplingDistribution::build(&priorities, 0.0).unwrap();
        let expected = 1.0 / n as f64;
        assert!(dist.probabilities().iter().all(|&p| p == expected));
    }
}

#[test]
fn all_zero_priorities_are_exactly_uniform() {
    for n in [1, 2, 7, 100] {
        let dist = SamplingDistribution::build(&vec![0.0; n], 0.6).unwrap();
        assert!(dist.probabilities().iter().all(|&p| p == 1.0 / n as f64));
    }
}

#[test]
fn beta_zero_gives_unit_weights() {
    let config = ReplayConfig::new(1.0, 0.0).unwrap().with_seed(3);
    let mut source = PrioritizedDataset::new(dataset(10), config).unwrap();
    source
        .update_priorities(&[0, 1, 2], &[100.0, 0.01, 5.0])
        .unwrap();

    let batch = source.next_batch(64).unwrap();
    assert!(batch.weights.iter().all(|&w| w == 1.0));
}

#[test]
fn every_batch_has_a_unit_maximum_weight() {
    let mut rng = StdRng::seed_from_u64(99);
    let config = ReplayConfig::new(0.6, 0.4).unwrap().with_seed(99);
    let mut source = PrioritizedDataset::new(dataset(50), config).unwrap();

    for _ in 0..100 {
        let batch = source.next_batch(8).unwrap();
        let max = batch.weights.iter().copied().fold(0.0, f64::max);
        assert_eq!(max, 1.0);
        assert!(batch.weights.iter().all(|&w| w > 0.0));

        let losses: Vec<f64> = batch.indices.iter().map(|_| rng.random_range(0.0..3.0)).collect();
        source.update_priorities(&batch.indices, &losses).unwrap();
    }
}

#[test]
fn a_dominant_priority_is_reflected_in_the_next_batches() {
    let config = ReplayConfig::new(1.0, 1.0).unwrap().with_seed(12345);
    let mut source = PrioritizedDataset::new(dataset(4), config).unwrap();

    let probs = source.distribution().unwrap().probabilities().to_vec();
    assert!(probs.iter().all(|&p| (p - 0.25).abs() < 1e-12));

    source.update_priorities(&[2], &[100.0]).unwrap();

    let probs = source.distribution().unwrap().probabilities().to_vec();
    let expected = [0.0098, 0.0098, 0.9706, 0.0098];
    for (p, e) in probs.iter().zip(expected) {
        assert!((p - e).abs() < 5e-4, "{probs:?}");
    }

    let batch = source.next_batch(10_000).unwrap();
    let hits = batch.indices.iter().filter(|&&i| i == 2).count();
    assert!(hits > 9_000, "index 2 drawn {hits} times");

    // the rare examples carry the full correction, the dominant one a tiny weight
    let w2 = batch.weights[batch.indices.iter().position(|&i| i == 2).unwrap()];
    assert!((w2 - 1.0 / 100.0).abs() < 1e-9);
}

#[test]
fn frequency_tracks_alpha() {
    let mut shares = Vec::new();

    for alpha in [0.0, 0.5, 1.0] {
        let config = ReplayConfig::new(alpha, 1.0).unwrap().with_seed(8);
        let mut source = PrioritizedDataset::new(dataset(10), config).unwrap();
        source.update_priorities(&[7], &[1_000.0]).unwrap();

        let batch = source.next_batch(20_000).unwrap();
        let share = batch.indices.iter().filter(|&&i| i == 7).count() as f64 / 20_000.0;
        shares.push(share);
    }

    // alpha 0: 1/10, alpha 0.5: ~31.6/40.6, alpha 1: ~1000/1009
    assert!((shares[0] - 0.1).abs() < 0.02, "{shares:?}");
    assert!((shares[1] - 31.62 / 40.62).abs() < 0.02, "{shares:?}");
    assert!(shares[2] > 0.98, "{shares:?}");
}

#[test]
fn failed_refresh_leaves_priorities_untouched() {
    let mut source = PrioritizedDataset::new(dataset(4), ReplayConfig::default()).unwrap();
    source.update_priorities(&[0, 1], &[3.0, 4.0]).unwrap();

    let err = source.update_priorities(&[0, 1], &[-1.0, 2.0]).unwrap_err();
    assert!(matches!(
        err,
        ReplayErr::InvalidArgument(ArgumentErr::NegativePriority { index: 0, .. })
    ));
    assert_eq!(source.priorities().get(0), Some(3.0));
    assert_eq!(source.priorities().get(1), Some(4.0));

    let err = source.update_priorities(&[0, 1], &[1.0]).unwrap_err();
    assert!(matches!(
        err,
        ReplayErr::InvalidArgument(ArgumentErr::LengthMismatch { .. })
    ));
}

#[test]
fn absorb_grows_by_the_new_rows_seeded_with_the_old_max() {
    let mut source = PrioritizedDataset::new(dataset(6), ReplayConfig::default()).unwrap();
    source.update_priorities(&[4], &[42.0]).unwrap();
    let max_before = source.priorities().max_priority();
    let n_before = source.len();

    let x_new = Array2::from_elem((3, 3), 0.5);
    let y_new = Array2::from_elem((3, 2), 1.0);
    let range = source.absorb_new_examples(x_new.view(), y_new.view()).unwrap();

    assert_eq!(source.len(), n_before + 3);
    assert_eq!(range, n_before..n_before + 3);
    for i in range {
        assert_eq!(source.priorities().get(i), Some(max_before));
    }

    // newly absorbed examples share the top priority, so they show up right away
    let batch = source.next_batch(200).unwrap();
    assert!(batch.indices.iter().any(|&i| i >= n_before));
}

#[test]
fn evaluation_passes_are_ordered_and_unweighted() {
    let config = ReplayConfig::default().with_seed(1);
    let mut source = build_source(DatasetKind::Prioritized, dataset(5), config).unwrap();
    source.update_priorities(&[0], &[50.0]).unwrap();

    let indices: Vec<usize> = source
        .eval_batches(Partition::Validation, 3)
        .unwrap()
        .flat_map(|b| {
            assert!(b.weights.iter().all(|&w| w == 1.0));
            b.indices
        })
        .collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);

    let train: usize = source
        .eval_batches(Partition::Train, 2)
        .unwrap()
        .map(|b| b.len())
        .sum();
    assert_eq!(train, 5);
}

#[test]
fn seeded_sources_are_reproducible() {
    let config = ReplayConfig::new(0.7, 0.5)
        .unwrap()
        .with_seed(77)
        .with_normalization(WeightNormalization::Global);

    let mut a = PrioritizedDataset::new(dataset(30), config).unwrap();
    let mut b = PrioritizedDataset::new(dataset(30), config).unwrap();

    for round in 0..5 {
        let ba = a.next_batch(16).unwrap();
        let bb = b.next_batch(16).unwrap();
        assert_eq!(ba, bb, "round {round}");

        let losses: Vec<f64> = ba.indices.iter().map(|&i| (i % 7) as f64).collect();
        a.update_priorities(&ba.indices, &losses).unwrap();
        b.update_priorities(&bb.indices, &losses).unwrap();
    }
}

#[test]
fn parallel_collection_is_absorbed_in_one_step() {
    let mut source = build_source(
        DatasetKind::Prioritized,
        dataset(2),
        ReplayConfig::default().with_seed(5),
    )
    .unwrap();

    let collector = |worker_id: usize, scenarios: usize| -> replay::Result<Collected> {
        Ok(Collected {
            x: Array2::from_elem((scenarios, 3), worker_id as f64),
            y: Array2::zeros((scenarios, 2)),
        })
    };

    let ranges = collect_into(source.as_mut(), &collector, 3, 2).unwrap();
    assert_eq!(ranges, vec![2..4, 4..6, 6..8]);
    assert_eq!(source.len(), 8);

    let x = source.dataset().x(Partition::Train).to_owned();
    for (worker_id, range) in ranges.into_iter().enumerate() {
        for i in range {
            assert_eq!(x[[i, 0]], worker_id as f64);
        }
    }

    assert_eq!(x.row(0).to_vec(), array![0.0, 1.0, 2.0].to_vec());
}

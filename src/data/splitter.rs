// ============================================================
// Layer 4 — Stratified Train/Test Splitter
// ============================================================
// Shuffles samples and splits them into two disjoint sets whose
// label proportions match the whole dataset.
//
// Algorithm (stratified shuffle split, one fold):
//   1. n_test  = ceil(test_fraction * n), n_train = n - n_test
//   2. Allocate n_train across classes proportionally to class
//      size; leftover slots go to the classes with the largest
//      fractional share, ties drawn at random.
//   3. Allocate n_test the same way over what remains.
//   4. Permute each class, take its train slots then its test
//      slots; finally permute both outputs.
//
// All randomness comes from one ChaCha8 stream seeded by the
// caller, so a fixed seed always yields the same partition.

use std::collections::BTreeMap;

use rand::seq::{index, SliceRandom};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SplitError {
    #[error("cannot split an empty dataset")]
    Empty,

    #[error("the least populated class '{label}' has only {count} member; at least 2 are required")]
    ClassTooSmall { label: String, count: usize },

    #[error("{partition} partition would hold {size} samples, fewer than the {classes} classes")]
    PartitionTooSmall {
        partition: &'static str,
        size:      usize,
        classes:   usize,
    },
}

/// Split `samples` into `(train, test)` preserving the distribution of `key`.
///
/// # Example
/// ```ignore
/// let (train, test) = stratified_split(issues, |i| i.label.clone(), 0.3, 42)?;
/// ```
pub fn stratified_split<T, F>(
    samples:       Vec<T>,
    key:           F,
    test_fraction: f64,
    seed:          u64,
) -> Result<(Vec<T>, Vec<T>), SplitError>
where
    F: Fn(&T) -> String,
{
    let total = samples.len();
    if total == 0 {
        return Err(SplitError::Empty);
    }

    let n_test = ((test_fraction * total as f64).ceil() as usize).min(total);
    let n_train = total - n_test;

    // Group sample indices by class, classes in sorted order
    let mut classes: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, s) in samples.iter().enumerate() {
        classes.entry(key(s)).or_default().push(i);
    }

    if let Some((label, members)) = classes.iter().find(|(_, m)| m.len() < 2) {
        return Err(SplitError::ClassTooSmall {
            label: label.clone(),
            count: members.len(),
        });
    }
    for (partition, size) in [("train", n_train), ("test", n_test)] {
        if size < classes.len() {
            return Err(SplitError::PartitionTooSmall {
                partition,
                size,
                classes: classes.len(),
            });
        }
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let counts: Vec<usize> = classes.values().map(Vec::len).collect();
    let train_alloc = approximate_mode(&counts, n_train, &mut rng);
    let remaining: Vec<usize> = counts.iter().zip(&train_alloc).map(|(c, t)| c - t).collect();
    let test_alloc = approximate_mode(&remaining, n_test, &mut rng);

    let mut train_idx = Vec::with_capacity(n_train);
    let mut test_idx = Vec::with_capacity(n_test);
    for (c, members) in classes.values().enumerate() {
        let mut perm = members.clone();
        perm.shuffle(&mut rng);
        let (n_tr, n_te) = (train_alloc[c], test_alloc[c]);
        train_idx.extend_from_slice(&perm[..n_tr]);
        test_idx.extend_from_slice(&perm[n_tr..n_tr + n_te]);
    }
    train_idx.shuffle(&mut rng);
    test_idx.shuffle(&mut rng);

    let mut slots: Vec<Option<T>> = samples.into_iter().map(Some).collect();
    let mut take = |indices: &[usize]| -> Vec<T> {
        indices.iter().filter_map(|&i| slots[i].take()).collect()
    };
    let train = take(&train_idx);
    let test = take(&test_idx);

    tracing::debug!(
        "Stratified split: {} train, {} test over {} classes",
        train.len(),
        test.len(),
        counts.len(),
    );

    Ok((train, test))
}

/// Distribute `n_draws` over classes in proportion to `counts`.
///
/// Floors the proportional share of every class, then hands the
/// leftover draws to the largest fractional remainders. Classes
/// tied on the same remainder are picked at random.
fn approximate_mode(counts: &[usize], n_draws: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return vec![0; counts.len()];
    }

    let continuous: Vec<f64> = counts
        .iter()
        .map(|&c| c as f64 / total as f64 * n_draws as f64)
        .collect();
    let mut floored: Vec<usize> = continuous.iter().map(|v| v.floor() as usize).collect();
    let mut need = n_draws.saturating_sub(floored.iter().sum());

    if need > 0 {
        let remainder: Vec<f64> = continuous
            .iter()
            .zip(&floored)
            .map(|(v, &f)| v - f as f64)
            .collect();

        let mut values = remainder.clone();
        values.sort_by(|a, b| b.total_cmp(a));
        values.dedup();

        for value in values {
            let tied: Vec<usize> = (0..remainder.len())
                .filter(|&i| remainder[i] == value)
                .collect();
            let add_now = tied.len().min(need);
            for pick in index::sample(rng, tied.len(), add_now) {
                floored[tied[pick]] += 1;
            }
            need -= add_now;
            if need == 0 {
                break;
            }
        }
    }
    floored
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    /// (id, label) pairs: 7 × "a", 7 × "b", 6 × "c"
    fn sample_set() -> Vec<(usize, String)> {
        (0..20)
            .map(|i| {
                let label = match i % 3 { 0 => "a", 1 => "b", _ => "c" };
                (i, label.to_string())
            })
            .collect()
    }

    fn label(s: &(usize, String)) -> String {
        s.1.clone()
    }

    #[test]
    fn test_sizes_follow_ceil_of_test_fraction() {
        let (train, test) = stratified_split(sample_set(), label, 0.3, 42).unwrap();
        assert_eq!((train.len(), test.len()), (14, 6));

        let (train, valid) = stratified_split(train, label, 0.2, 42).unwrap();
        assert_eq!((train.len(), valid.len()), (11, 3));
    }

    #[test]
    fn test_partitions_are_disjoint_and_complete() {
        let (train, test) = stratified_split(sample_set(), label, 0.3, 42).unwrap();
        let a: BTreeSet<usize> = train.iter().map(|s| s.0).collect();
        let b: BTreeSet<usize> = test.iter().map(|s| s.0).collect();
        assert!(a.is_disjoint(&b));
        assert_eq!(a.union(&b).count(), 20);
    }

    #[test]
    fn test_fixed_seed_is_deterministic() {
        let first = stratified_split(sample_set(), label, 0.3, 42).unwrap();
        let second = stratified_split(sample_set(), label, 0.3, 42).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_every_class_reaches_both_sides() {
        let (train, test) = stratified_split(sample_set(), label, 0.3, 7).unwrap();
        for side in [&train, &test] {
            let labels: BTreeSet<&str> = side.iter().map(|s| s.1.as_str()).collect();
            assert_eq!(labels.len(), 3);
        }
    }

    #[test]
    fn test_proportions_are_preserved() {
        let samples: Vec<(usize, String)> = (0..100)
            .map(|i| (i, if i < 80 { "major" } else { "minor" }.to_string()))
            .collect();
        let (_, test) = stratified_split(samples, label, 0.2, 42).unwrap();
        let minor = test.iter().filter(|s| s.1 == "minor").count();
        assert_eq!(minor, 4);
    }

    #[test]
    fn test_singleton_class_is_rejected() {
        let mut samples = sample_set();
        samples.push((99, "lonely".to_string()));
        let err = stratified_split(samples, label, 0.3, 42).unwrap_err();
        assert_eq!(err, SplitError::ClassTooSmall { label: "lonely".into(), count: 1 });
    }

    #[test]
    fn test_empty_dataset_is_rejected() {
        let samples: Vec<(usize, String)> = Vec::new();
        assert_eq!(stratified_split(samples, label, 0.3, 42).unwrap_err(), SplitError::Empty);
    }

    #[test]
    fn test_approximate_mode_sums_to_draws() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let alloc = approximate_mode(&[7, 7, 6], 14, &mut rng);
        assert_eq!(alloc.iter().sum::<usize>(), 14);
        assert!(alloc.iter().zip([7, 7, 6]).all(|(a, c)| *a <= c));
    }
}

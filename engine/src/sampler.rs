use rand::seq::index;
use rand::Rng;

use crate::layout::Configuration;
use crate::memory::SimMemory;
use crate::spaces::TransitionSpace;

/// Binomial coefficient `C(n, k)` as a float.
pub fn binomial(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

/// Fill `weights` (`spaces.len()` rows of `rates.len()` columns) with the
/// activity of every (space, number of flips) pair, cumulated row-major.
fn cumulative_weights(spaces: &[TransitionSpace], rates: &[f64], weights: &mut [f64]) {
    let n = rates.len();
    for (space, row) in spaces.iter().zip(weights.chunks_mut(n)) {
        let l = space.irreversible.len();
        let h = space.reversible.len();
        if l > 0 {
            row[l - 1] = 1.0;
        }
        for k in 1..=h {
            row[l + k - 1] = binomial(h, k);
        }
        for (w, r) in row.iter_mut().zip(rates) {
            *w *= r;
        }
    }
    let mut acc = 0.0;
    for w in weights.iter_mut() {
        acc += *w;
        *w = acc;
    }
}

/// Total weight of the transitions of `spaces` under `rates`, without
/// touching the scratch buffer.
pub fn transition_weight(spaces: &[TransitionSpace], rates: &[f64]) -> f64 {
    spaces
        .iter()
        .map(|space| {
            let l = space.irreversible.len();
            let h = space.reversible.len();
            let alone = if l > 0 { rates[l - 1] } else { 0.0 };
            alone + (1..=h).map(|k| binomial(h, k) * rates[l + k - 1]).sum::<f64>()
        })
        .sum()
}

/// Apply one random transition to `x`.
///
/// The space and the number of flips `m` are drawn jointly with probability
/// proportional to their weight. Every irreversible node of the chosen space
/// flips, plus `m - |L|` reversible nodes drawn without replacement.
///
/// Returns `false`, leaving `x` untouched, when the rates give every
/// transition zero weight. `spaces` must not be empty.
pub fn sample_configuration<R: Rng + ?Sized>(
    x: &mut Configuration,
    spaces: &[TransitionSpace],
    rates: &[f64],
    mem: &mut SimMemory,
    rng: &mut R,
) -> bool {
    assert!(!spaces.is_empty(), "sampling from an empty set of spaces");
    let n = rates.len();
    assert_eq!(n, x.len());

    let weights = mem.weights(spaces.len());
    cumulative_weights(spaces, rates, weights);
    let total = weights[weights.len() - 1];
    if total <= 0.0 {
        return false;
    }
    let draw = rng.gen_range(0.0..total);
    let cell = weights.partition_point(|&c| c <= draw);
    let space = &spaces[cell / n];
    let m = cell % n + 1;

    for i in space.irreversible.iter() {
        x.flip(i);
    }
    let extra = m - space.irreversible.len();
    if extra > 0 {
        let reversible = space.reversible.to_vec();
        for k in index::sample(rng, reversible.len(), extra) {
            x.flip(reversible[k]);
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::NodeSet;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn space(n: usize, h: &[usize], l: &[usize]) -> TransitionSpace {
        TransitionSpace {
            reversible: NodeSet::from_indices(n, h.iter().copied()),
            irreversible: NodeSet::from_indices(n, l.iter().copied()),
        }
    }

    fn flipped(before: &Configuration, after: &Configuration) -> Vec<usize> {
        (0..before.len())
            .filter(|&i| before.get(i) != after.get(i))
            .collect()
    }

    #[test]
    fn binomial_values() {
        assert_eq!(binomial(4, 0), 1.0);
        assert_eq!(binomial(4, 2), 6.0);
        assert_eq!(binomial(5, 5), 1.0);
        assert_eq!(binomial(2, 3), 0.0);
    }

    #[test]
    fn weights_layout() {
        let spaces = [space(4, &[0, 1, 2], &[]), space(4, &[1], &[3])];
        let mut w = [0.0; 8];
        cumulative_weights(&spaces, &[1.0; 4], &mut w);
        // row 0: C(3,1) C(3,2) C(3,3) 0 ; row 1: L alone, then L + one of H
        assert_eq!(w, [3.0, 6.0, 7.0, 7.0, 8.0, 9.0, 9.0, 9.0]);
        assert_eq!(transition_weight(&spaces, &[1.0; 4]), 9.0);
        assert_eq!(transition_weight(&spaces, &[0.0, 0.0, 0.0, 1.0]), 0.0);
        assert_eq!(transition_weight(&spaces, &[0.0, 1.0, 0.0, 0.0]), 4.0);
    }

    #[test]
    fn asynchronous_rates_flip_one_node() {
        let spaces = [space(3, &[0, 1, 2], &[])];
        let rates = [1.0, 0.0, 0.0];
        let mut mem = SimMemory::new(3, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut hits = [0usize; 3];
        for _ in 0..300 {
            let before = Configuration::zeros(3);
            let mut x = before.clone();
            assert!(sample_configuration(&mut x, &spaces, &rates, &mut mem, &mut rng));
            let f = flipped(&before, &x);
            assert_eq!(f.len(), 1);
            hits[f[0]] += 1;
        }
        assert!(hits.iter().all(|&h| h > 50), "{hits:?}");
    }

    #[test]
    fn zero_weight_is_a_no_op() {
        let spaces = [space(2, &[], &[0, 1])];
        let mut x = Configuration::zeros(2);
        let mut mem = SimMemory::new(2, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(!sample_configuration(
            &mut x,
            &spaces,
            &[1.0, 0.0],
            &mut mem,
            &mut rng
        ));
        assert_eq!(x, Configuration::zeros(2));
    }

    #[test]
    #[should_panic]
    fn empty_spaces_is_a_programming_error() {
        let mut x = Configuration::zeros(2);
        let mut mem = SimMemory::new(2, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        sample_configuration(&mut x, &[], &[1.0, 1.0], &mut mem, &mut rng);
    }

    proptest! {
        #[test]
        fn flips_all_of_l_and_at_most_h_plus_l(seed in any::<u64>(),
                                               h_mask in 0u8..64,
                                               l_mask in 0u8..64) {
            let n = 6;
            let h: Vec<usize> = (0..n).filter(|i| h_mask & (1u8 << i) != 0).collect();
            let l: Vec<usize> = (0..n)
                .filter(|i| l_mask & (1u8 << i) != 0 && h_mask & (1u8 << i) == 0)
                .collect();
            prop_assume!(!h.is_empty() || !l.is_empty());
            let spaces = [space(n, &h, &l)];
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut mem = SimMemory::new(n, 1);
            let before = Configuration::zeros(n);
            let mut x = before.clone();
            prop_assert!(sample_configuration(&mut x, &spaces, &[1.0; 6], &mut mem, &mut rng));
            let f = flipped(&before, &x);
            prop_assert!(!f.is_empty());
            prop_assert!(f.len() <= h.len() + l.len());
            prop_assert!(l.iter().all(|i| f.contains(i)));
            prop_assert!(f.iter().all(|i| h.contains(i) || l.contains(i)));
        }
    }
}

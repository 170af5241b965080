use crate::expr::NodeId;
use crate::layout::{Configuration, NodeSet};
use crate::simulation::MpSim;

/// Whether the formula of `i` can evaluate to something other than `v` when
/// the nodes of `free` may take any value and the others keep their value in
/// `x`.
///
/// Only exact for locally monotone formulas: each free influencer is set to
/// the value pushing `f_i` away from `v` (positive influencers to `!v`,
/// negative ones to `v`).
pub fn can_flip(sim: &MpSim, x: &Configuration, i: NodeId, free: &NodeSet, v: bool) -> bool {
    let influence = sim.influence();
    let value = |j: NodeId| {
        if !free.contains(j) {
            x.get(j)
        } else if influence.positive(i).binary_search(&j).is_ok() {
            !v
        } else {
            v
        }
    };
    sim.network().formula(i).eval_with(&value) != v
}

/// Subset of `candidates` able to change value from `x` within `depth`
/// propagation rounds.
pub fn spread(sim: &MpSim, x: &Configuration, candidates: &NodeSet, depth: usize) -> NodeSet {
    spread_rounds(sim, x, candidates, depth).0
}

/// [`spread`] together with the number of rounds actually performed.
pub fn spread_rounds(
    sim: &MpSim,
    x: &Configuration,
    candidates: &NodeSet,
    depth: usize,
) -> (NodeSet, usize) {
    let mut free = NodeSet::empty(candidates.universe());
    let mut remaining = candidates.clone();
    let mut rounds = 0;
    while rounds < depth && !remaining.is_empty() {
        rounds += 1;
        let newly: Vec<NodeId> = remaining
            .iter()
            .filter(|&i| can_flip(sim, x, i, &free, x.get(i)))
            .collect();
        if newly.is_empty() {
            break;
        }
        for i in newly {
            free.insert(i);
            remaining.remove(i);
        }
    }
    (free, rounds)
}

/// Members of `free` whose change away from `x` cannot be undone.
pub fn irreversible(sim: &MpSim, x: &Configuration, free: &NodeSet) -> NodeSet {
    let mut out = NodeSet::empty(free.universe());
    for i in free.iter() {
        if !can_flip(sim, x, i, free, !x.get(i)) {
            out.insert(i);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Network;
    use proptest::prelude::*;

    fn chain() -> MpSim {
        MpSim::new(Network::from_rules([("a", "1"), ("b", "a"), ("c", "b"), ("d", "c")]).unwrap())
    }

    fn toggle_switch() -> MpSim {
        MpSim::new(Network::from_rules([("a", "!b"), ("b", "!a"), ("c", "!a & b")]).unwrap())
    }

    #[test]
    fn spread_follows_chain_one_round_at_a_time() {
        let sim = chain();
        let x = sim.network().zero();
        let all = NodeSet::full(4);
        assert_eq!(spread(&sim, &x, &all, 1).to_vec(), vec![0]);
        assert_eq!(spread(&sim, &x, &all, 2).to_vec(), vec![0, 1]);
        assert_eq!(spread_rounds(&sim, &x, &all, 4), (all.clone(), 4));
        assert_eq!(spread(&sim, &x, &all, 10), all);
        // without `a` as a candidate nothing downstream can move
        let no_a = NodeSet::from_indices(4, [1, 2, 3]);
        assert!(spread(&sim, &x, &no_a, 4).is_empty());
    }

    #[test]
    fn spread_from_toggle_switch_states() {
        let sim = toggle_switch();
        let f = sim.network();
        let all = NodeSet::full(3);
        assert_eq!(spread(&sim, &f.zero(), &all, 3).to_vec(), vec![0, 1, 2]);
        assert_eq!(spread(&sim, &f.zero(), &all, 1).to_vec(), vec![0, 1]);
        let x = f.configuration(&["b"]).unwrap();
        assert_eq!(spread(&sim, &x, &all, 3).to_vec(), vec![2]);
        let fixed = f.configuration(&["b", "c"]).unwrap();
        assert!(spread(&sim, &fixed, &all, 3).is_empty());
    }

    #[test]
    fn irreversible_changes() {
        let sim = toggle_switch();
        let x = sim.network().configuration(&["b"]).unwrap();
        let h = spread(&sim, &x, &NodeSet::full(3), 3);
        assert_eq!(irreversible(&sim, &x, &h).to_vec(), vec![2]);

        let x = sim.network().zero();
        let h = spread(&sim, &x, &NodeSet::full(3), 3);
        assert!(irreversible(&sim, &x, &h).is_empty());

        let osc = MpSim::new(Network::from_rules([("a", "0"), ("b", "!b")]).unwrap());
        let x = osc.network().configuration(&["a"]).unwrap();
        let h = spread(&osc, &x, &NodeSet::full(2), 2);
        assert_eq!(h.to_vec(), vec![0, 1]);
        assert_eq!(irreversible(&osc, &x, &h).to_vec(), vec![0]);
    }

    proptest! {
        #[test]
        fn spread_is_bounded_subset(bits in prop::collection::vec(any::<bool>(), 4),
                                    cand in prop::collection::vec(any::<bool>(), 4),
                                    depth in 0usize..6) {
            let sim = MpSim::new(
                Network::from_rules([("a", "!d"), ("b", "a & !c"), ("c", "b | d"), ("d", "c")])
                    .unwrap(),
            );
            let x = Configuration::from_bools(bits);
            let candidates =
                NodeSet::from_indices(4, cand.iter().enumerate().filter(|(_, c)| **c).map(|(i, _)| i));
            let (h, rounds) = spread_rounds(&sim, &x, &candidates, depth);
            prop_assert!(rounds <= depth);
            prop_assert!(h.is_subset(&candidates));
            prop_assert!(irreversible(&sim, &x, &h).is_subset(&h));
        }
    }
}

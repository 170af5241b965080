use std::collections::{HashSet, VecDeque};

use rand::Rng;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::layout::{Configuration, NodeSet};
use crate::params::Depth;
use crate::simulation::MpSim;
use crate::spread::{irreversible, spread};

/// Class of transitions available from a configuration: the nodes of
/// `reversible` may flip and flip back, the nodes of `irreversible` all flip
/// together and stay flipped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TransitionSpace {
    pub reversible: NodeSet,
    pub irreversible: NodeSet,
}

/// Transition spaces reachable from `x`, drawing the horizon from `depth`
/// once for the whole search.
pub fn reachable_spaces<R: Rng + ?Sized>(
    sim: &MpSim,
    x: &Configuration,
    depth: &Depth,
    rng: &mut R,
) -> Result<Vec<TransitionSpace>> {
    reachable_spaces_within(sim, x, depth.resolve(rng))
}

/// Breadth-first search over candidate node sets: each irreversible set found
/// spawns one branch per non-empty subset of it assumed already committed.
///
/// A space with 64 irreversible nodes or more would need at least `2^64`
/// branches and is reported as [`Error::TooManyIrreversible`].
pub fn reachable_spaces_within(
    sim: &MpSim,
    x: &Configuration,
    d: usize,
) -> Result<Vec<TransitionSpace>> {
    let n = sim.len();
    let mut spaces = Vec::new();
    let mut known: HashSet<NodeSet> = HashSet::new();
    let mut queue = VecDeque::new();
    known.insert(NodeSet::full(n));
    queue.push_back(NodeSet::full(n));

    while let Some(candidates) = queue.pop_front() {
        let mut reversible = spread(sim, x, &candidates, d);
        if reversible.is_empty() {
            continue;
        }
        let committed = if d > 1 {
            irreversible(sim, x, &reversible)
        } else {
            NodeSet::empty(n)
        };
        reversible.difference_with(&committed);

        let members = committed.to_vec();
        if members.len() >= u64::BITS as usize {
            return Err(Error::TooManyIrreversible(members.len()));
        }
        let subsets = 1u64 << members.len();
        for mask in 1..subsets {
            let mut next = candidates.clone();
            for (bit, &i) in members.iter().enumerate() {
                if mask & (1u64 << bit) != 0 {
                    next.remove(i);
                }
            }
            if known.insert(next.clone()) {
                queue.push_back(next);
            }
        }

        spaces.push(TransitionSpace {
            reversible,
            irreversible: committed,
        });
    }
    Ok(spaces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Network;
    use insta::assert_json_snapshot;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn named(sim: &MpSim, spaces: &[TransitionSpace]) -> Vec<(Vec<String>, Vec<String>)> {
        let names = |s: &NodeSet| -> Vec<String> {
            s.iter().map(|i| sim.network().name(i).to_string()).collect()
        };
        spaces
            .iter()
            .map(|s| (names(&s.reversible), names(&s.irreversible)))
            .collect()
    }

    #[test]
    fn toggle_switch_spaces() {
        let sim = MpSim::new(
            Network::from_rules([("a", "!b"), ("b", "!a"), ("c", "!a & b")]).unwrap(),
        );
        let f = sim.network();
        let zero = f.zero();
        assert_json_snapshot!(named(&sim, &reachable_spaces_within(&sim, &zero, 3).unwrap()), @r###"
        [
          [
            [
              "a",
              "b",
              "c"
            ],
            []
          ]
        ]
        "###);
        assert_json_snapshot!(named(&sim, &reachable_spaces_within(&sim, &zero, 1).unwrap()), @r###"
        [
          [
            [
              "a",
              "b"
            ],
            []
          ]
        ]
        "###);
        let x = f.configuration(&["b"]).unwrap();
        assert_json_snapshot!(named(&sim, &reachable_spaces_within(&sim, &x, 3).unwrap()), @r###"
        [
          [
            [],
            [
              "c"
            ]
          ]
        ]
        "###);
        let fixed = f.configuration(&["b", "c"]).unwrap();
        assert!(reachable_spaces_within(&sim, &fixed, 3).unwrap().is_empty());
    }

    #[test]
    fn committed_subsets_open_new_branches() {
        let sim = MpSim::new(Network::from_rules([("a", "0"), ("b", "!b")]).unwrap());
        let x = sim.network().configuration(&["a"]).unwrap();
        let spaces = reachable_spaces_within(&sim, &x, 2).unwrap();
        assert_eq!(
            spaces,
            vec![
                TransitionSpace {
                    reversible: NodeSet::from_indices(2, [1]),
                    irreversible: NodeSet::from_indices(2, [0]),
                },
                TransitionSpace {
                    reversible: NodeSet::from_indices(2, [1]),
                    irreversible: NodeSet::empty(2),
                },
            ]
        );
    }

    #[test]
    fn sampled_depth_is_drawn_once() {
        let sim = MpSim::new(
            Network::from_rules([("a", "!b"), ("b", "!a"), ("c", "!a & b")]).unwrap(),
        );
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let spaces = reachable_spaces(&sim, &sim.network().zero(), &Depth::Fixed(1), &mut rng).unwrap();
        assert_eq!(spaces.len(), 1);
        assert_eq!(spaces[0].reversible.to_vec(), vec![0, 1]);
    }

    #[test]
    fn oversized_commitments_are_rejected() {
        let sim = MpSim::new(Network::from_rules((0..64).map(|i| (format!("n{i}"), "1"))).unwrap());
        assert_eq!(
            reachable_spaces_within(&sim, &sim.network().zero(), 2),
            Err(Error::TooManyIrreversible(64))
        );
    }

    proptest! {
        #[test]
        fn spaces_are_disjoint_and_stable(bits in prop::collection::vec(any::<bool>(), 6),
                                          d in 1usize..7) {
            let sim = MpSim::new(
                Network::from_rules([
                    ("a", "!f"),
                    ("b", "a"),
                    ("c", "b & !e"),
                    ("d", "c | a"),
                    ("e", "d"),
                    ("f", "e & b"),
                ])
                .unwrap(),
            );
            let x = Configuration::from_bools(bits);
            let first = reachable_spaces_within(&sim, &x, d).unwrap();
            for space in &first {
                prop_assert!(space.reversible.is_disjoint(&space.irreversible));
                prop_assert!(!(space.reversible.is_empty() && space.irreversible.is_empty()));
                if d == 1 {
                    prop_assert!(space.irreversible.is_empty());
                }
            }
            prop_assert_eq!(&first, &reachable_spaces_within(&sim, &x, d).unwrap());
        }
    }
}

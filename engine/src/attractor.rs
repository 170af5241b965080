use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::layout::{Configuration, NodeSet};
use crate::network::Network;

/// Hypercube of configurations: nodes of `free` take any value, the others
/// are fixed to their value in `base`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Hypercube {
    pub base: Configuration,
    pub free: NodeSet,
}

impl Hypercube {
    pub fn new(base: Configuration, free: NodeSet) -> Self {
        Self { base, free }
    }

    /// Single configuration.
    pub fn point(base: Configuration) -> Self {
        let free = NodeSet::empty(base.len());
        Self { base, free }
    }

    /// Convert an attractor in the `{node: 0 | 1 | "*"}` form into a
    /// hypercube of `network`. Every node must appear.
    pub fn from_json(network: &Network, value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| Error::InvalidCoordinate {
            node: String::new(),
            value: value.to_string(),
        })?;
        let mut base = network.zero();
        let mut free = NodeSet::empty(network.len());
        let mut seen = NodeSet::empty(network.len());
        for (name, v) in object {
            let i = network.node_id(name)?;
            seen.insert(i);
            match coordinate(v) {
                Some(Some(b)) => base.set(i, b),
                Some(None) => free.insert(i),
                None => {
                    return Err(Error::InvalidCoordinate {
                        node: name.clone(),
                        value: v.to_string(),
                    })
                }
            }
        }
        if let Some(missing) = (0..network.len()).find(|&i| !seen.contains(i)) {
            return Err(Error::IncompleteAttractor(network.name(missing).to_string()));
        }
        Ok(Self { base, free })
    }

    /// Whether every fixed coordinate agrees with `x`.
    pub fn fixed_agrees(&self, x: &Configuration) -> bool {
        (0..self.base.len()).all(|i| self.free.contains(i) || self.base.get(i) == x.get(i))
    }

    /// Whether the two hypercubes share a configuration.
    pub fn intersects(&self, other: &Hypercube) -> bool {
        (0..self.base.len()).all(|i| {
            self.free.contains(i) || other.free.contains(i) || self.base.get(i) == other.base.get(i)
        })
    }
}

/// Check that `attractors` can drive a simulation of an `n`-node network:
/// every hypercube spans `n` nodes and no two of them overlap. Overlapping
/// (in particular duplicated) attractors can never be told apart, so a run
/// reaching them would not terminate.
pub fn check_attractors(n: usize, attractors: &[Hypercube]) -> Result<()> {
    for (index, a) in attractors.iter().enumerate() {
        let actual = if a.base.len() != n {
            a.base.len()
        } else {
            a.free.universe()
        };
        if actual != n {
            return Err(Error::AttractorLength {
                index,
                expected: n,
                actual,
            });
        }
    }
    for (first, a) in attractors.iter().enumerate() {
        let overlapping = (first + 1..attractors.len()).find(|&j| a.intersects(&attractors[j]));
        if let Some(second) = overlapping {
            return Err(Error::OverlappingAttractors { first, second });
        }
    }
    Ok(())
}

/// `Some(Some(bit))` for a fixed value, `Some(None)` for a wildcard.
fn coordinate(v: &Value) -> Option<Option<bool>> {
    match v {
        Value::Bool(b) => Some(Some(*b)),
        Value::Number(n) => match n.as_u64() {
            Some(0) => Some(Some(false)),
            Some(1) => Some(Some(true)),
            _ => None,
        },
        Value::String(s) => match s.as_str() {
            "0" => Some(Some(false)),
            "1" => Some(Some(true)),
            "*" => Some(None),
            _ => None,
        },
        _ => None,
    }
}

/// Whether `a` is contained in `b`: the free nodes of `a` are free in `b`, and
/// the nodes fixed in `a` but not free in `b` have the same value in both.
pub fn is_subhypercube(a: &Hypercube, b: &Hypercube) -> bool {
    a.free.is_subset(&b.free)
        && (0..a.base.len())
            .filter(|&i| !a.free.contains(i) && !b.free.contains(i))
            .all(|i| a.base.get(i) == b.base.get(i))
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::trace;

use crate::attractor::{check_attractors, is_subhypercube, Hypercube};
use crate::error::{Error, Result};
use crate::influence::InfluenceGraph;
use crate::layout::{Configuration, NodeSet};
use crate::memory::SimMemory;
use crate::network::Network;
use crate::params::Parameters;
use crate::sampler::{sample_configuration, transition_weight};
use crate::spaces::{reachable_spaces, reachable_spaces_within};
use crate::spread::spread;

/// Stop request polled by [`MpSim::sample_reachable_attractor_with`] before
/// every step: a flag raised by another thread, a deadline, or both.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    flag: Option<Arc<AtomicBool>>,
    deadline: Option<Instant>,
}

impl Interrupt {
    pub fn never() -> Self {
        Self::default()
    }

    /// Set once `flag` holds `true`.
    pub fn shared(flag: Arc<AtomicBool>) -> Self {
        Self {
            flag: Some(flag),
            deadline: None,
        }
    }

    /// Set once `timeout` has elapsed from now.
    pub fn after(timeout: Duration) -> Self {
        Self {
            flag: None,
            deadline: Instant::now().checked_add(timeout),
        }
    }

    pub fn is_set(&self) -> bool {
        self.flag.as_ref().is_some_and(|f| f.load(Ordering::Acquire))
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Network prepared for simulation under the most permissive dynamics.
#[derive(Debug, Clone)]
pub struct MpSim {
    network: Network,
    influence: InfluenceGraph,
}

impl MpSim {
    pub fn new(network: Network) -> Self {
        let influence = InfluenceGraph::new(&network);
        Self { network, influence }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn influence(&self) -> &InfluenceGraph {
        &self.influence
    }

    pub fn len(&self) -> usize {
        self.network.len()
    }

    pub fn is_empty(&self) -> bool {
        self.network.is_empty()
    }

    pub fn memory(&self) -> SimMemory {
        SimMemory::new(self.len(), self.len())
    }

    /// One transition from `x`. Returns `false` when nothing moved.
    pub fn step<R: Rng + ?Sized>(
        &self,
        x: &mut Configuration,
        params: &Parameters,
        mem: &mut SimMemory,
        rng: &mut R,
    ) -> Result<bool> {
        let spaces = reachable_spaces(self, x, &params.depth, rng)?;
        if spaces.is_empty() {
            return Ok(false);
        }
        Ok(sample_configuration(x, &spaces, &params.rates, mem, rng))
    }

    /// Whether every horizon of `params.depth` leaves `x` without a transition
    /// of positive weight, so that no later step can move it.
    pub fn is_stuck(&self, x: &Configuration, params: &Parameters) -> Result<bool> {
        for d in params.depth.horizons(self.len()) {
            let spaces = reachable_spaces_within(self, x, d)?;
            if transition_weight(&spaces, &params.rates) > 0.0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Keep the candidates still reachable from `x` with an exact (depth `n`)
    /// spread analysis.
    pub fn filter_reachable(
        &self,
        x: &Configuration,
        candidates: &[usize],
        attractors: &[Hypercube],
    ) -> Vec<usize> {
        let n = self.len();
        let region = Hypercube::new(x.clone(), spread(self, x, &NodeSet::full(n), n));
        candidates
            .iter()
            .copied()
            .filter(|&a| is_subhypercube(&attractors[a], &region))
            .collect()
    }

    fn initial_candidates(
        &self,
        x: &Configuration,
        attractors: &[Hypercube],
    ) -> Result<Vec<usize>> {
        if x.len() != self.len() {
            return Err(Error::ConfigurationLength {
                expected: self.len(),
                actual: x.len(),
            });
        }
        check_attractors(self.len(), attractors)?;
        let all: Vec<usize> = (0..attractors.len()).collect();
        let candidates = self.filter_reachable(x, &all, attractors);
        if candidates.is_empty() {
            return Err(Error::NoReachableAttractor);
        }
        Ok(candidates)
    }

    /// Simulate from `x0` until a single attractor of `attractors` remains
    /// reachable, and return its index.
    pub fn sample_reachable_attractor<R: Rng + ?Sized>(
        &self,
        x0: &Configuration,
        attractors: &[Hypercube],
        params: &Parameters,
        mem: &mut SimMemory,
        rng: &mut R,
    ) -> Result<usize> {
        self.sample_reachable_attractor_with(
            x0,
            attractors,
            params,
            mem,
            rng,
            &Interrupt::never(),
            &mut |_| {},
        )
    }

    /// [`MpSim::sample_reachable_attractor`], calling `observe` on every
    /// configuration visited before convergence and giving up with
    /// [`Error::Interrupted`] once `interrupt` is set.
    ///
    /// Fails with [`Error::Stuck`] when the rates leave no way out of a
    /// configuration from which several attractors are still reachable.
    #[allow(clippy::too_many_arguments)]
    pub fn sample_reachable_attractor_with<R: Rng + ?Sized>(
        &self,
        x0: &Configuration,
        attractors: &[Hypercube],
        params: &Parameters,
        mem: &mut SimMemory,
        rng: &mut R,
        interrupt: &Interrupt,
        observe: &mut dyn FnMut(&Configuration),
    ) -> Result<usize> {
        let mut x = x0.clone();
        let mut candidates = self.initial_candidates(&x, attractors)?;
        let mut k = 1usize;
        while candidates.len() > 1 {
            if interrupt.is_set() {
                return Err(Error::Interrupted);
            }
            observe(&x);
            let moved = self.step(&mut x, params, mem, rng)?;
            if !moved {
                // force a refresh
                k = 0;
            }
            if k % params.refresh_rate == 0 {
                candidates = self.filter_reachable(&x, &candidates, attractors);
                trace!(remaining = candidates.len(), "refreshed candidate attractors");
                if !moved && candidates.len() > 1 && self.is_stuck(&x, params)? {
                    return Err(Error::Stuck);
                }
            }
            k += 1;
        }
        candidates.first().copied().ok_or(Error::NoReachableAttractor)
    }

    /// Every configuration visited from `x0` until it lies in the fixed part
    /// of the last reachable attractor.
    pub fn sample_trace<R: Rng + ?Sized>(
        &self,
        x0: &Configuration,
        attractors: &[Hypercube],
        params: &Parameters,
        mem: &mut SimMemory,
        rng: &mut R,
    ) -> Result<Vec<Configuration>> {
        let mut x = x0.clone();
        let mut trace = vec![x.clone()];
        let mut candidates = self.initial_candidates(&x, attractors)?;
        while !(candidates.len() == 1 && attractors[candidates[0]].fixed_agrees(&x)) {
            if !self.step(&mut x, params, mem, rng)? && self.is_stuck(&x, params)? {
                return Err(Error::Stuck);
            }
            trace.push(x.clone());
            candidates = self.filter_reachable(&x, &candidates, attractors);
            if candidates.is_empty() {
                return Err(Error::NoReachableAttractor);
            }
        }
        Ok(trace)
    }

    /// Trace annotated with the attractors still reachable after every step,
    /// stopping at the first configuration committed to a single attractor.
    pub fn sample_switchpoint<R: Rng + ?Sized>(
        &self,
        x0: &Configuration,
        attractors: &[Hypercube],
        params: &Parameters,
        mem: &mut SimMemory,
        rng: &mut R,
    ) -> Result<Vec<(Configuration, Vec<usize>)>> {
        let mut x = x0.clone();
        let mut candidates = self.initial_candidates(&x, attractors)?;
        let mut trace = vec![(x.clone(), candidates.clone())];
        while candidates.len() > 1 {
            if !self.step(&mut x, params, mem, rng)? && self.is_stuck(&x, params)? {
                return Err(Error::Stuck);
            }
            candidates = self.filter_reachable(&x, &candidates, attractors);
            trace.push((x.clone(), candidates.clone()));
        }
        if candidates.is_empty() {
            return Err(Error::NoReachableAttractor);
        }
        Ok(trace)
    }
}

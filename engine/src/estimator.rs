//! Monte-Carlo estimation of the probability of reaching each attractor.
//!
//! Runs are independent, so they are split across a fixed pool of worker
//! threads. Each worker owns its random generator and scratch memory, and
//! talks to the coordinator only through channels: one message per finished
//! run on a bounded progress channel, one tally per worker on the result
//! channel. A shared cancel flag, polled between steps, stops the pool when
//! a worker fails or the coordinator gives up waiting.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Sender};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::attractor::{check_attractors, Hypercube};
use crate::error::{Error, Result};
use crate::layout::Configuration;
use crate::memory::SimMemory;
use crate::params::{Parameters, Settings};
use crate::simulation::{Interrupt, MpSim};

/// Number of runs that ended in each attractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estimate {
    pub nb_sims: usize,
    pub counts: Vec<u64>,
}

impl Estimate {
    fn empty(nb_sims: usize, nb_attractors: usize) -> Self {
        Self {
            nb_sims,
            counts: vec![0; nb_attractors],
        }
    }

    fn merge(&mut self, counts: &[u64]) {
        for (total, c) in self.counts.iter_mut().zip(counts) {
            *total += c;
        }
    }

    /// `count * 100 / nb_sims` for every attractor.
    pub fn percentages(&self) -> Vec<f64> {
        self.counts
            .iter()
            .map(|&c| c as f64 * 100.0 / self.nb_sims as f64)
            .collect()
    }

    /// Percentages summed per label, `labels[a]` being the label of attractor `a`.
    pub fn by_label<L: Ord + Clone>(&self, labels: &[L]) -> BTreeMap<L, f64> {
        let mut out = BTreeMap::new();
        for (label, p) in labels.iter().zip(self.percentages()) {
            *out.entry(label.clone()).or_insert(0.0) += p;
        }
        out
    }
}

fn check_inputs(
    sim: &MpSim,
    x0: &Configuration,
    attractors: &[Hypercube],
    nb_sims: usize,
) -> Result<()> {
    if nb_sims == 0 {
        return Err(Error::ZeroSimulations);
    }
    if attractors.is_empty() {
        return Err(Error::NoAttractors);
    }
    if x0.len() != sim.len() {
        return Err(Error::ConfigurationLength {
            expected: sim.len(),
            actual: x0.len(),
        });
    }
    check_attractors(sim.len(), attractors)
}

/// Generator for worker `worker`: an independent stream of `seed` when one is
/// given, fresh OS entropy otherwise.
pub fn worker_rng(seed: Option<u64>, worker: usize) -> Result<ChaCha8Rng> {
    match seed {
        Some(seed) => {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            rng.set_stream(worker as u64);
            Ok(rng)
        }
        None => {
            let mut key = [0u8; 32];
            getrandom::getrandom(&mut key).map_err(|e| Error::Entropy(e.to_string()))?;
            Ok(ChaCha8Rng::from_seed(key))
        }
    }
}

/// Split `nb_sims` runs over `nb_jobs` workers, the first ones taking one
/// extra run when the division is not exact.
pub fn split_runs(nb_sims: usize, nb_jobs: usize) -> Vec<usize> {
    let mut shares = vec![nb_sims / nb_jobs; nb_jobs];
    for share in shares.iter_mut().take(nb_sims % nb_jobs) {
        *share += 1;
    }
    shares
}

fn resolve_jobs(nb_jobs: usize) -> usize {
    if nb_jobs == 0 {
        thread::available_parallelism().map_or(1, |n| n.get())
    } else {
        nb_jobs
    }
}

fn as_stall(error: Error, stall_timeout: Option<Duration>) -> Error {
    match (error, stall_timeout) {
        (Error::Interrupted, Some(t)) => Error::Stalled(t),
        (error, _) => error,
    }
}

/// Estimate in-process with the caller's generator. With a stall timeout,
/// every run must complete within it.
pub fn estimate_sequential<R: Rng + ?Sized>(
    sim: &MpSim,
    x0: &Configuration,
    attractors: &[Hypercube],
    nb_sims: usize,
    params: &Parameters,
    rng: &mut R,
    stall_timeout: Option<Duration>,
) -> Result<Estimate> {
    check_inputs(sim, x0, attractors, nb_sims)?;
    let mut mem = sim.memory();
    let mut estimate = Estimate::empty(nb_sims, attractors.len());
    for _ in 0..nb_sims {
        let interrupt = stall_timeout.map_or_else(Interrupt::never, Interrupt::after);
        let a = sim
            .sample_reachable_attractor_with(
                x0,
                attractors,
                params,
                &mut mem,
                rng,
                &interrupt,
                &mut |_| {},
            )
            .map_err(|e| as_stall(e, stall_timeout))?;
        estimate.counts[a] += 1;
    }
    info!(nb_sims, counts = ?estimate.counts, "sequential estimate done");
    Ok(estimate)
}

/// Estimate according to `settings`: in-process for a single job, on a worker
/// pool otherwise.
pub fn estimate(
    sim: &MpSim,
    x0: &Configuration,
    attractors: &[Hypercube],
    nb_sims: usize,
    settings: &Settings,
) -> Result<Estimate> {
    if resolve_jobs(settings.nb_jobs) == 1 {
        let params = settings.parameters(sim.len())?;
        let mut rng = worker_rng(settings.seed, 0)?;
        estimate_sequential(
            sim,
            x0,
            attractors,
            nb_sims,
            &params,
            &mut rng,
            settings.stall_timeout(),
        )
    } else {
        estimate_parallel(sim, x0, attractors, nb_sims, settings)
    }
}

struct Worker<'a, F> {
    id: usize,
    share: usize,
    nb_attractors: usize,
    simulate: &'a F,
    rng: ChaCha8Rng,
    mem: SimMemory,
    cancel: Arc<AtomicBool>,
    interrupt: Interrupt,
    progress: Sender<usize>,
}

impl<F> Worker<'_, F>
where
    F: Fn(&mut ChaCha8Rng, &mut SimMemory, &Interrupt) -> Result<usize>,
{
    fn run(mut self) -> Result<Vec<u64>> {
        debug!(worker = self.id, share = self.share, "worker started");
        let mut counts = vec![0u64; self.nb_attractors];
        for _ in 0..self.share {
            if self.interrupt.is_set() {
                debug!(worker = self.id, "worker cancelled");
                break;
            }
            let a = match (self.simulate)(&mut self.rng, &mut self.mem, &self.interrupt) {
                Ok(a) => a,
                Err(e) => {
                    // no point in finishing the other shares
                    self.cancel.store(true, Ordering::Release);
                    return Err(e);
                }
            };
            counts[a] += 1;
            if self.progress.send(a).is_err() {
                break;
            }
        }
        debug!(worker = self.id, "worker finished");
        Ok(counts)
    }
}

/// Estimate on `settings.nb_jobs` worker threads (all cores when 0).
///
/// A worker that panics is reported as [`Error::WorkerFailed`] once the
/// others are done, and the first error a worker hits stops the whole pool.
/// With a stall timeout, the workers are cancelled between two steps and
/// [`Error::Stalled`] is returned when no run completes in time.
pub fn estimate_parallel(
    sim: &MpSim,
    x0: &Configuration,
    attractors: &[Hypercube],
    nb_sims: usize,
    settings: &Settings,
) -> Result<Estimate> {
    check_inputs(sim, x0, attractors, nb_sims)?;
    let params = settings.parameters(sim.len())?;
    let simulate = |rng: &mut ChaCha8Rng, mem: &mut SimMemory, interrupt: &Interrupt| {
        sim.sample_reachable_attractor_with(
            x0,
            attractors,
            &params,
            mem,
            rng,
            interrupt,
            &mut |_| {},
        )
    };
    let estimate = run_pool(nb_sims, attractors.len(), &sim.memory(), settings, &simulate)?;
    info!(nb_sims, counts = ?estimate.counts, "parallel estimate done");
    Ok(estimate)
}

/// Spread `nb_sims` calls of `simulate` over a pool of worker threads and
/// tally the attractor indices they return.
fn run_pool<F>(
    nb_sims: usize,
    nb_attractors: usize,
    memory: &SimMemory,
    settings: &Settings,
    simulate: &F,
) -> Result<Estimate>
where
    F: Fn(&mut ChaCha8Rng, &mut SimMemory, &Interrupt) -> Result<usize> + Sync,
{
    let nb_jobs = resolve_jobs(settings.nb_jobs).min(nb_sims);
    let shares = split_runs(nb_sims, nb_jobs);
    let rngs = (0..nb_jobs)
        .map(|w| worker_rng(settings.seed, w))
        .collect::<Result<Vec<_>>>()?;
    let stall_timeout = settings.stall_timeout();
    let cancel = Arc::new(AtomicBool::new(false));

    let (progress_tx, progress_rx) = bounded::<usize>(nb_jobs * 4);
    let (result_tx, result_rx) = unbounded::<(usize, Result<Vec<u64>>)>();

    let (panicked, stalled) = thread::scope(|scope| {
        let handles: Vec<_> = shares
            .iter()
            .zip(rngs)
            .enumerate()
            .map(|(id, (&share, rng))| {
                let worker = Worker {
                    id,
                    share,
                    nb_attractors,
                    simulate,
                    rng,
                    mem: memory.clone(),
                    cancel: Arc::clone(&cancel),
                    interrupt: Interrupt::shared(Arc::clone(&cancel)),
                    progress: progress_tx.clone(),
                };
                let results = result_tx.clone();
                scope.spawn(move || {
                    let outcome = worker.run();
                    let _ = results.send((id, outcome));
                })
            })
            .collect();
        drop(progress_tx);
        drop(result_tx);

        let report_every = (nb_sims / 10).max(1);
        let mut done = 0usize;
        let mut stalled = false;
        while done < nb_sims {
            let received = match stall_timeout {
                Some(t) => progress_rx.recv_timeout(t).map_err(|e| e.is_timeout()),
                None => progress_rx.recv().map_err(|_| false),
            };
            match received {
                Ok(_) => {
                    done += 1;
                    if done % report_every == 0 {
                        debug!(done, nb_sims, "simulations completed");
                    }
                }
                Err(timed_out) => {
                    stalled = timed_out;
                    break;
                }
            }
        }

        if stalled {
            warn!(done, nb_sims, "no run completed in time, cancelling workers");
            cancel.store(true, Ordering::Release);
        }
        // unblock workers waiting on a full progress channel
        for _ in progress_rx.iter() {}

        let panicked: Vec<usize> = handles
            .into_iter()
            .enumerate()
            .filter_map(|(id, h)| h.join().is_err().then_some(id))
            .collect();
        (panicked, stalled)
    });

    if let Some(&id) = panicked.first() {
        return Err(Error::WorkerFailed(id));
    }
    if stalled {
        if let Some(t) = stall_timeout {
            return Err(Error::Stalled(t));
        }
    }

    let mut outcomes: Vec<Option<Result<Vec<u64>>>> = (0..nb_jobs).map(|_| None).collect();
    for (id, outcome) in result_rx.try_iter() {
        outcomes[id] = Some(outcome);
    }
    merge_outcomes(nb_sims, nb_attractors, &shares, outcomes)
}

/// Sum the per-worker tallies, checking that worker `w` ran `shares[w]`
/// simulations. `None` marks a worker that never reported.
fn merge_outcomes(
    nb_sims: usize,
    nb_attractors: usize,
    shares: &[usize],
    outcomes: Vec<Option<Result<Vec<u64>>>>,
) -> Result<Estimate> {
    // workers interrupted by a failing sibling report the sibling's error
    let failure = outcomes
        .iter()
        .flatten()
        .find_map(|o| o.as_ref().err().filter(|e| **e != Error::Interrupted));
    if let Some(e) = failure {
        return Err(e.clone());
    }
    let mut estimate = Estimate::empty(nb_sims, nb_attractors);
    for (worker, (outcome, &expected)) in outcomes.into_iter().zip(shares).enumerate() {
        let Some(Ok(counts)) = outcome else {
            return Err(Error::WorkerFailed(worker));
        };
        let reported: u64 = counts.iter().sum();
        if reported != expected as u64 {
            return Err(Error::MissingRuns {
                worker,
                expected,
                reported,
            });
        }
        estimate.merge(&counts);
    }
    Ok(estimate)
}

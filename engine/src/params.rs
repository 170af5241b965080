//! Depth and rate parametrizations of the simulation, and the settings that
//! select them.

use std::ops::RangeInclusive;
use std::time::Duration;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Horizon of the spread analysis used when exploring transition spaces.
#[derive(Debug, Clone)]
pub enum Depth {
    Fixed(usize),
    /// Draws `d` in `1..=n`; the weight of `d` is at index `d - 1`.
    Sampled(WeightedIndex<f64>),
}

impl Depth {
    pub fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        match self {
            Depth::Fixed(d) => *d,
            Depth::Sampled(weights) => weights.sample(rng) + 1,
        }
    }

    /// Every horizon `resolve` can return for a network of `n` nodes.
    pub fn horizons(&self, n: usize) -> RangeInclusive<usize> {
        match self {
            Depth::Fixed(d) => *d..=*d,
            Depth::Sampled(_) => 1..=n,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DepthSpec {
    /// Always `n`: exact most permissive reachability.
    ConstantMaximum,
    /// Always 1.
    ConstantUnitary,
    /// `P(d) ∝ (n - d + 1)^power`.
    Polynomial {
        #[serde(default = "default_power")]
        power: f64,
    },
    /// `P(d) ∝ 1/d`.
    Reciprocal,
    /// `P(d) ∝ base^-(d-1)`.
    NExponential {
        #[serde(default = "default_base")]
        base: f64,
    },
}

fn default_power() -> f64 {
    1.2
}

fn default_base() -> f64 {
    2.0
}

impl DepthSpec {
    pub fn build(&self, n: usize) -> Result<Depth> {
        let weights: Vec<f64> = match self {
            DepthSpec::ConstantMaximum => return Ok(Depth::Fixed(n)),
            DepthSpec::ConstantUnitary => return Ok(Depth::Fixed(1)),
            DepthSpec::Polynomial { power } => {
                (1..=n).map(|d| ((n - d + 1) as f64).powf(*power)).collect()
            }
            DepthSpec::Reciprocal => (1..=n).map(|d| 1.0 / d as f64).collect(),
            DepthSpec::NExponential { base } => (0..n).map(|k| base.powi(-(k as i32))).collect(),
        };
        WeightedIndex::new(weights)
            .map(Depth::Sampled)
            .map_err(|e| Error::InvalidSettings(format!("depth {self:?}: {e}")))
    }
}

/// Weight of transitions by number of flipped components: entry `k - 1`
/// weighs transitions flipping `k` nodes at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RateSpec {
    Uniform,
    /// Only single flips: `1 0 0 ... 0`.
    FullyAsynchronous,
    /// `1/k`.
    Reciprocal,
    /// `base^-(k-1)`.
    NExponential {
        #[serde(default = "default_base")]
        base: f64,
    },
    Custom {
        weights: Vec<f64>,
    },
}

impl RateSpec {
    pub fn build(&self, n: usize) -> Result<Vec<f64>> {
        let rates = match self {
            RateSpec::Uniform => vec![1.0; n],
            RateSpec::FullyAsynchronous => {
                let mut w = vec![0.0; n];
                if let Some(first) = w.first_mut() {
                    *first = 1.0;
                }
                w
            }
            RateSpec::Reciprocal => (1..=n).map(|k| 1.0 / k as f64).collect(),
            RateSpec::NExponential { base } => (0..n).map(|k| base.powi(-(k as i32))).collect(),
            RateSpec::Custom { weights } => {
                if weights.len() != n {
                    return Err(Error::RateLength {
                        expected: n,
                        actual: weights.len(),
                    });
                }
                weights.clone()
            }
        };
        if rates.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(Error::InvalidSettings(format!(
                "rates {self:?} must be finite and non-negative"
            )));
        }
        Ok(rates)
    }
}

/// Simulation and estimation settings, deserializable from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub depth: DepthSpec,
    pub rates: RateSpec,
    /// Steps between two refreshes of the candidate attractors.
    pub refresh_rate: usize,
    /// Worker count; 0 uses every available core, 1 runs in-process.
    pub nb_jobs: usize,
    /// Makes runs reproducible; fresh entropy is used otherwise.
    pub seed: Option<u64>,
    /// Longest wait for a single run to complete before the estimate fails
    /// with [`Error::Stalled`]. Applies to in-process and pooled runs alike;
    /// runs are stopped between two steps.
    pub stall_timeout_ms: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            depth: DepthSpec::ConstantMaximum,
            rates: RateSpec::FullyAsynchronous,
            refresh_rate: 10,
            nb_jobs: 1,
            seed: None,
            stall_timeout_ms: None,
        }
    }
}

impl Settings {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::InvalidSettings(e.to_string()))
    }

    pub fn parameters(&self, n: usize) -> Result<Parameters> {
        if self.refresh_rate == 0 {
            return Err(Error::InvalidSettings("refresh_rate must be at least 1".into()));
        }
        Ok(Parameters {
            depth: self.depth.build(n)?,
            rates: self.rates.build(n)?,
            refresh_rate: self.refresh_rate,
        })
    }

    pub fn stall_timeout(&self) -> Option<Duration> {
        self.stall_timeout_ms.map(Duration::from_millis)
    }
}

/// Resolved parameters for a network of a given size.
#[derive(Debug, Clone)]
pub struct Parameters {
    pub depth: Depth,
    pub rates: Vec<f64>,
    pub refresh_rate: usize,
}

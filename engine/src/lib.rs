//! Monte-Carlo estimation of attractor reachability in Boolean networks under
//! the most permissive dynamics.
//!
//! A [`MpSim`] wraps a monotone [`Network`] and its signed influence graph.
//! From a configuration, [`reachable_spaces`] enumerates the classes of
//! transitions available within a horizon, [`sample_configuration`] draws one
//! of them, and the driver in [`simulation`] repeats this until a single
//! attractor of a known list remains reachable. [`estimate`] aggregates many
//! such runs, sequentially or on a worker pool.

pub mod attractor;
pub mod error;
pub mod estimator;
pub mod expr;
pub mod influence;
pub mod layout;
pub mod memory;
pub mod network;
pub mod params;
pub mod sampler;
pub mod simulation;
pub mod spaces;
pub mod spread;

pub use attractor::{check_attractors, is_subhypercube, Hypercube};
pub use error::{Error, Result};
pub use estimator::{estimate, estimate_parallel, estimate_sequential, Estimate};
pub use expr::{parse_formula, Expr, NodeId};
pub use influence::{build_influence_graph, InfluenceGraph, Sign};
pub use layout::{Configuration, NodeSet};
pub use memory::SimMemory;
pub use network::Network;
pub use params::{Depth, DepthSpec, Parameters, RateSpec, Settings};
pub use sampler::{sample_configuration, transition_weight};
pub use simulation::{Interrupt, MpSim};
pub use spaces::{reachable_spaces, reachable_spaces_within, TransitionSpace};
pub use spread::{can_flip, irreversible, spread};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;

use crate::expr::NodeId;
use crate::network::Network;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Sign {
    Positive,
    Negative,
}

/// Signed dependency graph: an edge `j -> i` means `j` occurs in the formula
/// of `i`, with the polarity of that occurrence.
pub fn build_influence_graph(network: &Network) -> DiGraph<NodeId, Sign> {
    let mut graph = DiGraph::<NodeId, Sign>::new();
    let nodes: Vec<NodeIndex> = (0..network.len()).map(|i| graph.add_node(i)).collect();

    for i in 0..network.len() {
        let mut literals = network.formula(i).literals();
        literals.sort_unstable();
        literals.dedup();
        for (j, positive) in literals {
            let sign = if positive {
                Sign::Positive
            } else {
                Sign::Negative
            };
            graph.add_edge(nodes[j], nodes[i], sign);
        }
    }

    graph
}

/// Influencers of every node in CSR form.
///
/// For node `i`, `sources[offs[i]..split[i]]` are its positive influencers and
/// `sources[split[i]..offs[i + 1]]` its negative ones, each sorted by id.
#[derive(Debug, Clone, Serialize)]
pub struct InfluenceGraph {
    offs: Vec<u32>,
    split: Vec<u32>,
    sources: Vec<NodeId>,
}

impl InfluenceGraph {
    pub fn new(network: &Network) -> Self {
        Self::from_graph(&build_influence_graph(network))
    }

    pub fn from_graph(graph: &DiGraph<NodeId, Sign>) -> Self {
        let n = graph.node_count();
        let mut positive: Vec<Vec<NodeId>> = vec![Vec::new(); n];
        let mut negative: Vec<Vec<NodeId>> = vec![Vec::new(); n];
        for edge in graph.edge_references() {
            let from = graph[edge.source()];
            let to = graph[edge.target()];
            match edge.weight() {
                Sign::Positive => positive[to].push(from),
                Sign::Negative => negative[to].push(from),
            }
        }

        let mut offs = vec![0u32; n + 1];
        let mut split = vec![0u32; n];
        let mut sources = Vec::with_capacity(graph.edge_count());
        for i in 0..n {
            positive[i].sort_unstable();
            negative[i].sort_unstable();
            sources.extend_from_slice(&positive[i]);
            split[i] = sources.len() as u32;
            sources.extend_from_slice(&negative[i]);
            offs[i + 1] = sources.len() as u32;
        }

        Self {
            offs,
            split,
            sources,
        }
    }

    pub fn len(&self) -> usize {
        self.split.len()
    }

    pub fn is_empty(&self) -> bool {
        self.split.is_empty()
    }

    pub fn positive(&self, i: NodeId) -> &[NodeId] {
        &self.sources[self.offs[i] as usize..self.split[i] as usize]
    }

    pub fn negative(&self, i: NodeId) -> &[NodeId] {
        &self.sources[self.split[i] as usize..self.offs[i + 1] as usize]
    }

    pub fn either(&self, i: NodeId) -> &[NodeId] {
        &self.sources[self.offs[i] as usize..self.offs[i + 1] as usize]
    }
}

use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};
use crate::expr::{parse_formula, Expr, NodeId};
use crate::layout::Configuration;

/// Boolean network with one monotone formula per node.
///
/// Node ids follow declaration order. The network is immutable once built;
/// [`Network::patched`] derives a new one.
#[derive(Debug, Clone)]
pub struct Network {
    names: Vec<String>,
    index: HashMap<String, NodeId>,
    formulas: Vec<Expr>,
    sources: Vec<String>,
}

impl Network {
    /// Build a network from `(node, formula)` rules, validating that every
    /// referenced node is declared and that each formula is monotone.
    pub fn from_rules<I, N, F>(rules: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, F)>,
        N: Into<String>,
        F: Into<String>,
    {
        let mut names = Vec::new();
        let mut index = HashMap::new();
        let mut sources = Vec::new();
        for (name, formula) in rules {
            let name = name.into();
            if index.insert(name.clone(), names.len()).is_some() {
                return Err(Error::DuplicateNode(name));
            }
            names.push(name);
            sources.push(formula.into());
        }

        let lookup = |s: &str| index.get(s).copied();
        let mut formulas = Vec::with_capacity(names.len());
        for (name, source) in names.iter().zip(&sources) {
            let expr = parse_formula(name, source, &lookup)?;
            check_monotone(name, &expr, &names)?;
            formulas.push(expr);
        }

        Ok(Self {
            names,
            index,
            formulas,
            sources,
        })
    }

    /// Copy of the network with the formulas of some nodes replaced.
    pub fn patched<I, N, F>(&self, overrides: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, F)>,
        N: AsRef<str>,
        F: Into<String>,
    {
        let mut sources = self.sources.clone();
        for (name, formula) in overrides {
            let i = self.node_id(name.as_ref())?;
            sources[i] = formula.into();
        }
        Self::from_rules(self.names.iter().cloned().zip(sources))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, i: NodeId) -> &str {
        &self.names[i]
    }

    pub fn node_id(&self, name: &str) -> Result<NodeId> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownNode(name.to_string()))
    }

    pub fn formula(&self, i: NodeId) -> &Expr {
        &self.formulas[i]
    }

    pub fn eval(&self, i: NodeId, x: &Configuration) -> bool {
        self.formulas[i].eval(x)
    }

    pub fn zero(&self) -> Configuration {
        Configuration::zeros(self.len())
    }

    /// Configuration with the listed nodes at 1 and every other node at 0.
    pub fn configuration<S: AsRef<str>>(&self, active: &[S]) -> Result<Configuration> {
        let mut x = self.zero();
        for name in active {
            x.set(self.node_id(name.as_ref())?, true);
        }
        Ok(x)
    }

    pub fn named(&self, x: &Configuration) -> BTreeMap<String, u8> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), x.get(i) as u8))
            .collect()
    }
}

fn check_monotone(node: &str, expr: &Expr, names: &[String]) -> Result<()> {
    let mut polarity: HashMap<NodeId, bool> = HashMap::new();
    for (j, positive) in expr.literals() {
        if *polarity.entry(j).or_insert(positive) != positive {
            return Err(Error::NonMonotone {
                node: node.to_string(),
                variable: names[j].clone(),
            });
        }
    }
    Ok(())
}

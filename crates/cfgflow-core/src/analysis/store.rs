use super::graph::Edge;
use super::lattice::Lattice;
use std::collections::BTreeMap;

/// Facts keyed by edge. Edges never written read as bottom.
///
/// Writes replace the stored fact with a new value; nothing hands out mutable access to a stored
/// fact, so a published fact stays frozen until the next `set` for the same edge.
#[derive(Debug, Clone)]
pub struct EdgeFactStore<F> {
    facts: BTreeMap<Edge, F>,
    bottom: F,
}

impl<F: Lattice> EdgeFactStore<F> {
    pub fn new() -> Self {
        Self {
            facts: BTreeMap::new(),
            bottom: F::bottom(),
        }
    }

    pub fn get(&self, edge: &Edge) -> &F {
        self.facts.get(edge).unwrap_or(&self.bottom)
    }

    pub fn set(&mut self, edge: Edge, fact: F) -> Option<F> {
        self.facts.insert(edge, fact)
    }

    /// Stores `fact` unless it equals the current one; returns whether the edge changed.
    pub fn update(&mut self, edge: Edge, fact: &F) -> bool {
        if self.get(&edge) == fact {
            return false;
        }
        self.facts.insert(edge, fact.clone());
        true
    }

    pub fn contains(&self, edge: &Edge) -> bool {
        self.facts.contains_key(edge)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Edge, &F)> + '_ {
        self.facts.iter()
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

impl<F: Lattice> Default for EdgeFactStore<F> {
    fn default() -> Self {
        Self::new()
    }
}

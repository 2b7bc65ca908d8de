use super::graph::{Direction, Edge, IndexedGraph};
use super::lattice::Lattice;
use super::store::EdgeFactStore;
use super::worklist::SolveStats;
use crate::format::ValueNames;
use crate::instructions::Opcode;
use crate::values::InstId;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedInstruction {
    pub index: usize,
    pub id: InstId,
    pub name: Option<String>,
    pub block: String,
    pub opcode: Opcode,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeFact<F> {
    pub edge: Edge,
    pub fact: F,
}

/// Converged facts of one run, detached from the engine and the function it borrowed.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult<F> {
    pub function: String,
    pub analysis: String,
    pub direction: Direction,
    pub instructions: Vec<IndexedInstruction>,
    /// Canonical fact per instruction index.
    pub facts: Vec<F>,
    pub edges: Vec<EdgeFact<F>>,
    pub stats: SolveStats,
}

impl<F: Lattice> AnalysisResult<F> {
    pub(crate) fn snapshot(
        analysis: &str,
        graph: &IndexedGraph<'_>,
        store: &EdgeFactStore<F>,
        facts: Vec<F>,
        stats: SolveStats,
    ) -> Self {
        let function = graph.function();
        let names = ValueNames::new(function);

        let instructions = (0..graph.len())
            .filter_map(|index| {
                let inst = graph.instruction(index)?;
                let block = graph.block_of(index)?;
                Some(IndexedInstruction {
                    index,
                    id: inst.id,
                    name: inst.name.clone(),
                    block: block.label.clone(),
                    opcode: inst.opcode,
                    text: names.instruction(inst),
                })
            })
            .collect();

        let edges = graph
            .edges()
            .map(|edge| EdgeFact {
                edge,
                fact: store.get(&edge).clone(),
            })
            .collect();

        Self {
            function: function.name.clone(),
            analysis: analysis.to_string(),
            direction: graph.direction(),
            instructions,
            facts,
            edges,
            stats,
        }
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn fact_at(&self, index: usize) -> Option<&F> {
        self.facts.get(index)
    }

    pub fn edge_fact(&self, edge: &Edge) -> Option<&F> {
        self.edges
            .iter()
            .find(|entry| entry.edge == *edge)
            .map(|entry| &entry.fact)
    }

    /// Index of the instruction whose result is named `name`.
    pub fn index_of_name(&self, name: &str) -> Option<usize> {
        self.instructions
            .iter()
            .find(|inst| inst.name.as_deref() == Some(name))
            .map(|inst| inst.index)
    }
}

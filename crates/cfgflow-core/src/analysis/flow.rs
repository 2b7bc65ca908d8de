use super::graph::{Direction, IndexedGraph, Node};
use super::lattice::Lattice;
use crate::block::BlockId;
use crate::instructions::Instruction;
use crate::values::Operand;

/// Result of one transfer: the same fact on every outgoing edge, or one fact per edge in the
/// order of [`FlowContext::outgoing`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing<F> {
    Uniform(F),
    PerEdge(Vec<F>),
}

impl<F> Outgoing<F> {
    pub fn fact_for(&self, position: usize) -> Option<&F> {
        match self {
            Outgoing::Uniform(fact) => Some(fact),
            Outgoing::PerEdge(facts) => facts.get(position),
        }
    }
}

/// What a flow function sees of the instruction being processed.
pub struct FlowContext<'a, 'f> {
    pub graph: &'a IndexedGraph<'f>,
    pub index: usize,
    pub instruction: &'f Instruction,
    pub incoming: &'a [Node],
    pub outgoing: &'a [Node],
}

impl<'a, 'f> FlowContext<'a, 'f> {
    /// Index of an instruction-valued operand.
    pub fn operand_index(&self, operand: &Operand) -> Option<usize> {
        operand
            .as_inst()
            .and_then(|id| self.graph.index_of(id))
    }

    pub fn operand_index_at(&self, position: usize) -> Option<usize> {
        self.instruction
            .operand(position)
            .and_then(|operand| self.operand_index(operand))
    }

    /// Indices of every instruction-valued operand, in operand order.
    pub fn used_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.instruction
            .inst_operands()
            .filter_map(|id| self.graph.index_of(id))
    }

    pub fn block(&self) -> Option<BlockId> {
        self.graph.location(self.index).map(|loc| loc.block)
    }
}

/// Transfer logic of one analysis.
///
/// The driver merges incoming facts with [`Lattice::join`] before calling [`flow`], so the
/// transfer only sees the merged fact. Transfers must be monotone and total over every opcode;
/// instructions an analysis does not care about pass the merged fact through.
///
/// [`flow`]: FlowFunction::flow
pub trait FlowFunction {
    type Fact: Lattice;

    fn name(&self) -> &'static str;

    fn direction(&self) -> Direction;

    /// Fact seeded on boundary edges.
    fn initial(&self) -> Self::Fact {
        Self::Fact::bottom()
    }

    fn flow(&self, ctx: &FlowContext<'_, '_>, merged: Self::Fact) -> Outgoing<Self::Fact>;
}

/*! Reaching definitions.
 *
 * Forward may-reach analysis: facts only accumulate. A redefinition does not kill earlier
 * definitions, so the fact at an instruction is every value-producing instruction that can execute
 * before it, plus itself.
 */

use super::flow::{FlowContext, FlowFunction, Outgoing};
use super::graph::Direction;
use super::lattice::InstSet;
use crate::instructions::Opcode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefCategory {
    /// Arithmetic, compares, `alloca`, `load`, `getelementptr` and `select`.
    ValueProducing,
    /// `br`, `switch` and `store`.
    ControlOrStore,
    MergePoint,
    Unclassified,
}

impl DefCategory {
    pub fn classify(opcode: Opcode) -> Self {
        match opcode {
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::UDiv
            | Opcode::SDiv
            | Opcode::URem
            | Opcode::SRem
            | Opcode::FAdd
            | Opcode::FSub
            | Opcode::FMul
            | Opcode::FDiv
            | Opcode::FRem
            | Opcode::And
            | Opcode::Or
            | Opcode::Xor
            | Opcode::Shl
            | Opcode::LShr
            | Opcode::AShr
            | Opcode::ICmp
            | Opcode::FCmp
            | Opcode::Alloca
            | Opcode::Load
            | Opcode::GetElementPtr
            | Opcode::Select => DefCategory::ValueProducing,
            Opcode::Br | Opcode::Switch | Opcode::Store => DefCategory::ControlOrStore,
            Opcode::Phi => DefCategory::MergePoint,
            Opcode::BitCast
            | Opcode::Trunc
            | Opcode::ZExt
            | Opcode::SExt
            | Opcode::PtrToInt
            | Opcode::IntToPtr
            | Opcode::FPToSI
            | Opcode::SIToFP
            | Opcode::Call
            | Opcode::Ret
            | Opcode::Unreachable => DefCategory::Unclassified,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReachingDefinitions;

impl ReachingDefinitions {
    pub fn new() -> Self {
        Self
    }

    /// The phi at `ctx.index` and every phi directly after it in the same block.
    fn phi_group(ctx: &FlowContext<'_, '_>) -> impl Iterator<Item = usize> {
        let start = ctx.index;
        let trailing = match (ctx.graph.block_of(start), ctx.graph.location(start)) {
            (Some(block), Some(loc)) => block
                .instructions
                .get(loc.position..)
                .map(|rest| rest.iter().take_while(|inst| inst.is_phi()).count())
                .unwrap_or(1),
            _ => 1,
        };
        start..start + trailing.max(1)
    }
}

impl FlowFunction for ReachingDefinitions {
    type Fact = InstSet;

    fn name(&self) -> &'static str {
        "reaching"
    }

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn flow(&self, ctx: &FlowContext<'_, '_>, merged: InstSet) -> Outgoing<InstSet> {
        let mut fact = merged;
        match DefCategory::classify(ctx.instruction.opcode) {
            DefCategory::ValueProducing => {
                fact.insert(ctx.index);
            }
            DefCategory::MergePoint => {
                for index in Self::phi_group(ctx) {
                    fact.insert(index);
                }
            }
            DefCategory::ControlOrStore | DefCategory::Unclassified => {}
        }
        Outgoing::Uniform(fact)
    }
}

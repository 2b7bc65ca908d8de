/*! Liveness.
 *
 * Backward analysis over instruction indices. The fact on an outgoing edge (toward a control-flow
 * predecessor) is the set of instruction results live just before the instruction.
 *
 * Phi nodes are the one place where outgoing facts differ per edge: a phi's operands are only live
 * along the edge from the block they arrive from.
 */

use super::flow::{FlowContext, FlowFunction, Outgoing};
use super::graph::{Direction, Node};
use super::lattice::InstSet;
use crate::instructions::Opcode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveCategory {
    /// Defines a result: uses its operands and kills its own index.
    ValueProducing,
    MergePoint,
    /// Uses operands without defining anything the analysis tracks.
    Effect,
}

impl LiveCategory {
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
            | Opcode::Select => LiveCategory::ValueProducing,
            Opcode::Phi => LiveCategory::MergePoint,
            Opcode::Store
            | Opcode::Br
            | Opcode::Switch
            | Opcode::Ret
            | Opcode::Unreachable
            | Opcode::Call
            | Opcode::BitCast
            | Opcode::Trunc
            | Opcode::ZExt
            | Opcode::SExt
            | Opcode::PtrToInt
            | Opcode::IntToPtr
            | Opcode::FPToSI
            | Opcode::SIToFP => LiveCategory::Effect,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Liveness;

impl Liveness {
    pub fn new() -> Self {
        Self
    }

    fn merge_point(ctx: &FlowContext<'_, '_>, merged: InstSet) -> Outgoing<InstSet> {
        let Some((block, start)) = ctx
            .graph
            .block_of(ctx.index)
            .zip(ctx.graph.location(ctx.index))
            .map(|(block, loc)| (block, ctx.index - loc.position))
        else {
            return Outgoing::Uniform(merged);
        };

        let mut killed = merged;
        for (position, inst) in block.instructions.iter().enumerate() {
            if inst.is_phi() {
                killed.remove(start + position);
            }
        }

        let per_edge = ctx
            .outgoing
            .iter()
            .map(|dst| {
                let mut fact = killed.clone();
                // Only the terminator of a predecessor block selects incoming values.
                let Node::Inst(far) = *dst else {
                    return fact;
                };
                let from = match (ctx.graph.instruction(far), ctx.graph.location(far)) {
                    (Some(inst), Some(loc)) if inst.is_terminator() => loc.block,
                    _ => return fact,
                };
                for phi in block.phis() {
                    for (value, incoming) in phi.phi_incoming() {
                        if incoming != from {
                            continue;
                        }
                        if let Some(index) = ctx.operand_index(value) {
                            fact.insert(index);
                        }
                    }
                }
                fact
            })
            .collect();

        Outgoing::PerEdge(per_edge)
    }
}

impl FlowFunction for Liveness {
    type Fact = InstSet;

    fn name(&self) -> &'static str {
        "liveness"
    }

    fn direction(&self) -> Direction {
        Direction::Backward
    }

    fn flow(&self, ctx: &FlowContext<'_, '_>, merged: InstSet) -> Outgoing<InstSet> {
        match LiveCategory::classify(ctx.instruction.opcode) {
            LiveCategory::MergePoint => Self::merge_point(ctx, merged),
            category => {
                let mut fact = merged;
                if category == LiveCategory::ValueProducing {
                    fact.remove(ctx.index);
                }
                for used in ctx.used_indices() {
                    fact.insert(used);
                }
                Outgoing::Uniform(fact)
            }
        }
    }
}

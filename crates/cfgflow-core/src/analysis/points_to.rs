/*! May-point-to analysis.
 *
 * Forward, flow-sensitive, intraprocedural. Every instruction index owns a register cell `R<i>`
 * holding its result and, for `alloca`, a memory cell `M<i>` for the object it reserves. A phi
 * takes the pointees of the incoming values of every phi in its block. Pointers coming from
 * parameters, globals or calls are not tracked.
 */

use super::flow::{FlowContext, FlowFunction, Outgoing};
use super::graph::Direction;
use super::lattice::{Cell, PointsToFact};
use crate::instructions::{Instruction, Opcode};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerCategory {
    Allocation,
    Cast,
    AddressComputation,
    Load,
    Store,
    Select,
    MergePoint,
    /// Anything else; the fact passes through unchanged.
    Opaque,
}

impl PointerCategory {
    pub fn classify(opcode: Opcode) -> Self {
        match opcode {
            Opcode::Alloca => PointerCategory::Allocation,
            Opcode::BitCast => PointerCategory::Cast,
            Opcode::GetElementPtr => PointerCategory::AddressComputation,
            Opcode::Load => PointerCategory::Load,
            Opcode::Store => PointerCategory::Store,
            Opcode::Select => PointerCategory::Select,
            Opcode::Phi => PointerCategory::MergePoint,
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
            | Opcode::Trunc
            | Opcode::ZExt
            | Opcode::SExt
            | Opcode::PtrToInt
            | Opcode::IntToPtr
            | Opcode::FPToSI
            | Opcode::SIToFP
            | Opcode::Call
            | Opcode::Br
            | Opcode::Switch
            | Opcode::Ret
            | Opcode::Unreachable => PointerCategory::Opaque,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MayPointTo;

impl MayPointTo {
    pub fn new() -> Self {
        Self
    }

    /// Pointees of the register cell of the operand at `position`, if it is an instruction.
    fn operand_pointees(ctx: &FlowContext<'_, '_>, fact: &PointsToFact, position: usize) -> Vec<Cell> {
        ctx.operand_index_at(position)
            .map(|index| fact.pointees(&Cell::register(index)))
            .unwrap_or_default()
    }
}

impl FlowFunction for MayPointTo {
    type Fact = PointsToFact;

    fn name(&self) -> &'static str {
        "may-point-to"
    }

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn flow(&self, ctx: &FlowContext<'_, '_>, merged: PointsToFact) -> Outgoing<PointsToFact> {
        let inst = ctx.instruction;
        let category = PointerCategory::classify(inst.opcode);
        if category != PointerCategory::Store && !inst.ty.is_pointer() {
            return Outgoing::Uniform(merged);
        }

        let mut fact = merged;
        let result = Cell::register(ctx.index);

        match category {
            PointerCategory::Allocation => {
                fact.add(result, Cell::memory(ctx.index));
            }
            PointerCategory::Cast | PointerCategory::AddressComputation => {
                for pointee in Self::operand_pointees(ctx, &fact, 0) {
                    fact.add(result, pointee);
                }
            }
            PointerCategory::Load => {
                let loaded: BTreeSet<Cell> = Self::operand_pointees(ctx, &fact, 0)
                    .iter()
                    .flat_map(|cell| fact.pointees(cell))
                    .collect();
                for pointee in loaded {
                    fact.add(result, pointee);
                }
            }
            PointerCategory::Store => {
                let values = Self::operand_pointees(ctx, &fact, 0);
                let targets = Self::operand_pointees(ctx, &fact, 1);
                for target in &targets {
                    for value in &values {
                        fact.add(*target, *value);
                    }
                }
            }
            PointerCategory::Select => {
                let mut chosen = Self::operand_pointees(ctx, &fact, 1);
                chosen.extend(Self::operand_pointees(ctx, &fact, 2));
                for pointee in chosen {
                    fact.add(result, pointee);
                }
            }
            PointerCategory::MergePoint => {
                // Every phi of the block feeds the result, not only this one.
                let phis: Vec<&Instruction> = match ctx.graph.block_of(ctx.index) {
                    Some(block) => block.phis().collect(),
                    None => vec![inst],
                };
                let incoming: Vec<Cell> = phis
                    .into_iter()
                    .flat_map(|phi| phi.phi_incoming())
                    .filter_map(|(value, _)| ctx.operand_index(value))
                    .flat_map(|index| fact.pointees(&Cell::register(index)))
                    .collect();
                for pointee in incoming {
                    fact.add(result, pointee);
                }
            }
            PointerCategory::Opaque => {}
        }

        Outgoing::Uniform(fact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_bitcast_is_a_pointer_cast() {
        assert_eq!(PointerCategory::classify(Opcode::BitCast), PointerCategory::Cast);
        assert_eq!(
            PointerCategory::classify(Opcode::IntToPtr),
            PointerCategory::Opaque
        );
        assert_eq!(
            PointerCategory::classify(Opcode::GetElementPtr),
            PointerCategory::AddressComputation
        );
    }
}

use crate::block::BlockId;
use crate::types::Type;
use crate::values::{InstId, Operand};
use serde::{Deserialize, Serialize};

/// Operation kinds understood by the engine. Classification happens once, when an instruction is
/// built or parsed, so analyses match on this instead of on mnemonic strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Opcode {
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    URem,
    SRem,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
    And,
    Or,
    Xor,
    Shl,
    LShr,
    AShr,
    ICmp,
    FCmp,
    Alloca,
    Load,
    Store,
    GetElementPtr,
    BitCast,
    Trunc,
    ZExt,
    SExt,
    PtrToInt,
    IntToPtr,
    FPToSI,
    SIToFP,
    Select,
    Phi,
    Call,
    Br,
    Switch,
    Ret,
    Unreachable,
}

impl Opcode {
    pub const ALL: [Opcode; 39] = [
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::UDiv,
        Opcode::SDiv,
        Opcode::URem,
        Opcode::SRem,
        Opcode::FAdd,
        Opcode::FSub,
        Opcode::FMul,
        Opcode::FDiv,
        Opcode::FRem,
        Opcode::And,
        Opcode::Or,
        Opcode::Xor,
        Opcode::Shl,
        Opcode::LShr,
        Opcode::AShr,
        Opcode::ICmp,
        Opcode::FCmp,
        Opcode::Alloca,
        Opcode::Load,
        Opcode::Store,
        Opcode::GetElementPtr,
        Opcode::BitCast,
        Opcode::Trunc,
        Opcode::ZExt,
        Opcode::SExt,
        Opcode::PtrToInt,
        Opcode::IntToPtr,
        Opcode::FPToSI,
        Opcode::SIToFP,
        Opcode::Select,
        Opcode::Phi,
        Opcode::Call,
        Opcode::Br,
        Opcode::Switch,
        Opcode::Ret,
        Opcode::Unreachable,
    ];

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::UDiv => "udiv",
            Opcode::SDiv => "sdiv",
            Opcode::URem => "urem",
            Opcode::SRem => "srem",
            Opcode::FAdd => "fadd",
            Opcode::FSub => "fsub",
            Opcode::FMul => "fmul",
            Opcode::FDiv => "fdiv",
            Opcode::FRem => "frem",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Xor => "xor",
            Opcode::Shl => "shl",
            Opcode::LShr => "lshr",
            Opcode::AShr => "ashr",
            Opcode::ICmp => "icmp",
            Opcode::FCmp => "fcmp",
            Opcode::Alloca => "alloca",
            Opcode::Load => "load",
            Opcode::Store => "store",
            Opcode::GetElementPtr => "getelementptr",
            Opcode::BitCast => "bitcast",
            Opcode::Trunc => "trunc",
            Opcode::ZExt => "zext",
            Opcode::SExt => "sext",
            Opcode::PtrToInt => "ptrtoint",
            Opcode::IntToPtr => "inttoptr",
            Opcode::FPToSI => "fptosi",
            Opcode::SIToFP => "sitofp",
            Opcode::Select => "select",
            Opcode::Phi => "phi",
            Opcode::Call => "call",
            Opcode::Br => "br",
            Opcode::Switch => "switch",
            Opcode::Ret => "ret",
            Opcode::Unreachable => "unreachable",
        }
    }

    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.mnemonic() == mnemonic)
    }

    /// Integer and floating point arithmetic plus the bitwise and shift operators.
    pub fn is_binary(&self) -> bool {
        matches!(
            self,
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
        )
    }

    pub fn is_cast(&self) -> bool {
        matches!(
            self,
            Opcode::BitCast
                | Opcode::Trunc
                | Opcode::ZExt
                | Opcode::SExt
                | Opcode::PtrToInt
                | Opcode::IntToPtr
                | Opcode::FPToSI
                | Opcode::SIToFP
        )
    }

    pub fn is_compare(&self) -> bool {
        matches!(self, Opcode::ICmp | Opcode::FCmp)
    }

    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Opcode::Br | Opcode::Switch | Opcode::Ret | Opcode::Unreachable
        )
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub id: InstId,
    pub name: Option<String>,
    pub opcode: Opcode,
    pub ty: Type,
    pub operands: Vec<Operand>,
    /// Parallel to `operands` for `phi`: operand `i` arrives from `incoming_blocks[i]`.
    pub incoming_blocks: Vec<BlockId>,
    /// Comparison predicate for `icmp`/`fcmp`, e.g. `slt`.
    pub predicate: Option<String>,
}

impl Instruction {
    pub fn new(id: InstId, opcode: Opcode, ty: Type, operands: Vec<Operand>) -> Self {
        Self {
            id,
            name: None,
            opcode,
            ty,
            operands,
            incoming_blocks: Vec::new(),
            predicate: None,
        }
    }

    pub fn operand(&self, position: usize) -> Option<&Operand> {
        self.operands.get(position)
    }

    /// Operands that refer to other instructions, in operand order.
    pub fn inst_operands(&self) -> impl Iterator<Item = InstId> + '_ {
        self.operands.iter().filter_map(Operand::as_inst)
    }

    /// `(value, predecessor)` pairs of a phi node.
    pub fn phi_incoming(&self) -> impl Iterator<Item = (&Operand, BlockId)> + '_ {
        self.operands
            .iter()
            .zip(self.incoming_blocks.iter().copied())
    }

    pub fn is_phi(&self) -> bool {
        self.opcode == Opcode::Phi
    }

    pub fn is_terminator(&self) -> bool {
        self.opcode.is_terminator()
    }

    pub fn produces_value(&self) -> bool {
        !self.ty.is_void()
    }

    /// Branch targets named by a terminator, in operand order.
    pub fn targets(&self) -> Vec<BlockId> {
        if !self.is_terminator() {
            return Vec::new();
        }
        self.operands.iter().filter_map(Operand::as_block).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mnemonic_roundtrip() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_mnemonic(op.mnemonic()), Some(op));
        }
        assert_eq!(Opcode::from_mnemonic("fence"), None);
    }

    #[test]
    fn test_phi_incoming_pairs() {
        let mut phi = Instruction::new(
            InstId(4),
            Opcode::Phi,
            Type::i32(),
            vec![Operand::Const(0), Operand::Inst(InstId(2))],
        );
        phi.incoming_blocks = vec![BlockId(0), BlockId(1)];

        let pairs: Vec<_> = phi.phi_incoming().collect();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1], (&Operand::Inst(InstId(2)), BlockId(1)));
    }

    #[test]
    fn test_branch_targets() {
        let br = Instruction::new(
            InstId(3),
            Opcode::Br,
            Type::Void,
            vec![
                Operand::Inst(InstId(2)),
                Operand::Block(BlockId(1)),
                Operand::Block(BlockId(2)),
            ],
        );
        assert_eq!(br.targets(), vec![BlockId(1), BlockId(2)]);
        assert_eq!(br.inst_operands().collect::<Vec<_>>(), vec![InstId(2)]);
    }
}

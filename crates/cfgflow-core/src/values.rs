use crate::block::BlockId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of an instruction inside one function, assigned in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstId(pub u32);

impl fmt::Display for InstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "inst{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operand {
    Const(i64),
    Null,
    Undef,
    Arg(u32),
    Global(String),
    Inst(InstId),
    Block(BlockId),
}

impl Operand {
    pub fn as_inst(&self) -> Option<InstId> {
        match self {
            Operand::Inst(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<BlockId> {
        match self {
            Operand::Block(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_const(&self) -> Option<i64> {
        match self {
            Operand::Const(c) => Some(*c),
            _ => None,
        }
    }

    pub fn is_inst(&self) -> bool {
        matches!(self, Operand::Inst(_))
    }
}

impl From<InstId> for Operand {
    fn from(id: InstId) -> Self {
        Operand::Inst(id)
    }
}

impl From<BlockId> for Operand {
    fn from(id: BlockId) -> Self {
        Operand::Block(id)
    }
}

use crate::block::{BasicBlock, BlockId};
use crate::instructions::Instruction;
use crate::types::Type;
use crate::values::InstId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub param_type: Type,
}

impl Parameter {
    pub fn new(name: impl Into<String>, param_type: Type) -> Self {
        Self {
            name: name.into(),
            param_type,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub params: Vec<Parameter>,
    pub ret_ty: Type,
    pub blocks: IndexMap<BlockId, BasicBlock>,
    pub entry: BlockId,
}

impl Function {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry_block(&self) -> Option<&BasicBlock> {
        self.blocks.get(&self.entry)
    }

    pub fn get_block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(&id)
    }

    pub fn block_by_label(&self, label: &str) -> Option<&BasicBlock> {
        self.blocks.values().find(|block| block.label == label)
    }

    /// Every instruction in block order, then program order.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> + '_ {
        self.blocks.values().flat_map(|block| block.instructions.iter())
    }

    pub fn instruction_count(&self) -> usize {
        self.blocks.values().map(|block| block.instructions.len()).sum()
    }

    pub fn find_instruction(&self, id: InstId) -> Option<&Instruction> {
        self.instructions().find(|inst| inst.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Instruction> {
        self.instructions()
            .find(|inst| inst.name.as_deref() == Some(name))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Module {
    pub functions: IndexMap<String, Function>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self, function: Function) {
        self.functions.insert(function.name.clone(), function);
    }

    pub fn get_function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

use crate::{
    block::{BasicBlock, BlockId},
    function::{Function, Parameter},
    instructions::{Instruction, Opcode},
    types::Type,
    values::{InstId, Operand},
    IrError, Result,
};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Appends instructions to one function, one block at a time.
///
/// Instruction ids are handed out in append order, so a caller that numbers instructions in the
/// same order it appends them (the text parser does) can refer to values before they exist.
/// Misuse such as appending with no current block is recorded and reported by [`build`].
///
/// [`build`]: FunctionBuilder::build
pub struct FunctionBuilder {
    name: String,
    params: Vec<Parameter>,
    ret_ty: Type,
    blocks: IndexMap<BlockId, BasicBlock>,
    current_block: Option<BlockId>,
    next_block_id: u32,
    next_inst_id: u32,
    deferred_error: Option<IrError>,
}

impl FunctionBuilder {
    pub fn new(name: impl Into<String>, ret_ty: Type) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            ret_ty,
            blocks: IndexMap::new(),
            current_block: None,
            next_block_id: 0,
            next_inst_id: 0,
            deferred_error: None,
        }
    }

    pub fn param(&mut self, name: impl Into<String>, ty: Type) -> Operand {
        let index = self.params.len() as u32;
        self.params.push(Parameter::new(name, ty));
        Operand::Arg(index)
    }

    /// Creates a block; the first block created is the entry block and becomes current.
    pub fn create_block(&mut self, label: impl Into<String>) -> BlockId {
        let id = BlockId(self.next_block_id);
        self.next_block_id += 1;
        self.blocks.insert(id, BasicBlock::new(id, label));
        if self.current_block.is_none() {
            self.current_block = Some(id);
        }
        id
    }

    pub fn switch_to_block(&mut self, block: BlockId) -> &mut Self {
        if self.blocks.contains_key(&block) {
            self.current_block = Some(block);
        } else {
            self.defer(IrError::BuilderError(format!(
                "cannot position at unknown {}",
                block
            )));
        }
        self
    }

    pub fn current_block(&self) -> Option<BlockId> {
        self.current_block
    }

    /// Id the next appended instruction will receive.
    pub fn next_inst_id(&self) -> InstId {
        InstId(self.next_inst_id)
    }

    pub fn append(&mut self, opcode: Opcode, ty: Type, operands: Vec<Operand>) -> InstId {
        self.push(Instruction::new(InstId(0), opcode, ty, operands))
    }

    fn push(&mut self, mut inst: Instruction) -> InstId {
        let id = InstId(self.next_inst_id);
        self.next_inst_id += 1;
        inst.id = id;

        match self
            .current_block
            .and_then(|block| self.blocks.get_mut(&block))
        {
            Some(block) => block.add_instruction(inst),
            None => self.defer(IrError::BuilderError(format!(
                "{} appended with no current block",
                inst.opcode
            ))),
        }
        id
    }

    fn defer(&mut self, err: IrError) {
        if self.deferred_error.is_none() {
            self.deferred_error = Some(err);
        }
    }

    fn find_mut(&mut self, id: InstId) -> Option<&mut Instruction> {
        self.blocks
            .values_mut()
            .flat_map(|block| block.instructions.iter_mut())
            .find(|inst| inst.id == id)
    }

    /// Attaches a textual name (`%name`) to an existing instruction.
    pub fn set_name(&mut self, id: InstId, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        match self.find_mut(id) {
            Some(inst) => inst.name = Some(name),
            None => self.defer(IrError::BuilderError(format!(
                "cannot name unknown {}",
                id
            ))),
        }
        self
    }

    pub fn binary(&mut self, op: Opcode, ty: Type, lhs: Operand, rhs: Operand) -> Operand {
        if !op.is_binary() {
            self.defer(IrError::InvalidInstruction(format!(
                "{} is not a binary operator",
                op
            )));
        }
        self.append(op, ty, vec![lhs, rhs]).into()
    }

    pub fn add(&mut self, ty: Type, lhs: Operand, rhs: Operand) -> Operand {
        self.binary(Opcode::Add, ty, lhs, rhs)
    }

    pub fn mul(&mut self, ty: Type, lhs: Operand, rhs: Operand) -> Operand {
        self.binary(Opcode::Mul, ty, lhs, rhs)
    }

    pub fn icmp(&mut self, predicate: &str, lhs: Operand, rhs: Operand) -> Operand {
        self.compare(Opcode::ICmp, predicate, lhs, rhs)
    }

    pub fn compare(&mut self, op: Opcode, predicate: &str, lhs: Operand, rhs: Operand) -> Operand {
        let mut inst = Instruction::new(InstId(0), op, Type::i1(), vec![lhs, rhs]);
        inst.predicate = Some(predicate.to_string());
        self.push(inst).into()
    }

    /// `alloca` of `allocated`; the result is a pointer to it.
    pub fn alloca(&mut self, allocated: Type) -> Operand {
        self.append(Opcode::Alloca, Type::ptr_to(allocated), Vec::new())
            .into()
    }

    pub fn load(&mut self, ty: Type, ptr: Operand) -> Operand {
        self.append(Opcode::Load, ty, vec![ptr]).into()
    }

    pub fn store(&mut self, value: Operand, ptr: Operand) -> InstId {
        self.append(Opcode::Store, Type::Void, vec![value, ptr])
    }

    pub fn gep(&mut self, result_ty: Type, base: Operand, indices: Vec<Operand>) -> Operand {
        let mut operands = vec![base];
        operands.extend(indices);
        self.append(Opcode::GetElementPtr, result_ty, operands).into()
    }

    pub fn cast(&mut self, op: Opcode, value: Operand, to: Type) -> Operand {
        if !op.is_cast() {
            self.defer(IrError::InvalidInstruction(format!("{} is not a cast", op)));
        }
        self.append(op, to, vec![value]).into()
    }

    pub fn select(&mut self, ty: Type, cond: Operand, on_true: Operand, on_false: Operand) -> Operand {
        self.append(Opcode::Select, ty, vec![cond, on_true, on_false])
            .into()
    }

    pub fn phi(&mut self, ty: Type, incoming: Vec<(Operand, BlockId)>) -> Operand {
        let mut inst = Instruction::new(InstId(0), Opcode::Phi, ty, Vec::new());
        for (value, block) in incoming {
            inst.operands.push(value);
            inst.incoming_blocks.push(block);
        }
        self.push(inst).into()
    }

    /// Completes a phi whose incoming value is defined later, e.g. on a loop back edge.
    pub fn add_phi_incoming(&mut self, phi: InstId, value: Operand, block: BlockId) -> &mut Self {
        match self.find_mut(phi) {
            Some(inst) if inst.is_phi() => {
                inst.operands.push(value);
                inst.incoming_blocks.push(block);
            }
            _ => self.defer(IrError::InvalidInstruction(format!("{} is not a phi", phi))),
        }
        self
    }

    pub fn call(&mut self, ret_ty: Type, callee: &str, args: Vec<Operand>) -> Operand {
        let mut operands = vec![Operand::Global(callee.to_string())];
        operands.extend(args);
        self.append(Opcode::Call, ret_ty, operands).into()
    }

    pub fn br(&mut self, target: BlockId) -> InstId {
        self.append(Opcode::Br, Type::Void, vec![Operand::Block(target)])
    }

    pub fn cond_br(&mut self, cond: Operand, then_block: BlockId, else_block: BlockId) -> InstId {
        self.append(
            Opcode::Br,
            Type::Void,
            vec![
                cond,
                Operand::Block(then_block),
                Operand::Block(else_block),
            ],
        )
    }

    pub fn switch(&mut self, value: Operand, default: BlockId, cases: Vec<(i64, BlockId)>) -> InstId {
        let mut operands = vec![value, Operand::Block(default)];
        for (case, target) in cases {
            operands.push(Operand::Const(case));
            operands.push(Operand::Block(target));
        }
        self.append(Opcode::Switch, Type::Void, operands)
    }

    pub fn ret(&mut self, value: Option<Operand>) -> InstId {
        self.append(Opcode::Ret, Type::Void, value.into_iter().collect())
    }

    pub fn unreachable(&mut self) -> InstId {
        self.append(Opcode::Unreachable, Type::Void, Vec::new())
    }

    pub fn build(self) -> Result<Function> {
        if let Some(err) = self.deferred_error {
            return Err(err);
        }

        let entry = *self
            .blocks
            .keys()
            .next()
            .ok_or_else(|| IrError::BuilderError(format!("function @{} has no blocks", self.name)))?;

        let defined: HashSet<InstId> = self
            .blocks
            .values()
            .flat_map(|block| block.instructions.iter().map(|inst| inst.id))
            .collect();

        for block in self.blocks.values() {
            if block.instructions.is_empty() {
                return Err(IrError::BuilderError(format!(
                    "block '{}' is empty",
                    block.label
                )));
            }
            if !block.is_terminated() {
                return Err(IrError::BuilderError(format!(
                    "block '{}' does not end with a terminator",
                    block.label
                )));
            }

            let body = &block.instructions[..block.instructions.len() - 1];
            if let Some(inst) = body.iter().find(|inst| inst.is_terminator()) {
                return Err(IrError::BuilderError(format!(
                    "{} in the middle of block '{}'",
                    inst.opcode, block.label
                )));
            }

            for inst in &block.instructions {
                for operand in &inst.operands {
                    match operand {
                        Operand::Inst(id) if !defined.contains(id) => {
                            return Err(IrError::BuilderError(format!(
                                "{} uses undefined {}",
                                inst.id, id
                            )));
                        }
                        Operand::Block(id) if !self.blocks.contains_key(id) => {
                            return Err(IrError::BuilderError(format!(
                                "{} targets unknown {}",
                                inst.id, id
                            )));
                        }
                        Operand::Arg(index) if *index as usize >= self.params.len() => {
                            return Err(IrError::BuilderError(format!(
                                "{} uses missing parameter {}",
                                inst.id, index
                            )));
                        }
                        _ => {}
                    }
                }
                if let Some(block_id) = inst
                    .incoming_blocks
                    .iter()
                    .find(|id| !self.blocks.contains_key(*id))
                {
                    return Err(IrError::BuilderError(format!(
                        "phi {} names unknown predecessor {}",
                        inst.id, block_id
                    )));
                }
            }
        }

        Ok(Function {
            name: self.name,
            params: self.params,
            ret_ty: self.ret_ty,
            blocks: self.blocks,
            entry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_line_function() {
        let mut func = FunctionBuilder::new("sum", Type::i32());
        let a = func.param("a", Type::i32());
        let b = func.param("b", Type::i32());
        func.create_block("entry");
        let sum = func.add(Type::i32(), a, b);
        func.ret(Some(sum));

        let function = func.build().unwrap();
        assert_eq!(function.instruction_count(), 2);
        assert_eq!(function.entry_block().unwrap().label, "entry");
    }

    #[test]
    fn test_missing_terminator_rejected() {
        let mut func = FunctionBuilder::new("broken", Type::Void);
        func.create_block("entry");
        func.alloca(Type::i32());

        assert!(matches!(func.build(), Err(IrError::BuilderError(_))));
    }

    #[test]
    fn test_append_without_block_rejected() {
        let mut func = FunctionBuilder::new("orphan", Type::Void);
        func.ret(None);

        assert!(func.build().is_err());
    }

    #[test]
    fn test_phi_completed_later() {
        let mut func = FunctionBuilder::new("count", Type::Void);
        let entry = func.create_block("entry");
        let header = func.create_block("loop");
        func.br(header);

        func.switch_to_block(header);
        let i = func.phi(Type::i32(), vec![(Operand::Const(0), entry)]);
        let next = func.add(Type::i32(), i.clone(), Operand::Const(1));
        let phi_id = i.as_inst().unwrap();
        func.add_phi_incoming(phi_id, next, header);
        func.br(header);

        let function = func.build().unwrap();
        let phi = function.find_instruction(phi_id).unwrap();
        assert_eq!(phi.incoming_blocks, vec![entry, header]);
    }

    #[test]
    fn test_unknown_target_rejected() {
        let mut func = FunctionBuilder::new("jump", Type::Void);
        func.create_block("entry");
        func.br(BlockId(7));

        assert!(func.build().is_err());
    }

    #[test]
    fn test_phi_from_unknown_block_rejected() {
        let mut func = FunctionBuilder::new("merge", Type::i32());
        let entry = func.create_block("entry");
        let join = func.create_block("join");
        func.br(join);

        func.switch_to_block(join);
        let phi = func.phi(
            Type::i32(),
            vec![(Operand::Const(0), entry), (Operand::Const(1), BlockId(9))],
        );
        func.ret(Some(phi));

        match func.build() {
            Err(IrError::BuilderError(message)) => {
                assert!(message.contains("unknown predecessor"), "{}", message)
            }
            other => panic!("expected BuilderError, got {:?}", other.map(|f| f.name)),
        }
    }
}

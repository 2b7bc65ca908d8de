use crate::{
    block::BlockId,
    function::Function,
    instructions::{Instruction, Opcode},
    values::{InstId, Operand},
};
use std::collections::HashMap;
use std::fmt::Write;

/// Printable names for the values and labels of one function.
pub struct ValueNames {
    insts: HashMap<InstId, String>,
    labels: HashMap<BlockId, String>,
    params: Vec<String>,
}

impl ValueNames {
    pub fn new(function: &Function) -> Self {
        let insts = function
            .instructions()
            .map(|inst| {
                let name = inst
                    .name
                    .clone()
                    .unwrap_or_else(|| inst.id.0.to_string());
                (inst.id, name)
            })
            .collect();
        let labels = function
            .blocks
            .values()
            .map(|block| (block.id, block.label.clone()))
            .collect();
        let params = function.params.iter().map(|p| p.name.clone()).collect();

        Self {
            insts,
            labels,
            params,
        }
    }

    pub fn value(&self, id: InstId) -> String {
        match self.insts.get(&id) {
            Some(name) => format!("%{}", name),
            None => format!("%<{}>", id),
        }
    }

    pub fn label(&self, id: BlockId) -> String {
        match self.labels.get(&id) {
            Some(label) => format!("%{}", label),
            None => format!("%<{}>", id),
        }
    }

    pub fn operand(&self, operand: &Operand) -> String {
        match operand {
            Operand::Const(c) => c.to_string(),
            Operand::Null => "null".to_string(),
            Operand::Undef => "undef".to_string(),
            Operand::Arg(index) => match self.params.get(*index as usize) {
                Some(name) => format!("%{}", name),
                None => format!("%arg{}", index),
            },
            Operand::Global(name) => format!("@{}", name),
            Operand::Inst(id) => self.value(*id),
            Operand::Block(id) => format!("label {}", self.label(*id)),
        }
    }

    fn operand_list(&self, operands: &[Operand]) -> String {
        operands
            .iter()
            .map(|op| self.operand(op))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn instruction(&self, inst: &Instruction) -> String {
        let mut out = String::new();
        if inst.produces_value() {
            write!(&mut out, "{} = ", self.value(inst.id)).unwrap();
        }
        out.push_str(inst.opcode.mnemonic());

        match inst.opcode {
            Opcode::ICmp | Opcode::FCmp => {
                if let Some(pred) = &inst.predicate {
                    write!(&mut out, " {}", pred).unwrap();
                }
                write!(&mut out, " {}", self.operand_list(&inst.operands)).unwrap();
            }
            Opcode::Alloca => {
                let allocated = inst.ty.pointee().unwrap_or(&inst.ty);
                write!(&mut out, " {}", allocated).unwrap();
            }
            Opcode::Load | Opcode::GetElementPtr => {
                write!(&mut out, " {}, {}", inst.ty, self.operand_list(&inst.operands)).unwrap();
            }
            Opcode::Phi => {
                write!(&mut out, " {} ", inst.ty).unwrap();
                let incoming: Vec<_> = inst
                    .phi_incoming()
                    .map(|(value, block)| {
                        format!("[ {}, {} ]", self.operand(value), self.label(block))
                    })
                    .collect();
                out.push_str(&incoming.join(", "));
            }
            Opcode::Call => {
                let callee = inst
                    .operand(0)
                    .map(|op| self.operand(op))
                    .unwrap_or_default();
                let args = inst.operands.get(1..).unwrap_or(&[]);
                write!(&mut out, " {} {}({})", inst.ty, callee, self.operand_list(args)).unwrap();
            }
            Opcode::Switch => {
                let head = inst.operands.get(..2).unwrap_or(&inst.operands);
                write!(&mut out, " {} [", self.operand_list(head)).unwrap();
                for case in inst.operands.get(2..).unwrap_or(&[]).chunks(2) {
                    write!(&mut out, " {}", self.operand_list(case)).unwrap();
                }
                out.push_str(" ]");
            }
            Opcode::Ret if inst.operands.is_empty() => out.push_str(" void"),
            op if op.is_cast() => {
                write!(&mut out, " {} to {}", self.operand_list(&inst.operands), inst.ty).unwrap();
            }
            op if op.is_binary() => {
                write!(&mut out, " {} {}", inst.ty, self.operand_list(&inst.operands)).unwrap();
            }
            _ => {
                if !inst.operands.is_empty() {
                    write!(&mut out, " {}", self.operand_list(&inst.operands)).unwrap();
                }
            }
        }

        out
    }
}

pub fn format_instruction(function: &Function, inst: &Instruction) -> String {
    ValueNames::new(function).instruction(inst)
}

/// Listing of a function with each instruction prefixed by its dense `[index]`.
pub fn format_function(function: &Function) -> String {
    let names = ValueNames::new(function);
    let mut output = String::new();

    let params: Vec<_> = function
        .params
        .iter()
        .map(|p| format!("{} %{}", p.param_type, p.name))
        .collect();
    writeln!(
        &mut output,
        "define {} @{}({}) {{",
        function.ret_ty,
        function.name,
        params.join(", ")
    )
    .unwrap();

    let mut index = 0;
    for (i, block) in function.blocks.values().enumerate() {
        if i > 0 {
            writeln!(&mut output).unwrap();
        }
        writeln!(&mut output, "{}:", block.label).unwrap();
        for inst in &block.instructions {
            writeln!(&mut output, "    [{}] {}", index, names.instruction(inst)).unwrap();
            index += 1;
        }
    }

    writeln!(&mut output, "}}").unwrap();
    output
}

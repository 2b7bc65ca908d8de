/*! Static instruction counts.
 *
 * Counts how many instructions of each opcode a function contains, without running anything.
 */

use crate::analysis::pass::{AnalysisKind, AnalysisPass};
use crate::function::Function;
use crate::instructions::Opcode;
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct InstructionCounts {
    counts: BTreeMap<&'static str, usize>,
}

impl InstructionCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collect(function: &Function) -> Self {
        let mut counts = Self::new();
        for inst in function.instructions() {
            counts.record(inst.opcode);
        }
        counts
    }

    pub fn record(&mut self, opcode: Opcode) {
        *self.counts.entry(opcode.mnemonic()).or_insert(0) += 1;
    }

    pub fn get(&self, opcode: Opcode) -> usize {
        self.counts.get(opcode.mnemonic()).copied().unwrap_or(0)
    }

    /// `(mnemonic, count)` in mnemonic order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, usize)> + '_ {
        self.counts.iter().map(|(name, count)| (*name, *count))
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// One `mnemonic<TAB>count` line per opcode present.
impl fmt::Display for InstructionCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, count) in &self.counts {
            writeln!(f, "{}\t{}", name, count)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StaticCountPass;

impl AnalysisPass for StaticCountPass {
    type Output = InstructionCounts;

    fn name(&self) -> &'static str {
        "count"
    }

    fn description(&self) -> &'static str {
        "Static instruction counts per opcode"
    }

    fn kind(&self) -> AnalysisKind {
        AnalysisKind::StaticCounts
    }

    fn analyze(&mut self, function: &Function) -> Result<Self::Output> {
        Ok(InstructionCounts::collect(function))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{builder::FunctionBuilder, function::Module, types::Type, values::Operand};

    #[test]
    fn test_counts_by_mnemonic() {
        let mut func = FunctionBuilder::new("f", Type::Void);
        func.create_block("entry");
        let p = func.alloca(Type::i32());
        func.store(Operand::Const(1), p.clone());
        func.store(Operand::Const(2), p.clone());
        func.load(Type::i32(), p);
        func.ret(None);
        let function = func.build().unwrap();

        let counts = InstructionCounts::collect(&function);
        assert_eq!(counts.get(Opcode::Store), 2);
        assert_eq!(counts.get(Opcode::Add), 0);
        assert_eq!(counts.total(), 5);
        assert_eq!(counts.to_string(), "alloca\t1\nload\t1\nret\t1\nstore\t2\n");
    }

    #[test]
    fn test_module_counts_keep_function_order() {
        let mut module = Module::new();
        for name in ["second", "first"] {
            let mut func = FunctionBuilder::new(name, Type::Void);
            func.create_block("entry");
            func.ret(None);
            module.add_function(func.build().unwrap());
        }

        let counts = StaticCountPass.analyze_module(&module).unwrap();
        let names: Vec<&str> = counts.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["second", "first"]);
        assert_eq!(counts["first"].get(Opcode::Ret), 1);
    }
}

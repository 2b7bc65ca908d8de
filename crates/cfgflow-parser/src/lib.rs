/*! Parse textual IR into `cfgflow-core` functions.
 *
 * The accepted text is a subset of LLVM assembly: `define`d functions with the opcodes the
 * analyses know, plus enough tolerance for `declare`, `target`, attribute and metadata lines that
 * compiler output can be fed in without hand editing.
 */

use cfgflow_core::{BlockId, Function, FunctionBuilder, InstId, IrError, Module, Opcode, Operand, Type};
use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct IrParser;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] Box<pest::error::Error<Rule>>),
    #[error("Unknown value %{name} in @{function}")]
    UnknownValue { function: String, name: String },
    #[error("Unknown label %{label} in @{function}")]
    UnknownLabel { function: String, label: String },
    #[error("Duplicate value %{name} in @{function}")]
    DuplicateValue { function: String, name: String },
    #[error("Duplicate label %{label} in @{function}")]
    DuplicateLabel { function: String, label: String },
    #[error("Invalid function @{function}: {message}")]
    Invalid { function: String, message: String },
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type ParseResult<T> = Result<T, ParseError>;

pub fn parse(input: &str) -> ParseResult<Pairs<'_, Rule>> {
    IrParser::parse(Rule::module, input).map_err(|e| ParseError::Syntax(Box::new(e)))
}

pub fn parse_module(input: &str) -> ParseResult<Module> {
    let mut module = Module::new();
    let Some(root) = parse(input)?.next() else {
        return Ok(module);
    };

    for pair in root.into_inner() {
        if pair.as_rule() == Rule::function {
            let function = FunctionLowering::lower(pair)?;
            debug!(
                function = %function.name,
                blocks = function.blocks.len(),
                instructions = function.instruction_count(),
                "lowered function"
            );
            module.add_function(function);
        }
    }

    Ok(module)
}

pub fn parse_file<P: AsRef<Path>>(path: P) -> ParseResult<Module> {
    let path = path.as_ref();
    let input = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_module(&input)
}

/// Whether `input` parses and every function in it builds.
pub fn check(input: &str) -> bool {
    parse_module(input).is_ok()
}

/// Lowering state for one `define`.
struct FunctionLowering {
    function: String,
    values: HashMap<String, Operand>,
    labels: HashMap<String, BlockId>,
}

impl FunctionLowering {
    fn lower(pair: Pair<'_, Rule>) -> ParseResult<Function> {
        let mut ret_ty = None;
        let mut name = String::new();
        let mut params = Vec::new();
        let mut body = None;

        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::ty => ret_ty = Some(part),
                Rule::global_value => name = sigil_name(&part),
                Rule::params => params.extend(
                    part.into_inner()
                        .filter(|param| param.as_rule() == Rule::param),
                ),
                Rule::body => body = Some(part),
                _ => {}
            }
        }

        let mut lowering = Self {
            function: name.clone(),
            values: HashMap::new(),
            labels: HashMap::new(),
        };
        let ret_ty = match ret_ty {
            Some(ty) => lowering.lower_type(ty)?,
            None => Type::Void,
        };
        let mut builder = FunctionBuilder::new(name, ret_ty);

        for (index, param) in params.into_iter().enumerate() {
            let mut parts = param.into_inner();
            let Some(ty) = parts.next().filter(|p| p.as_rule() == Rule::ty) else {
                continue;
            };
            let param_name = parts
                .find(|p| p.as_rule() == Rule::local_value)
                .map(|p| sigil_name(&p))
                .unwrap_or_else(|| index.to_string());
            let param_ty = lowering.lower_type(ty)?;
            let operand = builder.param(param_name.clone(), param_ty);
            lowering.define_value(param_name, operand)?;
        }

        let blocks = match body {
            Some(body) => lowering.collect_blocks(body)?,
            None => Vec::new(),
        };

        let mut next_id = builder.next_inst_id().0;
        for (label, instructions) in &blocks {
            let id = builder.create_block(label.clone());
            lowering.labels.insert(label.clone(), id);
            for inst in instructions {
                if let Some(result) = assigned_name(inst) {
                    let operand = Operand::Inst(InstId(next_id));
                    lowering.define_value(result, operand)?;
                }
                next_id += 1;
            }
        }

        for (label, instructions) in blocks {
            if let Some(&id) = lowering.labels.get(&label) {
                builder.switch_to_block(id);
            }
            for inst in instructions {
                lowering.lower_instruction(&mut builder, inst)?;
            }
        }

        builder.build().map_err(|err| lowering.invalid(err))
    }

    fn invalid(&self, err: IrError) -> ParseError {
        ParseError::Invalid {
            function: self.function.clone(),
            message: err.to_string(),
        }
    }

    fn define_value(&mut self, name: String, operand: Operand) -> ParseResult<()> {
        if self.values.contains_key(&name) {
            return Err(ParseError::DuplicateValue {
                function: self.function.clone(),
                name,
            });
        }
        self.values.insert(name, operand);
        Ok(())
    }

    /// Splits the body into labelled blocks; instructions before the first label form `entry`.
    fn collect_blocks<'i>(
        &self,
        body: Pair<'i, Rule>,
    ) -> ParseResult<Vec<(String, Vec<Pair<'i, Rule>>)>> {
        let mut blocks: Vec<(String, Vec<Pair<'i, Rule>>)> = Vec::new();

        for line in body.into_inner() {
            match line.as_rule() {
                Rule::label_def => {
                    let label = line.as_str().trim_end_matches(':').to_string();
                    if blocks.iter().any(|(existing, _)| *existing == label) {
                        return Err(ParseError::DuplicateLabel {
                            function: self.function.clone(),
                            label,
                        });
                    }
                    blocks.push((label, Vec::new()));
                }
                Rule::instruction => match blocks.last_mut() {
                    Some((_, instructions)) => instructions.push(line),
                    None => blocks.push(("entry".to_string(), vec![line])),
                },
                _ => {}
            }
        }

        Ok(blocks)
    }

    fn value(&self, pair: &Pair<'_, Rule>) -> ParseResult<Operand> {
        match pair.as_rule() {
            Rule::local_value => {
                let name = sigil_name(pair);
                self.values
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| ParseError::UnknownValue {
                        function: self.function.clone(),
                        name,
                    })
            }
            Rule::global_value => Ok(Operand::Global(sigil_name(pair))),
            Rule::int_lit => pair
                .as_str()
                .parse()
                .map(Operand::Const)
                .map_err(|_| self.invalid_text(pair, "integer out of range")),
            Rule::float_lit => pair
                .as_str()
                .parse::<f64>()
                .map(|f| Operand::Const(f as i64))
                .map_err(|_| self.invalid_text(pair, "malformed float")),
            Rule::bool_lit => Ok(Operand::Const((pair.as_str() == "true") as i64)),
            Rule::null_lit => Ok(Operand::Null),
            Rule::undef_lit => Ok(Operand::Undef),
            _ => Err(self.invalid_text(pair, "expected a value")),
        }
    }

    /// `ty value` pair: the type and the resolved operand.
    fn typed_value(&self, pair: Pair<'_, Rule>) -> ParseResult<(Type, Operand)> {
        let mut parts = pair.clone().into_inner();
        match (parts.next(), parts.next()) {
            (Some(ty), Some(value)) => Ok((self.lower_type(ty)?, self.value(&value)?)),
            _ => Err(self.invalid_text(&pair, "expected a typed value")),
        }
    }

    fn lower_type(&self, pair: Pair<'_, Rule>) -> ParseResult<Type> {
        let mut ty = Type::Void;
        for part in pair.into_inner() {
            ty = match part.as_rule() {
                Rule::int_ty => {
                    let width = part.as_str()[1..]
                        .parse()
                        .map_err(|_| self.invalid_text(&part, "integer width out of range"))?;
                    Type::Int(width)
                }
                Rule::float_ty => Type::Float,
                Rule::double_ty => Type::Double,
                Rule::void_ty => Type::Void,
                Rule::ptr_ty => Type::ptr_to(Type::Int(8)),
                Rule::array_ty => {
                    let mut inner = part.clone().into_inner();
                    let len = match inner.next() {
                        Some(n) => n
                            .as_str()
                            .parse()
                            .map_err(|_| self.invalid_text(&part, "array length out of range"))?,
                        None => 0,
                    };
                    let elem = match inner.next() {
                        Some(elem) => self.lower_type(elem)?,
                        None => Type::Int(8),
                    };
                    Type::Array(len, Box::new(elem))
                }
                Rule::star => Type::ptr_to(ty),
                _ => ty,
            };
        }
        Ok(ty)
    }

    fn label(&self, pair: &Pair<'_, Rule>) -> ParseResult<BlockId> {
        let label = sigil_name(pair);
        self.labels
            .get(&label)
            .copied()
            .ok_or_else(|| ParseError::UnknownLabel {
                function: self.function.clone(),
                label,
            })
    }

    fn result_of(&self, pair: &Pair<'_, Rule>, operand: Operand) -> ParseResult<InstId> {
        operand
            .as_inst()
            .ok_or_else(|| self.invalid_text(pair, "instruction produced no result"))
    }

    fn invalid_text(&self, pair: &Pair<'_, Rule>, message: &str) -> ParseError {
        ParseError::Invalid {
            function: self.function.clone(),
            message: format!("{} at '{}'", message, pair.as_str()),
        }
    }

    fn lower_instruction(
        &self,
        builder: &mut FunctionBuilder,
        inst: Pair<'_, Rule>,
    ) -> ParseResult<()> {
        let Some(node) = inst.clone().into_inner().next() else {
            return Err(self.invalid_text(&inst, "empty instruction"));
        };

        match node.as_rule() {
            Rule::assignment => {
                let mut parts = node.clone().into_inner();
                let (Some(result), Some(op)) = (parts.next(), parts.next()) else {
                    return Err(self.invalid_text(&node, "malformed assignment"));
                };
                let id = self.lower_operation(builder, op)?;
                builder.set_name(id, sigil_name(&result));
            }
            _ => {
                self.lower_operation(builder, node)?;
            }
        }
        Ok(())
    }

    fn lower_operation(
        &self,
        builder: &mut FunctionBuilder,
        op: Pair<'_, Rule>,
    ) -> ParseResult<InstId> {
        let rule = op.as_rule();
        let text = op.clone();
        let parts: Vec<Pair<'_, Rule>> = op.into_inner().collect();
        let of_rule = |r: Rule| parts.iter().filter(move |p| p.as_rule() == r).cloned();
        let values = || {
            parts
                .iter()
                .filter(|p| is_value_rule(p.as_rule()))
                .map(|p| self.value(p))
                .collect::<ParseResult<Vec<_>>>()
        };
        let first_type = || of_rule(Rule::ty).next().map(|ty| self.lower_type(ty)).transpose();

        let id = match rule {
            Rule::binary => {
                let opcode = of_rule(Rule::binop)
                    .next()
                    .and_then(|p| Opcode::from_mnemonic(p.as_str()))
                    .ok_or_else(|| self.invalid_text(&text, "unknown binary operator"))?;
                let ty = first_type()?.unwrap_or(Type::i32());
                builder.append(opcode, ty, values()?)
            }
            Rule::icmp | Rule::fcmp => {
                let opcode = if rule == Rule::icmp {
                    Opcode::ICmp
                } else {
                    Opcode::FCmp
                };
                let predicate = of_rule(Rule::predicate)
                    .next()
                    .map(|p| p.as_str().to_string())
                    .unwrap_or_default();
                let operands = values()?;
                let (Some(lhs), Some(rhs)) = (operands.first(), operands.get(1)) else {
                    return Err(self.invalid_text(&text, "compare needs two operands"));
                };
                let result = builder.compare(opcode, &predicate, lhs.clone(), rhs.clone());
                self.result_of(&text, result)?
            }
            Rule::alloca => {
                let allocated = first_type()?.unwrap_or(Type::i32());
                self.result_of(&text, builder.alloca(allocated))?
            }
            Rule::load => {
                let types = of_rule(Rule::ty)
                    .map(|ty| self.lower_type(ty))
                    .collect::<ParseResult<Vec<_>>>()?;
                let ty = match types.as_slice() {
                    [result, _] => result.clone(),
                    [pointer] => pointer.pointee().cloned().unwrap_or(Type::i32()),
                    _ => Type::i32(),
                };
                let ptr = values()?
                    .into_iter()
                    .next()
                    .ok_or_else(|| self.invalid_text(&text, "load needs an address"))?;
                self.result_of(&text, builder.load(ty, ptr))?
            }
            Rule::store => {
                let mut typed = of_rule(Rule::typed_value);
                let (Some(value), Some(ptr)) = (typed.next(), typed.next()) else {
                    return Err(self.invalid_text(&text, "store needs a value and an address"));
                };
                let (_, value) = self.typed_value(value)?;
                let (_, ptr) = self.typed_value(ptr)?;
                builder.store(value, ptr)
            }
            Rule::gep => {
                let source = first_type()?.unwrap_or(Type::Int(8));
                let mut operands = Vec::new();
                for typed in of_rule(Rule::typed_value) {
                    operands.push(self.typed_value(typed)?.1);
                }
                let Some((base, indices)) = operands.split_first() else {
                    return Err(self.invalid_text(&text, "getelementptr needs a base"));
                };
                let ty = Type::ptr_to(indexed_type(source, indices.len()));
                self.result_of(&text, builder.gep(ty, base.clone(), indices.to_vec()))?
            }
            Rule::cast => {
                let opcode = of_rule(Rule::castop)
                    .next()
                    .and_then(|p| Opcode::from_mnemonic(p.as_str()))
                    .ok_or_else(|| self.invalid_text(&text, "unknown cast"))?;
                let (_, value) = match of_rule(Rule::typed_value).next() {
                    Some(typed) => self.typed_value(typed)?,
                    None => return Err(self.invalid_text(&text, "cast needs a value")),
                };
                let to = first_type()?.unwrap_or(Type::i32());
                self.result_of(&text, builder.cast(opcode, value, to))?
            }
            Rule::select => {
                let mut typed = Vec::new();
                for pair in of_rule(Rule::typed_value) {
                    typed.push(self.typed_value(pair)?);
                }
                let [(_, cond), (ty, on_true), (_, on_false)] = <[_; 3]>::try_from(typed)
                    .map_err(|_| self.invalid_text(&text, "select needs three operands"))?;
                self.result_of(&text, builder.select(ty, cond, on_true, on_false))?
            }
            Rule::phi => {
                let ty = first_type()?.unwrap_or(Type::i32());
                let mut incoming = Vec::new();
                for pair in of_rule(Rule::phi_incoming) {
                    let mut inner = pair.clone().into_inner();
                    let (Some(value), Some(label)) = (inner.next(), inner.next()) else {
                        return Err(self.invalid_text(&pair, "malformed phi incoming"));
                    };
                    incoming.push((self.value(&value)?, self.label(&label)?));
                }
                self.result_of(&text, builder.phi(ty, incoming))?
            }
            Rule::call => {
                let ret_ty = first_type()?.unwrap_or(Type::Void);
                let callee = of_rule(Rule::callee)
                    .next()
                    .and_then(|p| p.into_inner().next())
                    .ok_or_else(|| self.invalid_text(&text, "call needs a callee"))?;
                let mut operands = vec![self.value(&callee)?];
                for arg in of_rule(Rule::call_arg) {
                    let value = arg
                        .clone()
                        .into_inner()
                        .find(|p| is_value_rule(p.as_rule()))
                        .ok_or_else(|| self.invalid_text(&arg, "call argument needs a value"))?;
                    operands.push(self.value(&value)?);
                }
                builder.append(Opcode::Call, ret_ty, operands)
            }
            Rule::br_uncond => {
                let target = of_rule(Rule::local_value)
                    .next()
                    .ok_or_else(|| self.invalid_text(&text, "br needs a target"))?;
                builder.br(self.label(&target)?)
            }
            Rule::br_cond => {
                let (_, cond) = match of_rule(Rule::typed_value).next() {
                    Some(typed) => self.typed_value(typed)?,
                    None => return Err(self.invalid_text(&text, "br needs a condition")),
                };
                let targets: Vec<_> = of_rule(Rule::local_value).collect();
                let [then_label, else_label] = targets.as_slice() else {
                    return Err(self.invalid_text(&text, "br needs two targets"));
                };
                builder.cond_br(cond, self.label(then_label)?, self.label(else_label)?)
            }
            Rule::switch => {
                let (_, value) = match of_rule(Rule::typed_value).next() {
                    Some(typed) => self.typed_value(typed)?,
                    None => return Err(self.invalid_text(&text, "switch needs a value")),
                };
                let default = of_rule(Rule::local_value)
                    .next()
                    .ok_or_else(|| self.invalid_text(&text, "switch needs a default"))?;
                let mut cases = Vec::new();
                for case in of_rule(Rule::switch_case) {
                    let mut inner = case.clone().into_inner();
                    let (Some(typed), Some(label)) = (inner.next(), inner.next()) else {
                        return Err(self.invalid_text(&case, "malformed switch case"));
                    };
                    let constant = match self.typed_value(typed)?.1 {
                        Operand::Const(c) => c,
                        _ => return Err(self.invalid_text(&case, "switch case must be constant")),
                    };
                    cases.push((constant, self.label(&label)?));
                }
                builder.switch(value, self.label(&default)?, cases)
            }
            Rule::ret_void => builder.ret(None),
            Rule::ret_value => {
                let (_, value) = match of_rule(Rule::typed_value).next() {
                    Some(typed) => self.typed_value(typed)?,
                    None => return Err(self.invalid_text(&text, "ret needs a value")),
                };
                builder.ret(Some(value))
            }
            Rule::unreachable => builder.unreachable(),
            _ => return Err(self.invalid_text(&text, "unsupported instruction")),
        };

        Ok(id)
    }
}

fn is_value_rule(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::local_value
            | Rule::global_value
            | Rule::float_lit
            | Rule::int_lit
            | Rule::bool_lit
            | Rule::null_lit
            | Rule::undef_lit
    )
}

/// Name after the `%`/`@` sigil.
fn sigil_name(pair: &Pair<'_, Rule>) -> String {
    pair.as_str().get(1..).unwrap_or_default().to_string()
}

fn assigned_name(inst: &Pair<'_, Rule>) -> Option<String> {
    let node = inst.clone().into_inner().next()?;
    if node.as_rule() != Rule::assignment {
        return None;
    }
    node.into_inner().next().map(|result| sigil_name(&result))
}

/// Element type reached by `getelementptr` after the leading index.
fn indexed_type(source: Type, index_count: usize) -> Type {
    let mut ty = source;
    for _ in 1..index_count {
        ty = match ty {
            Type::Array(_, elem) => *elem,
            other => other,
        };
    }
    ty
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_module() {
        let module = parse_module("").unwrap();
        assert!(module.is_empty());
    }

    #[test]
    fn test_simple_function() {
        let input = r"
define i32 @add(i32 %a, i32 %b) {
entry:
  %sum = add nsw i32 %a, %b
  ret i32 %sum
}
";
        let module = parse_module(input).unwrap();
        let function = module.get_function("add").unwrap();
        assert_eq!(function.params.len(), 2);
        assert_eq!(function.instruction_count(), 2);
        let sum = function.find_by_name("sum").unwrap();
        assert_eq!(sum.opcode, Opcode::Add);
        assert_eq!(sum.operands, vec![Operand::Arg(0), Operand::Arg(1)]);
    }

    #[test]
    fn test_skipped_top_level_lines() {
        let input = r#"; ModuleID = 'demo.c'
source_filename = "demo.c"
target triple = "x86_64-pc-linux-gnu"
@counter = global i32 0, align 4

declare i32 @printf(i8*, ...)

define dso_local void @noop() #0 {
  ret void
}

attributes #0 = { noinline nounwind }
"#;
        let module = parse_module(input).unwrap();
        assert_eq!(module.functions.len(), 1);
        let noop = module.get_function("noop").unwrap();
        assert_eq!(noop.entry_block().unwrap().label, "entry");
    }

    #[test]
    fn test_forward_reference_through_phi() {
        let input = r"
define i32 @loop(i32 %n) {
entry:
  br label %header
header:                                           ; preds = %body, %entry
  %i = phi i32 [ 0, %entry ], [ %next, %body ]
  %c = icmp slt i32 %i, %n
  br i1 %c, label %body, label %exit
body:
  %next = add i32 %i, 1
  br label %header
exit:
  ret i32 %i
}
";
        let module = parse_module(input).unwrap();
        let function = module.get_function("loop").unwrap();
        let phi = function.find_by_name("i").unwrap();
        let next = function.find_by_name("next").unwrap();
        assert_eq!(phi.operands[1], Operand::Inst(next.id));
        assert_eq!(phi.incoming_blocks.len(), 2);
    }

    #[test]
    fn test_unknown_value_is_reported() {
        let input = "define i32 @f() {\n  ret i32 %missing\n}\n";
        match parse_module(input) {
            Err(ParseError::UnknownValue { function, name }) => {
                assert_eq!(function, "f");
                assert_eq!(name, "missing");
            }
            other => panic!("expected UnknownValue, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_label_is_reported() {
        let input = "define void @f() {\na:\n  br label %a\na:\n  ret void\n}\n";
        assert!(matches!(
            parse_module(input),
            Err(ParseError::DuplicateLabel { .. })
        ));
    }

    #[test]
    fn test_syntax_error() {
        assert!(matches!(
            parse_module("define i32 @f( {"),
            Err(ParseError::Syntax(_))
        ));
        assert!(!check("define i32 @f( {"));
    }

    #[test]
    fn test_oversized_integer_width_is_reported() {
        let input = "define i99999999999 @wide() {\n  ret void\n}\n";
        match parse_module(input) {
            Err(ParseError::Invalid { function, message }) => {
                assert_eq!(function, "wide");
                assert!(message.contains("integer width"), "{}", message);
            }
            other => panic!("expected Invalid, got {:?}", other),
        }

        let input = "define void @f() {\n  %x = alloca i4294967296\n  ret void\n}\n";
        assert!(matches!(
            parse_module(input),
            Err(ParseError::Invalid { .. })
        ));
    }
}

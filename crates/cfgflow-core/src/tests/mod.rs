/*! Engine and analysis tests over small hand-built functions.
 *
 * Each fixture is written so the expected facts can be worked out by hand; instruction indices in
 * the comments are the dense indices the graph assigns.
 */

mod graph_tests;
mod liveness_tests;
mod points_to_tests;
mod reaching_tests;

use crate::block::BlockId;
use crate::builder::FunctionBuilder;
use crate::function::Function;
use crate::instructions::Opcode;
use crate::types::Type;
use crate::values::Operand;

/// `x = a + b; y = x * 2; ret y`
///
/// ```text
/// [0] %x = add i32 %a, %b
/// [1] %y = mul i32 %x, 2
/// [2] ret %y
/// ```
pub(crate) fn straight_line() -> Function {
    let mut func = FunctionBuilder::new("straight", Type::i32());
    let a = func.param("a", Type::i32());
    let b = func.param("b", Type::i32());
    func.create_block("entry");
    let x = func.add(Type::i32(), a, b);
    let y = func.mul(Type::i32(), x, Operand::Const(2));
    func.ret(Some(y));
    func.build().unwrap()
}

/// Three definitions in a row.
///
/// ```text
/// [0] %x = add i32 %a, 1
/// [1] %y = mul i32 %x, 2
/// [2] %z = add i32 %x, %y
/// [3] ret %z
/// ```
pub(crate) fn three_definitions() -> Function {
    let mut func = FunctionBuilder::new("three", Type::i32());
    let a = func.param("a", Type::i32());
    func.create_block("entry");
    let x = func.add(Type::i32(), a, Operand::Const(1));
    let y = func.mul(Type::i32(), x.clone(), Operand::Const(2));
    let z = func.add(Type::i32(), x, y);
    func.ret(Some(z));
    func.build().unwrap()
}

/// Counting loop.
///
/// ```text
/// entry:  [0] br label %header
/// header: [1] %i = phi i32 [ 0, %entry ], [ %next, %body ]
///         [2] %c = icmp slt %i, 10
///         [3] br %c, label %body, label %exit
/// body:   [4] %next = add i32 %i, 1
///         [5] br label %header
/// exit:   [6] ret %i
/// ```
pub(crate) fn counting_loop() -> Function {
    let mut func = FunctionBuilder::new("count", Type::i32());
    let entry = func.create_block("entry");
    let header = func.create_block("header");
    let body = func.create_block("body");
    let exit = func.create_block("exit");

    func.br(header);

    func.switch_to_block(header);
    let i = func.phi(Type::i32(), vec![(Operand::Const(0), entry)]);
    let c = func.icmp("slt", i.clone(), Operand::Const(10));
    func.cond_br(c, body, exit);

    func.switch_to_block(body);
    let next = func.add(Type::i32(), i.clone(), Operand::Const(1));
    func.br(header);
    func.add_phi_incoming(i.as_inst().unwrap(), next, body);

    func.switch_to_block(exit);
    func.ret(Some(i));
    func.build().unwrap()
}

/// Diamond joined by two sibling phis.
///
/// ```text
/// entry: [0] %c = icmp slt %a, 0
///        [1] br %c, label %left, label %right
/// left:  [2] %x = add i32 %a, 1
///        [3] br label %join
/// right: [4] %y = add i32 %a, 2
///        [5] br label %join
/// join:  [6] %p = phi i32 [ %x, %left ], [ %y, %right ]
///        [7] %q = phi i32 [ 1, %left ], [ %y, %right ]
///        [8] %s = add i32 %p, %q
///        [9] ret %s
/// ```
pub(crate) fn diamond_with_phis() -> Function {
    let mut func = FunctionBuilder::new("diamond", Type::i32());
    let a = func.param("a", Type::i32());
    func.create_block("entry");
    let left = func.create_block("left");
    let right = func.create_block("right");
    let join = func.create_block("join");

    let c = func.icmp("slt", a.clone(), Operand::Const(0));
    func.cond_br(c, left, right);

    func.switch_to_block(left);
    let x = func.add(Type::i32(), a.clone(), Operand::Const(1));
    func.br(join);

    func.switch_to_block(right);
    let y = func.add(Type::i32(), a, Operand::Const(2));
    func.br(join);

    func.switch_to_block(join);
    let p = func.phi(Type::i32(), vec![(x, left), (y.clone(), right)]);
    let q = func.phi(Type::i32(), vec![(Operand::Const(1), left), (y, right)]);
    let s = func.add(Type::i32(), p, q);
    func.ret(Some(s));
    func.build().unwrap()
}

/// `v = alloca; p = alloca; store v -> p; q = load p`
///
/// ```text
/// [0] %v = alloca i32
/// [1] %p = alloca i32*
/// [2] store %v, %p
/// [3] %q = load i32*, %p
/// [4] %n = add i32 1, 2
/// [5] ret void
/// ```
pub(crate) fn store_then_load() -> Function {
    let mut func = FunctionBuilder::new("indirect", Type::Void);
    func.create_block("entry");
    let v = func.alloca(Type::i32());
    let p = func.alloca(Type::ptr_to(Type::i32()));
    func.store(v, p.clone());
    func.load(Type::ptr_to(Type::i32()), p);
    func.add(Type::i32(), Operand::Const(1), Operand::Const(2));
    func.ret(None);
    func.build().unwrap()
}

/// Pointer merged through a phi, a select and a bitcast.
///
/// ```text
/// entry: [0] %a = alloca i32
///        [1] %b = alloca i32
///        [2] %c = icmp slt %x, 0
///        [3] br %c, label %l, label %r
/// l:     [4] br label %j
/// r:     [5] br label %j
/// j:     [6] %m = phi i32* [ %a, %l ], [ %b, %r ]
///        [7] %s = select %c, %a, %m
///        [8] %t = bitcast %m to i8*
///        [9] ret void
/// ```
pub(crate) fn merged_pointers() -> Function {
    let mut func = FunctionBuilder::new("merge", Type::Void);
    let x = func.param("x", Type::i32());
    func.create_block("entry");
    let l = func.create_block("l");
    let r = func.create_block("r");
    let j = func.create_block("j");

    let a = func.alloca(Type::i32());
    let b = func.alloca(Type::i32());
    let c = func.icmp("slt", x, Operand::Const(0));
    func.cond_br(c.clone(), l, r);

    func.switch_to_block(l);
    func.br(j);
    func.switch_to_block(r);
    func.br(j);

    func.switch_to_block(j);
    let ptr = Type::ptr_to(Type::i32());
    let m = func.phi(ptr.clone(), vec![(a.clone(), l), (b, r)]);
    func.select(ptr, c, a, m.clone());
    func.cast(Opcode::BitCast, m, Type::ptr_to(Type::Int(8)));
    func.ret(None);
    func.build().unwrap()
}

/// A function whose only branch names a block that does not exist. Built by hand because the
/// builder refuses it.
pub(crate) fn dangling_branch() -> Function {
    let mut func = FunctionBuilder::new("dangling", Type::Void);
    func.create_block("entry");
    func.add(Type::i32(), Operand::Const(1), Operand::Const(2));
    func.br(BlockId(0));
    let mut function = func.build().unwrap();

    let entry = function.blocks.get_mut(&BlockId(0)).unwrap();
    if let Some(br) = entry.instructions.last_mut() {
        br.operands = vec![Operand::Block(BlockId(7))];
    }
    function
}

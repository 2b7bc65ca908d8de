use super::*;
use crate::analysis::lattice::Cell;
use crate::analysis::points_to::MayPointTo;
use crate::analysis::worklist::run;
use pretty_assertions::assert_eq;

#[test]
fn test_load_through_stored_pointer() {
    let function = store_then_load();
    let result = run(MayPointTo::new(), &function);
    let fact = result.fact_at(3).unwrap();

    let q = Cell::register(3);
    assert_eq!(fact.pointees(&q), vec![Cell::memory(0)]);
    assert_eq!(fact.pointees(&q), fact.pointees(&Cell::memory(1)));
    assert_eq!(fact.pointees(&q), fact.pointees(&Cell::register(0)));
    assert_eq!(fact.to_string(), "M1->(M0/)|R0->(M0/)|R1->(M1/)|R3->(M0/)|");
}

#[test]
fn test_allocation_creates_cell_pair() {
    let function = store_then_load();
    let result = run(MayPointTo::new(), &function);

    assert_eq!(result.fact_at(0).unwrap().to_string(), "R0->(M0/)|");
    assert!(result
        .fact_at(1)
        .unwrap()
        .points_to(&Cell::register(1), &Cell::memory(1)));
}

#[test]
fn test_non_pointer_instructions_pass_through() {
    let function = store_then_load();
    let result = run(MayPointTo::new(), &function);

    assert_eq!(result.fact_at(4), result.fact_at(3));
    assert_eq!(result.fact_at(5), result.fact_at(3));
}

#[test]
fn test_merge_select_and_cast_union_pointees() {
    let function = merged_pointers();
    let result = run(MayPointTo::new(), &function);
    let both = vec![Cell::memory(0), Cell::memory(1)];

    let fact = result.fact_at(8).unwrap();
    assert_eq!(fact.pointees(&Cell::register(6)), both);
    assert_eq!(fact.pointees(&Cell::register(7)), both);
    assert_eq!(fact.pointees(&Cell::register(8)), both);
    // `icmp` produces no pointer.
    assert!(fact.pointees(&Cell::register(2)).is_empty());
}

#[test]
fn test_store_of_non_pointer_adds_nothing() {
    let mut func = FunctionBuilder::new("scalar", Type::Void);
    func.create_block("entry");
    let slot = func.alloca(Type::i32());
    func.store(Operand::Const(7), slot);
    func.ret(None);
    let function = func.build().unwrap();

    let result = run(MayPointTo::new(), &function);
    assert_eq!(result.fact_at(1), result.fact_at(0));
}

#[test]
fn test_address_computation_keeps_base_pointees() {
    let mut func = FunctionBuilder::new("gep", Type::Void);
    func.create_block("entry");
    let array = func.alloca(Type::Array(4, Box::new(Type::i32())));
    func.gep(
        Type::ptr_to(Type::i32()),
        array,
        vec![Operand::Const(0), Operand::Const(2)],
    );
    func.ret(None);
    let function = func.build().unwrap();

    let result = run(MayPointTo::new(), &function);
    let fact = result.fact_at(1).unwrap();
    assert_eq!(fact.pointees(&Cell::register(1)), vec![Cell::memory(0)]);
}

/// ```text
/// j: [6] %m = phi i32* [ %a, %l ], [ %a, %r ]
///    [7] %n = phi i32* [ %b, %l ], [ %b, %r ]
/// ```
#[test]
fn test_sibling_phis_share_incoming_pointees() {
    let mut func = FunctionBuilder::new("siblings", Type::Void);
    let x = func.param("x", Type::i32());
    func.create_block("entry");
    let l = func.create_block("l");
    let r = func.create_block("r");
    let j = func.create_block("j");

    let a = func.alloca(Type::i32());
    let b = func.alloca(Type::i32());
    let c = func.icmp("slt", x, Operand::Const(0));
    func.cond_br(c, l, r);
    func.switch_to_block(l);
    func.br(j);
    func.switch_to_block(r);
    func.br(j);

    func.switch_to_block(j);
    let ptr = Type::ptr_to(Type::i32());
    func.phi(ptr.clone(), vec![(a.clone(), l), (a, r)]);
    func.phi(ptr, vec![(b.clone(), l), (b, r)]);
    func.ret(None);
    let function = func.build().unwrap();

    let result = run(MayPointTo::new(), &function);
    let both = vec![Cell::memory(0), Cell::memory(1)];
    assert_eq!(result.fact_at(6).unwrap().pointees(&Cell::register(6)), both);
    assert_eq!(
        result.fact_at(8).unwrap().to_string(),
        "R0->(M0/)|R1->(M1/)|R6->(M0/M1/)|R7->(M0/M1/)|"
    );
}

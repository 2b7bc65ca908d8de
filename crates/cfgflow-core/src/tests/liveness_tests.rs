use super::*;
use crate::analysis::graph::{Edge, Node};
use crate::analysis::lattice::InstSet;
use crate::analysis::liveness::Liveness;
use crate::analysis::worklist::run;
use pretty_assertions::assert_eq;

#[test]
fn test_straight_line_live_sets() {
    let function = straight_line();
    let result = run(Liveness::new(), &function);

    // Live before `ret y`: y.
    assert_eq!(result.fact_at(2), Some(&InstSet::from([1])));
    // Live before `y = x * 2`: x.
    assert_eq!(result.fact_at(1), Some(&InstSet::from([0])));
    // `a` and `b` are parameters, not instruction results.
    assert_eq!(result.fact_at(0), Some(&InstSet::new()));
}

#[test]
fn test_definitions_of_instruction_results_are_used_upstream() {
    let function = three_definitions();
    let result = run(Liveness::new(), &function);

    assert_eq!(result.fact_at(2), Some(&InstSet::from([0, 1])));
    assert_eq!(result.fact_at(1), Some(&InstSet::from([0])));
    assert_eq!(result.fact_at(0), Some(&InstSet::new()));
}

#[test]
fn test_phi_operands_live_only_on_their_edge() {
    let function = diamond_with_phis();
    let result = run(Liveness::new(), &function);

    let from_left = Edge::new(Node::Inst(6), Node::Inst(3));
    let from_right = Edge::new(Node::Inst(6), Node::Inst(5));
    assert_eq!(result.edge_fact(&from_left), Some(&InstSet::from([2])));
    assert_eq!(result.edge_fact(&from_right), Some(&InstSet::from([4])));

    assert_eq!(result.fact_at(6), Some(&InstSet::from([2, 4])));
    assert_eq!(result.fact_at(7), Some(&InstSet::new()));
    assert_eq!(result.fact_at(8), Some(&InstSet::from([6, 7])));
    assert_eq!(result.fact_at(3), Some(&InstSet::from([2])));
    assert_eq!(result.fact_at(2), Some(&InstSet::new()));
    assert_eq!(result.fact_at(1), Some(&InstSet::from([0])));
}

#[test]
fn test_loop_carried_value() {
    let function = counting_loop();
    let result = run(Liveness::new(), &function);

    assert_eq!(result.fact_at(6), Some(&InstSet::from([1])));
    assert_eq!(result.fact_at(3), Some(&InstSet::from([1, 2])));
    assert_eq!(result.fact_at(2), Some(&InstSet::from([1])));
    assert_eq!(result.fact_at(4), Some(&InstSet::from([1])));
    assert_eq!(result.fact_at(5), Some(&InstSet::from([4])));
    // The constant arriving from `entry` keeps nothing alive there.
    assert_eq!(
        result.edge_fact(&Edge::new(Node::Inst(1), Node::Inst(0))),
        Some(&InstSet::new())
    );
    assert_eq!(result.fact_at(0), Some(&InstSet::new()));
}

#[test]
fn test_store_uses_both_operands() {
    let mut func = FunctionBuilder::new("st", Type::Void);
    func.create_block("entry");
    let slot = func.alloca(Type::i32());
    let value = func.add(Type::i32(), Operand::Const(1), Operand::Const(2));
    func.store(value, slot);
    func.ret(None);
    let function = func.build().unwrap();

    let result = run(Liveness::new(), &function);
    assert_eq!(result.fact_at(2), Some(&InstSet::from([0, 1])));
    assert_eq!(result.fact_at(1), Some(&InstSet::from([0])));
    assert_eq!(result.fact_at(0), Some(&InstSet::new()));
}

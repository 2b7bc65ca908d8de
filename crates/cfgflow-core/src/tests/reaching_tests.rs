use super::*;
use crate::analysis::lattice::InstSet;
use crate::analysis::reaching::ReachingDefinitions;
use crate::analysis::worklist::run;
use pretty_assertions::assert_eq;

#[test]
fn test_straight_line_definitions_accumulate() {
    let function = three_definitions();
    let result = run(ReachingDefinitions::new(), &function);

    assert_eq!(result.fact_at(0), Some(&InstSet::from([0])));
    assert_eq!(result.fact_at(1), Some(&InstSet::from([0, 1])));
    assert_eq!(result.fact_at(2), Some(&InstSet::from([0, 1, 2])));
    // `ret` defines nothing.
    assert_eq!(result.fact_at(3), Some(&InstSet::from([0, 1, 2])));
}

#[test]
fn test_branches_do_not_define() {
    let function = diamond_with_phis();
    let result = run(ReachingDefinitions::new(), &function);

    assert_eq!(result.fact_at(1), Some(&InstSet::from([0])));
    assert_eq!(result.fact_at(3), Some(&InstSet::from([0, 2])));
    assert_eq!(result.fact_at(5), Some(&InstSet::from([0, 4])));
}

#[test]
fn test_phi_group_defines_together() {
    let function = diamond_with_phis();
    let result = run(ReachingDefinitions::new(), &function);

    assert_eq!(result.fact_at(6), Some(&InstSet::from([0, 2, 4, 6, 7])));
    assert_eq!(result.fact_at(7), Some(&InstSet::from([0, 2, 4, 6, 7])));
    assert_eq!(
        result.fact_at(8).map(ToString::to_string).as_deref(),
        Some("0|2|4|6|7|8|")
    );
}

#[test]
fn test_loop_definitions_flow_around_back_edge() {
    let function = counting_loop();
    let result = run(ReachingDefinitions::new(), &function);

    assert_eq!(result.fact_at(0), Some(&InstSet::new()));
    assert_eq!(result.fact_at(2), Some(&InstSet::from([1, 2, 4])));
    assert_eq!(result.fact_at(6), Some(&InstSet::from([1, 2, 4])));
}

#[test]
fn test_redefinition_does_not_kill() {
    // Two stores to the same slot and two loads: every load stays reachable.
    let mut func = FunctionBuilder::new("redef", Type::Void);
    func.create_block("entry");
    let slot = func.alloca(Type::i32());
    func.store(Operand::Const(1), slot.clone());
    func.load(Type::i32(), slot.clone());
    func.store(Operand::Const(2), slot.clone());
    func.load(Type::i32(), slot);
    func.ret(None);
    let function = func.build().unwrap();

    let result = run(ReachingDefinitions::new(), &function);
    assert_eq!(result.fact_at(5), Some(&InstSet::from([0, 2, 4])));
}

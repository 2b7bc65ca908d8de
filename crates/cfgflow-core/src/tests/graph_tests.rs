use super::*;
use crate::analysis::graph::{Direction, Edge, IndexedGraph, Node};
use pretty_assertions::assert_eq;

#[test]
fn test_forward_straight_line() {
    let function = straight_line();
    let graph = IndexedGraph::build(&function, Direction::Forward);

    assert_eq!(graph.len(), 3);
    assert_eq!(graph.boundary(), &[0]);
    assert_eq!(graph.incoming(0), &[Node::Entry]);
    assert_eq!(graph.outgoing(0), &[Node::Inst(1)]);
    assert_eq!(graph.outgoing(2), &[Node::Exit]);
    assert_eq!(graph.edge_count(), 4);
}

#[test]
fn test_backward_reverses_edges() {
    let function = straight_line();
    let graph = IndexedGraph::build(&function, Direction::Backward);

    assert_eq!(graph.boundary(), &[2]);
    assert_eq!(graph.incoming(2), &[Node::Entry]);
    assert_eq!(graph.outgoing(2), &[Node::Inst(1)]);
    assert_eq!(graph.incoming(0), &[Node::Inst(1)]);
    assert_eq!(graph.outgoing(0), &[Node::Exit]);
}

#[test]
fn test_branch_edges_follow_operand_order() {
    let function = diamond_with_phis();
    let graph = IndexedGraph::build(&function, Direction::Forward);

    assert_eq!(graph.outgoing(1), &[Node::Inst(2), Node::Inst(4)]);
    assert_eq!(graph.incoming(6), &[Node::Inst(3), Node::Inst(5)]);
    assert_eq!(graph.outgoing(6), &[Node::Inst(7)]);
    assert_eq!(graph.outgoing(9), &[Node::Exit]);
}

#[test]
fn test_loop_back_edge() {
    let function = counting_loop();
    let forward = IndexedGraph::build(&function, Direction::Forward);
    assert_eq!(forward.incoming(1), &[Node::Inst(0), Node::Inst(5)]);
    assert_eq!(forward.outgoing(3), &[Node::Inst(4), Node::Inst(6)]);

    let backward = IndexedGraph::build(&function, Direction::Backward);
    assert_eq!(backward.boundary(), &[6]);
    assert_eq!(backward.outgoing(1), &[Node::Inst(0), Node::Inst(5)]);
    assert_eq!(backward.outgoing(0), &[Node::Exit]);
}

#[test]
fn test_index_mapping_is_total_and_injective() {
    let function = counting_loop();
    let graph = IndexedGraph::build(&function, Direction::Forward);

    for (index, inst) in function.instructions().enumerate() {
        assert_eq!(graph.index_of(inst.id), Some(index));
        assert_eq!(graph.instruction(index).map(|i| i.id), Some(inst.id));
    }
    assert_eq!(graph.location(4).unwrap().position, 0);
    assert_eq!(graph.block_of(4).unwrap().label, "body");
    assert!(graph.instruction(7).is_none());
}

#[test]
fn test_rebuilding_is_idempotent() {
    let function = diamond_with_phis();
    let first: Vec<Edge> = IndexedGraph::build(&function, Direction::Backward)
        .edges()
        .collect();
    let second: Vec<Edge> = IndexedGraph::build(&function, Direction::Backward)
        .edges()
        .collect();
    assert_eq!(first, second);
}

#[test]
fn test_dangling_branch_is_skipped() {
    let function = dangling_branch();
    let graph = IndexedGraph::build(&function, Direction::Forward);

    assert_eq!(graph.outgoing(0), &[Node::Inst(1)]);
    assert!(graph.outgoing(1).is_empty());
}

#[test]
fn test_edges_serialize_with_named_boundaries() {
    let edge = Edge::new(Node::Entry, Node::Inst(3));
    assert_eq!(edge.to_string(), "entry->3");

    let json = serde_json::to_string(&edge).unwrap();
    assert_eq!(json, r#"{"src":"entry","dst":"3"}"#);
    let back: Edge = serde_json::from_str(&json).unwrap();
    assert_eq!(back, edge);
}

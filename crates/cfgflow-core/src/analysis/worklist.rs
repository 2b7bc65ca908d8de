use super::flow::{FlowContext, FlowFunction};
use super::graph::{Direction, Edge, IndexedGraph, Node};
use super::lattice::Lattice;
use super::result::AnalysisResult;
use super::store::EdgeFactStore;
use crate::function::Function;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SolveStats {
    /// Instructions pulled off the worklist.
    pub iterations: usize,
    /// Edge facts that changed.
    pub updates: usize,
}

impl SolveStats {
    fn absorb(&mut self, other: SolveStats) {
        self.iterations += other.iterations;
        self.updates += other.updates;
    }
}

/// FIFO of instruction indices; an index already pending is not queued twice.
struct Worklist {
    queue: VecDeque<usize>,
    pending: Vec<bool>,
}

impl Worklist {
    fn new(len: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(len),
            pending: vec![false; len],
        }
    }

    fn push(&mut self, index: usize) {
        match self.pending.get_mut(index) {
            Some(flag) if !*flag => {
                *flag = true;
                self.queue.push_back(index);
            }
            _ => {}
        }
    }

    fn pop(&mut self) -> Option<usize> {
        let index = self.queue.pop_front()?;
        self.pending[index] = false;
        Some(index)
    }
}

/// Fixpoint driver shared by every analysis.
///
/// The engine never inspects facts beyond `join` and equality, and never inspects instructions at
/// all; both are the flow function's business. Runs are single threaded and own their store.
pub struct DataflowEngine<'f, A: FlowFunction> {
    analysis: A,
    graph: IndexedGraph<'f>,
    store: EdgeFactStore<A::Fact>,
    stats: SolveStats,
}

impl<'f, A: FlowFunction> DataflowEngine<'f, A> {
    pub fn new(analysis: A, function: &'f Function) -> Self {
        let graph = IndexedGraph::build(function, analysis.direction());
        let mut store = EdgeFactStore::new();

        let initial = analysis.initial();
        for &index in graph.boundary() {
            store.set(Edge::new(Node::Entry, Node::Inst(index)), initial.clone());
        }

        Self {
            analysis,
            graph,
            store,
            stats: SolveStats::default(),
        }
    }

    /// Iterates until no edge fact changes and returns the work done by this call.
    pub fn solve(&mut self) -> SolveStats {
        let len = self.graph.len();
        let mut worklist = Worklist::new(len);
        match self.graph.direction() {
            Direction::Forward => (0..len).for_each(|index| worklist.push(index)),
            Direction::Backward => (0..len).rev().for_each(|index| worklist.push(index)),
        }

        let mut stats = SolveStats::default();
        while let Some(index) = worklist.pop() {
            stats.iterations += 1;

            let Some(instruction) = self.graph.instruction(index) else {
                continue;
            };
            let incoming = self.graph.incoming(index);
            let outgoing = self.graph.outgoing(index);

            let merged = A::Fact::join_all(
                incoming
                    .iter()
                    .map(|&src| self.store.get(&Edge::new(src, Node::Inst(index)))),
            );

            let ctx = FlowContext {
                graph: &self.graph,
                index,
                instruction,
                incoming,
                outgoing,
            };
            let result = self.analysis.flow(&ctx, merged);

            for (position, &dst) in outgoing.iter().enumerate() {
                let Some(fact) = result.fact_for(position) else {
                    continue;
                };
                let edge = Edge::new(Node::Inst(index), dst);
                if self.store.update(edge, fact) {
                    stats.updates += 1;
                    trace!(analysis = self.analysis.name(), %edge, ?fact, "edge fact changed");
                    if let Node::Inst(next) = dst {
                        worklist.push(next);
                    }
                }
            }
        }

        debug!(
            analysis = self.analysis.name(),
            function = %self.graph.function().name,
            instructions = len,
            edges = self.graph.edge_count(),
            iterations = stats.iterations,
            updates = stats.updates,
            "fixpoint reached"
        );

        self.stats.absorb(stats);
        stats
    }

    /// Join of the facts on the instruction's outgoing edges.
    pub fn fact_at(&self, index: usize) -> A::Fact {
        A::Fact::join_all(
            self.graph
                .outgoing(index)
                .iter()
                .map(|&dst| self.store.get(&Edge::new(Node::Inst(index), dst))),
        )
    }

    pub fn analysis(&self) -> &A {
        &self.analysis
    }

    pub fn graph(&self) -> &IndexedGraph<'f> {
        &self.graph
    }

    pub fn store(&self) -> &EdgeFactStore<A::Fact> {
        &self.store
    }

    /// Work done across every `solve` call so far.
    pub fn stats(&self) -> SolveStats {
        self.stats
    }

    pub fn into_result(self) -> AnalysisResult<A::Fact> {
        let facts = (0..self.graph.len()).map(|index| self.fact_at(index)).collect();
        AnalysisResult::snapshot(
            self.analysis.name(),
            &self.graph,
            &self.store,
            facts,
            self.stats,
        )
    }
}

/// Builds the graph, solves to a fixpoint and snapshots the result.
pub fn run<A: FlowFunction>(analysis: A, function: &Function) -> AnalysisResult<A::Fact> {
    let mut engine = DataflowEngine::new(analysis, function);
    engine.solve();
    engine.into_result()
}

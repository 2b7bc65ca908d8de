use super::cfg::ControlFlowGraph;
use crate::block::{BasicBlock, BlockId};
use crate::function::Function;
use crate::instructions::Instruction;
use crate::values::InstId;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
}

/// Endpoint of an edge: an indexed instruction or one of the two virtual boundary nodes.
///
/// `Entry` feeds the boundary instructions of the chosen direction and `Exit` drains the
/// instructions that have nowhere else to go, so every instruction owns at least one outgoing
/// edge to carry its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Node {
    Entry,
    Inst(usize),
    Exit,
}

impl Node {
    pub fn index(&self) -> Option<usize> {
        match self {
            Node::Inst(index) => Some(*index),
            _ => None,
        }
    }

    fn mirrored(self) -> Self {
        match self {
            Node::Entry => Node::Exit,
            Node::Exit => Node::Entry,
            inst => inst,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Entry => write!(f, "entry"),
            Node::Inst(index) => write!(f, "{}", index),
            Node::Exit => write!(f, "exit"),
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "entry" => Ok(Node::Entry),
            "exit" => Ok(Node::Exit),
            other => other
                .parse()
                .map(Node::Inst)
                .map_err(|_| de::Error::custom(format!("invalid node '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub src: Node,
    pub dst: Node,
}

impl Edge {
    pub fn new(src: Node, dst: Node) -> Self {
        Self { src, dst }
    }

    pub fn is_boundary(&self) -> bool {
        self.src == Node::Entry
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.src, self.dst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstLocation {
    pub block: BlockId,
    pub position: usize,
}

/// Dense instruction numbering plus edge adjacency for one direction.
///
/// Indices follow block order, then program order. Incoming and outgoing lists are expressed in
/// the analysis direction: for a backward graph the outgoing edges of an instruction lead to its
/// control-flow predecessors.
#[derive(Debug, Clone)]
pub struct IndexedGraph<'f> {
    function: &'f Function,
    direction: Direction,
    instructions: Vec<&'f Instruction>,
    locations: Vec<InstLocation>,
    index_of: HashMap<InstId, usize>,
    block_starts: HashMap<BlockId, usize>,
    incoming: Vec<Vec<Node>>,
    outgoing: Vec<Vec<Node>>,
    boundary: Vec<usize>,
}

impl<'f> IndexedGraph<'f> {
    pub fn build(function: &'f Function, direction: Direction) -> Self {
        let mut instructions = Vec::with_capacity(function.instruction_count());
        let mut locations = Vec::with_capacity(function.instruction_count());
        let mut index_of = HashMap::new();
        let mut block_starts = HashMap::new();

        for (block_id, block) in &function.blocks {
            if !block.instructions.is_empty() {
                block_starts.insert(*block_id, instructions.len());
            }
            for (position, inst) in block.instructions.iter().enumerate() {
                index_of.entry(inst.id).or_insert(instructions.len());
                instructions.push(inst);
                locations.push(InstLocation {
                    block: *block_id,
                    position,
                });
            }
        }

        let mut graph = Self {
            function,
            direction,
            incoming: vec![Vec::new(); instructions.len()],
            outgoing: vec![Vec::new(); instructions.len()],
            instructions,
            locations,
            index_of,
            block_starts,
            boundary: Vec::new(),
        };

        for (src, dst) in graph.control_flow_edges() {
            let (src, dst) = match direction {
                Direction::Forward => (src, dst),
                Direction::Backward => (dst.mirrored(), src.mirrored()),
            };
            graph.link(src, dst);
        }

        graph
    }

    /// Edges in execution order, independent of the analysis direction.
    fn control_flow_edges(&self) -> Vec<(Node, Node)> {
        let cfg = ControlFlowGraph::from_function(self.function);
        let mut edges = Vec::new();

        match self.first_index_of(self.function.entry) {
            Some(first) => edges.push((Node::Entry, Node::Inst(first))),
            None => warn!(
                function = %self.function.name,
                "entry block is missing or empty, no boundary edge"
            ),
        }

        for (block_id, block) in &self.function.blocks {
            let Some(start) = self.first_index_of(*block_id) else {
                continue;
            };
            let last = start + block.instructions.len() - 1;

            for index in start..last {
                edges.push((Node::Inst(index), Node::Inst(index + 1)));
            }

            let successors = cfg.successors(*block_id);
            if successors.is_empty() {
                edges.push((Node::Inst(last), Node::Exit));
                continue;
            }

            for &succ in successors {
                match self.first_index_of(succ) {
                    Some(target) => edges.push((Node::Inst(last), Node::Inst(target))),
                    None => warn!(
                        function = %self.function.name,
                        from = %block.label,
                        target = %succ,
                        "branch into a missing or empty block ignored"
                    ),
                }
            }
        }

        edges
    }

    fn first_index_of(&self, block: BlockId) -> Option<usize> {
        self.block_starts.get(&block).copied()
    }

    fn link(&mut self, src: Node, dst: Node) {
        if let Node::Inst(s) = src {
            if !self.outgoing[s].contains(&dst) {
                self.outgoing[s].push(dst);
            }
        }
        if let Node::Inst(d) = dst {
            if !self.incoming[d].contains(&src) {
                self.incoming[d].push(src);
            }
            if src == Node::Entry && !self.boundary.contains(&d) {
                self.boundary.push(d);
            }
        }
    }

    pub fn function(&self) -> &'f Function {
        self.function
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instruction(&self, index: usize) -> Option<&'f Instruction> {
        self.instructions.get(index).copied()
    }

    pub fn index_of(&self, id: InstId) -> Option<usize> {
        self.index_of.get(&id).copied()
    }

    pub fn location(&self, index: usize) -> Option<InstLocation> {
        self.locations.get(index).copied()
    }

    pub fn block_of(&self, index: usize) -> Option<&'f BasicBlock> {
        let function = self.function;
        self.location(index)
            .and_then(|loc| function.get_block(loc.block))
    }

    pub fn incoming(&self, index: usize) -> &[Node] {
        self.incoming.get(index).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn outgoing(&self, index: usize) -> &[Node] {
        self.outgoing.get(index).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Instructions fed directly by `Node::Entry`.
    pub fn boundary(&self) -> &[usize] {
        &self.boundary
    }

    /// Every edge, boundary edges first, then by source index.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        let boundary = self
            .boundary
            .iter()
            .map(|&index| Edge::new(Node::Entry, Node::Inst(index)));
        let inner = self.outgoing.iter().enumerate().flat_map(|(index, dsts)| {
            dsts.iter()
                .map(move |&dst| Edge::new(Node::Inst(index), dst))
        });
        boundary.chain(inner)
    }

    pub fn edge_count(&self) -> usize {
        self.boundary.len() + self.outgoing.iter().map(Vec::len).sum::<usize>()
    }
}

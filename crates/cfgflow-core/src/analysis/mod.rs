/*! Fixpoint dataflow over instruction-level control flow.
 *
 * Every analysis here runs on the same machinery: [`IndexedGraph`] numbers the instructions of a
 * function and links them in the analysis direction, [`EdgeFactStore`] holds one lattice fact per
 * edge, and [`DataflowEngine`] iterates a [`FlowFunction`] until no edge changes. Reaching
 * definitions, liveness and may-point-to only supply the transfer rules.
 */

pub mod cfg;
pub mod flow;
pub mod graph;
pub mod lattice;
pub mod liveness;
pub mod pass;
pub mod points_to;
pub mod reaching;
pub mod result;
pub mod store;
pub mod worklist;

pub use cfg::ControlFlowGraph;
pub use flow::{FlowContext, FlowFunction, Outgoing};
pub use graph::{Direction, Edge, IndexedGraph, InstLocation, Node};
pub use lattice::{Cell, CellKind, InstSet, Lattice, PointsToFact};
pub use liveness::{LiveCategory, Liveness};
pub use pass::{AnalysisKind, AnalysisOutput, AnalysisPass, DataflowPass, PassManager, PassStatistics};
pub use points_to::{MayPointTo, PointerCategory};
pub use reaching::{DefCategory, ReachingDefinitions};
pub use result::{AnalysisResult, EdgeFact, IndexedInstruction};
pub use store::EdgeFactStore;
pub use worklist::{run, DataflowEngine, SolveStats};

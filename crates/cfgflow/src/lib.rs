/*! Unified interface for CFG dataflow analysis.
 *
 * Single import for the IR model, the fixpoint engine and its analyses, the textual IR parser and
 * the report emitters.
 */

pub use cfgflow_core as core;
pub use cfgflow_emit as emit;
pub use cfgflow_parser as parser;

pub use cfgflow_core::{
    analysis::{
        run, AnalysisKind, AnalysisResult, DataflowEngine, Direction, FlowFunction, InstSet,
        Lattice, Liveness, MayPointTo, PassManager, PointsToFact, ReachingDefinitions,
    },
    block::{BasicBlock, BlockId},
    builder::FunctionBuilder,
    function::{Function, Module},
    instructions::{Instruction, Opcode},
    types::Type,
    values::{InstId, Operand},
};

pub use cfgflow_emit::{FactReport, ReportConfig};

pub use cfgflow_parser::{parse_file, parse_module};

/*! Control-flow graph model and fixpoint dataflow engine.
 *
 * Compiler analyses keep reimplementing the same worklist loop. This crate provides one generic,
 * direction-agnostic engine over per-edge facts, the small IR it runs on, and three analyses built
 * on it: reaching definitions, liveness and may-point-to.
 */

pub mod analysis;
pub mod block;
pub mod builder;
pub mod format;
pub mod function;
pub mod instructions;
pub mod stats;
pub mod types;
pub mod values;

pub use block::{BasicBlock, BlockId};
pub use builder::FunctionBuilder;
pub use function::{Function, Module, Parameter};
pub use instructions::{Instruction, Opcode};
pub use types::Type;
pub use values::{InstId, Operand};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IrError {
    #[error("Invalid instruction: {0}")]
    InvalidInstruction(String),
    #[error("Builder error: {0}")]
    BuilderError(String),
    #[error("Function not found: {0}")]
    FunctionNotFound(String),
}

pub type Result<T> = std::result::Result<T, IrError>;

#[cfg(test)]
mod tests;

/*! Build functions programmatically.
 *
 * Tests and embedders need CFGs without going through the text format. The builder hands out
 * instruction ids in append order and validates block structure when the function is finished.
 */

pub mod function_builder;

pub use function_builder::FunctionBuilder;

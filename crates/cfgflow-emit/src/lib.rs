/*! Present dataflow results.
 *
 * Facts are only useful once someone can read them next to the code they describe. The emitters
 * here print converged facts per instruction or per edge, as plain or coloured text for people
 * and as JSON for tools.
 */

pub mod config;
pub mod emitter;
pub mod output;
pub mod report;

pub use config::ReportConfig;
pub use emitter::{EmitContext, EmitHelper, EmitResult, Emitter};
pub use output::{JsonFormatter, OutputFormat};
pub use report::{CountsReport, FactReport, OutputReport};

use crate::config::ReportConfig;
use crate::emitter::{EmitContext, EmitHelper, EmitResult, Emitter};
use crate::output::{JsonFormatter, OutputFormat};
use cfgflow_core::analysis::{AnalysisOutput, AnalysisResult, Direction};
use cfgflow_core::stats::InstructionCounts;
use serde::Serialize;
use std::fmt::Display;
use std::io::Write;
use std::marker::PhantomData;

fn direction_name(direction: Direction) -> &'static str {
    match direction {
        Direction::Forward => "forward",
        Direction::Backward => "backward",
    }
}

/// Converged facts of one function, per instruction or per edge.
pub struct FactReport<F> {
    config: ReportConfig,
    _fact: PhantomData<F>,
}

impl<F> FactReport<F> {
    pub fn new(config: ReportConfig) -> Self {
        Self {
            config,
            _fact: PhantomData,
        }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }
}

impl<F: Display + Serialize> FactReport<F> {
    fn emit_text<W: Write>(
        &self,
        result: &AnalysisResult<F>,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult {
        EmitHelper::write_section(
            writer,
            context,
            &format!("{} @{}", result.analysis, result.function),
        )?;

        if self.config.show_edges {
            for entry in &result.edges {
                EmitHelper::write_line(
                    writer,
                    context,
                    format!("Edge {}: {}", entry.edge, entry.fact).trim_end(),
                )?;
            }
        } else {
            for (index, fact) in result.facts.iter().enumerate() {
                let inst = result.instructions.get(index);
                let index = EmitHelper::paint(context, &index.to_string(), "bright_blue");
                let mut line = format!("{}: {}", index, fact).trim_end().to_string();
                if self.config.annotate {
                    if let Some(inst) = inst {
                        let note = format!("; {}", inst.text);
                        line.push_str("    ");
                        line.push_str(&EmitHelper::paint(context, &note, "bright_black"));
                    }
                }
                EmitHelper::write_line(writer, context, &line)?;
            }
        }

        if self.config.show_stats {
            EmitHelper::write_comment(
                writer,
                context,
                &format!(
                    "{}, {} iterations, {} updates",
                    direction_name(result.direction),
                    result.stats.iterations,
                    result.stats.updates
                ),
            )?;
        }
        Ok(())
    }
}

impl<F: Display + Serialize> Emitter for FactReport<F> {
    type Item = AnalysisResult<F>;

    fn emit<W: Write>(
        &self,
        item: &Self::Item,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult {
        match self.config.format {
            OutputFormat::Text => self.emit_text(item, writer, context),
            OutputFormat::Json => JsonFormatter::format_object(writer, item),
        }
    }

    fn context(&self) -> EmitContext {
        EmitContext::with_colors(self.config.use_colors)
    }
}

/// Static instruction counts of one function.
pub struct CountsReport {
    config: ReportConfig,
}

impl CountsReport {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    pub fn emit_named<W: Write>(
        &self,
        function: &str,
        counts: &InstructionCounts,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult {
        if self.config.format == OutputFormat::Text {
            EmitHelper::write_section(writer, context, &format!("count @{}", function))?;
        }
        self.emit(counts, writer, context)
    }
}

impl Emitter for CountsReport {
    type Item = InstructionCounts;

    fn emit<W: Write>(
        &self,
        item: &Self::Item,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult {
        match self.config.format {
            OutputFormat::Text => {
                for (mnemonic, count) in item.iter() {
                    EmitHelper::write_line(writer, context, &format!("{}\t{}", mnemonic, count))?;
                }
                if self.config.show_stats {
                    EmitHelper::write_comment(
                        writer,
                        context,
                        &format!("{} instructions", item.total()),
                    )?;
                }
                Ok(())
            }
            OutputFormat::Json => JsonFormatter::format_object(writer, item),
        }
    }

    fn context(&self) -> EmitContext {
        EmitContext::with_colors(self.config.use_colors)
    }
}

/// Dispatches a runtime-selected analysis output to the matching report.
pub struct OutputReport {
    config: ReportConfig,
}

impl OutputReport {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }
}

impl Emitter for OutputReport {
    type Item = AnalysisOutput;

    fn emit<W: Write>(
        &self,
        item: &Self::Item,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult {
        let config = self.config.clone();
        match item {
            AnalysisOutput::Reaching(result) | AnalysisOutput::Liveness(result) => {
                FactReport::new(config).emit(result, writer, context)
            }
            AnalysisOutput::MayPointTo(result) => {
                FactReport::new(config).emit(result, writer, context)
            }
            AnalysisOutput::Counts(counts) => CountsReport::new(config).emit(counts, writer, context),
        }
    }

    fn context(&self) -> EmitContext {
        EmitContext::with_colors(self.config.use_colors)
    }
}

use anyhow::{bail, Context, Result};
use cfgflow_core::analysis::{AnalysisKind, AnalysisOutput, AnalysisPass, PassManager};
use cfgflow_core::format::format_function;
use cfgflow_core::stats::StaticCountPass;
use cfgflow_core::{Function, Module};
use cfgflow_emit::{
    CountsReport, EmitContext, EmitHelper, Emitter, JsonFormatter, OutputFormat, OutputReport,
    ReportConfig,
};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "cfgflow")]
#[command(about = "Fixpoint dataflow analyses over LLVM-style textual IR")]
#[command(version = "0.1.0")]
struct Cli {
    /// Raise the log level (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a dataflow analysis and print the converged facts
    Analyze {
        /// A `.ll` file, or a directory searched recursively for them
        input: PathBuf,

        #[arg(short, long, value_enum)]
        analysis: AnalysisArg,

        #[arg(short, long)]
        function: Option<String>,

        /// Print facts per edge instead of per instruction
        #[arg(long)]
        edges: bool,

        #[arg(long, conflicts_with = "edges")]
        annotate: bool,

        #[arg(long)]
        json: bool,

        #[arg(long)]
        stats: bool,

        #[arg(long)]
        no_color: bool,
    },

    /// Count instructions by opcode
    Count {
        input: PathBuf,

        #[arg(short, long)]
        function: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Check that every function parses and builds
    Validate { input: PathBuf },

    /// Print the indexed instruction listing
    Dump {
        input: PathBuf,

        #[arg(short, long)]
        function: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AnalysisArg {
    Reaching,
    Liveness,
    MayPointTo,
}

impl From<AnalysisArg> for AnalysisKind {
    fn from(arg: AnalysisArg) -> Self {
        match arg {
            AnalysisArg::Reaching => AnalysisKind::ReachingDefinitions,
            AnalysisArg::Liveness => AnalysisKind::Liveness,
            AnalysisArg::MayPointTo => AnalysisKind::MayPointTo,
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Analyze {
            input,
            analysis,
            function,
            edges,
            annotate,
            json,
            stats,
            no_color,
        } => {
            let config = ReportConfig {
                format: if json {
                    OutputFormat::Json
                } else {
                    OutputFormat::Text
                },
                show_edges: edges,
                annotate,
                show_stats: stats,
                use_colors: !json && !no_color && std::io::stdout().is_terminal(),
            };
            cmd_analyze(input, analysis.into(), function, config)
        }
        Commands::Count {
            input,
            function,
            json,
        } => cmd_count(input, function, json),
        Commands::Validate { input } => cmd_validate(input),
        Commands::Dump { input, function } => cmd_dump(input, function),
    }
}

/// `input` itself, or every `*.ll` file beneath it in path order.
fn collect_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    if !input.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", input.display()))?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "ll") {
            files.push(path.to_path_buf());
        }
    }
    debug!(dir = %input.display(), files = files.len(), "collected inputs");
    Ok(files)
}

fn load_modules(input: &Path) -> Result<Vec<(PathBuf, Module)>> {
    let mut modules = Vec::new();
    for path in collect_inputs(input)? {
        let module = cfgflow_parser::parse_file(&path)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!(file = %path.display(), functions = module.functions.len(), "loaded module");
        modules.push((path, module));
    }
    Ok(modules)
}

/// Functions selected by `--function`, failing when a filter matches nothing.
fn selected<'m>(
    modules: &'m [(PathBuf, Module)],
    filter: Option<&str>,
) -> Result<Vec<(&'m Path, &'m Function)>> {
    let functions: Vec<_> = modules
        .iter()
        .flat_map(|(path, module)| {
            module
                .functions
                .values()
                .map(move |function| (path.as_path(), function))
        })
        .filter(|(_, function)| filter.map_or(true, |name| function.name == name))
        .collect();

    if let Some(name) = filter {
        if functions.is_empty() {
            bail!("No function named @{}", name);
        }
    }
    Ok(functions)
}

fn cmd_analyze(
    input: PathBuf,
    kind: AnalysisKind,
    function: Option<String>,
    config: ReportConfig,
) -> Result<()> {
    let modules = load_modules(&input)?;
    let functions = selected(&modules, function.as_deref())?;
    let report = OutputReport::new(config.clone());
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut context = EmitContext::with_colors(config.use_colors);

    // Results are cached by function name, so each file gets its own manager.
    let mut outputs: Vec<AnalysisOutput> = Vec::new();
    let mut statistics = Vec::new();
    let mut current: Option<&Path> = None;
    let mut manager = PassManager::new();
    for (path, function) in functions {
        if current != Some(path) {
            statistics.extend_from_slice(manager.statistics());
            manager = PassManager::new();
            if config.show_stats {
                manager.enable_statistics();
            }
            current = Some(path);
        }
        outputs.push(manager.run_kind(kind, function)?);
    }
    statistics.extend_from_slice(manager.statistics());

    match config.format {
        OutputFormat::Json => JsonFormatter::format_object(&mut out, &outputs)?,
        OutputFormat::Text => {
            for (i, output) in outputs.iter().enumerate() {
                if i > 0 {
                    writeln!(out)?;
                }
                report.emit(output, &mut out, &mut context)?;
            }
        }
    }

    if config.show_stats && config.format == OutputFormat::Text {
        writeln!(out)?;
        EmitHelper::write_colored_line(
            &mut out,
            &context,
            &format!("{} statistics", kind),
            "cyan",
        )?;
        context.indent();
        for stat in &statistics {
            EmitHelper::write_line(
                &mut out,
                &context,
                &format!(
                    "@{}: {} iterations, {} updates, {:?}",
                    stat.function, stat.iterations, stat.updates, stat.duration
                ),
            )?;
        }
        context.dedent();
    }

    Ok(())
}

fn cmd_count(input: PathBuf, function: Option<String>, json: bool) -> Result<()> {
    let modules = load_modules(&input)?;
    selected(&modules, function.as_deref())?;
    let wanted = |name: &str| function.as_deref().map_or(true, |f| f == name);
    let config = ReportConfig {
        format: if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        },
        use_colors: !json && std::io::stdout().is_terminal(),
        ..ReportConfig::default()
    };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if json {
        let mut counts = serde_json::Map::new();
        for (_, module) in &modules {
            for (name, result) in StaticCountPass.analyze_module(module)? {
                if wanted(&name) {
                    counts.insert(name, serde_json::to_value(result)?);
                }
            }
        }
        return JsonFormatter::format_object(&mut out, &counts);
    }

    let report = CountsReport::new(config.clone());
    let mut context = EmitContext::with_colors(config.use_colors);
    let mut first = true;
    for (_, module) in &modules {
        let mut manager = PassManager::new();
        for (name, counts) in manager.get_module_analysis(&mut StaticCountPass, module)? {
            if !wanted(&name) {
                continue;
            }
            if !first {
                writeln!(out)?;
            }
            first = false;
            report.emit_named(&name, &counts, &mut out, &mut context)?;
        }
    }
    Ok(())
}

fn cmd_validate(input: PathBuf) -> Result<()> {
    use colored::*;

    let mut failures = 0;
    for path in collect_inputs(&input)? {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        match cfgflow_parser::parse_module(&content) {
            Ok(module) => {
                println!(
                    "{} {} ({} functions)",
                    "VALID".bright_green().bold(),
                    path.display(),
                    module.functions.len()
                );
            }
            Err(e) => {
                failures += 1;
                println!("{} {}", "INVALID".bright_red().bold(), path.display());
                println!("{}", e);
            }
        }
    }

    if failures > 0 {
        bail!("Validation failed for {} file(s)", failures);
    }
    Ok(())
}

fn cmd_dump(input: PathBuf, function: Option<String>) -> Result<()> {
    let modules = load_modules(&input)?;
    let functions = selected(&modules, function.as_deref())?;

    for (i, (_, function)) in functions.into_iter().enumerate() {
        if i > 0 {
            println!();
        }
        print!("{}", format_function(function));
    }
    Ok(())
}

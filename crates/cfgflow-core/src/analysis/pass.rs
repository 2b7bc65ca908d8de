use super::flow::FlowFunction;
use super::lattice::{InstSet, PointsToFact};
use super::liveness::Liveness;
use super::points_to::MayPointTo;
use super::reaching::ReachingDefinitions;
use super::result::AnalysisResult;
use super::worklist::{self, SolveStats};
use crate::function::{Function, Module};
use crate::stats::{InstructionCounts, StaticCountPass};
use anyhow::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisKind {
    ReachingDefinitions,
    Liveness,
    MayPointTo,
    StaticCounts,
}

impl AnalysisKind {
    /// The fixpoint analyses, in the order the CLI lists them.
    pub const DATAFLOW: [AnalysisKind; 3] = [
        AnalysisKind::ReachingDefinitions,
        AnalysisKind::Liveness,
        AnalysisKind::MayPointTo,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AnalysisKind::ReachingDefinitions => "reaching",
            AnalysisKind::Liveness => "liveness",
            AnalysisKind::MayPointTo => "may-point-to",
            AnalysisKind::StaticCounts => "count",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "reaching" | "reaching-definitions" => Some(AnalysisKind::ReachingDefinitions),
            "liveness" => Some(AnalysisKind::Liveness),
            "may-point-to" | "points-to" => Some(AnalysisKind::MayPointTo),
            "count" | "static-counts" => Some(AnalysisKind::StaticCounts),
            _ => None,
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A read-only analysis over one function at a time.
pub trait AnalysisPass {
    type Output: Clone + Any + Send + Sync;

    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str {
        "No description provided"
    }

    fn kind(&self) -> AnalysisKind;

    fn analyze(&mut self, function: &Function) -> Result<Self::Output>;

    fn analyze_module(&mut self, module: &Module) -> Result<IndexMap<String, Self::Output>> {
        let mut results = IndexMap::new();
        for (name, function) in &module.functions {
            results.insert(name.clone(), self.analyze(function)?);
        }
        Ok(results)
    }

    /// Fixpoint work behind `output`, for passes that run the engine.
    fn solve_stats(&self, _output: &Self::Output) -> SolveStats {
        SolveStats::default()
    }
}

/// Runs a flow function through the worklist engine.
#[derive(Debug, Clone)]
pub struct DataflowPass<A> {
    analysis: A,
    kind: AnalysisKind,
}

impl<A> DataflowPass<A> {
    pub fn new(analysis: A, kind: AnalysisKind) -> Self {
        Self { analysis, kind }
    }
}

impl DataflowPass<ReachingDefinitions> {
    pub fn reaching() -> Self {
        Self::new(ReachingDefinitions, AnalysisKind::ReachingDefinitions)
    }
}

impl DataflowPass<Liveness> {
    pub fn liveness() -> Self {
        Self::new(Liveness, AnalysisKind::Liveness)
    }
}

impl DataflowPass<MayPointTo> {
    pub fn may_point_to() -> Self {
        Self::new(MayPointTo, AnalysisKind::MayPointTo)
    }
}

impl<A> AnalysisPass for DataflowPass<A>
where
    A: FlowFunction + Clone,
    A::Fact: Send + Sync + 'static,
{
    type Output = AnalysisResult<A::Fact>;

    fn name(&self) -> &'static str {
        self.analysis.name()
    }

    fn description(&self) -> &'static str {
        match self.kind {
            AnalysisKind::ReachingDefinitions => "Forward may-reach definitions, union only",
            AnalysisKind::Liveness => "Backward live instruction results",
            AnalysisKind::MayPointTo => "Forward may-point-to over register and memory cells",
            AnalysisKind::StaticCounts => "Dataflow pass",
        }
    }

    fn kind(&self) -> AnalysisKind {
        self.kind
    }

    fn analyze(&mut self, function: &Function) -> Result<Self::Output> {
        Ok(worklist::run(self.analysis.clone(), function))
    }

    fn solve_stats(&self, output: &Self::Output) -> SolveStats {
        output.stats
    }
}

/// Result of running an analysis chosen at runtime.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AnalysisOutput {
    Reaching(AnalysisResult<InstSet>),
    Liveness(AnalysisResult<InstSet>),
    MayPointTo(AnalysisResult<PointsToFact>),
    Counts(InstructionCounts),
}

impl AnalysisOutput {
    pub fn kind(&self) -> AnalysisKind {
        match self {
            AnalysisOutput::Reaching(_) => AnalysisKind::ReachingDefinitions,
            AnalysisOutput::Liveness(_) => AnalysisKind::Liveness,
            AnalysisOutput::MayPointTo(_) => AnalysisKind::MayPointTo,
            AnalysisOutput::Counts(_) => AnalysisKind::StaticCounts,
        }
    }

    pub fn stats(&self) -> SolveStats {
        match self {
            AnalysisOutput::Reaching(result) | AnalysisOutput::Liveness(result) => result.stats,
            AnalysisOutput::MayPointTo(result) => result.stats,
            AnalysisOutput::Counts(_) => SolveStats::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PassStatistics {
    pub name: String,
    pub function: String,
    pub duration: Duration,
    pub iterations: usize,
    pub updates: usize,
}

/// Runs passes over functions and caches their results per `(kind, function)`.
///
/// Functions are never modified by an analysis, so cached results stay valid until the caller
/// invalidates them after changing a function.
pub struct PassManager {
    analysis_cache: HashMap<(AnalysisKind, String), Box<dyn Any + Send + Sync>>,
    statistics: Vec<PassStatistics>,
    collect_stats: bool,
}

impl PassManager {
    pub fn new() -> Self {
        Self {
            analysis_cache: HashMap::new(),
            statistics: Vec::new(),
            collect_stats: false,
        }
    }

    pub fn enable_statistics(&mut self) {
        self.collect_stats = true;
    }

    pub fn get_analysis<P: AnalysisPass>(
        &mut self,
        pass: &mut P,
        function: &Function,
    ) -> Result<P::Output> {
        let key = (pass.kind(), function.name.clone());

        if let Some(cached) = self
            .analysis_cache
            .get(&key)
            .and_then(|boxed| boxed.downcast_ref::<P::Output>())
        {
            debug!(pass = pass.name(), function = %function.name, "analysis cache hit");
            return Ok(cached.clone());
        }

        let start = self.collect_stats.then(Instant::now);
        let output = pass.analyze(function)?;

        if let Some(start) = start {
            let stats = pass.solve_stats(&output);
            self.statistics.push(PassStatistics {
                name: pass.name().to_string(),
                function: function.name.clone(),
                duration: start.elapsed(),
                iterations: stats.iterations,
                updates: stats.updates,
            });
        }

        self.analysis_cache.insert(key, Box::new(output.clone()));
        Ok(output)
    }

    pub fn get_module_analysis<P: AnalysisPass>(
        &mut self,
        pass: &mut P,
        module: &Module,
    ) -> Result<IndexMap<String, P::Output>> {
        let mut results = IndexMap::new();
        for (name, function) in &module.functions {
            results.insert(name.clone(), self.get_analysis(pass, function)?);
        }
        Ok(results)
    }

    pub fn run_kind(&mut self, kind: AnalysisKind, function: &Function) -> Result<AnalysisOutput> {
        Ok(match kind {
            AnalysisKind::ReachingDefinitions => AnalysisOutput::Reaching(
                self.get_analysis(&mut DataflowPass::reaching(), function)?,
            ),
            AnalysisKind::Liveness => AnalysisOutput::Liveness(
                self.get_analysis(&mut DataflowPass::liveness(), function)?,
            ),
            AnalysisKind::MayPointTo => AnalysisOutput::MayPointTo(
                self.get_analysis(&mut DataflowPass::may_point_to(), function)?,
            ),
            AnalysisKind::StaticCounts => {
                AnalysisOutput::Counts(self.get_analysis(&mut StaticCountPass, function)?)
            }
        })
    }

    pub fn is_cached(&self, kind: AnalysisKind, function_name: &str) -> bool {
        self.analysis_cache
            .contains_key(&(kind, function_name.to_string()))
    }

    pub fn invalidate(&mut self, function_name: &str) {
        self.analysis_cache
            .retain(|(_, name), _| name != function_name);
    }

    pub fn statistics(&self) -> &[PassStatistics] {
        &self.statistics
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{builder::FunctionBuilder, types::Type};

    fn straight_line() -> Function {
        let mut func = FunctionBuilder::new("f", Type::i32());
        let a = func.param("a", Type::i32());
        func.create_block("entry");
        let x = func.add(Type::i32(), a.clone(), a);
        func.ret(Some(x));
        func.build().unwrap()
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in AnalysisKind::DATAFLOW {
            assert_eq!(AnalysisKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(AnalysisKind::from_name("dominators"), None);
    }

    #[test]
    fn test_analysis_caching() {
        let function = straight_line();
        let mut manager = PassManager::new();
        manager.enable_statistics();

        let first = manager
            .run_kind(AnalysisKind::ReachingDefinitions, &function)
            .unwrap();
        assert!(manager.is_cached(AnalysisKind::ReachingDefinitions, "f"));

        let second = manager
            .run_kind(AnalysisKind::ReachingDefinitions, &function)
            .unwrap();
        assert_eq!(first.stats(), second.stats());
        assert_eq!(manager.statistics().len(), 1);

        manager.invalidate("f");
        assert!(!manager.is_cached(AnalysisKind::ReachingDefinitions, "f"));
    }

    #[test]
    fn test_statistics_record_solver_work() {
        let function = straight_line();
        let mut manager = PassManager::new();
        manager.enable_statistics();

        manager.run_kind(AnalysisKind::Liveness, &function).unwrap();
        let stats = &manager.statistics()[0];
        assert_eq!(stats.name, "liveness");
        assert_eq!(stats.function, "f");
        assert!(stats.iterations >= 2);
    }
}

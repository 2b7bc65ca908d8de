use crate::output::OutputFormat;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub format: OutputFormat,
    /// Print one line per edge instead of one per instruction.
    pub show_edges: bool,
    /// Append the instruction text to each per-instruction line.
    pub annotate: bool,
    pub show_stats: bool,
    pub use_colors: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            show_edges: false,
            annotate: false,
            show_stats: false,
            use_colors: true,
        }
    }
}

impl ReportConfig {
    pub fn plain() -> Self {
        Self {
            use_colors: false,
            ..Self::default()
        }
    }

    pub fn json() -> Self {
        Self {
            format: OutputFormat::Json,
            use_colors: false,
            ..Self::default()
        }
    }
}

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub struct JsonFormatter;

impl JsonFormatter {
    pub fn format_object<W: Write, T: Serialize + ?Sized>(writer: &mut W, obj: &T) -> Result<()> {
        serde_json::to_writer_pretty(&mut *writer, obj)?;
        writeln!(writer)?;
        Ok(())
    }
}

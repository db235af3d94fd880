use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use crate::diagnostics::DiagnosticReport;
use crate::elements::ElementDescription;
use crate::error::SolverError;

#[derive(Serialize, Debug)]
pub struct Metadata<'a> {
    pub element: &'a ElementDescription,
    pub re: f64,
    pub dt: f64,
    pub t_end: f64,
    pub num_steps_completed: usize,
    pub snapshot_interval: usize,
    pub num_cells: usize,
    pub num_dofs: usize,
}

#[derive(Serialize, Debug)]
pub struct RunSummary<'a> {
    pub metadata: Metadata<'a>,
    pub diagnostics: &'a DiagnosticReport,
}

/// Writes the run summary as pretty-printed JSON.
#[derive(Debug)]
pub struct RunSummaryWriter {
    output_filepath: PathBuf,
}

impl RunSummaryWriter {
    pub fn new(output_filepath: impl Into<PathBuf>) -> Result<Self, io::Error> {
        let output_filepath = output_filepath.into();
        if let Some(parent_dir) = output_filepath.parent() {
            fs::create_dir_all(parent_dir)?;
        }
        Ok(Self { output_filepath })
    }

    pub fn path(&self) -> &Path {
        &self.output_filepath
    }

    pub fn write(&self, summary: &RunSummary) -> Result<(), SolverError> {
        info!("Writing run summary to JSON file: {}...", self.path().display());
        let output_start = Instant::now();
        let json_string = serde_json::to_string_pretty(summary)?;
        let file = File::create(self.path())?;
        let mut writer = BufWriter::new(file);
        writer.write_all(json_string.as_bytes())?;
        writer.flush()?;
        info!("JSON output finished in {:.2}ms", output_start.elapsed().as_millis());
        Ok(())
    }
}

use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use diagnostics::DiagnosticReport;
use elements::ElementCatalog;
use error::SolverError;
use problems::{all_problems, Problem};
use solver::{mixed_solve, SolverConfig};

mod boundary;
mod diagnostics;
mod domain;
mod elements;
mod error;
mod io;
mod json_io;
mod numerical;
mod problems;
mod solver;
mod space;
mod sparse;

/// Runs one mixed element of the catalog on the channel problem and appends
/// its mass-conservation diagnostics to the data file.
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    /// Catalog index of the element; out-of-range indices do nothing.
    #[arg(allow_negative_numbers = true)]
    index: i64,

    /// Maximum log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "warn")]
    log_level: tracing::Level,

    /// File the result line is appended to.
    #[arg(long, value_name = "FILE", default_value = "data.txt")]
    data_file: PathBuf,

    /// Root directory of the XDMF and JSON output.
    #[arg(long, value_name = "DIR", default_value = "results")]
    results_dir: PathBuf,
}

/// Solves `problem` with the element at `index` and appends the report.
/// Returns `Ok(None)` without touching the filesystem when `index` is out of range.
fn run(
    index: i64,
    catalog: &ElementCatalog,
    problem: &Problem,
    config: SolverConfig,
    data_file: &Path,
) -> Result<Option<DiagnosticReport>, SolverError> {
    let Some((name, element)) = catalog.by_index(index) else {
        debug!("Index {} outside the catalog of {} elements", index, catalog.len());
        return Ok(None);
    };
    let report = mixed_solve(problem, element, name, config)?;
    io::append_result(data_file, &report)?;
    info!("Appended result to {}", data_file.display());
    Ok(Some(report))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    tracing_subscriber::fmt().with_max_level(cli.log_level).init();

    let catalog = ElementCatalog::standard()?;
    let available: Vec<(usize, &str)> = catalog.names().enumerate().collect();
    println!("Available solvers: {:?}", available);

    let problems = all_problems()?;
    let problem = problems.first().ok_or("no problems defined")?;
    let config = SolverConfig { results_root: cli.results_dir, ..SolverConfig::default() };

    if let Some(report) = run(cli.index, &catalog, problem, config, &cli.data_file)? {
        println!("{}", report);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::fs;
    use tempfile::tempdir;

    fn short_config(root: &Path) -> SolverConfig {
        SolverConfig {
            dt: 0.0078125,
            t_end: 0.015625,
            snapshot_interval: 1,
            results_root: root.to_path_buf(),
        }
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
        let cli = Cli::try_parse_from(["mixed-ns", "-1"]).unwrap();
        assert_eq!(cli.index, -1);
        assert_eq!(cli.log_level, tracing::Level::WARN);
        assert_eq!(cli.data_file, PathBuf::from("data.txt"));
        assert!(Cli::try_parse_from(["mixed-ns"]).is_err());
        assert!(Cli::try_parse_from(["mixed-ns", "two"]).is_err());
    }

    #[test]
    fn test_out_of_range_index_is_silent() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let catalog = ElementCatalog::standard()?;
        let problem = problems::vortex(2)?;
        let data_file = dir.path().join("data.txt");
        for index in [-1, 4, 100] {
            let config = short_config(&dir.path().join("results"));
            let result = run(index, &catalog, &problem, config, &data_file)?;
            assert!(result.is_none());
        }
        assert!(!data_file.exists());
        assert!(!dir.path().join("results").exists());
        Ok(())
    }

    #[test]
    fn test_valid_index_appends_line() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let catalog = ElementCatalog::standard()?;
        let problem = problems::vortex(2)?;
        let data_file = dir.path().join("data.txt");
        let root = dir.path().join("results");

        let first = run(1, &catalog, &problem, short_config(&root), &data_file)?
            .ok_or("expected a report")?;
        let second = run(3, &catalog, &problem, short_config(&root), &data_file)?
            .ok_or("expected a report")?;
        assert_eq!(first.solver, "crouzeix-raviart-1");
        assert_eq!(second.solver, "mini");

        let content = fs::read_to_string(&data_file)?;
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec![first.to_string(), second.to_string()]);
        assert!(lines[0].starts_with("vortex crouzeix-raviart-1 Global: "));
        assert!(root.join("mini").join("vortex").join("u.xdmf").is_file());
        Ok(())
    }
}

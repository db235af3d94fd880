pub mod scheme;

use nalgebra::{DVector, Vector2};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, info_span, warn};
use crate::boundary::bc2d::{collect_constraints, BoundaryValue, DirichletBC};
use crate::diagnostics::DiagnosticReport;
use crate::elements::ElementDescription;
use crate::error::SolverError;
use crate::io::XdmfWriter;
use crate::json_io::{Metadata, RunSummary, RunSummaryWriter};
use crate::numerical::vertex_values;
use crate::problems::Problem;
use crate::space::function_space::{build_mixed_space, MixedFunctionSpace};
use scheme::{assemble, Scheme, StepData};

#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    pub dt: f64,
    pub t_end: f64,
    /// A velocity snapshot is written every this many steps.
    pub snapshot_interval: usize,
    /// Output goes to `results_root/<solver>/<problem>/`.
    pub results_root: PathBuf,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            dt: 0.005,
            t_end: 8.0,
            snapshot_interval: 10,
            results_root: PathBuf::from("results"),
        }
    }
}

/// Time-dependent incompressible Navier–Stokes on a mixed element.
pub struct MixedSolver<'a> {
    problem: &'a Problem,
    element: &'a ElementDescription,
    solver_name: String,
    config: SolverConfig,
    space: MixedFunctionSpace,
    bcs: Vec<DirichletBC<'a>>,
    results_dir: PathBuf,
    pub time: f64,
    pub steps: usize,
    current: DVector<f64>,
    previous: DVector<f64>,
    load_current: DVector<f64>,
    load_previous: DVector<f64>,
}

impl<'a> MixedSolver<'a> {
    pub fn new(
        problem: &'a Problem,
        element: &'a ElementDescription,
        solver_name: &str,
        config: SolverConfig,
    ) -> Result<Self, SolverError> {
        if problem.re <= 0.0 {
            return Err(SolverError::InvalidParameter(
                "Reynolds number must be positive".to_string(),
            ));
        }
        if config.dt <= 0.0 {
            return Err(SolverError::InvalidParameter("Time step dt must be positive".to_string()));
        }
        if config.snapshot_interval == 0 {
            return Err(SolverError::InvalidParameter(
                "Snapshot interval must be at least 1".to_string(),
            ));
        }

        let results_dir = config.results_root.join(solver_name).join(&problem.name);
        fs::create_dir_all(&results_dir)?;

        let space = build_mixed_space(problem.mesh.clone(), element)?;
        // inflow last so it wins on shared dofs
        let bcs = vec![
            DirichletBC::new(
                space.velocity(),
                problem.noslip.as_ref(),
                BoundaryValue::Constant(Vector2::zeros()),
            ),
            DirichletBC::new(
                space.velocity(),
                problem.inflow.as_ref(),
                BoundaryValue::Expression(problem.u_in.as_ref()),
            ),
        ];
        debug!("No-slip nodes: {}, inflow nodes: {}", bcs[0].num_nodes(), bcs[1].num_nodes());

        let n = space.ndofs();
        let load = space.velocity().interpolate(|x| (problem.f)(x, 0.0));
        info!(
            "Built {} space on '{}': {} cells, hmin={:.4e}, {} dofs",
            solver_name,
            problem.name,
            problem.mesh.num_cells(),
            problem.mesh.hmin(),
            n
        );

        Ok(Self {
            problem,
            element,
            solver_name: solver_name.to_string(),
            config,
            space,
            bcs,
            results_dir,
            time: 0.0,
            steps: 0,
            current: DVector::zeros(n),
            previous: DVector::zeros(n),
            load_previous: load.clone(),
            load_current: load,
        })
    }

    #[cfg(test)]
    pub fn space(&self) -> &MixedFunctionSpace {
        &self.space
    }

    /// Mixed coefficients at the latest time level.
    #[cfg(test)]
    pub fn current(&self) -> &DVector<f64> {
        &self.current
    }

    #[cfg(test)]
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Dirichlet data at the current time, in application order.
    fn constraints(&self) -> Vec<(usize, f64)> {
        let mut constraints = collect_constraints(&self.bcs, self.time);
        if self.problem.pin_pressure {
            constraints.push((self.space.pressure_offset(), 0.0));
        }
        constraints
    }

    /// Advances one time step.
    pub fn step(&mut self) -> Result<(), SolverError> {
        self.time += self.config.dt;
        self.steps += 1;

        let scheme = Scheme::for_step(self.steps);
        let data = StepData {
            current: self.current.as_slice(),
            previous: self.previous.as_slice(),
            load_current: self.load_current.as_slice(),
            load_previous: self.load_previous.as_slice(),
            dt: self.config.dt,
            viscosity: self.problem.viscosity(),
        };
        let mut system = assemble(&self.space, scheme, &data);
        system.apply_dirichlet(&self.constraints());
        let next = system.solve()?;

        self.previous = std::mem::replace(&mut self.current, next);
        let time = self.time;
        let f = &self.problem.f;
        let load = self.space.velocity().interpolate(|x| f(x, time));
        self.load_previous = std::mem::replace(&mut self.load_current, load);
        Ok(())
    }

    /// Runs to `t_end`, writing snapshots on the way, and returns the
    /// diagnostics of the final velocity.
    pub fn run(&mut self) -> Result<DiagnosticReport, SolverError> {
        println!("Solving {} problem with {} element", self.problem.name, self.solver_name);
        let run_span = info_span!(
            "simulation_run",
            problem = %self.problem.name,
            solver = %self.solver_name
        )
        .entered();
        info!("Starting simulation: dt={}, t_end={}", self.config.dt, self.config.t_end);

        let start_time = std::time::Instant::now();
        let mut writer = XdmfWriter::new(self.results_dir.join("u.xdmf"), &self.problem.mesh)?;
        info!("Writing velocity snapshots to {}", writer.path().display());

        while self.time < self.config.t_end {
            let step_span = info_span!("time_step", step = self.steps + 1).entered();
            let step_start = std::time::Instant::now();

            if let Err(e) = self.step() {
                warn!(error = %e, "Simulation step {} failed at t={:.4}", self.steps, self.time);
                return Err(e);
            }
            debug!(
                "Step {}: time={:.4}, elapsed={:.2}ms",
                self.steps,
                self.time,
                step_start.elapsed().as_millis()
            );

            if self.steps % self.config.snapshot_interval == 0 {
                let velocity = self.space.velocity();
                let values = vertex_values(velocity, &self.current.as_slice()[..velocity.ndofs()]);
                let speed = values.iter().map(|u| u.norm()).fold(0.0, f64::max);
                writer.write(self.time, &values)?;
                info!("Snapshot at t={:.4}: max |u| = {:.4e}", self.time, speed);
            }
            drop(step_span);
        }

        let report = DiagnosticReport::compute(
            &self.problem.name,
            &self.solver_name,
            self.element,
            &self.space,
            self.current.as_slice(),
        )?;

        let summary = RunSummary {
            metadata: Metadata {
                element: self.element,
                re: self.problem.re,
                dt: self.config.dt,
                t_end: self.config.t_end,
                num_steps_completed: self.steps,
                snapshot_interval: self.config.snapshot_interval,
                num_cells: self.problem.mesh.num_cells(),
                num_dofs: self.space.ndofs(),
            },
            diagnostics: &report,
        };
        RunSummaryWriter::new(self.results_dir.join("summary.json"))?.write(&summary)?;

        info!(
            "Simulation finished in {:.2}s after {} steps, {} snapshots: {}",
            start_time.elapsed().as_secs_f64(),
            self.steps,
            writer.num_snapshots(),
            report
        );
        drop(run_span);
        Ok(report)
    }
}

/// Solves `problem` with `element` and returns the mass-conservation report.
pub fn mixed_solve(
    problem: &Problem,
    element: &ElementDescription,
    solver_name: &str,
    config: SolverConfig,
) -> Result<DiagnosticReport, SolverError> {
    MixedSolver::new(problem, element, solver_name, config)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::ElementCatalog;
    use crate::problems::{cavity, channel, vortex};
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    // power of two so that the accumulated time hits t_end exactly
    const DT: f64 = 0.0078125;

    fn config(root: &Path, steps: usize) -> SolverConfig {
        SolverConfig {
            dt: DT,
            t_end: DT * steps as f64,
            snapshot_interval: 2,
            results_root: root.to_path_buf(),
        }
    }

    fn element<'c>(catalog: &'c ElementCatalog, name: &str) -> &'c ElementDescription {
        catalog.get(name).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = SolverConfig::default();
        assert_eq!(config.dt, 0.005);
        assert_eq!(config.t_end, 8.0);
        assert_eq!(config.snapshot_interval, 10);
        assert_eq!(config.results_root, PathBuf::from("results"));
    }

    #[test]
    fn test_invalid_parameters() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let catalog = ElementCatalog::standard()?;
        let problem = vortex(2)?;
        let th = element(&catalog, "taylor-hood");

        let mut bad = config(dir.path(), 1);
        bad.dt = 0.0;
        assert!(matches!(
            MixedSolver::new(&problem, th, "taylor-hood", bad),
            Err(SolverError::InvalidParameter(_))
        ));

        let mut bad = config(dir.path(), 1);
        bad.snapshot_interval = 0;
        assert!(MixedSolver::new(&problem, th, "taylor-hood", bad).is_err());
        Ok(())
    }

    #[test]
    fn test_step_counts_and_snapshots() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let catalog = ElementCatalog::standard()?;
        let problem = cavity(4)?;
        let mini = element(&catalog, "mini");
        let mut solver = MixedSolver::new(&problem, mini, "mini", config(dir.path(), 5))?;
        solver.run()?;
        assert_eq!(solver.steps, 5);
        assert_relative_eq!(solver.time, 5.0 * DT);

        let out = dir.path().join("mini").join("cavity");
        let xdmf = fs::read_to_string(out.join("u.xdmf"))?;
        // steps 2 and 4
        assert_eq!(xdmf.matches("<Time Value=").count(), 2);
        assert!(out.join("summary.json").is_file());
        Ok(())
    }

    #[test]
    fn test_results_dir_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let catalog = ElementCatalog::standard()?;
        let problem = vortex(2)?;
        let cr1 = element(&catalog, "crouzeix-raviart-1");
        let first = MixedSolver::new(&problem, cr1, "crouzeix-raviart-1", config(dir.path(), 1))?;
        let second = MixedSolver::new(&problem, cr1, "crouzeix-raviart-1", config(dir.path(), 1))?;
        assert_eq!(first.results_dir(), second.results_dir());
        assert!(first.results_dir().is_dir());
        Ok(())
    }

    #[test]
    fn test_repeated_runs_agree() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let catalog = ElementCatalog::standard()?;
        let problem = vortex(3)?;
        let th = element(&catalog, "taylor-hood");
        let a = mixed_solve(&problem, th, "taylor-hood", config(dir.path(), 3))?;
        let b = mixed_solve(&problem, th, "taylor-hood", config(dir.path(), 3))?;
        assert_eq!(a, b);
        assert_eq!(a.to_string(), b.to_string());
        Ok(())
    }

    #[test]
    fn test_closed_problems_conserve_mass_globally() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let catalog = ElementCatalog::standard()?;
        let problems = [vortex(4)?, cavity(4)?];
        for problem in &problems {
            for name in catalog.names() {
                let element = element(&catalog, name);
                let report = mixed_solve(problem, element, name, config(dir.path(), 2))?;
                assert_relative_eq!(report.global, 0.0, epsilon = 1e-10);
                assert!(report.garth.is_finite() && report.mikael.is_finite());
            }
        }
        Ok(())
    }

    fn vortex_report(
        catalog: &ElementCatalog,
        name: &str,
        n: usize,
        root: &Path,
    ) -> Result<DiagnosticReport, Box<dyn std::error::Error>> {
        Ok(mixed_solve(&vortex(n)?, element(catalog, name), name, config(root, 4))?)
    }

    #[test]
    fn test_enriched_elements_converge_in_divergence() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let catalog = ElementCatalog::standard()?;
        for name in ["crouzeix-raviart-2", "mini"] {
            let coarse = vortex_report(&catalog, name, 4, dir.path())?;
            let fine = vortex_report(&catalog, name, 8, dir.path())?;
            assert!(
                fine.garth < coarse.garth,
                "{}: garth {} -> {}",
                name,
                coarse.garth,
                fine.garth
            );
            assert!(
                fine.mikael < coarse.mikael,
                "{}: mikael {} -> {}",
                name,
                coarse.mikael,
                fine.mikael
            );
        }
        Ok(())
    }

    #[test]
    fn test_projected_divergence_vanishes_when_target_is_pressure_space(
    ) -> Result<(), Box<dyn std::error::Error>> {
        // Mikael projects onto CG1 for Taylor–Hood and onto DG0 for CR1, which are
        // exactly the pressure spaces, so the discrete continuity equation makes
        // the projection zero at every resolution.
        let dir = tempdir()?;
        let catalog = ElementCatalog::standard()?;
        for n in [4, 8] {
            let th = vortex_report(&catalog, "taylor-hood", n, dir.path())?;
            assert!(th.mikael < 1e-10, "taylor-hood n={}: mikael {}", n, th.mikael);

            let cr1 = vortex_report(&catalog, "crouzeix-raviart-1", n, dir.path())?;
            assert!(cr1.mikael < 1e-10, "crouzeix-raviart-1 n={}: mikael {}", n, cr1.mikael);
            assert!(cr1.garth < 1e-10, "crouzeix-raviart-1 n={}: garth {}", n, cr1.garth);
        }

        let coarse = vortex_report(&catalog, "taylor-hood", 4, dir.path())?;
        let fine = vortex_report(&catalog, "taylor-hood", 8, dir.path())?;
        assert!(fine.garth < coarse.garth, "taylor-hood: garth {} -> {}", coarse.garth, fine.garth);
        Ok(())
    }

    #[test]
    fn test_channel_inflow_is_applied() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let catalog = ElementCatalog::standard()?;
        let problem = channel()?;
        let th = element(&catalog, "taylor-hood");
        let mut solver = MixedSolver::new(&problem, th, "taylor-hood", config(dir.path(), 2))?;
        solver.step()?;
        solver.step()?;

        let velocity = solver.space().velocity();
        let values = vertex_values(velocity, &solver.current().as_slice()[..velocity.ndofs()]);
        let ramp = 0.5 * (1.0 - (std::f64::consts::PI * 2.0 * DT).cos());
        let (k, _) = problem
            .mesh
            .vertices()
            .iter()
            .enumerate()
            .find(|(_, x)| x.x == 0.0 && (x.y - 0.5).abs() < 1e-12)
            .ok_or("no vertex at (0, 0.5)")?;
        // 4 y (1 - y) = 1 at mid-height
        assert_relative_eq!(values[k].x, ramp, epsilon = 1e-12);
        assert_relative_eq!(values[k].y, 0.0, epsilon = 1e-12);
        Ok(())
    }
}

use serde::Serialize;
use std::fmt;
use std::rc::Rc;
use crate::elements::ElementDescription;
use crate::error::SolverError;
use crate::numerical::{boundary_flux, divergence_l2, l2_norm, project_divergence};
use crate::space::function_space::{divergence_space, MixedFunctionSpace};

/// Mass-conservation diagnostics of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticReport {
    pub problem: String,
    pub solver: String,
    /// Net outward flux through the boundary.
    pub global: f64,
    /// L2 norm of div u projected onto a matching scalar space.
    pub mikael: f64,
    /// L2 norm of div u evaluated directly.
    pub garth: f64,
}

impl DiagnosticReport {
    /// Computes the three diagnostics for the velocity part of `state`. The
    /// projection target follows the velocity degree of `element`.
    pub fn compute(
        problem: &str,
        solver: &str,
        element: &ElementDescription,
        space: &MixedFunctionSpace,
        state: &[f64],
    ) -> Result<Self, SolverError> {
        let velocity = space.velocity();
        let u = &state[..velocity.ndofs()];

        let global = boundary_flux(velocity, u);
        let garth = divergence_l2(velocity, u);

        let degree = element.velocity_degree() as usize;
        let div_space = divergence_space(Rc::clone(space.mesh()), degree)?;
        let div_u = project_divergence(velocity, u, &div_space)?;
        let mikael = l2_norm(&div_space, div_u.as_slice());

        Ok(Self { problem: problem.to_string(), solver: solver.to_string(), global, mikael, garth })
    }
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} Global: {}, Mikael: {}, Garth: {}",
            self.problem,
            self.solver,
            format_g(self.global),
            format_g(self.mikael),
            format_g(self.garth)
        )
    }
}

/// Formats like C's `%g`: six significant digits, trailing zeros removed,
/// scientific notation when the exponent is below -4 or at least 6.
pub fn format_g(value: f64) -> String {
    const PRECISION: i32 = 6;
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // Exponent after rounding to the requested significant digits.
    let sci = format!("{:.*e}", (PRECISION - 1) as usize, value);
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs())
    } else {
        let decimals = (PRECISION - 1 - exponent) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

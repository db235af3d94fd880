use nalgebra::{Point2, Vector2};
use std::f64::consts::PI;
use std::rc::Rc;
use crate::boundary::bc2d::{FacetMarker, VectorExpression};
use crate::domain::mesh2d::{Diagonal, Mesh2D};
use crate::error::MeshError;

const TOL: f64 = 1e-10;

fn near(a: f64, b: f64) -> bool {
    (a - b).abs() < TOL
}

/// A flow problem as the driver sees it: geometry, boundary data, Reynolds
/// number and body force. Read-only once built.
pub struct Problem {
    pub name: String,
    pub mesh: Rc<Mesh2D>,
    pub noslip: Box<FacetMarker>,
    pub inflow: Box<FacetMarker>,
    pub u_in: Box<VectorExpression>,
    pub re: f64,
    pub f: Box<VectorExpression>,
    /// No outflow boundary: pressure is only determined up to a constant.
    pub pin_pressure: bool,
}

impl Problem {
    pub fn viscosity(&self) -> f64 {
        1.0 / self.re
    }
}

/// Flow through [0,4]x[0,1] driven by a parabolic profile at x = 0 that is
/// ramped up over the first unit of time. The right end is a natural outflow.
pub fn channel() -> Result<Problem, MeshError> {
    let mesh = Mesh2D::rectangle(
        Point2::new(0.0, 0.0),
        Point2::new(4.0, 1.0),
        24,
        6,
        Diagonal::Crossed,
    )?;
    Ok(Problem {
        name: "channel".to_string(),
        mesh: Rc::new(mesh),
        noslip: Box::new(|x: &Point2<f64>| near(x.y, 0.0) || near(x.y, 1.0)),
        inflow: Box::new(|x: &Point2<f64>| near(x.x, 0.0)),
        u_in: Box::new(|x: &Point2<f64>, t: f64| {
            let ramp = 0.5 * (1.0 - (PI * t.min(1.0)).cos());
            Vector2::new(ramp * 4.0 * x.y * (1.0 - x.y), 0.0)
        }),
        re: 100.0,
        f: Box::new(|_: &Point2<f64>, _: f64| Vector2::zeros()),
        pin_pressure: false,
    })
}

/// Unit-square cavity with the lid moving as 16x^2(1-x)^2, which vanishes at
/// the top corners.
pub fn cavity(n: usize) -> Result<Problem, MeshError> {
    let mesh =
        Mesh2D::rectangle(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), n, n, Diagonal::Crossed)?;
    Ok(Problem {
        name: "cavity".to_string(),
        mesh: Rc::new(mesh),
        noslip: Box::new(|x: &Point2<f64>| near(x.x, 0.0) || near(x.x, 1.0) || near(x.y, 0.0)),
        inflow: Box::new(|x: &Point2<f64>| near(x.y, 1.0)),
        u_in: Box::new(|x: &Point2<f64>, _: f64| {
            let s = x.x * (1.0 - x.x);
            Vector2::new(16.0 * s * s, 0.0)
        }),
        re: 100.0,
        f: Box::new(|_: &Point2<f64>, _: f64| Vector2::zeros()),
        pin_pressure: true,
    })
}

/// Closed unit square stirred by the divergence-free force
/// f = curl(sin^2(pi x) sin^2(pi y)).
pub fn vortex(n: usize) -> Result<Problem, MeshError> {
    let mesh =
        Mesh2D::rectangle(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), n, n, Diagonal::Crossed)?;
    Ok(Problem {
        name: "vortex".to_string(),
        mesh: Rc::new(mesh),
        noslip: Box::new(|_: &Point2<f64>| true),
        inflow: Box::new(|_: &Point2<f64>| false),
        u_in: Box::new(|_: &Point2<f64>, _: f64| Vector2::zeros()),
        re: 10.0,
        f: Box::new(|x: &Point2<f64>, _: f64| {
            let (sx, sy) = ((PI * x.x).sin(), (PI * x.y).sin());
            Vector2::new(
                PI * sx * sx * (2.0 * PI * x.y).sin(),
                -PI * (2.0 * PI * x.x).sin() * sy * sy,
            )
        }),
        pin_pressure: true,
    })
}

/// Problems known to the entry point, in order. The first one is run.
pub fn all_problems() -> Result<Vec<Problem>, MeshError> {
    Ok(vec![channel()?, cavity(16)?, vortex(16)?])
}

use nalgebra::{DMatrix, DVector, Vector2};
use crate::numerical::quadrature::triangle_rule;
use crate::space::function_space::MixedFunctionSpace;
use crate::sparse::SparseSystem;

/// Time discretization used for one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// First step: convection by the previous velocity, forcing evaluated once.
    Bootstrap,
    /// Later steps: Crank–Nicolson in the velocity, convecting field and
    /// forcing extrapolated with weights 1.5 and -0.5.
    Extrapolated,
}

impl Scheme {
    pub fn for_step(step: usize) -> Self {
        if step <= 1 {
            Scheme::Bootstrap
        } else {
            Scheme::Extrapolated
        }
    }
}

/// Known fields entering one step.
pub struct StepData<'a> {
    /// Mixed coefficients at the latest time level (u0).
    pub current: &'a [f64],
    /// Mixed coefficients one level earlier (u1).
    pub previous: &'a [f64],
    /// Body force in velocity coefficients, latest and one level earlier.
    pub load_current: &'a [f64],
    pub load_previous: &'a [f64],
    pub dt: f64,
    pub viscosity: f64,
}

/// Assembles the linear saddle-point system of one step.
///
/// Local unknowns are ordered as velocity x, velocity y, then pressure. With
/// u_cn = (u + u0) / 2 and w the convecting field the system reads
///
/// ```text
/// k(u - u0, v) + ((w.grad) u_c, v) + nu(grad u_cn, grad v) + (p, div v) + (q, div u) = (f, v)
/// ```
///
/// where u_c is u for [`Scheme::Bootstrap`] and u_cn for [`Scheme::Extrapolated`].
pub fn assemble(space: &MixedFunctionSpace, scheme: Scheme, data: &StepData) -> SparseSystem {
    let velocity = space.velocity();
    let component = velocity.component();
    let pressure = space.pressure();
    let mesh = space.mesh();

    let nv = component.num_local_dofs();
    let nq = pressure.num_local_dofs();
    let n_local = 2 * nv + nq;
    let stride = component.ndofs();
    let p_offset = space.pressure_offset();

    let k = 1.0 / data.dt;
    let nu = data.viscosity;
    let rule = triangle_rule(3 * velocity.degree());

    let u0 = &data.current[..velocity.ndofs()];
    let u1 = &data.previous[..velocity.ndofs()];

    let mut system =
        SparseSystem::with_capacity(space.ndofs(), mesh.num_cells() * n_local * n_local);
    let mut a_local = DMatrix::<f64>::zeros(n_local, n_local);
    let mut b_local = DVector::<f64>::zeros(n_local);
    let mut global = vec![0usize; n_local];

    for cell in 0..mesh.num_cells() {
        let geometry = mesh.cell_geometry(cell);
        a_local.fill(0.0);
        b_local.fill(0.0);

        for (l, w) in rule.iter() {
            let dx = w * geometry.area;
            let phi = component.tabulate(&geometry, l);
            let psi = pressure.tabulate(&geometry, l);

            let (u_now, grad_now) = velocity.evaluate(cell, &phi, u0);
            let (f_now, _) = velocity.evaluate(cell, &phi, data.load_current);

            let (wind, theta, force) = match scheme {
                Scheme::Bootstrap => (u_now, 1.0, f_now),
                Scheme::Extrapolated => {
                    let (u_old, _) = velocity.evaluate(cell, &phi, u1);
                    let (f_old, _) = velocity.evaluate(cell, &phi, data.load_previous);
                    (u_now * 1.5 - u_old * 0.5, 0.5, f_now * 1.5 - f_old * 0.5)
                }
            };
            // explicit half of the convection term
            let lagged: Vector2<f64> =
                Vector2::new(wind.dot(&grad_now[0]), wind.dot(&grad_now[1])) * (1.0 - theta);

            for i in 0..nv {
                let vi = phi.values[i];
                let gvi = phi.grads[i];

                for c in 0..2 {
                    let rhs = k * u_now[c] * vi - 0.5 * nu * grad_now[c].dot(&gvi) + force[c] * vi
                        - lagged[c] * vi;
                    b_local[c * nv + i] += dx * rhs;
                }

                for j in 0..nv {
                    let vj = phi.values[j];
                    let gvj = phi.grads[j];
                    let a = k * vj * vi + theta * wind.dot(&gvj) * vi + 0.5 * nu * gvj.dot(&gvi);
                    a_local[(i, j)] += dx * a;
                    a_local[(nv + i, nv + j)] += dx * a;
                }

                for m in 0..nq {
                    let qm = psi.values[m];
                    for c in 0..2 {
                        let b = dx * qm * gvi[c];
                        a_local[(c * nv + i, 2 * nv + m)] += b;
                        a_local[(2 * nv + m, c * nv + i)] += b;
                    }
                }
            }
        }

        let vdofs = component.cell_dofs(cell);
        let qdofs = pressure.cell_dofs(cell);
        for i in 0..nv {
            global[i] = vdofs[i];
            global[nv + i] = stride + vdofs[i];
        }
        for m in 0..nq {
            global[2 * nv + m] = p_offset + qdofs[m];
        }

        for r in 0..n_local {
            system.add_rhs(global[r], b_local[r]);
            for c in 0..n_local {
                system.add(global[r], global[c], a_local[(r, c)]);
            }
        }
    }
    system
}

pub mod quadrature;

use nalgebra::{DVector, Vector2};
use crate::error::SolverError;
use crate::space::function_space::{FunctionSpace, VectorFunctionSpace};
use crate::sparse::SparseSystem;
use quadrature::{line_rule, triangle_rule};

/// Net outward flux of `u` through the whole boundary, sum of `∫ u·n ds`.
pub fn boundary_flux(space: &VectorFunctionSpace, u: &[f64]) -> f64 {
    let mesh = space.component().mesh();
    let rule = line_rule();
    let mut flux = 0.0;
    for facet in mesh.boundary_facets() {
        let geometry = mesh.cell_geometry(facet.cell);
        let a = (facet.local_edge + 1) % 3;
        let b = (facet.local_edge + 2) % 3;
        for (&s, &w) in rule.points.iter().zip(&rule.weights) {
            let mut l = [0.0; 3];
            l[a] = 1.0 - s;
            l[b] = s;
            let tab = space.component().tabulate(&geometry, &l);
            let (value, _) = space.evaluate(facet.cell, &tab, u);
            flux += w * facet.length * value.dot(&facet.normal);
        }
    }
    flux
}

/// `sqrt(∫ (div u)^2 dx)`, with the divergence taken cell by cell.
pub fn divergence_l2(space: &VectorFunctionSpace, u: &[f64]) -> f64 {
    let mesh = space.component().mesh();
    let rule = triangle_rule(2 * space.degree());
    let mut total = 0.0;
    for cell in 0..mesh.num_cells() {
        let geometry = mesh.cell_geometry(cell);
        for (l, w) in rule.iter() {
            let tab = space.component().tabulate(&geometry, l);
            let (_, grad) = space.evaluate(cell, &tab, u);
            let div = grad[0].x + grad[1].y;
            total += w * geometry.area * div * div;
        }
    }
    total.sqrt()
}

/// L2 projection of `div u` onto `target`.
pub fn project_divergence(
    space: &VectorFunctionSpace,
    u: &[f64],
    target: &FunctionSpace,
) -> Result<DVector<f64>, SolverError> {
    let mesh = space.component().mesh();
    let rule = triangle_rule(target.degree() + space.degree().max(target.degree()));
    let n_local = target.num_local_dofs();
    let mut system =
        SparseSystem::with_capacity(target.ndofs(), mesh.num_cells() * n_local * n_local);
    for cell in 0..mesh.num_cells() {
        let geometry = mesh.cell_geometry(cell);
        let dofs = target.cell_dofs(cell);
        for (l, w) in rule.iter() {
            let weight = w * geometry.area;
            let psi = target.tabulate(&geometry, l);
            let (_, grad) = space.evaluate(cell, &space.component().tabulate(&geometry, l), u);
            let div = grad[0].x + grad[1].y;
            for i in 0..n_local {
                system.add_rhs(dofs[i], weight * div * psi.values[i]);
                for j in 0..n_local {
                    system.add(dofs[i], dofs[j], weight * psi.values[i] * psi.values[j]);
                }
            }
        }
    }
    system.solve()
}

/// `sqrt(∫ f^2 dx)` for a scalar finite-element function.
pub fn l2_norm(space: &FunctionSpace, coeffs: &[f64]) -> f64 {
    let mesh = space.mesh();
    let rule = triangle_rule(2 * space.degree());
    let mut total = 0.0;
    for cell in 0..mesh.num_cells() {
        let geometry = mesh.cell_geometry(cell);
        for (l, w) in rule.iter() {
            let (value, _) = space.evaluate(cell, &space.tabulate(&geometry, l), coeffs);
            total += w * geometry.area * value * value;
        }
    }
    total.sqrt()
}

/// Velocity at mesh vertices, averaged over the cells sharing each vertex.
pub fn vertex_values(space: &VectorFunctionSpace, u: &[f64]) -> Vec<Vector2<f64>> {
    let mesh = space.component().mesh();
    let mut sums = vec![Vector2::zeros(); mesh.num_vertices()];
    let mut counts = vec![0usize; mesh.num_vertices()];
    for (cell, vertices) in mesh.cells().iter().enumerate() {
        let geometry = mesh.cell_geometry(cell);
        for (k, &v) in vertices.iter().enumerate() {
            let mut l = [0.0; 3];
            l[k] = 1.0;
            let (value, _) = space.evaluate(cell, &space.component().tabulate(&geometry, &l), u);
            sums[v] += value;
            counts[v] += 1;
        }
    }
    sums.into_iter()
        .zip(counts)
        .map(|(sum, count)| if count > 0 { sum / count as f64 } else { sum })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mesh2d::{Diagonal, Mesh2D};
    use crate::elements::{ElementSpec, Family};
    use approx::assert_relative_eq;
    use nalgebra::Point2;
    use std::f64::consts::PI;
    use std::rc::Rc;

    fn unit_square(n: usize) -> Rc<Mesh2D> {
        let (lo, hi) = (Point2::new(0.0, 0.0), Point2::new(1.0, 1.0));
        Rc::new(Mesh2D::rectangle(lo, hi, n, n, Diagonal::Crossed).unwrap())
    }

    fn cg(mesh: &Rc<Mesh2D>, degree: u32) -> VectorFunctionSpace {
        VectorFunctionSpace::new(mesh.clone(), &[ElementSpec::new(Family::CG, degree)]).unwrap()
    }

    #[test]
    fn test_boundary_flux_of_linear_field() {
        // u = (x, y): div u = 2 over the unit square, so the flux is 2
        let mesh = unit_square(3);
        let v = cg(&mesh, 1);
        let u = v.interpolate(|x| Vector2::new(x.x, x.y));
        assert_relative_eq!(boundary_flux(&v, u.as_slice()), 2.0, epsilon = 1e-12);
        assert_relative_eq!(divergence_l2(&v, u.as_slice()), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_divergence_free_field() {
        // u = (x^2, -2xy) lies in CG2 and div u = 2x - 2x = 0
        let mesh = unit_square(2);
        let v = cg(&mesh, 2);
        let u = v.interpolate(|x| Vector2::new(x.x * x.x, -2.0 * x.x * x.y));
        assert_relative_eq!(boundary_flux(&v, u.as_slice()), 0.0, epsilon = 1e-12);
        assert_relative_eq!(divergence_l2(&v, u.as_slice()), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_projection_of_divergence() {
        // u = (x^2, 0): div u = 2x lies in CG1, so the projection is exact
        let mesh = unit_square(2);
        let v = cg(&mesh, 2);
        let u = v.interpolate(|x| Vector2::new(x.x * x.x, 0.0));
        let target = FunctionSpace::scalar(mesh.clone(), ElementSpec::new(Family::CG, 1)).unwrap();
        let div = project_divergence(&v, u.as_slice(), &target).unwrap();
        let expected = target.interpolate(|x| 2.0 * x.x);
        assert_relative_eq!(div, expected, epsilon = 1e-10);
        // ||2x||^2 = 4/3
        let norm = l2_norm(&target, div.as_slice());
        assert_relative_eq!(norm, (4.0f64 / 3.0).sqrt(), epsilon = 1e-10);
    }

    #[test]
    fn test_projection_onto_dg0_is_cell_average() {
        let mesh = unit_square(1);
        let v = cg(&mesh, 1);
        let u = v.interpolate(|x| Vector2::new(3.0 * x.x, -x.y));
        let target = FunctionSpace::scalar(mesh.clone(), ElementSpec::new(Family::DG, 0)).unwrap();
        let div = project_divergence(&v, u.as_slice(), &target).unwrap();
        assert!(div.iter().all(|d| (d - 2.0).abs() < 1e-12));
    }

    #[test]
    fn test_l2_norm_of_sine() {
        let mesh = unit_square(8);
        let space = FunctionSpace::scalar(mesh.clone(), ElementSpec::new(Family::CG, 2)).unwrap();
        let f = space.interpolate(|x| (PI * x.x).sin() * (PI * x.y).sin());
        assert_relative_eq!(l2_norm(&space, f.as_slice()), 0.5, epsilon = 1e-3);
    }

    #[test]
    fn test_vertex_values_of_continuous_field() {
        let mesh = unit_square(2);
        let v = cg(&mesh, 2);
        let u = v.interpolate(|x| Vector2::new(x.y, x.x * x.x));
        for (value, x) in vertex_values(&v, u.as_slice()).iter().zip(mesh.vertices()) {
            assert_relative_eq!(*value, Vector2::new(x.y, x.x * x.x), epsilon = 1e-12);
        }
    }
}

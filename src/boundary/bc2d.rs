use nalgebra::{Point2, Vector2};
use std::collections::BTreeMap;
use crate::space::function_space::VectorFunctionSpace;

/// Predicate selecting boundary points.
pub type FacetMarker = dyn Fn(&Point2<f64>) -> bool;

/// Time-dependent vector field `g(x, t)`.
pub type VectorExpression = dyn Fn(&Point2<f64>, f64) -> Vector2<f64>;

#[derive(Clone, Copy)]
pub enum BoundaryValue<'a> {
    Constant(Vector2<f64>),
    Expression(&'a VectorExpression),
}

impl BoundaryValue<'_> {
    pub fn at(&self, x: &Point2<f64>, t: f64) -> Vector2<f64> {
        match self {
            BoundaryValue::Constant(v) => *v,
            BoundaryValue::Expression(g) => g(x, t),
        }
    }
}

/// Dirichlet condition on both velocity components.
///
/// The constrained dofs are fixed at construction: vertex and edge dofs of every
/// boundary facet whose midpoint and endpoints the marker accepts. Only the
/// value is re-evaluated, at each call to [`DirichletBC::values`].
pub struct DirichletBC<'a> {
    value: BoundaryValue<'a>,
    dofs: Vec<(usize, Point2<f64>)>, // component dof, nodal point
    component_stride: usize,
}

impl<'a> DirichletBC<'a> {
    pub fn new(
        space: &VectorFunctionSpace,
        marker: &FacetMarker,
        value: BoundaryValue<'a>,
    ) -> Self {
        let component = space.component();
        let mesh = component.mesh();
        let mut dofs = BTreeMap::new();
        for facet in mesh.boundary_facets() {
            let (a, b) = mesh.facet_endpoints(facet);
            let mid = Point2::from((a.coords + b.coords) * 0.5);
            if !(marker(&mid) && marker(&a) && marker(&b)) {
                continue;
            }
            let geometry = mesh.cell_geometry(facet.cell);
            for (dof, l) in component.facet_dofs(facet.cell, facet.local_edge) {
                dofs.entry(dof).or_insert_with(|| geometry.point(&l));
            }
        }
        Self {
            value,
            dofs: dofs.into_iter().collect(),
            component_stride: component.ndofs(),
        }
    }

    /// Number of constrained nodes (each constrains two velocity dofs).
    pub fn num_nodes(&self) -> usize {
        self.dofs.len()
    }

    /// `(dof, value)` pairs at time `t`, in velocity-space numbering.
    pub fn values(&self, t: f64) -> Vec<(usize, f64)> {
        let mut out = Vec::with_capacity(2 * self.dofs.len());
        for (dof, x) in &self.dofs {
            let g = self.value.at(x, t);
            out.push((*dof, g.x));
            out.push((*dof + self.component_stride, g.y));
        }
        out
    }
}

/// Constraints of all conditions in order; later conditions win on shared dofs
/// once applied.
pub fn collect_constraints(bcs: &[DirichletBC], t: f64) -> Vec<(usize, f64)> {
    bcs.iter().flat_map(|bc| bc.values(t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mesh2d::{Diagonal, Mesh2D};
    use crate::elements::{ElementSpec, Family};
    use std::rc::Rc;

    fn velocity_space(specs: &[ElementSpec], n: usize) -> VectorFunctionSpace {
        let mesh =
            Mesh2D::rectangle(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), n, n, Diagonal::Right)
                .unwrap();
        VectorFunctionSpace::new(Rc::new(mesh), specs).unwrap()
    }

    #[test]
    fn test_whole_boundary_cg2() {
        let v = velocity_space(&[ElementSpec::new(Family::CG, 2)], 2);
        let everywhere = |_: &Point2<f64>| true;
        let bc = DirichletBC::new(&v, &everywhere, BoundaryValue::Constant(Vector2::zeros()));
        // 8 boundary vertices + 8 boundary edge midpoints
        assert_eq!(bc.num_nodes(), 16);
        assert_eq!(bc.values(0.0).len(), 32);
    }

    #[test]
    fn test_marker_selects_side_and_bubbles_stay_free() {
        let mini = [ElementSpec::new(Family::CG, 1), ElementSpec::new(Family::Bubble, 3)];
        let v = velocity_space(&mini, 4);
        let left = |x: &Point2<f64>| x.x.abs() < 1e-12;
        let bc = DirichletBC::new(&v, &left, BoundaryValue::Constant(Vector2::new(1.0, 0.0)));
        assert_eq!(bc.num_nodes(), 5);
        let values = bc.values(0.0);
        let bubble_start = 25; // CG1 block first
        assert!(values.iter().all(|(dof, _)| *dof % v.component().ndofs() < bubble_start));
    }

    #[test]
    fn test_expression_values_follow_time() {
        let v = velocity_space(&[ElementSpec::new(Family::CR, 1)], 2);
        let bottom = |x: &Point2<f64>| x.y.abs() < 1e-12;
        let g = |x: &Point2<f64>, t: f64| Vector2::new(t * x.x, -t);
        let bc = DirichletBC::new(&v, &bottom, BoundaryValue::Expression(&g));
        assert_eq!(bc.num_nodes(), 2); // edge midpoints at x = 0.25, 0.75
        let values = bc.values(2.0);
        let xs: Vec<f64> = values.iter().step_by(2).map(|(_, u)| *u).collect();
        assert_eq!(xs, vec![0.5, 1.5]);
        assert!(values.iter().skip(1).step_by(2).all(|(_, u)| *u == -2.0));
    }

    #[test]
    fn test_collect_constraints_keeps_order() {
        let v = velocity_space(&[ElementSpec::new(Family::CG, 1)], 1);
        let all = |_: &Point2<f64>| true;
        let first = DirichletBC::new(&v, &all, BoundaryValue::Constant(Vector2::zeros()));
        let second = DirichletBC::new(&v, &all, BoundaryValue::Constant(Vector2::new(1.0, 1.0)));
        let constraints = collect_constraints(&[first, second], 0.0);
        assert_eq!(constraints.len(), 16);
        assert_eq!(constraints[0].1, 0.0);
        assert_eq!(constraints[15].1, 1.0);
    }
}

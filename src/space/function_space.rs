use nalgebra::{DVector, Point2, Vector2};
use std::rc::Rc;
use crate::domain::mesh2d::{CellGeometry, Mesh2D};
use crate::elements::{ElementDescription, ElementSpec, Family};
use crate::error::ElementError;
use crate::space::element::{DofEntity, ScalarElement};

/// Basis values and physical gradients of every local dof of a cell at one point.
#[derive(Debug, Clone)]
pub struct Tabulation {
    pub values: Vec<f64>,
    pub grads: Vec<Vector2<f64>>,
}

/// Scalar space built as the direct sum of one or more scalar elements.
///
/// Global dofs are numbered in blocks, one block per element, so the size of a
/// sum is the sum of the sizes. Local dofs of a cell follow the same block order.
#[derive(Debug, Clone)]
pub struct FunctionSpace {
    mesh: Rc<Mesh2D>,
    elements: Vec<ScalarElement>,
    ndofs: usize,
    cell_dofs: Vec<Vec<usize>>,
    local_layout: Vec<(usize, usize)>, // local dof -> (element, element-local dof)
}

impl FunctionSpace {
    pub fn new(mesh: Rc<Mesh2D>, specs: &[ElementSpec]) -> Result<Self, ElementError> {
        if specs.is_empty() {
            return Err(ElementError::MissingVelocity);
        }
        let elements = specs.iter().map(ScalarElement::from_spec).collect::<Result<Vec<_>, _>>()?;

        let mut local_layout = Vec::new();
        for (e, element) in elements.iter().enumerate() {
            local_layout.extend((0..element.num_local_dofs()).map(|d| (e, d)));
        }

        let mut cell_dofs = vec![Vec::with_capacity(local_layout.len()); mesh.num_cells()];
        let mut offset = 0;
        for element in &elements {
            let (per_vertex, per_edge, per_cell) = element.entity_dofs();
            let edge_base = offset + per_vertex * mesh.num_vertices();
            let cell_base = edge_base + per_edge * mesh.num_edges();
            for (c, dofs) in cell_dofs.iter_mut().enumerate() {
                let vertices = mesh.cells()[c];
                let edges = mesh.cell_edges(c);
                dofs.extend(element.local_dofs().iter().map(|entity| match *entity {
                    DofEntity::Vertex(i) => offset + vertices[i],
                    DofEntity::Edge(i) => edge_base + edges[i],
                    DofEntity::Cell(k) => cell_base + c * per_cell + k,
                }));
            }
            offset = cell_base + per_cell * mesh.num_cells();
        }

        Ok(Self { mesh, elements, ndofs: offset, cell_dofs, local_layout })
    }

    pub fn scalar(mesh: Rc<Mesh2D>, spec: ElementSpec) -> Result<Self, ElementError> {
        Self::new(mesh, &[spec])
    }

    pub fn mesh(&self) -> &Rc<Mesh2D> {
        &self.mesh
    }

    pub fn ndofs(&self) -> usize {
        self.ndofs
    }

    #[cfg(test)]
    pub fn elements(&self) -> &[ScalarElement] {
        &self.elements
    }

    pub fn num_local_dofs(&self) -> usize {
        self.local_layout.len()
    }

    pub fn cell_dofs(&self, cell: usize) -> &[usize] {
        &self.cell_dofs[cell]
    }

    /// Polynomial degree of the sum, i.e. the largest element degree.
    pub fn degree(&self) -> usize {
        self.elements.iter().map(ScalarElement::degree).max().unwrap_or(0)
    }

    pub fn tabulate(&self, geometry: &CellGeometry, l: &[f64; 3]) -> Tabulation {
        let mut values = Vec::with_capacity(self.local_layout.len());
        let mut grads = Vec::with_capacity(self.local_layout.len());
        for &(e, d) in &self.local_layout {
            let element = &self.elements[e];
            values.push(element.value(d, l));
            grads.push(element.gradient(d, l, &geometry.grad_lambda));
        }
        Tabulation { values, grads }
    }

    /// Value and gradient of the function with coefficients `coeffs` at a tabulated point.
    pub fn evaluate(&self, cell: usize, tab: &Tabulation, coeffs: &[f64]) -> (f64, Vector2<f64>) {
        let mut value = 0.0;
        let mut grad = Vector2::zeros();
        for (i, &dof) in self.cell_dofs[cell].iter().enumerate() {
            value += coeffs[dof] * tab.values[i];
            grad += tab.grads[i] * coeffs[dof];
        }
        (value, grad)
    }

    /// Global dofs lying on local edge `local_edge` of `cell`, with their nodal points.
    /// Cell-interior dofs are never included.
    pub fn facet_dofs(&self, cell: usize, local_edge: usize) -> Vec<(usize, [f64; 3])> {
        self.local_layout
            .iter()
            .enumerate()
            .filter_map(|(i, &(e, d))| {
                let element = &self.elements[e];
                let on_facet = match element.local_dofs()[d] {
                    DofEntity::Vertex(v) => v != local_edge,
                    DofEntity::Edge(edge) => edge == local_edge,
                    DofEntity::Cell(_) => false,
                };
                on_facet.then(|| (self.cell_dofs[cell][i], element.dof_point(d)))
            })
            .collect()
    }

    /// Nodal interpolation. For sums, each later element interpolates what the
    /// earlier ones leave over at its nodes, so a bubble picks up the residual
    /// at the centroid.
    pub fn interpolate<F>(&self, f: F) -> DVector<f64>
    where
        F: Fn(&Point2<f64>) -> f64,
    {
        let mut coeffs = DVector::zeros(self.ndofs);
        for cell in 0..self.mesh.num_cells() {
            let geometry = self.mesh.cell_geometry(cell);
            let dofs = &self.cell_dofs[cell];
            let mut first_of_element = 0;
            for element in &self.elements {
                for d in 0..element.num_local_dofs() {
                    let l = element.dof_point(d);
                    let mut residual = f(&geometry.point(&l));
                    let earlier = &self.local_layout[..first_of_element];
                    for (j, &(e_prev, d_prev)) in earlier.iter().enumerate() {
                        residual -= coeffs[dofs[j]] * self.elements[e_prev].value(d_prev, &l);
                    }
                    coeffs[dofs[first_of_element + d]] = residual / element.value(d, &l);
                }
                first_of_element += element.num_local_dofs();
            }
        }
        coeffs
    }
}

/// Two-component space; component `c` owns global dofs `[c*n, (c+1)*n)`.
#[derive(Debug, Clone)]
pub struct VectorFunctionSpace {
    component: FunctionSpace,
}

impl VectorFunctionSpace {
    pub fn new(mesh: Rc<Mesh2D>, specs: &[ElementSpec]) -> Result<Self, ElementError> {
        Ok(Self { component: FunctionSpace::new(mesh, specs)? })
    }

    pub fn component(&self) -> &FunctionSpace {
        &self.component
    }

    pub fn ndofs(&self) -> usize {
        2 * self.component.ndofs()
    }

    pub fn degree(&self) -> usize {
        self.component.degree()
    }

    /// Value and gradient (row `c` = gradient of component `c`) at a tabulated point.
    pub fn evaluate(
        &self,
        cell: usize,
        tab: &Tabulation,
        coeffs: &[f64],
    ) -> (Vector2<f64>, [Vector2<f64>; 2]) {
        let n = self.component.ndofs();
        let (ux, gx) = self.component.evaluate(cell, tab, &coeffs[..n]);
        let (uy, gy) = self.component.evaluate(cell, tab, &coeffs[n..2 * n]);
        (Vector2::new(ux, uy), [gx, gy])
    }

    pub fn interpolate<F>(&self, f: F) -> DVector<f64>
    where
        F: Fn(&Point2<f64>) -> Vector2<f64>,
    {
        let n = self.component.ndofs();
        let mut coeffs = DVector::zeros(2 * n);
        coeffs.rows_mut(0, n).copy_from(&self.component.interpolate(|x| f(x).x));
        coeffs.rows_mut(n, n).copy_from(&self.component.interpolate(|x| f(x).y));
        coeffs
    }
}

/// Velocity block followed by the pressure block.
#[derive(Debug, Clone)]
pub struct MixedFunctionSpace {
    velocity: VectorFunctionSpace,
    pressure: FunctionSpace,
}

impl MixedFunctionSpace {
    pub fn velocity(&self) -> &VectorFunctionSpace {
        &self.velocity
    }

    pub fn pressure(&self) -> &FunctionSpace {
        &self.pressure
    }

    pub fn mesh(&self) -> &Rc<Mesh2D> {
        self.pressure.mesh()
    }

    pub fn pressure_offset(&self) -> usize {
        self.velocity.ndofs()
    }

    pub fn ndofs(&self) -> usize {
        self.velocity.ndofs() + self.pressure.ndofs()
    }
}

/// Builds V as the sum of one vector space per velocity entry, Q from the single
/// pressure entry, and their combination.
pub fn build_mixed_space(
    mesh: Rc<Mesh2D>,
    element: &ElementDescription,
) -> Result<MixedFunctionSpace, ElementError> {
    let velocity = VectorFunctionSpace::new(mesh.clone(), element.velocity())?;
    let pressure = FunctionSpace::scalar(mesh, *element.pressure())?;
    Ok(MixedFunctionSpace { velocity, pressure })
}

/// Scalar space matching a velocity of degree `k` for divergence projections:
/// CG(k-1), or DG0 when k-1 is zero.
pub fn divergence_space(
    mesh: Rc<Mesh2D>,
    velocity_degree: usize,
) -> Result<FunctionSpace, ElementError> {
    let spec = match velocity_degree.saturating_sub(1) {
        0 => ElementSpec::new(Family::DG, 0),
        k => ElementSpec::new(Family::CG, k as u32),
    };
    FunctionSpace::scalar(mesh, spec)
}

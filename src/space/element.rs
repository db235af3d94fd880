use nalgebra::Vector2;
use crate::elements::{ElementSpec, Family};
use crate::error::ElementError;

/// Mesh entity a local degree of freedom is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DofEntity {
    Vertex(usize),
    Edge(usize), // local edge, opposite the vertex with the same index
    Cell(usize), // k-th interior dof of the cell
}

/// Scalar finite element on a triangle, expressed in barycentric coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarElement {
    Lagrange1,
    Lagrange2,
    CrouzeixRaviart1,
    Discontinuous0,
    Discontinuous1,
    Bubble3,
}

const THIRD: f64 = 1.0 / 3.0;

impl ScalarElement {
    pub fn from_spec(spec: &ElementSpec) -> Result<Self, ElementError> {
        match (spec.family, spec.degree) {
            (Family::CG, 1) => Ok(Self::Lagrange1),
            (Family::CG, 2) => Ok(Self::Lagrange2),
            (Family::CR, 1) => Ok(Self::CrouzeixRaviart1),
            (Family::DG, 0) => Ok(Self::Discontinuous0),
            (Family::DG, 1) => Ok(Self::Discontinuous1),
            (Family::Bubble, 3) => Ok(Self::Bubble3),
            (family, degree) => {
                Err(ElementError::Unsupported { family: family.to_string(), degree })
            }
        }
    }

    pub fn degree(&self) -> usize {
        match self {
            Self::Discontinuous0 => 0,
            Self::Lagrange1 | Self::CrouzeixRaviart1 | Self::Discontinuous1 => 1,
            Self::Lagrange2 => 2,
            Self::Bubble3 => 3,
        }
    }

    pub fn local_dofs(&self) -> &'static [DofEntity] {
        use DofEntity::*;
        match self {
            Self::Lagrange1 => &[Vertex(0), Vertex(1), Vertex(2)],
            Self::Lagrange2 => &[Vertex(0), Vertex(1), Vertex(2), Edge(0), Edge(1), Edge(2)],
            Self::CrouzeixRaviart1 => &[Edge(0), Edge(1), Edge(2)],
            Self::Discontinuous0 | Self::Bubble3 => &[Cell(0)],
            Self::Discontinuous1 => &[Cell(0), Cell(1), Cell(2)],
        }
    }

    pub fn num_local_dofs(&self) -> usize {
        self.local_dofs().len()
    }

    /// Number of dofs per (vertex, edge, cell).
    pub fn entity_dofs(&self) -> (usize, usize, usize) {
        match self {
            Self::Lagrange1 => (1, 0, 0),
            Self::Lagrange2 => (1, 1, 0),
            Self::CrouzeixRaviart1 => (0, 1, 0),
            Self::Discontinuous0 | Self::Bubble3 => (0, 0, 1),
            Self::Discontinuous1 => (0, 0, 3),
        }
    }

    /// Nodal point of a local dof, in barycentric coordinates.
    pub fn dof_point(&self, local: usize) -> [f64; 3] {
        match self.local_dofs()[local] {
            DofEntity::Vertex(i) => vertex_point(i),
            DofEntity::Edge(i) => edge_midpoint(i),
            DofEntity::Cell(k) => match self {
                Self::Discontinuous1 => vertex_point(k),
                _ => [THIRD; 3],
            },
        }
    }

    /// Value of local basis function `local` at barycentric point `l`.
    pub fn value(&self, local: usize, l: &[f64; 3]) -> f64 {
        match (self, self.local_dofs()[local]) {
            (Self::Lagrange1, DofEntity::Vertex(i)) => l[i],
            (Self::Lagrange2, DofEntity::Vertex(i)) => l[i] * (2.0 * l[i] - 1.0),
            (Self::Lagrange2, DofEntity::Edge(i)) => {
                let (j, k) = edge_vertices(i);
                4.0 * l[j] * l[k]
            }
            (Self::CrouzeixRaviart1, DofEntity::Edge(i)) => 1.0 - 2.0 * l[i],
            (Self::Discontinuous0, _) => 1.0,
            (Self::Discontinuous1, DofEntity::Cell(k)) => l[k],
            (Self::Bubble3, _) => 27.0 * l[0] * l[1] * l[2],
            _ => 0.0,
        }
    }

    /// Physical gradient of local basis function `local`, given the
    /// gradients of the barycentric coordinates of the cell.
    pub fn gradient(&self, local: usize, l: &[f64; 3], gl: &[Vector2<f64>; 3]) -> Vector2<f64> {
        match (self, self.local_dofs()[local]) {
            (Self::Lagrange1, DofEntity::Vertex(i)) => gl[i],
            (Self::Lagrange2, DofEntity::Vertex(i)) => gl[i] * (4.0 * l[i] - 1.0),
            (Self::Lagrange2, DofEntity::Edge(i)) => {
                let (j, k) = edge_vertices(i);
                (gl[j] * l[k] + gl[k] * l[j]) * 4.0
            }
            (Self::CrouzeixRaviart1, DofEntity::Edge(i)) => gl[i] * -2.0,
            (Self::Discontinuous1, DofEntity::Cell(k)) => gl[k],
            (Self::Bubble3, _) => {
                (gl[0] * (l[1] * l[2]) + gl[1] * (l[0] * l[2]) + gl[2] * (l[0] * l[1])) * 27.0
            }
            _ => Vector2::zeros(),
        }
    }
}

pub fn edge_vertices(edge: usize) -> (usize, usize) {
    ((edge + 1) % 3, (edge + 2) % 3)
}

fn vertex_point(i: usize) -> [f64; 3] {
    let mut l = [0.0; 3];
    l[i] = 1.0;
    l
}

fn edge_midpoint(i: usize) -> [f64; 3] {
    let mut l = [0.5; 3];
    l[i] = 0.0;
    l
}

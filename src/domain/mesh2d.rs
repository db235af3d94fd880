use nalgebra::{Matrix2, Point2, Vector2};
use std::collections::HashMap;
use crate::error::MeshError;

/// How each rectangle of a structured mesh is split into triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagonal {
    /// Two triangles per rectangle, split along the bottom-left/top-right
    /// diagonal. Corner cells then have two boundary edges, which the
    /// Taylor–Hood pair does not tolerate on closed boundaries, so only small
    /// test meshes use it.
    #[cfg(test)]
    Right,
    /// Four triangles per rectangle meeting at an added center vertex.
    Crossed,
}

/// A boundary edge seen from the single cell that owns it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryFacet {
    pub edge: usize,
    pub cell: usize,
    pub local_edge: usize,   // opposite local vertex `local_edge`
    pub normal: Vector2<f64>, // outward unit normal
    pub length: f64,
}

/// Affine geometry of one triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellGeometry {
    pub vertices: [Point2<f64>; 3],
    pub area: f64,
    pub grad_lambda: [Vector2<f64>; 3], // physical gradients of the barycentric coordinates
}

impl CellGeometry {
    fn new(vertices: [Point2<f64>; 3]) -> Self {
        let e1 = vertices[1] - vertices[0];
        let e2 = vertices[2] - vertices[0];
        let jacobian = Matrix2::new(e1.x, e2.x, e1.y, e2.y);
        let det = jacobian.determinant();
        // Rows of J^{-1} are the gradients of lambda_1 and lambda_2.
        let inv = Matrix2::new(e2.y, -e2.x, -e1.y, e1.x) / det;
        let g1 = Vector2::new(inv[(0, 0)], inv[(0, 1)]);
        let g2 = Vector2::new(inv[(1, 0)], inv[(1, 1)]);
        Self {
            vertices,
            area: 0.5 * det.abs(),
            grad_lambda: [-(g1 + g2), g1, g2],
        }
    }

    /// Maps barycentric coordinates to the physical point.
    pub fn point(&self, lambda: &[f64; 3]) -> Point2<f64> {
        Point2::from(
            self.vertices[0].coords * lambda[0]
                + self.vertices[1].coords * lambda[1]
                + self.vertices[2].coords * lambda[2],
        )
    }
}

/// Conforming triangle mesh with counter-clockwise cells.
///
/// Local edge `i` of a cell joins local vertices `(i+1)%3` and `(i+2)%3`,
/// so it is the edge opposite local vertex `i`.
#[derive(Debug, Clone)]
pub struct Mesh2D {
    vertices: Vec<Point2<f64>>,
    cells: Vec<[usize; 3]>,
    edges: Vec<[usize; 2]>,
    cell_edges: Vec<[usize; 3]>,
    boundary_facets: Vec<BoundaryFacet>,
}

impl Mesh2D {
    pub fn new(vertices: Vec<Point2<f64>>, cells: Vec<[usize; 3]>) -> Result<Self, MeshError> {
        if cells.is_empty() {
            return Err(MeshError::InvalidMeshSize(
                "Mesh must contain at least one cell".to_string(),
            ));
        }

        let mut oriented = Vec::with_capacity(cells.len());
        for (c, cell) in cells.iter().enumerate() {
            if let Some(&v) = cell.iter().find(|&&v| v >= vertices.len()) {
                return Err(MeshError::InvalidCell {
                    cell: c,
                    reason: format!(
                        "vertex index {} out of range ({} vertices)",
                        v,
                        vertices.len()
                    ),
                });
            }
            let e1 = vertices[cell[1]] - vertices[cell[0]];
            let e2 = vertices[cell[2]] - vertices[cell[0]];
            let cross = e1.x * e2.y - e1.y * e2.x;
            let scale = e1.norm_squared().max(e2.norm_squared());
            if cross.abs() <= 1e-14 * scale {
                return Err(MeshError::InvalidCell {
                    cell: c,
                    reason: "degenerate triangle".to_string(),
                });
            }
            // Flip clockwise cells so every normal computed below points outward.
            oriented.push(if cross > 0.0 { *cell } else { [cell[0], cell[2], cell[1]] });
        }

        let mut edge_index: HashMap<(usize, usize), usize> = HashMap::new();
        let mut edges = Vec::new();
        let mut edge_cells: Vec<Vec<(usize, usize)>> = Vec::new();
        let mut cell_edges = Vec::with_capacity(oriented.len());
        for (c, cell) in oriented.iter().enumerate() {
            let mut local = [0usize; 3];
            for (i, slot) in local.iter_mut().enumerate() {
                let a = cell[(i + 1) % 3];
                let b = cell[(i + 2) % 3];
                let key = (a.min(b), a.max(b));
                let e = *edge_index.entry(key).or_insert_with(|| {
                    edges.push([key.0, key.1]);
                    edge_cells.push(Vec::new());
                    edges.len() - 1
                });
                edge_cells[e].push((c, i));
                *slot = e;
            }
            cell_edges.push(local);
        }

        let mut boundary_facets = Vec::new();
        for (e, owners) in edge_cells.iter().enumerate() {
            match owners.as_slice() {
                [(cell, local_edge)] => {
                    let a = vertices[oriented[*cell][(local_edge + 1) % 3]];
                    let b = vertices[oriented[*cell][(local_edge + 2) % 3]];
                    let d = b - a;
                    let length = d.norm();
                    boundary_facets.push(BoundaryFacet {
                        edge: e,
                        cell: *cell,
                        local_edge: *local_edge,
                        normal: Vector2::new(d.y, -d.x) / length,
                        length,
                    });
                }
                [_, _] => {}
                _ => {
                    return Err(MeshError::InvalidCell {
                        cell: owners[0].0,
                        reason: format!("edge {} is shared by {} cells", e, owners.len()),
                    })
                }
            }
        }

        Ok(Self { vertices, cells: oriented, edges, cell_edges, boundary_facets })
    }

    /// Structured triangulation of the box `[p0, p1]` with `nx` by `ny` rectangles.
    pub fn rectangle(
        p0: Point2<f64>,
        p1: Point2<f64>,
        nx: usize,
        ny: usize,
        diagonal: Diagonal,
    ) -> Result<Self, MeshError> {
        if nx < 1 || ny < 1 {
            return Err(MeshError::InvalidMeshSize(
                "Mesh dimensions (nx, ny) must be at least 1x1".to_string(),
            ));
        }
        if p1.x <= p0.x || p1.y <= p0.y {
            return Err(MeshError::InvalidMeshSize(format!(
                "Upper corner ({}, {}) must lie above and right of lower corner ({}, {})",
                p1.x, p1.y, p0.x, p0.y
            )));
        }
        let dx = (p1.x - p0.x) / nx as f64;
        let dy = (p1.y - p0.y) / ny as f64;
        let node = |i: usize, j: usize| i + j * (nx + 1);

        let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1) + nx * ny);
        for j in 0..=ny {
            for i in 0..=nx {
                vertices.push(Point2::new(p0.x + i as f64 * dx, p0.y + j as f64 * dy));
            }
        }

        let mut cells = Vec::new();
        for j in 0..ny {
            for i in 0..nx {
                let v00 = node(i, j);
                let v10 = node(i + 1, j);
                let v11 = node(i + 1, j + 1);
                let v01 = node(i, j + 1);
                match diagonal {
                    #[cfg(test)]
                    Diagonal::Right => {
                        cells.push([v00, v10, v11]);
                        cells.push([v00, v11, v01]);
                    }
                    Diagonal::Crossed => {
                        let center = vertices.len();
                        vertices.push(Point2::new(
                            p0.x + (i as f64 + 0.5) * dx,
                            p0.y + (j as f64 + 0.5) * dy,
                        ));
                        cells.push([v00, v10, center]);
                        cells.push([v10, v11, center]);
                        cells.push([v11, v01, center]);
                        cells.push([v01, v00, center]);
                    }
                }
            }
        }

        Self::new(vertices, cells)
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn vertices(&self) -> &[Point2<f64>] {
        &self.vertices
    }

    pub fn cells(&self) -> &[[usize; 3]] {
        &self.cells
    }

    /// Local edge `i` of `cell` is opposite its local vertex `i`.
    pub fn cell_edges(&self, cell: usize) -> &[usize; 3] {
        &self.cell_edges[cell]
    }

    pub fn boundary_facets(&self) -> &[BoundaryFacet] {
        &self.boundary_facets
    }

    pub fn cell_geometry(&self, cell: usize) -> CellGeometry {
        let [a, b, c] = self.cells[cell];
        CellGeometry::new([self.vertices[a], self.vertices[b], self.vertices[c]])
    }

    /// Endpoints of a boundary facet, in the owning cell's orientation.
    pub fn facet_endpoints(&self, facet: &BoundaryFacet) -> (Point2<f64>, Point2<f64>) {
        let cell = &self.cells[facet.cell];
        (
            self.vertices[cell[(facet.local_edge + 1) % 3]],
            self.vertices[cell[(facet.local_edge + 2) % 3]],
        )
    }

    /// Shortest edge length in the mesh.
    pub fn hmin(&self) -> f64 {
        self.edges
            .iter()
            .map(|[a, b]| (self.vertices[*b] - self.vertices[*a]).norm())
            .fold(f64::INFINITY, f64::min)
    }
}

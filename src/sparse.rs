use nalgebra::DVector;
use rsparse::data::{Sprs, Trpl};
use rsparse::lusol;
use crate::error::SolverError;

/// Square linear system collected as (row, col, value) triplets.
#[derive(Debug, Clone)]
pub struct SparseSystem {
    n: usize,
    triplets: Vec<(usize, usize, f64)>,
    rhs: Vec<f64>,
}

impl SparseSystem {
    pub fn new(n: usize) -> Self {
        Self { n, triplets: Vec::new(), rhs: vec![0.0; n] }
    }

    pub fn with_capacity(n: usize, nnz: usize) -> Self {
        Self { n, triplets: Vec::with_capacity(nnz), rhs: vec![0.0; n] }
    }

    pub fn size(&self) -> usize {
        self.n
    }

    pub fn rhs(&self) -> &[f64] {
        &self.rhs
    }

    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        if value != 0.0 {
            self.triplets.push((row, col, value));
        }
    }

    pub fn add_rhs(&mut self, row: usize, value: f64) {
        self.rhs[row] += value;
    }

    /// Replaces each constrained row by the identity row with the prescribed value.
    /// When a dof appears more than once, the last value wins.
    pub fn apply_dirichlet(&mut self, constraints: &[(usize, f64)]) {
        let mut constrained = vec![false; self.n];
        for &(dof, value) in constraints {
            constrained[dof] = true;
            self.rhs[dof] = value;
        }
        self.triplets.retain(|&(row, _, _)| !constrained[row]);
        for (dof, _) in constrained.iter().enumerate().filter(|(_, c)| **c) {
            self.triplets.push((dof, dof, 1.0));
        }
    }

    /// Compressed-column matrix with duplicate entries summed.
    pub fn to_sparse(&self) -> Result<Sprs<f64>, SolverError> {
        let mut sorted = self.triplets.clone();
        sorted.sort_unstable_by_key(|&(row, col, _)| (col, row));

        let mut merged: Vec<(usize, usize, f64)> = Vec::with_capacity(sorted.len());
        for (row, col, value) in sorted {
            match merged.last_mut() {
                Some(last) if last.0 == row && last.1 == col => last.2 += value,
                _ => merged.push((row, col, value)),
            }
        }

        let mut trpl_mat = Trpl::<f64> {
            m: self.n,
            n: self.n,
            p: Vec::with_capacity(merged.len()), // column indices
            i: Vec::with_capacity(merged.len()), // row indices
            x: Vec::with_capacity(merged.len()),
        };
        for (row, col, value) in merged {
            if row >= self.n || col >= self.n {
                return Err(SolverError::InvalidParameter(format!(
                    "Entry ({}, {}) outside a {}x{} system", row, col, self.n, self.n
                )));
            }
            trpl_mat.i.push(row);
            trpl_mat.p.push(col as isize);
            trpl_mat.x.push(value);
        }

        let mut sprs_mat = Sprs::<f64>::new();
        sprs_mat.from_trpl(&trpl_mat);

        if sprs_mat.m != self.n || sprs_mat.n != self.n {
            return Err(SolverError::LinearSolve(
                "Sprs matrix conversion failed (dimension mismatch)".to_string(),
            ));
        }
        Ok(sprs_mat)
    }

    /// Direct sparse LU solve with AMD ordering and partial pivoting.
    pub fn solve(&self) -> Result<DVector<f64>, SolverError> {
        if self.n == 0 {
            return Ok(DVector::zeros(0));
        }
        let a_sparse = self.to_sparse()?;
        let mut x = self.rhs.clone();

        if let Err(error_code) = lusol(&a_sparse, &mut x, 1, 1.0) {
            return Err(SolverError::LinearSolve(format!(
                "Sparse LU solver failed: {}",
                error_code
            )));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::LinearSolve(
                "Solution vector contains NaN or Inf values".to_string(),
            ));
        }
        Ok(DVector::from_vec(x))
    }
}

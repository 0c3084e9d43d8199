//! 3x3 blocks for superposition and per-residue displacement analysis.
//!
//! [`Matrix3x3`] is the plain row-major block the network and stiffness code
//! pass around. Decompositions convert to `nalgebra::Matrix3` and back.

use nalgebra::Matrix3;

use crate::types::Point3D;

/// A 3x3 matrix stored in row-major order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix3x3 {
    pub data: [[f64; 3]; 3],
}

impl Matrix3x3 {
    /// Zero matrix.
    pub fn zeros() -> Self {
        Self {
            data: [[0.0; 3]; 3],
        }
    }

    /// Identity matrix.
    pub fn identity() -> Self {
        Self {
            data: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Outer product `a ⊗ b`.
    pub fn outer(a: &Point3D, b: &Point3D) -> Self {
        let a = a.to_array();
        let b = b.to_array();
        let mut m = Matrix3x3::zeros();
        for i in 0..3 {
            for j in 0..3 {
                m.data[i][j] = a[i] * b[j];
            }
        }
        m
    }

    /// Element-wise sum.
    pub fn add(&self, other: &Matrix3x3) -> Matrix3x3 {
        let mut result = *self;
        for i in 0..3 {
            for j in 0..3 {
                result.data[i][j] += other.data[i][j];
            }
        }
        result
    }

    /// Matrix multiplication: self * other.
    pub fn multiply(&self, other: &Matrix3x3) -> Matrix3x3 {
        let mut result = Matrix3x3::zeros();
        for i in 0..3 {
            for j in 0..3 {
                let mut sum = 0.0;
                for k in 0..3 {
                    sum += self.data[i][k] * other.data[k][j];
                }
                result.data[i][j] = sum;
            }
        }
        result
    }

    /// Transpose.
    pub fn transpose(&self) -> Matrix3x3 {
        let mut result = Matrix3x3::zeros();
        for i in 0..3 {
            for j in 0..3 {
                result.data[i][j] = self.data[j][i];
            }
        }
        result
    }

    /// Determinant.
    pub fn determinant(&self) -> f64 {
        let d = &self.data;
        d[0][0] * (d[1][1] * d[2][2] - d[1][2] * d[2][1])
            - d[0][1] * (d[1][0] * d[2][2] - d[1][2] * d[2][0])
            + d[0][2] * (d[1][0] * d[2][1] - d[1][1] * d[2][0])
    }

    /// Apply this matrix as a rotation/transform to a point: M * p.
    pub fn apply(&self, p: &Point3D) -> Point3D {
        Point3D {
            x: self.data[0][0] * p.x + self.data[0][1] * p.y + self.data[0][2] * p.z,
            y: self.data[1][0] * p.x + self.data[1][1] * p.y + self.data[1][2] * p.z,
            z: self.data[2][0] * p.x + self.data[2][1] * p.y + self.data[2][2] * p.z,
        }
    }

    /// Quadratic form `vᵀ M v`.
    pub fn quadratic_form(&self, v: &Point3D) -> f64 {
        v.dot(&self.apply(v))
    }

    /// Sum of squared entries.
    pub fn frobenius_norm_squared(&self) -> f64 {
        self.data.iter().flatten().map(|x| x * x).sum()
    }

    pub fn to_nalgebra(&self) -> Matrix3<f64> {
        Matrix3::from_fn(|r, c| self.data[r][c])
    }

    pub fn from_nalgebra(m: &Matrix3<f64>) -> Self {
        let mut result = Matrix3x3::zeros();
        for i in 0..3 {
            for j in 0..3 {
                result.data[i][j] = m[(i, j)];
            }
        }
        result
    }
}

/// Eigendecomposition of a symmetric 3x3 matrix.
///
/// Returns eigenvalues in descending order and the matching eigenvectors as
/// the columns of the returned matrix. Equal eigenvalues keep the solver's
/// order.
pub fn symmetric_eigen_3x3(matrix: &Matrix3x3) -> ([f64; 3], Matrix3x3) {
    let eigen = matrix.to_nalgebra().symmetric_eigen();

    let mut indices = [0usize, 1, 2];
    indices.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

    let mut values = [0.0f64; 3];
    let mut vectors = Matrix3x3::zeros();
    for (col, &idx) in indices.iter().enumerate() {
        values[col] = eigen.eigenvalues[idx];
        for row in 0..3 {
            vectors.data[row][col] = eigen.eigenvectors[(row, idx)];
        }
    }
    (values, vectors)
}

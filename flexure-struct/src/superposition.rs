//! Structural superposition via the Kabsch algorithm.
//!
//! Finds the optimal rigid-body rotation (and translation) that minimizes RMSD
//! between two sets of corresponding points.

use flexure_core::{FlexureError, Result};
use nalgebra::Matrix3;

use crate::geometry::center_of_mass_points;
use crate::linalg::Matrix3x3;
use crate::selection::ResidueTable;
use crate::types::Point3D;

/// Result of a Kabsch superposition.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SuperpositionResult {
    /// RMSD after optimal superposition.
    pub rmsd: f64,
    /// 3x3 rotation matrix (row-major).
    pub rotation: [[f64; 3]; 3],
    /// Translation vector applied after rotation.
    pub translation: Point3D,
    /// Transformed coordinates of the mobile set after superposition.
    pub transformed_coords: Vec<Point3D>,
}

impl SuperpositionResult {
    /// Apply the fitted rigid transform to another set of mobile-frame points.
    pub fn apply(&self, points: &[Point3D]) -> Vec<Point3D> {
        let r = Matrix3x3 {
            data: self.rotation,
        };
        points
            .iter()
            .map(|p| r.apply(p).add(&self.translation))
            .collect()
    }
}

/// Kabsch superposition on point coordinates.
///
/// `points1` is the reference (fixed) set, `points2` is the mobile set that
/// gets rotated and translated to minimize RMSD.
///
/// # Errors
///
/// [`FlexureError::DimensionMismatch`] when the sets differ in length,
/// [`FlexureError::InvalidInput`] when fewer than 3 points are given.
pub fn kabsch_points(points1: &[Point3D], points2: &[Point3D]) -> Result<SuperpositionResult> {
    if points1.len() != points2.len() {
        return Err(FlexureError::DimensionMismatch(format!(
            "point set sizes differ: {} vs {}",
            points1.len(),
            points2.len()
        )));
    }
    if points1.len() < 3 {
        return Err(FlexureError::InvalidInput(
            "need at least 3 points for Kabsch superposition".into(),
        ));
    }

    let n = points1.len();

    // Step 1: center both sets
    let com1 = center_of_mass_points(points1);
    let com2 = center_of_mass_points(points2);

    let centered1: Vec<Point3D> = points1.iter().map(|p| p.sub(&com1)).collect();
    let centered2: Vec<Point3D> = points2.iter().map(|p| p.sub(&com2)).collect();

    // Step 2: cross-covariance matrix H = P2^T * P1
    let h = centered2
        .iter()
        .zip(&centered1)
        .fold(Matrix3::<f64>::zeros(), |acc, (p, q)| {
            acc + Matrix3x3::outer(p, q).to_nalgebra()
        });

    // Step 3: SVD of H. U and V stay orthogonal for rank-deficient H
    // (colinear or coplanar sets), so R is always a proper rotation.
    let svd = h.try_svd(true, true, f64::EPSILON, 0).ok_or_else(|| {
        FlexureError::Convergence("SVD of the cross-covariance did not converge".into())
    })?;
    let smallest = svd.singular_values.imin();
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => return Err(FlexureError::Other("SVD returned no singular vectors".into())),
    };

    // Step 4: R = V * D * U^T, where D flips the axis of the smallest
    // singular value when V * U^T would be a reflection
    let v = v_t.transpose();
    let ut = u.transpose();
    let mut d = Matrix3::<f64>::identity();
    if (v * ut).determinant() < 0.0 {
        d[(smallest, smallest)] = -1.0;
    }
    let r = Matrix3x3::from_nalgebra(&(v * d * ut));

    // Step 5: apply rotation and compute translation + RMSD
    let mut transformed = Vec::with_capacity(n);
    let mut sum_sq = 0.0;
    for (c2, p1) in centered2.iter().zip(points1) {
        let final_point = r.apply(c2).add(&com1);
        let diff = final_point.sub(p1);
        sum_sq += diff.dot(&diff);
        transformed.push(final_point);
    }

    let rmsd = (sum_sq / n as f64).sqrt();

    Ok(SuperpositionResult {
        rmsd,
        rotation: r.data,
        translation: com1.sub(&r.apply(&com2)),
        transformed_coords: transformed,
    })
}

/// Superpose `mobile` onto `reference` using their representative coordinates.
///
/// Both tables must list the same residues in the same order.
pub fn superpose_tables(
    reference: &ResidueTable,
    mobile: &ResidueTable,
) -> Result<SuperpositionResult> {
    reference.ensure_same_residues(mobile)?;
    kabsch_points(&reference.coords, &mobile.coords)
}

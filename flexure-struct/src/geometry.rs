//! Coordinate geometry: centroids, direct RMSD, pair directions.

use flexure_core::{FlexureError, Result};

use crate::types::Point3D;

/// Geometric center (unweighted) of a slice of points.
pub fn center_of_mass_points(points: &[Point3D]) -> Point3D {
    if points.is_empty() {
        return Point3D::zero();
    }
    let mut sum = Point3D::zero();
    for p in points {
        sum = sum.add(p);
    }
    sum.scale(1.0 / points.len() as f64)
}

/// RMSD between two equal-length slices of points (no alignment, direct comparison).
pub fn rmsd_points(points1: &[Point3D], points2: &[Point3D]) -> Result<f64> {
    if points1.len() != points2.len() {
        return Err(FlexureError::DimensionMismatch(format!(
            "point set sizes differ: {} vs {}",
            points1.len(),
            points2.len()
        )));
    }
    if points1.is_empty() {
        return Err(FlexureError::InvalidInput(
            "cannot compute RMSD of empty point sets".into(),
        ));
    }
    let sum: f64 = points1
        .iter()
        .zip(points2.iter())
        .map(|(a, b)| {
            let d = a.sub(b);
            d.dot(&d)
        })
        .sum();
    Ok((sum / points1.len() as f64).sqrt())
}

/// Per-point deviation (distance) between two equal-length slices.
pub fn deviations(points1: &[Point3D], points2: &[Point3D]) -> Result<Vec<f64>> {
    if points1.len() != points2.len() {
        return Err(FlexureError::DimensionMismatch(format!(
            "point set sizes differ: {} vs {}",
            points1.len(),
            points2.len()
        )));
    }
    Ok(points1
        .iter()
        .zip(points2)
        .map(|(a, b)| a.distance_to(b))
        .collect())
}

/// Unit vector pointing from `from` to `to` together with their distance.
///
/// Returns `None` for coincident points.
pub fn unit_vector(from: &Point3D, to: &Point3D) -> Option<(Point3D, f64)> {
    let d = to.sub(from);
    let r = d.norm();
    if r < 1e-12 {
        None
    } else {
        Some((d.scale(1.0 / r), r))
    }
}

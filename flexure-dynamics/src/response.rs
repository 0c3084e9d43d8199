//! Perturbation response scanning.
//!
//! Each residue is pushed in turn with a unit force along the three Cartesian
//! axes; the linear response of every other residue is read off the
//! pseudo-inverse of the Hessian. Averaging the response matrix along rows
//! gives how strongly a residue propagates perturbations (effectiveness),
//! along columns how strongly it picks them up (sensitivity).

use flexure_core::{FlexureError, Result, Summarizable};
use nalgebra::DMatrix;

use crate::modes::ModeSet;

/// Response of every residue to unit forces applied at every residue.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PerturbationResponse {
    /// N×N. Entry (i, j): RMS displacement magnitude at `j` for a unit force
    /// at `i`, averaged over the three force directions.
    pub matrix: DMatrix<f64>,
    /// Mean of row `i` without the diagonal.
    pub effectiveness: Vec<f64>,
    /// Mean of column `j` without the diagonal.
    pub sensitivity: Vec<f64>,
    /// Pseudo-inverse of the Hessian (3N×3N), the displacement field for an
    /// arbitrary force.
    pub displacement: DMatrix<f64>,
}

impl PerturbationResponse {
    pub fn n_residues(&self) -> usize {
        self.matrix.nrows()
    }

    /// 3×3 block `G_ij` of the displacement field: displacement of `i` per
    /// unit force at `j`.
    pub fn block(&self, i: usize, j: usize) -> [[f64; 3]; 3] {
        let mut b = [[0.0; 3]; 3];
        for (a, row) in b.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = self.displacement[(3 * i + a, 3 * j + c)];
            }
        }
        b
    }
}

impl Summarizable for PerturbationResponse {
    fn summary(&self) -> String {
        let n = self.n_residues();
        let top = argmax(&self.effectiveness);
        format!(
            "PerturbationResponse: {} residues, most effective position {}",
            n,
            top.map_or_else(|| "-".to_string(), |i| i.to_string())
        )
    }
}

fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
}

/// RMS over force directions of the displacement at `j` for a force at `i`.
fn response_entry(g: &DMatrix<f64>, i: usize, j: usize) -> f64 {
    let mut sq = 0.0;
    for d in 0..3 {
        for a in 0..3 {
            sq += g[(3 * j + a, 3 * i + d)].powi(2);
        }
    }
    (sq / 3.0).sqrt()
}

fn off_diagonal_mean(values: impl Iterator<Item = f64>, n: usize) -> f64 {
    if n < 2 {
        0.0
    } else {
        values.sum::<f64>() / (n - 1) as f64
    }
}

fn response_row(g: &DMatrix<f64>, n: usize, i: usize) -> Vec<f64> {
    (0..n).map(|j| response_entry(g, i, j)).collect()
}

/// Scan unit perturbations over every residue.
///
/// # Errors
///
/// [`FlexureError::SingularHessian`] when the mode set has no non-zero mode.
pub fn perturbation_response(modes: &ModeSet) -> Result<PerturbationResponse> {
    let g = modes.pseudo_inverse()?;
    let n = modes.n_residues;
    if g.nrows() != 3 * n {
        return Err(FlexureError::DimensionMismatch(format!(
            "pseudo-inverse is {} x {} for {} residues",
            g.nrows(),
            g.ncols(),
            n
        )));
    }

    #[cfg(feature = "parallel")]
    let rows: Vec<Vec<f64>> = {
        use rayon::prelude::*;
        (0..n).into_par_iter().map(|i| response_row(&g, n, i)).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let rows: Vec<Vec<f64>> = (0..n).map(|i| response_row(&g, n, i)).collect();

    let matrix = DMatrix::from_fn(n, n, |i, j| rows[i][j]);

    let effectiveness: Vec<f64> = (0..n)
        .map(|i| off_diagonal_mean((0..n).filter(|&j| j != i).map(|j| matrix[(i, j)]), n))
        .collect();
    let sensitivity: Vec<f64> = (0..n)
        .map(|j| off_diagonal_mean((0..n).filter(|&i| i != j).map(|i| matrix[(i, j)]), n))
        .collect();

    log::debug!("perturbation response scanned over {} residues", n);

    Ok(PerturbationResponse {
        matrix,
        effectiveness,
        sensitivity,
        displacement: g,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModeConfig, NetworkConfig};
    use crate::network::ElasticNetwork;
    use flexure_struct::{Point3D, ResidueId, ResidueTable};
    use proptest::prelude::*;

    fn modes_for(coords: Vec<Point3D>) -> ModeSet {
        let n = coords.len();
        let table = ResidueTable::new(
            "PRS",
            (0..n).map(|i| ResidueId::new('A', i as i32 + 1)).collect(),
            vec!["ALA".to_string(); n],
            coords,
        )
        .unwrap();
        let net = ElasticNetwork::build(&table, &NetworkConfig::default()).unwrap();
        ModeSet::from_network(&net, &ModeConfig::default()).unwrap()
    }

    fn zigzag(n: usize) -> Vec<Point3D> {
        (0..n)
            .map(|i| {
                let t = i as f64;
                Point3D::new(3.8 * t, if i % 2 == 0 { 0.0 } else { 2.0 }, (t * 0.9).sin() * 2.5)
            })
            .collect()
    }

    #[test]
    fn matrix_shape_and_profiles() {
        let response = perturbation_response(&modes_for(zigzag(6))).unwrap();
        assert_eq!(response.matrix.nrows(), 6);
        assert_eq!(response.matrix.ncols(), 6);
        assert_eq!(response.effectiveness.len(), 6);
        assert_eq!(response.sensitivity.len(), 6);
        assert_eq!(response.displacement.nrows(), 18);
        assert!(response.summary().contains("6 residues"));
    }

    #[test]
    fn profiles_exclude_diagonal() {
        let response = perturbation_response(&modes_for(zigzag(5))).unwrap();
        let n = 5;
        for i in 0..n {
            let expected: f64 =
                (0..n).filter(|&j| j != i).map(|j| response.matrix[(i, j)]).sum::<f64>() / 4.0;
            assert!((response.effectiveness[i] - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn response_of_symmetric_field_is_symmetric() {
        // G is symmetric so the Frobenius norm of G_ij equals that of G_ji.
        let response = perturbation_response(&modes_for(zigzag(5))).unwrap();
        for i in 0..5 {
            for j in 0..5 {
                assert!((response.matrix[(i, j)] - response.matrix[(j, i)]).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn block_reads_displacement_field() {
        let response = perturbation_response(&modes_for(zigzag(4))).unwrap();
        let b = response.block(1, 2);
        assert_eq!(b[0][1], response.displacement[(3, 7)]);
    }

    #[test]
    fn singular_hessian_propagates() {
        let modes = modes_for(vec![Point3D::zero(), Point3D::new(3.8, 0.0, 0.0)]);
        assert!(matches!(
            perturbation_response(&modes),
            Err(FlexureError::SingularHessian(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn profiles_are_non_negative(
            jitter in proptest::collection::vec(-0.8..0.8f64, 21),
        ) {
            let coords: Vec<Point3D> = zigzag(7)
                .into_iter()
                .enumerate()
                .map(|(i, p)| p.add(&Point3D::new(jitter[3 * i], jitter[3 * i + 1], jitter[3 * i + 2])))
                .collect();
            let response = perturbation_response(&modes_for(coords)).unwrap();
            prop_assert!(response.effectiveness.iter().all(|&v| v >= 0.0));
            prop_assert!(response.sensitivity.iter().all(|&v| v >= 0.0));
            prop_assert!(response.matrix.iter().all(|&v| v >= 0.0));
        }
    }
}

//! Conformational variance across an ensemble of structures.
//!
//! Every member is superposed onto the reference; per-member RMSD and the
//! per-residue average deviation come straight from the fitted coordinates.
//! Principal component analysis of the member displacement vectors then
//! gives a per-residue fluctuation restricted to the dominant components.

use flexure_core::{FlexureError, Result, Summarizable};
use flexure_struct::{build_table, kabsch_points, ChainSelection, ResidueTable, Structure, SuperpositionResult};
use nalgebra::{DMatrix, SymmetricEigen};

use crate::config::{PcaConfig, PcaRetention};

/// Eigenvalues at or below this are treated as zero variance.
const VARIANCE_FLOOR: f64 = 1e-12;

/// Reference structure plus members sharing its residue order.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ensemble {
    pub reference: ResidueTable,
    pub members: Vec<ResidueTable>,
}

impl Ensemble {
    /// # Errors
    ///
    /// - [`FlexureError::InvalidInput`] when there are no members.
    /// - [`FlexureError::DimensionMismatch`] when a member lists different
    ///   residues, or the same residues in a different order.
    pub fn new(reference: ResidueTable, members: Vec<ResidueTable>) -> Result<Self> {
        if members.is_empty() {
            return Err(FlexureError::InvalidInput(format!(
                "ensemble around {} has no members",
                reference.structure_id
            )));
        }
        for member in &members {
            reference.ensure_same_residues(member)?;
        }
        Ok(Self { reference, members })
    }

    /// Build the residue tables of the reference and every member.
    pub fn from_structures(
        reference: &Structure,
        members: &[Structure],
        selection: &ChainSelection,
    ) -> Result<Self> {
        let reference = build_table(reference, selection)?;
        let members = members
            .iter()
            .map(|s| build_table(s, selection))
            .collect::<Result<Vec<_>>>()?;
        Self::new(reference, members)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Superpose every member onto the reference, in member order.
    pub fn superpose(&self) -> Result<Vec<SuperpositionResult>> {
        let fit = |member: &ResidueTable| kabsch_points(&self.reference.coords, &member.coords);

        #[cfg(feature = "parallel")]
        let fits = {
            use rayon::prelude::*;
            self.members.par_iter().map(fit).collect::<Result<Vec<_>>>()
        };
        #[cfg(not(feature = "parallel"))]
        let fits = self.members.iter().map(fit).collect::<Result<Vec<_>>>();

        fits
    }
}

/// Variance of an ensemble around its reference.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnsembleVariance {
    /// (member structure id, RMSD to the reference after superposition).
    pub member_rmsd: Vec<(String, f64)>,
    /// Mean distance of each residue to its reference position.
    pub average_deviation: Vec<f64>,
    /// Per-residue fluctuation over the retained principal components.
    pub fluctuation: Vec<f64>,
    /// Variance of each retained component.
    pub explained_variance: Vec<f64>,
    /// Fraction of the total variance of each retained component.
    pub explained_variance_ratio: Vec<f64>,
}

impl EnsembleVariance {
    pub fn n_components(&self) -> usize {
        self.explained_variance.len()
    }
}

impl Summarizable for EnsembleVariance {
    fn summary(&self) -> String {
        let total: f64 = self.explained_variance_ratio.iter().sum();
        format!(
            "EnsembleVariance: {} members, {} residues, {} components ({:.1}% variance)",
            self.member_rmsd.len(),
            self.average_deviation.len(),
            self.n_components(),
            total * 100.0
        )
    }
}

/// Number of components to keep out of eigenvalues sorted descending.
fn retained(eigenvalues: &[f64], total: f64, retention: PcaRetention) -> usize {
    let positive = eigenvalues.iter().take_while(|&&l| l > VARIANCE_FLOOR).count();
    match retention {
        PcaRetention::Count(k) => k.min(positive),
        PcaRetention::Fraction(fraction) => {
            let mut cumulative = 0.0;
            for (k, &l) in eigenvalues[..positive].iter().enumerate() {
                cumulative += l;
                if cumulative / total >= fraction - 1e-12 {
                    return k + 1;
                }
            }
            positive
        }
    }
}

/// Superpose the ensemble and decompose its variance.
///
/// The covariance of the displacement vectors is 3N×3N but has rank below
/// the member count, so it is diagonalized through the M×M Gram matrix of
/// the centered displacements, which shares its non-zero spectrum.
///
/// # Errors
///
/// Propagates superposition errors; [`FlexureError::Convergence`] if the
/// eigensolver fails.
pub fn analyze_ensemble(ensemble: &Ensemble, config: &PcaConfig) -> Result<EnsembleVariance> {
    let n = ensemble.reference.len();
    let m = ensemble.len();
    let fits = ensemble.superpose()?;

    let member_rmsd: Vec<(String, f64)> = ensemble
        .members
        .iter()
        .zip(&fits)
        .map(|(member, fit)| (member.structure_id.clone(), fit.rmsd))
        .collect();

    let mut average_deviation = vec![0.0; n];
    for fit in &fits {
        for (i, (p, r)) in fit.transformed_coords.iter().zip(&ensemble.reference.coords).enumerate() {
            average_deviation[i] += p.distance_to(r);
        }
    }
    for d in average_deviation.iter_mut() {
        *d /= m as f64;
    }

    // Displacements from the reference, one row per member
    let dim = 3 * n;
    let mut x = DMatrix::<f64>::zeros(m, dim);
    for (row, fit) in fits.iter().enumerate() {
        for (i, (p, r)) in fit.transformed_coords.iter().zip(&ensemble.reference.coords).enumerate() {
            let d = p.sub(r).to_array();
            for a in 0..3 {
                x[(row, 3 * i + a)] = d[a];
            }
        }
    }

    let mut fluctuation = vec![0.0; n];
    let mut explained_variance = Vec::new();
    let mut explained_variance_ratio = Vec::new();

    if m >= 2 {
        // Center columns
        for c in 0..dim {
            let mean = x.column(c).sum() / m as f64;
            for r in 0..m {
                x[(r, c)] -= mean;
            }
        }

        let divisor = (m - 1) as f64;
        let gram = (&x * x.transpose()) / divisor;
        let max_iter = (30 * m).max(1000);
        let eigen = SymmetricEigen::try_new(gram, f64::EPSILON, max_iter).ok_or_else(|| {
            FlexureError::Convergence("ensemble covariance eigensolver did not converge".into())
        })?;

        let mut order: Vec<usize> = (0..m).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));
        let eigenvalues: Vec<f64> = order.iter().map(|&k| eigen.eigenvalues[k]).collect();
        let total: f64 = eigenvalues.iter().filter(|&&l| l > 0.0).sum();

        if total > VARIANCE_FLOOR {
            let k = retained(&eigenvalues, total, config.retention);
            for (rank, &col) in order.iter().take(k).enumerate() {
                // λ v[a]² = (Xᵀ w)[a]² / (M - 1) for the unit Gram eigenvector w
                let w = eigen.eigenvectors.column(col);
                let projected = x.transpose() * w;
                for (i, f) in fluctuation.iter_mut().enumerate() {
                    *f += (0..3).map(|a| projected[3 * i + a].powi(2)).sum::<f64>() / divisor;
                }
                explained_variance.push(eigenvalues[rank]);
                explained_variance_ratio.push(eigenvalues[rank] / total);
            }
        }
    }

    log::info!(
        "{}: ensemble of {} members, {} principal component(s) retained",
        ensemble.reference.structure_id,
        m,
        explained_variance.len()
    );

    Ok(EnsembleVariance {
        member_rmsd,
        average_deviation,
        fluctuation,
        explained_variance,
        explained_variance_ratio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flexure_struct::{Chain, Point3D, Residue};

    fn structure(id: &str, coords: &[Point3D]) -> Structure {
        let residues = coords
            .iter()
            .enumerate()
            .map(|(i, p)| Residue::from_ca("ALA", i as i32 + 1, *p))
            .collect();
        Structure::new(id, vec![Chain::new('A', residues)])
    }

    fn base() -> Vec<Point3D> {
        vec![
            Point3D::new(0.0, 0.0, 0.0),
            Point3D::new(3.8, 0.0, 0.0),
            Point3D::new(3.8, 3.8, 0.0),
            Point3D::new(3.8, 3.8, 3.8),
            Point3D::new(7.6, 3.8, 3.8),
        ]
    }

    fn moved(last: f64) -> Vec<Point3D> {
        let mut c = base();
        c[4] = c[4].add(&Point3D::new(0.0, 0.0, last));
        c
    }

    #[test]
    fn identical_members_have_no_variance() {
        let reference = structure("REF", &base());
        let members = vec![structure("M1", &base()), structure("M2", &base())];
        let ensemble = Ensemble::from_structures(&reference, &members, &ChainSelection::All).unwrap();
        let variance = analyze_ensemble(&ensemble, &PcaConfig::default()).unwrap();
        assert!(variance.average_deviation.iter().all(|d| d.abs() < 1e-6));
        assert!(variance.fluctuation.iter().all(|f| f.abs() < 1e-9));
        assert!(variance.member_rmsd.iter().all(|(_, r)| *r < 1e-6));
        assert_eq!(variance.member_rmsd[1].0, "M2");
    }

    #[test]
    fn single_member_is_zero_variance() {
        let reference = structure("REF", &base());
        let members = vec![structure("M1", &moved(1.0))];
        let ensemble = Ensemble::from_structures(&reference, &members, &ChainSelection::All).unwrap();
        let variance = analyze_ensemble(&ensemble, &PcaConfig::default()).unwrap();
        assert_eq!(variance.n_components(), 0);
        assert!(variance.fluctuation.iter().all(|&f| f == 0.0));
        assert!(variance.member_rmsd[0].1 > 0.0);
    }

    #[test]
    fn moving_residue_dominates_fluctuation() {
        let reference = structure("REF", &base());
        let members = vec![
            structure("M1", &moved(1.5)),
            structure("M2", &moved(-1.5)),
            structure("M3", &moved(0.5)),
        ];
        let ensemble = Ensemble::from_structures(&reference, &members, &ChainSelection::All).unwrap();
        let variance = analyze_ensemble(&ensemble, &PcaConfig::default()).unwrap();
        let top = variance
            .fluctuation
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(top, Some(4));
        let ratio: f64 = variance.explained_variance_ratio.iter().sum();
        assert!(ratio >= 0.9 - 1e-9 && ratio <= 1.0 + 1e-9);
        assert!(variance.summary().contains("3 members"));
    }

    #[test]
    fn fluctuation_over_all_components_is_total_variance() {
        let reference = structure("REF", &base());
        let members = vec![
            structure("M1", &moved(1.0)),
            structure("M2", &moved(-0.5)),
            structure("M3", &moved(0.2)),
        ];
        let ensemble = Ensemble::from_structures(&reference, &members, &ChainSelection::All).unwrap();
        let config = PcaConfig {
            retention: PcaRetention::Fraction(1.0),
        };
        let variance = analyze_ensemble(&ensemble, &config).unwrap();
        let sum_fluct: f64 = variance.fluctuation.iter().sum();
        let sum_var: f64 = variance.explained_variance.iter().sum();
        assert!((sum_fluct - sum_var).abs() < 1e-9);
    }

    #[test]
    fn mismatched_member_rejected() {
        let reference = structure("REF", &base());
        let members = vec![structure("SHORT", &base()[..4])];
        let err = Ensemble::from_structures(&reference, &members, &ChainSelection::All).unwrap_err();
        assert!(matches!(err, FlexureError::DimensionMismatch(_)));
    }

    #[test]
    fn empty_ensemble_rejected() {
        let reference = build_table(&structure("REF", &base()), &ChainSelection::All).unwrap();
        assert!(matches!(
            Ensemble::new(reference, vec![]),
            Err(FlexureError::InvalidInput(_))
        ));
    }

    #[test]
    fn retention_rules() {
        let eigenvalues = [6.0, 3.0, 1.0, 0.0];
        assert_eq!(retained(&eigenvalues, 10.0, PcaRetention::Fraction(0.9)), 2);
        assert_eq!(retained(&eigenvalues, 10.0, PcaRetention::Fraction(0.5)), 1);
        assert_eq!(retained(&eigenvalues, 10.0, PcaRetention::Fraction(1.0)), 3);
        assert_eq!(retained(&eigenvalues, 10.0, PcaRetention::Count(10)), 3);
        assert_eq!(retained(&eigenvalues, 10.0, PcaRetention::Count(1)), 1);
    }
}

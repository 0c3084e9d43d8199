//! Normal modes of the elastic network.
//!
//! The Hessian is diagonalized once; eigenpairs are sorted ascending by
//! eigenvalue (a stable sort, so ties keep the solver's order) and the
//! lowest modes are classified as rigid-body (zero) modes. Everything
//! downstream (fluctuations, the pseudo-inverse, hinge detection) reads the
//! resulting [`ModeSet`] without modifying it.

use std::fmt;

use flexure_core::{FlexureError, Result, Summarizable};
use flexure_struct::Point3D;
use nalgebra::{DMatrix, SymmetricEigen};

use crate::config::ModeConfig;
use crate::network::ElasticNetwork;

/// Rigid-body modes of a single connected body in 3D.
pub const RIGID_BODY_MODES: usize = 6;

/// Raised when the network falls apart into more than one rigid body.
///
/// This is a diagnostic, not an error: the modes are still usable but the
/// zero set is larger than six.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DisconnectedNetworkWarning {
    /// Eigenvalues classified as zero.
    pub zero_modes: usize,
    /// Residues with no spring at all.
    pub isolated: Vec<usize>,
}

impl fmt::Display for DisconnectedNetworkWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "disconnected elastic network: {} zero modes",
            self.zero_modes
        )?;
        if !self.isolated.is_empty() {
            write!(f, ", {} isolated residue(s)", self.isolated.len())?;
        }
        Ok(())
    }
}

/// One eigenpair, with its 1-based position in the full spectrum.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mode {
    pub index: usize,
    pub eigenvalue: f64,
    pub is_zero: bool,
    /// Per-residue displacement vectors.
    pub displacements: Vec<Point3D>,
}

/// Sorted eigendecomposition of a Hessian.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModeSet {
    /// Eigenvalues in ascending order.
    pub eigenvalues: Vec<f64>,
    /// Eigenvectors as columns, in the order of `eigenvalues`.
    pub eigenvectors: DMatrix<f64>,
    /// Number of residues (the matrix is 3N × 3N).
    pub n_residues: usize,
    /// The first `n_zero` modes are rigid-body modes.
    pub n_zero: usize,
    pub warning: Option<DisconnectedNetworkWarning>,
}

/// Eigenvalues below this count as zero: `epsilon` relative to the stiffest
/// mode, so the cut follows the spring constants and the network size.
fn zero_threshold(eigenvalues: &[f64], epsilon: f64) -> f64 {
    let largest = eigenvalues.iter().fold(0.0_f64, |m, l| m.max(l.abs()));
    epsilon * largest
}

impl ModeSet {
    /// Diagonalize a Hessian and classify its zero modes.
    ///
    /// # Errors
    ///
    /// - [`FlexureError::InvalidInput`] if the matrix is empty, not square, or
    ///   not of size 3N.
    /// - [`FlexureError::Convergence`] if the eigensolver does not converge.
    pub fn solve(hessian: &DMatrix<f64>, config: &ModeConfig) -> Result<Self> {
        let dim = hessian.nrows();
        if dim == 0 || dim != hessian.ncols() || dim % 3 != 0 {
            return Err(FlexureError::InvalidInput(format!(
                "Hessian must be a non-empty 3N x 3N matrix, got {} x {}",
                dim,
                hessian.ncols()
            )));
        }

        let max_iter = (30 * dim).max(1000);
        let eigen = SymmetricEigen::try_new(hessian.clone(), f64::EPSILON, max_iter)
            .ok_or_else(|| {
                FlexureError::Convergence(format!(
                    "symmetric eigensolver did not converge within {} iterations",
                    max_iter
                ))
            })?;

        let mut order: Vec<usize> = (0..dim).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));

        let eigenvalues: Vec<f64> = order.iter().map(|&k| eigen.eigenvalues[k]).collect();
        let eigenvectors = DMatrix::from_fn(dim, dim, |r, c| eigen.eigenvectors[(r, order[c])]);

        let threshold = zero_threshold(&eigenvalues, config.zero_epsilon);
        let below = eigenvalues
            .iter()
            .filter(|&&l| l < threshold || l <= 0.0)
            .count();
        let n_zero = if dim <= RIGID_BODY_MODES {
            dim
        } else {
            below.max(RIGID_BODY_MODES)
        };

        let warning = (dim > RIGID_BODY_MODES && below > RIGID_BODY_MODES).then(|| {
            DisconnectedNetworkWarning {
                zero_modes: n_zero,
                isolated: Vec::new(),
            }
        });
        if let Some(w) = &warning {
            log::warn!("{}", w);
        }

        log::debug!(
            "solved {} modes: {} zero (threshold {:.3e}), lowest non-zero eigenvalue {:?}",
            dim,
            n_zero,
            threshold,
            eigenvalues.get(n_zero)
        );

        Ok(Self {
            eigenvalues,
            eigenvectors,
            n_residues: dim / 3,
            n_zero,
            warning,
        })
    }

    /// Build the Hessian of a network and solve it.
    ///
    /// Isolated residues attach a [`DisconnectedNetworkWarning`] even when
    /// the eigenvalue count alone would not.
    pub fn from_network(network: &ElasticNetwork, config: &ModeConfig) -> Result<Self> {
        let mut modes = Self::solve(&network.hessian(), config)?;
        if !network.isolated.is_empty() {
            let zero_modes = modes.n_zero;
            let warning = modes.warning.get_or_insert_with(|| {
                log::warn!(
                    "elastic network has {} isolated residue(s)",
                    network.isolated.len()
                );
                DisconnectedNetworkWarning {
                    zero_modes,
                    isolated: Vec::new(),
                }
            });
            warning.isolated = network.isolated.clone();
        }
        Ok(modes)
    }

    /// Total number of modes (3N).
    pub fn len(&self) -> usize {
        self.eigenvalues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eigenvalues.is_empty()
    }

    /// Number of non-zero modes.
    pub fn n_nonzero(&self) -> usize {
        self.len() - self.n_zero
    }

    /// Mode at a 1-based spectrum index.
    pub fn mode(&self, index: usize) -> Option<Mode> {
        if index == 0 || index > self.len() {
            return None;
        }
        let k = index - 1;
        Some(Mode {
            index,
            eigenvalue: self.eigenvalues[k],
            is_zero: k < self.n_zero,
            displacements: self.displacements(k),
        })
    }

    /// Non-zero modes in ascending eigenvalue order.
    pub fn nonzero_modes(&self) -> impl Iterator<Item = Mode> + '_ {
        (self.n_zero + 1..=self.len()).filter_map(move |index| self.mode(index))
    }

    /// Vibrational frequencies, `sqrt(max(λ, 0))`, in spectrum order.
    pub fn frequencies(&self) -> Vec<f64> {
        self.eigenvalues.iter().map(|l| l.max(0.0).sqrt()).collect()
    }

    /// Per-residue displacement vectors of the mode at 0-based column `k`.
    fn displacements(&self, k: usize) -> Vec<Point3D> {
        let column = self.eigenvectors.column(k);
        (0..self.n_residues)
            .map(|i| Point3D::new(column[3 * i], column[3 * i + 1], column[3 * i + 2]))
            .collect()
    }

    /// Mean-square fluctuation per residue: `Σ |u_m(i)|² / λ_m` over the
    /// non-zero modes.
    pub fn msf(&self) -> Vec<f64> {
        let mut msf = vec![0.0; self.n_residues];
        for k in self.n_zero..self.len() {
            let lambda = self.eigenvalues[k];
            let column = self.eigenvectors.column(k);
            for (i, value) in msf.iter_mut().enumerate() {
                let sq: f64 = (0..3).map(|d| column[3 * i + d].powi(2)).sum();
                *value += sq / lambda;
            }
        }
        msf
    }

    /// Moore-Penrose pseudo-inverse of the Hessian restricted to the
    /// non-zero modes: `Σ v vᵀ / λ`.
    ///
    /// # Errors
    ///
    /// [`FlexureError::SingularHessian`] when every mode is a zero mode.
    pub fn pseudo_inverse(&self) -> Result<DMatrix<f64>> {
        if self.n_nonzero() == 0 {
            return Err(FlexureError::SingularHessian(format!(
                "all {} modes are zero modes",
                self.len()
            )));
        }
        let v = self.eigenvectors.columns(self.n_zero, self.n_nonzero());
        let inv_lambda = nalgebra::DVector::from_iterator(
            self.n_nonzero(),
            self.eigenvalues[self.n_zero..].iter().map(|l| 1.0 / l),
        );
        let scaled = DMatrix::from_fn(v.nrows(), v.ncols(), |r, c| v[(r, c)] * inv_lambda[c]);
        Ok(scaled * v.transpose())
    }

    /// Normalized residue cross-correlation:
    /// `C(i, j) = tr G_ij / sqrt(tr G_ii · tr G_jj)`.
    ///
    /// Residues with no fluctuation correlate with nothing (0.0).
    pub fn cross_correlation(&self) -> Result<DMatrix<f64>> {
        let g = self.pseudo_inverse()?;
        let n = self.n_residues;
        let trace = |i: usize, j: usize| -> f64 { (0..3).map(|d| g[(3 * i + d, 3 * j + d)]).sum() };
        let diag: Vec<f64> = (0..n).map(|i| trace(i, i)).collect();
        Ok(DMatrix::from_fn(n, n, |i, j| {
            let norm = (diag[i] * diag[j]).sqrt();
            if norm > 0.0 {
                trace(i, j) / norm
            } else {
                0.0
            }
        }))
    }
}

impl Summarizable for ModeSet {
    fn summary(&self) -> String {
        format!(
            "ModeSet: {} modes over {} residues, {} zero{}",
            self.len(),
            self.n_residues,
            self.n_zero,
            if self.warning.is_some() {
                " (disconnected)"
            } else {
                ""
            }
        )
    }
}

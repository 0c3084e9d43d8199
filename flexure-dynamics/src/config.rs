//! Configuration for every stage of the dynamics pipeline.
//!
//! All settings are plain values with `Default` impls, grouped under
//! [`DynamicsConfig`] and passed by shared reference. Nothing reads global
//! state.

use flexure_core::{FlexureError, Result};
use flexure_struct::{ChainSelection, MaxAccessibility};

/// Spring constant assigned to a network edge.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpringModel {
    /// Every edge gets the same constant.
    Uniform { gamma: f64 },
    /// `k = gamma / d^exponent`.
    DistanceWeighted { gamma: f64, exponent: f64 },
}

impl SpringModel {
    /// Spring constant for an edge of length `distance`.
    pub fn constant(&self, distance: f64) -> f64 {
        match *self {
            SpringModel::Uniform { gamma } => gamma,
            SpringModel::DistanceWeighted { gamma, exponent } => gamma / distance.powf(exponent),
        }
    }
}

impl Default for SpringModel {
    fn default() -> Self {
        SpringModel::Uniform { gamma: 1.0 }
    }
}

/// Elastic network construction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkConfig {
    /// Pairs closer than this (Å, inclusive) are connected.
    pub cutoff: f64,
    pub spring: SpringModel,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            cutoff: 15.0,
            spring: SpringModel::default(),
        }
    }
}

/// Normal mode classification.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModeConfig {
    /// Eigenvalues below this fraction of the largest eigenvalue count as
    /// zero modes.
    pub zero_epsilon: f64,
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self { zero_epsilon: 1e-10 }
    }
}

/// How many principal components to keep.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PcaRetention {
    /// Smallest k whose cumulative explained-variance fraction reaches this.
    Fraction(f64),
    /// Exactly this many components (fewer if the data has fewer).
    Count(usize),
}

/// Ensemble PCA.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PcaConfig {
    pub retention: PcaRetention,
}

impl Default for PcaConfig {
    fn default() -> Self {
        Self {
            retention: PcaRetention::Fraction(0.9),
        }
    }
}

/// Which modes the hinge detector inspects.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModeSelection {
    /// The first `n` non-zero modes.
    Lowest(usize),
    /// Explicit 1-based indices into the full spectrum.
    Indices(Vec<usize>),
}

/// Axis a residue's mode displacement is projected on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HingeAxis {
    /// Dominant direction of the mode's displacement field.
    #[default]
    Principal,
    /// Local chain direction from residue i to i+1.
    Backbone,
}

/// Hinge detection.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HingeConfig {
    pub modes: ModeSelection,
    pub axis: HingeAxis,
    /// Fraction of the largest displacement below which a residue is still.
    pub near_zero_fraction: f64,
    /// Shortest run of still residues reported as a hinge.
    pub min_stretch: usize,
}

impl Default for HingeConfig {
    fn default() -> Self {
        Self {
            modes: ModeSelection::Lowest(6),
            axis: HingeAxis::default(),
            near_zero_fraction: 0.05,
            min_stretch: 3,
        }
    }
}

/// Mechanical stiffness.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StiffnessConfig {
    /// Pairs whose projected relative displacement falls below this are
    /// left out of the average.
    pub min_projected_displacement: f64,
}

impl Default for StiffnessConfig {
    fn default() -> Self {
        Self {
            min_projected_displacement: 1e-9,
        }
    }
}

/// Settings for the whole annotation pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DynamicsConfig {
    pub network: NetworkConfig,
    pub modes: ModeConfig,
    pub pca: PcaConfig,
    pub hinge: HingeConfig,
    pub stiffness: StiffnessConfig,
    pub selection: ChainSelection,
    /// Reference areas for relative accessibility.
    pub accessibility: MaxAccessibility,
}

impl DynamicsConfig {
    /// Reject settings no stage can work with.
    ///
    /// # Errors
    ///
    /// [`FlexureError::InvalidInput`] naming the offending setting.
    pub fn validate(&self) -> Result<()> {
        if !(self.network.cutoff > 0.0) || !self.network.cutoff.is_finite() {
            return Err(invalid(format!(
                "cutoff must be a positive distance, got {}",
                self.network.cutoff
            )));
        }
        match self.network.spring {
            SpringModel::Uniform { gamma } | SpringModel::DistanceWeighted { gamma, .. }
                if !(gamma > 0.0) =>
            {
                return Err(invalid(format!("spring gamma must be positive, got {}", gamma)));
            }
            SpringModel::DistanceWeighted { exponent, .. } if !exponent.is_finite() => {
                return Err(invalid(format!("spring exponent must be finite, got {}", exponent)));
            }
            _ => {}
        }
        if !(self.modes.zero_epsilon >= 0.0 && self.modes.zero_epsilon < 1.0) {
            return Err(invalid(format!(
                "zero_epsilon must lie in [0, 1), got {}",
                self.modes.zero_epsilon
            )));
        }
        match self.pca.retention {
            PcaRetention::Fraction(f) if !(f > 0.0 && f <= 1.0) => {
                return Err(invalid(format!(
                    "retention fraction must lie in (0, 1], got {}",
                    f
                )));
            }
            PcaRetention::Count(0) => {
                return Err(invalid("retention count must be at least 1".into()));
            }
            _ => {}
        }
        match &self.hinge.modes {
            ModeSelection::Lowest(0) => {
                return Err(invalid("hinge mode count must be at least 1".into()));
            }
            ModeSelection::Indices(indices) if indices.is_empty() => {
                return Err(invalid("hinge mode index list is empty".into()));
            }
            _ => {}
        }
        if !(self.hinge.near_zero_fraction >= 0.0 && self.hinge.near_zero_fraction < 1.0) {
            return Err(invalid(format!(
                "near_zero_fraction must lie in [0, 1), got {}",
                self.hinge.near_zero_fraction
            )));
        }
        if self.hinge.min_stretch == 0 {
            return Err(invalid("min_stretch must be at least 1".into()));
        }
        if !(self.stiffness.min_projected_displacement >= 0.0) {
            return Err(invalid(format!(
                "min_projected_displacement must be non-negative, got {}",
                self.stiffness.min_projected_displacement
            )));
        }
        Ok(())
    }
}

fn invalid(msg: String) -> FlexureError {
    FlexureError::InvalidInput(msg)
}

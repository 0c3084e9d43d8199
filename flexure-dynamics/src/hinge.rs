//! Hinge sites in low-frequency modes.
//!
//! A hinge separates parts of the chain moving in opposite directions. Each
//! residue's mode displacement is projected on an axis; a sign change of the
//! projection between consecutive residues of one chain marks a crossing,
//! and a long enough run of nearly motionless residues marks a pivot.

use std::collections::BTreeSet;

use flexure_core::{FlexureError, Result, Summarizable};
use flexure_struct::{symmetric_eigen_3x3, unit_vector, Matrix3x3, Point3D, ResidueId, ResidueTable};

use crate::config::{HingeAxis, HingeConfig, ModeSelection};
use crate::modes::{Mode, ModeSet};

/// Hinge residues found in one mode.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HingeSites {
    /// 1-based spectrum index of the mode.
    pub mode_index: usize,
    pub label: String,
    /// Sorted, unique residue positions.
    pub positions: Vec<usize>,
    pub residues: Vec<ResidueId>,
}

impl Summarizable for HingeSites {
    fn summary(&self) -> String {
        format!("{}: {} residue(s)", self.label, self.positions.len())
    }
}

/// Resolve the configured selection to modes, in request order.
fn select_modes(modes: &ModeSet, selection: &ModeSelection) -> Result<Vec<Mode>> {
    match selection {
        ModeSelection::Lowest(count) => Ok(modes.nonzero_modes().take(*count).collect()),
        ModeSelection::Indices(indices) => indices
            .iter()
            .map(|&index| {
                let mode = modes.mode(index).ok_or_else(|| {
                    FlexureError::InvalidInput(format!(
                        "mode index {} outside 1..={}",
                        index,
                        modes.len()
                    ))
                })?;
                if mode.is_zero {
                    return Err(FlexureError::InvalidInput(format!(
                        "mode {} is a rigid-body mode (first {} are zero)",
                        index, modes.n_zero
                    )));
                }
                Ok(mode)
            })
            .collect(),
    }
}

/// Dominant direction of a displacement field, sign fixed so that its
/// largest component is positive.
fn principal_axis(displacements: &[Point3D]) -> Point3D {
    let mut scatter = Matrix3x3::zeros();
    for u in displacements {
        scatter = scatter.add(&Matrix3x3::outer(u, u));
    }
    let (_, vectors) = symmetric_eigen_3x3(&scatter);
    let axis = Point3D::new(vectors.data[0][0], vectors.data[1][0], vectors.data[2][0]);
    let largest = axis
        .to_array()
        .into_iter()
        .max_by(|a, b| a.abs().total_cmp(&b.abs()))
        .unwrap_or(0.0);
    if largest < 0.0 {
        axis.scale(-1.0)
    } else {
        axis
    }
}

/// Local chain direction at residue `i`: towards the next residue of the
/// same chain, or from the previous one at a chain end.
fn backbone_axis(table: &ResidueTable, i: usize) -> Point3D {
    let n = table.len();
    let forward = (i + 1 < n && table.same_chain(i, i + 1))
        .then(|| unit_vector(&table.coords[i], &table.coords[i + 1]))
        .flatten();
    let backward = || {
        (i > 0 && table.same_chain(i - 1, i))
            .then(|| unit_vector(&table.coords[i - 1], &table.coords[i]))
            .flatten()
    };
    forward
        .or_else(backward)
        .map(|(e, _)| e)
        .unwrap_or_else(Point3D::zero)
}

fn projections(mode: &Mode, table: &ResidueTable, axis: HingeAxis) -> Vec<f64> {
    match axis {
        HingeAxis::Principal => {
            let e = principal_axis(&mode.displacements);
            mode.displacements.iter().map(|u| u.dot(&e)).collect()
        }
        HingeAxis::Backbone => mode
            .displacements
            .iter()
            .enumerate()
            .map(|(i, u)| u.dot(&backbone_axis(table, i)))
            .collect(),
    }
}

fn hinge_positions(mode: &Mode, table: &ResidueTable, config: &HingeConfig) -> BTreeSet<usize> {
    let n = table.len();
    let mut flagged = BTreeSet::new();

    let proj = projections(mode, table, config.axis);
    for i in 0..n.saturating_sub(1) {
        if !table.same_chain(i, i + 1) {
            continue;
        }
        if proj[i] * proj[i + 1] < 0.0 {
            flagged.insert(if proj[i].abs() <= proj[i + 1].abs() {
                i
            } else {
                i + 1
            });
        }
    }

    let magnitude: Vec<f64> = mode.displacements.iter().map(|u| u.norm()).collect();
    let largest = magnitude.iter().cloned().fold(0.0, f64::max);
    if largest > 0.0 {
        let threshold = config.near_zero_fraction * largest;
        let mut start = 0;
        while start < n {
            if magnitude[start] >= threshold {
                start += 1;
                continue;
            }
            let mut end = start + 1;
            while end < n && magnitude[end] < threshold && table.same_chain(end - 1, end) {
                end += 1;
            }
            if end - start >= config.min_stretch {
                flagged.extend(start..end);
            }
            start = end;
        }
    }

    flagged
}

/// Hinge residues of each selected mode.
///
/// # Errors
///
/// - [`FlexureError::DimensionMismatch`] when the table and modes disagree
///   on the residue count.
/// - [`FlexureError::InvalidInput`] for an explicit mode index that is out
///   of range or names a rigid-body mode.
pub fn detect_hinges(
    modes: &ModeSet,
    table: &ResidueTable,
    config: &HingeConfig,
) -> Result<Vec<HingeSites>> {
    if modes.n_residues != table.len() {
        return Err(FlexureError::DimensionMismatch(format!(
            "{} modes cover {} residues, table has {}",
            table.structure_id,
            modes.n_residues,
            table.len()
        )));
    }

    let selected = select_modes(modes, &config.modes)?;
    let sites: Vec<HingeSites> = selected
        .iter()
        .map(|mode| {
            let positions: Vec<usize> = hinge_positions(mode, table, config).into_iter().collect();
            HingeSites {
                mode_index: mode.index,
                label: format!("Hinge sites for mode {}", mode.index),
                residues: positions.iter().map(|&i| table.ids[i]).collect(),
                positions,
            }
        })
        .collect();

    log::debug!(
        "{}: hinge detection over {} mode(s)",
        table.structure_id,
        sites.len()
    );
    Ok(sites)
}

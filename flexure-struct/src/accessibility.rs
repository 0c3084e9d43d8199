//! Relative solvent accessibility from externally computed exposed areas.
//!
//! Raw per-residue exposed surface area comes from a DSSP run performed by
//! the caller. This module restricts it to the selected chains and divides
//! by the maximal exposure of the residue type in a G-X-G tripeptide.

use std::collections::{BTreeMap, HashMap};

use flexure_core::{FlexureError, Result};

use crate::selection::ChainSelection;
use crate::types::{ResidueId, Structure};

/// Maximal exposed area per residue type, in Å².
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaxAccessibility {
    areas: HashMap<String, f64>,
}

impl MaxAccessibility {
    /// Chothia (1976) G-X-G reference areas.
    pub fn chothia() -> Self {
        let table: [(&str, f64); 20] = [
            ("ALA", 115.0),
            ("ARG", 225.0),
            ("ASN", 160.0),
            ("ASP", 150.0),
            ("CYS", 135.0),
            ("GLN", 180.0),
            ("GLU", 190.0),
            ("GLY", 75.0),
            ("HIS", 195.0),
            ("ILE", 175.0),
            ("LEU", 170.0),
            ("LYS", 200.0),
            ("MET", 185.0),
            ("PHE", 210.0),
            ("PRO", 145.0),
            ("SER", 115.0),
            ("THR", 140.0),
            ("TRP", 255.0),
            ("TYR", 230.0),
            ("VAL", 155.0),
        ];
        Self {
            areas: table
                .iter()
                .map(|(name, area)| (name.to_string(), *area))
                .collect(),
        }
    }

    /// Custom reference table keyed by three-letter residue name.
    ///
    /// # Errors
    ///
    /// [`FlexureError::InvalidInput`] if any reference area is not positive.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut areas = HashMap::new();
        for (name, area) in pairs {
            let name = name.into().trim().to_ascii_uppercase();
            if !(area > 0.0) {
                return Err(FlexureError::InvalidInput(format!(
                    "reference area for {} must be positive, got {}",
                    name, area
                )));
            }
            areas.insert(name, area);
        }
        Ok(Self { areas })
    }

    /// Reference area for a residue type. Selenomethionine uses MET.
    pub fn get(&self, residue_name: &str) -> Option<f64> {
        let key = residue_name.trim().to_ascii_uppercase();
        let key = if key == "MSE" { "MET".to_string() } else { key };
        self.areas.get(&key).copied()
    }
}

impl Default for MaxAccessibility {
    fn default() -> Self {
        Self::chothia()
    }
}

/// Relative solvent accessibility for the selected residues, in file order.
///
/// Residues absent from `raw_areas`, or whose type has no reference area,
/// are skipped and logged.
///
/// # Errors
///
/// - [`FlexureError::EmptySelection`] when the selection matches no residue.
/// - [`FlexureError::InvalidInput`] for a negative or non-finite raw area.
pub fn relative_accessibility(
    structure: &Structure,
    raw_areas: &BTreeMap<ResidueId, f64>,
    selection: &ChainSelection,
    reference: &MaxAccessibility,
) -> Result<Vec<(ResidueId, f64)>> {
    let mut selected = 0usize;
    let mut result = Vec::new();

    for chain in structure.chains.iter().filter(|c| selection.includes(c.id)) {
        for residue in &chain.residues {
            selected += 1;
            let id = ResidueId {
                chain: chain.id,
                seq_num: residue.seq_num,
                i_code: residue.i_code,
            };
            let Some(&raw) = raw_areas.get(&id) else {
                log::warn!("{}: no exposed area for residue {}", structure.id, id);
                continue;
            };
            if !raw.is_finite() || raw < 0.0 {
                return Err(FlexureError::InvalidInput(format!(
                    "exposed area for residue {} must be a non-negative number, got {}",
                    id, raw
                )));
            }
            let Some(max_area) = reference.get(&residue.name) else {
                log::warn!(
                    "{}: no reference area for residue type {} ({})",
                    structure.id,
                    residue.name,
                    id
                );
                continue;
            };
            result.push((id, raw / max_area));
        }
    }

    if selected == 0 {
        return Err(FlexureError::EmptySelection(format!(
            "chain selection matched no residues in structure {}",
            structure.id
        )));
    }

    log::debug!(
        "{}: relative accessibility for {} of {} selected residues",
        structure.id,
        result.len(),
        selected
    );
    Ok(result)
}

//! Chain selection and the flattened residue table.
//!
//! A [`ResidueTable`] is the arena every residue-level model indexes into:
//! position `i` in the table is residue `i` of the elastic network, row `i`
//! of the response matrix, and entry `i` of every annotation profile.

use std::collections::BTreeSet;

use flexure_core::{FlexureError, Result, Summarizable};

use crate::types::{Point3D, ResidueId, Structure};

/// Which chains of a structure take part in a calculation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChainSelection {
    /// Every chain present in the structure.
    #[default]
    All,
    /// Only the listed chains.
    Chains(BTreeSet<char>),
}

impl ChainSelection {
    /// Selection of the given chain labels.
    pub fn chains<I: IntoIterator<Item = char>>(ids: I) -> Self {
        ChainSelection::Chains(ids.into_iter().collect())
    }

    /// Whether a chain label is selected.
    pub fn includes(&self, chain: char) -> bool {
        match self {
            ChainSelection::All => true,
            ChainSelection::Chains(ids) => ids.contains(&chain),
        }
    }

    fn describe(&self) -> String {
        match self {
            ChainSelection::All => "all chains".into(),
            ChainSelection::Chains(ids) => {
                let labels: Vec<String> = ids.iter().map(|c| c.to_string()).collect();
                format!("chains [{}]", labels.join(", "))
            }
        }
    }
}

/// Residues of one structure restricted to a chain selection, in file order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResidueTable {
    /// Identifier of the structure the table was built from.
    pub structure_id: String,
    /// Residue identifiers.
    pub ids: Vec<ResidueId>,
    /// Three-letter residue names.
    pub names: Vec<String>,
    /// Representative (CA) coordinates.
    pub coords: Vec<Point3D>,
}

impl ResidueTable {
    /// Table from parallel vectors.
    ///
    /// # Errors
    ///
    /// [`FlexureError::DimensionMismatch`] when the vectors differ in length.
    pub fn new(
        structure_id: impl Into<String>,
        ids: Vec<ResidueId>,
        names: Vec<String>,
        coords: Vec<Point3D>,
    ) -> Result<Self> {
        if ids.len() != names.len() || ids.len() != coords.len() {
            return Err(FlexureError::DimensionMismatch(format!(
                "residue table columns differ: {} ids, {} names, {} coords",
                ids.len(),
                names.len(),
                coords.len()
            )));
        }
        Ok(Self {
            structure_id: structure_id.into(),
            ids,
            names,
            coords,
        })
    }

    /// Number of residues.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the table has no residues.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Position of a residue in the table.
    pub fn position(&self, id: &ResidueId) -> Option<usize> {
        self.ids.iter().position(|r| r == id)
    }

    /// Whether residues `i` and `j` belong to the same chain.
    pub fn same_chain(&self, i: usize, j: usize) -> bool {
        self.ids[i].chain == self.ids[j].chain
    }

    /// Check that `other` lists exactly the same residues in the same order.
    ///
    /// # Errors
    ///
    /// [`FlexureError::DimensionMismatch`] naming the first disagreement.
    pub fn ensure_same_residues(&self, other: &ResidueTable) -> Result<()> {
        if self.len() != other.len() {
            return Err(FlexureError::DimensionMismatch(format!(
                "{} has {} residues but {} has {}",
                self.structure_id,
                self.len(),
                other.structure_id,
                other.len()
            )));
        }
        if let Some((a, b)) = self.ids.iter().zip(&other.ids).find(|(a, b)| a != b) {
            return Err(FlexureError::DimensionMismatch(format!(
                "residue order differs between {} and {}: {} vs {}",
                self.structure_id, other.structure_id, a, b
            )));
        }
        Ok(())
    }

    /// Same residues with new coordinates (e.g. after superposition).
    pub fn with_coords(&self, coords: Vec<Point3D>) -> Result<Self> {
        ResidueTable::new(
            self.structure_id.clone(),
            self.ids.clone(),
            self.names.clone(),
            coords,
        )
    }
}

impl Summarizable for ResidueTable {
    fn summary(&self) -> String {
        let chains: BTreeSet<char> = self.ids.iter().map(|id| id.chain).collect();
        format!(
            "ResidueTable {}: {} residue(s) over {} chain(s)",
            self.structure_id,
            self.len(),
            chains.len()
        )
    }
}

/// Flatten the selected chains of a structure into a [`ResidueTable`].
///
/// Residues without an alpha carbon are skipped.
///
/// # Errors
///
/// [`FlexureError::EmptySelection`] when the selection matches no residue
/// with a representative coordinate.
pub fn build_table(structure: &Structure, selection: &ChainSelection) -> Result<ResidueTable> {
    let mut ids = Vec::new();
    let mut names = Vec::new();
    let mut coords = Vec::new();
    let mut skipped = 0usize;

    for chain in structure.chains.iter().filter(|c| selection.includes(c.id)) {
        for residue in &chain.residues {
            match residue.representative() {
                Some(ca) => {
                    ids.push(ResidueId {
                        chain: chain.id,
                        seq_num: residue.seq_num,
                        i_code: residue.i_code,
                    });
                    names.push(residue.name.clone());
                    coords.push(ca);
                }
                None => skipped += 1,
            }
        }
    }

    if skipped > 0 {
        log::debug!(
            "{}: skipped {} residue(s) without a CA atom",
            structure.id,
            skipped
        );
    }

    if ids.is_empty() {
        return Err(FlexureError::EmptySelection(format!(
            "{} matched no residues in structure {}",
            selection.describe(),
            structure.id
        )));
    }

    ResidueTable::new(structure.id.clone(), ids, names, coords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Atom, Chain, Residue};

    fn two_chain_structure() -> Structure {
        let chain_a = Chain::new(
            'A',
            vec![
                Residue::from_ca("ALA", 1, Point3D::new(0.0, 0.0, 0.0)),
                Residue::from_ca("GLY", 2, Point3D::new(3.8, 0.0, 0.0)),
            ],
        );
        let chain_b = Chain::new(
            'B',
            vec![
                Residue::from_ca("VAL", 1, Point3D::new(0.0, 5.0, 0.0)),
                Residue {
                    name: "HOH".into(),
                    seq_num: 101,
                    i_code: None,
                    atoms: vec![Atom::new("O", Point3D::new(9.0, 9.0, 9.0))],
                },
            ],
        );
        Structure::new("2CH", vec![chain_a, chain_b])
    }

    #[test]
    fn all_chains_flattened_in_order() {
        let table = build_table(&two_chain_structure(), &ChainSelection::All).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.ids[0], ResidueId::new('A', 1));
        assert_eq!(table.ids[2], ResidueId::new('B', 1));
        assert_eq!(table.names[1], "GLY");
        assert!(table.summary().contains("2 chain"));
    }

    #[test]
    fn explicit_chain_filter() {
        let table =
            build_table(&two_chain_structure(), &ChainSelection::chains(['B'])).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.ids[0].chain, 'B');
    }

    #[test]
    fn empty_selection_is_an_error() {
        let err = build_table(&two_chain_structure(), &ChainSelection::chains(['Z'])).unwrap_err();
        assert!(matches!(err, FlexureError::EmptySelection(_)));

        let err =
            build_table(&two_chain_structure(), &ChainSelection::Chains(BTreeSet::new())).unwrap_err();
        assert!(matches!(err, FlexureError::EmptySelection(_)));
    }

    #[test]
    fn ensure_same_residues_detects_order() {
        let s = two_chain_structure();
        let a = build_table(&s, &ChainSelection::All).unwrap();
        let mut b = a.clone();
        b.ids.swap(0, 1);
        assert!(a.ensure_same_residues(&a).is_ok());
        assert!(matches!(
            a.ensure_same_residues(&b),
            Err(FlexureError::DimensionMismatch(_))
        ));
        let c = build_table(&s, &ChainSelection::chains(['A'])).unwrap();
        assert!(a.ensure_same_residues(&c).is_err());
    }

    #[test]
    fn table_columns_must_agree() {
        let err = ResidueTable::new("X", vec![ResidueId::new('A', 1)], vec![], vec![]).unwrap_err();
        assert!(matches!(err, FlexureError::DimensionMismatch(_)));
    }
}

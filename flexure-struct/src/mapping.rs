//! Residue-number mapping from PDB numbering onto a reference sequence.
//!
//! A [`SegmentMapping`] describes one contiguous SIFTS-style correspondence
//! between PDB residue numbers of a chain and positions in a UniProt
//! sequence. [`map_segment`] walks it and records which observed residues
//! land where, collecting one-letter disagreements along the way.

use std::collections::BTreeMap;

use flexure_core::{FlexureError, Result, Summarizable};

use crate::types::{Chain, ResidueId};

/// Contiguous PDB ↔ reference-sequence residue range (both ends inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentMapping {
    /// Chain the PDB numbers refer to.
    pub chain: char,
    pub pdb_start: i32,
    pub pdb_end: i32,
    /// 1-based position in the reference sequence.
    pub unp_start: i32,
    pub unp_end: i32,
}

/// An observed residue whose type disagrees with the reference sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mismatch {
    pub pdb_num: i32,
    pub observed: char,
    pub reference: char,
}

/// Result of walking a segment: PDB number → reference position.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResidueMapping {
    pub chain: char,
    pub positions: BTreeMap<i32, i32>,
    pub mismatches: Vec<Mismatch>,
}

impl ResidueMapping {
    /// Reference position of a residue, if it was mapped.
    ///
    /// Residues with an insertion code have no reference position.
    pub fn map(&self, id: &ResidueId) -> Option<ResidueId> {
        if id.chain != self.chain || id.i_code.is_some() {
            return None;
        }
        self.positions
            .get(&id.seq_num)
            .map(|&unp| ResidueId::new(self.chain, unp))
    }

    /// Number of mapped residues.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl Summarizable for ResidueMapping {
    fn summary(&self) -> String {
        format!(
            "ResidueMapping chain {}: {} mapped, {} mismatch(es)",
            self.chain,
            self.positions.len(),
            self.mismatches.len()
        )
    }
}

/// One-letter codes of the residues of a chain that carry an alpha carbon,
/// keyed by sequence number. Insertion-coded residues are left out.
pub fn observed_residues(chain: &Chain) -> BTreeMap<i32, char> {
    chain
        .residues
        .iter()
        .filter(|r| r.i_code.is_none() && r.get_alpha_carbon().is_some())
        .map(|r| (r.seq_num, r.one_letter_code().unwrap_or('X')))
        .collect()
}

/// Map the observed residues of a segment onto the reference sequence.
///
/// For offset `k` within the segment, PDB number `pdb_start + k` maps to
/// reference position `unp_start + k` when that residue was observed.
///
/// # Errors
///
/// [`FlexureError::InvalidInput`] if the segment is inverted, its two ranges
/// differ in length, or it falls outside the reference sequence.
pub fn map_segment(
    segment: &SegmentMapping,
    observed: &BTreeMap<i32, char>,
    reference_sequence: &str,
) -> Result<ResidueMapping> {
    if segment.pdb_end < segment.pdb_start || segment.unp_end < segment.unp_start {
        return Err(FlexureError::InvalidInput(format!(
            "inverted segment: PDB {}..{}, reference {}..{}",
            segment.pdb_start, segment.pdb_end, segment.unp_start, segment.unp_end
        )));
    }
    if segment.pdb_end - segment.pdb_start != segment.unp_end - segment.unp_start {
        return Err(FlexureError::InvalidInput(format!(
            "segment ranges differ in length: PDB {}..{} vs reference {}..{}",
            segment.pdb_start, segment.pdb_end, segment.unp_start, segment.unp_end
        )));
    }

    let reference: Vec<char> = reference_sequence.chars().collect();
    if segment.unp_start < 1 || segment.unp_end as usize > reference.len() {
        return Err(FlexureError::InvalidInput(format!(
            "reference range {}..{} outside sequence of length {}",
            segment.unp_start,
            segment.unp_end,
            reference.len()
        )));
    }

    let slice = &reference[(segment.unp_start - 1) as usize..segment.unp_end as usize];
    let mut positions = BTreeMap::new();
    let mut mismatches = Vec::new();

    for (k, &expected) in slice.iter().enumerate() {
        let pdb_num = segment.pdb_start + k as i32;
        let Some(&seen) = observed.get(&pdb_num) else {
            continue;
        };
        if !seen.eq_ignore_ascii_case(&expected) {
            mismatches.push(Mismatch {
                pdb_num,
                observed: seen,
                reference: expected,
            });
        }
        positions.insert(pdb_num, segment.unp_start + k as i32);
    }

    if !mismatches.is_empty() {
        log::debug!(
            "chain {}: {} residue type mismatch(es) against the reference sequence",
            segment.chain,
            mismatches.len()
        );
    }

    Ok(ResidueMapping {
        chain: segment.chain,
        positions,
        mismatches,
    })
}

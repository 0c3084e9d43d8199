//! Per-residue annotation profiles and tables.
//!
//! An [`AnnotationProfile`] is the unit handed to writers and viewers: a
//! title and one value per residue, in residue order. An [`AnnotationTable`]
//! lines several profiles up against a shared residue order and renders them
//! as CSV text.

use flexure_core::{Annotated, FlexureError, Result, Summarizable};
use flexure_struct::{ResidueId, ResidueMapping, ResidueTable};

use crate::hinge::HingeSites;

/// Titled per-residue scalar profile.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnnotationProfile {
    pub title: String,
    pub entries: Vec<(ResidueId, f64)>,
}

impl AnnotationProfile {
    pub fn new(title: impl Into<String>, entries: Vec<(ResidueId, f64)>) -> Self {
        Self {
            title: title.into(),
            entries,
        }
    }

    /// Profile over every residue of a table.
    ///
    /// # Errors
    ///
    /// [`FlexureError::DimensionMismatch`] when `values` is not one per residue.
    pub fn from_table(title: impl Into<String>, table: &ResidueTable, values: &[f64]) -> Result<Self> {
        let title = title.into();
        if values.len() != table.len() {
            return Err(FlexureError::DimensionMismatch(format!(
                "{}: {} values for {} residues",
                title,
                values.len(),
                table.len()
            )));
        }
        Ok(Self {
            title,
            entries: table.ids.iter().copied().zip(values.iter().copied()).collect(),
        })
    }

    /// 1.0 at every hinge residue, 0.0 elsewhere.
    pub fn from_hinges(sites: &HingeSites, table: &ResidueTable) -> Self {
        let entries = table
            .ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let flag = if sites.positions.binary_search(&i).is_ok() {
                    1.0
                } else {
                    0.0
                };
                (*id, flag)
            })
            .collect();
        Self {
            title: sites.label.clone(),
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, v)| *v).collect()
    }

    pub fn residues(&self) -> Vec<ResidueId> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }

    /// Value for a residue.
    pub fn get(&self, id: &ResidueId) -> Option<f64> {
        self.entries.iter().find(|(r, _)| r == id).map(|(_, v)| *v)
    }

    /// Re-key onto reference-sequence numbering, dropping unmapped residues.
    pub fn remap(&self, mapping: &ResidueMapping) -> Self {
        let entries: Vec<(ResidueId, f64)> = self
            .entries
            .iter()
            .filter_map(|(id, v)| mapping.map(id).map(|mapped| (mapped, *v)))
            .collect();
        if entries.len() < self.entries.len() {
            log::debug!(
                "{}: {} of {} residues have no reference position",
                self.title,
                self.entries.len() - entries.len(),
                self.entries.len()
            );
        }
        Self {
            title: self.title.clone(),
            entries,
        }
    }
}

impl Annotated for AnnotationProfile {
    fn name(&self) -> &str {
        &self.title
    }
}

impl Summarizable for AnnotationProfile {
    fn summary(&self) -> String {
        let values = self.values();
        let (lo, hi) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if values.is_empty() {
            format!("{}: empty", self.title)
        } else {
            format!("{}: {} residues, range [{:.2}, {:.2}]", self.title, values.len(), lo, hi)
        }
    }
}

/// Profiles sharing one residue order, one column each.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnnotationTable {
    pub residues: Vec<ResidueId>,
    pub columns: Vec<AnnotationProfile>,
}

impl AnnotationTable {
    /// # Errors
    ///
    /// [`FlexureError::InvalidInput`] when the profiles disagree on their
    /// residues or their order.
    pub fn new(columns: Vec<AnnotationProfile>) -> Result<Self> {
        let mut table = Self::default();
        for column in columns {
            table.push(column)?;
        }
        Ok(table)
    }

    /// Append a column.
    ///
    /// # Errors
    ///
    /// [`FlexureError::InvalidInput`] when the profile's residues differ from
    /// those already in the table.
    pub fn push(&mut self, column: AnnotationProfile) -> Result<()> {
        let residues = column.residues();
        if self.columns.is_empty() {
            self.residues = residues;
        } else if residues != self.residues {
            return Err(FlexureError::InvalidInput(format!(
                "column '{}' has {} residues that do not line up with the table's {}",
                column.title,
                residues.len(),
                self.residues.len()
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.residues.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// CSV text: a `residue` column followed by one column per profile,
    /// values rounded to two decimals.
    ///
    /// # Errors
    ///
    /// [`FlexureError::Write`] if the CSV writer fails.
    pub fn to_csv(&self) -> Result<String> {
        self.render(None)
    }

    /// Like [`to_csv`](Self::to_csv) with an extra `reference_residue`
    /// column; residues without a reference position leave it empty.
    ///
    /// # Errors
    ///
    /// [`FlexureError::Write`] if the CSV writer fails.
    pub fn to_csv_with_mapping(&self, mapping: &ResidueMapping) -> Result<String> {
        self.render(Some(mapping))
    }

    fn render(&self, mapping: Option<&ResidueMapping>) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        let mut header = vec!["residue".to_string()];
        if mapping.is_some() {
            header.push("reference_residue".to_string());
        }
        header.extend(self.columns.iter().map(|c| c.title.clone()));
        writer
            .write_record(&header)
            .map_err(|e| FlexureError::Write(e.to_string()))?;

        for (row, id) in self.residues.iter().enumerate() {
            let mut record = vec![id.to_string()];
            if let Some(mapping) = mapping {
                record.push(
                    mapping
                        .map(id)
                        .map(|mapped| mapped.seq_num.to_string())
                        .unwrap_or_default(),
                );
            }
            record.extend(
                self.columns
                    .iter()
                    .map(|column| format!("{:.2}", column.entries[row].1)),
            );
            writer
                .write_record(&record)
                .map_err(|e| FlexureError::Write(e.to_string()))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| FlexureError::Write(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| FlexureError::Write(e.to_string()))
    }
}

impl Summarizable for AnnotationTable {
    fn summary(&self) -> String {
        format!(
            "AnnotationTable: {} residues x {} columns",
            self.n_rows(),
            self.n_columns()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flexure_struct::{Point3D, SegmentMapping};
    use std::collections::BTreeMap;

    fn table() -> ResidueTable {
        ResidueTable::new(
            "ANN",
            (1..=3).map(|i| ResidueId::new('A', i)).collect(),
            vec!["ALA".to_string(); 3],
            vec![Point3D::zero(); 3],
        )
        .unwrap()
    }

    #[test]
    fn profile_from_table() {
        let p = AnnotationProfile::from_table("MSF", &table(), &[0.1, 0.2, 0.3]).unwrap();
        assert_eq!(p.len(), 3);
        assert_eq!(p.get(&ResidueId::new('A', 2)), Some(0.2));
        assert!(p.get(&ResidueId::new('B', 2)).is_none());
        assert_eq!(p.name(), "MSF");
        assert!(p.summary().contains("[0.10, 0.30]"));
        assert!(AnnotationProfile::from_table("MSF", &table(), &[0.1]).is_err());
    }

    #[test]
    fn hinge_flags() {
        let sites = HingeSites {
            mode_index: 7,
            label: "Hinge sites for mode 7".into(),
            positions: vec![1],
            residues: vec![ResidueId::new('A', 2)],
        };
        let p = AnnotationProfile::from_hinges(&sites, &table());
        assert_eq!(p.values(), vec![0.0, 1.0, 0.0]);
        assert_eq!(p.title, "Hinge sites for mode 7");
    }

    #[test]
    fn csv_rounds_to_two_decimals() {
        let msf = AnnotationProfile::from_table("MSF", &table(), &[0.123, 1.0, 2.005]).unwrap();
        let rsa = AnnotationProfile::from_table("RSA", &table(), &[0.5, 0.25, 0.0]).unwrap();
        let t = AnnotationTable::new(vec![msf, rsa]).unwrap();
        let csv = t.to_csv().unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "residue,MSF,RSA");
        assert_eq!(lines[1], "A:1,0.12,0.50");
        assert_eq!(lines.len(), 4);
        assert!(t.summary().contains("3 residues x 2 columns"));
    }

    #[test]
    fn csv_quotes_titles_with_separators() {
        let p = AnnotationProfile::from_table("Hinge, \"mode\" 7", &table(), &[1.0, 0.0, 1.0]).unwrap();
        let csv = AnnotationTable::new(vec![p]).unwrap().to_csv().unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "residue,\"Hinge, \"\"mode\"\" 7\"");
        assert_eq!(lines[3], "A:3,1.00");
    }

    #[test]
    fn misaligned_columns_rejected() {
        let a = AnnotationProfile::from_table("A", &table(), &[1.0, 2.0, 3.0]).unwrap();
        let mut b = a.clone();
        b.entries.swap(0, 1);
        assert!(matches!(
            AnnotationTable::new(vec![a.clone(), b]),
            Err(FlexureError::InvalidInput(_))
        ));
        let short = AnnotationProfile::new("S", vec![(ResidueId::new('A', 1), 1.0)]);
        assert!(AnnotationTable::new(vec![a, short]).is_err());
    }

    #[test]
    fn remap_to_reference_numbering() {
        let segment = SegmentMapping {
            chain: 'A',
            pdb_start: 1,
            pdb_end: 3,
            unp_start: 101,
            unp_end: 103,
        };
        let observed: BTreeMap<i32, char> = [(1, 'A'), (3, 'A')].into_iter().collect();
        let reference: String = std::iter::repeat('A').take(110).collect();
        let mapping = flexure_struct::map_segment(&segment, &observed, &reference).unwrap();

        let p = AnnotationProfile::from_table("MSF", &table(), &[0.1, 0.2, 0.3]).unwrap();
        let remapped = p.remap(&mapping);
        assert_eq!(
            remapped.entries,
            vec![(ResidueId::new('A', 101), 0.1), (ResidueId::new('A', 103), 0.3)]
        );

        let csv = AnnotationTable::new(vec![p]).unwrap().to_csv_with_mapping(&mapping).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "residue,reference_residue,MSF");
        assert_eq!(lines[1], "A:1,101,0.10");
        assert_eq!(lines[2], "A:2,,0.20");
    }
}

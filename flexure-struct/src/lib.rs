//! Residue-level protein structure model for the Flexure workspace.
//!
//! - **Structure types**: chains, residues, atoms and [`ResidueId`] in [`types`]
//! - **Chain selection**: the flattened [`ResidueTable`] in [`selection`]
//! - **Coordinate geometry**: centroids, RMSD, deviations in [`geometry`]
//! - **Superposition**: Kabsch structural alignment in [`superposition`]
//! - **Accessibility**: relative solvent accessibility in [`accessibility`]
//! - **Residue mapping**: PDB to reference-sequence numbering in [`mapping`]
//!
//! # Quick start
//!
//! ```
//! use flexure_struct::{build_table, kabsch_points, ChainSelection};
//! use flexure_struct::types::{Chain, Point3D, Residue, Structure};
//! use flexure_core::Summarizable;
//!
//! let residues = vec![
//!     Residue::from_ca("ALA", 1, Point3D::new(0.0, 0.0, 0.0)),
//!     Residue::from_ca("GLY", 2, Point3D::new(3.8, 0.0, 0.0)),
//!     Residue::from_ca("VAL", 3, Point3D::new(3.8, 3.8, 0.0)),
//! ];
//! let structure = Structure::new("1TST", vec![Chain::new('A', residues)]);
//! assert!(structure.summary().contains("1TST"));
//!
//! let table = build_table(&structure, &ChainSelection::All).unwrap();
//! let fit = kabsch_points(&table.coords, &table.coords).unwrap();
//! assert!(fit.rmsd < 1e-9);
//! ```

pub mod accessibility;
pub mod geometry;
pub mod linalg;
pub mod mapping;
pub mod selection;
pub mod superposition;
pub mod types;

pub use accessibility::{relative_accessibility, MaxAccessibility};
pub use geometry::{center_of_mass_points, deviations, rmsd_points, unit_vector};
pub use linalg::{symmetric_eigen_3x3, Matrix3x3};
pub use mapping::{map_segment, observed_residues, Mismatch, ResidueMapping, SegmentMapping};
pub use selection::{build_table, ChainSelection, ResidueTable};
pub use superposition::{kabsch_points, superpose_tables, SuperpositionResult};
pub use types::{Atom, Chain, Point3D, Residue, ResidueId, Structure};

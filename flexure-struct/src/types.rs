//! Core types for macromolecular 3D structure representation.

use core::fmt;

use flexure_core::{Annotated, Summarizable};

/// A point in 3D Cartesian space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    /// Create a new point.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The origin.
    pub fn zero() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point3D) -> f64 {
        self.sub(other).norm()
    }

    /// Dot product.
    pub fn dot(&self, other: &Point3D) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product.
    pub fn cross(&self, other: &Point3D) -> Point3D {
        Point3D {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    /// Vector magnitude.
    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction, or zero if magnitude is zero.
    pub fn normalize(&self) -> Point3D {
        let n = self.norm();
        if n < 1e-15 {
            Point3D::zero()
        } else {
            self.scale(1.0 / n)
        }
    }

    /// Vector addition.
    pub fn add(&self, other: &Point3D) -> Point3D {
        Point3D {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }

    /// Vector subtraction.
    pub fn sub(&self, other: &Point3D) -> Point3D {
        Point3D {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }

    /// Scalar multiplication.
    pub fn scale(&self, s: f64) -> Point3D {
        Point3D {
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
        }
    }

    /// Components as an array, in x/y/z order.
    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f64; 3]> for Point3D {
    fn from(v: [f64; 3]) -> Self {
        Point3D::new(v[0], v[1], v[2])
    }
}

/// Identifies a residue across every annotation: chain, sequence number and
/// insertion code.
///
/// Ordering follows chain label first, then sequence number, then insertion
/// code, which matches the order residues appear in a well-formed PDB entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResidueId {
    /// Chain label.
    pub chain: char,
    /// Sequence number from the source file.
    pub seq_num: i32,
    /// Insertion code.
    pub i_code: Option<char>,
}

impl ResidueId {
    /// Residue identifier without an insertion code.
    pub fn new(chain: char, seq_num: i32) -> Self {
        Self {
            chain,
            seq_num,
            i_code: None,
        }
    }
}

impl fmt::Display for ResidueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.i_code {
            Some(code) => write!(f, "{}:{}{}", self.chain, self.seq_num, code),
            None => write!(f, "{}:{}", self.chain, self.seq_num),
        }
    }
}

/// A single atom in a macromolecular structure.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Atom {
    /// Atom serial number.
    pub serial: u32,
    /// Atom name (e.g. "CA", "N", "CB").
    pub name: String,
    /// 3D coordinates in Angstroms.
    pub coords: Point3D,
    /// Element symbol.
    pub element: Option<String>,
}

impl Atom {
    /// Atom with only a name and a position.
    pub fn new(name: &str, coords: Point3D) -> Self {
        Self {
            serial: 0,
            name: name.into(),
            coords,
            element: None,
        }
    }

    /// Whether this atom is a backbone atom (N, CA, C, O).
    pub fn is_backbone(&self) -> bool {
        let trimmed = self.name.trim();
        matches!(trimmed, "N" | "CA" | "C" | "O")
    }

    /// Whether this is an alpha carbon.
    pub fn is_alpha_carbon(&self) -> bool {
        self.name.trim() == "CA"
    }
}

/// A residue (amino acid) in a chain.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Residue {
    /// Three-letter residue name (e.g. "ALA", "GLY").
    pub name: String,
    /// Sequence number from the PDB file.
    pub seq_num: i32,
    /// Insertion code.
    pub i_code: Option<char>,
    /// Atoms belonging to this residue.
    pub atoms: Vec<Atom>,
}

impl Residue {
    /// Coarse-grained residue carrying only its alpha carbon.
    pub fn from_ca(name: &str, seq_num: i32, ca: Point3D) -> Self {
        Self {
            name: name.into(),
            seq_num,
            i_code: None,
            atoms: vec![Atom::new("CA", ca)],
        }
    }

    /// Get an atom by name, returning the first match.
    pub fn get_atom(&self, name: &str) -> Option<&Atom> {
        self.atoms.iter().find(|a| a.name.trim() == name)
    }

    /// Get the alpha carbon atom.
    pub fn get_alpha_carbon(&self) -> Option<&Atom> {
        self.get_atom("CA")
    }

    /// Representative coordinate used by the residue-level models (the CA).
    pub fn representative(&self) -> Option<Point3D> {
        self.get_alpha_carbon().map(|a| a.coords)
    }

    /// One-letter amino acid code, if the residue is a standard amino acid.
    pub fn one_letter_code(&self) -> Option<char> {
        three_to_one(&self.name)
    }
}

impl Annotated for Residue {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Map a three-letter amino acid code to its one-letter code.
///
/// Selenomethionine is reported as methionine.
pub fn three_to_one(name: &str) -> Option<char> {
    let code = match name.trim().to_ascii_uppercase().as_str() {
        "ALA" => 'A',
        "ARG" => 'R',
        "ASN" => 'N',
        "ASP" => 'D',
        "CYS" => 'C',
        "GLN" => 'Q',
        "GLU" => 'E',
        "GLY" => 'G',
        "HIS" => 'H',
        "ILE" => 'I',
        "LEU" => 'L',
        "LYS" => 'K',
        "MET" | "MSE" => 'M',
        "PHE" => 'F',
        "PRO" => 'P',
        "SER" => 'S',
        "THR" => 'T',
        "TRP" => 'W',
        "TYR" => 'Y',
        "VAL" => 'V',
        _ => return None,
    };
    Some(code)
}

/// A polypeptide chain.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Chain {
    /// Single-character chain identifier.
    pub id: char,
    /// Residues in this chain, in sequence order.
    pub residues: Vec<Residue>,
    /// String form of chain ID for trait impl.
    chain_id_str: String,
}

impl Chain {
    /// Create a new chain.
    pub fn new(id: char, residues: Vec<Residue>) -> Self {
        Self {
            id,
            residues,
            chain_id_str: format!("Chain {}", id),
        }
    }

    /// Number of residues.
    pub fn residue_count(&self) -> usize {
        self.residues.len()
    }

    /// Total number of atoms across all residues.
    pub fn atom_count(&self) -> usize {
        self.residues.iter().map(|r| r.atoms.len()).sum()
    }

    /// Identifier of the residue at `index`.
    pub fn residue_id(&self, index: usize) -> Option<ResidueId> {
        self.residues.get(index).map(|r| ResidueId {
            chain: self.id,
            seq_num: r.seq_num,
            i_code: r.i_code,
        })
    }
}

impl Annotated for Chain {
    fn name(&self) -> &str {
        &self.chain_id_str
    }
}

/// A complete macromolecular structure (one or more chains).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Structure {
    /// PDB identifier or user-supplied name.
    pub id: String,
    /// Chains in this structure.
    pub chains: Vec<Chain>,
}

impl Structure {
    /// Create a structure from its chains.
    pub fn new(id: impl Into<String>, chains: Vec<Chain>) -> Self {
        Self {
            id: id.into(),
            chains,
        }
    }

    /// Number of chains.
    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }

    /// Total residues across all chains.
    pub fn residue_count(&self) -> usize {
        self.chains.iter().map(|c| c.residue_count()).sum()
    }

    /// Total atoms across all chains.
    pub fn atom_count(&self) -> usize {
        self.chains.iter().map(|c| c.atom_count()).sum()
    }

    /// Get a chain by its single-character ID.
    pub fn get_chain(&self, id: char) -> Option<&Chain> {
        self.chains.iter().find(|c| c.id == id)
    }

    /// Chain labels in file order.
    pub fn chain_ids(&self) -> Vec<char> {
        self.chains.iter().map(|c| c.id).collect()
    }
}

impl Annotated for Structure {
    fn name(&self) -> &str {
        &self.id
    }
}

impl Summarizable for Structure {
    fn summary(&self) -> String {
        format!(
            "Structure {}: {} chain(s), {} residue(s), {} atom(s)",
            self.id,
            self.chain_count(),
            self.residue_count(),
            self.atom_count(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point3d_arithmetic() {
        let a = Point3D::new(1.0, 2.0, 3.0);
        let b = Point3D::new(4.0, 5.0, 6.0);
        assert_eq!(a.add(&b), Point3D::new(5.0, 7.0, 9.0));
        assert_eq!(a.sub(&b), Point3D::new(-3.0, -3.0, -3.0));
        assert!((a.dot(&b) - 32.0).abs() < 1e-10);
        assert!((a.scale(2.0).x - 2.0).abs() < 1e-10);
        assert!((a.distance_to(&b) - (27.0_f64).sqrt()).abs() < 1e-10);
    }

    #[test]
    fn point3d_cross_product() {
        let x = Point3D::new(1.0, 0.0, 0.0);
        let y = Point3D::new(0.0, 1.0, 0.0);
        let z = x.cross(&y);
        assert!((z.x).abs() < 1e-10);
        assert!((z.y).abs() < 1e-10);
        assert!((z.z - 1.0).abs() < 1e-10);
    }

    #[test]
    fn residue_id_ordering_and_display() {
        let a = ResidueId::new('A', 10);
        let b = ResidueId::new('A', 11);
        let c = ResidueId::new('B', 1);
        assert!(a < b && b < c);
        assert_eq!(a.to_string(), "A:10");

        let inserted = ResidueId {
            chain: 'A',
            seq_num: 10,
            i_code: Some('A'),
        };
        assert!(a < inserted);
        assert_eq!(inserted.to_string(), "A:10A");
    }

    #[test]
    fn residue_representative_is_alpha_carbon() {
        let r = Residue {
            name: "ALA".into(),
            seq_num: 1,
            i_code: None,
            atoms: vec![
                Atom::new("N", Point3D::new(0.0, 0.0, 0.0)),
                Atom::new("CA", Point3D::new(1.0, 0.0, 0.0)),
                Atom::new("C", Point3D::new(2.0, 0.0, 0.0)),
            ],
        };
        assert_eq!(r.representative(), Some(Point3D::new(1.0, 0.0, 0.0)));
        assert_eq!(r.one_letter_code(), Some('A'));

        let no_ca = Residue {
            name: "HOH".into(),
            seq_num: 2,
            i_code: None,
            atoms: vec![Atom::new("O", Point3D::zero())],
        };
        assert!(no_ca.representative().is_none());
        assert!(no_ca.one_letter_code().is_none());
    }

    #[test]
    fn structure_summary() {
        let chain = Chain::new('A', vec![Residue::from_ca("GLY", 1, Point3D::new(1.0, 2.0, 3.0))]);
        let s = Structure::new("1ABC", vec![chain]);
        assert!(s.summary().contains("1ABC"));
        assert!(s.summary().contains("1 chain"));
        assert!(s.summary().contains("1 residue"));
        assert!(s.summary().contains("1 atom"));
    }
}

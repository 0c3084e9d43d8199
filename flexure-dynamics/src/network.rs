//! Anisotropic elastic network over residue representative coordinates.
//!
//! Residues are nodes, indexed by their position in a [`ResidueTable`]. Every
//! pair within the cutoff is joined by a Hookean spring. The Hessian of the
//! network potential is a pure function of the edge list.

use flexure_core::{FlexureError, Result, Summarizable};
use flexure_struct::{unit_vector, Matrix3x3, Point3D, ResidueTable};
use nalgebra::DMatrix;

use crate::config::NetworkConfig;

/// Residues closer than this are treated as coincident and never connected.
const COINCIDENT_DISTANCE: f64 = 1e-6;

/// A spring between residues `i < j`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Edge {
    pub i: usize,
    pub j: usize,
    /// Rest length in Å.
    pub distance: f64,
    pub spring: f64,
}

/// Weighted residue contact graph.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElasticNetwork {
    /// Rest positions, one per residue.
    pub coords: Vec<Point3D>,
    /// Edges sorted by `(i, j)`.
    pub edges: Vec<Edge>,
    /// Number of edges touching each residue.
    pub degree: Vec<usize>,
    /// Residues with no edge.
    pub isolated: Vec<usize>,
    pub cutoff: f64,
}

impl ElasticNetwork {
    /// Connect every residue pair within the cutoff.
    ///
    /// # Errors
    ///
    /// [`FlexureError::EmptySelection`] for an empty table and
    /// [`FlexureError::InvalidInput`] for a non-positive cutoff.
    pub fn build(table: &ResidueTable, config: &NetworkConfig) -> Result<Self> {
        if table.is_empty() {
            return Err(FlexureError::EmptySelection(format!(
                "no residues to build a network for {}",
                table.structure_id
            )));
        }
        if !(config.cutoff > 0.0) {
            return Err(FlexureError::InvalidInput(format!(
                "cutoff must be positive, got {}",
                config.cutoff
            )));
        }

        let n = table.len();
        let coords = table.coords.clone();
        let mut edges = Vec::new();
        let mut degree = vec![0usize; n];

        for i in 0..n {
            for j in (i + 1)..n {
                let distance = coords[i].distance_to(&coords[j]);
                if distance < COINCIDENT_DISTANCE || distance > config.cutoff {
                    continue;
                }
                edges.push(Edge {
                    i,
                    j,
                    distance,
                    spring: config.spring.constant(distance),
                });
                degree[i] += 1;
                degree[j] += 1;
            }
        }

        let isolated: Vec<usize> = (0..n).filter(|&i| degree[i] == 0).collect();
        if !isolated.is_empty() {
            let ids: Vec<String> = isolated.iter().map(|&i| table.ids[i].to_string()).collect();
            log::warn!(
                "{}: {} residue(s) have no neighbour within {} Å: {}",
                table.structure_id,
                isolated.len(),
                config.cutoff,
                ids.join(", ")
            );
        }
        log::debug!(
            "{}: elastic network with {} nodes and {} edges",
            table.structure_id,
            n,
            edges.len()
        );

        Ok(Self {
            coords,
            edges,
            degree,
            isolated,
            cutoff: config.cutoff,
        })
    }

    /// Number of residues.
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Edges touching residue `i`.
    pub fn neighbours(&self, i: usize) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.i == i || e.j == i)
    }

    /// 3×3 super-element for an edge: `-k / d² · (r ⊗ r)` with `r = x_j - x_i`.
    ///
    /// Equivalent to `-k · (e ⊗ e)` for the unit vector `e`.
    pub fn block(&self, edge: &Edge) -> Matrix3x3 {
        match unit_vector(&self.coords[edge.i], &self.coords[edge.j]) {
            Some((e, _)) => {
                let mut m = Matrix3x3::outer(&e, &e);
                for row in m.data.iter_mut() {
                    for v in row.iter_mut() {
                        *v *= -edge.spring;
                    }
                }
                m
            }
            None => Matrix3x3::zeros(),
        }
    }

    /// Assemble the 3N×3N Hessian.
    ///
    /// Off-diagonal block (i, j) is the edge super-element; each diagonal
    /// block is minus the sum of the off-diagonal blocks in its row, so every
    /// row sums to zero.
    pub fn hessian(&self) -> DMatrix<f64> {
        let n = self.len();
        let mut h = DMatrix::<f64>::zeros(3 * n, 3 * n);

        for edge in &self.edges {
            let block = self.block(edge);
            let (bi, bj) = (3 * edge.i, 3 * edge.j);
            for a in 0..3 {
                for b in 0..3 {
                    let v = block.data[a][b];
                    h[(bi + a, bj + b)] = v;
                    h[(bj + a, bi + b)] = v;
                    h[(bi + a, bi + b)] -= v;
                    h[(bj + a, bj + b)] -= v;
                }
            }
        }
        h
    }
}

impl Summarizable for ElasticNetwork {
    fn summary(&self) -> String {
        format!(
            "ElasticNetwork: {} residues, {} edges (cutoff {} Å), {} isolated",
            self.len(),
            self.edges.len(),
            self.cutoff,
            self.isolated.len()
        )
    }
}

//! Mechanical stiffness between connected residues.
//!
//! For each spring `(i, j)` of the network, equal and opposite unit forces
//! are applied at both ends along the spring direction. The resulting change
//! in separation, projected on that direction, is the pair's compliance; its
//! inverse is the effective spring constant felt between the two residues
//! through the whole network (Eyal & Bahar, 2008).

use flexure_core::{FlexureError, Result, Summarizable};
use flexure_struct::{unit_vector, Matrix3x3, ResidueTable};

use crate::config::StiffnessConfig;
use crate::network::ElasticNetwork;
use crate::response::PerturbationResponse;

/// Effective spring constant between two connected residues.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PairStiffness {
    pub i: usize,
    pub j: usize,
    /// Projected relative displacement under a unit pulling force.
    pub compliance: f64,
    pub stiffness: f64,
}

/// Per-residue and per-pair mechanical stiffness.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MechanicalStiffness {
    /// Mean stiffness over the residue's included partners; 0.0 if none.
    pub per_residue: Vec<f64>,
    /// Included pairs, in edge order.
    pub pairs: Vec<PairStiffness>,
    /// Edges left out because their compliance fell below the threshold.
    pub excluded: usize,
}

impl Summarizable for MechanicalStiffness {
    fn summary(&self) -> String {
        format!(
            "MechanicalStiffness: {} residues, {} pairs ({} excluded)",
            self.per_residue.len(),
            self.pairs.len(),
            self.excluded
        )
    }
}

fn block(response: &PerturbationResponse, i: usize, j: usize) -> Matrix3x3 {
    Matrix3x3 {
        data: response.block(i, j),
    }
}

/// Stiffness of every network spring and its per-residue average.
///
/// # Errors
///
/// [`FlexureError::DimensionMismatch`] when the table, network and response
/// disagree on the number of residues.
pub fn mechanical_stiffness(
    response: &PerturbationResponse,
    table: &ResidueTable,
    network: &ElasticNetwork,
    config: &StiffnessConfig,
) -> Result<MechanicalStiffness> {
    let n = table.len();
    if network.len() != n || response.n_residues() != n {
        return Err(FlexureError::DimensionMismatch(format!(
            "{}: table has {} residues, network {}, response {}",
            table.structure_id,
            n,
            network.len(),
            response.n_residues()
        )));
    }

    let mut pairs = Vec::with_capacity(network.edges.len());
    let mut excluded = 0usize;

    for edge in &network.edges {
        let Some((e, _)) = unit_vector(&network.coords[edge.i], &network.coords[edge.j]) else {
            excluded += 1;
            continue;
        };
        let relative = block(response, edge.i, edge.i)
            .add(&block(response, edge.j, edge.j))
            .add(&scaled(&block(response, edge.i, edge.j), -1.0))
            .add(&scaled(&block(response, edge.j, edge.i), -1.0));
        let compliance = relative.quadratic_form(&e);
        if !(compliance >= config.min_projected_displacement) || compliance <= 0.0 {
            excluded += 1;
            continue;
        }
        pairs.push(PairStiffness {
            i: edge.i,
            j: edge.j,
            compliance,
            stiffness: 1.0 / compliance,
        });
    }

    let mut sum = vec![0.0; n];
    let mut count = vec![0usize; n];
    for pair in &pairs {
        for r in [pair.i, pair.j] {
            sum[r] += pair.stiffness;
            count[r] += 1;
        }
    }
    let per_residue = sum
        .iter()
        .zip(&count)
        .map(|(&s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
        .collect();

    if excluded > 0 {
        log::debug!(
            "{}: {} spring(s) excluded from stiffness (compliance below {})",
            table.structure_id,
            excluded,
            config.min_projected_displacement
        );
    }

    Ok(MechanicalStiffness {
        per_residue,
        pairs,
        excluded,
    })
}

fn scaled(m: &Matrix3x3, s: f64) -> Matrix3x3 {
    let mut out = *m;
    for row in out.data.iter_mut() {
        for v in row.iter_mut() {
            *v *= s;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModeConfig, NetworkConfig};
    use crate::modes::ModeSet;
    use crate::response::perturbation_response;
    use flexure_struct::{Point3D, ResidueId};

    fn setup(coords: Vec<Point3D>) -> (ResidueTable, ElasticNetwork, PerturbationResponse) {
        let n = coords.len();
        let table = ResidueTable::new(
            "STIFF",
            (0..n).map(|i| ResidueId::new('A', i as i32 + 1)).collect(),
            vec!["ALA".to_string(); n],
            coords,
        )
        .unwrap();
        let net = ElasticNetwork::build(&table, &NetworkConfig::default()).unwrap();
        let modes = ModeSet::from_network(&net, &ModeConfig::default()).unwrap();
        let response = perturbation_response(&modes).unwrap();
        (table, net, response)
    }

    fn kinked() -> Vec<Point3D> {
        vec![
            Point3D::new(0.0, 0.0, 0.0),
            Point3D::new(3.8, 0.0, 0.0),
            Point3D::new(3.8, 3.8, 0.0),
            Point3D::new(3.8, 3.8, 3.8),
            Point3D::new(7.6, 3.8, 3.8),
        ]
    }

    #[test]
    fn every_spring_gets_a_positive_stiffness() {
        let (table, net, response) = setup(kinked());
        let stiffness =
            mechanical_stiffness(&response, &table, &net, &StiffnessConfig::default()).unwrap();
        assert_eq!(stiffness.pairs.len(), net.edges.len());
        assert_eq!(stiffness.excluded, 0);
        assert!(stiffness.pairs.iter().all(|p| p.stiffness > 0.0));
        assert!(stiffness.per_residue.iter().all(|&k| k > 0.0));
        assert!(stiffness.summary().contains("5 residues"));
    }

    #[test]
    fn network_stiffer_than_its_single_spring() {
        // Effective stiffness is bounded below by the direct spring (k = 1).
        let (table, net, response) = setup(kinked());
        let stiffness =
            mechanical_stiffness(&response, &table, &net, &StiffnessConfig::default()).unwrap();
        assert!(stiffness.pairs.iter().all(|p| p.stiffness >= 1.0 - 1e-9));
    }

    #[test]
    fn per_residue_is_mean_over_partners() {
        let (table, net, response) = setup(kinked());
        let stiffness =
            mechanical_stiffness(&response, &table, &net, &StiffnessConfig::default()).unwrap();
        let partners: Vec<f64> = stiffness
            .pairs
            .iter()
            .filter(|p| p.i == 0 || p.j == 0)
            .map(|p| p.stiffness)
            .collect();
        let mean = partners.iter().sum::<f64>() / partners.len() as f64;
        assert!((stiffness.per_residue[0] - mean).abs() < 1e-12);
    }

    #[test]
    fn threshold_excludes_pairs() {
        let (table, net, response) = setup(kinked());
        let config = StiffnessConfig {
            min_projected_displacement: 1e6,
        };
        let stiffness = mechanical_stiffness(&response, &table, &net, &config).unwrap();
        assert!(stiffness.pairs.is_empty());
        assert_eq!(stiffness.excluded, net.edges.len());
        assert!(stiffness.per_residue.iter().all(|&k| k == 0.0));
    }

    #[test]
    fn mismatched_inputs_rejected() {
        let (_, net, response) = setup(kinked());
        let (small, _, _) = setup(kinked()[..4].to_vec());
        assert!(matches!(
            mechanical_stiffness(&response, &small, &net, &StiffnessConfig::default()),
            Err(FlexureError::DimensionMismatch(_))
        ));
    }
}

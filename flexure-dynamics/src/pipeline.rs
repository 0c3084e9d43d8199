//! End-to-end annotation of single structures and ensembles.

use std::collections::BTreeMap;

use flexure_core::{FlexureError, Result, Summarizable};
use flexure_struct::{build_table, relative_accessibility, ResidueId, ResidueTable, Structure};

use crate::annotation::{AnnotationProfile, AnnotationTable};
use crate::config::DynamicsConfig;
use crate::ensemble::{analyze_ensemble, Ensemble, EnsembleVariance};
use crate::hinge::{detect_hinges, HingeSites};
use crate::modes::{DisconnectedNetworkWarning, ModeSet};
use crate::network::ElasticNetwork;
use crate::response::perturbation_response;
use crate::stiffness::{mechanical_stiffness, MechanicalStiffness};

pub const TITLE_MSF: &str = "ENM fluctuations";
pub const TITLE_EFFECTIVENESS: &str = "Perturbation effectiveness";
pub const TITLE_SENSITIVITY: &str = "Perturbation sensitivity";
pub const TITLE_STIFFNESS: &str = "Mechanical stiffness";
pub const TITLE_RSA: &str = "Relative solvent accessibility";
pub const TITLE_DEVIATION: &str = "Average deviation";
pub const TITLE_PCA: &str = "PCA fluctuations";

/// Every annotation derived from one structure.
#[derive(Debug, Clone)]
pub struct SingleAnnotations {
    pub table: ResidueTable,
    pub network: ElasticNetwork,
    pub modes: ModeSet,
    pub msf: AnnotationProfile,
    pub effectiveness: Option<AnnotationProfile>,
    pub sensitivity: Option<AnnotationProfile>,
    pub stiffness: Option<AnnotationProfile>,
    pub stiffness_pairs: Option<MechanicalStiffness>,
    pub hinges: Vec<HingeSites>,
    pub accessibility: Option<AnnotationProfile>,
    /// Why the response-derived annotations are missing, if they are.
    pub response_error: Option<String>,
}

impl SingleAnnotations {
    pub fn structure_id(&self) -> &str {
        &self.table.structure_id
    }

    pub fn warning(&self) -> Option<&DisconnectedNetworkWarning> {
        self.modes.warning.as_ref()
    }

    /// Every available profile, hinge flags last.
    pub fn profiles(&self) -> Vec<AnnotationProfile> {
        let mut profiles = vec![self.msf.clone()];
        profiles.extend(
            [&self.effectiveness, &self.sensitivity, &self.stiffness, &self.accessibility]
                .into_iter()
                .flatten()
                .cloned(),
        );
        profiles.extend(
            self.hinges
                .iter()
                .map(|h| AnnotationProfile::from_hinges(h, &self.table)),
        );
        profiles
    }

    /// Profiles covering every residue, as one table.
    ///
    /// Accessibility is left out when some residues had no exposed area.
    pub fn annotation_table(&self) -> Result<AnnotationTable> {
        let mut table = AnnotationTable::default();
        for profile in self.profiles() {
            if profile.len() != self.table.len() {
                log::debug!(
                    "{}: '{}' covers {} of {} residues, left out of the table",
                    self.structure_id(),
                    profile.title,
                    profile.len(),
                    self.table.len()
                );
                continue;
            }
            table.push(profile)?;
        }
        Ok(table)
    }
}

impl Summarizable for SingleAnnotations {
    fn summary(&self) -> String {
        format!(
            "{}: {} residues, {} edges, {} zero modes, {} profiles{}",
            self.structure_id(),
            self.table.len(),
            self.network.edges.len(),
            self.modes.n_zero,
            self.profiles().len(),
            if self.response_error.is_some() {
                " (no response)"
            } else {
                ""
            }
        )
    }
}

/// Dynamics annotations for one structure.
///
/// `raw_areas` holds per-residue exposed surface areas; when given, relative
/// accessibility is added. A singular Hessian only drops the response and
/// stiffness annotations; fluctuations and hinges are still returned.
///
/// # Errors
///
/// Configuration errors, an empty chain selection, eigensolver failure, and
/// invalid hinge mode indices are returned as errors.
pub fn annotate_single(
    structure: &Structure,
    raw_areas: Option<&BTreeMap<ResidueId, f64>>,
    config: &DynamicsConfig,
) -> Result<SingleAnnotations> {
    config.validate()?;
    let table = build_table(structure, &config.selection)?;
    let network = ElasticNetwork::build(&table, &config.network)?;
    let modes = ModeSet::from_network(&network, &config.modes)?;

    let msf = AnnotationProfile::from_table(TITLE_MSF, &table, &modes.msf())?;

    let mut effectiveness = None;
    let mut sensitivity = None;
    let mut stiffness = None;
    let mut stiffness_pairs = None;
    let mut response_error = None;

    match perturbation_response(&modes) {
        Ok(response) => {
            effectiveness = Some(AnnotationProfile::from_table(
                TITLE_EFFECTIVENESS,
                &table,
                &response.effectiveness,
            )?);
            sensitivity = Some(AnnotationProfile::from_table(
                TITLE_SENSITIVITY,
                &table,
                &response.sensitivity,
            )?);
            let k = mechanical_stiffness(&response, &table, &network, &config.stiffness)?;
            stiffness = Some(AnnotationProfile::from_table(
                TITLE_STIFFNESS,
                &table,
                &k.per_residue,
            )?);
            stiffness_pairs = Some(k);
        }
        Err(FlexureError::SingularHessian(msg)) => {
            log::warn!(
                "{}: no perturbation response or stiffness: {}",
                structure.id,
                msg
            );
            response_error = Some(msg);
        }
        Err(e) => return Err(e),
    }

    let hinges = detect_hinges(&modes, &table, &config.hinge)?;

    let accessibility = match raw_areas {
        Some(raw) => {
            let rsa = relative_accessibility(structure, raw, &config.selection, &config.accessibility)?;
            Some(AnnotationProfile::new(TITLE_RSA, rsa))
        }
        None => None,
    };

    let annotations = SingleAnnotations {
        table,
        network,
        modes,
        msf,
        effectiveness,
        sensitivity,
        stiffness,
        stiffness_pairs,
        hinges,
        accessibility,
        response_error,
    };
    log::info!("{}", annotations.summary());
    Ok(annotations)
}

/// Variance annotations for an ensemble.
#[derive(Debug, Clone)]
pub struct EnsembleAnnotations {
    pub reference: ResidueTable,
    pub variance: EnsembleVariance,
    pub average_deviation: AnnotationProfile,
    pub fluctuation: AnnotationProfile,
}

impl EnsembleAnnotations {
    pub fn annotation_table(&self) -> Result<AnnotationTable> {
        AnnotationTable::new(vec![self.average_deviation.clone(), self.fluctuation.clone()])
    }
}

impl Summarizable for EnsembleAnnotations {
    fn summary(&self) -> String {
        self.variance.summary()
    }
}

/// Superpose `members` onto `reference` and decompose their variance.
///
/// # Errors
///
/// Configuration errors, an empty selection, members whose residues do not
/// match the reference, and superposition failures.
pub fn annotate_ensemble(
    reference: &Structure,
    members: &[Structure],
    config: &DynamicsConfig,
) -> Result<EnsembleAnnotations> {
    config.validate()?;
    let ensemble = Ensemble::from_structures(reference, members, &config.selection)?;
    let variance = analyze_ensemble(&ensemble, &config.pca)?;

    let average_deviation =
        AnnotationProfile::from_table(TITLE_DEVIATION, &ensemble.reference, &variance.average_deviation)?;
    let fluctuation =
        AnnotationProfile::from_table(TITLE_PCA, &ensemble.reference, &variance.fluctuation)?;

    Ok(EnsembleAnnotations {
        reference: ensemble.reference,
        variance,
        average_deviation,
        fluctuation,
    })
}

/// Single-structure annotations for many structures, in input order.
///
/// Each structure succeeds or fails on its own.
pub fn annotate_many(
    structures: &[Structure],
    config: &DynamicsConfig,
) -> Vec<(String, Result<SingleAnnotations>)> {
    let run = |s: &Structure| (s.id.clone(), annotate_single(s, None, config));

    #[cfg(feature = "parallel")]
    let results = {
        use rayon::prelude::*;
        structures.par_iter().map(run).collect::<Vec<_>>()
    };
    #[cfg(not(feature = "parallel"))]
    let results = structures.iter().map(run).collect::<Vec<_>>();

    let failed = results.iter().filter(|(_, r)| r.is_err()).count();
    if failed > 0 {
        log::warn!("{} of {} structures could not be annotated", failed, results.len());
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModeSelection;
    use flexure_struct::{Chain, Point3D, Residue};

    fn helix(id: &str, n: usize) -> Structure {
        let residues = (0..n)
            .map(|i| {
                let angle = (i as f64) * 100.0_f64.to_radians();
                Residue::from_ca(
                    "ALA",
                    i as i32 + 1,
                    Point3D::new(2.3 * angle.cos(), 2.3 * angle.sin(), 1.5 * i as f64),
                )
            })
            .collect();
        Structure::new(id, vec![Chain::new('A', residues)])
    }

    #[test]
    fn single_structure_full_pipeline() {
        let s = helix("HLX", 12);
        let raw: BTreeMap<ResidueId, f64> =
            (1..=12).map(|i| (ResidueId::new('A', i), 23.0)).collect();
        let out = annotate_single(&s, Some(&raw), &DynamicsConfig::default()).unwrap();
        assert_eq!(out.msf.len(), 12);
        assert!(out.effectiveness.is_some());
        assert!(out.stiffness.is_some());
        assert!(out.response_error.is_none());
        assert!(out.warning().is_none());
        assert_eq!(out.hinges.len(), 6);
        assert_eq!(out.hinges[0].label, "Hinge sites for mode 7");
        assert!((out.accessibility.as_ref().unwrap().entries[0].1 - 0.2).abs() < 1e-12);

        let table = out.annotation_table().unwrap();
        assert_eq!(table.n_rows(), 12);
        assert_eq!(table.n_columns(), 5 + 6);
        assert!(table.to_csv().unwrap().starts_with("residue,ENM fluctuations,"));
    }

    #[test]
    fn singular_hessian_keeps_msf_and_hinges() {
        let residues = vec![
            Residue::from_ca("GLY", 1, Point3D::zero()),
            Residue::from_ca("GLY", 2, Point3D::new(3.8, 0.0, 0.0)),
        ];
        let s = Structure::new("DIMER", vec![Chain::new('A', residues)]);
        let out = annotate_single(&s, None, &DynamicsConfig::default()).unwrap();
        assert!(out.response_error.is_some());
        assert!(out.effectiveness.is_none());
        assert!(out.stiffness.is_none());
        assert_eq!(out.msf.values(), vec![0.0, 0.0]);
        assert!(out.hinges.is_empty());
        assert!(out.summary().contains("no response"));
    }

    #[test]
    fn invalid_config_rejected() {
        let mut config = DynamicsConfig::default();
        config.network.cutoff = -1.0;
        assert!(annotate_single(&helix("HLX", 8), None, &config).is_err());
    }

    #[test]
    fn rigid_hinge_index_rejected() {
        let mut config = DynamicsConfig::default();
        config.hinge.modes = ModeSelection::Indices(vec![3]);
        let err = annotate_single(&helix("HLX", 8), None, &config).unwrap_err();
        assert!(matches!(err, FlexureError::InvalidInput(_)));
    }

    #[test]
    fn ensemble_pipeline() {
        let reference = helix("REF", 10);
        let members = vec![helix("M1", 10), helix("M2", 10)];
        let out = annotate_ensemble(&reference, &members, &DynamicsConfig::default()).unwrap();
        assert_eq!(out.average_deviation.len(), 10);
        assert!(out.fluctuation.values().iter().all(|v| v.abs() < 1e-9));
        assert_eq!(out.annotation_table().unwrap().n_columns(), 2);
    }

    #[test]
    fn many_structures_fail_independently() {
        let empty = Structure::new("EMPTY", vec![]);
        let results = annotate_many(&[helix("H1", 8), empty, helix("H2", 9)], &DynamicsConfig::default());
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, "H1");
        assert!(results[0].1.is_ok());
        assert!(matches!(results[1].1, Err(FlexureError::EmptySelection(_))));
        assert_eq!(results[2].1.as_ref().unwrap().table.len(), 9);
    }
}

//! Structural dynamics annotations for the Flexure workspace.
//!
//! - **Elastic network**: anisotropic network Hessian in [`network`]
//! - **Normal modes**: spectrum, fluctuations and pseudo-inverse in [`modes`]
//! - **Perturbation response**: effectiveness and sensitivity in [`response`]
//! - **Mechanical stiffness**: pairwise effective spring constants in [`stiffness`]
//! - **Hinges**: hinge residues of low-frequency modes in [`hinge`]
//! - **Ensembles**: superposition and PCA of conformer sets in [`ensemble`]
//! - **Annotations**: per-residue profiles and CSV tables in [`annotation`]
//! - **Pipeline**: structure in, annotation set out, in [`pipeline`]
//!
//! With the `parallel` feature, per-row response computation, ensemble
//! superposition and [`annotate_many`] run on rayon.
//!
//! # Quick start
//!
//! ```
//! use flexure_dynamics::{annotate_single, DynamicsConfig};
//! use flexure_struct::{Chain, Point3D, Residue, Structure};
//!
//! let residues = (0..10)
//!     .map(|i| {
//!         let angle = (i as f64) * 100.0_f64.to_radians();
//!         let ca = Point3D::new(2.3 * angle.cos(), 2.3 * angle.sin(), 1.5 * i as f64);
//!         Residue::from_ca("ALA", i + 1, ca)
//!     })
//!     .collect();
//! let structure = Structure::new("1HLX", vec![Chain::new('A', residues)]);
//!
//! let annotations = annotate_single(&structure, None, &DynamicsConfig::default()).unwrap();
//! assert_eq!(annotations.msf.len(), 10);
//! let csv = annotations.annotation_table().unwrap().to_csv().unwrap();
//! assert!(csv.starts_with("residue,ENM fluctuations"));
//! ```

pub mod annotation;
pub mod config;
pub mod ensemble;
pub mod hinge;
pub mod modes;
pub mod network;
pub mod pipeline;
pub mod response;
pub mod stiffness;

pub use annotation::{AnnotationProfile, AnnotationTable};
pub use config::{
    DynamicsConfig, HingeAxis, HingeConfig, ModeConfig, ModeSelection, NetworkConfig, PcaConfig,
    PcaRetention, SpringModel, StiffnessConfig,
};
pub use ensemble::{analyze_ensemble, Ensemble, EnsembleVariance};
pub use hinge::{detect_hinges, HingeSites};
pub use modes::{DisconnectedNetworkWarning, Mode, ModeSet, RIGID_BODY_MODES};
pub use network::{Edge, ElasticNetwork};
pub use pipeline::{
    annotate_ensemble, annotate_many, annotate_single, EnsembleAnnotations, SingleAnnotations,
};
pub use response::{perturbation_response, PerturbationResponse};
pub use stiffness::{mechanical_stiffness, MechanicalStiffness, PairStiffness};

//! Data structures for methylation analysis.

mod annotation;
mod beta_matrix;
mod clinical;
mod sample;

pub use annotation::ProbeAnnotation;
pub use beta_matrix::BetaMatrix;
pub(crate) use beta_matrix::parse_beta;
pub use clinical::{ClinicalRecord, ClinicalTable, VitalStatus};
pub use sample::{patient_from_barcode, SampleInfo, SampleSheet, TissueType};

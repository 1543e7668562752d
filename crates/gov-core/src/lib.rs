//! Shared primitives for the interactive customization governance pipeline:
//! identifiers, the closed enumerations of the wire protocol, the common
//! `{decision, reasons, violations}` shape every stage emits, and the error
//! taxonomy that maps to process exit codes.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod decision;
pub mod enums;
pub mod error;
pub mod hash;
pub mod ids;

pub use decision::{Severity, StageOutcome, Violation};
pub use enums::*;
pub use error::GovError;

//! Domain types shared by the validators, the scorer and the promotion gate.

pub mod artifact;
pub mod error;
pub mod result;

pub use artifact::ArtifactType;
pub use error::{HalgateError, Result};
pub use result::{clamp_unit, round_to, ScoreBreakdown, ValidatorResult, EMPTY_OUTPUT};

//! Cross-references OpenStreetMap elements against reference datasets.
//!
//! A [`Correlator`] pairs every [`DataItem`] with at most one nearby
//! [`MapElement`], classifies each pairing into a [`Correlation`], and hands
//! the resulting [`CorrelationReport`] to [`Batch`]es that write it into a
//! [`Report`].

pub mod analyzer;
pub mod batches;
mod correlation;
mod correlator;
mod elements;
pub mod grouping;
mod params;
pub mod report;
pub mod spatial;
mod strength;
pub mod utils;
mod validator;

pub use batches::Batch;
pub use correlation::{Correlation, CorrelationKind, CorrelationReport, Pair, Rescue};
pub use correlator::Correlator;
pub use elements::{DataItem, MapElement};
pub use params::{
    DataItemLabels, ExtraDistance, ParameterError, Parameters, ParametersBuilder,
    DEFAULT_NEAR_DISTANCE,
};
pub use report::{MarkdownReport, Report};
pub use strength::MatchStrength;
pub use validator::{ValidationRule, Validator, Violation};

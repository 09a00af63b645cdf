//! Error types for document transforms.

use miette::Diagnostic;
use thiserror::Error;

use crate::schema::Violation;

/// Errors raised while applying a step to a document.
///
/// Commands never surface these to callers; a failed step turns the command
/// into a no-op.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepError {
    /// A position lies outside the document.
    #[error("position {pos} is out of range (document size {size})")]
    #[diagnostic(code(placenoter::step::out_of_range))]
    OutOfRange { pos: usize, size: usize },

    /// `from` is after `to`.
    #[error("inverted range {from}..{to}")]
    #[diagnostic(code(placenoter::step::inverted))]
    InvertedRange { from: usize, to: usize },

    /// The two ends of a replace live in different parents.
    #[error("replace range {from}..{to} crosses node boundaries")]
    #[diagnostic(code(placenoter::step::crosses_parents))]
    CrossesParents { from: usize, to: usize },

    /// The result would break a content rule.
    #[error("invalid content: {0}")]
    #[diagnostic(code(placenoter::step::schema))]
    Schema(String),
}

impl From<Violation> for StepError {
    fn from(v: Violation) -> Self {
        StepError::Schema(v.to_string())
    }
}

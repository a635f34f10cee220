/*! Errors raised while building or evaluating isotopomer distribution models */
use thiserror::Error;

/// The broad classes of failure a distribution request can run into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An input's length or count did not match what the model expects
    Shape,
    /// A numeric input was outside of its valid range
    Domain,
    /// A symbol could not be found in a reference table
    Lookup,
}

/// An error that might occur while constructing a model or computing its distribution
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MidaError {
    #[error("Expected {expected} {what}, found {found}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("Cannot broadcast {left} scenarios against {right} scenarios")]
    ScenarioMismatch { left: usize, right: usize },
    #[error("Element index {0} is not in the reference table")]
    ElementOutOfRange(usize),
    #[error("Isotopic abundance {0} is outside of [0, 1]")]
    AbundanceOutOfRange(f64),
    #[error("Enrichment fraction {0} is outside of [0, 1]")]
    FractionOutOfRange(f64),
    #[error("Group atom count {0} must be non-negative")]
    NegativeAtomCount(f64),
    #[error(
        "Enrichment parameters are ill-defined for an element with {0} isotopes, convert to abundances manually"
    )]
    IllDefinedEnrichmentParameter(usize),
    #[error("Removing {removed} atoms of {symbol} leaves a negative natural-abundance pool of {available}")]
    NegativeNaturalPool {
        symbol: String,
        available: u32,
        removed: u32,
    },
    #[error("Invalid reference data: {0}")]
    InvalidReferenceData(String),
    #[error("Unknown element symbol {0:?}")]
    UnknownElement(String),
    #[error("Unknown residue {residue:?} at position {position}")]
    UnknownResidue { residue: char, position: usize },
    #[error("Cannot build a peptide from an empty sequence")]
    EmptySequence,
}

impl MidaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ShapeMismatch { .. } | Self::ScenarioMismatch { .. } | Self::ElementOutOfRange(_) => {
                ErrorKind::Shape
            }
            Self::AbundanceOutOfRange(_)
            | Self::FractionOutOfRange(_)
            | Self::NegativeAtomCount(_)
            | Self::IllDefinedEnrichmentParameter(_)
            | Self::NegativeNaturalPool { .. }
            | Self::InvalidReferenceData(_) => ErrorKind::Domain,
            Self::UnknownElement(_) | Self::UnknownResidue { .. } | Self::EmptySequence => {
                ErrorKind::Lookup
            }
        }
    }
}

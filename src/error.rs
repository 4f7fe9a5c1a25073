use std::fmt::Display;

/// The broad category an error raised by this crate falls into.
///
/// Every error type in the crate maps onto exactly one of these through a `kind` method,
/// so callers that only care about the category do not need to match on each variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A mask array or row layout has the wrong dimensions
    Shape,
    /// A value violates a consistency rule of the data model
    Validation,
    /// A row id or a name is already in use
    DuplicateKey,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shape => f.write_str("ShapeError"),
            Self::Validation => f.write_str("ValidationError"),
            Self::DuplicateKey => f.write_str("DuplicateKeyError"),
        }
    }
}

//! Error types for abbreviation expansion and settings loading.

use thiserror::Error;

/// Character-level failures raised by the tokenizer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// A character that starts no token.
    #[error("unexpected character {character:?} at offset {offset}")]
    UnexpectedCharacter { character: char, offset: usize },

    /// A `{`, `[` or `(` span that is never closed before the input ends.
    #[error("unclosed span: {delimiter:?} opened at offset {offset} is never closed")]
    Unclosed { delimiter: char, offset: usize },

    /// A `*` directly after an element name with no digits following it.
    #[error("multiplier at offset {offset} has no count")]
    MissingMultiplierCount { offset: usize },

    /// A multiplier count of zero or one too large to represent.
    #[error("invalid multiplier count {count:?} at offset {offset}")]
    InvalidMultiplier { count: String, offset: usize },
}

impl LexError {
    /// Byte offset into the abbreviation where the problem was detected.
    pub fn offset(&self) -> usize {
        match self {
            LexError::UnexpectedCharacter { offset, .. }
            | LexError::Unclosed { offset, .. }
            | LexError::MissingMultiplierCount { offset }
            | LexError::InvalidMultiplier { offset, .. } => *offset,
        }
    }
}

/// Shape failures raised while building or validating the node forest.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    /// An element node without a name.
    #[error("element node has an empty or missing name")]
    EmptyName,

    /// `>` or `+` without an element or group on both sides.
    #[error("operator {operator:?} at offset {offset} has no element to connect")]
    DanglingOperator { operator: &'static str, offset: usize },

    /// Content or attributes with no element to attach them to.
    #[error("{what} at offset {offset} does not follow an element")]
    MissingElement { what: &'static str, offset: usize },
}

/// Any failure of a full `expand` call.
///
/// The first stage to fail wins; no partial output is ever produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpandError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Structure(#[from] StructureError),

    /// Groups or `>` chains nest deeper than allowed.
    #[error("abbreviation nests deeper than {limit} levels")]
    DepthExceeded { limit: usize },

    /// Multipliers would produce more units than allowed.
    #[error("abbreviation expands to {units} units, more than the limit of {limit}")]
    TooManyUnits { units: u64, limit: u64 },
}

impl ExpandError {
    /// True when the input was well formed but exceeded a complexity limit,
    /// as opposed to being malformed.
    pub fn is_too_complex(&self) -> bool {
        matches!(
            self,
            ExpandError::DepthExceeded { .. } | ExpandError::TooManyUnits { .. }
        )
    }
}

/// Failures while reading shortcode settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("invalid shortcode settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ExpandError>;

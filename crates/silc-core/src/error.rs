//! Runtime error types
//!
//! Every error has a stable numeric code. Codes travel through the heap as
//! inline error values (an unbound symbol holds `UnresolvedSymbol`), and
//! the printer renders them as `#<error CODE: message>`.

use silc_gc::{GcError, Value};
use thiserror::Error;

/// Evaluation, reader and lifecycle errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SilcError {
    /// Broken runtime invariant
    #[error("internal error")]
    Internal,

    /// Argument stack read outside the live segment
    #[error("stack access out of bounds")]
    StackAccess,

    /// Argument stack full or evaluation too deep
    #[error("stack overflow")]
    StackOverflow,

    /// Source file could not be read
    #[error("failed to load file")]
    LoadFailed,

    /// `quit` was called; not a failure
    #[error("quit requested")]
    Quit,

    /// Wrong argument count or argument type
    #[error("invalid arguments")]
    InvalidArgs,

    /// Integer outside the fixnum range
    #[error("value out of range")]
    ValueOutOfRange,

    /// Input ended inside a form
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// Character that cannot start or continue a token
    #[error("unexpected character")]
    UnexpectedCharacter,

    /// Symbol name longer than the reader accepts
    #[error("symbol is too big")]
    SymbolTooBig,

    /// Symbol evaluated before anything was bound to it
    #[error("unresolved symbol")]
    UnresolvedSymbol,

    /// Head of an application is not a function
    #[error("not a function")]
    NotAFunction,

    /// Code without a named variant
    #[error("error {0}")]
    Other(u32),
}

impl SilcError {
    /// Numeric code of this error
    pub fn code(self) -> u32 {
        match self {
            SilcError::Internal => 500,
            SilcError::StackAccess => 501,
            SilcError::StackOverflow => 502,
            SilcError::LoadFailed => 503,
            SilcError::Quit => 508,
            SilcError::InvalidArgs => 400,
            SilcError::ValueOutOfRange => 401,
            SilcError::UnexpectedEof => 450,
            SilcError::UnexpectedCharacter => 451,
            SilcError::SymbolTooBig => 452,
            SilcError::UnresolvedSymbol => 470,
            SilcError::NotAFunction => 471,
            SilcError::Other(code) => code,
        }
    }

    /// Error for a numeric code
    pub fn from_code(code: u32) -> Self {
        match code {
            500 => SilcError::Internal,
            501 => SilcError::StackAccess,
            502 => SilcError::StackOverflow,
            503 => SilcError::LoadFailed,
            508 => SilcError::Quit,
            400 => SilcError::InvalidArgs,
            401 => SilcError::ValueOutOfRange,
            450 => SilcError::UnexpectedEof,
            451 => SilcError::UnexpectedCharacter,
            452 => SilcError::SymbolTooBig,
            470 => SilcError::UnresolvedSymbol,
            471 => SilcError::NotAFunction,
            code => SilcError::Other(code),
        }
    }

    /// Inline error value carrying this error's code
    pub fn to_value(self) -> Value {
        Value::error(self.code())
    }

    /// Error carried by an inline error value
    pub fn from_value(value: Value) -> Option<Self> {
        value.error_code().map(Self::from_code)
    }

    /// Whether this is the `quit` signal rather than a failure
    pub fn is_quit(self) -> bool {
        self == SilcError::Quit
    }
}

impl From<GcError> for SilcError {
    fn from(e: GcError) -> Self {
        match e {
            GcError::IntOutOfRange(_) => SilcError::ValueOutOfRange,
            GcError::OutOfMemory { .. } => SilcError::Internal,
        }
    }
}

/// Result type for runtime operations
pub type SilcResult<T> = std::result::Result<T, SilcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for e in [
            SilcError::Internal,
            SilcError::StackAccess,
            SilcError::StackOverflow,
            SilcError::LoadFailed,
            SilcError::Quit,
            SilcError::InvalidArgs,
            SilcError::ValueOutOfRange,
            SilcError::UnexpectedEof,
            SilcError::UnexpectedCharacter,
            SilcError::SymbolTooBig,
            SilcError::UnresolvedSymbol,
            SilcError::NotAFunction,
            SilcError::Other(1234),
        ] {
            assert_eq!(SilcError::from_code(e.code()), e);
            assert_eq!(SilcError::from_value(e.to_value()), Some(e));
        }
    }

    #[test]
    fn test_non_error_values() {
        assert_eq!(SilcError::from_value(Value::NIL), None);
        assert_eq!(SilcError::from_value(Value::ZERO), None);
    }

    #[test]
    fn test_gc_error_mapping() {
        assert_eq!(
            SilcError::from(GcError::IntOutOfRange(1 << 40)),
            SilcError::ValueOutOfRange
        );
    }
}

use glint_bytecode::SourceLocation;
use thiserror::Error;

/// Échec à l'exécution, remonté intact à l'hôte embarquant. Rien n'est
/// récupéré à l'intérieur de la VM ; l'échec d'une native est enveloppé en
/// `NativeFailure` mais conserve son message.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("unknown function '{name}'")]
    UnknownFunction { name: String, location: Option<SourceLocation> },

    #[error("unknown native '{name}'")]
    UnknownNative { name: String, location: Option<SourceLocation> },

    #[error("arity mismatch: '{name}' expects {expected} argument(s), got {actual}")]
    ArityMismatch { name: String, expected: u8, actual: u8, location: Option<SourceLocation> },

    #[error("invalid operands to '+': {lhs} and {rhs}")]
    InvalidAdd { lhs: String, rhs: String, location: Option<SourceLocation> },

    #[error("constant at index {index} is not a Name")]
    ConstantNotAName { index: usize, location: Option<SourceLocation> },

    #[error("gas limit of {limit} steps exceeded")]
    GasExceeded { limit: u64, location: Option<SourceLocation> },

    #[error("instruction pointer {ip} out of bounds (chunk has {len} instructions)")]
    IpOutOfBounds { ip: usize, len: usize, location: Option<SourceLocation> },

    #[error("native call failed: {message}")]
    NativeFailure { message: String, location: Option<SourceLocation> },
}

impl RuntimeError {
    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            RuntimeError::UnknownFunction { location, .. }
            | RuntimeError::UnknownNative { location, .. }
            | RuntimeError::ArityMismatch { location, .. }
            | RuntimeError::InvalidAdd { location, .. }
            | RuntimeError::ConstantNotAName { location, .. }
            | RuntimeError::GasExceeded { location, .. }
            | RuntimeError::IpOutOfBounds { location, .. }
            | RuntimeError::NativeFailure { location, .. } => *location,
        }
    }
}

use glint_bytecode::SourceLocation;
use thiserror::Error;

/// Échec de compilation. Une seule passe : le premier échec interrompt la
/// compilation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    #[error("unsupported construct: {message}")]
    UnsupportedConstruct { message: String, line: Option<u32> },

    #[error("invalid let binding: {message}")]
    InvalidLet { message: String, line: Option<u32> },

    #[error("unsupported operator: {message}")]
    UnsupportedOperator { message: String, line: Option<u32> },

    #[error("malformed if: {message}")]
    MalformedIf { message: String, line: Option<u32> },
}

impl CompileError {
    pub fn line(&self) -> Option<u32> {
        match self {
            CompileError::UnsupportedConstruct { line, .. }
            | CompileError::InvalidLet { line, .. }
            | CompileError::UnsupportedOperator { line, .. }
            | CompileError::MalformedIf { line, .. } => *line,
        }
    }

    pub fn source_location(&self) -> Option<SourceLocation> {
        self.line().map(SourceLocation::new)
    }
}

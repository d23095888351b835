//! Error types shared by the triage crates

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TriageError>;

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// A domain value failed its structural checks
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server error: {0}")]
    Server(String),
}

impl TriageError {
    /// Startup problems that no retry will fix
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_errors_convert() {
        fn bind() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::AddrInUse, "port 8000 taken"))?;
            Ok(())
        }
        let err = bind().unwrap_err();
        assert!(matches!(err, TriageError::Io(_)));
        assert_eq!(err.to_string(), "I/O error: port 8000 taken");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_validation_is_not_fatal() {
        let err = TriageError::Validation("confidence out of range".into());
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "Validation error: confidence out of range");
    }
}

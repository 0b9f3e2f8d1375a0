use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypesError {
    #[error("invalid {what} length: expected {expected}, got {actual}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

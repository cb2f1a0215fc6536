use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Insufficient stock for {product} (available: {available}, requested: {requested})")]
    InsufficientStock {
        product_id: i32,
        product: String,
        available: i32,
        requested: i32,
    },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn product_not_found(id: i32) -> Self {
        DomainError::NotFound(format!("product {} not found", id))
    }

    pub fn order_not_found(id: i32) -> Self {
        DomainError::NotFound(format!("order {} not found", id))
    }
}

/// A stored or submitted string that names no known variant of an enumeration.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl From<ParseEnumError> for DomainError {
    fn from(e: ParseEnumError) -> Self {
        DomainError::Internal(e.to_string())
    }
}

use thiserror::Error;

use crate::storage::ConstraintViolation;
use crate::web::PaginationError;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Pagination(#[from] PaginationError),
    #[error("email delivery failed: {0}")]
    Delivery(String),
    #[error(transparent)]
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for BillingError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<ConstraintViolation>() {
            Ok(violation) => BillingError::Conflict(violation.0),
            Err(error) => BillingError::Internal(error),
        }
    }
}

pub type BillingResult<T> = Result<T, BillingError>;

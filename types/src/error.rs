//! Error type for value construction and conversion.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("amount {value} cannot be expressed with {decimals} decimals without losing precision")]
    PrecisionLoss { value: String, decimals: u32 },

    #[error("amount overflow")]
    AmountOverflow,
}

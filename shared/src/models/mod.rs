//! Domain models for the Halal Marketplace

mod account;
mod certification;
mod product;
mod supply_chain;

pub use account::*;
pub use certification::*;
pub use product::*;
pub use supply_chain::*;

/// Error returned when a string does not name a known enum variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} '{value}', expected one of: {expected}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub expected: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str, variants: &[&str]) -> Self {
        Self {
            kind,
            value: value.to_string(),
            expected: variants.join(", "),
        }
    }
}

use crate::nutrient::Nutrient;
use thiserror::Error;

/// Error type for invalid operations.
#[derive(Error, Debug)]
pub enum FertigateError {
    #[error("{0}")]
    Error(String),
    #[error("Degenerate configuration: {parameter} must be positive, got {value}")]
    DegenerateConfiguration {
        parameter: &'static str,
        value: f64,
    },
    #[error("No non-negative fertilizer combination satisfies the requested targets exactly")]
    InfeasibleTargets,
    #[error("Fertilizer '{0}' is already in the catalog")]
    DuplicateFertilizer(String),
    #[error("Fertilizer '{0}' is not in the catalog")]
    UnknownFertilizer(String),
    #[error("Mass fraction for {nutrient} must be non-negative, got {value}")]
    NegativeFraction { nutrient: Nutrient, value: f64 },
    #[error("Solver failure: {0}")]
    Solver(String),
    #[error("Malformed scenario: {0}")]
    MalformedScenario(String),
}

/// Convenience type for `Result<T, FertigateError>`.
pub type FertigateResult<T> = Result<T, FertigateError>;

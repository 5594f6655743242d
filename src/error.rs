use thiserror::Error;

#[derive(Error, Debug)]
pub enum BudgetError {
    #[error("Duplicate step name '{0}': step names must be unique across the whole budget tree")]
    DuplicateStepName(String),

    #[error("Step name '{0}' is reserved")]
    ReservedStepName(String),

    #[error("Missing waterfall section: '{parent}' has no breakdown for '{child}'")]
    MissingSection { parent: String, child: String },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid projection settings: {0}")]
    InvalidProjection(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BudgetError>;

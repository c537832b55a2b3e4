use thiserror::Error;

#[derive(Error, Debug)]
pub enum PacingError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Account '{name}' not found")]
    AccountNotFound { name: String },

    #[error("Campaign '{name}' not found")]
    CampaignNotFound { name: String },

    #[error("No budget named '{name}'")]
    BudgetNotFound { name: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type PacingResult<T> = Result<T, PacingError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LogError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt log row: {0}")]
    Corrupt(String),
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HealthError {
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("canceled while waiting for health checks")]
    Cancelled,
}

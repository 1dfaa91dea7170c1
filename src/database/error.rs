#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

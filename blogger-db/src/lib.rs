pub mod client;
pub mod memory;
mod record;
pub mod store;

use blogger_common::{model::ModelValidationError, snowflake::SnowflakeTimeError};
use thiserror::Error;

pub use client::DbClient;
pub use memory::MemoryStore;
pub use store::Store;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("Could not generate an id: {0}")]
    Snowflake(#[from] SnowflakeTimeError),
    #[error("A post belongs to a blog that does not exist")]
    MissingBlog,
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

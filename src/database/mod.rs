//! Database module for PostgreSQL interactions
pub mod client;
pub mod error;
pub mod memory;
pub mod models;
pub mod repository;
pub mod repository_impl;

// Re-export most commonly used types
pub use client::Database;
pub use error::Error;
pub use memory::InMemoryNewsRepository;
pub use repository::{NewsRepository, RepositoryError};
pub use repository_impl::PostgresNewsRepository;

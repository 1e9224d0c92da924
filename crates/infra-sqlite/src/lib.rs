// Courier Infrastructure - SQLite Adapter
// Implements: DurableQueue (visibility-timeout message store)

mod connection;
mod error;
mod migration;
mod queue;

pub use connection::create_pool;
pub use migration::run_migrations;
pub use queue::SqliteQueue;

// Note: sqlx::Error conversion is handled by wrapping in helper functions
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)

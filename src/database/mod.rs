//! Connection pool and migrations for the PostgreSQL store.

pub mod pool;

pub use pool::{create_pool, run_migrations, Database, DatabaseError};

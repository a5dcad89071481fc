#![doc = include_str!("../README.md")]

pub mod db;
pub mod env;
pub mod error;

// Re-exports for convenience
pub use db::adapter::{Adapter, AdapterResult};
pub use db::schema::{KeyRow, RawUserAttributes, SessionRow, UserRow};
pub use env::{detect_env, init_logger, Env};
pub use error::{LuciaError, Result};

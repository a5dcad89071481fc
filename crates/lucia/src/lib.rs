#![doc = include_str!("../README.md")]

pub mod auth;
pub mod config;
pub mod cookies;
pub mod crypto;

pub use auth::key::{create_key_id, InitialKey, Key};
pub use auth::session::{Session, SessionState};
pub use auth::{Auth, CreateUserOptions, User, UserAttributes};
pub use config::{Config, CookieConfig};
pub use cookies::session_cookie::SessionCookie;
pub use cookies::utils::{CookieAttributes, SameSite};

// The pieces of the shared foundation most callers end up naming.
pub use lucia_core::{Adapter, Env, LuciaError, Result};

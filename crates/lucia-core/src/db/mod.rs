pub mod adapter;
pub mod schema;

pub use adapter::{Adapter, AdapterResult};
pub use schema::{KeyRow, RawUserAttributes, SessionRow, UserRow};

// Credential crypto: versioned scrypt password hashing and random id
// generation.

pub mod random;
pub mod scrypt;

pub use random::{generate_random_string, DEFAULT_ALPHABET};
pub use scrypt::{hash_password, verify_password};

//! Credentials module
//!
//! Holds the interchangeable authenticated identities and the circular pool
//! the executors rotate through.

mod pool;
mod types;

pub use pool::CredentialPool;
pub use types::{Capability, Credential};

//! Credential pool
//!
//! Ordered set of equivalent credentials with a circular "current" index.
//! The pool is plain bookkeeping; the fetch executor keeps it behind its
//! gate so the index is only mutated while the gate is held.

use super::types::{Capability, Credential};
use crate::error::{Error, Result};

/// Ordered credentials plus the index of the one in use
#[derive(Debug, Clone)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
    current: usize,
}

impl CredentialPool {
    /// Create a pool starting at the first credential
    pub fn new(credentials: Vec<Credential>) -> Result<Self> {
        if credentials.is_empty() {
            return Err(Error::config("credential pool cannot be empty"));
        }
        Ok(Self {
            credentials,
            current: 0,
        })
    }

    /// The credential in use
    pub fn current(&self) -> &Credential {
        &self.credentials[self.current]
    }

    /// Move to the next credential, wrapping to the first
    ///
    /// Returns `true` when the move wrapped, i.e. every credential has been
    /// tried once in this round.
    pub fn advance(&mut self) -> bool {
        self.current = (self.current + 1) % self.credentials.len();
        self.current == 0
    }

    /// Go back to the first credential
    pub fn reset(&mut self) {
        self.current = 0;
    }

    /// Index of the credential in use
    pub fn index(&self) -> usize {
        self.current
    }

    /// Number of credentials
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Always false; a pool is never empty
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Credentials in pool order
    pub fn iter(&self) -> impl Iterator<Item = &Credential> {
        self.credentials.iter()
    }

    /// Whether every credential has `capability`
    pub fn supports(&self, capability: Capability) -> bool {
        self.credentials.iter().all(|c| c.supports(capability))
    }

    /// Display names in pool order
    pub fn names(&self) -> Vec<&str> {
        self.credentials.iter().map(Credential::name).collect()
    }
}

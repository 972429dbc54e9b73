//! In-memory CRUD over a safe's credentials. Nothing here touches disk.

use crate::error::{Result, SafeError};
use crate::models::credential::Credential;
use crate::models::safe::Safe;
use std::collections::btree_map::Entry;

impl Safe {
    /// Insert a new credential. Fails without side effects on an empty or
    /// already-present alias.
    pub fn add(&mut self, cred: Credential) -> Result<()> {
        if cred.alias.is_empty() {
            return Err(SafeError::InvalidAlias("alias cannot be empty".into()));
        }
        match self.credentials.entry(cred.alias.clone()) {
            Entry::Occupied(_) => Err(SafeError::DuplicateAlias(cred.alias.clone())),
            Entry::Vacant(slot) => {
                slot.insert(cred);
                Ok(())
            }
        }
    }

    pub fn get(&self, alias: &str) -> Result<&Credential> {
        self.credentials
            .get(alias)
            .ok_or_else(|| SafeError::NotFound(alias.to_string()))
    }

    /// Remove and return the credential stored under `alias`.
    pub fn remove(&mut self, alias: &str) -> Result<Credential> {
        self.credentials
            .remove(alias)
            .ok_or_else(|| SafeError::NotFound(alias.to_string()))
    }

    /// All aliases, sorted.
    pub fn aliases(&self) -> Vec<&str> {
        self.credentials.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.credentials.contains_key(alias)
    }

    pub fn credentials(&self) -> impl Iterator<Item = &Credential> {
        self.credentials.values()
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

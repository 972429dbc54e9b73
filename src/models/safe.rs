//! The safe aggregate: creation metadata plus the credential map.

use crate::models::credential::Credential;
use chrono::Utc;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Safe {
    /// Unix timestamp of first creation.
    pub created_on: i64,
    /// Display name of whoever created the safe.
    pub created_by: String,
    /// Keyed by alias; always initialized, possibly empty.
    pub(crate) credentials: BTreeMap<String, Credential>,
}

impl Safe {
    /// A fresh, empty safe stamped with the current time.
    pub fn new(created_by: impl Into<String>) -> Self {
        Self {
            created_on: Utc::now().timestamp(),
            created_by: created_by.into(),
            credentials: BTreeMap::new(),
        }
    }
}

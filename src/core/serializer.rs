//! JSON encoding of the safe aggregate (the plaintext inside the envelope).

use crate::error::{Result, SafeError};
use crate::models::credential::Credential;
use crate::models::safe::Safe;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use zeroize::Zeroizing;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SafeDocumentRef<'a> {
    created_on: i64,
    created_by: &'a str,
    credentials: &'a BTreeMap<String, Credential>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SafeDocument {
    created_on: i64,
    created_by: String,
    // `data` is the key older pick safes used.
    #[serde(default, alias = "data")]
    credentials: Option<BTreeMap<String, Credential>>,
}

/// Encode a safe. Every field is always written, including an empty map.
pub fn encode(safe: &Safe) -> Result<Zeroizing<Vec<u8>>> {
    let doc = SafeDocumentRef {
        created_on: safe.created_on,
        created_by: &safe.created_by,
        credentials: &safe.credentials,
    };
    serde_json::to_vec(&doc)
        .map(Zeroizing::new)
        .map_err(|e| SafeError::Encryption(format!("encode safe: {}", describe(&e))))
}

/// Decode a safe. A missing or null credential map becomes an empty one.
pub fn decode(bytes: &[u8]) -> Result<Safe> {
    let doc: SafeDocument =
        serde_json::from_slice(bytes).map_err(|e| SafeError::Decode(describe(&e)))?;
    let credentials = doc.credentials.unwrap_or_default();
    if let Some((key, _)) = credentials.iter().find(|(key, cred)| **key != cred.alias) {
        return Err(SafeError::Decode(format!(
            "credential stored under '{}' carries a different alias",
            key
        )));
    }
    Ok(Safe {
        created_on: doc.created_on,
        created_by: doc.created_by,
        credentials,
    })
}

// serde_json messages can quote input values; report position and category only.
fn describe(err: &serde_json::Error) -> String {
    format!(
        "{:?} error at line {} column {}",
        err.classify(),
        err.line(),
        err.column()
    )
}

/// Arbitrary safes: any timestamps, empty usernames and secrets, 0..8 entries.
#[cfg(test)]
pub(crate) fn arb_safe() -> impl proptest::strategy::Strategy<Value = Safe> {
    use proptest::prelude::*;

    let record = (".{0,24}", ".{0,64}", any::<i64>());
    (
        any::<i64>(),
        ".{0,32}",
        proptest::collection::btree_map(".{1,24}", record, 0..8),
    )
        .prop_map(|(created_on, created_by, entries)| {
            let credentials = entries
                .into_iter()
                .map(|(alias, (username, secret, stamped))| {
                    let mut cred = Credential::new(alias.as_str(), username, secret);
                    cred.created_on = stamped;
                    (alias, cred)
                })
                .collect();
            Safe {
                created_on,
                created_by,
                credentials,
            }
        })
}

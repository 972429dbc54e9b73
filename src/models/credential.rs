use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

/// One alias/username/secret record stored in a safe.
///
/// The secret is serialized under the `password` key and wiped from memory
/// when the record is dropped.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub alias: String,
    pub username: String,
    #[serde(rename = "password")]
    pub secret: String,
    pub created_on: i64,
}

impl Credential {
    /// Build a record stamped with the current time.
    pub fn new(
        alias: impl Into<String>,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            alias: alias.into(),
            username: username.into(),
            secret: secret.into(),
            created_on: Utc::now().timestamp(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("alias", &self.alias)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .field("created_on", &self.created_on)
            .finish()
    }
}

impl Drop for Credential {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secret() {
        let cred = Credential::new("github", "alice", "p@ssw3rd");
        let printed = format!("{:?}", cred);
        assert!(printed.contains("github"));
        assert!(!printed.contains("p@ssw3rd"));
    }

    #[test]
    fn test_secret_serialized_as_password() {
        let cred = Credential::new("github", "alice", "p@ssw3rd");
        let json = serde_json::to_value(&cred).unwrap();
        assert_eq!(json["password"], "p@ssw3rd");
        assert_eq!(json["createdOn"], cred.created_on);
        assert!(json.get("secret").is_none());
    }

    #[test]
    fn test_new_stamps_current_time() {
        let before = Utc::now().timestamp();
        let cred = Credential::new("a", "", "s");
        assert!(cred.created_on >= before);
        assert!(cred.created_on <= Utc::now().timestamp());
    }
}

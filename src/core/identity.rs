//! Who is creating a safe.

use nix::unistd::{getuid, User};
use std::env;

/// Supplies the display name recorded as a safe's creator.
pub trait IdentitySource {
    fn display_name(&self) -> String;
}

/// The current OS user: GECOS full name, then login name, then `$USER`.
pub struct SystemIdentity;

impl IdentitySource for SystemIdentity {
    fn display_name(&self) -> String {
        if let Ok(Some(user)) = User::from_uid(getuid()) {
            let gecos = user.gecos.to_string_lossy();
            let full_name = gecos.split(',').next().unwrap_or("").trim();
            if !full_name.is_empty() {
                return full_name.to_string();
            }
            if !user.name.is_empty() {
                return user.name;
            }
        }
        env::var("USER")
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// A fixed name, for callers that already know the identity.
pub struct NamedIdentity(pub String);

impl IdentitySource for NamedIdentity {
    fn display_name(&self) -> String {
        self.0.clone()
    }
}

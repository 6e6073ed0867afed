use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::AuthSettings;
use crate::error::{AdminError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Viewer,
}

impl Role {
    pub fn can_write(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Viewer => "viewer",
        };
        f.write_str(name)
    }
}

/// The operator's identity, resolved once at startup and passed to every
/// command that needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthContext {
    pub user: String,
    pub role: Role,
}

impl AuthContext {
    pub fn new(user: impl Into<String>, role: Role) -> Self {
        Self {
            user: user.into(),
            role,
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(settings.user.clone(), settings.role)
    }

    /// Fails with `Forbidden` unless the role may change records.
    pub fn require_write(&self, action: &'static str) -> Result<()> {
        if self.role.can_write() {
            Ok(())
        } else {
            Err(AdminError::Forbidden {
                role: self.role.to_string(),
                action,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewer_cannot_write() {
        let ctx = AuthContext::new("ops@example.com", Role::Viewer);
        let err = ctx.require_write("send invoices").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Role 'viewer' is not allowed to send invoices"
        );
    }

    #[test]
    fn admin_and_manager_can_write() {
        assert!(AuthContext::new("a", Role::Admin).require_write("edit").is_ok());
        assert!(AuthContext::new("m", Role::Manager).require_write("edit").is_ok());
    }
}

use tracing::{debug, warn};

use crate::models::{Role, ServiceError, ServiceResult};
use crate::repositories::SlotStore;

/// Roles allowed to submit a booking
pub const BOOKING_ROLES: &[Role] = &[Role::User, Role::Admin, Role::Coordinator];

/// Session state read from the user-presence and role slots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub authenticated: bool,
    pub role: Option<Role>,
}

impl Session {
    /// Read both slots; unreadable or unknown values count as absent
    pub fn load(storage: &dyn SlotStore, user_key: &str, role_key: &str) -> Self {
        let authenticated = match storage.read(user_key) {
            Ok(Some(value)) => {
                let value = value.trim();
                !value.is_empty() && value != "null" && value != "false"
            }
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Failed to read user slot");
                false
            }
        };

        let role = match storage.read(role_key) {
            Ok(Some(value)) => match value.trim_matches('"').parse::<Role>() {
                Ok(role) => Some(role),
                Err(e) => {
                    warn!(error = %e, "Ignoring unknown role tag");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read role slot");
                None
            }
        };

        debug!(authenticated, role = ?role, "Session loaded");
        Self {
            authenticated,
            role,
        }
    }

    pub fn require_authenticated(&self) -> ServiceResult<()> {
        if self.authenticated {
            Ok(())
        } else {
            Err(ServiceError::Unauthenticated)
        }
    }

    /// Require an authenticated session holding one of `allowed`
    pub fn require_role(&self, allowed: &[Role], action: &str) -> ServiceResult<Role> {
        self.require_authenticated()?;
        match self.role {
            Some(role) if allowed.contains(&role) => Ok(role),
            other => Err(ServiceError::Forbidden {
                role: other.map(|r| r.to_string()).unwrap_or_else(|| "none".to_string()),
                action: action.to_string(),
            }),
        }
    }
}
